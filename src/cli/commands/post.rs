//! Post command - show, create, edit and delete posts

use super::{render, signed_in};
use crate::app::App;
use crate::cache::{CacheKey, CacheValue};
use crate::cli::args::{OutputFormat, PostAction, PostArgs};
use crate::config::Config;
use crate::error::{FeedError, FeedResult};
use crate::model::{ImageChange, ImageUpload, NewPost, Post, PostEdit, PostId, UserId};
use crate::ui::{self, TaskSpinner, UiContext, UploadProgress};
use std::path::Path;

/// Execute the post command
pub async fn execute(args: PostArgs, config: &Config) -> FeedResult<()> {
    match args.action {
        PostAction::Show { id, format } => show(config, PostId::new(id), format).await,
        PostAction::Create { body, image } => create(config, body, image.as_deref()).await,
        PostAction::Edit {
            id,
            body,
            image,
            remove_image,
        } => {
            let change = match (image, remove_image) {
                (Some(path), _) => ImageChange::Replace(ImageUpload::from_path(&path).await?),
                (None, true) => ImageChange::Remove,
                (None, false) => ImageChange::Keep,
            };
            edit(config, PostId::new(id), body, change).await
        }
        PostAction::Delete { id, yes } => delete(config, PostId::new(id), yes).await,
    }
}

async fn show(config: &Config, id: PostId, format: OutputFormat) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let (app, _) = signed_in(config).await?;

    let mut post = load_post(&ctx, &app, &id).await?;
    // The comments endpoint is authoritative for the full thread
    let comments_key = CacheKey::Comments(id);
    if app.cache.refresh(&comments_key).await.is_ok() {
        if let Some(CacheValue::Comments(comments)) = app.cache.peek(&comments_key) {
            post.comments = comments;
        }
    }
    render::print_post(&ctx, &post, format)
}

async fn create(config: &Config, body: Option<String>, image: Option<&Path>) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let image = match image {
        Some(path) => Some(ImageUpload::from_path(path).await?),
        None => None,
    };
    let new = NewPost {
        body: body.unwrap_or_default(),
        image,
    };
    new.validate()?;
    let (app, _) = signed_in(config).await?;

    let progress = new
        .image
        .as_ref()
        .map(|upload| UploadProgress::new(&ctx, &upload.filename, upload.bytes.len() as u64));
    let mut spinner = TaskSpinner::new(&ctx);
    if progress.is_none() {
        spinner.start("Publishing...");
    }
    let result = app.coordinator.create_post(new).await;
    if let Some(progress) = progress {
        progress.finish();
    }
    let post = match result {
        Ok(post) => {
            spinner.clear();
            post
        }
        Err(e) => {
            spinner.stop_error("Publishing failed");
            return Err(e);
        }
    };

    ui::step_ok_detail(&ctx, "Posted", post.id.as_str());
    Ok(())
}

async fn edit(
    config: &Config,
    id: PostId,
    body: Option<String>,
    image: ImageChange,
) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let (app, me) = signed_in(config).await?;

    let current = load_post(&ctx, &app, &id).await?;
    ensure_author(&current, &me, "edit")?;

    let edit = PostEdit {
        body: body.unwrap_or(current.body),
        image,
    };
    app.coordinator.update_post(&id, edit).await?;
    ui::step_ok_detail(&ctx, "Post updated", id.as_str());
    Ok(())
}

async fn delete(config: &Config, id: PostId, yes: bool) -> FeedResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let (app, me) = signed_in(config).await?;

    let current = load_post(&ctx, &app, &id).await?;
    ensure_author(&current, &me, "delete")?;

    if !ui::confirm(&ctx, "Delete this post?", false).await? {
        ui::remark(&ctx, "Nothing deleted (pass --yes to skip the prompt)");
        return Ok(());
    }

    if app.coordinator.delete_post(&id).await? {
        ui::step_ok_detail(&ctx, "Post deleted", id.as_str());
    } else {
        ui::step_info(&ctx, "Post was already gone");
    }
    Ok(())
}

/// Fetch one post into the cache so mutations have something to patch
async fn load_post(ctx: &UiContext, app: &App, id: &PostId) -> FeedResult<Post> {
    let key = CacheKey::PostById(id.clone());
    let mut spinner = TaskSpinner::new(ctx);
    spinner.start("Loading post...");
    let result = app.cache.refresh(&key).await;
    spinner.clear();
    result?;

    app.cache
        .peek(&key)
        .and_then(|value| value.post(id).cloned())
        .ok_or_else(|| FeedError::User(format!("Post {} not found", id)))
}

fn ensure_author(post: &Post, me: &UserId, action: &str) -> FeedResult<()> {
    if &post.author.id != me {
        return Err(FeedError::User(format!(
            "You can only {} your own posts",
            action
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::value::fixtures;

    #[test]
    fn only_the_author_may_change_a_post() {
        let post = fixtures::post("p1", "u1", "hello");
        assert!(ensure_author(&post, &UserId::new("u1"), "edit").is_ok());

        let err = ensure_author(&post, &UserId::new("u2"), "delete").unwrap_err();
        assert_eq!(err.to_string(), "You can only delete your own posts");
    }
}
