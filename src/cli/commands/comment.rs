//! Comment command - list, add, edit and delete comments

use super::{render, signed_in};
use crate::app::App;
use crate::cache::{CacheKey, CacheValue};
use crate::cli::args::{CommentAction, CommentArgs, OutputFormat};
use crate::config::Config;
use crate::error::{FeedError, FeedResult};
use crate::model::{validate_comment, Comment, CommentId, PostId, UserId};
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the comment command
pub async fn execute(args: CommentArgs, config: &Config) -> FeedResult<()> {
    match args.action {
        CommentAction::List { post, format } => list(config, PostId::new(post), format).await,
        CommentAction::Add { post, content } => add(config, PostId::new(post), &content).await,
        CommentAction::Edit {
            post,
            comment,
            content,
        } => edit(config, PostId::new(post), CommentId::new(comment), &content).await,
        CommentAction::Delete { post, comment, yes } => {
            delete(config, PostId::new(post), CommentId::new(comment), yes).await
        }
    }
}

async fn list(config: &Config, post: PostId, format: OutputFormat) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let (app, _) = signed_in(config).await?;

    let comments = load_thread(&ctx, &app, &post).await?;
    render::print_comments(&ctx, &comments, format)
}

async fn add(config: &Config, post: PostId, content: &str) -> FeedResult<()> {
    let ctx = UiContext::detect();
    validate_comment(content)?;
    let (app, _) = signed_in(config).await?;

    load_thread(&ctx, &app, &post).await?;
    match app.coordinator.add_comment(&post, content).await? {
        Some(comment) => ui::step_ok_detail(&ctx, "Comment added", comment.id.as_str()),
        None => ui::step_ok(&ctx, "Comment added"),
    }
    Ok(())
}

async fn edit(config: &Config, post: PostId, id: CommentId, content: &str) -> FeedResult<()> {
    let ctx = UiContext::detect();
    validate_comment(content)?;
    let (app, me) = signed_in(config).await?;

    let thread = load_thread(&ctx, &app, &post).await?;
    let current = find_own(&thread, &id, &me, "edit")?;
    if current.content.trim() == content.trim() {
        ui::step_info(&ctx, "Comment unchanged");
        return Ok(());
    }

    app.coordinator.update_comment(&post, &id, content).await?;
    ui::step_ok_detail(&ctx, "Comment updated", id.as_str());
    Ok(())
}

async fn delete(config: &Config, post: PostId, id: CommentId, yes: bool) -> FeedResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let (app, me) = signed_in(config).await?;

    let thread = load_thread(&ctx, &app, &post).await?;
    find_own(&thread, &id, &me, "delete")?;

    if !ui::confirm(&ctx, "Delete this comment?", false).await? {
        ui::remark(&ctx, "Nothing deleted (pass --yes to skip the prompt)");
        return Ok(());
    }

    if app.coordinator.delete_comment(&post, &id).await? {
        ui::step_ok_detail(&ctx, "Comment deleted", id.as_str());
    } else {
        ui::step_info(&ctx, "Comment was already gone");
    }
    Ok(())
}

/// Fetch the post and its comment thread so mutations have entries to patch
async fn load_thread(ctx: &UiContext, app: &App, post: &PostId) -> FeedResult<Vec<Comment>> {
    let key = CacheKey::Comments(post.clone());
    let mut spinner = TaskSpinner::new(ctx);
    spinner.start("Loading comments...");
    let result = app
        .cache
        .refresh_all(&[CacheKey::PostById(post.clone()), key.clone()])
        .await;
    spinner.clear();
    result?;

    match app.cache.peek(&key) {
        Some(CacheValue::Comments(comments)) => Ok(comments),
        _ => Ok(Vec::new()),
    }
}

fn find_own<'a>(
    thread: &'a [Comment],
    id: &CommentId,
    me: &UserId,
    action: &str,
) -> FeedResult<&'a Comment> {
    let comment = thread
        .iter()
        .find(|c| &c.id == id)
        .ok_or_else(|| FeedError::User(format!("Comment {} not found", id)))?;
    if &comment.author.id != me {
        return Err(FeedError::User(format!(
            "You can only {} your own comments",
            action
        )));
    }
    Ok(comment)
}
