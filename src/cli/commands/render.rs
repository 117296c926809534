//! Shared listing output for posts and comments

use crate::cli::args::OutputFormat;
use crate::error::FeedResult;
use crate::model::{Comment, Post};
use crate::ui::{self, UiContext};

/// Print a feed; `comments` is the number of recent comments per post
pub fn print_posts(
    ctx: &UiContext,
    title: &str,
    posts: &[Post],
    format: OutputFormat,
    comments: usize,
) -> FeedResult<()> {
    match format {
        OutputFormat::Json => print_json(posts)?,
        OutputFormat::Plain => {
            for post in posts {
                println!("{}", post.id);
            }
        }
        OutputFormat::Table => {
            if posts.is_empty() {
                ui::step_info(ctx, "No posts yet");
                return Ok(());
            }
            ui::intro(ctx, title);
            for post in posts {
                ui::post_block(ctx, post, comments);
            }
            println!();
            println!("{} post(s)", posts.len());
        }
    }
    Ok(())
}

/// Print a single post with every comment
pub fn print_post(ctx: &UiContext, post: &Post, format: OutputFormat) -> FeedResult<()> {
    match format {
        OutputFormat::Json => print_json(post),
        OutputFormat::Plain => {
            println!("{}", post.id);
            Ok(())
        }
        OutputFormat::Table => {
            ui::post_block(ctx, post, post.comments.len());
            Ok(())
        }
    }
}

pub fn print_comments(ctx: &UiContext, comments: &[Comment], format: OutputFormat) -> FeedResult<()> {
    match format {
        OutputFormat::Json => print_json(comments)?,
        OutputFormat::Plain => {
            for comment in comments {
                println!("{}", comment.id);
            }
        }
        OutputFormat::Table => {
            if comments.is_empty() {
                ui::step_info(ctx, "No comments yet");
                return Ok(());
            }
            for comment in comments {
                ui::comment_line(ctx, comment);
            }
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> FeedResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
