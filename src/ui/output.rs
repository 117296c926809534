//! Output functions for consistent CLI formatting

use super::context::UiContext;
use crate::model::{Comment, Post};
use chrono::{DateTime, Utc};
use console::style;

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
        println!();
    }
}

/// Display success outro
pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(style(message).green().bold()).ok();
    } else {
        println!();
        println!("{} {}", style("[OK]").green(), message);
    }
}

/// Display a note/info box
pub fn note(ctx: &UiContext, title: &str, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::note(title, message).ok();
    } else {
        println!("{}: {}", style(title).bold(), message);
    }
}

/// Display a section header
pub fn section(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        println!();
        cliclack::log::info(style(title).bold()).ok();
    } else {
        println!();
        println!("{}", style(title).bold());
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(message).ok();
    } else {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(format!("{} ({})", message, style(detail).dim())).ok();
    } else {
        println!("  {} {} ({})", style("[OK]").green(), message, detail);
    }
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(format!("{} - {}", message, style(hint).dim())).ok();
    } else {
        println!("  {} {} - {}", style("[WARN]").yellow(), message, hint);
    }
}

pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::info(message).ok();
    } else {
        println!("  {} {}", style("[INFO]").cyan(), message);
    }
}

/// Display a remark/hint
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        println!("  {}", style(message).dim());
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Print a post with its newest `comments` comments.
///
/// Posts and comments still carrying a temporary id are marked pending.
pub fn post_block(ctx: &UiContext, post: &Post, comments: usize) {
    let pending = if post.id.is_temporary() {
        format!(" {}", style("(pending)").yellow())
    } else {
        String::new()
    };
    let header = format!(
        "{}  {}  {}{}",
        style(post.author.display_name()).bold(),
        style(timestamp(&post.created_at)).dim(),
        style(post.id.as_str()).dim(),
        pending
    );

    let mut lines = Vec::new();
    if !post.body.trim().is_empty() {
        lines.push(post.body.clone());
    }
    if let Some(ref image) = post.image_url {
        lines.push(format!("{} {}", style("image:").dim(), image));
    }
    let count = post.comments.len();
    lines.push(format!(
        "{}",
        style(format!(
            "{} comment{}",
            count,
            if count == 1 { "" } else { "s" }
        ))
        .dim()
    ));
    for comment in post.latest_comments(comments) {
        lines.push(format!("  {}", comment_text(comment)));
    }

    if ctx.use_fancy_output() {
        cliclack::note(header, lines.join("\n")).ok();
    } else {
        println!();
        println!("{}", header);
        for line in lines {
            println!("  {}", line);
        }
    }
}

/// Print one comment on its own line
pub fn comment_line(ctx: &UiContext, comment: &Comment) {
    if ctx.use_fancy_output() {
        cliclack::log::step(comment_text(comment)).ok();
    } else {
        println!("  {}", comment_text(comment));
    }
}

fn comment_text(comment: &Comment) -> String {
    let marker = if comment.id.is_temporary() {
        style("(pending)").yellow().to_string()
    } else {
        style(comment.id.as_str()).dim().to_string()
    };
    format!(
        "{}: {} {}",
        style(comment.author.display_name()).bold(),
        comment.content,
        marker
    )
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, CommentId, PostId, UserId};

    fn sample_post() -> Post {
        let author = Author::new(UserId::new("u1"), "Ada");
        let created_at = Utc::now();
        Post {
            id: PostId::new("p1"),
            author: author.clone(),
            body: "hello".to_string(),
            image_url: None,
            created_at,
            comments: vec![Comment {
                id: CommentId::temporary(),
                author,
                content: "first".to_string(),
                created_at,
                post_id: PostId::new("p1"),
            }],
        }
    }

    #[test]
    fn output_non_interactive() {
        let ctx = UiContext::non_interactive();
        // These should not panic
        intro(&ctx, "Test");
        outro_success(&ctx, "Done");
        step_ok(&ctx, "Step completed");
        step_warn_hint(&ctx, "Warning", "hint");
        post_block(&ctx, &sample_post(), 3);
    }

    #[test]
    fn temporary_comment_is_marked_pending() {
        let post = sample_post();
        let text = comment_text(&post.comments[0]);
        assert!(text.contains("(pending)"));
        assert!(text.contains("first"));
    }

    #[test]
    fn timestamp_is_minute_precision() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T09:05:59Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(timestamp(&at), "2024-03-01 09:05");
    }
}
