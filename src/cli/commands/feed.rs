//! Feed and mine commands

use super::{render, signed_in};
use crate::app::App;
use crate::cache::CacheKey;
use crate::cli::args::FeedArgs;
use crate::config::Config;
use crate::error::FeedResult;
use crate::model::Post;
use crate::ui::{TaskSpinner, UiContext};

/// Execute the feed command
pub async fn feed(args: FeedArgs, config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let (app, _) = signed_in(config).await?;

    let posts = load_posts(&ctx, &app, CacheKey::PostsAll, "Loading feed...").await?;
    render::print_posts(&ctx, "Feed", &posts, args.format, args.comments)
}

/// Execute the mine command
pub async fn mine(args: FeedArgs, config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let (app, me) = signed_in(config).await?;

    let posts = load_posts(&ctx, &app, CacheKey::UserPosts(me), "Loading your posts...").await?;
    render::print_posts(&ctx, "Your posts", &posts, args.format, args.comments)
}

/// Fetch `key` through the cache and return the posts it holds
pub(super) async fn load_posts(
    ctx: &UiContext,
    app: &App,
    key: CacheKey,
    message: &str,
) -> FeedResult<Vec<Post>> {
    let mut spinner = TaskSpinner::new(ctx);
    spinner.start(message);
    let result = app.cache.refresh(&key).await;
    spinner.clear();
    result?;

    Ok(app
        .cache
        .peek(&key)
        .map(|value| value.posts().to_vec())
        .unwrap_or_default())
}
