//! CLI command implementations

pub mod auth;
pub mod comment;
pub mod config;
pub mod feed;
pub mod post;
pub mod profile;
mod render;

pub use auth::{login, logout, signup, whoami};
pub use comment::execute as comment;
pub use config::execute as config;
pub use feed::{feed, mine};
pub use post::execute as post;
pub use profile::{password, photo};

use crate::app::App;
use crate::config::Config;
use crate::error::{FeedError, FeedResult};
use crate::model::UserId;

/// Wire the app and refuse to continue without a stored session
async fn signed_in(config: &Config) -> FeedResult<(App, UserId)> {
    let app = App::bootstrap(config).await?;
    if !app.session.is_authenticated() {
        return Err(FeedError::Auth("not logged in".to_string()));
    }
    let me = app.session.current_user_id().ok_or_else(|| {
        FeedError::Auth("stored token does not name a user".to_string())
    })?;
    Ok((app, me))
}
