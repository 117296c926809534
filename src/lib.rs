//! linkpost - client for the linked-posts feed
//!
//! Keeps a local cache of posts, comments and user posts in sync with the
//! REST API across optimistic mutations. The binary of the same name is a
//! thin CLI over [`app::App`].

pub mod api;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod session;
pub mod ui;

pub use error::{FeedError, FeedResult};
