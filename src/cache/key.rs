//! Cache keys and invalidation prefixes

use crate::model::{PostId, UserId};
use std::fmt;

/// Identity of a cached resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// `GET /posts`
    PostsAll,
    /// `GET /posts/:id`
    PostById(PostId),
    /// `GET /users/:id/posts`
    UserPosts(UserId),
    /// `GET /posts/:id/comments`
    Comments(PostId),
}

impl CacheKey {
    /// Keys whose value embeds the comments of `post_id`
    pub fn for_comment(post_id: &PostId) -> Vec<CacheKey> {
        vec![
            CacheKey::PostsAll,
            CacheKey::PostById(post_id.clone()),
            CacheKey::Comments(post_id.clone()),
        ]
    }

    /// Resource kind, the first component of the key
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PostsAll | Self::PostById(_) => "posts",
            Self::UserPosts(_) => "userPosts",
            Self::Comments(_) => "comments",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostsAll => write!(f, "{}/all", self.kind()),
            Self::PostById(id) => write!(f, "{}/{}", self.kind(), id),
            Self::UserPosts(id) => write!(f, "{}/{}", self.kind(), id),
            Self::Comments(id) => write!(f, "{}/{}", self.kind(), id),
        }
    }
}

/// Selects a set of keys for invalidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPrefix {
    All,
    /// `PostsAll` and every `PostById`
    Posts,
    UserPosts,
    Comments,
    Exact(CacheKey),
}

impl KeyPrefix {
    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            Self::All => true,
            Self::Posts => matches!(key, CacheKey::PostsAll | CacheKey::PostById(_)),
            Self::UserPosts => matches!(key, CacheKey::UserPosts(_)),
            Self::Comments => matches!(key, CacheKey::Comments(_)),
            Self::Exact(exact) => exact == key,
        }
    }
}

impl From<CacheKey> for KeyPrefix {
    fn from(key: CacheKey) -> Self {
        Self::Exact(key)
    }
}

impl From<&CacheKey> for KeyPrefix {
    fn from(key: &CacheKey) -> Self {
        Self::Exact(key.clone())
    }
}

/// Prefixes a mutating request to `path` may have made stale
pub fn prefixes_for_path(path: &str) -> Vec<KeyPrefix> {
    let path = path.split('?').next().unwrap_or(path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["posts"] => vec![KeyPrefix::Posts, KeyPrefix::UserPosts],
        ["posts", id, ..] => vec![
            KeyPrefix::Posts,
            KeyPrefix::UserPosts,
            KeyPrefix::Exact(CacheKey::Comments(PostId::new(*id))),
        ],
        ["comments", ..] => vec![KeyPrefix::Posts, KeyPrefix::UserPosts, KeyPrefix::Comments],
        // The avatar is embedded in every post and comment
        ["users", "upload-photo"] => vec![KeyPrefix::All],
        _ => Vec::new(),
    }
}
