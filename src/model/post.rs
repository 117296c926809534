//! Posts, comments and their authors as the API serializes them

use crate::model::ids::{CommentId, PostId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Author summary embedded in posts and comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: UserId,

    #[serde(default, deserialize_with = "string_or_default")]
    pub name: String,

    #[serde(
        rename = "photo",
        default,
        deserialize_with = "url_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_url: Option<String>,
}

impl Author {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar_url: None,
        }
    }

    /// Name shown for the author, falling back for blank names
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Unknown User"
        } else {
            &self.name
        }
    }
}

/// A comment on a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: CommentId,

    #[serde(rename = "commentCreator")]
    pub author: Author,

    #[serde(default, deserialize_with = "string_or_default")]
    pub content: String,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "post")]
    pub post_id: PostId,
}

/// A post with its comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: PostId,

    #[serde(rename = "user")]
    pub author: Author,

    #[serde(default, deserialize_with = "string_or_default")]
    pub body: String,

    #[serde(
        rename = "image",
        default,
        deserialize_with = "url_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Order comments oldest first, the order every view renders them in
    pub fn sort_comments(&mut self) {
        self.comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    }

    pub fn comment(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| &c.id == id)
    }

    /// The `n` most recent comments, oldest first
    pub fn latest_comments(&self, n: usize) -> &[Comment] {
        let start = self.comments.len().saturating_sub(n);
        &self.comments[start..]
    }
}

fn string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// The API renders missing uploads as URLs ending in "undefined".
fn url_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let url = Option::<String>::deserialize(deserializer)?;
    Ok(url.filter(|u| !u.trim().is_empty() && !u.contains("undefined")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST_JSON: &str = r#"{
        "_id": "p1",
        "body": "hello",
        "image": "https://cdn.example/undefined",
        "user": {"_id": "u1", "name": "Ada", "photo": "https://cdn.example/ada.png"},
        "createdAt": "2025-03-01T10:00:00.000Z",
        "comments": [
            {"_id": "c2", "content": "second", "commentCreator": {"_id": "u2", "name": "Bo"},
             "post": "p1", "createdAt": "2025-03-01T12:00:00.000Z"},
            {"_id": "c1", "content": "first", "commentCreator": {"_id": "u2", "name": "Bo"},
             "post": "p1", "createdAt": "2025-03-01T11:00:00.000Z"}
        ],
        "id": "p1"
    }"#;

    #[test]
    fn parses_api_post() {
        let post: Post = serde_json::from_str(POST_JSON).unwrap();
        assert_eq!(post.id, PostId::new("p1"));
        assert_eq!(post.author.display_name(), "Ada");
        assert_eq!(
            post.author.avatar_url.as_deref(),
            Some("https://cdn.example/ada.png")
        );
        assert!(post.image_url.is_none());
        assert_eq!(post.comments.len(), 2);
    }

    #[test]
    fn sorts_comments_oldest_first() {
        let mut post: Post = serde_json::from_str(POST_JSON).unwrap();
        post.sort_comments();
        assert_eq!(post.comments[0].content, "first");
        assert_eq!(post.latest_comments(1)[0].content, "second");
        assert_eq!(post.latest_comments(5).len(), 2);
    }

    #[test]
    fn null_body_becomes_empty() {
        let json = r#"{"_id":"p2","body":null,"user":{"_id":"u1","name":""},
                       "createdAt":"2025-03-01T10:00:00Z"}"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.body, "");
        assert_eq!(post.author.display_name(), "Unknown User");
        assert!(post.comments.is_empty());
    }
}
