//! Typed calls for each remote endpoint

use crate::api::gateway::{ApiGateway, RequestBody, RequestOptions};
use crate::api::multipart::Form;
use crate::api::transport::Method;
use crate::cache::{CacheKey, CacheValue, Fetcher};
use crate::config::schema::ApiConfig;
use crate::error::{FeedError, FeedResult};
use crate::model::{
    Comment, CommentId, ImageChange, ImageUpload, LoginForm, NewPost, PasswordChange, Post,
    PostEdit, PostId, SignupForm, UserId,
};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Deserialize)]
struct TokenEnvelope {
    token: Option<String>,
}

#[derive(Deserialize)]
struct PostsEnvelope {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Deserialize)]
struct PostEnvelope {
    post: Option<Post>,
}

#[derive(Deserialize)]
struct CommentsEnvelope {
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Deserialize)]
struct CommentEnvelope {
    comment: Option<Comment>,
    #[serde(default)]
    comments: Vec<Comment>,
}

/// The remote API as typed operations
pub struct FeedApi {
    gateway: Arc<ApiGateway>,
    feed_limit: u32,
    user_posts_limit: u32,
}

impl FeedApi {
    pub fn new(gateway: Arc<ApiGateway>, config: &ApiConfig) -> Self {
        Self {
            gateway,
            feed_limit: config.feed_limit,
            user_posts_limit: config.user_posts_limit,
        }
    }

    pub fn gateway(&self) -> &Arc<ApiGateway> {
        &self.gateway
    }

    /// `POST /users/signin`, returning the token
    pub async fn signin(&self, form: &LoginForm) -> FeedResult<String> {
        let response = self
            .gateway
            .request(
                Method::Post,
                "/users/signin",
                Some(RequestBody::Json(serde_json::to_value(form)?)),
                RequestOptions::anonymous(),
            )
            .await?;
        let envelope: TokenEnvelope = response.json()?;
        envelope
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| FeedError::Decode {
                path: response.path,
                reason: "response carries no token".to_string(),
            })
    }

    /// `POST /users/signup`
    pub async fn signup(&self, form: &SignupForm) -> FeedResult<()> {
        self.gateway
            .request(
                Method::Post,
                "/users/signup",
                Some(RequestBody::Json(serde_json::to_value(form)?)),
                RequestOptions::anonymous(),
            )
            .await?;
        Ok(())
    }

    /// `GET /posts?limit=N`
    pub async fn list_posts(&self) -> FeedResult<Vec<Post>> {
        let response = self
            .gateway
            .request(
                Method::Get,
                "/posts",
                None,
                RequestOptions::default().with_query("limit", self.feed_limit),
            )
            .await?;
        let envelope: PostsEnvelope = response.json()?;
        Ok(sorted(envelope.posts))
    }

    /// `GET /posts/:id`
    pub async fn get_post(&self, id: &PostId) -> FeedResult<Post> {
        let path = format!("/posts/{}", id);
        let response = self
            .gateway
            .request(Method::Get, &path, None, RequestOptions::default())
            .await?;
        let envelope: PostEnvelope = response.json()?;
        let mut post = envelope.post.ok_or_else(|| FeedError::Decode {
            path,
            reason: "response carries no post".to_string(),
        })?;
        post.sort_comments();
        Ok(post)
    }

    /// `GET /posts/:id/comments`, oldest first
    pub async fn post_comments(&self, id: &PostId) -> FeedResult<Vec<Comment>> {
        let response = self
            .gateway
            .request(
                Method::Get,
                &format!("/posts/{}/comments", id),
                None,
                RequestOptions::default(),
            )
            .await?;
        let mut envelope: CommentsEnvelope = response.json()?;
        envelope
            .comments
            .sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(envelope.comments)
    }

    /// `GET /users/:id/posts?limit=N`
    pub async fn user_posts(&self, user: &UserId) -> FeedResult<Vec<Post>> {
        let response = self
            .gateway
            .request(
                Method::Get,
                &format!("/users/{}/posts", user),
                None,
                RequestOptions::authenticated().with_query("limit", self.user_posts_limit),
            )
            .await?;
        let envelope: PostsEnvelope = response.json()?;
        Ok(sorted(envelope.posts))
    }

    /// Posts by `user` plus posts `user` commented on, newest first
    pub async fn related_posts(&self, user: &UserId) -> FeedResult<Vec<Post>> {
        let own = self.user_posts(user).await?;
        let feed = self.list_posts().await?;

        let threads = join_all(feed.iter().map(|post| self.post_comments(&post.id))).await;
        let mut related: HashMap<PostId, Post> = HashMap::new();
        for (post, comments) in feed.into_iter().zip(threads) {
            // A thread that fails to load just isn't counted
            let commented = comments
                .map(|comments| comments.iter().any(|c| &c.author.id == user))
                .unwrap_or(false);
            if commented {
                related.insert(post.id.clone(), post);
            }
        }
        for post in own {
            related.insert(post.id.clone(), post);
        }

        let mut posts: Vec<Post> = related.into_values().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        debug!("{} posts related to {}", posts.len(), user);
        Ok(posts)
    }

    /// `POST /posts` (multipart), returning the stored post
    pub async fn create_post(&self, new: &NewPost) -> FeedResult<Post> {
        let mut form = Form::new().text("body", new.body.as_str());
        if let Some(image) = &new.image {
            form = form.file("image", image);
        }

        let response = self
            .gateway
            .request(
                Method::Post,
                "/posts",
                Some(RequestBody::Multipart(form)),
                RequestOptions::authenticated(),
            )
            .await?;
        optional_post(response.json::<PostEnvelope>().ok()).ok_or_else(|| FeedError::Decode {
            path: response.path,
            reason: "response carries no post".to_string(),
        })
    }

    /// `PUT /posts/:id` (multipart); a removed image is sent as an empty field
    pub async fn update_post(&self, id: &PostId, edit: &PostEdit) -> FeedResult<Option<Post>> {
        let mut form = Form::new().text("body", edit.body.as_str());
        match &edit.image {
            ImageChange::Keep => {}
            ImageChange::Remove => form = form.text("image", ""),
            ImageChange::Replace(image) => form = form.file("image", image),
        }

        let response = self
            .gateway
            .request(
                Method::Put,
                &format!("/posts/{}", id),
                Some(RequestBody::Multipart(form)),
                RequestOptions::authenticated(),
            )
            .await?;
        Ok(optional_post(response.json::<PostEnvelope>().ok()))
    }

    /// `DELETE /posts/:id`
    pub async fn delete_post(&self, id: &PostId) -> FeedResult<()> {
        self.gateway
            .request(
                Method::Delete,
                &format!("/posts/{}", id),
                None,
                RequestOptions::authenticated(),
            )
            .await?;
        Ok(())
    }

    /// `POST /comments`
    ///
    /// Some deployments answer with the post's whole comment list instead
    /// of the new comment; the newest entry is taken then.
    pub async fn create_comment(
        &self,
        post_id: &PostId,
        content: &str,
    ) -> FeedResult<Option<Comment>> {
        let response = self
            .gateway
            .request(
                Method::Post,
                "/comments",
                Some(RequestBody::Json(json!({
                    "content": content,
                    "post": post_id,
                }))),
                RequestOptions::authenticated(),
            )
            .await?;

        let Ok(envelope) = response.json::<CommentEnvelope>() else {
            return Ok(None);
        };
        Ok(envelope.comment.or_else(|| {
            envelope
                .comments
                .into_iter()
                .filter(|c| c.content == content)
                .max_by(|a, b| a.created_at.cmp(&b.created_at))
        }))
    }

    /// `PUT /comments/:id`
    pub async fn update_comment(
        &self,
        id: &CommentId,
        content: &str,
    ) -> FeedResult<Option<Comment>> {
        let response = self
            .gateway
            .request(
                Method::Put,
                &format!("/comments/{}", id),
                Some(RequestBody::Json(json!({ "content": content }))),
                RequestOptions::authenticated(),
            )
            .await?;
        Ok(response
            .json::<CommentEnvelope>()
            .ok()
            .and_then(|envelope| envelope.comment))
    }

    /// `DELETE /comments/:id`
    pub async fn delete_comment(&self, id: &CommentId) -> FeedResult<()> {
        self.gateway
            .request(
                Method::Delete,
                &format!("/comments/{}", id),
                None,
                RequestOptions::authenticated(),
            )
            .await?;
        Ok(())
    }

    /// `PATCH /users/change-password`; returns the replacement token, if any
    pub async fn change_password(&self, change: &PasswordChange) -> FeedResult<Option<String>> {
        let response = self
            .gateway
            .request(
                Method::Patch,
                "/users/change-password",
                Some(RequestBody::Json(change.to_json())),
                RequestOptions::authenticated(),
            )
            .await?;
        Ok(response
            .json::<TokenEnvelope>()
            .ok()
            .and_then(|envelope| envelope.token)
            .filter(|t| !t.trim().is_empty()))
    }

    /// `PUT /users/upload-photo` (multipart)
    pub async fn upload_photo(&self, photo: &ImageUpload) -> FeedResult<()> {
        self.gateway
            .request(
                Method::Put,
                "/users/upload-photo",
                Some(RequestBody::Multipart(Form::new().file("photo", photo))),
                RequestOptions::authenticated(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Fetcher for FeedApi {
    async fn fetch(&self, key: &CacheKey) -> FeedResult<CacheValue> {
        match key {
            CacheKey::PostsAll => self.list_posts().await.map(CacheValue::Posts),
            CacheKey::PostById(id) => self.get_post(id).await.map(CacheValue::Post),
            CacheKey::UserPosts(user) => self.related_posts(user).await.map(CacheValue::Posts),
            CacheKey::Comments(id) => self.post_comments(id).await.map(CacheValue::Comments),
        }
    }
}

fn sorted(mut posts: Vec<Post>) -> Vec<Post> {
    for post in &mut posts {
        post.sort_comments();
    }
    posts
}

fn optional_post(envelope: Option<PostEnvelope>) -> Option<Post> {
    let mut post = envelope?.post?;
    post.sort_comments();
    Some(post)
}
