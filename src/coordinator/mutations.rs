//! Optimistic create, update and delete of posts and comments, plus the
//! account operations

use crate::api::FeedApi;
use crate::cache::{CacheKey, CacheValue, EntityCache, EntityRef, KeyPrefix};
use crate::config::schema::UploadConfig;
use crate::coordinator::locks::{EntityGuard, EntityLocks};
use crate::coordinator::state::{MutationKind, MutationState, PendingMutation};
use crate::error::{FeedError, FeedResult};
use crate::model::{
    validate_comment, Author, Comment, CommentId, ImageChange, ImageUpload, LoginForm, NewPost,
    PasswordChange, Post, PostEdit, PostId, SignupForm, UserId,
};
use crate::session::SessionStore;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Applies mutations to the cache ahead of the server and reconciles
/// afterwards
pub struct MutationCoordinator {
    api: Arc<FeedApi>,
    cache: EntityCache,
    session: SessionStore,
    locks: EntityLocks,
    pending: Mutex<Vec<PendingMutation>>,
    max_photo_bytes: u64,
}

impl MutationCoordinator {
    pub fn new(
        api: Arc<FeedApi>,
        cache: EntityCache,
        session: SessionStore,
        upload: &UploadConfig,
    ) -> Self {
        Self {
            api,
            cache,
            session,
            locks: EntityLocks::new(),
            pending: Mutex::new(Vec::new()),
            max_photo_bytes: upload.max_photo_bytes,
        }
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Unsettled mutations, oldest first
    pub fn pending(&self) -> Vec<PendingMutation> {
        self.pending_list().clone()
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    /// Create a post; it shows up at the head of the feed right away
    /// under a temporary id
    pub async fn create_post(&self, new: NewPost) -> FeedResult<Post> {
        new.validate()?;
        self.require_session()?;

        let me = self.session.current_user_id();
        let draft = Post {
            id: PostId::temporary(),
            author: self.author_for(me.as_ref()),
            body: new.body.trim().to_string(),
            image_url: None,
            created_at: Utc::now(),
            comments: Vec::new(),
        };
        let temp_id = draft.id.clone();

        let mut ticket = self.begin(EntityRef::Post(temp_id.clone()), MutationKind::Create);
        ticket.wait_turn().await;

        let mut keys = vec![CacheKey::PostsAll];
        if let Some(me) = &me {
            keys.push(CacheKey::UserPosts(me.clone()));
        }
        ticket.apply(&keys, |v| v.prepend_post(&draft))?;

        let result = self.api.create_post(&new).await;
        ticket.settle()?;
        match result {
            Ok(post) => {
                for key in &keys {
                    self.cache.update(key, |v| match v {
                        CacheValue::Posts(_) if v.contains_post(&temp_id) => v
                            .remove_post(&post.id)
                            .and_then(|v| v.replace_post(&temp_id, &post)),
                        CacheValue::Posts(_) => v.prepend_post(&post),
                        other => Some(other.clone()),
                    });
                }
                self.cache
                    .write(CacheKey::PostById(post.id.clone()), CacheValue::Post(post.clone()));
                ticket.confirm()?;
                info!("Created post {}", post.id);
                Ok(post)
            }
            Err(e) => Err(ticket.roll_back(e)),
        }
    }

    /// Change the body and image of a post
    ///
    /// `None` means the server accepted the edit without echoing it and
    /// no cached copy was there to show the result.
    pub async fn update_post(&self, id: &PostId, edit: PostEdit) -> FeedResult<Option<Post>> {
        let target = EntityRef::Post(id.clone());
        let cached = self.cached_post(id);
        // Unknown image state: let the server judge
        let had_image = cached.as_ref().map_or(true, |p| p.image_url.is_some());
        edit.validate(had_image)?;
        self.require_session()?;

        let mut ticket = self.begin(target, MutationKind::Update);
        ticket.wait_turn().await;
        // Earlier edits may have settled while this one waited
        let cached = self.cached_post(id).or(cached);

        let keys = self.post_keys(id, cached.as_ref().map(|p| &p.author.id));
        let body = edit.body.trim().to_string();
        let image_url = match &edit.image {
            ImageChange::Remove => None,
            ImageChange::Keep | ImageChange::Replace(_) => {
                cached.as_ref().and_then(|p| p.image_url.clone())
            }
        };
        ticket.apply(&keys, |v| v.edit_post(id, &body, image_url.as_deref()))?;

        let result = self.api.update_post(id, &edit).await;
        ticket.settle()?;
        match result {
            Ok(server) => {
                if let Some(server) = &server {
                    for key in &keys {
                        self.cache.update(key, |v| {
                            v.edit_post(id, &server.body, server.image_url.as_deref())
                        });
                    }
                }
                ticket.confirm()?;
                info!("Updated post {}", id);
                Ok(server.or_else(|| self.cached_post(id)))
            }
            Err(e) => Err(ticket.roll_back(e)),
        }
    }

    /// Delete a post. Returns `false` without a request when the cache
    /// does not hold it.
    pub async fn delete_post(&self, id: &PostId) -> FeedResult<bool> {
        let target = EntityRef::Post(id.clone());
        let Some(cached) = self.cached_post(id) else {
            debug!("Post {} not cached; nothing to delete", id);
            return Ok(false);
        };
        self.require_session()?;

        let mut ticket = self.begin(target, MutationKind::Delete);
        ticket.wait_turn().await;

        let mut keys = self.post_keys(id, Some(&cached.author.id));
        keys.push(CacheKey::Comments(id.clone()));
        ticket.apply(&keys, |v| v.remove_post(id))?;

        let result = self.api.delete_post(id).await;
        ticket.settle()?;
        match result {
            Ok(()) => {
                ticket.confirm()?;
                info!("Deleted post {}", id);
                Ok(true)
            }
            Err(e) => Err(ticket.roll_back(e)),
        }
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Add a comment to `post_id`
    ///
    /// `None` means the server accepted the comment without echoing it;
    /// the affected entries are left stale for the next read.
    pub async fn add_comment(&self, post_id: &PostId, content: &str) -> FeedResult<Option<Comment>> {
        validate_comment(content)?;
        self.require_session()?;

        let me = self.session.current_user_id();
        let draft = Comment {
            id: CommentId::temporary(),
            author: self.author_for(me.as_ref()),
            content: content.trim().to_string(),
            created_at: Utc::now(),
            post_id: post_id.clone(),
        };
        let temp_id = draft.id.clone();

        let mut ticket = self.begin(
            EntityRef::comment(temp_id.clone(), post_id.clone()),
            MutationKind::Create,
        );
        ticket.wait_turn().await;

        let keys = self.comment_keys(post_id, None);
        ticket.apply(&keys, |v| v.append_comment(&draft))?;

        let result = self.api.create_comment(post_id, &draft.content).await;
        ticket.settle()?;
        match result {
            Ok(Some(comment)) => {
                for key in &keys {
                    self.cache.update(key, |v| {
                        if v.contains_comment(&temp_id) {
                            v.remove_comment(&comment.id)
                                .and_then(|v| v.replace_comment(&temp_id, &comment))
                        } else {
                            v.append_comment(&comment)
                        }
                    });
                }
                ticket.confirm()?;
                info!("Added comment {} on post {}", comment.id, post_id);
                Ok(Some(comment))
            }
            Ok(None) => {
                ticket.withdraw();
                for key in &keys {
                    self.cache.invalidate(key);
                }
                ticket.confirm()?;
                info!("Added comment on post {}", post_id);
                Ok(None)
            }
            Err(e) => Err(ticket.roll_back(e)),
        }
    }

    /// Replace the text of a comment
    ///
    /// `None` has the same meaning as for [`update_post`](Self::update_post).
    pub async fn update_comment(
        &self,
        post_id: &PostId,
        id: &CommentId,
        content: &str,
    ) -> FeedResult<Option<Comment>> {
        validate_comment(content)?;
        self.require_session()?;

        let target = EntityRef::comment(id.clone(), post_id.clone());
        let mut ticket = self.begin(target, MutationKind::Update);
        ticket.wait_turn().await;

        let content = content.trim().to_string();
        let keys = self.comment_keys(post_id, Some(id));
        ticket.apply(&keys, |v| v.edit_comment(id, &content))?;

        let result = self.api.update_comment(id, &content).await;
        ticket.settle()?;
        match result {
            Ok(server) => {
                if let Some(server) = &server {
                    for key in &keys {
                        self.cache.update(key, |v| v.replace_comment(id, server));
                    }
                }
                ticket.confirm()?;
                info!("Updated comment {}", id);
                Ok(server.or_else(|| self.cached_comment(id)))
            }
            Err(e) => Err(ticket.roll_back(e)),
        }
    }

    /// Delete a comment. Returns `false` without a request when the cache
    /// does not hold it.
    pub async fn delete_comment(&self, post_id: &PostId, id: &CommentId) -> FeedResult<bool> {
        let target = EntityRef::comment(id.clone(), post_id.clone());
        if self.cache.keys_embedding(&target).is_empty() {
            debug!("Comment {} not cached; nothing to delete", id);
            return Ok(false);
        }
        self.require_session()?;

        let mut ticket = self.begin(target, MutationKind::Delete);
        ticket.wait_turn().await;

        let keys = self.comment_keys(post_id, Some(id));
        ticket.apply(&keys, |v| v.remove_comment(id))?;

        let result = self.api.delete_comment(id).await;
        ticket.settle()?;
        match result {
            Ok(()) => {
                ticket.confirm()?;
                info!("Deleted comment {}", id);
                Ok(true)
            }
            Err(e) => Err(ticket.roll_back(e)),
        }
    }

    // ------------------------------------------------------------------
    // Account
    // ------------------------------------------------------------------

    /// Sign in and store the returned token
    pub async fn login(&self, form: &LoginForm) -> FeedResult<()> {
        form.validate()?;
        let token = self.api.signin(form).await?;
        self.session.set_credential(Some(token)).await?;
        info!("Logged in as {}", form.email.trim());
        Ok(())
    }

    /// Register an account; does not log in
    pub async fn signup(&self, form: &SignupForm) -> FeedResult<()> {
        form.validate()?;
        self.api.signup(form).await?;
        info!("Registered {}", form.email.trim());
        Ok(())
    }

    /// Forget the credential and everything cached under it
    pub async fn logout(&self) -> FeedResult<()> {
        self.session.set_credential(None).await?;
        self.cache.reset();
        Ok(())
    }

    pub async fn change_password(&self, change: &PasswordChange) -> FeedResult<()> {
        change.validate()?;
        self.require_session()?;
        if let Some(token) = self.api.change_password(change).await? {
            self.session.set_credential(Some(token)).await?;
        }
        info!("Password changed");
        Ok(())
    }

    /// Replace the profile photo; every cached post may embed the old one
    pub async fn upload_photo(&self, photo: &ImageUpload) -> FeedResult<()> {
        photo.check_size(self.max_photo_bytes)?;
        self.require_session()?;
        self.api.upload_photo(photo).await?;
        self.cache.invalidate(KeyPrefix::All);
        info!("Profile photo updated");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn require_session(&self) -> FeedResult<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(FeedError::Auth("not logged in".to_string()))
        }
    }

    fn begin(&self, target: EntityRef, kind: MutationKind) -> Ticket<'_> {
        let pending = PendingMutation::new(target.clone(), kind);
        let id = pending.id;
        debug!("Submitted {} of {} ({})", kind, target, id);
        self.pending_list().push(pending);
        Ticket {
            owner: self,
            id,
            target,
            lock: None,
            done: false,
        }
    }

    /// Canonical keys of a post plus every other entry embedding it
    fn post_keys(&self, id: &PostId, author: Option<&UserId>) -> Vec<CacheKey> {
        let mut keys = BTreeSet::from([CacheKey::PostsAll, CacheKey::PostById(id.clone())]);
        if let Some(author) = author {
            keys.insert(CacheKey::UserPosts(author.clone()));
        }
        keys.extend(self.cache.keys_embedding(&EntityRef::Post(id.clone())));
        keys.into_iter().collect()
    }

    /// Canonical keys of a comment thread plus every other entry embedding
    /// the post or the comment
    fn comment_keys(&self, post_id: &PostId, comment: Option<&CommentId>) -> Vec<CacheKey> {
        let mut keys: BTreeSet<CacheKey> = CacheKey::for_comment(post_id).into_iter().collect();
        keys.extend(self.cache.keys_embedding(&EntityRef::Post(post_id.clone())));
        if let Some(comment) = comment {
            keys.extend(
                self.cache
                    .keys_embedding(&EntityRef::comment(comment.clone(), post_id.clone())),
            );
        }
        keys.into_iter().collect()
    }

    fn cached_post(&self, id: &PostId) -> Option<Post> {
        self.cache
            .entries()
            .into_values()
            .filter_map(|entry| entry.value)
            .find_map(|value| value.post(id).cloned())
    }

    fn cached_comment(&self, id: &CommentId) -> Option<Comment> {
        self.cache
            .entries()
            .into_values()
            .filter_map(|entry| entry.value)
            .find_map(|value| value.comment(id).cloned())
    }

    /// Best known author record for the current user
    fn author_for(&self, me: Option<&UserId>) -> Author {
        let Some(me) = me else {
            return Author::new(UserId::temporary(), "");
        };
        self.cache
            .entries()
            .into_values()
            .filter_map(|entry| entry.value)
            .find_map(|value| {
                value.posts().iter().find_map(|post| {
                    if &post.author.id == me {
                        Some(post.author.clone())
                    } else {
                        post.comments
                            .iter()
                            .find(|c| &c.author.id == me)
                            .map(|c| c.author.clone())
                    }
                })
            })
            .unwrap_or_else(|| Author::new(me.clone(), ""))
    }

    fn pending_list(&self) -> MutexGuard<'_, Vec<PendingMutation>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_pending<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut PendingMutation) -> FeedResult<R>,
    ) -> FeedResult<R> {
        let mut pending = self.pending_list();
        let mutation = pending
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| FeedError::Internal(format!("mutation {} is not pending", id)))?;
        f(mutation)
    }

    fn take_pending(&self, id: Uuid) -> Option<PendingMutation> {
        let mut pending = self.pending_list();
        let index = pending.iter().position(|m| m.id == id)?;
        Some(pending.remove(index))
    }

    /// Put every snapshot back, newest first
    fn restore(&self, mutation: &PendingMutation) {
        for snapshot in mutation.snapshots.iter().rev() {
            self.cache.restore(snapshot, Some(&mutation.target));
        }
    }
}

/// Handle on one pending mutation
///
/// Dropping it unsettled (the caller was cancelled) rolls the cache back.
/// The entity lock is held until the cache is settled either way, so the
/// next queued mutation never snapshots an abandoned optimistic value.
struct Ticket<'a> {
    owner: &'a MutationCoordinator,
    id: Uuid,
    target: EntityRef,
    lock: Option<EntityGuard>,
    done: bool,
}

impl Ticket<'_> {
    /// Queue behind earlier mutations of the same entity
    async fn wait_turn(&mut self) {
        self.lock = Some(self.owner.locks.acquire(&self.target).await);
    }

    /// Patch `keys` and enter `OptimisticApplied`
    fn apply<F>(&self, keys: &[CacheKey], updater: F) -> FeedResult<()>
    where
        F: Fn(&CacheValue) -> Option<CacheValue>,
    {
        let cache = &self.owner.cache;
        let snapshots: Vec<_> = keys
            .iter()
            .filter_map(|key| cache.patch(key, |v| updater(v)))
            .collect();
        debug!(
            "Optimistic {} patched {} entries",
            self.target,
            snapshots.len()
        );
        self.owner.with_pending(self.id, |m| {
            m.snapshots = snapshots;
            m.advance(MutationState::OptimisticApplied)
        })
    }

    fn settle(&self) -> FeedResult<()> {
        self.owner
            .with_pending(self.id, |m| m.advance(MutationState::Settling))
    }

    /// Undo the optimistic patch without failing the mutation
    fn withdraw(&self) {
        if let Ok(mutation) = self.owner.with_pending(self.id, |m| Ok(m.clone())) {
            self.owner.restore(&mutation);
        }
    }

    fn confirm(mut self) -> FeedResult<()> {
        self.done = true;
        let mut mutation = self.owner.take_pending(self.id).ok_or_else(|| {
            FeedError::Internal(format!("mutation {} is not pending", self.id))
        })?;
        let confirmed = mutation.advance(MutationState::Confirmed);
        self.lock.take();
        confirmed
    }

    /// Restore the cache and hand `error` back
    fn roll_back(mut self, error: FeedError) -> FeedError {
        self.done = true;
        if let Some(mut mutation) = self.owner.take_pending(self.id) {
            self.owner.restore(&mutation);
            if let Err(e) = mutation.advance(MutationState::RolledBack) {
                debug!("{}", e);
            }
            warn!(
                "Rolled back {} of {}: {}{}",
                mutation.kind,
                mutation.target,
                error,
                if error.is_retryable() { " (retryable)" } else { "" }
            );
        }
        self.lock.take();
        error
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let Some(mut mutation) = self.owner.take_pending(self.id) else {
            return;
        };
        if mutation.state() == MutationState::OptimisticApplied {
            let _ = mutation.advance(MutationState::Settling);
        }
        self.owner.restore(&mutation);
        self.lock.take();
        warn!("Abandoned {} of {}", mutation.kind, mutation.target);
    }
}
