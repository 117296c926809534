//! Cached values and the pure updaters applied to them
//!
//! Updaters never mutate in place: they take the current value and return
//! the next one, `None` meaning the entry now holds nothing.

use crate::model::{Comment, CommentId, Post, PostId};

/// Value stored under a [`CacheKey`](super::CacheKey)
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Post(Post),
    Posts(Vec<Post>),
    Comments(Vec<Comment>),
}

/// The entity a mutation targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Post(PostId),
    Comment { id: CommentId, post_id: PostId },
}

impl EntityRef {
    pub fn comment(id: CommentId, post_id: PostId) -> Self {
        Self::Comment { id, post_id }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post {}", id),
            Self::Comment { id, .. } => write!(f, "comment {}", id),
        }
    }
}

impl CacheValue {
    /// Posts held by this value, in order
    pub fn posts(&self) -> &[Post] {
        match self {
            Self::Post(post) => std::slice::from_ref(post),
            Self::Posts(posts) => posts,
            Self::Comments(_) => &[],
        }
    }

    pub fn post(&self, id: &PostId) -> Option<&Post> {
        self.posts().iter().find(|p| &p.id == id)
    }

    pub fn contains_post(&self, id: &PostId) -> bool {
        self.post(id).is_some()
    }

    pub fn comment(&self, id: &CommentId) -> Option<&Comment> {
        match self {
            Self::Comments(comments) => comments.iter().find(|c| &c.id == id),
            _ => self.posts().iter().find_map(|p| p.comment(id)),
        }
    }

    pub fn contains_comment(&self, id: &CommentId) -> bool {
        self.comment(id).is_some()
    }

    /// Whether the value embeds `entity`
    pub fn contains(&self, entity: &EntityRef) -> bool {
        match entity {
            EntityRef::Post(id) => self.contains_post(id),
            EntityRef::Comment { id, .. } => self.contains_comment(id),
        }
    }

    /// Number of comments on `post_id` as seen by this value
    pub fn comment_count(&self, post_id: &PostId) -> Option<usize> {
        match self {
            Self::Comments(comments) => Some(comments.len()),
            _ => self.post(post_id).map(|p| p.comments.len()),
        }
    }

    /// Put `post` at the head of a post list
    pub fn prepend_post(&self, post: &Post) -> Option<CacheValue> {
        match self {
            Self::Posts(posts) => {
                let mut next = Vec::with_capacity(posts.len() + 1);
                next.push(post.clone());
                next.extend(posts.iter().filter(|p| p.id != post.id).cloned());
                Some(Self::Posts(next))
            }
            other => Some(other.clone()),
        }
    }

    /// Replace the post with id `id` by `post`, wherever it appears
    pub fn replace_post(&self, id: &PostId, post: &Post) -> Option<CacheValue> {
        Some(self.map_posts(|p| if &p.id == id { post.clone() } else { p.clone() }))
    }

    /// Change the body and image of the post `id` in place
    pub fn edit_post(
        &self,
        id: &PostId,
        body: &str,
        image_url: Option<&str>,
    ) -> Option<CacheValue> {
        Some(self.map_posts(|p| {
            let mut p = p.clone();
            if &p.id == id {
                p.body = body.to_string();
                p.image_url = image_url.map(str::to_string);
            }
            p
        }))
    }

    /// Drop the post `id`; a single-post value becomes empty
    pub fn remove_post(&self, id: &PostId) -> Option<CacheValue> {
        match self {
            Self::Post(post) if &post.id == id => None,
            Self::Posts(posts) => Some(Self::Posts(
                posts.iter().filter(|p| &p.id != id).cloned().collect(),
            )),
            // Comments of a deleted post go with it
            Self::Comments(comments) if comments.iter().any(|c| &c.post_id == id) => None,
            other => Some(other.clone()),
        }
    }

    /// Append `comment` to its post's comments
    pub fn append_comment(&self, comment: &Comment) -> Option<CacheValue> {
        match self {
            Self::Comments(comments) => {
                let mut next: Vec<Comment> = comments
                    .iter()
                    .filter(|c| c.id != comment.id)
                    .cloned()
                    .collect();
                next.push(comment.clone());
                Some(Self::Comments(next))
            }
            _ => Some(self.map_posts(|p| {
                let mut p = p.clone();
                if p.id == comment.post_id {
                    p.comments.retain(|c| c.id != comment.id);
                    p.comments.push(comment.clone());
                }
                p
            })),
        }
    }

    /// Replace the comment `id` by `comment`
    pub fn replace_comment(&self, id: &CommentId, comment: &Comment) -> Option<CacheValue> {
        Some(self.map_comments(|comments| {
            for c in comments.iter_mut().filter(|c| &c.id == id) {
                *c = comment.clone();
            }
        }))
    }

    /// Change the content of comment `id` in place
    pub fn edit_comment(&self, id: &CommentId, content: &str) -> Option<CacheValue> {
        Some(self.map_comments(|comments| {
            for c in comments.iter_mut().filter(|c| &c.id == id) {
                c.content = content.to_string();
            }
        }))
    }

    /// Drop the comment `id`
    pub fn remove_comment(&self, id: &CommentId) -> Option<CacheValue> {
        Some(self.map_comments(|comments| comments.retain(|c| &c.id != id)))
    }

    fn map_posts(&self, f: impl Fn(&Post) -> Post) -> CacheValue {
        match self {
            Self::Post(post) => Self::Post(f(post)),
            Self::Posts(posts) => Self::Posts(posts.iter().map(f).collect()),
            Self::Comments(comments) => Self::Comments(comments.clone()),
        }
    }

    fn map_comments(&self, f: impl Fn(&mut Vec<Comment>)) -> CacheValue {
        let mut next = self.clone();
        match &mut next {
            Self::Post(post) => f(&mut post.comments),
            Self::Posts(posts) => posts.iter_mut().for_each(|p| f(&mut p.comments)),
            Self::Comments(comments) => f(comments),
        }
        next
    }
}

/// Put `entity` back the way `prior` had it, leaving the rest of `current`
/// untouched.
///
/// Used for rollback when another writer changed the entry after the
/// optimistic patch, so restoring the whole prior value would lose their
/// change.
pub fn restore_entity(
    current: Option<&CacheValue>,
    prior: Option<&CacheValue>,
    entity: &EntityRef,
) -> Option<CacheValue> {
    match entity {
        EntityRef::Post(id) => restore_post(current, prior, id),
        EntityRef::Comment { id, post_id } => {
            let current = current?;
            let prior_comment = prior.and_then(|p| position_of_comment(p, id));
            let mut next = current.clone();
            let restore = |comments: &mut Vec<Comment>| {
                comments.retain(|c| &c.id != id);
                if let Some((index, comment)) = &prior_comment {
                    comments.insert((*index).min(comments.len()), comment.clone());
                }
            };
            match &mut next {
                CacheValue::Comments(comments) => restore(comments),
                CacheValue::Post(post) if &post.id == post_id => restore(&mut post.comments),
                CacheValue::Posts(posts) => {
                    if let Some(post) = posts.iter_mut().find(|p| &p.id == post_id) {
                        restore(&mut post.comments);
                    }
                }
                CacheValue::Post(_) => {}
            }
            Some(next)
        }
    }
}

fn restore_post(
    current: Option<&CacheValue>,
    prior: Option<&CacheValue>,
    id: &PostId,
) -> Option<CacheValue> {
    let prior_post = prior.and_then(|p| {
        p.posts()
            .iter()
            .position(|post| &post.id == id)
            .map(|i| (i, p.posts()[i].clone()))
    });

    match current {
        None => match (prior, prior_post) {
            (Some(CacheValue::Post(_)), Some((_, post))) => Some(CacheValue::Post(post)),
            _ => None,
        },
        Some(CacheValue::Post(post)) if &post.id == id => {
            prior_post.map(|(_, post)| CacheValue::Post(post))
        }
        Some(CacheValue::Posts(posts)) => {
            let mut next: Vec<Post> = posts.iter().filter(|p| &p.id != id).cloned().collect();
            if let Some((index, post)) = prior_post {
                next.insert(index.min(next.len()), post);
            }
            Some(CacheValue::Posts(next))
        }
        Some(other) => Some(other.clone()),
    }
}

fn position_of_comment(value: &CacheValue, id: &CommentId) -> Option<(usize, Comment)> {
    let find = |comments: &[Comment]| {
        comments
            .iter()
            .position(|c| &c.id == id)
            .map(|i| (i, comments[i].clone()))
    };
    match value {
        CacheValue::Comments(comments) => find(comments),
        _ => value.posts().iter().find_map(|p| find(&p.comments)),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::{Author, Comment, CommentId, Post, PostId, UserId};
    use chrono::{TimeZone, Utc};

    pub fn post(id: &str, author: &str, body: &str) -> Post {
        Post {
            id: PostId::new(id),
            author: Author::new(UserId::new(author), format!("user {}", author)),
            body: body.to_string(),
            image_url: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            comments: Vec::new(),
        }
    }

    pub fn comment(id: &str, post_id: &str, content: &str) -> Comment {
        Comment {
            id: CommentId::new(id),
            author: Author::new(UserId::new("u9"), "commenter"),
            content: content.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap(),
            post_id: PostId::new(post_id),
        }
    }

    pub fn with_comments(mut post: Post, comments: Vec<Comment>) -> Post {
        post.comments = comments;
        post
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn ids(value: &CacheValue) -> Vec<String> {
        value.posts().iter().map(|p| p.id.to_string()).collect()
    }

    #[test]
    fn prepend_dedupes() {
        let list = CacheValue::Posts(vec![post("a", "u1", "x"), post("b", "u1", "y")]);
        let next = list.prepend_post(&post("b", "u1", "y2")).unwrap();
        assert_eq!(ids(&next), ["b", "a"]);
        assert_eq!(next.posts()[0].body, "y2");
    }

    #[test]
    fn remove_post_empties_single_value() {
        let single = CacheValue::Post(post("a", "u1", "x"));
        assert_eq!(single.remove_post(&PostId::new("a")), None);
        assert_eq!(
            single.remove_post(&PostId::new("b")),
            Some(single.clone())
        );
    }

    #[test]
    fn comment_updaters_reach_nested_posts() {
        let list = CacheValue::Posts(vec![post("a", "u1", "x"), post("b", "u1", "y")]);
        let c = comment("c1", "b", "nice");

        let with = list.append_comment(&c).unwrap();
        assert_eq!(with.comment_count(&PostId::new("b")), Some(1));
        assert_eq!(with.comment_count(&PostId::new("a")), Some(0));

        let edited = with.edit_comment(&c.id, "nicer").unwrap();
        assert_eq!(edited.comment(&c.id).unwrap().content, "nicer");

        let removed = edited.remove_comment(&c.id).unwrap();
        assert!(!removed.contains_comment(&c.id));
    }

    #[test]
    fn updaters_leave_input_untouched() {
        let list = CacheValue::Posts(vec![post("a", "u1", "x")]);
        let before = list.clone();
        let _ = list.edit_post(&PostId::new("a"), "changed", None);
        let _ = list.remove_post(&PostId::new("a"));
        assert_eq!(list, before);
    }

    #[test]
    fn restore_reinserts_deleted_post_at_its_index() {
        let prior = CacheValue::Posts(vec![
            post("a", "u1", "x"),
            post("b", "u1", "y"),
            post("c", "u1", "z"),
        ]);
        // "b" was optimistically removed, then someone prepended "n"
        let current = CacheValue::Posts(vec![
            post("n", "u2", "new"),
            post("a", "u1", "x"),
            post("c", "u1", "z"),
        ]);

        let restored =
            restore_entity(Some(&current), Some(&prior), &EntityRef::Post(PostId::new("b")))
                .unwrap();
        assert_eq!(ids(&restored), ["n", "b", "a", "c"]);
    }

    #[test]
    fn restore_removes_entity_absent_before() {
        let prior = CacheValue::Posts(vec![post("a", "u1", "x")]);
        let current = CacheValue::Posts(vec![post("tmp-1", "u1", "new"), post("a", "u1", "x")]);
        let restored = restore_entity(
            Some(&current),
            Some(&prior),
            &EntityRef::Post(PostId::new("tmp-1")),
        )
        .unwrap();
        assert_eq!(ids(&restored), ["a"]);
    }

    #[test]
    fn restore_comment_content() {
        let original = comment("c1", "a", "before");
        let prior = CacheValue::Post(with_comments(post("a", "u1", "x"), vec![original.clone()]));
        let current = prior.edit_comment(&original.id, "after").unwrap();

        let restored = restore_entity(
            Some(&current),
            Some(&prior),
            &EntityRef::comment(original.id.clone(), PostId::new("a")),
        )
        .unwrap();
        assert_eq!(restored, prior);
    }
}
