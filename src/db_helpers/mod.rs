use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    errors::RequestError,
    expiry::ExpiryCheck,
    models::{
        Comment, CommentWithAuthor, NewPost, NewUser, Post, PostChanges, PostDetails, Tag,
        TagRemoval, User,
    },
};

mod comment_helpers;
mod post_helpers;
mod tag_helpers;
mod user_helpers;


pub type DbResult<T> = Result<T, RequestError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &NewUser, now: DateTime<Utc>) -> DbResult<User>;

    async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>>;

    async fn get_user_by_id(&self, id: i64) -> DbResult<Option<User>>;

    /// Removes the user along with their posts and comments.
    async fn delete_user(&self, id: i64) -> DbResult<bool>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts, optionally restricted to those carrying `tag_id`.
    async fn list_posts(&self, tag_id: Option<i64>) -> DbResult<Vec<PostDetails>>;

    async fn get_post(&self, id: i64) -> DbResult<Option<Post>>;

    async fn get_post_details(&self, id: i64) -> DbResult<Option<PostDetails>>;

    /// Persists the post with its tags. The returned check must be handed to
    /// the expiry queue; the store never schedules anything itself.
    async fn create_post(
        &self,
        owner_id: i64,
        post: NewPost,
        now: DateTime<Utc>,
    ) -> DbResult<(PostDetails, ExpiryCheck)>;

    async fn update_post(
        &self,
        id: i64,
        changes: PostChanges,
        now: DateTime<Utc>,
    ) -> DbResult<PostDetails>;

    /// Returns false when the post was already gone.
    async fn delete_post(&self, id: i64) -> DbResult<bool>;

    /// `(id, created_at)` of every post, for the expiry sweep.
    async fn list_post_ages(&self) -> DbResult<Vec<(i64, DateTime<Utc>)>>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn list_tags(&self) -> DbResult<Vec<Tag>>;

    async fn get_tag(&self, id: i64) -> DbResult<Option<Tag>>;

    /// Plain insert. A name that already exists surfaces as a unique violation.
    async fn insert_tag(&self, name: &str, now: DateTime<Utc>) -> DbResult<Tag>;

    async fn tags_for_post(&self, post_id: i64) -> DbResult<Vec<Tag>>;

    /// Detaches the tag unless it is the post's last one. The check and the
    /// delete happen atomically, so concurrent removals cannot strip every tag.
    async fn remove_tag_from_post(&self, post_id: i64, tag_id: i64) -> DbResult<TagRemoval>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn list_comments(&self, post_id: i64) -> DbResult<Vec<CommentWithAuthor>>;

    async fn get_comment(&self, post_id: i64, id: i64) -> DbResult<Option<Comment>>;

    async fn insert_comment(
        &self,
        post_id: i64,
        user_id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> DbResult<CommentWithAuthor>;

    async fn update_comment(
        &self,
        id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> DbResult<CommentWithAuthor>;

    async fn delete_comment(&self, id: i64) -> DbResult<bool>;
}

/// Everything the handlers and background jobs need from persistence.
pub trait Store: UserStore + PostStore + TagStore + CommentStore {}

impl<T> Store for T where T: UserStore + PostStore + TagStore + CommentStore {}

/// SQLite-backed [`Store`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
