/*!
 * Store Module
 * Persistence seam for posts, categories, leads and admin users
 */
pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::blog::mapping::{CategoryColumn, ColumnSet, PostColumn};
use crate::blog::PostFilter;
use crate::db::models::{
    AdminUser, BlogCategoryRow, BlogPostRow, ContactSubmission, NewContact,
    NewsletterSubscription,
};
use crate::pagination::Pagination;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Unique constraint names, shared by both backends so errors map identically.
pub const POST_SLUG_KEY: &str = "blog_posts_slug_key";
pub const CATEGORY_SLUG_KEY: &str = "blog_categories_slug_key";
/// Case-insensitive; posts reference categories by title.
pub const CATEGORY_TITLE_KEY: &str = "blog_categories_title_key";
pub const NEWSLETTER_EMAIL_KEY: &str = "newsletter_subscriptions_email_key";

const UNIQUE_VIOLATION: &str = "23505";
const INSUFFICIENT_PRIVILEGE: &str = "42501";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("permission denied")]
    PermissionDenied,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return StoreError::UniqueViolation {
                        constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    };
                }
                Some(INSUFFICIENT_PRIVILEGE) => return StoreError::PermissionDenied,
                _ => {}
            }
        }

        if matches!(
            err,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
        ) {
            return StoreError::Unavailable(err.to_string());
        }

        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything the HTTP layer needs from persistence.
///
/// Lists are ordered newest first. `range: None` on [`ContentStore::list_posts`]
/// returns the whole filtered set.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short backend name for health output.
    fn backend(&self) -> &'static str;

    /// Round-trip latency to the backing store.
    async fn ping(&self) -> StoreResult<Duration>;

    // posts

    async fn list_posts(
        &self,
        filter: &PostFilter,
        range: Option<Pagination>,
    ) -> StoreResult<(Vec<BlogPostRow>, i64)>;

    async fn post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPostRow>>;

    async fn post_by_id(&self, id: Uuid) -> StoreResult<Option<BlogPostRow>>;

    /// Whether `slug` belongs to a post other than `except`.
    async fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> StoreResult<bool>;

    async fn insert_post(&self, columns: &ColumnSet<PostColumn>) -> StoreResult<BlogPostRow>;

    async fn update_post(
        &self,
        id: Uuid,
        columns: &ColumnSet<PostColumn>,
    ) -> StoreResult<Option<BlogPostRow>>;

    async fn delete_post(&self, id: Uuid) -> StoreResult<bool>;

    /// Re-point every post carrying category title `from` to `to`.
    async fn rename_post_category(&self, from: &str, to: &str) -> StoreResult<u64>;

    // categories

    async fn list_categories(&self) -> StoreResult<Vec<BlogCategoryRow>>;

    async fn category_by_id(&self, id: Uuid) -> StoreResult<Option<BlogCategoryRow>>;

    async fn insert_category(
        &self,
        columns: &ColumnSet<CategoryColumn>,
    ) -> StoreResult<BlogCategoryRow>;

    async fn update_category(
        &self,
        id: Uuid,
        columns: &ColumnSet<CategoryColumn>,
    ) -> StoreResult<Option<BlogCategoryRow>>;

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool>;

    // leads

    async fn insert_contact(&self, contact: &NewContact) -> StoreResult<ContactSubmission>;

    async fn list_contacts(
        &self,
        search: Option<&str>,
        range: Pagination,
    ) -> StoreResult<(Vec<ContactSubmission>, i64)>;

    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool>;

    /// Fails with [`StoreError::UniqueViolation`] on a repeated email.
    async fn insert_subscription(&self, email: &str) -> StoreResult<NewsletterSubscription>;

    async fn list_subscriptions(
        &self,
        search: Option<&str>,
        range: Pagination,
    ) -> StoreResult<(Vec<NewsletterSubscription>, i64)>;

    async fn delete_subscription(&self, id: Uuid) -> StoreResult<bool>;

    // admins

    /// Case-insensitive lookup.
    async fn find_admin(&self, email: &str) -> StoreResult<Option<AdminUser>>;

    async fn record_login(&self, admin_id: &str, ip: &str) -> StoreResult<()>;
}

/// `%term%` with LIKE wildcards in `term` escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
