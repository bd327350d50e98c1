//! In-memory [`ContentStore`]. Used when `DATABASE_URL` is unset and by tests.
//! Mirrors the Postgres backend: newest-first ordering, unique slugs/emails
//! reported with the same constraint names.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ContentStore, StoreError, StoreResult, CATEGORY_SLUG_KEY, CATEGORY_TITLE_KEY,
    NEWSLETTER_EMAIL_KEY, POST_SLUG_KEY,
};
use crate::blog::mapping::{
    apply_category_columns, apply_post_columns, CategoryColumn, ColumnSet, PostColumn,
};
use crate::blog::PostFilter;
use crate::db::models::{
    AdminUser, BlogCategoryRow, BlogPostRow, ContactSubmission, NewContact,
    NewsletterSubscription,
};
use crate::pagination::Pagination;

#[derive(Default)]
struct Tables {
    posts: Vec<BlogPostRow>,
    categories: Vec<BlogCategoryRow>,
    contacts: Vec<ContactSubmission>,
    subscriptions: Vec<NewsletterSubscription>,
    admins: Vec<AdminUser>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

/// Constraint `row` would break against the other categories.
fn category_clash(categories: &[BlogCategoryRow], row: &BlogCategoryRow) -> Option<&'static str> {
    let others = || categories.iter().filter(|c| c.id != row.id);
    if others().any(|c| c.slug == row.slug) {
        Some(CATEGORY_SLUG_KEY)
    } else if others().any(|c| c.title.to_lowercase() == row.title.to_lowercase()) {
        Some(CATEGORY_TITLE_KEY)
    } else {
        None
    }
}

fn page_of<T: Clone>(rows: Vec<T>, range: Option<Pagination>) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    match range {
        Some(range) => (range.slice(&rows), total),
        None => (rows, total),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the built-in categories and, when given, one admin.
    pub fn seeded(admin: Option<(&str, &str)>) -> Self {
        let mut tables = Tables::default();
        for category in crate::blog::category::DEFAULT_CATEGORIES {
            tables.categories.push(BlogCategoryRow {
                id: Uuid::new_v4(),
                title: category.title.to_string(),
                slug: category.slug.to_string(),
                description: Some(category.description.to_string()),
                long_description: Some(category.long_description.to_string()),
                icon: Some(category.icon.to_string()),
                created_at: Utc::now(),
            });
        }
        if let Some((email, password_hash)) = admin {
            tables.admins.push(AdminUser {
                id: Uuid::new_v4().to_string(),
                email: email.to_lowercase(),
                password_hash: password_hash.to_string(),
                role: crate::session::ADMIN_ROLE.to_string(),
                is_active: true,
                last_login_at: None,
                last_login_ip: None,
            });
        }
        Self {
            tables: RwLock::new(tables),
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<Duration> {
        let start = Instant::now();
        let _ = self.tables.read().await;
        Ok(start.elapsed())
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        range: Option<Pagination>,
    ) -> StoreResult<(Vec<BlogPostRow>, i64)> {
        let tables = self.tables.read().await;
        let rows: Vec<BlogPostRow> = tables
            .posts
            .iter()
            .filter(|p| match &filter.category {
                Some(title) => p.category.as_deref() == Some(title.as_str()),
                None => true,
            })
            .filter(|p| match filter.featured {
                Some(featured) => p.featured.unwrap_or(false) == featured,
                None => true,
            })
            .filter(|p| match &filter.search {
                Some(term) => {
                    contains_ci(&p.title, term)
                        || p.excerpt.as_deref().is_some_and(|e| contains_ci(e, term))
                }
                None => true,
            })
            .cloned()
            .collect();
        Ok(page_of(rows, range))
    }

    async fn post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPostRow>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn post_by_id(&self, id: Uuid) -> StoreResult<Option<BlogPostRow>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != except))
    }

    async fn insert_post(&self, columns: &ColumnSet<PostColumn>) -> StoreResult<BlogPostRow> {
        let now = Utc::now();
        let mut row = BlogPostRow {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        };
        apply_post_columns(&mut row, columns);

        let mut tables = self.tables.write().await;
        if tables.posts.iter().any(|p| p.slug == row.slug) {
            return Err(unique(POST_SLUG_KEY));
        }
        tables.posts.insert(0, row.clone());
        Ok(row)
    }

    async fn update_post(
        &self,
        id: Uuid,
        columns: &ColumnSet<PostColumn>,
    ) -> StoreResult<Option<BlogPostRow>> {
        let mut tables = self.tables.write().await;
        let Some(index) = tables.posts.iter().position(|p| p.id == id) else {
            return Ok(None);
        };

        let mut updated = tables.posts[index].clone();
        apply_post_columns(&mut updated, columns);
        if tables
            .posts
            .iter()
            .any(|p| p.id != id && p.slug == updated.slug)
        {
            return Err(unique(POST_SLUG_KEY));
        }
        updated.updated_at = Utc::now();
        tables.posts[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        Ok(tables.posts.len() < before)
    }

    async fn rename_post_category(&self, from: &str, to: &str) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut renamed = 0;
        for post in tables
            .posts
            .iter_mut()
            .filter(|p| p.category.as_deref() == Some(from))
        {
            post.category = Some(to.to_string());
            renamed += 1;
        }
        Ok(renamed)
    }

    async fn list_categories(&self) -> StoreResult<Vec<BlogCategoryRow>> {
        let tables = self.tables.read().await;
        let mut rows = tables.categories.clone();
        rows.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(rows)
    }

    async fn category_by_id(&self, id: Uuid) -> StoreResult<Option<BlogCategoryRow>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_category(
        &self,
        columns: &ColumnSet<CategoryColumn>,
    ) -> StoreResult<BlogCategoryRow> {
        let mut row = BlogCategoryRow {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            ..Default::default()
        };
        apply_category_columns(&mut row, columns);

        let mut tables = self.tables.write().await;
        if let Some(constraint) = category_clash(&tables.categories, &row) {
            return Err(unique(constraint));
        }
        tables.categories.push(row.clone());
        Ok(row)
    }

    async fn update_category(
        &self,
        id: Uuid,
        columns: &ColumnSet<CategoryColumn>,
    ) -> StoreResult<Option<BlogCategoryRow>> {
        let mut tables = self.tables.write().await;
        let Some(index) = tables.categories.iter().position(|c| c.id == id) else {
            return Ok(None);
        };

        let mut updated = tables.categories[index].clone();
        apply_category_columns(&mut updated, columns);
        if let Some(constraint) = category_clash(&tables.categories, &updated) {
            return Err(unique(constraint));
        }
        tables.categories[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok(tables.categories.len() < before)
    }

    async fn insert_contact(&self, contact: &NewContact) -> StoreResult<ContactSubmission> {
        let row = ContactSubmission {
            id: Uuid::new_v4(),
            name: contact.name.clone(),
            email: contact.email.clone(),
            message: contact.message.clone(),
            created_at: Utc::now(),
        };
        self.tables.write().await.contacts.insert(0, row.clone());
        Ok(row)
    }

    async fn list_contacts(
        &self,
        search: Option<&str>,
        range: Pagination,
    ) -> StoreResult<(Vec<ContactSubmission>, i64)> {
        let tables = self.tables.read().await;
        let rows: Vec<ContactSubmission> = tables
            .contacts
            .iter()
            .filter(|c| match search {
                Some(term) => {
                    contains_ci(&c.name, term)
                        || contains_ci(&c.email, term)
                        || contains_ci(&c.message, term)
                }
                None => true,
            })
            .cloned()
            .collect();
        Ok(page_of(rows, Some(range)))
    }

    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.contacts.len();
        tables.contacts.retain(|c| c.id != id);
        Ok(tables.contacts.len() < before)
    }

    async fn insert_subscription(&self, email: &str) -> StoreResult<NewsletterSubscription> {
        let mut tables = self.tables.write().await;
        if tables.subscriptions.iter().any(|s| s.email == email) {
            return Err(unique(NEWSLETTER_EMAIL_KEY));
        }
        let row = NewsletterSubscription {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        tables.subscriptions.insert(0, row.clone());
        Ok(row)
    }

    async fn list_subscriptions(
        &self,
        search: Option<&str>,
        range: Pagination,
    ) -> StoreResult<(Vec<NewsletterSubscription>, i64)> {
        let tables = self.tables.read().await;
        let rows: Vec<NewsletterSubscription> = tables
            .subscriptions
            .iter()
            .filter(|s| match search {
                Some(term) => contains_ci(&s.email, term),
                None => true,
            })
            .cloned()
            .collect();
        Ok(page_of(rows, Some(range)))
    }

    async fn delete_subscription(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.subscriptions.len();
        tables.subscriptions.retain(|s| s.id != id);
        Ok(tables.subscriptions.len() < before)
    }

    async fn find_admin(&self, email: &str) -> StoreResult<Option<AdminUser>> {
        let tables = self.tables.read().await;
        Ok(tables
            .admins
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn record_login(&self, admin_id: &str, ip: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(admin) = tables.admins.iter_mut().find(|a| a.id == admin_id) {
            admin.last_login_at = Some(Utc::now());
            admin.last_login_ip = Some(ip.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::mapping::{project, project_new, ColumnValue};
    use crate::blog::{NewPost, PostPatch};

    fn new_post(title: &str, slug: &str, category: &str) -> ColumnSet<PostColumn> {
        project_new(
            &NewPost {
                title: title.into(),
                category: category.into(),
                ..Default::default()
            },
            slug,
        )
    }

    #[tokio::test]
    async fn test_posts_listed_newest_first() {
        let store = MemoryStore::new();
        store.insert_post(&new_post("One", "one", "Investing")).await.unwrap();
        store.insert_post(&new_post("Two", "two", "Investing")).await.unwrap();
        let (rows, total) = store.list_posts(&PostFilter::default(), None).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].slug, "two");
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_unique_violation() {
        let store = MemoryStore::new();
        store.insert_post(&new_post("One", "same", "Taxes")).await.unwrap();
        let err = store
            .insert_post(&new_post("Two", "same", "Taxes"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref constraint } if constraint == POST_SLUG_KEY));
    }

    #[tokio::test]
    async fn test_update_into_taken_slug_is_rejected() {
        let store = MemoryStore::new();
        store.insert_post(&new_post("One", "one", "Taxes")).await.unwrap();
        let two = store.insert_post(&new_post("Two", "two", "Taxes")).await.unwrap();
        let patch = PostPatch {
            slug: Some("one".into()),
            ..Default::default()
        };
        assert!(store.update_post(two.id, &project(&patch)).await.is_err());
    }

    #[tokio::test]
    async fn test_update_missing_post_returns_none() {
        let store = MemoryStore::new();
        let patch = PostPatch {
            title: Some("x".into()),
            ..Default::default()
        };
        assert!(store
            .update_post(Uuid::new_v4(), &project(&patch))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_subscription_email_unique() {
        let store = MemoryStore::new();
        store.insert_subscription("a@b.co").await.unwrap();
        let err = store.insert_subscription("a@b.co").await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_rename_category_repoints_posts() {
        let store = MemoryStore::new();
        store.insert_post(&new_post("One", "one", "Taxes")).await.unwrap();
        store.insert_post(&new_post("Two", "two", "Investing")).await.unwrap();
        assert_eq!(store.rename_post_category("Taxes", "Tax Tips").await.unwrap(), 1);
        let filter = PostFilter {
            category: Some("Tax Tips".into()),
            ..Default::default()
        };
        assert_eq!(store.list_posts(&filter, None).await.unwrap().1, 1);
    }

    #[tokio::test]
    async fn test_category_titles_are_unique_ignoring_case() {
        let store = MemoryStore::new();
        let mut columns = ColumnSet::new();
        columns.set(CategoryColumn::Title, ColumnValue::Text(Some("Taxes".into())));
        columns.set(CategoryColumn::Slug, ColumnValue::Text(Some("taxes".into())));
        let taxes = store.insert_category(&columns).await.unwrap();

        columns.set(CategoryColumn::Title, ColumnValue::Text(Some("TAXES".into())));
        columns.set(CategoryColumn::Slug, ColumnValue::Text(Some("taxes-2".into())));
        let err = store.insert_category(&columns).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref constraint } if constraint == CATEGORY_TITLE_KEY));

        // Re-saving its own title is not a clash.
        let mut same = ColumnSet::new();
        same.set(CategoryColumn::Title, ColumnValue::Text(Some("Taxes".into())));
        assert!(store.update_category(taxes.id, &same).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_seeded_store_has_categories_and_admin() {
        let store = MemoryStore::seeded(Some(("Admin@Finance90.com", "hash")));
        assert!(!store.list_categories().await.unwrap().is_empty());
        assert!(store.find_admin("admin@finance90.com").await.unwrap().is_some());
    }
}
