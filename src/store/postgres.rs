use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{like_pattern, ContentStore, StoreResult};
use crate::blog::mapping::{CategoryColumn, Column, ColumnSet, ColumnValue, PostColumn};
use crate::blog::PostFilter;
use crate::db::models::{
    AdminUser, BlogCategoryRow, BlogPostRow, ContactSubmission, NewContact,
    NewsletterSubscription,
};
use crate::pagination::Pagination;

const POST_COLUMNS: &str = "id, slug, title, excerpt, content, category, author, date, \
     imageurl, featured, meta_title, meta_description, created_at, updated_at";

const CATEGORY_COLUMNS: &str =
    "id, title, slug, description, long_description, icon, created_at";

const POST_FILTER: &str = r#"
    WHERE ($1::TEXT IS NULL OR category = $1)
      AND ($2::BOOLEAN IS NULL OR featured = $2)
      AND ($3::TEXT IS NULL OR title ILIKE $3 OR excerpt ILIKE $3)
"#;

/// [`ContentStore`] over the Postgres tables created by `db::run_migrations`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_insert<'a, C: Column + PartialEq>(
    qb: &mut QueryBuilder<'a, Postgres>,
    table: &str,
    columns: &ColumnSet<C>,
) {
    qb.push(format!("INSERT INTO {table} ("));
    {
        let mut names = qb.separated(", ");
        for (column, _) in columns.iter() {
            names.push(column.name());
        }
    }
    qb.push(") VALUES (");
    {
        let mut values = qb.separated(", ");
        for (_, value) in columns.iter() {
            match value {
                ColumnValue::Text(text) => values.push_bind(text.clone()),
                ColumnValue::Bool(flag) => values.push_bind(*flag),
            };
        }
    }
    qb.push(")");
}

fn push_assignments<'a, C: Column + PartialEq>(
    qb: &mut QueryBuilder<'a, Postgres>,
    columns: &ColumnSet<C>,
    touch_updated_at: bool,
) {
    let mut sets = qb.separated(", ");
    for (column, value) in columns.iter() {
        sets.push(format!("{} = ", column.name()));
        match value {
            ColumnValue::Text(text) => sets.push_bind_unseparated(text.clone()),
            ColumnValue::Bool(flag) => sets.push_bind_unseparated(*flag),
        };
    }
    if touch_updated_at {
        sets.push("updated_at = now()");
    }
}

#[async_trait]
impl ContentStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<Duration> {
        let start = Instant::now();
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(start.elapsed())
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        range: Option<Pagination>,
    ) -> StoreResult<(Vec<BlogPostRow>, i64)> {
        let search = filter.search.as_deref().map(like_pattern);

        let rows = sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts {POST_FILTER} \
             ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(&filter.category)
        .bind(filter.featured)
        .bind(&search)
        .bind(range.map(|r| r.limit()))
        .bind(range.map(|r| r.offset()))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM blog_posts {POST_FILTER}"))
                .bind(&filter.category)
                .bind(filter.featured)
                .bind(&search)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, total))
    }

    async fn post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPostRow>> {
        let row = sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn post_by_id(&self, id: Uuid) -> StoreResult<Option<BlogPostRow>> {
        let row = sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> StoreResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM blog_posts WHERE slug = $1 AND ($2::UUID IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert_post(&self, columns: &ColumnSet<PostColumn>) -> StoreResult<BlogPostRow> {
        let mut qb = QueryBuilder::new("");
        push_insert(&mut qb, "blog_posts", columns);
        qb.push(" RETURNING ");
        qb.push(POST_COLUMNS);

        let row = qb
            .build_query_as::<BlogPostRow>()
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_post(
        &self,
        id: Uuid,
        columns: &ColumnSet<PostColumn>,
    ) -> StoreResult<Option<BlogPostRow>> {
        let mut qb = QueryBuilder::new("UPDATE blog_posts SET ");
        push_assignments(&mut qb, columns, true);
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" RETURNING ");
        qb.push(POST_COLUMNS);

        let row = qb
            .build_query_as::<BlogPostRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn rename_post_category(&self, from: &str, to: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE blog_posts SET category = $2, updated_at = now() WHERE category = $1",
        )
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_categories(&self) -> StoreResult<Vec<BlogCategoryRow>> {
        let rows = sqlx::query_as::<_, BlogCategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM blog_categories ORDER BY title"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn category_by_id(&self, id: Uuid) -> StoreResult<Option<BlogCategoryRow>> {
        let row = sqlx::query_as::<_, BlogCategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM blog_categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_category(
        &self,
        columns: &ColumnSet<CategoryColumn>,
    ) -> StoreResult<BlogCategoryRow> {
        let mut qb = QueryBuilder::new("");
        push_insert(&mut qb, "blog_categories", columns);
        qb.push(" RETURNING ");
        qb.push(CATEGORY_COLUMNS);

        let row = qb
            .build_query_as::<BlogCategoryRow>()
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_category(
        &self,
        id: Uuid,
        columns: &ColumnSet<CategoryColumn>,
    ) -> StoreResult<Option<BlogCategoryRow>> {
        let mut qb = QueryBuilder::new("UPDATE blog_categories SET ");
        push_assignments(&mut qb, columns, false);
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" RETURNING ");
        qb.push(CATEGORY_COLUMNS);

        let row = qb
            .build_query_as::<BlogCategoryRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM blog_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_contact(&self, contact: &NewContact) -> StoreResult<ContactSubmission> {
        let row = sqlx::query_as::<_, ContactSubmission>(
            r#"
            INSERT INTO contact_submissions (name, email, message)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, message, created_at
            "#,
        )
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.message)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_contacts(
        &self,
        search: Option<&str>,
        range: Pagination,
    ) -> StoreResult<(Vec<ContactSubmission>, i64)> {
        let pattern = search.map(like_pattern);
        let filter = "WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR email ILIKE $1 OR message ILIKE $1)";

        let rows = sqlx::query_as::<_, ContactSubmission>(&format!(
            "SELECT id, name, email, message, created_at FROM contact_submissions {filter} \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(range.limit())
        .bind(range.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM contact_submissions {filter}"))
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, total))
    }

    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM contact_submissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_subscription(&self, email: &str) -> StoreResult<NewsletterSubscription> {
        let row = sqlx::query_as::<_, NewsletterSubscription>(
            r#"
            INSERT INTO newsletter_subscriptions (email)
            VALUES ($1)
            RETURNING id, email, created_at
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_subscriptions(
        &self,
        search: Option<&str>,
        range: Pagination,
    ) -> StoreResult<(Vec<NewsletterSubscription>, i64)> {
        let pattern = search.map(like_pattern);

        let rows = sqlx::query_as::<_, NewsletterSubscription>(
            r#"
            SELECT id, email, created_at FROM newsletter_subscriptions
            WHERE ($1::TEXT IS NULL OR email ILIKE $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(range.limit())
        .bind(range.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM newsletter_subscriptions WHERE ($1::TEXT IS NULL OR email ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    async fn delete_subscription(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM newsletter_subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_admin(&self, email: &str) -> StoreResult<Option<AdminUser>> {
        let row = sqlx::query_as::<_, AdminUser>(
            r#"
            SELECT id, email, password_hash, role, is_active, last_login_at, last_login_ip
            FROM admin_users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn record_login(&self, admin_id: &str, ip: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE admin_users SET last_login_at = now(), last_login_ip = $1, updated_at = now() \
             WHERE id = $2",
        )
        .bind(ip)
        .bind(admin_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
