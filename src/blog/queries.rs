//! Blog query layer: every read and write of posts/categories goes through here,
//! so handlers never touch storage rows directly.

use uuid::Uuid;

use super::category::{self, CategoryScope};
use super::mapping::{
    hydrate, hydrate_category, project, project_category, project_new, project_new_category,
};
use super::slug::{
    first_free, is_reserved_post_slug, is_valid_slug, slugify, INVALID_SLUG_MESSAGE,
};
use super::{BlogCategory, BlogPost, CategoryPatch, NewCategory, NewPost, PostFilter, PostPatch};
use crate::error::{ApiResult, AppError};
use crate::pagination::{Page, Pagination};
use crate::store::{ContentStore, StoreError, POST_SLUG_KEY};

/// Sanitize HTML content using ammonia
fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

fn slug_conflict(constraint: &str) -> AppError {
    AppError::Store(StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    })
}

fn require_text(value: &str, field: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

fn check_slug(slug: &str) -> ApiResult<()> {
    if !is_valid_slug(slug) {
        return Err(AppError::bad_request(INVALID_SLUG_MESSAGE));
    }
    Ok(())
}

fn check_post_slug(slug: &str) -> ApiResult<()> {
    check_slug(slug)?;
    if is_reserved_post_slug(slug) {
        return Err(AppError::bad_request(format!("Slug \"{slug}\" is reserved")));
    }
    Ok(())
}

async fn check_category(store: &dyn ContentStore, title: &str) -> ApiResult<()> {
    require_text(title, "Category")?;
    let categories = fetch_categories(store).await?;
    if !category::is_known_title(title.trim(), &categories) {
        return Err(AppError::bad_request(format!("Unknown category: {}", title.trim())));
    }
    Ok(())
}

// ============================================================================
// Posts
// ============================================================================

pub async fn fetch_posts(
    store: &dyn ContentStore,
    filter: &PostFilter,
    pagination: Pagination,
) -> ApiResult<Page<BlogPost>> {
    let (rows, total) = store.list_posts(filter, Some(pagination)).await?;
    Ok(Page::new(rows, pagination, total).map(hydrate))
}

pub async fn fetch_featured_posts(store: &dyn ContentStore, limit: i64) -> ApiResult<Vec<BlogPost>> {
    let filter = PostFilter {
        featured: Some(true),
        ..Default::default()
    };
    let (rows, _) = store
        .list_posts(&filter, Some(Pagination::new(1, limit)))
        .await?;
    Ok(rows.into_iter().map(hydrate).collect())
}

pub async fn resolve_category(store: &dyn ContentStore, slug: &str) -> ApiResult<CategoryScope> {
    let categories = fetch_categories(store).await?;
    Ok(category::resolve(slug, &categories))
}

fn scope_filter(scope: CategoryScope) -> Option<PostFilter> {
    match scope {
        CategoryScope::All => Some(PostFilter::default()),
        CategoryScope::Title(title) => Some(PostFilter {
            category: Some(title),
            ..Default::default()
        }),
        CategoryScope::Unknown => None,
    }
}

/// Every post in the category named by `slug`. `"all"` returns every post; an
/// unknown slug returns an empty list.
pub async fn fetch_posts_by_category(
    store: &dyn ContentStore,
    slug: &str,
) -> ApiResult<Vec<BlogPost>> {
    let Some(filter) = scope_filter(resolve_category(store, slug).await?) else {
        return Ok(Vec::new());
    };
    let (rows, _) = store.list_posts(&filter, None).await?;
    Ok(rows.into_iter().map(hydrate).collect())
}

/// One page of a category listing; `None` when the slug names no category.
pub async fn fetch_category_page(
    store: &dyn ContentStore,
    slug: &str,
    pagination: Pagination,
) -> ApiResult<Option<Page<BlogPost>>> {
    match scope_filter(resolve_category(store, slug).await?) {
        Some(filter) => Ok(Some(fetch_posts(store, &filter, pagination).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_post_by_slug(store: &dyn ContentStore, slug: &str) -> ApiResult<Option<BlogPost>> {
    Ok(store.post_by_slug(slug).await?.map(hydrate))
}

pub async fn fetch_post_by_id(store: &dyn ContentStore, id: Uuid) -> ApiResult<Option<BlogPost>> {
    Ok(store.post_by_id(id).await?.map(hydrate))
}

/// Newest posts sharing `post`'s category, excluding `post` itself.
pub async fn fetch_related_posts(
    store: &dyn ContentStore,
    post: &BlogPost,
    limit: usize,
) -> ApiResult<Vec<BlogPost>> {
    if post.category.is_empty() {
        return Ok(Vec::new());
    }
    let filter = PostFilter {
        category: Some(post.category.clone()),
        ..Default::default()
    };
    let (rows, _) = store
        .list_posts(&filter, Some(Pagination::new(1, limit as i64 + 1)))
        .await?;
    Ok(rows
        .into_iter()
        .filter(|row| row.id != post.id)
        .take(limit)
        .map(hydrate)
        .collect())
}

pub async fn create_post(store: &dyn ContentStore, mut new_post: NewPost) -> ApiResult<BlogPost> {
    require_text(&new_post.title, "Title")?;
    check_category(store, &new_post.category).await?;

    let slug = match new_post.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(explicit) => {
            check_post_slug(explicit)?;
            if store.slug_taken(explicit, None).await? {
                return Err(slug_conflict(POST_SLUG_KEY));
            }
            explicit.to_string()
        }
        None => {
            let base = slugify(&new_post.title);
            first_free(&base, |candidate| async move {
                if is_reserved_post_slug(&candidate) {
                    return Ok(true);
                }
                store.slug_taken(&candidate, None).await
            })
            .await?
        }
    };

    new_post.content = new_post.content.map(|html| sanitize_html(&html));

    let row = store.insert_post(&project_new(&new_post, &slug)).await?;
    tracing::info!(post_id = %row.id, slug = %row.slug, "blog post created");
    Ok(hydrate(row))
}

/// PATCH semantics: only the fields present in `patch` are written. Last write wins.
pub async fn update_post(
    store: &dyn ContentStore,
    id: Uuid,
    mut patch: PostPatch,
) -> ApiResult<BlogPost> {
    if patch.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }
    if let Some(title) = &patch.title {
        require_text(title, "Title")?;
    }
    if let Some(slug) = &patch.slug {
        let slug = slug.trim();
        check_post_slug(slug)?;
        if store.slug_taken(slug, Some(id)).await? {
            return Err(slug_conflict(POST_SLUG_KEY));
        }
    }
    if let Some(category) = &patch.category {
        check_category(store, category).await?;
    }
    patch.content = patch.content.map(|html| sanitize_html(&html));

    let row = store
        .update_post(id, &project(&patch))
        .await?
        .ok_or_else(|| AppError::not_found("Post"))?;
    tracing::info!(post_id = %row.id, "blog post updated");
    Ok(hydrate(row))
}

pub async fn delete_post(store: &dyn ContentStore, id: Uuid) -> ApiResult<()> {
    if !store.delete_post(id).await? {
        return Err(AppError::not_found("Post"));
    }
    tracing::info!(post_id = %id, "blog post deleted");
    Ok(())
}

// ============================================================================
// Categories
// ============================================================================

pub async fn fetch_categories(store: &dyn ContentStore) -> ApiResult<Vec<BlogCategory>> {
    Ok(store
        .list_categories()
        .await?
        .into_iter()
        .map(hydrate_category)
        .collect())
}

pub async fn fetch_category_by_slug(
    store: &dyn ContentStore,
    slug: &str,
) -> ApiResult<Option<BlogCategory>> {
    Ok(fetch_categories(store)
        .await?
        .into_iter()
        .find(|c| c.slug.eq_ignore_ascii_case(slug.trim())))
}

pub async fn create_category(
    store: &dyn ContentStore,
    new_category: NewCategory,
) -> ApiResult<BlogCategory> {
    require_text(&new_category.title, "Title")?;
    let slug = match new_category.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(explicit) => explicit.to_string(),
        None => slugify(&new_category.title),
    };
    check_slug(&slug)?;

    let row = store
        .insert_category(&project_new_category(&new_category, &slug))
        .await?;
    tracing::info!(category_id = %row.id, slug = %row.slug, "blog category created");
    Ok(hydrate_category(row))
}

/// Renaming a category re-points the posts that carried the old title.
pub async fn update_category(
    store: &dyn ContentStore,
    id: Uuid,
    patch: CategoryPatch,
) -> ApiResult<BlogCategory> {
    if let Some(title) = &patch.title {
        require_text(title, "Title")?;
    }
    if let Some(slug) = &patch.slug {
        check_slug(slug.trim())?;
    }
    let columns = project_category(&patch);
    if columns.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }

    let existing = store
        .category_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    let row = store
        .update_category(id, &columns)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;

    if row.title != existing.title {
        let moved = store.rename_post_category(&existing.title, &row.title).await?;
        tracing::info!(
            from = %existing.title,
            to = %row.title,
            posts = moved,
            "category renamed"
        );
    }
    Ok(hydrate_category(row))
}

/// Refuses to delete a category that posts still reference.
pub async fn delete_category(store: &dyn ContentStore, id: Uuid) -> ApiResult<()> {
    let existing = store
        .category_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;

    let filter = PostFilter {
        category: Some(existing.title.clone()),
        ..Default::default()
    };
    let (_, in_use) = store
        .list_posts(&filter, Some(Pagination::new(1, 1)))
        .await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Category \"{}\" still has {in_use} post(s)",
            existing.title
        )));
    }

    store.delete_category(id).await?;
    tracing::info!(category_id = %id, "blog category deleted");
    Ok(())
}
