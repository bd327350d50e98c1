//! Translation between the client shape (`BlogPost`, camelCase) and storage rows
//! (`imageurl`, `meta_title`, ...).
//!
//! Reads go through [`hydrate`], which never fails and fills defaults. Writes go
//! through [`project`], which only emits the columns a patch actually carries.

use chrono::Utc;

use super::{
    BlogCategory, BlogPost, CategoryPatch, NewCategory, NewPost, PostPatch, DEFAULT_AUTHOR,
};
use crate::db::models::{BlogCategoryRow, BlogPostRow};

/// Display format of the `date` column.
pub const DATE_FORMAT: &str = "%B %-d, %Y";

pub trait Column: Copy {
    /// Storage column name.
    fn name(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostColumn {
    Slug,
    Title,
    Excerpt,
    Content,
    Category,
    Author,
    Date,
    ImageUrl,
    Featured,
    MetaTitle,
    MetaDescription,
}

impl Column for PostColumn {
    fn name(self) -> &'static str {
        match self {
            PostColumn::Slug => "slug",
            PostColumn::Title => "title",
            PostColumn::Excerpt => "excerpt",
            PostColumn::Content => "content",
            PostColumn::Category => "category",
            PostColumn::Author => "author",
            PostColumn::Date => "date",
            PostColumn::ImageUrl => "imageurl",
            PostColumn::Featured => "featured",
            PostColumn::MetaTitle => "meta_title",
            PostColumn::MetaDescription => "meta_description",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryColumn {
    Title,
    Slug,
    Description,
    LongDescription,
    Icon,
}

impl Column for CategoryColumn {
    fn name(self) -> &'static str {
        match self {
            CategoryColumn::Title => "title",
            CategoryColumn::Slug => "slug",
            CategoryColumn::Description => "description",
            CategoryColumn::LongDescription => "long_description",
            CategoryColumn::Icon => "icon",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(Option<String>),
    Bool(bool),
}

impl ColumnValue {
    pub fn as_text(&self) -> Option<String> {
        match self {
            ColumnValue::Text(v) => v.clone(),
            ColumnValue::Bool(b) => Some(b.to_string()),
        }
    }
}

/// Ordered column assignments produced by a projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSet<C> {
    assignments: Vec<(C, ColumnValue)>,
}

impl<C: Column + PartialEq> ColumnSet<C> {
    pub fn new() -> Self {
        Self {
            assignments: Vec::new(),
        }
    }

    pub fn set(&mut self, column: C, value: ColumnValue) {
        if let Some(slot) = self.assignments.iter_mut().find(|(c, _)| *c == column) {
            slot.1 = value;
        } else {
            self.assignments.push((column, value));
        }
    }

    fn text(&mut self, column: C, value: Option<&String>) {
        if let Some(v) = value {
            self.set(column, ColumnValue::Text(non_empty(v)));
        }
    }

    pub fn get(&self, column: C) -> Option<&ColumnValue> {
        self.assignments
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(C, ColumnValue)> {
        self.assignments.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }
}

impl<C: Column + PartialEq> Default for ColumnSet<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn or_fallback(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Storage row -> client post. Total: substitutes defaults, never fails.
pub fn hydrate(row: BlogPostRow) -> BlogPost {
    let excerpt = row.excerpt.unwrap_or_default();
    let date = or_fallback(row.date, &row.created_at.format(DATE_FORMAT).to_string());

    BlogPost {
        id: row.id,
        meta_title: or_fallback(row.meta_title, &row.title),
        meta_description: or_fallback(row.meta_description, &excerpt),
        slug: row.slug,
        title: row.title,
        excerpt,
        content: row.content.unwrap_or_default(),
        category: row.category.unwrap_or_default(),
        author: or_fallback(row.author, DEFAULT_AUTHOR),
        date,
        image_url: row.imageurl.unwrap_or_default(),
        featured: row.featured.unwrap_or(false),
    }
}

/// Partial client update -> column assignments for only the fields present.
pub fn project(patch: &PostPatch) -> ColumnSet<PostColumn> {
    let mut set = ColumnSet::new();
    set.text(PostColumn::Title, patch.title.as_ref());
    set.text(PostColumn::Slug, patch.slug.as_ref());
    set.text(PostColumn::Excerpt, patch.excerpt.as_ref());
    set.text(PostColumn::Content, patch.content.as_ref());
    set.text(PostColumn::Category, patch.category.as_ref());
    set.text(PostColumn::Author, patch.author.as_ref());
    set.text(PostColumn::Date, patch.date.as_ref());
    set.text(PostColumn::ImageUrl, patch.image_url.as_ref());
    if let Some(featured) = patch.featured {
        set.set(PostColumn::Featured, ColumnValue::Bool(featured));
    }
    set.text(PostColumn::MetaTitle, patch.meta_title.as_ref());
    set.text(PostColumn::MetaDescription, patch.meta_description.as_ref());
    set
}

/// Full projection for inserts. Every column is assigned; `slug` is the resolved one.
pub fn project_new(post: &NewPost, slug: &str) -> ColumnSet<PostColumn> {
    let mut set = project(&PostPatch {
        title: Some(post.title.clone()),
        slug: Some(slug.to_string()),
        excerpt: post.excerpt.clone(),
        content: post.content.clone(),
        category: Some(post.category.clone()),
        author: post.author.clone(),
        date: post.date.clone(),
        image_url: post.image_url.clone(),
        featured: post.featured,
        meta_title: post.meta_title.clone(),
        meta_description: post.meta_description.clone(),
    });

    for column in [
        PostColumn::Excerpt,
        PostColumn::Content,
        PostColumn::Author,
        PostColumn::ImageUrl,
        PostColumn::MetaTitle,
        PostColumn::MetaDescription,
    ] {
        if set.get(column).is_none() {
            set.set(column, ColumnValue::Text(None));
        }
    }
    if set.get(PostColumn::Date).is_none() {
        set.set(
            PostColumn::Date,
            ColumnValue::Text(Some(Utc::now().format(DATE_FORMAT).to_string())),
        );
    }
    if set.get(PostColumn::Featured).is_none() {
        set.set(PostColumn::Featured, ColumnValue::Bool(false));
    }
    set
}

/// Apply assignments to an in-memory row, mirroring what an SQL `UPDATE` does.
pub fn apply_post_columns(row: &mut BlogPostRow, set: &ColumnSet<PostColumn>) {
    for (column, value) in set.iter() {
        match (column, value) {
            (PostColumn::Featured, ColumnValue::Bool(b)) => row.featured = Some(*b),
            (PostColumn::Featured, ColumnValue::Text(v)) => {
                row.featured = v.as_deref().map(|s| s == "true")
            }
            (PostColumn::Slug, v) => row.slug = v.as_text().unwrap_or_default(),
            (PostColumn::Title, v) => row.title = v.as_text().unwrap_or_default(),
            (PostColumn::Excerpt, v) => row.excerpt = v.as_text(),
            (PostColumn::Content, v) => row.content = v.as_text(),
            (PostColumn::Category, v) => row.category = v.as_text(),
            (PostColumn::Author, v) => row.author = v.as_text(),
            (PostColumn::Date, v) => row.date = v.as_text(),
            (PostColumn::ImageUrl, v) => row.imageurl = v.as_text(),
            (PostColumn::MetaTitle, v) => row.meta_title = v.as_text(),
            (PostColumn::MetaDescription, v) => row.meta_description = v.as_text(),
        }
    }
}

pub fn hydrate_category(row: BlogCategoryRow) -> BlogCategory {
    let description = row.description.unwrap_or_default();
    BlogCategory {
        id: row.id,
        title: row.title,
        slug: row.slug,
        long_description: or_fallback(row.long_description, &description),
        description,
        icon: row.icon.unwrap_or_default(),
    }
}

pub fn project_category(patch: &CategoryPatch) -> ColumnSet<CategoryColumn> {
    let mut set = ColumnSet::new();
    set.text(CategoryColumn::Title, patch.title.as_ref());
    set.text(CategoryColumn::Slug, patch.slug.as_ref());
    set.text(CategoryColumn::Description, patch.description.as_ref());
    set.text(CategoryColumn::LongDescription, patch.long_description.as_ref());
    set.text(CategoryColumn::Icon, patch.icon.as_ref());
    set
}

pub fn project_new_category(category: &NewCategory, slug: &str) -> ColumnSet<CategoryColumn> {
    let mut set = project_category(&CategoryPatch {
        title: Some(category.title.clone()),
        slug: Some(slug.to_string()),
        description: category.description.clone(),
        long_description: category.long_description.clone(),
        icon: category.icon.clone(),
    });
    for column in [
        CategoryColumn::Description,
        CategoryColumn::LongDescription,
        CategoryColumn::Icon,
    ] {
        if set.get(column).is_none() {
            set.set(column, ColumnValue::Text(None));
        }
    }
    set
}

pub fn apply_category_columns(row: &mut BlogCategoryRow, set: &ColumnSet<CategoryColumn>) {
    for (column, value) in set.iter() {
        match column {
            CategoryColumn::Title => row.title = value.as_text().unwrap_or_default(),
            CategoryColumn::Slug => row.slug = value.as_text().unwrap_or_default(),
            CategoryColumn::Description => row.description = value.as_text(),
            CategoryColumn::LongDescription => row.long_description = value.as_text(),
            CategoryColumn::Icon => row.icon = value.as_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn stored_row() -> BlogPostRow {
        BlogPostRow {
            id: Uuid::new_v4(),
            slug: "emergency-fund-basics".into(),
            title: "Emergency Fund Basics".into(),
            excerpt: Some("Why three months matters".into()),
            content: Some("<p>Start small.</p>".into()),
            category: Some("Budgeting".into()),
            author: Some("Dana".into()),
            date: Some("January 5, 2025".into()),
            imageurl: Some("/uploads/blog/a.png".into()),
            featured: Some(true),
            meta_title: None,
            meta_description: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_hydrate_applies_seo_fallbacks() {
        let post = hydrate(stored_row());
        assert_eq!(post.meta_title, "Emergency Fund Basics");
        assert_eq!(post.meta_description, "Why three months matters");
        assert_eq!(post.image_url, "/uploads/blog/a.png");
        assert!(post.featured);
    }

    #[test]
    fn test_hydrate_is_total_on_sparse_row() {
        let row = BlogPostRow {
            slug: "bare".into(),
            title: "Bare".into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap(),
            ..Default::default()
        };
        let post = hydrate(row);
        assert_eq!(post.author, DEFAULT_AUTHOR);
        assert_eq!(post.date, "March 9, 2024");
        assert_eq!(post.excerpt, "");
        assert_eq!(post.meta_title, "Bare");
        assert_eq!(post.meta_description, "");
        assert!(!post.featured);
    }

    #[test]
    fn test_project_only_includes_present_fields() {
        let patch = PostPatch {
            title: Some("New title".into()),
            featured: Some(false),
            ..Default::default()
        };
        let set = project(&patch);
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.get(PostColumn::Title),
            Some(&ColumnValue::Text(Some("New title".into())))
        );
        assert_eq!(set.get(PostColumn::Featured), Some(&ColumnValue::Bool(false)));
        assert!(set.get(PostColumn::Content).is_none());
    }

    #[test]
    fn test_project_uses_storage_column_names() {
        let patch = PostPatch {
            image_url: Some("/x.png".into()),
            meta_title: Some("SEO".into()),
            meta_description: Some("Desc".into()),
            ..Default::default()
        };
        let names: Vec<&str> = project(&patch).iter().map(|(c, _)| c.name()).collect();
        assert_eq!(names, vec!["imageurl", "meta_title", "meta_description"]);
    }

    #[test]
    fn test_partial_update_round_trip_restores_supplied_fields() {
        let patch = PostPatch {
            excerpt: Some("Updated excerpt".into()),
            image_url: Some("/uploads/blog/b.webp".into()),
            meta_title: Some("Custom SEO title".into()),
            featured: Some(false),
            ..Default::default()
        };
        let mut row = stored_row();
        apply_post_columns(&mut row, &project(&patch));
        let post = hydrate(row);

        assert_eq!(post.excerpt, "Updated excerpt");
        assert_eq!(post.image_url, "/uploads/blog/b.webp");
        assert_eq!(post.meta_title, "Custom SEO title");
        assert!(!post.featured);
        // untouched
        assert_eq!(post.title, "Emergency Fund Basics");
        assert_eq!(post.content, "<p>Start small.</p>");
        assert_eq!(post.author, "Dana");
    }

    #[test]
    fn test_project_new_assigns_every_column() {
        let new_post = NewPost {
            title: "Roth vs Traditional".into(),
            category: "Retirement Planning".into(),
            ..Default::default()
        };
        let set = project_new(&new_post, "roth-vs-traditional");
        assert_eq!(set.len(), 11);
        assert_eq!(set.get(PostColumn::Featured), Some(&ColumnValue::Bool(false)));
        assert!(matches!(
            set.get(PostColumn::Date),
            Some(ColumnValue::Text(Some(_)))
        ));
    }

    #[test]
    fn test_blank_optional_text_clears_column() {
        let patch = PostPatch {
            meta_description: Some("   ".into()),
            ..Default::default()
        };
        let mut row = stored_row();
        row.meta_description = Some("old".into());
        apply_post_columns(&mut row, &project(&patch));
        assert_eq!(row.meta_description, None);
    }

    #[test]
    fn test_category_long_description_falls_back() {
        let category = hydrate_category(BlogCategoryRow {
            title: "Investing".into(),
            slug: "investing".into(),
            description: Some("Grow wealth".into()),
            ..Default::default()
        });
        assert_eq!(category.long_description, "Grow wealth");
    }
}
