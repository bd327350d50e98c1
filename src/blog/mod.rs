/*!
 * Blog Module
 * Client-facing post/category shapes, the storage translator and the query layer
 */
pub mod category;
pub mod mapping;
pub mod queries;
pub mod slug;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author shown when a post row carries none.
pub const DEFAULT_AUTHOR: &str = "Finance90 Team";

/// Blog post in the client (camelCase) shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    /// Category *title*, not id.
    pub category: String,
    pub author: String,
    /// Display string, e.g. "March 3, 2025".
    pub date: String,
    pub image_url: String,
    pub featured: bool,
    pub meta_title: String,
    pub meta_description: String,
}

/// Request body for creating a post. `slug` is generated from the title when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category: String,
    pub author: Option<String>,
    pub date: Option<String>,
    pub image_url: Option<String>,
    pub featured: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// Partial update. Absent fields are left untouched in storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub image_url: Option<String>,
    pub featured: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.excerpt.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.author.is_none()
            && self.date.is_none()
            && self.image_url.is_none()
            && self.featured.is_none()
            && self.meta_title.is_none()
            && self.meta_description.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogCategory {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub long_description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub icon: Option<String>,
}

/// Storage-level post filter. `category` matches the stored title exactly.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
}
