/**
 * Routes Module
 * API and page route handlers
 */

pub mod auth;
pub mod blog;
pub mod categories;
pub mod contact;
pub mod dashboard;
pub mod health;
pub mod logs;
pub mod newsletter;
pub mod pages;
pub mod rss;
pub mod upload;

use serde::{Deserialize, Serialize};

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Success response (for delete)
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
