//! Wire types for `POST /api/logs`.

use serde::{Deserialize, Serialize};

/// Entries accepted per batch; the rest are dropped.
pub const MAX_BATCH_SIZE: usize = 100;

/// Longest client message re-emitted verbatim.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Severity as sent by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One client-side event, usually a failed form submission or admin action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientLogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    /// Client route the entry was raised on, e.g. `/admin/posts/new`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Operation that failed, e.g. `newsletter.subscribe`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientLogBatch {
    pub logs: Vec<ClientLogEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogBatchReceipt {
    pub received: usize,
    pub accepted: usize,
    /// Entries past [`MAX_BATCH_SIZE`].
    pub dropped: usize,
}
