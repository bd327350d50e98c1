/**
 * Logs Route Handler
 * Endpoint for receiving client logs from the site
 */

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use tower_http::request_id::RequestId;

use crate::logging::config::{
    ClientLogBatch, ClientLogEntry, LogBatchReceipt, LogLevel, MAX_BATCH_SIZE, MAX_MESSAGE_CHARS,
};

/// POST /api/logs - Re-emit client events through the server log
#[tracing::instrument(skip_all, fields(batch_size = batch.logs.len()))]
pub async fn receive_client_logs(
    request_id: Option<Extension<RequestId>>,
    Json(batch): Json<ClientLogBatch>,
) -> impl IntoResponse {
    let req_id = request_id
        .as_ref()
        .and_then(|ext| ext.0.header_value().to_str().ok())
        .unwrap_or("unknown");

    let mut accepted = 0;
    for entry in batch.logs.iter().take(MAX_BATCH_SIZE) {
        match check_entry(entry) {
            Ok(()) => {
                emit(entry, req_id);
                accepted += 1;
            }
            Err(reason) => tracing::debug!(request_id = %req_id, reason, "skipped client log"),
        }
    }

    let receipt = LogBatchReceipt {
        received: batch.logs.len(),
        accepted,
        dropped: batch.logs.len().saturating_sub(MAX_BATCH_SIZE),
    };
    if receipt.dropped > 0 {
        tracing::warn!(
            request_id = %req_id,
            dropped = receipt.dropped,
            "client log batch over limit"
        );
    }

    (StatusCode::ACCEPTED, Json(receipt))
}

fn check_entry(entry: &ClientLogEntry) -> Result<(), &'static str> {
    if entry.message.trim().is_empty() {
        return Err("empty message");
    }
    if entry.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err("message too long");
    }
    Ok(())
}

fn emit(entry: &ClientLogEntry, request_id: &str) {
    let span = tracing::info_span!(
        "client",
        request_id = %request_id,
        page = entry.page.as_deref().unwrap_or("-"),
        action = entry.action.as_deref().unwrap_or("-"),
        at = %entry.timestamp,
    );
    let _enter = span.enter();

    match entry.level {
        LogLevel::Debug => tracing::debug!(detail = ?entry.detail, "{}", entry.message),
        LogLevel::Info => tracing::info!(detail = ?entry.detail, "{}", entry.message),
        LogLevel::Warn => tracing::warn!(detail = ?entry.detail, "{}", entry.message),
        LogLevel::Error => tracing::error!(detail = ?entry.detail, "{}", entry.message),
    }
}
