/**
 * Upload Routes
 * Post cover images written to the upload directory and served under /uploads/blog
 */
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiResult, AppError};
use crate::extractors::AdminSession;
use crate::state::AppState;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Public URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads/blog";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListResponse {
    pub images: Vec<ImageInfo>,
    pub total: usize,
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        _ => "webp",
    }
}

fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains('\0')
}

/// POST /api/admin/uploads
pub async fn upload_image(
    _admin: AdminSession,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let upload_dir = &state.config().upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("failed to create upload directory: {e}")))?;

    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return Err(AppError::bad_request("No file provided")),
        Err(e) => {
            tracing::error!("Multipart error: {}", e);
            return Err(AppError::bad_request("Invalid multipart data"));
        }
    };

    let declared = field.content_type().unwrap_or("").to_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&declared.as_str()) {
        return Err(AppError::bad_request(
            "Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.",
        ));
    }

    let bytes = field.bytes().await.map_err(|e| {
        tracing::error!("Failed to read upload bytes: {}", e);
        AppError::bad_request("Failed to read file data")
    })?;

    if bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::bad_request("File too large. Maximum size is 5MB."));
    }
    if bytes.is_empty() {
        return Err(AppError::bad_request("Empty file"));
    }

    let mime_type = validate_image_magic_bytes(&bytes)
        .ok_or_else(|| AppError::bad_request("File content does not match an allowed image type."))?;
    // jpeg/jpg share a MIME type; any other mismatch is a mislabelled file.
    if mime_type != declared {
        return Err(AppError::bad_request(
            "File content does not match its declared type.",
        ));
    }

    let filename = format!("{}.{}", Uuid::new_v4(), extension_for(mime_type));
    tokio::fs::write(upload_dir.join(&filename), &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("failed to write upload file: {e}")))?;

    tracing::info!("Image uploaded: {} ({} bytes)", filename, bytes.len());

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: format!("{PUBLIC_PREFIX}/{filename}"),
            filename,
            size: bytes.len(),
            mime_type: mime_type.to_string(),
        }),
    ))
}

/// DELETE /api/admin/uploads/{filename}
pub async fn delete_image(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<StatusCode> {
    if !is_safe_filename(&filename) {
        return Err(AppError::bad_request("Invalid filename"));
    }

    let file_path = state.config().upload_dir.join(&filename);
    match tokio::fs::remove_file(&file_path).await {
        Ok(()) => {
            tracing::info!("Image deleted: {}", filename);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::not_found("File")),
        Err(e) => Err(AppError::Internal(format!(
            "failed to delete file {filename}: {e}"
        ))),
    }
}

/// GET /api/admin/uploads
pub async fn list_images(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<ImageListResponse>> {
    let upload_dir = &state.config().upload_dir;
    let mut entries = match tokio::fs::read_dir(upload_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Json(ImageListResponse {
                images: vec![],
                total: 0,
            }));
        }
        Err(e) => return Err(AppError::Internal(format!("failed to list images: {e}"))),
    };

    let mut images = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };

        // Only list image files
        let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };

        let created_at = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map(|t| {
                let dt: chrono::DateTime<chrono::Utc> = t.into();
                dt.to_rfc3339()
            })
            .unwrap_or_default();

        images.push(ImageInfo {
            url: format!("{PUBLIC_PREFIX}/{filename}"),
            filename,
            size: metadata.len(),
            created_at,
        });
    }

    // Sort by created_at descending
    images.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = images.len();
    Ok(Json(ImageListResponse { images, total }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::routes::ErrorResponse;
    use crate::testing::{admin_bearer, empty_request, send, send_json, test_config};
    use axum::body::Body;
    use axum::http::{Method, Request};
    use axum::routing::{delete, post};
    use axum::Router;
    use std::sync::Arc;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const BOUNDARY: &str = "finance90-boundary";

    fn upload_state(dir: &tempfile::TempDir) -> AppState {
        let config = AppConfig {
            upload_dir: dir.path().join("blog"),
            ..test_config()
        };
        AppState::new(Arc::new(crate::store::MemoryStore::seeded(None)), config)
    }

    fn upload_router(state: AppState) -> Router {
        Router::new()
            .route("/api/admin/uploads", post(upload_image).get(list_images))
            .route("/api/admin/uploads/{filename}", delete(delete_image))
            .with_state(state)
    }

    fn multipart_request(auth: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cover.png\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/api/admin/uploads")
            .header("authorization", auth)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_magic_bytes() {
        assert_eq!(validate_image_magic_bytes(PNG), Some("image/png"));
        assert_eq!(validate_image_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(validate_image_magic_bytes(b"<svg"), None);
        assert_eq!(validate_image_magic_bytes(&[0x89]), None);
    }

    #[test]
    fn test_unsafe_filenames() {
        assert!(is_safe_filename("abc.png"));
        assert!(!is_safe_filename("../secret"));
        assert!(!is_safe_filename("a/b.png"));
        assert!(!is_safe_filename(""));
    }

    #[tokio::test]
    async fn test_oversized_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = upload_state(&dir);
        let auth = admin_bearer(&state);
        // Full app, so the real body limits apply.
        let app = crate::create_app(state);

        let mut image = PNG.to_vec();
        image.resize(MAX_FILE_SIZE + 1, 0);
        let (status, body): (_, ErrorResponse) =
            send_json(app, multipart_request(&auth, "image/png", &image)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.starts_with("File too large"), "{}", body.error);
        assert_eq!(std::fs::read_dir(dir.path().join("blog")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let state = upload_state(&dir);
        let auth = admin_bearer(&state);
        let app = upload_router(state);

        let (status, uploaded): (_, UploadResponse) =
            send_json(app.clone(), multipart_request(&auth, "image/png", PNG)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(uploaded.url.starts_with("/uploads/blog/"));
        assert!(uploaded.filename.ends_with(".png"));
        assert!(dir.path().join("blog").join(&uploaded.filename).exists());

        let (_, listed): (_, ImageListResponse) = send_json(
            app.clone(),
            empty_request(Method::GET, "/api/admin/uploads", Some(&auth)),
        )
        .await;
        assert_eq!(listed.total, 1);

        let uri = format!("/api/admin/uploads/{}", uploaded.filename);
        let (status, _, _) = send(app.clone(), empty_request(Method::DELETE, &uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) = send(app, empty_request(Method::DELETE, &uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_declared_type_must_match_content() {
        let dir = tempfile::tempdir().unwrap();
        let state = upload_state(&dir);
        let auth = admin_bearer(&state);
        let app = upload_router(state);

        let (status, _, _) = send(app.clone(), multipart_request(&auth, "image/jpeg", PNG)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) =
            send(app, multipart_request(&auth, "application/pdf", b"%PDF-1.4")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_requires_admin() {
        let dir = tempfile::tempdir().unwrap();
        let app = upload_router(upload_state(&dir));
        let req = Request::post("/api/admin/uploads")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
