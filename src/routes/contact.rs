/**
 * Contact Routes
 * Contact form submission behind an arithmetic challenge, plus the admin inbox
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::challenge::{self, Challenge, ChallengeError};
use crate::db::models::{ContactSubmission, NewContact};
use crate::error::{ApiResult, AppError};
use crate::extractors::AdminSession;
use crate::pagination::{ListQuery, Page, ADMIN_PAGE_SIZE};
use crate::routes::SuccessResponse;
use crate::state::AppState;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_EMAIL_CHARS: usize = 254;
pub const MAX_MESSAGE_CHARS: usize = 5000;

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    email.chars().count() <= MAX_EMAIL_CHARS && EMAIL_REGEX.is_match(email)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
    pub challenge_token: String,
    pub challenge_answer: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

impl ContactRequest {
    /// Trimmed, length-checked submission.
    fn validate(&self) -> Result<NewContact, AppError> {
        let name = self.name.trim();
        let email = self.email.trim();
        let message = self.message.trim();

        if name.is_empty() || email.is_empty() || message.is_empty() {
            return Err(AppError::bad_request("Name, email and message are required"));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(AppError::bad_request(format!(
                "Name must be at most {MAX_NAME_CHARS} characters"
            )));
        }
        if !is_valid_email(email) {
            return Err(AppError::bad_request("Please enter a valid email address"));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::bad_request(format!(
                "Message must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }

        Ok(NewContact {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
        })
    }
}

// ============================================================================
// Public Handlers
// ============================================================================

/// GET /api/contact/challenge
pub async fn get_challenge(State(state): State<AppState>) -> ApiResult<Json<Challenge>> {
    let challenge = challenge::issue(&state.config().jwt_secret)
        .map_err(|e| AppError::Internal(format!("failed to issue challenge: {e}")))?;
    Ok(Json(challenge))
}

const CHALLENGE_EXPIRED: &str = "Verification expired. Please try again.";

/// POST /api/contact
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> ApiResult<(StatusCode, Json<ContactResponse>)> {
    let contact = payload.validate()?;

    let solved = challenge::verify(
        &state.config().jwt_secret,
        &payload.challenge_token,
        &payload.challenge_answer,
    )
    .map_err(|e| match e {
        ChallengeError::InvalidToken(_) => AppError::bad_request(CHALLENGE_EXPIRED),
        ChallengeError::WrongAnswer => AppError::bad_request("Incorrect verification answer"),
    })?;
    if !state.solved_challenges().consume(&solved).await {
        return Err(AppError::bad_request(CHALLENGE_EXPIRED));
    }

    let saved = state.store().insert_contact(&contact).await?;
    tracing::info!(contact_id = %saved.id, "contact form submitted");

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            success: true,
            message: "Thanks for reaching out! We'll get back to you soon.".to_string(),
        }),
    ))
}

// ============================================================================
// Admin Handlers
// ============================================================================

/// GET /api/admin/contacts?search=&page=&pageSize=
pub async fn list_contacts(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<ContactSubmission>>> {
    let pagination = query.pagination(ADMIN_PAGE_SIZE);
    let search = query.search_term();
    let (items, total) = state
        .store()
        .list_contacts(search.as_deref(), pagination)
        .await?;
    Ok(Json(Page::new(items, pagination, total)))
}

/// DELETE /api/admin/contacts/{id}
pub async fn delete_contact(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    if !state.store().delete_contact(id).await? {
        return Err(AppError::not_found("Contact submission"));
    }
    Ok(Json(SuccessResponse::ok()))
}
