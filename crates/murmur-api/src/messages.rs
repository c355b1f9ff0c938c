use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::warn;
use uuid::Uuid;

use murmur_types::api::{
    ApiResponse, Claims, MessageItem, MessagesResponse, SendMessageRequest,
};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

pub const MAX_CONTENT_CHARS: usize = 300;

/// Public, unauthenticated ingestion. The sender's identity is never
/// recorded anywhere — not even in logs.
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Message content must not be empty".into()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::Validation(format!(
            "Message content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }

    let db = state.clone();
    let username = req.username.clone();
    let recipient = blocking(
        tokio::task::spawn_blocking(move || db.db.get_account_by_username(&username)).await,
    )?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !recipient.is_accepting {
        return Err(ApiError::GateClosed);
    }

    // The insert re-checks the gate in the same statement, so a toggle
    // racing this request cannot slip a message past a closed gate.
    let message_id = Uuid::new_v4();
    let db = state.clone();
    let username = req.username.clone();
    let content = content.to_string();
    let appended = blocking(
        tokio::task::spawn_blocking(move || {
            db.db.insert_message_if_accepting(&message_id.to_string(), &username, &content)
        })
        .await,
    )?;

    if !appended {
        return Err(ApiError::GateClosed);
    }

    Ok(Json(ApiResponse {
        success: true,
        message: "Message sent successfully".into(),
    }))
}

/// The owner's inbox, newest first. An empty inbox is a normal response.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let db = state.clone();
    let account_id = claims.sub.to_string();
    let rows = blocking(
        tokio::task::spawn_blocking(move || db.db.list_messages(&account_id)).await,
    )?;

    let messages: Vec<MessageItem> = rows
        .into_iter()
        .map(|row| MessageItem {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt message id '{}': {}", row.id, e);
                Uuid::default()
            }),
            content: row.content,
            created_at: row
                .created_at
                .parse::<chrono::DateTime<chrono::Utc>>()
                .or_else(|_| {
                    // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
                    // Parse as naive UTC and convert.
                    chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                        .map(|ndt| ndt.and_utc())
                })
                .unwrap_or_else(|e| {
                    warn!("Corrupt created_at '{}' on message '{}': {}", row.created_at, row.id, e);
                    chrono::DateTime::default()
                }),
        })
        .collect();

    Ok(Json(MessagesResponse {
        success: true,
        message: "Messages fetched".into(),
        messages,
    }))
}

/// Owner-scoped delete. An id belonging to someone else is reported the
/// same way as an id that never existed.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<Uuid>,
) -> Result<Json<ApiResponse>, ApiError> {
    let db = state.clone();
    let account_id = claims.sub.to_string();
    let deleted = blocking(
        tokio::task::spawn_blocking(move || {
            db.db.delete_message(&account_id, &message_id.to_string())
        })
        .await,
    )?;

    if !deleted {
        return Err(ApiError::NotFound("Message not found".into()));
    }

    Ok(Json(ApiResponse {
        success: true,
        message: "Message deleted".into(),
    }))
}
