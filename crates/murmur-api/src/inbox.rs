use axum::{Extension, Json, extract::State};

use murmur_types::api::{AcceptingResponse, Claims, SetAcceptingRequest};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

pub async fn get_accepting(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AcceptingResponse>, ApiError> {
    let db = state.clone();
    let account_id = claims.sub.to_string();
    let account = blocking(
        tokio::task::spawn_blocking(move || db.db.get_account_by_id(&account_id)).await,
    )?
    .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AcceptingResponse {
        success: true,
        message: "Accept-messages setting fetched".into(),
        is_accepting_message: account.is_accepting,
    }))
}

pub async fn set_accepting(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetAcceptingRequest>,
) -> Result<Json<AcceptingResponse>, ApiError> {
    let db = state.clone();
    let account_id = claims.sub.to_string();
    let found = blocking(
        tokio::task::spawn_blocking(move || db.db.set_accepting(&account_id, req.accept_messages))
            .await,
    )?;

    if !found {
        return Err(ApiError::NotFound("Account not found".into()));
    }

    let message = if req.accept_messages {
        "Now accepting messages"
    } else {
        "No longer accepting messages"
    };

    Ok(Json(AcceptingResponse {
        success: true,
        message: message.into(),
        is_accepting_message: req.accept_messages,
    }))
}
