use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use murmur_db::ReserveOutcome;
use murmur_types::api::{ApiResponse, CheckUsernameQuery, SignupRequest, VerifyRequest};

use crate::error::{ApiError, blocking};
use crate::policy::{self, CodeCheck};
use crate::state::AppState;

/// Reserve a username, persist the pending account and email the
/// verification code. The reservation is one conditional upsert in the
/// store, so concurrent signups for the same username cannot both win.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    validate_username(&req.username)?;
    validate_email(&req.email)?;
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Store(anyhow::anyhow!("password hashing failed: {e}")))?
        .to_string();

    let account_id = Uuid::new_v4();
    let code = policy::generate_code();
    let now = Utc::now().timestamp();
    let expiry = now + policy::CODE_TTL_SECS;

    let db = state.clone();
    let (username, email, code_for_db) = (req.username.clone(), req.email.clone(), code.clone());
    let outcome = blocking(
        tokio::task::spawn_blocking(move || {
            db.db.reserve_signup(
                &account_id.to_string(),
                &username,
                &email,
                &password_hash,
                &code_for_db,
                expiry,
                now,
            )
        })
        .await,
    )?;

    match outcome {
        ReserveOutcome::UsernameTaken => return Err(ApiError::UsernameTaken),
        ReserveOutcome::EmailTaken => return Err(ApiError::EmailTaken),
        ReserveOutcome::Reserved => {}
    }

    if let Err(e) = state.mailer.send_verification(&req.email, &req.username, &code).await {
        error!("verification mail to '{}' failed: {e:#}", req.username);

        // Re-expire the reservation so the user can retry right away
        // instead of waiting out the verification window.
        let db = state.clone();
        let username = req.username.clone();
        let rolled_back = blocking(
            tokio::task::spawn_blocking(move || {
                db.db.expire_pending(&username, Utc::now().timestamp())
            })
            .await,
        );
        if let Err(rollback_err) = rolled_back {
            error!("could not re-expire pending account '{}': {rollback_err}", req.username);
        }

        return Err(ApiError::Upstream(e));
    }

    Ok(Json(ApiResponse {
        success: true,
        message: "Account registered. Check your email for the verification code".into(),
    }))
}

/// Submit the emailed code. Re-verifying an already-verified account is an
/// idempotent success; a wrong or expired code changes nothing.
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let db = state.clone();
    let username = req.username.clone();
    let account = blocking(
        tokio::task::spawn_blocking(move || db.db.get_account_by_username(&username)).await,
    )?
    .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    if account.is_verified {
        return Ok(Json(ApiResponse {
            success: true,
            message: "Account is already verified".into(),
        }));
    }

    match policy::evaluate(
        &account.verify_code,
        account.verify_code_expiry,
        &req.code,
        Utc::now().timestamp(),
    ) {
        CodeCheck::WrongCode => Err(ApiError::WrongCode),
        CodeCheck::Expired => Err(ApiError::CodeExpired),
        CodeCheck::Accepted => {
            let db = state.clone();
            let username = req.username.clone();
            let flipped = blocking(
                tokio::task::spawn_blocking(move || db.db.mark_verified(&username)).await,
            )?;
            if !flipped {
                // Lost a race against another verify with the same code;
                // the account is verified either way.
                warn!("account '{}' was already verified", req.username);
            }

            Ok(Json(ApiResponse {
                success: true,
                message: "Account verified successfully".into(),
            }))
        }
    }
}

/// Public availability probe backing the signup form's debounced check.
/// "Free" covers absent usernames and reclaimable expired reservations.
pub async fn check_username(
    State(state): State<AppState>,
    Query(query): Query<CheckUsernameQuery>,
) -> Result<Json<ApiResponse>, ApiError> {
    validate_username(&query.username)?;

    let db = state.clone();
    let username = query.username.clone();
    let account = blocking(
        tokio::task::spawn_blocking(move || db.db.get_account_by_username(&username)).await,
    )?;

    let now = Utc::now().timestamp();
    let available = match account {
        None => true,
        Some(a) => !a.is_verified && a.verify_code_expiry <= now,
    };

    if available {
        Ok(Json(ApiResponse {
            success: true,
            message: "Username is available".into(),
        }))
    } else {
        Ok(Json(ApiResponse {
            success: false,
            message: "Username is already taken".into(),
        }))
    }
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ApiError::Validation(
            "Username must be between 3 and 32 characters".into(),
        ));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::Validation(
            "Username may only contain letters, numbers and underscores".into(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let invalid = || ApiError::Validation("Enter a valid email address".into());

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.contains(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}
