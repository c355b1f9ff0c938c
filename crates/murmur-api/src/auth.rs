use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{Json, extract::State};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use murmur_types::api::{Claims, LoginRequest, LoginResponse};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

/// Sign in with username or email. Only verified accounts get a session;
/// a pending account is pointed back at the verification step.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let db = state.clone();
    let identifier = req.identifier.clone();
    let account = blocking(
        tokio::task::spawn_blocking(move || db.db.get_account_by_identifier(&identifier)).await,
    )?
    .ok_or_else(bad_credentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&account.password)
        .map_err(|e| ApiError::Store(anyhow::anyhow!("corrupt password hash: {e}")))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| bad_credentials())?;

    if !account.is_verified {
        return Err(ApiError::Unauthorized(
            "Please verify your account before signing in".into(),
        ));
    }

    let account_id: Uuid = account
        .id
        .parse()
        .map_err(|e| ApiError::Store(anyhow::anyhow!("corrupt account id '{}': {e}", account.id)))?;

    let token = create_token(&state.jwt_secret, account_id, &account.username)
        .map_err(ApiError::Store)?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Signed in".into(),
        token,
        username: account.username,
    }))
}

fn bad_credentials() -> ApiError {
    ApiError::Unauthorized("Incorrect username or password".into())
}

fn create_token(secret: &str, account_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: account_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
