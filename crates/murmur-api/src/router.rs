use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{accounts, auth, inbox, messages, suggest};

/// Assemble the full route table. Shared with the integration tests so
/// they exercise exactly what the binary serves.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/accounts", post(accounts::signup))
        .route("/accounts/verify", post(accounts::verify))
        .route("/accounts/check-username", get(accounts::check_username))
        .route("/auth/login", post(auth::login))
        .route("/messages", post(messages::send_message))
        .route("/suggestions", post(suggest::suggest_messages));

    let protected = Router::new()
        .route("/inbox/accept", get(inbox::get_accepting).post(inbox::set_accepting))
        .route("/inbox/messages", get(messages::list_messages))
        .route("/inbox/messages/{message_id}", delete(messages::delete_message))
        .layer(from_fn_with_state(state.clone(), require_auth));

    public.merge(protected).with_state(state)
}
