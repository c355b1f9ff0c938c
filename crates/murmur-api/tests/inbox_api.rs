//! Session-gated surface: auth enforcement, the accept-messages flag and
//! the suggestion endpoint.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum_test::TestServer;
use serde_json::{Value, json};

use murmur_api::mailer::Mailer;
use murmur_api::router::build_router;
use murmur_api::state::{AppState, AppStateInner};
use murmur_api::suggest::Suggester;
use murmur_db::Database;

fn create_test_server() -> (TestServer, AppState) {
    let db = Database::open_in_memory().expect("Failed to create test database");

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: "test-secret-key-for-testing-only".to_string(),
        mailer: Mailer::LogOnly,
        suggester: Suggester::Static,
    });

    let server =
        TestServer::new(build_router(state.clone())).expect("Failed to create test server");

    (server, state)
}

async fn register_verified(
    server: &TestServer,
    state: &AppState,
    username: &str,
    email: &str,
) -> String {
    server
        .post("/accounts")
        .json(&json!({"username": username, "email": email, "password": "password123"}))
        .await
        .assert_status_ok();

    let code = state
        .db
        .get_account_by_username(username)
        .unwrap()
        .unwrap()
        .verify_code;
    server
        .post("/accounts/verify")
        .json(&json!({"username": username, "code": code}))
        .await
        .assert_status_ok();

    let login = server
        .post("/auth/login")
        .json(&json!({"identifier": username, "password": "password123"}))
        .await;
    login.assert_status_ok();
    login.json::<Value>()["token"].as_str().unwrap().to_string()
}

// ============================================================================
// Auth enforcement
// ============================================================================

#[tokio::test]
async fn private_routes_require_a_session() {
    let (server, _state) = create_test_server();

    server.get("/inbox/accept").await.assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/inbox/accept")
        .json(&json!({"acceptMessages": false}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server.get("/inbox/messages").await.assert_status(StatusCode::UNAUTHORIZED);
    server
        .delete("/inbox/messages/00000000-0000-0000-0000-000000000001")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_tokens_are_rejected() {
    let (server, _state) = create_test_server();

    let response = server
        .get("/inbox/messages")
        .add_header(AUTHORIZATION, "Bearer not-a-real-token")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let missing_scheme = server
        .get("/inbox/messages")
        .add_header(AUTHORIZATION, "not-even-bearer")
        .await;
    missing_scheme.assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Accept-messages flag
// ============================================================================

#[tokio::test]
async fn accepting_defaults_to_true() {
    let (server, state) = create_test_server();
    let token = register_verified(&server, &state, "alice", "alice@example.com").await;

    let response = server
        .get("/inbox/accept")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["isAcceptingMessage"], true);
}

#[tokio::test]
async fn accept_flag_round_trips() {
    let (server, state) = create_test_server();
    let token = register_verified(&server, &state, "alice", "alice@example.com").await;

    for desired in [false, true] {
        let set = server
            .post("/inbox/accept")
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({"acceptMessages": desired}))
            .await;
        set.assert_status_ok();
        assert_eq!(set.json::<Value>()["isAcceptingMessage"], desired);

        let get = server
            .get("/inbox/accept")
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .await;
        get.assert_status_ok();
        assert_eq!(get.json::<Value>()["isAcceptingMessage"], desired);
    }
}

#[tokio::test]
async fn empty_inbox_is_a_normal_response() {
    let (server, state) = create_test_server();
    let token = register_verified(&server, &state, "alice", "alice@example.com").await;

    let response = server
        .get("/inbox/messages")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["messages"].as_array().unwrap().len(), 0);
}

// ============================================================================
// Suggestions
// ============================================================================

#[tokio::test]
async fn suggestions_return_three_questions() {
    let (server, _state) = create_test_server();

    let response = server.post("/suggestions").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    let suggestions = body["suggestions"].as_str().unwrap();
    assert_eq!(suggestions.split("||").count(), 3);
}
