//! Anonymous ingestion and the owner's inbox: gating, ownership, ordering.

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

/// Run the whole signup + verify + login flow and return a bearer token.
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

async fn send_message(server: &TestServer, username: &str, content: &str) -> axum_test::TestResponse {
    server
        .post("/messages")
        .json(&json!({"username": username, "content": content}))
        .await
}

async fn list_messages(server: &TestServer, token: &str) -> Vec<Value> {
    let response = server
        .get("/inbox/messages")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["messages"].as_array().unwrap().clone()
}

// ============================================================================
// Ingestion
// ============================================================================

#[tokio::test]
async fn anonymous_send_lands_in_owner_inbox() {
    let (server, state) = create_test_server();
    let token = register_verified(&server, &state, "alice", "alice@example.com").await;

    let response = send_message(&server, "alice", "Hello").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["success"], true);

    let messages = list_messages(&server, &token).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "Hello");
    assert!(messages[0]["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(messages[0]["createdAt"].as_str().is_some());
}

#[tokio::test]
async fn send_to_unknown_recipient_is_not_found() {
    let (server, _state) = create_test_server();

    let response = send_message(&server, "ghost", "Hello").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn closed_gate_rejects_and_stores_nothing() {
    let (server, state) = create_test_server();
    let token = register_verified(&server, &state, "alice", "alice@example.com").await;

    send_message(&server, "alice", "before").await.assert_status_ok();

    server
        .post("/inbox/accept")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({"acceptMessages": false}))
        .await
        .assert_status_ok();

    let blocked = send_message(&server, "alice", "after").await;
    blocked.assert_status(StatusCode::FORBIDDEN);
    let body: Value = blocked.json();
    assert_eq!(body["message"], "User is not accepting messages");

    // The closed gate only affects new ingestion, never stored messages.
    let messages = list_messages(&server, &token).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "before");
}

#[tokio::test]
async fn content_bounds_are_enforced() {
    let (server, state) = create_test_server();
    let _token = register_verified(&server, &state, "alice", "alice@example.com").await;

    let empty = send_message(&server, "alice", "   ").await;
    empty.assert_status(StatusCode::BAD_REQUEST);

    let oversized = "a".repeat(301);
    let too_long = send_message(&server, "alice", &oversized).await;
    too_long.assert_status(StatusCode::BAD_REQUEST);

    let at_limit = "a".repeat(300);
    send_message(&server, "alice", &at_limit).await.assert_status_ok();
}

#[tokio::test]
async fn concurrent_sends_both_land() {
    let (server, state) = create_test_server();
    let token = register_verified(&server, &state, "alice", "alice@example.com").await;

    let (first, second) = tokio::join!(
        async { send_message(&server, "alice", "one").await },
        async { send_message(&server, "alice", "two").await },
    );
    first.assert_status_ok();
    second.assert_status_ok();

    let messages = list_messages(&server, &token).await;
    assert_eq!(messages.len(), 2);
}

#[tokio::test]
async fn inbox_lists_newest_first() {
    let (server, state) = create_test_server();
    let token = register_verified(&server, &state, "alice", "alice@example.com").await;

    send_message(&server, "alice", "first").await.assert_status_ok();
    send_message(&server, "alice", "second").await.assert_status_ok();

    let messages = list_messages(&server, &token).await;
    let contents: Vec<&str> = messages.iter().map(|m| m["content"].as_str().unwrap()).collect();
    assert_eq!(contents, ["second", "first"]);
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn owner_delete_removes_message_once() {
    let (server, state) = create_test_server();
    let token = register_verified(&server, &state, "alice", "alice@example.com").await;

    send_message(&server, "alice", "bye").await.assert_status_ok();
    let messages = list_messages(&server, &token).await;
    let id = messages[0]["id"].as_str().unwrap().to_string();

    let response = server
        .delete(&format!("/inbox/messages/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();
    assert!(list_messages(&server, &token).await.is_empty());

    // Deleting an already-deleted id reports not-found, not success.
    let again = server
        .delete(&format!("/inbox/messages/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    again.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_cannot_reach_another_owners_message() {
    let (server, state) = create_test_server();
    let alice = register_verified(&server, &state, "alice", "alice@example.com").await;
    let bob = register_verified(&server, &state, "bob", "bob@example.com").await;

    send_message(&server, "bob", "for bob").await.assert_status_ok();
    let bob_messages = list_messages(&server, &bob).await;
    let id = bob_messages[0]["id"].as_str().unwrap().to_string();

    // Same response as a truly absent id: existence must not leak.
    let response = server
        .delete(&format!("/inbox/messages/{}", id))
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    assert_eq!(list_messages(&server, &bob).await.len(), 1);
}
