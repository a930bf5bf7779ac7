use axum::body::Bytes;
use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use authgate::{
    api::routes::create_router,
    auth::{clock::ManualClock, password::Argon2Hasher},
    db::TursoClient,
    AppState, AuthGateConfig,
};

const SECRET: &str = "integration-test-secret-with-32-bytes!";
const PASSWORD: &str = "correct-horse";

struct Harness {
    server: TestServer,
    clock: Arc<ManualClock>,
}

async fn create_test_server() -> Harness {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = Arc::new(
        TursoClient::new_memory()
            .await
            .expect("Failed to create in-memory store"),
    );
    let hasher = Arc::new(Argon2Hasher::new(1024, 1, 1).expect("Failed to build hasher"));

    let state = AppState::new(
        AuthGateConfig::default(),
        SECRET,
        store,
        hasher,
        clock.clone(),
    )
    .expect("Failed to build application state");
    let server = TestServer::new(create_router(state)).expect("Failed to create test server");

    Harness { server, clock }
}

async fn signup(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/save")
        .json(&json!({
            "username": username,
            "password": PASSWORD,
            "roles": ["USER"]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn login(server: &TestServer, username: &str, password: &str) -> TestResponse {
    server
        .post("/login")
        .json(&json!({ "username": username, "password": password }))
        .await
}

fn access_token(response: &TestResponse) -> String {
    response.headers()[header::AUTHORIZATION]
        .to_str()
        .unwrap()
        .to_string()
}

fn auth_header(token: &str) -> HeaderValue {
    HeaderValue::from_str(token).unwrap()
}

fn refresh_cookie(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("refreshToken={}", token)).unwrap()
}

fn assert_invalid_token(response: &TestResponse) {
    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["status"], "Unauthorized");
    assert_eq!(body["message"], "Invalid token");
}

// ============= Public routes =============

#[tokio::test]
async fn test_health_check() {
    let h = create_test_server().await;

    let response = h.server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_openapi_document_is_public() {
    let h = create_test_server().await;

    let response = h.server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["paths"]["/login"].is_object());
    assert!(body["paths"]["/refreshToken"].is_object());
}

#[tokio::test]
async fn test_signup_returns_created_user() {
    let h = create_test_server().await;

    let response = h
        .server
        .post("/save")
        .json(&json!({
            "username": "alice",
            "password": PASSWORD,
            "roles": ["ADMIN", "USER"]
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["status"], "Created");
    assert_eq!(body["message"], "User successfully created");
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["roles"], json!(["ADMIN", "USER"]));
    assert!(body["data"]["id"].is_string());
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_signup_reports_every_violation() {
    let h = create_test_server().await;

    let response = h
        .server
        .post("/save")
        .json(&json!({ "username": "al", "password": "short", "roles": ["user"] }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid data");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|e| e.as_str().unwrap().starts_with("username:")));
    assert!(errors.iter().any(|e| e.as_str().unwrap().starts_with("password:")));
    assert!(errors.iter().any(|e| e.as_str().unwrap().starts_with("roles:")));
}

#[tokio::test]
async fn test_signup_duplicate_username() {
    let h = create_test_server().await;
    signup(&h.server, "alice").await;

    let response = h
        .server
        .post("/save")
        .json(&json!({ "username": "alice", "password": PASSWORD, "roles": ["USER"] }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["errors"], json!(["username: already taken"]));
}

#[tokio::test]
async fn test_signup_malformed_json() {
    let h = create_test_server().await;

    let response = h
        .server
        .post("/save")
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{not json"))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid data");
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
}

// ============= Login =============

#[tokio::test]
async fn test_login_issues_access_and_refresh_tokens() {
    let h = create_test_server().await;
    signup(&h.server, "alice").await;

    let response = login(&h.server, "alice", PASSWORD).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Login with success");
    let token = access_token(&response);
    assert!(!token.is_empty());
    assert_eq!(body["data"]["accessToken"], token);

    let cookie = response.cookie("refreshToken");
    assert!(!cookie.value().is_empty());
    assert_ne!(cookie.value(), token);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/refreshToken"));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = create_test_server().await;
    signup(&h.server, "alice").await;

    let wrong_password = login(&h.server, "alice", "wrong-password").await;
    let unknown_user = login(&h.server, "nobody", PASSWORD).await;

    wrong_password.assert_status_unauthorized();
    unknown_user.assert_status_unauthorized();
    assert_eq!(wrong_password.json::<Value>(), unknown_user.json::<Value>());
    assert!(wrong_password
        .headers()
        .get(header::AUTHORIZATION)
        .is_none());
}

// ============= Auth gate =============

#[tokio::test]
async fn test_get_user_with_valid_token() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    let token = access_token(&login(&h.server, "alice", PASSWORD).await);

    let response = h
        .server
        .get("/user")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Success");
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["username"], "alice");
}

#[tokio::test]
async fn test_get_user_accepts_bearer_prefix() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    let token = access_token(&login(&h.server, "alice", PASSWORD).await);

    let response = h
        .server
        .get("/user")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&format!("Bearer {}", token)))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;

    let response = h.server.get("/user").add_query_param("id", &id).await;

    assert_invalid_token(&response);
    assert_eq!(response.headers()[header::AUTHORIZATION], "");
}

#[tokio::test]
async fn test_missing_identity_rejected() {
    let h = create_test_server().await;
    signup(&h.server, "alice").await;
    let token = access_token(&login(&h.server, "alice", PASSWORD).await);

    let response = h
        .server
        .get("/user")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await;

    assert_invalid_token(&response);
}

#[tokio::test]
async fn test_token_cannot_address_another_user() {
    let h = create_test_server().await;
    signup(&h.server, "alice").await;
    let bob = signup(&h.server, "bob").await;
    let alice_token = access_token(&login(&h.server, "alice", PASSWORD).await);

    let read = h
        .server
        .get("/user")
        .add_query_param("id", &bob)
        .add_header(header::AUTHORIZATION, auth_header(&alice_token))
        .await;
    let delete = h
        .server
        .delete("/delete")
        .add_query_param("id", &bob)
        .add_header(header::AUTHORIZATION, auth_header(&alice_token))
        .await;

    assert_invalid_token(&read);
    assert_invalid_token(&delete);

    // bob is untouched
    login(&h.server, "bob", PASSWORD).await.assert_status_ok();
}

#[tokio::test]
async fn test_refresh_token_unusable_past_its_ttl() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    let session = login(&h.server, "alice", PASSWORD).await;
    let refresh = session.cookie("refreshToken").value().to_string();

    h.clock.advance(Duration::seconds(86_400));

    let response = h
        .server
        .get("/user")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&refresh))
        .await;

    assert_invalid_token(&response);
}

#[tokio::test]
async fn test_access_token_expires() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    let token = access_token(&login(&h.server, "alice", PASSWORD).await);

    h.clock.advance(Duration::seconds(299));
    h.server
        .get("/user")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .assert_status_ok();

    h.clock.advance(Duration::seconds(1));
    let response = h
        .server
        .get("/user")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await;

    assert_invalid_token(&response);
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    let token = access_token(&login(&h.server, "alice", PASSWORD).await);

    let mut tampered = token.into_bytes();
    let at = tampered.len() - 5;
    tampered[at] = if tampered[at] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let response = h
        .server
        .get("/user")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&tampered))
        .await;

    assert_invalid_token(&response);
}

// ============= Refresh =============

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    let session = login(&h.server, "alice", PASSWORD).await;
    let old_access = access_token(&session);
    let old_refresh = session.cookie("refreshToken").value().to_string();

    h.clock.advance(Duration::seconds(600));

    let response = h
        .server
        .get("/refreshToken")
        .add_query_param("id", &id)
        .add_header(header::COOKIE, refresh_cookie(&old_refresh))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Token refreshed Successfully");
    let new_access = access_token(&response);
    assert_eq!(body["data"]["accessToken"], new_access);
    assert_ne!(new_access, old_access);
    let new_refresh = response.cookie("refreshToken").value().to_string();
    assert_ne!(new_refresh, old_refresh);

    h.server
        .get("/user")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&new_access))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let h = create_test_server().await;

    let response = h.server.get("/refreshToken").await;

    assert_invalid_token(&response);
}

#[tokio::test]
async fn test_refresh_with_expired_cookie() {
    let h = create_test_server().await;
    signup(&h.server, "alice").await;
    let refresh = login(&h.server, "alice", PASSWORD)
        .await
        .cookie("refreshToken")
        .value()
        .to_string();

    h.clock.advance(Duration::seconds(86_400));

    let response = h
        .server
        .get("/refreshToken")
        .add_header(header::COOKIE, refresh_cookie(&refresh))
        .await;

    assert_invalid_token(&response);
}

#[tokio::test]
async fn test_refresh_for_another_user_rejected() {
    let h = create_test_server().await;
    signup(&h.server, "alice").await;
    let bob = signup(&h.server, "bob").await;
    let refresh = login(&h.server, "alice", PASSWORD)
        .await
        .cookie("refreshToken")
        .value()
        .to_string();

    let response = h
        .server
        .get("/refreshToken")
        .add_query_param("id", &bob)
        .add_header(header::COOKIE, refresh_cookie(&refresh))
        .await;

    assert_invalid_token(&response);
}

// ============= Update / delete =============

#[tokio::test]
async fn test_update_password_clears_credentials() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    let token = access_token(&login(&h.server, "alice", PASSWORD).await);

    let response = h
        .server
        .put("/update")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "password": "brand-new-password" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "User successfully updated");
    assert_eq!(response.headers()[header::AUTHORIZATION], "");
    assert_eq!(response.cookie("refreshToken").value(), "");

    login(&h.server, "alice", PASSWORD)
        .await
        .assert_status_unauthorized();
    login(&h.server, "alice", "brand-new-password")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_update_username() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    let token = access_token(&login(&h.server, "alice", PASSWORD).await);

    h.server
        .put("/update")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "username": "alicia" }))
        .await
        .assert_status_ok();

    login(&h.server, "alice", PASSWORD)
        .await
        .assert_status_unauthorized();
    let relogin = login(&h.server, "alicia", PASSWORD).await;
    relogin.assert_status_ok();

    let body: Value = h
        .server
        .get("/user")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&access_token(&relogin)))
        .await
        .json();
    assert_eq!(body["data"]["username"], "alicia");
}

#[tokio::test]
async fn test_update_without_fields() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    let token = access_token(&login(&h.server, "alice", PASSWORD).await);

    let response = h
        .server
        .put("/update")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({}))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["message"], "missing data in request");
}

#[tokio::test]
async fn test_update_to_taken_username() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    signup(&h.server, "bob").await;
    let token = access_token(&login(&h.server, "alice", PASSWORD).await);

    let response = h
        .server
        .put("/update")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "username": "bob" }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["errors"], json!(["username: already taken"]));
}

#[tokio::test]
async fn test_delete_user() {
    let h = create_test_server().await;
    let id = signup(&h.server, "alice").await;
    let token = access_token(&login(&h.server, "alice", PASSWORD).await);

    let response = h
        .server
        .delete("/delete")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "User successfully deleted");
    assert_eq!(response.headers()[header::AUTHORIZATION], "");

    // The token is still cryptographically valid, but the user is gone.
    let response = h
        .server
        .get("/user")
        .add_query_param("id", &id)
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await;
    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["message"], "Not found: user");

    login(&h.server, "alice", PASSWORD)
        .await
        .assert_status_unauthorized();
}
