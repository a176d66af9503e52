//! Route-level tests for the authentication middleware and the admin gate.
//!
//! The router is exercised with `tower::ServiceExt::oneshot` against
//! in-memory stores; the database pool is lazy and only the admin handlers
//! would ever touch it.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use sg_service::config::Config;
use sg_service::handlers::auth_handler::AppState;
use sg_service::routes;
use sg_service::services::authenticator::TokenAuthenticator;
use sg_test_utils::{
    test_application, InMemoryApplicationRegistry, RecordingFallback, RecordingIdentityStore,
    TestTokenBuilder,
};

const BASE_URL: &str = "https://wiki.example.com";

/// Router harness over in-memory stores. `group_format` controls the group
/// the resolved identity lands in, which is what the admin gate checks.
fn router_with_group_format(group_format: &str) -> (axum::Router, Vec<u8>) {
    let vars = HashMap::from([
        (
            "DATABASE_URL".to_string(),
            // Lazy pool: never connected unless an admin handler runs.
            "postgresql://localhost:1/unused".to_string(),
        ),
        ("SG_BASE_URL".to_string(), BASE_URL.to_string()),
    ]);
    let config = Config::from_vars(&vars).expect("test config should load");

    let (mut application, private_key) = test_application("wiki-assistant", 1);
    application.group_format = group_format.to_string();

    let registry = Arc::new(InMemoryApplicationRegistry::new());
    registry.register(application);

    let authenticator = Arc::new(TokenAuthenticator::with_fallback(
        &config,
        registry,
        Arc::new(RecordingIdentityStore::new()),
        Arc::new(RecordingFallback::anonymous()),
    ));

    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool construction should not fail");

    let state = Arc::new(AppState {
        pool,
        config,
        authenticator,
    });

    (routes::build_routes(state), private_key)
}

fn router() -> (axum::Router, Vec<u8>) {
    router_with_group_format("ai-{issuer}-users")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

// ============================================================================
// Health and identity routes
// ============================================================================

#[tokio::test]
async fn test_health_is_open() {
    let (app, _) = router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_whoami_without_credentials_is_unauthorized() {
    let (app, _) = router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/whoami")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn test_whoami_with_valid_token() {
    let (app, private_key) = router();

    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .subject("alice")
        .audience(&[BASE_URL])
        .sign(&private_key)
        .expect("token should sign");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/whoami")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["issuer"], "wiki-assistant");
    assert_eq!(body["subject"], "alice");
    assert_eq!(body["group"], "ai-wiki-assistant-users");
}

#[tokio::test]
async fn test_rejected_token_short_circuits_with_message() {
    let (app, _) = router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/whoami")
                .header("authorization", "Bearer not-a-token")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "ACCESS_DENIED");
    assert_eq!(body["error"]["message"], "Invalid token.");
}

// ============================================================================
// Admin gate
// ============================================================================

#[tokio::test]
async fn test_admin_routes_reject_anonymous_requests() {
    let (app, _) = router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/applications")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_non_admin_users() {
    let (app, private_key) = router();

    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .subject("alice")
        .sign(&private_key)
        .expect("token should sign");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/applications")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_admin_gate_passes_admin_group_members_to_handler() {
    // The resolved identity lands in the admin group, so the gate lets the
    // request through to the handler, which then fails on the unreachable
    // test database. A 500 here proves the gate itself passed.
    let (app, private_key) = router_with_group_format("admins");

    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .subject("operator")
        .sign(&private_key)
        .expect("token should sign");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/applications")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
}
