//! Per-rule claim validation tests, end to end through the authenticator.
//!
//! Each token is crafted to violate exactly one claim rule while satisfying
//! every earlier rule, so the rule's exact message must surface. A final set
//! checks precedence when several rules are violated at once.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use sg_service::config::Config;
use sg_service::services::authenticator::TokenAuthenticator;
use sg_service::services::claim_validation::MAX_TOKEN_WINDOW_SECS;
use sg_test_utils::{
    test_application, InMemoryApplicationRegistry, RecordingFallback, RecordingIdentityStore,
    TestTokenBuilder,
};

const BASE_URL: &str = "https://wiki.example.com";

fn authenticator() -> (TokenAuthenticator, Vec<u8>) {
    let vars = HashMap::from([
        (
            "DATABASE_URL".to_string(),
            "postgresql://localhost/unused".to_string(),
        ),
        ("SG_BASE_URL".to_string(), BASE_URL.to_string()),
    ]);
    let config = Config::from_vars(&vars).expect("test config should load");

    let (application, private_key) = test_application("wiki-assistant", 1);
    let registry = Arc::new(InMemoryApplicationRegistry::new());
    registry.register(application);

    let authenticator = TokenAuthenticator::with_fallback(
        &config,
        registry,
        Arc::new(RecordingIdentityStore::new()),
        Arc::new(RecordingFallback::anonymous()),
    );

    (authenticator, private_key)
}

async fn expect_message(builder: TestTokenBuilder, expected: &str) {
    let (authenticator, private_key) = authenticator();
    let token = builder
        .issuer("wiki-assistant")
        .subject("alice")
        .sign(&private_key)
        .expect("token should sign");

    let err = authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await
        .expect_err("token must be rejected");
    assert_eq!(err.to_string(), expected);
}

// ============================================================================
// One test per rule, in rule order
// ============================================================================

#[tokio::test]
async fn test_rule_1_missing_expiration() {
    expect_message(
        TestTokenBuilder::new().no_expiration(),
        "No expiration time specified.",
    )
    .await;
}

#[tokio::test]
async fn test_rule_2_expired() {
    let now = Utc::now().timestamp();
    expect_message(
        TestTokenBuilder::new()
            .issued_at(now - 600)
            .expires_at(now - 60),
        "Token expired.",
    )
    .await;
}

#[tokio::test]
async fn test_rule_3_issued_in_the_future() {
    let now = Utc::now().timestamp();
    expect_message(
        TestTokenBuilder::new()
            .issued_at(now + 3600)
            .expires_at(now + 7200),
        "Token issued in the future.",
    )
    .await;
}

#[tokio::test]
async fn test_rule_4_older_than_24_hours() {
    let now = Utc::now().timestamp();
    expect_message(
        TestTokenBuilder::new()
            .issued_at(now - MAX_TOKEN_WINDOW_SECS - 600)
            .expires_at(now + 60),
        "The token is more than 24 hours old.",
    )
    .await;
}

#[tokio::test]
async fn test_rule_5_lifetime_longer_than_24_hours() {
    let now = Utc::now().timestamp();
    expect_message(
        TestTokenBuilder::new()
            .issued_at(now - 60)
            .expires_at(now + MAX_TOKEN_WINDOW_SECS + 600),
        "The token must not be valid for more than 24 hours.",
    )
    .await;
}

#[tokio::test]
async fn test_rule_5_applies_without_issued_at() {
    let now = Utc::now().timestamp();
    expect_message(
        TestTokenBuilder::new()
            .no_issued_at()
            .expires_at(now + MAX_TOKEN_WINDOW_SECS + 600),
        "The token must not be valid for more than 24 hours.",
    )
    .await;
}

#[tokio::test]
async fn test_rule_6_not_yet_valid() {
    let now = Utc::now().timestamp();
    expect_message(
        TestTokenBuilder::new().not_before(now + 600),
        "Token isn't valid yet.",
    )
    .await;
}

#[tokio::test]
async fn test_rule_7_audience_mismatch() {
    expect_message(
        TestTokenBuilder::new().audience(&["https://other.example.com"]),
        "The wiki's URL [https://wiki.example.com] is not in the provided audience",
    )
    .await;
}

// ============================================================================
// Audience acceptance forms
// ============================================================================

#[tokio::test]
async fn test_audience_array_containing_service_url_is_accepted() -> Result<(), anyhow::Error> {
    let (authenticator, private_key) = authenticator();

    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .subject("alice")
        .audience(&["https://other.example.com", BASE_URL])
        .sign(&private_key)?;

    let outcome = authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await?;
    assert!(outcome.is_some());

    Ok(())
}

#[tokio::test]
async fn test_audience_single_string_form_is_accepted() -> Result<(), anyhow::Error> {
    let (authenticator, private_key) = authenticator();

    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .subject("alice")
        .audience_string("https://wiki.example.com/")
        .sign(&private_key)?;

    let outcome = authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await?;
    assert!(outcome.is_some());

    Ok(())
}

// ============================================================================
// Precedence
// ============================================================================

/// Expiration is checked before not-before and audience; its message wins.
#[tokio::test]
async fn test_earlier_rule_wins_when_several_are_violated() {
    let now = Utc::now().timestamp();
    expect_message(
        TestTokenBuilder::new()
            .issued_at(now - 600)
            .expires_at(now - 60)
            .not_before(now + 600)
            .audience(&["https://other.example.com"]),
        "Token expired.",
    )
    .await;
}

/// The age rule precedes the lifetime rule when both windows are violated.
#[tokio::test]
async fn test_age_rule_precedes_lifetime_rule() {
    let now = Utc::now().timestamp();
    expect_message(
        TestTokenBuilder::new()
            .issued_at(now - MAX_TOKEN_WINDOW_SECS - 600)
            .expires_at(now + 3600),
        "The token is more than 24 hours old.",
    )
    .await;
}
