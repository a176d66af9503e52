//! Integration tests for the bearer-token authentication pipeline.
//!
//! Exercises the full pipeline against in-memory stores: fallback
//! delegation, each rejection step's exact message, claim forwarding to the
//! identity store, and idempotent re-authentication.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use sg_service::config::Config;
use sg_service::errors::AuthError;
use sg_service::models::AuthenticatedUser;
use sg_service::services::authenticator::TokenAuthenticator;
use sg_test_utils::{
    test_application, FallbackBehavior, FailingIdentityStore, InMemoryApplicationRegistry,
    RecordingFallback, RecordingIdentityStore, TestTokenBuilder,
};

const BASE_URL: &str = "https://wiki.example.com";

fn test_config() -> Config {
    let vars = HashMap::from([
        (
            "DATABASE_URL".to_string(),
            "postgresql://localhost/unused".to_string(),
        ),
        ("SG_BASE_URL".to_string(), BASE_URL.to_string()),
    ]);
    Config::from_vars(&vars).expect("test config should load")
}

/// Pipeline harness: one registered application, recording collaborators.
struct Harness {
    authenticator: TokenAuthenticator,
    identities: Arc<RecordingIdentityStore>,
    fallback: Arc<RecordingFallback>,
    private_key: Vec<u8>,
}

fn harness() -> Harness {
    harness_with_fallback(FallbackBehavior::Anonymous)
}

fn harness_with_fallback(behavior: FallbackBehavior) -> Harness {
    let (application, private_key) = test_application("wiki-assistant", 1);

    let registry = Arc::new(InMemoryApplicationRegistry::new());
    registry.register(application);

    let identities = Arc::new(RecordingIdentityStore::new());
    let fallback = Arc::new(RecordingFallback::new(behavior));

    let authenticator = TokenAuthenticator::with_fallback(
        &test_config(),
        registry,
        identities.clone(),
        fallback.clone(),
    );

    Harness {
        authenticator,
        identities,
        fallback,
        private_key,
    }
}

// ============================================================================
// Fallback delegation
// ============================================================================

/// Every header without the exact `Bearer ` prefix goes to the fallback,
/// whose result comes back unchanged.
#[tokio::test]
async fn test_non_bearer_headers_delegate_to_fallback() -> Result<(), anyhow::Error> {
    let harness = harness();

    let headers: [Option<&str>; 7] = [
        None,
        Some(""),
        Some("   "),
        Some("Bearer"),           // no trailing space
        Some("bearer abc.def.g"), // wrong case
        Some("Basic dXNlcjpwdw=="),
        Some("BearerX abc"),
    ];

    for (i, header) in headers.iter().enumerate() {
        let outcome = harness.authenticator.authenticate(*header).await?;
        assert!(outcome.is_none(), "header {header:?} should be anonymous");
        assert_eq!(harness.fallback.call_count(), i + 1);
    }

    // The fallback sees the original header values untouched.
    let calls = harness.fallback.calls();
    assert_eq!(calls[0], None);
    assert_eq!(calls[3].as_deref(), Some("Bearer"));
    assert_eq!(calls[5].as_deref(), Some("Basic dXNlcjpwdw=="));

    Ok(())
}

#[tokio::test]
async fn test_fallback_identity_is_returned_unchanged() -> Result<(), anyhow::Error> {
    let fixed = AuthenticatedUser {
        user_id: uuid::Uuid::new_v4(),
        issuer: "legacy".to_string(),
        subject: "form-login".to_string(),
        group: "legacy-users".to_string(),
    };
    let harness = harness_with_fallback(FallbackBehavior::FixedUser(fixed.clone()));

    let outcome = harness.authenticator.authenticate(None).await?;
    assert_eq!(outcome, Some(fixed));

    Ok(())
}

#[tokio::test]
async fn test_fallback_error_propagates_unchanged() {
    let harness = harness_with_fallback(FallbackBehavior::Deny);

    let result = harness.authenticator.authenticate(Some("Basic abc")).await;
    assert!(matches!(result, Err(AuthError::Unauthenticated)));
}

// ============================================================================
// Rejection steps
// ============================================================================

/// Once the `Bearer ` prefix matched, a malformed token is terminal; the
/// fallback is not consulted.
#[tokio::test]
async fn test_malformed_token_fails_without_fallback() {
    let harness = harness();

    for token in ["garbage", "a.b", "a.b.c.d", "!!!.###.$$$"] {
        let header = format!("Bearer {token}");
        let err = harness
            .authenticator
            .authenticate(Some(&header))
            .await
            .expect_err("malformed token must be rejected");
        assert_eq!(err.to_string(), "Invalid token.");
    }

    assert_eq!(harness.fallback.call_count(), 0);
}

#[tokio::test]
async fn test_non_eddsa_token_is_malformed() {
    let harness = harness();

    // A structurally sound token that declares HS256.
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(r#"{"iss":"wiki-assistant"}"#);
    let token = format!("{header}.{payload}.{}", URL_SAFE_NO_PAD.encode(b"sig"));

    let err = harness
        .authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await
        .expect_err("non-EdDSA token must be rejected");
    assert_eq!(err.to_string(), "Invalid token.");
}

#[tokio::test]
async fn test_unknown_issuer_is_unauthorized() -> Result<(), anyhow::Error> {
    let harness = harness();

    let token = TestTokenBuilder::new()
        .issuer("ghost-app")
        .subject("alice")
        .sign(&harness.private_key)?;

    let err = harness
        .authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await
        .expect_err("unknown issuer must be rejected");
    assert_eq!(err.to_string(), "Unauthorized application.");

    Ok(())
}

#[tokio::test]
async fn test_missing_issuer_is_unauthorized() -> Result<(), anyhow::Error> {
    let harness = harness();

    let token = TestTokenBuilder::new()
        .no_issuer()
        .subject("alice")
        .sign(&harness.private_key)?;

    let err = harness
        .authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await
        .expect_err("token without issuer must be rejected");
    assert_eq!(err.to_string(), "Unauthorized application.");

    Ok(())
}

#[tokio::test]
async fn test_wrong_signing_key_is_rejected() -> Result<(), anyhow::Error> {
    let harness = harness();

    // Signed with a different application's key than the registered one.
    let (_, other_key) = sg_test_utils::test_signing_key(9)?;
    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .subject("alice")
        .sign(&other_key)?;

    let err = harness
        .authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await
        .expect_err("wrong key must be rejected");
    assert_eq!(err.to_string(), "Invalid token signature.");

    Ok(())
}

#[tokio::test]
async fn test_registry_failure_propagates() -> Result<(), anyhow::Error> {
    let registry = Arc::new(InMemoryApplicationRegistry::failing());
    let identities = Arc::new(RecordingIdentityStore::new());
    let fallback = Arc::new(RecordingFallback::anonymous());
    let authenticator = TokenAuthenticator::with_fallback(
        &test_config(),
        registry,
        identities,
        fallback,
    );

    let (_, private_key) = sg_test_utils::test_signing_key(1)?;
    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .sign(&private_key)?;

    let result = authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await;
    assert!(matches!(result, Err(AuthError::Database(_))));

    Ok(())
}

#[tokio::test]
async fn test_identity_store_failure_preserves_message() -> Result<(), anyhow::Error> {
    let (application, private_key) = test_application("wiki-assistant", 1);
    let registry = Arc::new(InMemoryApplicationRegistry::new());
    registry.register(application);

    let authenticator = TokenAuthenticator::with_fallback(
        &test_config(),
        registry,
        Arc::new(FailingIdentityStore::new("identity store unavailable")),
        Arc::new(RecordingFallback::anonymous()),
    );

    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .subject("alice")
        .sign(&private_key)?;

    let err = authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await
        .expect_err("store failure must propagate");
    assert_eq!(err.to_string(), "identity store unavailable");

    Ok(())
}

// ============================================================================
// Successful authentication
// ============================================================================

#[tokio::test]
async fn test_valid_token_resolves_identity() -> Result<(), anyhow::Error> {
    let harness = harness();

    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .subject("alice")
        .audience(&[BASE_URL])
        .sign(&harness.private_key)?;

    let outcome = harness
        .authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await?;

    let user = outcome.expect("valid token must resolve an identity");
    assert_eq!(user.issuer, "wiki-assistant");
    assert_eq!(user.subject, "alice");
    assert_eq!(user.group, "ai-wiki-assistant-users");
    assert_eq!(harness.fallback.call_count(), 0);

    Ok(())
}

/// The claims handed to the identity store must match the token payload
/// exactly, through a JSON round-trip, extra claims included.
#[tokio::test]
async fn test_identity_store_receives_token_claims_verbatim() -> Result<(), anyhow::Error> {
    let harness = harness();

    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .subject("alice")
        .audience(&[BASE_URL])
        .claim("email", serde_json::json!("alice@example.com"))
        .claim("roles", serde_json::json!(["editor", "reviewer"]))
        .sign(&harness.private_key)?;

    harness
        .authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await?;

    let received = harness.identities.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].issuer, "wiki-assistant");
    assert_eq!(received[0].subject, "alice");

    // Decode the token payload directly and compare JSON values.
    let parts: Vec<&str> = token.split('.').collect();
    let payload_bytes = URL_SAFE_NO_PAD.decode(parts[1])?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes)?;
    let stored: serde_json::Value = serde_json::from_str(&received[0].claims_json)?;
    assert_eq!(stored, payload);

    Ok(())
}

/// Re-authenticating the same subject updates the record, never duplicates.
#[tokio::test]
async fn test_reauthentication_is_idempotent() -> Result<(), anyhow::Error> {
    let harness = harness();

    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .subject("alice")
        .sign(&harness.private_key)?;
    let header = format!("Bearer {token}");

    let first = harness
        .authenticator
        .authenticate(Some(&header))
        .await?
        .expect("first authentication should succeed");
    let second = harness
        .authenticator
        .authenticate(Some(&header))
        .await?
        .expect("second authentication should succeed");

    assert_eq!(first.user_id, second.user_id);
    assert_eq!(harness.identities.user_count(), 1);
    assert_eq!(harness.identities.received().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_token_without_subject_is_rejected() -> Result<(), anyhow::Error> {
    let harness = harness();

    let token = TestTokenBuilder::new()
        .issuer("wiki-assistant")
        .no_subject()
        .sign(&harness.private_key)?;

    let err = harness
        .authenticator
        .authenticate(Some(&format!("Bearer {token}")))
        .await
        .expect_err("token without subject cannot map to an identity");
    assert_eq!(err.to_string(), "Invalid token.");

    Ok(())
}
