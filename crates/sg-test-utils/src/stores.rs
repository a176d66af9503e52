//! In-memory store and fallback implementations for tests.
//!
//! These stand in for the Postgres repositories so the authentication
//! pipeline can be exercised end-to-end without a database. The identity
//! store records exactly what it received, which is what the byte-for-byte
//! claim-forwarding assertions compare against.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use common::jwt::TokenClaims;
use sg_service::errors::AuthError;
use sg_service::models::{AuthenticatedUser, AuthorizedApplication};
use sg_service::repositories::{ApplicationRegistry, IdentityStore};
use sg_service::services::fallback::{AuthOutcome, FallbackAuthenticator};

// ============================================================================
// Application registry
// ============================================================================

/// In-memory [`ApplicationRegistry`].
#[derive(Default)]
pub struct InMemoryApplicationRegistry {
    applications: Mutex<HashMap<String, AuthorizedApplication>>,
    fail: bool,
}

impl InMemoryApplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose every lookup fails with a database error, for
    /// exercising the storage-failure path.
    pub fn failing() -> Self {
        Self {
            applications: Mutex::new(HashMap::new()),
            fail: true,
        }
    }

    /// Register an application, replacing any previous entry for the issuer.
    pub fn register(&self, application: AuthorizedApplication) {
        self.applications
            .lock()
            .expect("registry lock poisoned")
            .insert(application.issuer.clone(), application);
    }
}

#[async_trait]
impl ApplicationRegistry for InMemoryApplicationRegistry {
    async fn get_by_issuer(
        &self,
        issuer: &str,
    ) -> Result<Option<AuthorizedApplication>, AuthError> {
        if self.fail {
            return Err(AuthError::Database(
                "application store unavailable".to_string(),
            ));
        }
        Ok(self
            .applications
            .lock()
            .expect("registry lock poisoned")
            .get(issuer)
            .cloned())
    }
}

// ============================================================================
// Identity store
// ============================================================================

/// One recorded `resolve_or_create` call.
#[derive(Debug, Clone)]
pub struct ReceivedResolution {
    pub issuer: String,
    pub subject: String,
    pub group: String,
    /// The claims exactly as the store received them, serialized to JSON.
    pub claims_json: String,
}

/// In-memory [`IdentityStore`] that records every call it receives.
#[derive(Default)]
pub struct RecordingIdentityStore {
    users: Mutex<HashMap<(String, String), AuthenticatedUser>>,
    received: Mutex<Vec<ReceivedResolution>>,
}

impl RecordingIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls received so far, in order.
    pub fn received(&self) -> Vec<ReceivedResolution> {
        self.received
            .lock()
            .expect("identity store lock poisoned")
            .clone()
    }

    /// Number of distinct local accounts created.
    pub fn user_count(&self) -> usize {
        self.users
            .lock()
            .expect("identity store lock poisoned")
            .len()
    }
}

#[async_trait]
impl IdentityStore for RecordingIdentityStore {
    async fn resolve_or_create(
        &self,
        application: &AuthorizedApplication,
        subject: &str,
        claims: &TokenClaims,
    ) -> Result<AuthenticatedUser, AuthError> {
        let group = application.render_group(subject);

        self.received
            .lock()
            .expect("identity store lock poisoned")
            .push(ReceivedResolution {
                issuer: application.issuer.clone(),
                subject: subject.to_string(),
                group: group.clone(),
                claims_json: serde_json::to_string(claims)
                    .expect("claims must serialize"),
            });

        let mut users = self.users.lock().expect("identity store lock poisoned");
        let key = (application.issuer.clone(), subject.to_string());
        let user = users
            .entry(key)
            .and_modify(|existing| existing.group = group.clone())
            .or_insert_with(|| AuthenticatedUser {
                user_id: Uuid::new_v4(),
                issuer: application.issuer.clone(),
                subject: subject.to_string(),
                group,
            });

        Ok(user.clone())
    }
}

/// An [`IdentityStore`] that always fails with a fixed message.
pub struct FailingIdentityStore {
    message: String,
}

impl FailingIdentityStore {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl IdentityStore for FailingIdentityStore {
    async fn resolve_or_create(
        &self,
        _application: &AuthorizedApplication,
        _subject: &str,
        _claims: &TokenClaims,
    ) -> Result<AuthenticatedUser, AuthError> {
        Err(AuthError::IdentityResolution(self.message.clone()))
    }
}

// ============================================================================
// Fallback authenticator
// ============================================================================

/// What the recording fallback should answer with.
#[derive(Clone)]
pub enum FallbackBehavior {
    /// Anonymous pass-through (`Ok(None)`).
    Anonymous,
    /// A fixed resolved identity.
    FixedUser(AuthenticatedUser),
    /// Reject the request.
    Deny,
}

/// A [`FallbackAuthenticator`] that records every delegation it receives.
pub struct RecordingFallback {
    behavior: FallbackBehavior,
    calls: Mutex<Vec<Option<String>>>,
}

impl RecordingFallback {
    pub fn new(behavior: FallbackBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(FallbackBehavior::Anonymous)
    }

    /// The raw `Authorization` values this fallback was handed, in order.
    pub fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().expect("fallback lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("fallback lock poisoned").len()
    }
}

#[async_trait]
impl FallbackAuthenticator for RecordingFallback {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn authenticate(&self, authorization: Option<&str>) -> Result<AuthOutcome, AuthError> {
        self.calls
            .lock()
            .expect("fallback lock poisoned")
            .push(authorization.map(str::to_owned));

        match &self.behavior {
            FallbackBehavior::Anonymous => Ok(None),
            FallbackBehavior::FixedUser(user) => Ok(Some(user.clone())),
            FallbackBehavior::Deny => Err(AuthError::Unauthenticated),
        }
    }
}

/// Convenience: a registered application plus its signing key, wired from a
/// deterministic seed.
pub fn test_application(issuer: &str, seed: u8) -> (AuthorizedApplication, Vec<u8>) {
    let (public_pem, private_pkcs8) =
        crate::crypto_fixtures::test_signing_key(seed).expect("fixture key generation");

    let application = AuthorizedApplication {
        issuer: issuer.to_string(),
        name: format!("{issuer} (test)"),
        group_format: "ai-{issuer}-users".to_string(),
        public_key: public_pem,
    };

    (application, private_pkcs8)
}
