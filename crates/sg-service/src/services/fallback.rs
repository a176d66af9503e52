//! Fallback authentication strategies.
//!
//! Requests that carry no bearer token are handed to a fallback
//! authenticator. Which strategy runs is chosen by name at construction time
//! from a registry of factories, a deliberate replacement for loading an
//! arbitrary configured class at runtime. Resolution never aborts startup:
//! an unknown name or a failing factory logs a warning and degrades to the
//! guest fallback.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::AuthError;
use crate::models::AuthenticatedUser;

/// Result of an authentication attempt: a resolved identity, or `None` for
/// an anonymous (guest) request.
pub type AuthOutcome = Option<AuthenticatedUser>;

/// Strategy consulted for requests without a bearer token.
#[async_trait]
pub trait FallbackAuthenticator: Send + Sync {
    /// Name under which the strategy is registered.
    fn name(&self) -> &'static str;

    /// Authenticate a request from its raw `Authorization` header value.
    /// The header, when present, did not carry a bearer token.
    async fn authenticate(&self, authorization: Option<&str>) -> Result<AuthOutcome, AuthError>;
}

/// Factory producing a ready fallback instance. Construction may fail; the
/// registry treats a failure as "use the default".
pub type FallbackFactory = fn() -> Result<Arc<dyn FallbackAuthenticator>, AuthError>;

/// Named registry of fallback factories.
pub struct FallbackRegistry {
    factories: HashMap<String, FallbackFactory>,
}

impl FallbackRegistry {
    /// Registry pre-populated with the built-in strategies.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(GuestFallback::NAME, || Ok(Arc::new(GuestFallback)));
        registry.register(DenyAllFallback::NAME, || Ok(Arc::new(DenyAllFallback)));
        registry
    }

    /// Register a factory under a name, replacing any previous entry.
    pub fn register(&mut self, name: &str, factory: FallbackFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Resolve the configured fallback name.
    ///
    /// `None` or an empty name selects the guest fallback. An unknown name or
    /// a factory failure logs a warning and degrades to the guest fallback,
    /// never a startup abort.
    #[must_use]
    pub fn resolve(&self, configured: Option<&str>) -> Arc<dyn FallbackAuthenticator> {
        let name = match configured {
            None => return Arc::new(GuestFallback),
            Some(name) if name.is_empty() => return Arc::new(GuestFallback),
            Some(name) => name,
        };

        let Some(factory) = self.factories.get(name) else {
            tracing::warn!(
                target: "sg.fallback",
                fallback = name,
                "Unknown fallback authenticator, using the guest fallback"
            );
            return Arc::new(GuestFallback);
        };

        match factory() {
            Ok(authenticator) => authenticator,
            Err(e) => {
                tracing::warn!(
                    target: "sg.fallback",
                    fallback = name,
                    error = %e,
                    "Fallback authenticator construction failed, using the guest fallback"
                );
                Arc::new(GuestFallback)
            }
        }
    }
}

/// Default strategy: every request without a bearer token is anonymous.
pub struct GuestFallback;

impl GuestFallback {
    pub const NAME: &'static str = "guest";
}

#[async_trait]
impl FallbackAuthenticator for GuestFallback {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn authenticate(&self, _authorization: Option<&str>) -> Result<AuthOutcome, AuthError> {
        Ok(None)
    }
}

/// Strategy for deployments where the gateway is the only accepted
/// credential source: requests without a bearer token are rejected outright.
pub struct DenyAllFallback;

impl DenyAllFallback {
    pub const NAME: &'static str = "deny-all";
}

#[async_trait]
impl FallbackAuthenticator for DenyAllFallback {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn authenticate(&self, _authorization: Option<&str>) -> Result<AuthOutcome, AuthError> {
        Err(AuthError::Unauthenticated)
    }
}
