//! The bearer-token authentication pipeline.
//!
//! Decides, for each inbound request, whether it carries a valid
//! application-issued token and, if so, which local account it maps to.
//! Requests without a bearer token are delegated to the configured fallback
//! authenticator and its result is returned unchanged.
//!
//! The pipeline is strictly ordered, and every step's failure message is part
//! of the service contract:
//!
//! 1. structural parse        -> "Invalid token."
//! 2. issuer lookup           -> "Unauthorized application."
//! 3. signature verification  -> "Invalid token signature."
//! 4. claim validation        -> the violated rule's own message
//! 5. identity resolution     -> the identity store's message
//!
//! Once the `Bearer ` prefix matched, the fallback is never consulted: a
//! malformed or rejected token is a terminal failure for the request.

use std::sync::Arc;
use tracing::instrument;

use common::jwt::parse_compact_unverified;

use crate::config::Config;
use crate::crypto::verify_token_signature;
use crate::errors::AuthError;
use crate::observability::metrics::{record_authentication, record_fallback_delegation};
use crate::repositories::{ApplicationRegistry, IdentityStore};
use crate::services::claim_validation;
use crate::services::fallback::{AuthOutcome, FallbackAuthenticator, FallbackRegistry};

/// The accepted authorization scheme prefix. Case-sensitive, and the trailing
/// space is significant: `"Bearer"` alone delegates to the fallback.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Verifies application-issued bearer tokens and resolves local identities.
///
/// Stateless per invocation; all collaborators are injected at construction.
pub struct TokenAuthenticator {
    registry: Arc<dyn ApplicationRegistry>,
    identities: Arc<dyn IdentityStore>,
    fallback: Arc<dyn FallbackAuthenticator>,
    base_url: String,
}

impl TokenAuthenticator {
    /// Build the authenticator, resolving the configured fallback name
    /// against `fallbacks`. Fallback resolution never fails; unknown names
    /// degrade to the guest fallback with a warning.
    #[must_use]
    pub fn new(
        config: &Config,
        registry: Arc<dyn ApplicationRegistry>,
        identities: Arc<dyn IdentityStore>,
        fallbacks: &FallbackRegistry,
    ) -> Self {
        let fallback = fallbacks.resolve(config.fallback_authenticator.as_deref());
        Self::with_fallback(config, registry, identities, fallback)
    }

    /// Build the authenticator around an already-constructed fallback.
    #[must_use]
    pub fn with_fallback(
        config: &Config,
        registry: Arc<dyn ApplicationRegistry>,
        identities: Arc<dyn IdentityStore>,
        fallback: Arc<dyn FallbackAuthenticator>,
    ) -> Self {
        tracing::info!(
            target: "sg.authenticator",
            fallback = fallback.name(),
            base_url = %config.base_url,
            "Token authenticator ready"
        );

        Self {
            registry,
            identities,
            fallback,
            base_url: config.base_url.clone(),
        }
    }

    /// Authenticate a request from its raw `Authorization` header value.
    ///
    /// Headers that are absent, blank, or not `Bearer `-prefixed are handed
    /// to the fallback authenticator, whose result is returned unchanged.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] is terminal for the request; the message identifies
    /// the rejected step.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthOutcome, AuthError> {
        let Some(token) = authorization.and_then(|header| header.strip_prefix(BEARER_PREFIX))
        else {
            record_fallback_delegation(self.fallback.name());
            return self.fallback.authenticate(authorization).await;
        };

        match self.authenticate_token(token).await {
            Ok(user) => {
                record_authentication("success", None);
                Ok(Some(user))
            }
            Err(e) => {
                record_authentication("error", Some(e.metric_class()));
                Err(e)
            }
        }
    }

    /// Run the ordered verification pipeline for one bearer token.
    async fn authenticate_token(
        &self,
        token: &str,
    ) -> Result<crate::models::AuthenticatedUser, AuthError> {
        // Step 1: structural parse. The claims are unverified and are used
        // only to pick the application key.
        let unverified = parse_compact_unverified(token).map_err(|e| {
            tracing::debug!(target: "sg.authenticator", error = %e, "Token failed structural parsing");
            AuthError::MalformedToken
        })?;

        // Step 2: issuer lookup. A token without an issuer cannot belong to
        // any registered application.
        let issuer = unverified.iss.unwrap_or_default();
        let application = if issuer.is_empty() {
            None
        } else {
            self.registry.get_by_issuer(&issuer).await?
        };
        let Some(application) = application else {
            tracing::debug!(
                target: "sg.authenticator",
                issuer = %issuer,
                "No registered application for token issuer"
            );
            return Err(AuthError::UnauthorizedApplication);
        };

        // Step 3: signature. From here on the claims are trusted.
        let claims = verify_token_signature(token, &application.public_key)?;

        // Step 4: temporal and audience rules, in contract order.
        claim_validation::validate(&claims, &self.base_url)?;

        // Step 5: map the verified identity onto a local account.
        let subject = claims.sub.clone().unwrap_or_default();
        if subject.is_empty() {
            tracing::debug!(target: "sg.authenticator", "Token carries no subject");
            return Err(AuthError::MalformedToken);
        }

        self.identities
            .resolve_or_create(&application, &subject, &claims)
            .await
    }
}
