//! Storage access for registered applications and resolved identities.
//!
//! The authentication pipeline sees storage only through the two traits
//! below, injected at construction time. Postgres implementations live in
//! the submodules; the test-utils crate provides in-memory ones.

use async_trait::async_trait;
use common::jwt::TokenClaims;

use crate::errors::AuthError;
use crate::models::{AuthenticatedUser, AuthorizedApplication};

pub mod applications;
pub mod identities;

pub use applications::PgApplicationRegistry;
pub use identities::PgIdentityStore;

/// Read access to the registered-application configuration store.
#[async_trait]
pub trait ApplicationRegistry: Send + Sync {
    /// Look up a registered application by exact issuer string match.
    async fn get_by_issuer(
        &self,
        issuer: &str,
    ) -> Result<Option<AuthorizedApplication>, AuthError>;
}

/// Persistence for identities resolved from verified tokens.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Resolve or create the local account for a verified issuer + subject
    /// pair, updating its group membership from the application's
    /// `group_format` and recording the verified claims.
    ///
    /// Idempotent per `(issuer, subject)`: re-authenticating the same subject
    /// updates the record, never duplicates it. Concurrent resolutions for
    /// the same pair race at the storage layer; last write wins.
    async fn resolve_or_create(
        &self,
        application: &AuthorizedApplication,
        subject: &str,
        claims: &TokenClaims,
    ) -> Result<AuthenticatedUser, AuthError>;
}
