//! Identity repository.
//!
//! Local accounts are keyed by the `(issuer, subject)` pair asserted by a
//! verified token. Resolution is a single upsert so that concurrent
//! authentications for the same subject stay idempotent: last write wins,
//! no explicit locking.

use async_trait::async_trait;
use common::jwt::TokenClaims;
use sqlx::PgPool;

use crate::errors::AuthError;
use crate::models::{AuthenticatedUser, AuthorizedApplication};
use crate::observability::metrics::record_identity_resolution;
use crate::repositories::IdentityStore;

/// Postgres-backed [`IdentityStore`].
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn resolve_or_create(
        &self,
        application: &AuthorizedApplication,
        subject: &str,
        claims: &TokenClaims,
    ) -> Result<AuthenticatedUser, AuthError> {
        let group = application.render_group(subject);

        let claims_json = serde_json::to_value(claims).map_err(|e| {
            tracing::error!(target: "sg.identities", error = %e, "Failed to serialize claims");
            AuthError::Internal
        })?;

        let user = sqlx::query_as::<_, AuthenticatedUser>(
            r#"
            INSERT INTO users (issuer, subject, group_name, last_claims)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (issuer, subject) DO UPDATE
            SET group_name = EXCLUDED.group_name,
                last_claims = EXCLUDED.last_claims,
                updated_at = NOW()
            RETURNING user_id, issuer, subject, group_name
            "#,
        )
        .bind(&application.issuer)
        .bind(subject)
        .bind(&group)
        .bind(&claims_json)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            record_identity_resolution("error");
            AuthError::IdentityResolution(format!("Failed to resolve user: {}", e))
        })?;

        record_identity_resolution("success");
        Ok(user)
    }
}
