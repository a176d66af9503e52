//! Registered-application repository.
//!
//! Applications are administrator-managed configuration records; the
//! authentication pipeline only ever reads them, keyed by issuer.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AuthError;
use crate::models::AuthorizedApplication;
use crate::repositories::ApplicationRegistry;

/// Postgres-backed [`ApplicationRegistry`].
#[derive(Clone)]
pub struct PgApplicationRegistry {
    pool: PgPool,
}

impl PgApplicationRegistry {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationRegistry for PgApplicationRegistry {
    async fn get_by_issuer(
        &self,
        issuer: &str,
    ) -> Result<Option<AuthorizedApplication>, AuthError> {
        get_by_issuer(&self.pool, issuer).await
    }
}

/// Get a registered application by exact issuer match.
pub async fn get_by_issuer(
    pool: &PgPool,
    issuer: &str,
) -> Result<Option<AuthorizedApplication>, AuthError> {
    let application = sqlx::query_as::<_, AuthorizedApplication>(
        r#"
        SELECT issuer, name, group_format, public_key
        FROM authorized_applications
        WHERE issuer = $1
        "#,
    )
    .bind(issuer)
    .fetch_optional(pool)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to fetch application by issuer: {}", e)))?;

    Ok(application)
}

/// Create or update a registered application (admin operation).
pub async fn upsert(pool: &PgPool, application: &AuthorizedApplication) -> Result<(), AuthError> {
    sqlx::query(
        r#"
        INSERT INTO authorized_applications (issuer, name, group_format, public_key)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (issuer) DO UPDATE
        SET name = EXCLUDED.name,
            group_format = EXCLUDED.group_format,
            public_key = EXCLUDED.public_key,
            updated_at = NOW()
        "#,
    )
    .bind(&application.issuer)
    .bind(&application.name)
    .bind(&application.group_format)
    .bind(&application.public_key)
    .execute(pool)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to upsert application: {}", e)))?;

    Ok(())
}

/// List all registered applications (admin operation).
pub async fn list(pool: &PgPool) -> Result<Vec<AuthorizedApplication>, AuthError> {
    let applications = sqlx::query_as::<_, AuthorizedApplication>(
        r#"
        SELECT issuer, name, group_format, public_key
        FROM authorized_applications
        ORDER BY issuer
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to list applications: {}", e)))?;

    Ok(applications)
}
