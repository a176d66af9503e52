//! Identity handlers.

use axum::{Extension, Json};
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AuthError;
use crate::middleware::auth::CurrentUser;
use crate::models::AuthenticatedUser;
use crate::services::authenticator::TokenAuthenticator;

/// Shared application state for request handlers.
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub authenticator: Arc<TokenAuthenticator>,
}

/// `GET /auth/whoami`: return the request's resolved identity.
///
/// Anonymous requests get 401; the authentication middleware has already
/// rejected requests with bad bearer tokens before this handler runs.
pub async fn whoami(
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<AuthenticatedUser>, AuthError> {
    let user = current.0.ok_or(AuthError::Unauthenticated)?;
    Ok(Json(user))
}

/// `GET /health`: liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
