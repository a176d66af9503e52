//! Administration handlers for the registered-application store.
//!
//! These routes sit behind the admin-group gate; they are how an operator
//! registers the external applications whose tokens the gateway accepts.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use common::jwt::decode_ed25519_public_key_pem;

use crate::errors::AuthError;
use crate::handlers::auth_handler::AppState;
use crate::models::AuthorizedApplication;
use crate::repositories::applications;

/// `GET /admin/applications`: list all registered applications.
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AuthorizedApplication>>, AuthError> {
    let apps = applications::list(&state.pool).await?;
    Ok(Json(apps))
}

/// `PUT /admin/applications`: create or update a registered application.
pub async fn upsert_application(
    State(state): State<Arc<AppState>>,
    Json(application): Json<AuthorizedApplication>,
) -> Result<StatusCode, AuthError> {
    if application.issuer.trim().is_empty() {
        return Err(AuthError::BadRequest("issuer must not be empty".to_string()));
    }

    // Reject keys that could never verify a token: the PEM must decode to a
    // raw 32-byte Ed25519 public key.
    let key_bytes = decode_ed25519_public_key_pem(&application.public_key)
        .map_err(|e| AuthError::BadRequest(format!("public_key is not valid PEM: {}", e)))?;
    if key_bytes.len() != 32 {
        return Err(AuthError::BadRequest(format!(
            "public_key must be a 32-byte Ed25519 key, got {} bytes",
            key_bytes.len()
        )));
    }

    applications::upsert(&state.pool, &application).await?;

    tracing::info!(
        target: "sg.admin",
        issuer = %application.issuer,
        "Registered application upserted"
    );

    Ok(StatusCode::NO_CONTENT)
}
