//! Authentication middleware.
//!
//! `authenticate` runs the token authenticator on every request and stores
//! the outcome in request extensions; `require_admin_group` additionally
//! gates a route subtree on membership of the configured admin group.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::errors::AuthError;
use crate::models::AuthenticatedUser;
use crate::services::authenticator::TokenAuthenticator;

/// Middleware state: the authenticator plus the admin group it gates on.
#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Arc<TokenAuthenticator>,
    pub admin_group: String,
}

/// The request's resolved identity, stored in request extensions by
/// [`authenticate`]. `None` means the request is anonymous (guest).
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

/// Run the token authenticator and attach the outcome to the request.
///
/// A rejected bearer token short-circuits the request with the
/// authenticator's access-denied response; requests without a bearer token
/// proceed with whatever the fallback authenticator decided.
pub async fn authenticate(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let outcome = state
        .authenticator
        .authenticate(authorization.as_deref())
        .await?;

    req.extensions_mut().insert(CurrentUser(outcome));

    Ok(next.run(req).await)
}

/// Reject requests whose resolved identity is missing or outside the
/// configured admin group. Must run after [`authenticate`].
pub async fn require_admin_group(
    State(state): State<AuthState>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .and_then(|current| current.0.clone())
        .ok_or(AuthError::Unauthenticated)?;

    if user.group != state.admin_group {
        return Err(AuthError::Forbidden {
            group: state.admin_group.clone(),
        });
    }

    Ok(next.run(req).await)
}
