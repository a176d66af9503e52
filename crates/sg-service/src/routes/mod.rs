//! Router assembly.

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::auth_handler::AppState;
use crate::handlers::{admin_handler, auth_handler};
use crate::middleware::auth::{self, AuthState};

/// Build the service router.
///
/// Every route runs behind the authentication middleware; the admin subtree
/// additionally requires membership of the configured admin group.
pub fn build_routes(state: Arc<AppState>) -> Router {
    let auth_state = AuthState {
        authenticator: state.authenticator.clone(),
        admin_group: state.config.admin_group.clone(),
    };

    let admin_routes = Router::new()
        .route(
            "/admin/applications",
            get(admin_handler::list_applications).put(admin_handler::upsert_application),
        )
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth::require_admin_group,
        ));

    Router::new()
        .route("/health", get(auth_handler::health))
        .route("/auth/whoami", get(auth_handler::whoami))
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(
            auth_state,
            auth::authenticate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
