use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::claim_validation::ClaimError;

/// Service error type.
///
/// Every failure on the token-authentication path is terminal for the request
/// and surfaces as an access-denied response; the variants differ only in the
/// message preserved for observability, so behavioral tests match on message
/// text.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The bearer token is not a parseable compact token.
    #[error("Invalid token.")]
    MalformedToken,

    /// No registered application matches the token's issuer.
    #[error("Unauthorized application.")]
    UnauthorizedApplication,

    /// The signature does not verify against the application's key.
    #[error("Invalid token signature.")]
    InvalidSignature,

    /// A temporal or audience claim rule failed; the rule's own message wins.
    #[error(transparent)]
    Claim(#[from] ClaimError),

    /// The identity store failed; its message is preserved.
    #[error("{0}")]
    IdentityResolution(String),

    /// A protected route was reached without a resolved identity.
    #[error("Authentication required")]
    Unauthenticated,

    /// The resolved identity is not in the required group.
    #[error("Requires membership of group: {group}")]
    Forbidden { group: String },

    /// Malformed request body or parameters.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal,
}

impl AuthError {
    /// Bounded failure class for metrics labels.
    #[must_use]
    pub fn metric_class(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnauthorizedApplication => "unauthorized_application",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Claim(_) => "claim_validation",
            AuthError::IdentityResolution(_) => "identity_resolution",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Forbidden { .. } => "forbidden",
            AuthError::BadRequest(_) => "bad_request",
            AuthError::Database(_) => "database",
            AuthError::Internal => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::MalformedToken
            | AuthError::UnauthorizedApplication
            | AuthError::InvalidSignature
            | AuthError::Claim(_)
            | AuthError::IdentityResolution(_) => {
                (StatusCode::UNAUTHORIZED, "ACCESS_DENIED", self.to_string())
            }
            AuthError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_REQUIRED",
                self.to_string(),
            ),
            AuthError::Forbidden { .. } => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string())
            }
            AuthError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string())
            }
            AuthError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "An internal database error occurred".to_string(),
            ),
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
