//! Ordered claim validation for signature-verified tokens.
//!
//! The gateway enforces a fixed sequence of temporal and audience rules; the
//! first failing rule wins and its message is exactly what the caller sees.
//! The order is part of the service contract: near the 24-hour boundary the
//! "too old" and "too long-lived" windows overlap, and which message surfaces
//! depends on rule position, so the sequence must not be rearranged.
//!
//! All time comparisons use the validating server's clock; there is no
//! clock-skew allowance beyond the rules themselves.

use common::jwt::TokenClaims;
use thiserror::Error;

/// Maximum accepted token age and token lifetime: 24 hours, in seconds.
pub const MAX_TOKEN_WINDOW_SECS: i64 = 24 * 60 * 60;

/// A claim rule violation. Exactly one per rule, in rule order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("No expiration time specified.")]
    MissingExpiration,

    #[error("Token expired.")]
    Expired,

    #[error("Token issued in the future.")]
    IssuedInFuture,

    #[error("The token is more than 24 hours old.")]
    TooOld,

    #[error("The token must not be valid for more than 24 hours.")]
    LifetimeTooLong,

    #[error("Token isn't valid yet.")]
    NotYetValid,

    #[error("The wiki's URL [{url}] is not in the provided audience")]
    AudienceMismatch { url: String },
}

/// Validate a claim set against the service's own base URL.
///
/// # Errors
///
/// Returns the first violated rule's [`ClaimError`].
pub fn validate(claims: &TokenClaims, base_url: &str) -> Result<(), ClaimError> {
    validate_at(claims, base_url, chrono::Utc::now().timestamp())
}

/// Deterministic validation against an explicit `now` timestamp.
///
/// Prefer [`validate`] in production code. This variant exists so that
/// boundary conditions can be unit-tested without wall-clock dependence.
pub(crate) fn validate_at(claims: &TokenClaims, base_url: &str, now: i64) -> Result<(), ClaimError> {
    // Rule 1: expiration must be present.
    let Some(exp) = claims.exp else {
        return Err(ClaimError::MissingExpiration);
    };

    // Rule 2: expiration must be in the future.
    if now >= exp {
        return Err(ClaimError::Expired);
    }

    if let Some(iat) = claims.iat {
        // Rule 3: issuance must not be in the future.
        if iat > now {
            return Err(ClaimError::IssuedInFuture);
        }
        // Rule 4: the token must have been issued within the last 24 hours.
        if iat < now - MAX_TOKEN_WINDOW_SECS {
            return Err(ClaimError::TooOld);
        }
    }

    // Rule 5: total lifetime is capped at 24 hours. Without an issued-at
    // claim the remaining lifetime from now is what gets capped.
    let lifetime_start = claims.iat.unwrap_or(now);
    if exp - lifetime_start > MAX_TOKEN_WINDOW_SECS {
        return Err(ClaimError::LifetimeTooLong);
    }

    // Rule 6: the not-before instant must have passed.
    if let Some(nbf) = claims.nbf {
        if nbf > now {
            return Err(ClaimError::NotYetValid);
        }
    }

    // Rule 7: a non-empty audience must include this service's URL.
    if let Some(aud) = &claims.aud {
        if !aud.is_empty() && !aud.iter().any(|entry| audience_matches(entry, base_url)) {
            return Err(ClaimError::AudienceMismatch {
                url: normalize_url(base_url),
            });
        }
    }

    Ok(())
}

/// Compare an audience entry to the service URL by origin.
fn audience_matches(entry: &str, base_url: &str) -> bool {
    normalize_url(entry) == normalize_url(base_url)
}

/// Reduce a URL to its scheme+host+port origin, with trailing slashes
/// normalized away. Values that do not parse as absolute URLs fall back to a
/// trailing-slash-trimmed string comparison.
fn normalize_url(value: &str) -> String {
    if let Ok(parsed) = url::Url::parse(value) {
        let origin = parsed.origin();
        if let url::Origin::Tuple(..) = origin {
            return origin.ascii_serialization();
        }
    }
    value.trim_end_matches('/').to_string()
}
