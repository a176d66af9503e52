//! Metrics definitions for the ScribeGate service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `sg_` prefix for ScribeGate
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: 2 values (success, error)
//! - `reason`: the fixed failure classes of `AuthError::metric_class`
//! - `fallback`: bounded by the registered fallback names

use metrics::counter;

/// Record a bearer-token authentication attempt.
///
/// Metric: `sg_authentications_total`
/// Labels: `outcome`, `reason`
pub fn record_authentication(outcome: &str, reason: Option<&str>) {
    let reason = reason.unwrap_or("none");
    counter!("sg_authentications_total", "outcome" => outcome.to_string(), "reason" => reason.to_string())
        .increment(1);
}

/// Record a delegation to the fallback authenticator.
///
/// Metric: `sg_fallback_delegations_total`
/// Labels: `fallback`
pub fn record_fallback_delegation(fallback: &str) {
    counter!("sg_fallback_delegations_total", "fallback" => fallback.to_string()).increment(1);
}

/// Record an identity resolve-or-create round trip.
///
/// Metric: `sg_identity_resolutions_total`
/// Labels: `status`
pub fn record_identity_resolution(status: &str) {
    counter!("sg_identity_resolutions_total", "status" => status.to_string()).increment(1);
}
