//! Business logic layer.

pub mod authenticator;
pub mod claim_validation;
pub mod fallback;
