//! Signature verification for application-issued tokens.
//!
//! ScribeGate never signs tokens; registered applications do, with their own
//! Ed25519 keys. This module's single job is checking a token's EdDSA
//! signature against the PEM public key stored for the application.
//!
//! Temporal and audience claims are deliberately NOT validated here: the
//! claim validator owns rule ordering and messages, so every jsonwebtoken
//! built-in check is disabled and only the signature is verified.

use common::jwt::{decode_ed25519_public_key_pem, TokenClaims};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;
use tracing::instrument;

use crate::errors::AuthError;

/// Verify a token's EdDSA signature and return its claims.
///
/// Expects a token that already passed structural parsing; whatever decode
/// failure remains here is treated as a signature mismatch.
///
/// # Errors
///
/// Returns [`AuthError::InvalidSignature`] when the registered key cannot be
/// decoded or the signature does not verify.
#[instrument(skip_all)]
pub fn verify_token_signature(
    token: &str,
    public_key_pem: &str,
) -> Result<TokenClaims, AuthError> {
    let public_key_bytes = decode_ed25519_public_key_pem(public_key_pem).map_err(|e| {
        tracing::debug!(
            target: "sg.crypto",
            error = %e,
            "Registered public key is not decodable PEM"
        );
        AuthError::InvalidSignature
    })?;

    let decoding_key = DecodingKey::from_ed_der(&public_key_bytes);

    let mut validation = Validation::new(Algorithm::EdDSA);
    // Claim rules run in the claim validator, in their own order and with
    // their own messages; here only the signature matters.
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let token_data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "sg.crypto", error = %e, "Token signature verification failed");
        AuthError::InvalidSignature
    })?;

    Ok(token_data.claims)
}
