//! JWT utilities shared across ScribeGate components.
//!
//! This module provides the pieces of token handling that do not require a
//! registered application key:
//! - Size limits for DoS prevention
//! - Structural parsing of the three-part compact serialization
//! - The [`TokenClaims`] type used throughout the authentication pipeline
//! - Ed25519 public key decoding from PEM
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only EdDSA (Ed25519) tokens pass structural parsing
//! - Structural parsing performs NO signature verification; callers must
//!   verify the signature against the registered application key before
//!   trusting any claim
//! - The `sub` field in [`TokenClaims`] is redacted in Debug output

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// This limit prevents denial-of-service attacks via oversized tokens.
/// Tokens larger than this are rejected BEFORE any base64 decoding or
/// cryptographic operations.
///
/// Typical application tokens are 300-600 bytes (header + claims + EdDSA
/// signature); 8KB allows generous room for custom claims while keeping the
/// worst-case decode allocation small.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192; // 8KB

/// The only signature algorithm ScribeGate accepts in token headers.
pub const ACCEPTED_ALGORITHM: &str = "EdDSA";

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by structural token parsing.
///
/// These describe why a token failed to parse; the gateway collapses all of
/// them into a single access-denied message so the caller learns nothing
/// about the token's internals. Details are logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenParseError {
    /// Token size exceeds [`MAX_TOKEN_SIZE_BYTES`].
    #[error("token exceeds the maximum allowed size")]
    TokenTooLarge,

    /// Token is not a three-part dot-separated compact serialization.
    #[error("token is not a compact three-part serialization")]
    MalformedStructure,

    /// Token header is not valid base64url/JSON.
    #[error("token header could not be decoded")]
    MalformedHeader,

    /// Token header declares an algorithm other than EdDSA.
    #[error("token algorithm is not EdDSA")]
    UnsupportedAlgorithm,

    /// Token payload is not valid base64url/JSON.
    #[error("token payload could not be decoded")]
    MalformedPayload,
}

// =============================================================================
// Claims
// =============================================================================

/// The registered claims carried by an application-issued token.
///
/// Every field is optional at parse time: presence requirements are enforced
/// by the claim validator, not the parser, so that each missing claim can
/// surface its own message. Claims outside the registered set are preserved
/// verbatim in `extra` and travel with the identity to the identity store.
///
/// # Security
///
/// The `sub` field contains end-user identifiers and is redacted in Debug
/// output.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Issuer: the application that created and signed the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject: the identity the token asserts within the issuer's namespace.
    /// Redacted in Debug output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience, accepted as either a single JSON string or an array of
    /// strings, normalized to a vector.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_audience"
    )]
    pub aud: Option<Vec<String>>,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Any additional claims, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("iss", &self.iss)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TokenClaims {
    /// Empty claim set; useful as a builder seed in tests and fixtures.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            iss: None,
            sub: None,
            aud: None,
            exp: None,
            iat: None,
            nbf: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Accept `aud` as either `"single"` or `["one", "two"]`.
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AudienceRepr {
        One(String),
        Many(Vec<String>),
    }

    let repr = Option::<AudienceRepr>::deserialize(deserializer)?;
    Ok(repr.map(|r| match r {
        AudienceRepr::One(aud) => vec![aud],
        AudienceRepr::Many(auds) => auds,
    }))
}

// =============================================================================
// Functions
// =============================================================================

/// Structurally parse a compact-serialized token WITHOUT verifying its
/// signature.
///
/// Validates, in order:
/// 1. Token size (must be <= [`MAX_TOKEN_SIZE_BYTES`])
/// 2. Three dot-separated, non-empty base64url parts
/// 3. Header decodes to JSON and declares `alg: EdDSA`
/// 4. Payload decodes to a [`TokenClaims`] JSON object
///
/// The returned claims are UNVERIFIED. They are suitable only for deciding
/// which registered application key to verify the signature with; every
/// trust decision must wait for signature verification.
///
/// # Errors
///
/// Returns a [`TokenParseError`] describing the first structural defect.
pub fn parse_compact_unverified(token: &str) -> Result<TokenClaims, TokenParseError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(TokenParseError::TokenTooLarge);
    }

    // Compact serialization: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: not a three-part compact serialization"
        );
        return Err(TokenParseError::MalformedStructure);
    }

    let header_part = parts.first().ok_or(TokenParseError::MalformedStructure)?;
    let payload_part = parts.get(1).ok_or(TokenParseError::MalformedStructure)?;
    let signature_part = parts.get(2).ok_or(TokenParseError::MalformedStructure)?;

    // The signature must at least be decodable base64url; verification happens
    // later against the registered application key.
    if URL_SAFE_NO_PAD.decode(signature_part).is_err() {
        tracing::debug!(target: "common.jwt", "Token rejected: signature part is not base64url");
        return Err(TokenParseError::MalformedStructure);
    }

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode token header base64");
        TokenParseError::MalformedHeader
    })?;
    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse token header JSON");
        TokenParseError::MalformedHeader
    })?;

    let alg = header.get("alg").and_then(|v| v.as_str()).unwrap_or("");
    if alg != ACCEPTED_ALGORITHM {
        tracing::debug!(
            target: "common.jwt",
            algorithm = alg,
            "Token rejected: unsupported signature algorithm"
        );
        return Err(TokenParseError::UnsupportedAlgorithm);
    }

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode token payload base64");
        TokenParseError::MalformedPayload
    })?;
    let claims: TokenClaims = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse token claims JSON");
        TokenParseError::MalformedPayload
    })?;

    Ok(claims)
}

/// Decode an Ed25519 public key from PEM format.
///
/// Strips PEM header/footer lines and decodes the base64 content. The result
/// is the DER-encoded key suitable for `DecodingKey::from_ed_der`.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the base64 content cannot be decoded.
pub fn decode_ed25519_public_key_pem(pem: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let b64: String = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();

    general_purpose::STANDARD.decode(b64)
}

// =============================================================================
// Tests
// =============================================================================
