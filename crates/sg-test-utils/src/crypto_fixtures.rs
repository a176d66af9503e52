//! Deterministic cryptographic fixtures for testing.
//!
//! Provides reproducible Ed25519 keypairs in the formats the gateway works
//! with: the public half as PEM (what administrators register for an
//! application), the private half as PKCS#8 DER (what `jsonwebtoken` signs
//! with). The same seed always produces the same keypair.

use base64::engine::general_purpose;
use base64::Engine;
use ring::signature::{Ed25519KeyPair, KeyPair};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Generate a deterministic Ed25519 keypair for testing.
///
/// # Arguments
/// * `seed` - Seed value for deterministic key generation (0-255)
///
/// # Returns
/// * `Ok((public_key_pem, private_key_pkcs8))` - Public key in PEM format,
///   private key as a PKCS#8 v1 DER document
///
/// # Errors
///
/// Returns [`FixtureError::Crypto`] if ring rejects the derived seed.
pub fn test_signing_key(seed: u8) -> Result<(String, Vec<u8>), FixtureError> {
    // Spread the one-byte seed over the full 32-byte Ed25519 seed.
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }

    // Deterministic, test-only key derivation. Real applications generate
    // their keys with a CSPRNG and register only the public half.
    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

    let public_key_b64 = general_purpose::STANDARD.encode(key_pair.public_key().as_ref());
    let public_key_pem = format!(
        "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
        public_key_b64
    );

    Ok((public_key_pem, pkcs8_v1_from_seed(&seed_bytes)))
}

/// Build a PKCS#8 v1 document around an Ed25519 seed.
///
/// Ring does not expose PKCS#8 export for keypairs built from a raw seed, so
/// the 48-byte document is assembled by hand (RFC 5208 / RFC 8410):
///
/// ```text
/// SEQUENCE {
///   version    INTEGER (0),
///   algorithm  AlgorithmIdentifier (OID 1.3.101.112, Ed25519),
///   privateKey OCTET STRING { OCTET STRING (32-byte seed) }
/// }
/// ```
fn pkcs8_v1_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);

    // Outer SEQUENCE, 46 bytes of content
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    // version INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // AlgorithmIdentifier SEQUENCE holding the Ed25519 OID
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // privateKey OCTET STRING wrapping an OCTET STRING with the seed
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}
