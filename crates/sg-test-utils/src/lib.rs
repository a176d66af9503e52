//! # SG Test Utilities
//!
//! Shared test utilities for the ScribeGate service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (seeded Ed25519 keys for reproducible tests)
//! - A signed-token builder (`TestTokenBuilder`)
//! - In-memory store implementations (application registry, identity store)
//! - A recording fallback authenticator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sg_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let (public_pem, private_pkcs8) = test_signing_key(1)?;
//!
//!     let token = TestTokenBuilder::new()
//!         .issuer("wiki-assistant")
//!         .subject("alice")
//!         .sign(&private_pkcs8)?;
//!
//!     // feed the token to a TokenAuthenticator built on in-memory stores
//! }
//! ```

pub mod crypto_fixtures;
pub mod stores;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use stores::*;
pub use token_builders::*;
