//! Builder patterns for test data construction.
//!
//! `TestTokenBuilder` produces real EdDSA-signed compact tokens, with every
//! registered claim individually controllable (including its absence) so
//! each claim rule can be violated in isolation.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for signed test tokens.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .issuer("wiki-assistant")
///     .subject("alice")
///     .audience(&["https://wiki.example.com"])
///     .expires_in(3600)
///     .sign(&private_pkcs8)?;
/// ```
pub struct TestTokenBuilder {
    iss: Option<String>,
    sub: Option<String>,
    aud: Option<Value>,
    exp: Option<i64>,
    iat: Option<i64>,
    nbf: Option<i64>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a builder whose defaults pass every claim rule: issued now,
    /// expiring in an hour, no audience restriction.
    pub fn new() -> Self {
        let now = Utc::now().timestamp();
        Self {
            iss: Some("test-app".to_string()),
            sub: Some("test-subject".to_string()),
            aud: None,
            exp: Some(now + 3600),
            iat: Some(now),
            nbf: None,
            extra: Map::new(),
        }
    }

    /// Set the issuer.
    pub fn issuer(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Drop the issuer claim entirely.
    pub fn no_issuer(mut self) -> Self {
        self.iss = None;
        self
    }

    /// Set the subject.
    pub fn subject(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Drop the subject claim entirely.
    pub fn no_subject(mut self) -> Self {
        self.sub = None;
        self
    }

    /// Set the audience as an array of entries.
    pub fn audience(mut self, entries: &[&str]) -> Self {
        self.aud = Some(json!(entries));
        self
    }

    /// Set the audience as a single JSON string (the compact form some
    /// issuers emit).
    pub fn audience_string(mut self, entry: &str) -> Self {
        self.aud = Some(json!(entry));
        self
    }

    /// Set the expiration timestamp.
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = Some(timestamp);
        self
    }

    /// Set expiration in seconds from now.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some(Utc::now().timestamp() + seconds);
        self
    }

    /// Drop the expiration claim entirely.
    pub fn no_expiration(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Set the issued-at timestamp.
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = Some(timestamp);
        self
    }

    /// Drop the issued-at claim entirely.
    pub fn no_issued_at(mut self) -> Self {
        self.iat = None;
        self
    }

    /// Set the not-before timestamp.
    pub fn not_before(mut self, timestamp: i64) -> Self {
        self.nbf = Some(timestamp);
        self
    }

    /// Attach an arbitrary extra claim.
    pub fn claim(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Build the claims as a JSON value.
    pub fn claims_value(&self) -> Value {
        let mut claims = self.extra.clone();
        if let Some(iss) = &self.iss {
            claims.insert("iss".to_string(), json!(iss));
        }
        if let Some(sub) = &self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        if let Some(aud) = &self.aud {
            claims.insert("aud".to_string(), aud.clone());
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), json!(iat));
        }
        if let Some(nbf) = self.nbf {
            claims.insert("nbf".to_string(), json!(nbf));
        }
        Value::Object(claims)
    }

    /// Sign the claims with an Ed25519 private key (PKCS#8 DER), producing a
    /// compact EdDSA token.
    pub fn sign(&self, private_key_pkcs8: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
        let header = Header::new(Algorithm::EdDSA);
        let encoding_key = EncodingKey::from_ed_der(private_key_pkcs8);
        encode(&header, &self.claims_value(), &encoding_key)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
