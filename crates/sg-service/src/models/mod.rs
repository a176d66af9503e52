//! Data models for registered applications and resolved identities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A registered external application trusted to issue tokens.
///
/// Maps to the `authorized_applications` table. Administrator-managed;
/// read-only to the authentication pipeline.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthorizedApplication {
    /// Issuer string carried in the application's tokens; unique key.
    pub issuer: String,
    /// Display name.
    pub name: String,
    /// Template for the group assigned to authenticated subjects. Supports
    /// the `{issuer}`, `{subject}` and `{name}` placeholders; anything else
    /// passes through verbatim.
    pub group_format: String,
    /// Ed25519 verification key, PEM encoded.
    pub public_key: String,
}

impl AuthorizedApplication {
    /// Expand `group_format` for one authenticated subject.
    #[must_use]
    pub fn render_group(&self, subject: &str) -> String {
        self.group_format
            .replace("{issuer}", &self.issuer)
            .replace("{subject}", subject)
            .replace("{name}", &self.name)
    }
}

impl fmt::Debug for AuthorizedApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The public key is not secret but is long and useless in logs.
        f.debug_struct("AuthorizedApplication")
            .field("issuer", &self.issuer)
            .field("name", &self.name)
            .field("group_format", &self.group_format)
            .field("public_key", &"[PEM]")
            .finish()
    }
}

/// A local account resolved from a verified issuer + subject pair.
///
/// Maps to the `users` table, unique per `(issuer, subject)`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub issuer: String,
    /// The subject within the issuer's namespace. Redacted in Debug output.
    pub subject: String,
    /// Group membership derived from the application's `group_format`.
    #[sqlx(rename = "group_name")]
    pub group: String,
}

impl fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("user_id", &self.user_id)
            .field("issuer", &self.issuer)
            .field("subject", &"[REDACTED]")
            .field("group", &self.group)
            .finish()
    }
}
