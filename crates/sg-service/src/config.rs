use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default bind address for the gateway.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8083";

/// Default group whose members may manage registered applications.
pub const DEFAULT_ADMIN_GROUP: &str = "admins";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// The service's own canonical URL (scheme + host + port). Tokens that
    /// carry an audience must include this URL among their entries.
    pub base_url: String,
    /// Name of the fallback authenticator to use for requests without a
    /// bearer token. Empty or unset selects the built-in guest fallback.
    pub fallback_authenticator: Option<String>,
    pub admin_group: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let base_url = vars
            .get("SG_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("SG_BASE_URL".to_string()))?
            .clone();

        if url::Url::parse(&base_url).is_err() {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }

        let fallback_authenticator = vars
            .get("SG_FALLBACK_AUTHENTICATOR")
            .cloned()
            .filter(|name| !name.is_empty());

        let admin_group = vars
            .get("SG_ADMIN_GROUP")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ADMIN_GROUP.to_string());

        Ok(Config {
            database_url,
            bind_address,
            base_url,
            fallback_authenticator,
            admin_group,
        })
    }
}
