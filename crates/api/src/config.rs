//! Application configuration

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub public_url: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Authentication
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,

    // Payment provider
    /// Shared secret the provider sends back in the x-callback-token
    /// header. None when unset or empty; the webhook then rejects
    /// everything (fail closed).
    pub payment_webhook_secret: Option<String>,
    pub payment_api_key: String,
    pub payment_product_id: String,
    pub payment_api_base_url: String,

    // AI completions
    pub openai_api_key: String,
    pub openai_api_base_url: String,
    pub openai_model: String,

    // Signup
    pub signup_token_grant: i32,
    pub enable_signup: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),

            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),

            // Authentication
            jwt_secret: {
                let secret =
                    env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
                if secret.len() < 32 {
                    return Err(ConfigError::WeakSecret(
                        "JWT_SECRET must be at least 32 characters",
                    ));
                }
                secret
            },
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),

            // Payment provider
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            payment_api_key: env::var("PAYMENT_API_KEY").unwrap_or_default(),
            payment_product_id: env::var("PAYMENT_PRODUCT_ID").unwrap_or_default(),
            payment_api_base_url: env::var("PAYMENT_API_BASE_URL")
                .unwrap_or_else(|_| scripta_ledger::license::DEFAULT_BASE_URL.to_string()),

            // AI completions
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_api_base_url: env::var("OPENAI_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),

            // Signup
            signup_token_grant: env::var("SIGNUP_TOKEN_GRANT")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            enable_signup: env::var("ENABLE_SIGNUP")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn setup_minimal_config() {
        env::set_var("DATABASE_URL", "postgres://test");
        env::set_var(
            "JWT_SECRET",
            "test-jwt-secret-must-be-at-least-32-characters-long",
        );
    }

    fn cleanup_config() {
        env::remove_var("DATABASE_URL");
        env::remove_var("JWT_SECRET");
        env::remove_var("PAYMENT_WEBHOOK_SECRET");
        env::remove_var("SIGNUP_TOKEN_GRANT");
    }

    #[test]
    #[serial]
    fn test_missing_database_url() {
        cleanup_config();
        env::set_var(
            "JWT_SECRET",
            "test-jwt-secret-must-be-at-least-32-characters-long",
        );

        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
        cleanup_config();
    }

    #[test]
    #[serial]
    fn test_short_jwt_secret_rejected() {
        cleanup_config();
        env::set_var("DATABASE_URL", "postgres://test");
        env::set_var("JWT_SECRET", "too-short");

        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::WeakSecret(_))));
        cleanup_config();
    }

    #[test]
    #[serial]
    fn test_empty_webhook_secret_treated_as_unset() {
        setup_minimal_config();
        env::set_var("PAYMENT_WEBHOOK_SECRET", "");

        let config = Config::from_env().unwrap();
        assert!(config.payment_webhook_secret.is_none());

        env::set_var("PAYMENT_WEBHOOK_SECRET", "whsec_live");
        let config = Config::from_env().unwrap();
        assert_eq!(config.payment_webhook_secret.as_deref(), Some("whsec_live"));
        cleanup_config();
    }

    #[test]
    #[serial]
    fn test_signup_grant_default_and_override() {
        setup_minimal_config();
        env::remove_var("SIGNUP_TOKEN_GRANT");
        assert_eq!(Config::from_env().unwrap().signup_token_grant, 3);

        env::set_var("SIGNUP_TOKEN_GRANT", "10");
        assert_eq!(Config::from_env().unwrap().signup_token_grant, 10);
        cleanup_config();
    }
}
