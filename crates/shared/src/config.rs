//! Application configuration management.

use serde::Deserialize;

use crate::types::money::Currency;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Payment gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
///
/// Without a URL the server runs on the in-memory store.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Which payment gateway implementation to wire in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProvider {
    /// In-process gateway for development.
    #[default]
    Sandbox,
    /// Stripe payment intents over HTTPS.
    Stripe,
}

/// Payment gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Selected provider.
    #[serde(default)]
    pub provider: GatewayProvider,
    /// Provider secret key.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Provider API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Upper bound for any single gateway call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Currency donations are collected in.
    #[serde(default = "default_currency")]
    pub currency: Currency,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: GatewayProvider::default(),
            secret_key: None,
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            currency: default_currency(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_currency() -> Currency {
    Currency::Usd
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CAREFUND").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        temp_env::with_vars_unset(
            [
                "CAREFUND__DATABASE__URL",
                "CAREFUND__GATEWAY__PROVIDER",
                "CAREFUND__SERVER__PORT",
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.server.port, 8080);
                assert!(config.database.url.is_none());
                assert_eq!(config.gateway.provider, GatewayProvider::Sandbox);
                assert_eq!(config.gateway.timeout_secs, 10);
                assert_eq!(config.gateway.currency, Currency::Usd);
            },
        );
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                (
                    "CAREFUND__DATABASE__URL",
                    Some("postgres://localhost/carefund"),
                ),
                ("CAREFUND__GATEWAY__PROVIDER", Some("stripe")),
                ("CAREFUND__SERVER__PORT", Some("9090")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(
                    config.database.url.as_deref(),
                    Some("postgres://localhost/carefund")
                );
                assert_eq!(config.gateway.provider, GatewayProvider::Stripe);
                assert_eq!(config.server.port, 9090);
            },
        );
    }
}
