//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use medimate_core::lookup::{PurchaseLinkPolicy, PurchaseLinkSource, DEFAULT_PURCHASE_SEARCH_URL};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_RXNAV_BASE_URL: &str = "https://rxnav.nlm.nih.gov/REST";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub rxnav_base_url: String,
    pub purchase_links: PurchaseLinkPolicy,
    pub allowed_origin: String,
    pub session_ttl_days: i64,
    /// How long a signed-in user's workspace may sit unused before it is released.
    pub workspace_idle_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Load Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Lookup Settings ---
        let rxnav_base_url = var("RXNAV_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_RXNAV_BASE_URL.to_string());

        let search_url_prefix = var("PURCHASE_SEARCH_URL")
            .unwrap_or_else(|| DEFAULT_PURCHASE_SEARCH_URL.to_string());
        let source = match var("PURCHASE_LINK_SOURCE") {
            Some(value) => value.parse::<PurchaseLinkSource>().map_err(|e| {
                ConfigError::InvalidValue("PURCHASE_LINK_SOURCE".to_string(), e)
            })?,
            None => PurchaseLinkSource::default(),
        };

        // --- Load Web Settings ---
        let allowed_origin =
            var("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        let session_ttl_days = match var("SESSION_TTL_DAYS") {
            Some(value) => value
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "SESSION_TTL_DAYS".to_string(),
                        format!("'{}' is not a positive number of days", value),
                    )
                })?,
            None => 30,
        };

        let workspace_idle_minutes = match var("WORKSPACE_IDLE_MINUTES") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "WORKSPACE_IDLE_MINUTES".to_string(),
                        format!("'{}' is not a positive number of minutes", value),
                    )
                })?,
            None => 30,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            rxnav_base_url,
            purchase_links: PurchaseLinkPolicy {
                search_url_prefix,
                source,
            },
            allowed_origin,
            session_ttl_days,
            workspace_idle_timeout: Duration::from_secs(workspace_idle_minutes.saturating_mul(60)),
        })
    }
}
