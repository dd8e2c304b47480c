/// Configuration management for the discovery service
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// MongoDB configuration
    pub mongo: MongoConfig,
    /// Counter reconciliation worker configuration
    pub reconcile: ReconcileConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub http_port: u16,
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection URI (mongodb://host:port)
    pub uri: String,
    /// Database name
    #[serde(default = "default_db_name")]
    pub db_name: String,
}

/// Reconciliation worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Seconds between reconciliation sweeps
    #[serde(default = "default_reconcile_interval")]
    pub interval_secs: u64,
    /// Whether the background sweep runs at all
    #[serde(default = "default_reconcile_enabled")]
    pub enabled: bool,
}

// Default values
fn default_db_name() -> String {
    "discovery".to_string()
}

fn default_reconcile_interval() -> u64 {
    300
}

fn default_reconcile_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8010),
        };

        let mongo = MongoConfig {
            uri: std::env::var("MONGODB_URI")
                .context("MONGODB_URI environment variable not set")?,
            db_name: std::env::var("MONGODB_DB").unwrap_or_else(|_| default_db_name()),
        };

        let reconcile = ReconcileConfig {
            interval_secs: std::env::var("RECONCILE_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_reconcile_interval),
            enabled: std::env::var("RECONCILE_ENABLED")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or_else(|_| default_reconcile_enabled()),
        };

        Ok(Config {
            app,
            mongo,
            reconcile,
        })
    }
}
