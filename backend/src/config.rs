//! Configuration management for the Kitchen Operations Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with KITCHEN__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// JWT verification settings
    pub jwt: JwtConfig,

    /// Sale and token issuance rules
    pub issuance: IssuanceConfig,

    /// Token barcode and QR rendering
    pub artifacts: ArtifactConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Shared secret the identity service signs bearer tokens with (HS256)
    pub secret: String,

    /// Clock skew tolerated when checking `exp`, in seconds
    pub leeway_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IssuanceConfig {
    /// Refuse to reserve capacity from plans that are not cooked yet
    pub require_cooked_plan: bool,

    /// Length of generated sale and token codes
    pub code_length: usize,

    /// Attempts before giving up on a unique code
    pub code_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactConfig {
    /// Barcode height in pixels
    pub barcode_height: u32,

    /// Pixel width of one barcode module
    pub barcode_module_width: u32,

    /// Pixel size of one QR module
    pub qr_module_size: u32,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("KITCHEN_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("jwt.leeway_secs", 60)?
            .set_default("issuance.require_cooked_plan", false)?
            .set_default("issuance.code_length", shared::codes::DEFAULT_CODE_LENGTH as i64)?
            .set_default("issuance.code_attempts", 5)?
            .set_default("artifacts.barcode_height", 80)?
            .set_default("artifacts.barcode_module_width", 2)?
            .set_default("artifacts.qr_module_size", 8)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (KITCHEN__ prefix)
            .add_source(
                Environment::with_prefix("KITCHEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
