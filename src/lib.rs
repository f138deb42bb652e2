//! Land-Ledger: a polite land-record hierarchy harvester
//!
//! This crate walks the district -> mandal -> village -> survey -> khata hierarchy
//! exposed by government land-record portals, either through stateful postback
//! dropdowns or through stateless GET endpoints, and writes one CSV file per level.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod hierarchy;
pub mod output;

use thiserror::Error;

/// Main error type for Land-Ledger operations
///
/// Only conditions that must stop a whole run surface here. Per-node failures
/// (network errors after retries, unparseable payloads, invalid child codes) are
/// absorbed where they happen and reported through logging.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Portal '{portal}' returned no regions; the session credential has likely expired")]
    SessionExpired { portal: String },

    #[error("Portal '{portal}' has none of the requested regions: {requested}")]
    UnknownRegions { portal: String, requested: String },

    #[error("Unknown portal '{0}'")]
    UnknownPortal(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid endpoint template: {0}")]
    InvalidTemplate(String),
}

/// Result type alias for Land-Ledger operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use hierarchy::{Level, Node, NodePath, Row};
