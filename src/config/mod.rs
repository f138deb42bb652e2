//! Configuration module for Land-Ledger
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use land_ledger::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("portals.toml")).unwrap();
//! println!("Concurrency ceiling: {}", config.crawler.max_concurrent_requests);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, EndpointSettings, OutputConfig, PortalConfig, PortalKind,
    ResponseFormat, SelectorSettings, SentinelConfig, StatefulSettings, StatelessSettings,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
