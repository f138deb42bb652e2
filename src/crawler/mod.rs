//! Crawler module for hierarchy traversal
//!
//! This module contains the core harvesting logic, including:
//! - HTTP requests with retry logic
//! - Concurrency limiting
//! - The recursive descent shared by all strategies
//! - Stateful (postback) and stateless (GET) strategies
//! - Overall harvest coordination

mod coordinator;
mod fetcher;
mod limiter;
mod stateful;
mod stateless;
mod traversal;

pub use coordinator::{harvest, Coordinator, HarvestOptions};
pub use fetcher::{build_http_client, PortalRequest, RequestClient, RetryPolicy, SendReport};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use stateful::StatefulTraversal;
pub use stateless::StatelessTraversal;
pub use traversal::{descend, fan_out, Discovery, Traversal};

use crate::config::Config;
use crate::output::StatisticsSnapshot;
use crate::HarvestError;

/// Runs a complete harvest
///
/// This is the main entry point for starting a harvest. For every selected
/// portal it will:
/// 1. Open one CSV file per level
/// 2. Build the HTTP client with the portal's session
/// 3. Discover regions and apply the region filter
/// 4. Descend the hierarchy
/// 5. Flush output and print statistics
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `options` - Portal, region and output selections
///
/// # Returns
///
/// * `Ok(stats)` - Statistics of every portal harvested
/// * `Err(HarvestError)` - A fatal error stopped the harvest
pub async fn crawl(
    config: Config,
    options: HarvestOptions,
) -> Result<Vec<(String, StatisticsSnapshot)>, HarvestError> {
    Coordinator::new(config, options)?.run().await
}
