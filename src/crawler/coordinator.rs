//! Harvest coordinator - top-level orchestration
//!
//! This module picks a traversal strategy for each selected portal and drives it:
//! - Building the portal's HTTP client and output sinks
//! - Applying the region filter
//! - Running the recursive descent
//! - Handling Ctrl-C interrupts
//! - Flushing output and reporting statistics

use crate::config::{Config, PortalConfig, PortalKind};
use crate::crawler::fetcher::{build_http_client, RequestClient, RetryPolicy};
use crate::crawler::limiter::ConcurrencyLimiter;
use crate::crawler::stateful::StatefulTraversal;
use crate::crawler::stateless::StatelessTraversal;
use crate::crawler::traversal::{fan_out, Discovery, Traversal};
use crate::hierarchy::{Node, NodePath};
use crate::output::{print_statistics, Aggregator, RunStatus, StatisticsSnapshot};
use crate::HarvestError;
use std::path::PathBuf;
use std::sync::Arc;

/// Run-time selections layered over the configuration
#[derive(Debug, Clone, Default)]
pub struct HarvestOptions {
    /// Portals to harvest; empty harvests every configured portal
    pub portals: Vec<String>,

    /// Region codes to harvest; overrides each portal's `regions` when non-empty
    pub regions: Vec<String>,

    /// Overrides `output.directory`
    pub output: Option<PathBuf>,
}

/// Walks the hierarchy of one portal, emitting every discovered node
///
/// Regions are discovered first and narrowed to `region_filter` (every region if
/// the filter is empty). The descent then runs until every branch reached the
/// strategy's deepest level or ran out of children.
///
/// # Errors
///
/// * `HarvestError::SessionExpired` - The portal returned no regions
/// * `HarvestError::UnknownRegions` - None of the requested regions exist
pub async fn harvest<T: Traversal>(
    traversal: &T,
    sink: &Aggregator,
    region_filter: &[String],
) -> Result<(), HarvestError> {
    let (discovery, mut ctx) = traversal.discover_roots().await;

    let regions = match discovery {
        Discovery::Children { nodes, skipped } => {
            if skipped > 0 {
                tracing::warn!("{}: skipped {} invalid region id(s)", traversal.name(), skipped);
                sink.statistics().record_skipped(skipped);
            }
            nodes
        }
        Discovery::Unavailable => Vec::new(),
    };

    if regions.is_empty() {
        return Err(HarvestError::SessionExpired {
            portal: traversal.name().to_string(),
        });
    }

    let selected = select_regions(regions, region_filter);
    if selected.is_empty() {
        return Err(HarvestError::UnknownRegions {
            portal: traversal.name().to_string(),
            requested: region_filter.join(", "),
        });
    }

    tracing::info!(
        "{}: harvesting {} region(s) down to {}",
        traversal.name(),
        selected.len(),
        traversal.deepest_level()
    );

    fan_out(traversal, sink, &mut ctx, &NodePath::root(), selected).await;
    Ok(())
}

/// Keeps the regions whose code is listed in `filter`, or all of them if it is empty
fn select_regions(regions: Vec<Node>, filter: &[String]) -> Vec<Node> {
    if filter.is_empty() {
        return regions;
    }
    regions
        .into_iter()
        .filter(|region| filter.iter().any(|code| code.trim() == region.code))
        .collect()
}

/// Drives the harvest of every selected portal
pub struct Coordinator {
    config: Arc<Config>,
    options: HarvestOptions,
}

impl Coordinator {
    /// Creates a coordinator
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Every requested portal exists
    /// * `Err(HarvestError::UnknownPortal)` - A requested portal is not configured
    pub fn new(config: Config, options: HarvestOptions) -> Result<Self, HarvestError> {
        if let Some(missing) = options.portals.iter().find(|name| config.portal(name).is_none()) {
            return Err(HarvestError::UnknownPortal(missing.clone()));
        }

        Ok(Self {
            config: Arc::new(config),
            options,
        })
    }

    /// Portals that will be harvested, in configuration order
    pub fn selected_portals(&self) -> Vec<&PortalConfig> {
        self.config
            .portals
            .iter()
            .filter(|p| self.options.portals.is_empty() || self.options.portals.contains(&p.name))
            .collect()
    }

    /// Region filter applied to `portal`
    pub fn region_filter<'a>(&'a self, portal: &'a PortalConfig) -> &'a [String] {
        if self.options.regions.is_empty() {
            &portal.regions
        } else {
            &self.options.regions
        }
    }

    /// Directory receiving the CSV files of `portal`
    pub fn output_directory(&self, portal: &PortalConfig) -> PathBuf {
        self.options
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.config.output.directory))
            .join(&portal.name)
    }

    /// Harvests every selected portal in turn
    ///
    /// Stops after the first interrupted portal. Returns the statistics of every
    /// portal that ran.
    pub async fn run(&self) -> Result<Vec<(String, StatisticsSnapshot)>, HarvestError> {
        let mut results = Vec::new();

        for portal in self.selected_portals() {
            let snapshot = self.run_portal(portal).await?;
            let interrupted = snapshot.status == RunStatus::Interrupted;
            results.push((portal.name.clone(), snapshot));
            if interrupted {
                tracing::warn!("Harvest interrupted; remaining portals skipped");
                break;
            }
        }

        Ok(results)
    }

    /// Runs the strategy matching the portal's kind
    async fn drive(
        &self,
        portal: &PortalConfig,
        client: RequestClient,
        aggregator: &Aggregator,
    ) -> Result<(), HarvestError> {
        let regions = self.region_filter(portal);

        match portal.kind {
            PortalKind::Stateful => {
                let traversal = StatefulTraversal::new(portal, client)?;
                harvest(&traversal, aggregator, regions).await
            }
            PortalKind::Stateless => {
                let limiter = Arc::new(ConcurrencyLimiter::new(
                    self.config.crawler.max_concurrent_requests as usize,
                ));
                let traversal = StatelessTraversal::new(portal, client, Arc::clone(&limiter))?;
                let result = harvest(&traversal, aggregator, regions).await;
                tracing::info!(
                    "{}: peak in-flight requests {} (ceiling {})",
                    portal.name,
                    limiter.peak(),
                    limiter.ceiling()
                );
                result
            }
        }
    }

    /// Harvests one portal, writing its CSV files and printing its statistics
    pub async fn run_portal(&self, portal: &PortalConfig) -> Result<StatisticsSnapshot, HarvestError> {
        let directory = self.output_directory(portal);
        tracing::info!("{}: writing to {}", portal.name, directory.display());
        let aggregator = Aggregator::open_csv(&directory)?;

        let crawler = &self.config.crawler;
        let client = RequestClient::new(
            build_http_client(crawler, portal)?,
            RetryPolicy::from_config(crawler),
        );

        let crawl = self.drive(portal, client, &aggregator);

        let outcome = tokio::select! {
            result = crawl => result.map(|()| RunStatus::Completed),
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("{}: interrupt received, stopping", portal.name);
                Ok(RunStatus::Interrupted)
            }
        };

        let status = match outcome {
            Ok(status) => status,
            Err(e) => {
                if let Err(flush_error) = aggregator.finish(RunStatus::Interrupted) {
                    tracing::error!("{}: failed to flush output: {}", portal.name, flush_error);
                }
                return Err(e);
            }
        };

        let snapshot = aggregator.finish(status)?;
        tracing::info!(
            "{}: {} ({} rows)",
            portal.name,
            status.as_str(),
            snapshot.total_rows()
        );
        print_statistics(&portal.name, &snapshot);

        Ok(snapshot)
    }
}
