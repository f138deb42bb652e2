//! GET-endpoint traversal with bounded concurrency
//!
//! Stateless portals expose one endpoint per level, keyed by the codes of the
//! ancestors. Requests are independent, so siblings at every depth fan out
//! concurrently; a single [`ConcurrencyLimiter`] shared by all requests keeps
//! the number in flight under the configured ceiling.

use crate::config::{EndpointSettings, PortalConfig, ResponseFormat, StatelessSettings};
use crate::crawler::fetcher::{PortalRequest, RequestClient};
use crate::crawler::limiter::ConcurrencyLimiter;
use crate::crawler::traversal::{Discovery, Traversal};
use crate::extract::{excerpt, extract_json_nodes, extract_options, SentinelFilter};
use crate::hierarchy::{Level, Node, NodePath};
use crate::{ConfigError, HarvestError};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Concurrent traversal of a GET-endpoint portal
#[derive(Debug)]
pub struct StatelessTraversal {
    name: String,
    base_url: Url,
    settings: StatelessSettings,
    sentinels: SentinelFilter,
    client: RequestClient,
    limiter: Arc<ConcurrencyLimiter>,
}

impl StatelessTraversal {
    /// Creates the traversal for a portal with a `[portal.stateless]` section
    ///
    /// Every request made by the traversal holds a permit of `limiter`.
    pub fn new(
        portal: &PortalConfig,
        client: RequestClient,
        limiter: Arc<ConcurrencyLimiter>,
    ) -> Result<Self, HarvestError> {
        let settings = portal.stateless.clone().ok_or_else(|| {
            ConfigError::Validation(format!(
                "portal '{}' has no [portal.stateless] section",
                portal.name
            ))
        })?;

        Ok(Self {
            name: portal.name.clone(),
            base_url: Url::parse(&portal.base_url)?,
            settings,
            sentinels: SentinelFilter::from(&portal.sentinels),
            client: client.with_limiter(Arc::clone(&limiter)),
            limiter,
        })
    }

    /// The limiter shared by every request
    pub fn limiter(&self) -> &Arc<ConcurrencyLimiter> {
        &self.limiter
    }

    /// Resolves an endpoint against the base URL with its parameters filled in
    /// from `parent`
    pub fn endpoint_url(&self, endpoint: &EndpointSettings, parent: &NodePath) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.join(&endpoint.path)?;
        if !endpoint.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, template) in &endpoint.params {
                pairs.append_pair(name, &render_template(template, parent));
            }
        }
        Ok(url)
    }

    /// Reads the child list out of an endpoint response
    fn parse_children(&self, endpoint: &EndpointSettings, body: &str, parent: &NodePath) -> Vec<Node> {
        match endpoint.format {
            ResponseFormat::Options => {
                let options = extract_options(body, endpoint.hint.as_deref(), &self.sentinels);
                if options.is_empty() && !body.to_ascii_lowercase().contains("<option") {
                    tracing::warn!(
                        "{}: no options for {}: {:?}",
                        self.name,
                        parent,
                        excerpt(body)
                    );
                }
                options.into_nodes()
            }
            ResponseFormat::Json => {
                match extract_json_nodes(body, &endpoint.id_fields, &endpoint.label_fields, &self.sentinels) {
                    Some(nodes) => nodes,
                    None => {
                        tracing::warn!(
                            "{}: unreadable JSON for {}: {:?}",
                            self.name,
                            parent,
                            excerpt(body)
                        );
                        Vec::new()
                    }
                }
            }
        }
    }
}

/// Replaces `{region}`, `{subregion}`, ... with the codes selected along `path`
fn render_template(template: &str, path: &NodePath) -> String {
    Level::ALL.iter().fold(template.to_string(), |rendered, level| {
        match path.code_at(*level) {
            Some(code) => rendered.replace(&level.placeholder(), code),
            None => rendered,
        }
    })
}

/// Keeps children whose code is an integer, normalizing it
///
/// Returns the kept nodes and how many were skipped.
fn coerce_numeric(nodes: Vec<Node>) -> (Vec<Node>, usize) {
    let total = nodes.len();
    let kept: Vec<Node> = nodes
        .iter()
        .filter_map(|node| {
            let coerced = node.coerce_numeric();
            if coerced.is_none() {
                tracing::debug!("Skipping non-numeric id {:?} ({})", node.code, node.label);
            }
            coerced
        })
        .collect();
    let skipped = total - kept.len();
    (kept, skipped)
}

#[async_trait]
impl Traversal for StatelessTraversal {
    type Context = ();

    fn name(&self) -> &str {
        &self.name
    }

    fn deepest_level(&self) -> Level {
        self.settings.deepest_level()
    }

    async fn discover_roots(&self) -> (Discovery, ()) {
        let url = match self.base_url.join(&self.settings.root_path) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("{}: invalid root path: {}", self.name, e);
                return (Discovery::Unavailable, ());
            }
        };

        let request = PortalRequest::get(url, format!("{} regions", self.name));
        let Some(body) = self.client.send_with_report(&request).await.body else {
            return (Discovery::Unavailable, ());
        };

        let regions = extract_options(&body, self.settings.region_hint.as_deref(), &self.sentinels);
        if regions.is_empty() {
            tracing::warn!("{}: no regions in {:?}", self.name, excerpt(&body));
        }

        let nodes = regions.into_nodes();
        let discovery = if self.settings.region_numeric_ids {
            let (nodes, skipped) = coerce_numeric(nodes);
            Discovery::Children { nodes, skipped }
        } else {
            Discovery::children(nodes)
        };
        (discovery, ())
    }

    async fn discover_children(&self, _ctx: &mut (), parent: &NodePath) -> Discovery {
        let Some(child_level) = parent.child_level() else {
            return Discovery::empty();
        };
        let Some(endpoint) = self.settings.endpoint(child_level) else {
            return Discovery::empty();
        };

        let url = match self.endpoint_url(endpoint, parent) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("{}: invalid {} endpoint: {}", self.name, child_level, e);
                return Discovery::Unavailable;
            }
        };

        let label = format!("{} {} for {}", self.name, child_level, parent);
        let Some(body) = self.client.send_with_report(&PortalRequest::get(url, label)).await.body
        else {
            return Discovery::Unavailable;
        };
        if body.trim().is_empty() {
            tracing::warn!("{}: empty response for {} of {}", self.name, child_level, parent);
        }

        let nodes = self.parse_children(endpoint, &body, parent);
        if endpoint.numeric_ids {
            let (nodes, skipped) = coerce_numeric(nodes);
            Discovery::Children { nodes, skipped }
        } else {
            Discovery::children(nodes)
        }
    }

    fn branch(&self, _ctx: &()) -> Option<()> {
        Some(())
    }
}
