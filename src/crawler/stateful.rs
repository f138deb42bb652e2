//! Postback-driven traversal
//!
//! Stateful portals render every dropdown on one page. Selecting a region posts
//! the whole form back (as an async partial update) and the server answers with
//! the sub-region options plus a fresh set of hidden tokens that must accompany
//! the next request. The traversal therefore threads a single [`FormState`]
//! through every request and never explores siblings concurrently.

use crate::config::{PortalConfig, SelectorSettings, StatefulSettings};
use crate::crawler::fetcher::{PortalRequest, RequestClient};
use crate::crawler::traversal::{Discovery, Traversal};
use crate::extract::{excerpt, extract_options, FormState, SentinelFilter};
use crate::hierarchy::{Level, NodePath};
use crate::{ConfigError, HarvestError};
use async_trait::async_trait;
use url::Url;

/// Sequential traversal of a postback portal down to localities
#[derive(Debug)]
pub struct StatefulTraversal {
    name: String,
    url: Url,
    settings: StatefulSettings,
    sentinels: SentinelFilter,
    client: RequestClient,
}

impl StatefulTraversal {
    /// Creates the traversal for a portal with a `[portal.stateful]` section
    pub fn new(portal: &PortalConfig, client: RequestClient) -> Result<Self, HarvestError> {
        let settings = portal.stateful.clone().ok_or_else(|| {
            ConfigError::Validation(format!(
                "portal '{}' has no [portal.stateful] section",
                portal.name
            ))
        })?;

        Ok(Self {
            name: portal.name.clone(),
            url: Url::parse(&portal.base_url)?,
            settings,
            sentinels: SentinelFilter::from(&portal.sentinels),
            client,
        })
    }

    fn selector(&self, level: Level) -> Option<&SelectorSettings> {
        match level {
            Level::Region => Some(&self.settings.region),
            Level::SubRegion => Some(&self.settings.subregion),
            Level::Locality => Some(&self.settings.locality),
            Level::Parcel | Level::Record => None,
        }
    }

    /// Builds the form posted to obtain the children of `parent`
    ///
    /// The current form state is sent back unchanged, overlaid with the child
    /// level's mode flags, the codes selected along `parent`, and the async
    /// postback fields naming the dropdown that changed.
    ///
    /// Returns `None` if `parent` is the root or has no selectable children.
    pub fn postback_form(&self, state: &FormState, parent: &NodePath) -> Option<Vec<(String, String)>> {
        let parent_level = parent.level()?;
        let changed = self.selector(parent_level)?;
        let child = self.selector(parent_level.child()?)?;

        let mut form = state.clone();
        for (name, value) in &child.flags {
            form.insert(name.as_str(), value.as_str());
        }
        for level in Level::ALL {
            if let (Some(selector), Some(code)) = (self.selector(level), parent.code_at(level)) {
                form.insert(selector.field.as_str(), code);
            }
        }

        form.insert(
            self.settings.script_manager.as_str(),
            format!("{}|{}", self.settings.update_panel, changed.field),
        );
        form.insert("__EVENTTARGET", changed.field.as_str());
        form.insert("__EVENTARGUMENT", "");
        form.insert("__LASTFOCUS", "");
        form.insert("__ASYNCPOST", "true");

        Some(form.to_pairs())
    }
}

#[async_trait]
impl Traversal for StatefulTraversal {
    type Context = FormState;

    fn name(&self) -> &str {
        &self.name
    }

    fn deepest_level(&self) -> Level {
        Level::Locality
    }

    async fn discover_roots(&self) -> (Discovery, FormState) {
        let request = PortalRequest::get(self.url.clone(), format!("{} regions", self.name));
        let Some(body) = self.client.send_with_report(&request).await.body else {
            return (Discovery::Unavailable, FormState::new());
        };

        let state = FormState::from_payload(&body);
        tracing::debug!("{}: initial form state has {} fields", self.name, state.len());

        let regions = extract_options(&body, Some(self.settings.region.hint()), &self.sentinels);
        if regions.is_empty() {
            tracing::warn!("{}: no regions in {:?}", self.name, excerpt(&body));
        }
        (Discovery::children(regions.into_nodes()), state)
    }

    async fn discover_children(&self, ctx: &mut FormState, parent: &NodePath) -> Discovery {
        let Some(child_level) = parent.child_level() else {
            return Discovery::empty();
        };
        let (Some(child), Some(form)) = (self.selector(child_level), self.postback_form(ctx, parent))
        else {
            return Discovery::empty();
        };

        let deep_step = child_level == Level::Locality;
        if deep_step {
            tokio::time::sleep(self.settings.cooldown()).await;
        }

        let label = format!("{} {} for {}", self.name, child_level, parent);
        let request = PortalRequest::post_form(self.url.clone(), form, label);
        let body = self.client.send_with_report(&request).await.body;

        let discovery = match body {
            None => Discovery::Unavailable,
            Some(body) => {
                let updated = ctx.merge(&body);
                tracing::trace!("{}: {} form fields updated", self.name, updated);

                let options = extract_options(&body, Some(child.hint()), &self.sentinels);
                if options.is_empty() && !body.to_ascii_lowercase().contains("<option") {
                    tracing::warn!(
                        "{}: unreadable {} list for {}: {:?}",
                        self.name,
                        child_level,
                        parent,
                        excerpt(&body)
                    );
                }
                Discovery::children(options.into_nodes())
            }
        };

        if deep_step {
            tokio::time::sleep(self.settings.settle()).await;
        }
        discovery
    }

    fn branch(&self, _ctx: &FormState) -> Option<FormState> {
        None
    }
}
