use crate::hierarchy::Level;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Land-Ledger
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(rename = "portal", default)]
    pub portals: Vec<PortalConfig>,
}

impl Config {
    /// Looks up a portal by name
    pub fn portal(&self, name: &str) -> Option<&PortalConfig> {
        self.portals.iter().find(|p| p.name == name)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Ceiling on simultaneous in-flight requests (stateless portals)
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: u32,

    /// Attempts per request before giving up
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Backoff unit; attempt n waits n units (milliseconds)
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection timeout (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// User-Agent header sent to every portal
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl CrawlerConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            retry_budget: default_retry_budget(),
            backoff_unit_ms: default_backoff_unit_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one sub-directory of CSV files per portal
    pub directory: String,
}

/// Which traversal contract a portal follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortalKind {
    /// Postback-driven dropdowns carrying hidden form state
    Stateful,

    /// Idempotent GET endpoints keyed by parent ids
    Stateless,
}

/// One target portal
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PortalConfig {
    /// Unique name; also the output sub-directory
    pub name: String,

    pub kind: PortalKind,

    /// Portal root URL
    pub base_url: String,

    /// Session cookies (e.g. `JSESSIONID`), sent with every request
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,

    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Region codes to crawl; empty crawls every region
    #[serde(default)]
    pub regions: Vec<String>,

    #[serde(default)]
    pub sentinels: SentinelConfig,

    pub stateful: Option<StatefulSettings>,

    pub stateless: Option<StatelessSettings>,
}

/// Placeholder entries to drop from child lists
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SentinelConfig {
    #[serde(default = "default_sentinel_codes")]
    pub codes: Vec<String>,

    #[serde(default = "default_sentinel_labels")]
    pub labels: Vec<String>,

    #[serde(default)]
    pub label_fragments: Vec<String>,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            codes: default_sentinel_codes(),
            labels: default_sentinel_labels(),
            label_fragments: Vec::new(),
        }
    }
}

/// Settings for postback-driven portals
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatefulSettings {
    /// Name of the script manager form field
    pub script_manager: String,

    /// Unique id of the update panel wrapping the dropdowns
    pub update_panel: String,

    pub region: SelectorSettings,

    pub subregion: SelectorSettings,

    pub locality: SelectorSettings,

    /// Courtesy delay before each sub-region step (milliseconds)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Delay after each sub-region step (milliseconds)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl StatefulSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// One dropdown of a stateful portal
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SelectorSettings {
    /// Form field name of the dropdown (e.g. `ctl00$ContentPlaceHolder1$ddlMainDist`)
    pub field: String,

    /// Fragment of the dropdown's id/name; defaults to the last `$` segment of `field`
    pub hint: Option<String>,

    /// Mode flags posted when requesting this dropdown's options
    #[serde(default)]
    pub flags: BTreeMap<String, String>,
}

impl SelectorSettings {
    /// Hint used to locate this dropdown in a response
    pub fn hint(&self) -> &str {
        match &self.hint {
            Some(hint) => hint,
            None => self.field.rsplit('$').next().unwrap_or(&self.field),
        }
    }
}

/// Settings for GET-endpoint portals
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatelessSettings {
    /// Page listing the regions, relative to the base URL
    #[serde(default)]
    pub root_path: String,

    /// Fragment of the region dropdown's id/name
    pub region_hint: Option<String>,

    /// Keep only numeric region codes
    #[serde(default = "default_true")]
    pub region_numeric_ids: bool,

    pub subregion: Option<EndpointSettings>,

    pub locality: Option<EndpointSettings>,

    pub parcel: Option<EndpointSettings>,

    pub record: Option<EndpointSettings>,
}

impl StatelessSettings {
    /// Endpoint serving children at `level`
    pub fn endpoint(&self, level: Level) -> Option<&EndpointSettings> {
        match level {
            Level::Region => None,
            Level::SubRegion => self.subregion.as_ref(),
            Level::Locality => self.locality.as_ref(),
            Level::Parcel => self.parcel.as_ref(),
            Level::Record => self.record.as_ref(),
        }
    }

    /// Deepest level reachable through contiguous endpoints
    pub fn deepest_level(&self) -> Level {
        let mut deepest = Level::Region;
        while let Some(next) = deepest.child() {
            if self.endpoint(next).is_none() {
                break;
            }
            deepest = next;
        }
        deepest
    }
}

/// Response shape of a stateless endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseFormat {
    /// HTML `<option>` list
    #[default]
    Options,

    /// JSON list of records
    Json,
}

/// One level endpoint of a stateless portal
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EndpointSettings {
    /// Path relative to the base URL
    pub path: String,

    /// Query parameters; values may use `{region}`, `{subregion}`, `{locality}`, `{parcel}`
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    #[serde(default)]
    pub format: ResponseFormat,

    /// Fragment of the dropdown's id/name for `options` responses; none takes every option
    pub hint: Option<String>,

    /// Child codes must be integers; others are skipped
    #[serde(default)]
    pub numeric_ids: bool,

    /// Candidate field names for the child id (JSON)
    #[serde(default = "default_id_fields")]
    pub id_fields: Vec<String>,

    /// Candidate field names for the child label (JSON)
    #[serde(default = "default_label_fields")]
    pub label_fields: Vec<String>,
}

fn default_max_concurrent_requests() -> u32 {
    10
}

fn default_retry_budget() -> u32 {
    3
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_sentinel_codes() -> Vec<String> {
    vec!["0".to_string()]
}

fn default_sentinel_labels() -> Vec<String> {
    vec!["Please Select".to_string()]
}

fn default_cooldown_ms() -> u64 {
    10_000
}

fn default_settle_ms() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

fn default_id_fields() -> Vec<String> {
    ["id", "value", "code"].iter().map(|s| s.to_string()).collect()
}

fn default_label_fields() -> Vec<String> {
    ["name", "text", "label"].iter().map(|s| s.to_string()).collect()
}
