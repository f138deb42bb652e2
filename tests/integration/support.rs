//! Shared helpers for the integration tests

use land_ledger::config::{parse_config, Config, PortalConfig};
use land_ledger::crawler::{build_http_client, RequestClient, RetryPolicy};
use land_ledger::output::{Aggregator, MemorySink, RowSink};
use std::time::Duration;

/// Parses a test configuration, panicking on errors
pub fn config_from(toml: &str) -> Config {
    parse_config(toml).expect("valid test config")
}

/// Client for `portal` with a fast retry schedule
pub fn fast_client(config: &Config, portal: &PortalConfig, budget: u32) -> RequestClient {
    let http = build_http_client(&config.crawler, portal).expect("client builds");
    RequestClient::new(http, RetryPolicy::new(budget, Duration::from_millis(5)))
}

/// Aggregator writing every level into one shared in-memory sink
pub fn memory_aggregator() -> (Aggregator, MemorySink) {
    let memory = MemorySink::new();
    let shared = memory.clone();
    let aggregator = Aggregator::new(|_| Ok(Box::new(shared.clone()) as Box<dyn RowSink>))
        .expect("memory sinks never fail");
    (aggregator, memory)
}

/// One block of the pipe-delimited partial-update format
pub fn delta_block(kind: &str, id: &str, content: &str) -> String {
    format!("{}|{}|{}|{}|", content.encode_utf16().count(), kind, id, content)
}

/// Option list markup for a `<select>`
pub fn select(id: &str, options: &[(&str, &str)]) -> String {
    let mut html = format!(r#"<select name="{0}" id="{0}">"#, id);
    for (value, label) in options {
        html.push_str(&format!(r#"<option value="{}">{}</option>"#, value, label));
    }
    html.push_str("</select>");
    html
}
