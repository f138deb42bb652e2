//! Payload extraction for portal responses
//!
//! This module turns raw portal payloads into structured data:
//! - Option lists (`code -> label`) from dropdown markup, with sentinel filtering
//! - Hidden form tokens carried between stateful requests
//! - Blocks of the pipe-delimited partial-update format
//! - Attribute values from JSON records with inconsistent field names

mod delta;
mod fields;
mod form_state;
mod options;
mod sentinel;

pub use delta::{parse_delta, DeltaBlock};
pub use fields::{extract_json_nodes, pick};
pub use form_state::FormState;
pub use options::{extract_options, OptionSet};
pub use sentinel::SentinelFilter;

/// Returns a short single-line excerpt of a payload for log messages
pub fn excerpt(payload: &str) -> String {
    payload
        .chars()
        .take(120)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
