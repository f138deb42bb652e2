//! Form-State store for stateful portals
//!
//! A postback-driven portal issues opaque hidden tokens (view state, event
//! validation, ...) with every response and expects the latest ones echoed on the
//! next request. `FormState` accumulates them key by key.

use crate::extract::parse_delta;
use scraper::{Html, Selector};
use std::collections::BTreeMap;

/// Latest known hidden tokens for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    fields: BTreeMap<String, String>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from the tokens found in a payload
    pub fn from_payload(payload: &str) -> Self {
        let mut state = Self::new();
        state.merge(payload);
        state
    }

    /// Overlays the tokens found in `payload` onto this state
    ///
    /// Hidden `<input>` fields are applied first, then `hiddenField` blocks of a
    /// partial-update payload, so the partial update wins on conflict. Keys absent
    /// from the payload are kept. Returns the number of tokens applied.
    pub fn merge(&mut self, payload: &str) -> usize {
        let structural = hidden_inputs(payload);
        let delimited = hidden_field_blocks(payload);
        let applied = structural.len() + delimited.len();

        self.fields.extend(structural);
        self.fields.extend(delimited);
        applied
    }

    /// Returns a copy of this state with `payload` merged in
    pub fn merged(&self, payload: &str) -> Self {
        let mut next = self.clone();
        next.merge(payload);
        next
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Current tokens as form pairs, ordered by name
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Structural scan of `<input type="hidden">` fields
fn hidden_inputs(payload: &str) -> Vec<(String, String)> {
    let Ok(selector) = Selector::parse("input[type]") else {
        return Vec::new();
    };

    let document = Html::parse_document(payload);
    document
        .select(&selector)
        .filter(|input| {
            input
                .value()
                .attr("type")
                .map(|t| t.trim().eq_ignore_ascii_case("hidden"))
                .unwrap_or(false)
        })
        .filter_map(|input| {
            let name = input.value().attr("name")?.trim();
            if name.is_empty() {
                return None;
            }
            let value = input.value().attr("value").unwrap_or("");
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Delimited scan of `hiddenField|name|value` entries
///
/// Uses the length-prefixed block reader when the payload is a well-formed block
/// stream and a plain triple scan otherwise.
fn hidden_field_blocks(payload: &str) -> Vec<(String, String)> {
    if !payload.contains("hiddenField") {
        return Vec::new();
    }

    if let Some(blocks) = parse_delta(payload) {
        return blocks
            .into_iter()
            .filter(|block| block.kind == "hiddenField" && !block.id.is_empty())
            .map(|block| (block.id, block.content))
            .collect();
    }

    let parts: Vec<&str> = payload.split('|').collect();
    parts
        .windows(3)
        .filter(|triple| triple[0] == "hiddenField" && !triple[1].is_empty())
        .map(|triple| (triple[1].to_string(), triple[2].to_string()))
        .collect()
}
