//! Dropdown option extraction
//!
//! Child lists arrive as `<option>` elements, either inside a full page, inside a
//! partial-update block, or as a bare list of options. Extraction tries a structural
//! parse first and falls back to a textual scan for payloads that the structural
//! parse cannot place (markup inside scripts, broken documents).

use crate::extract::{parse_delta, SentinelFilter};
use crate::hierarchy::Node;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Ordered `code -> label` mapping in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    entries: Vec<(String, String)>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry
    ///
    /// A repeated code keeps its original position and takes the new label.
    pub fn insert(&mut self, code: impl Into<String>, label: impl Into<String>) {
        let code = code.into();
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == code) {
            Some(entry) => entry.1 = label,
            None => self.entries.push((code, label)),
        }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == code)
            .map(|(_, label)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, l)| (c.as_str(), l.as_str()))
    }

    /// Converts the entries into tree nodes, keeping their order
    pub fn into_nodes(self) -> Vec<Node> {
        self.entries
            .into_iter()
            .map(|(code, label)| Node::new(code, label))
            .collect()
    }

    fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.entries.retain(|(code, label)| keep(code, label));
    }
}

/// Extracts the options of a dropdown from a portal payload
///
/// # Arguments
///
/// * `payload` - Full document, partial-update payload, or bare option list
/// * `hint` - Fragment expected in the target `<select>`'s `id` or `name`;
///   `None` takes every option in the payload
/// * `sentinels` - Placeholder entries to drop
///
/// # Returns
///
/// The filtered options in discovery order. Never fails: an unrecognizable
/// payload yields an empty set.
///
/// # Example
///
/// ```
/// use land_ledger::extract::{extract_options, SentinelFilter};
///
/// let html = r#"<select id="ddlMandal"><option value="0">Please Select</option>
///               <option value="1301">Amberpet</option></select>"#;
/// let options = extract_options(html, Some("Mandal"), &SentinelFilter::default());
/// assert_eq!(options.get("1301"), Some("Amberpet"));
/// assert_eq!(options.len(), 1);
/// ```
pub fn extract_options(payload: &str, hint: Option<&str>, sentinels: &SentinelFilter) -> OptionSet {
    let markup = panel_markup(payload);
    let markup = markup.as_deref().unwrap_or(payload);

    let mut options = structural_options(markup, hint)
        .or_else(|| textual_options(markup, hint))
        .unwrap_or_default();

    options.retain(|code, label| !sentinels.rejects(code, label));
    options
}

/// Concatenated update-panel markup of a partial-update payload
fn panel_markup(payload: &str) -> Option<String> {
    let blocks = parse_delta(payload)?;
    let markup: Vec<String> = blocks
        .into_iter()
        .filter(|block| block.kind == "updatePanel")
        .map(|block| block.content)
        .collect();

    if markup.is_empty() {
        None
    } else {
        Some(markup.join("\n"))
    }
}

/// Structural extraction with the HTML parser
fn structural_options(markup: &str, hint: Option<&str>) -> Option<OptionSet> {
    let document = if markup.to_ascii_lowercase().contains("<html") {
        Html::parse_document(markup)
    } else {
        Html::parse_fragment(markup)
    };

    let option_selector = Selector::parse("option").ok()?;

    match hint {
        Some(hint) => {
            let select_selector = Selector::parse("select").ok()?;
            let select = document
                .select(&select_selector)
                .find(|element| matches_hint(element, hint))?;
            Some(collect_options(select.select(&option_selector)))
        }
        None => {
            let options = collect_options(document.select(&option_selector));
            if options.is_empty() {
                None
            } else {
                Some(options)
            }
        }
    }
}

/// Returns true if the element's `id` or `name` contains the hint
fn matches_hint(element: &ElementRef<'_>, hint: &str) -> bool {
    let hint = hint.to_lowercase();
    ["id", "name"].iter().any(|attr| {
        element
            .value()
            .attr(attr)
            .map(|value| value.to_lowercase().contains(&hint))
            .unwrap_or(false)
    })
}

fn collect_options<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> OptionSet {
    let mut options = OptionSet::new();
    for element in elements {
        let code = element.value().attr("value").unwrap_or("").trim();
        let label = element.text().collect::<String>();
        let label = label.trim();
        if !code.is_empty() || !label.is_empty() {
            options.insert(code, label);
        }
    }
    options
}

fn select_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<select\b([^>]*)>(.*?)</select>").expect("valid regex"))
}

fn option_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<option\b([^>]*)>([^<]*)").expect("valid regex"))
}

fn value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\bvalue\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("valid regex")
    })
}

/// Best-effort textual scan for `value/label` pairs
///
/// With a hint, only the options of the matching `<select>` are read; a payload
/// without that dropdown yields nothing.
fn textual_options(markup: &str, hint: Option<&str>) -> Option<OptionSet> {
    let scope = match hint {
        Some(hint) => {
            let hint = hint.to_lowercase();
            select_regex()
                .captures_iter(markup)
                .find(|caps| caps[1].to_lowercase().contains(&hint))
                .and_then(|caps| caps.get(2))
                .map(|body| body.as_str())?
        }
        None => markup,
    };

    let mut options = OptionSet::new();
    for caps in option_regex().captures_iter(scope) {
        let code = value_regex()
            .captures(&caps[1])
            .and_then(|v| v.get(1).or_else(|| v.get(2)).or_else(|| v.get(3)))
            .map(|m| html_escape::decode_html_entities(m.as_str().trim()).into_owned())
            .unwrap_or_default();
        let label = html_escape::decode_html_entities(caps[2].trim()).into_owned();

        if !code.is_empty() || !label.is_empty() {
            options.insert(code, label);
        }
    }

    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}
