//! Placeholder filtering for option lists
//!
//! Portals pad their dropdowns with "please select" entries whose text depends on
//! the site's locale (`Please Select`, `--निवडा--`, ...). The filter is built per
//! portal from configuration.

use crate::config::SentinelConfig;

/// Decides which extracted entries are placeholders rather than real children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelFilter {
    /// Codes that mean "no selection" (compared case-insensitively)
    codes: Vec<String>,

    /// Labels that mean "no selection" (compared case-insensitively, exact)
    labels: Vec<String>,

    /// Label fragments that mark a placeholder anywhere in the label
    label_fragments: Vec<String>,
}

impl SentinelFilter {
    /// Creates a filter from raw sentinel lists
    pub fn new<I, J, K>(codes: I, labels: J, label_fragments: K) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        fn normalized<T: IntoIterator>(values: T) -> Vec<String>
        where
            T::Item: AsRef<str>,
        {
            values
                .into_iter()
                .map(|v| v.as_ref().trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect()
        }

        Self {
            codes: normalized(codes),
            labels: normalized(labels),
            label_fragments: normalized(label_fragments),
        }
    }

    /// Returns true if a `(code, label)` entry must be dropped
    ///
    /// Entries are dropped when the code is empty, when the code or the label equals
    /// a sentinel, or when the label contains a sentinel fragment.
    pub fn rejects(&self, code: &str, label: &str) -> bool {
        let code = code.trim().to_lowercase();
        let label = label.trim().to_lowercase();

        if code.is_empty() {
            return true;
        }

        if self.codes.contains(&code) || self.labels.contains(&code) {
            return true;
        }

        if self.labels.contains(&label) {
            return true;
        }

        self.label_fragments
            .iter()
            .any(|fragment| label.contains(fragment.as_str()))
    }

    /// Returns true if a single value is a placeholder
    ///
    /// Used when probing JSON fields, where there is no code/label pair.
    pub fn is_placeholder(&self, value: &str) -> bool {
        let value = value.trim().to_lowercase();
        value.is_empty()
            || value.chars().all(|c| c == '-')
            || self.codes.contains(&value)
            || self.labels.contains(&value)
    }
}

impl Default for SentinelFilter {
    fn default() -> Self {
        Self::from(&SentinelConfig::default())
    }
}

impl From<&SentinelConfig> for SentinelFilter {
    fn from(config: &SentinelConfig) -> Self {
        Self::new(&config.codes, &config.labels, &config.label_fragments)
    }
}
