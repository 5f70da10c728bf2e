//! Label normalization rules
//!
//! The detector model emits several raw labels that mean the same logical
//! object (the EMT logo on a uniform vs. the EMT themselves). Synonyms are
//! collapsed to one canonical label before deduplication and display so a
//! single object cannot produce parallel event streams.

use std::collections::HashMap;

/// Static synonym map from raw model labels to canonical labels.
#[derive(Debug, Clone)]
pub struct LabelMap {
    rules: HashMap<String, String>,
}

impl Default for LabelMap {
    /// The shipped rule set: `EMTLOGO` is the same logical object as `EMT`.
    fn default() -> Self {
        Self::new().with_rule("EMTLOGO", "EMT")
    }
}

impl LabelMap {
    /// Empty map; every label is its own canonical form.
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Add a synonym rule. Later rules override earlier ones for the same raw label.
    pub fn with_rule(mut self, raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.rules.insert(raw.into(), canonical.into());
        self
    }

    /// Canonical form of a raw label.
    pub fn canonical(&self, raw: &str) -> String {
        match self.rules.get(raw) {
            Some(canonical) => canonical.clone(),
            None => raw.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_collapses_emt_logo() {
        let labels = LabelMap::default();
        assert_eq!(labels.canonical("EMTLOGO"), "EMT");
        assert_eq!(labels.canonical("EMT"), "EMT");
    }

    #[test]
    fn test_unmapped_label_passes_through() {
        let labels = LabelMap::default();
        assert_eq!(labels.canonical("person"), "person");
    }

    #[test]
    fn test_custom_rule_overrides() {
        let labels = LabelMap::new()
            .with_rule("cart", "trolley")
            .with_rule("cart", "wagon");
        assert_eq!(labels.canonical("cart"), "wagon");
    }

    #[test]
    fn test_canonical_is_idempotent() {
        let labels = LabelMap::default();
        let once = labels.canonical("EMTLOGO");
        assert_eq!(labels.canonical(&once), once);
    }
}
