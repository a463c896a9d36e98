use serde::{Deserialize, Serialize};
use std::fmt;

/// The universal fallback category. Always present in a registry and
/// returned whenever nothing better can be said about a description.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Categories every fresh registry starts with. Corrections may add more;
/// nothing is ever removed (historic assignments must stay resolvable).
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Groceries",
    "Restaurants",
    "Transportation",
    "Shopping",
    "Health",
    "Entertainment",
    "Utilities",
    "Rent",
    "Income",
    "Investment",
    "Credit Payment",
];

/// A canonical spending category label.
///
/// Construction trims surrounding whitespace; blank input collapses to
/// [`UNCATEGORIZED`]. Case is preserved for display; resolution against
/// existing labels is the registry's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryLabel(String);

impl CategoryLabel {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CategoryLabel(UNCATEGORIZED.to_string())
        } else {
            CategoryLabel(trimmed.to_string())
        }
    }

    pub fn uncategorized() -> Self {
        CategoryLabel(UNCATEGORIZED.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_uncategorized(&self) -> bool {
        self.0 == UNCATEGORIZED
    }
}

impl fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The mutable set of known category labels.
///
/// Grows as corrections introduce new labels; never shrinks. `ensure` is
/// idempotent: re-adding a label that differs only in case or surrounding
/// whitespace returns the existing canonical form instead of forking a
/// near-duplicate category.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    labels: Vec<CategoryLabel>,
}

impl CategoryRegistry {
    /// A registry containing only the fallback label.
    pub fn new() -> Self {
        CategoryRegistry {
            labels: vec![CategoryLabel::uncategorized()],
        }
    }

    /// A registry seeded with the stock category set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for name in DEFAULT_CATEGORIES {
            registry.ensure(name);
        }
        registry
    }

    /// Insert-or-lookup. Returns the canonical label for `raw`.
    pub fn ensure(&mut self, raw: &str) -> CategoryLabel {
        let candidate = CategoryLabel::new(raw);
        if let Some(existing) = self
            .labels
            .iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(candidate.as_str()))
        {
            return existing.clone();
        }
        self.labels.push(candidate.clone());
        candidate
    }

    /// Resolve a label without inserting it.
    pub fn resolve(&self, raw: &str) -> Option<CategoryLabel> {
        let candidate = CategoryLabel::new(raw);
        self.labels
            .iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(candidate.as_str()))
            .cloned()
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.resolve(raw).is_some()
    }

    /// The current label set, in insertion order.
    pub fn snapshot(&self) -> Vec<CategoryLabel> {
        self.labels.clone()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registry_contains_fallback() {
        let registry = CategoryRegistry::new();
        assert!(registry.contains(UNCATEGORIZED));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut registry = CategoryRegistry::new();
        let first = registry.ensure("Groceries");
        let second = registry.ensure("Groceries");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn ensure_resolves_case_and_whitespace_variants() {
        let mut registry = CategoryRegistry::new();
        let canonical = registry.ensure("Groceries");
        assert_eq!(registry.ensure("  groceries "), canonical);
        assert_eq!(registry.ensure("GROCERIES"), canonical);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn blank_label_collapses_to_uncategorized() {
        let mut registry = CategoryRegistry::new();
        assert_eq!(registry.ensure("   "), CategoryLabel::uncategorized());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn defaults_are_seeded_once() {
        let registry = CategoryRegistry::with_defaults();
        assert_eq!(registry.len(), DEFAULT_CATEGORIES.len() + 1);
        assert!(registry.contains("Transportation"));
    }

    #[test]
    fn snapshot_preserves_insertion_order() {
        let mut registry = CategoryRegistry::new();
        registry.ensure("Rent");
        registry.ensure("Income");
        let snapshot = registry.snapshot();
        let labels: Vec<&str> = snapshot.iter().map(|l| l.as_str()).collect();
        assert_eq!(labels, vec![UNCATEGORIZED, "Rent", "Income"]);
    }
}
