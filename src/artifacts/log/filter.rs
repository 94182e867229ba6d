use crate::artifacts::log::entry::Entry;
use std::sync::Arc;

/// Case-insensitive substring filter over pre-lowercased search indexes
///
/// Surrounding whitespace is part of the needle; a query that is only
/// whitespace is blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    needle: String,
}

impl EntryFilter {
    pub fn new(query: &str) -> Self {
        EntryFilter {
            needle: query.to_lowercase(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.needle.trim().is_empty()
    }

    pub fn query(&self) -> &str {
        &self.needle
    }

    pub fn accepts(&self, entry: &Entry) -> bool {
        self.is_blank() || entry.matches(&self.needle)
    }

    /// Derive the visible sequence from `loaded`, preserving order
    pub fn apply(&self, loaded: &[Arc<Entry>]) -> Vec<Arc<Entry>> {
        loaded
            .iter()
            .filter(|entry| self.accepts(entry))
            .cloned()
            .collect()
    }
}
