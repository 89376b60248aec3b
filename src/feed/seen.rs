// src/feed/seen.rs
use std::collections::HashSet;

use crate::feed::types::FeedEntry;

/// Identifiers processed during this process lifetime. Only grows.
///
/// Entries with an empty id are never suppressed: they cannot be told apart,
/// so each appearance counts as new. Feeds that omit `<id>` will therefore
/// re-alert on every full fetch.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries whose id has not been seen yet, in their original order.
    /// Does not mark anything; the caller marks each entry as it commits it.
    pub fn filter_new(&self, entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
        entries
            .into_iter()
            .filter(|e| e.id.is_empty() || !self.ids.contains(&e.id))
            .collect()
    }

    /// Returns `true` if the id was not present before. Empty ids are not stored.
    pub fn mark(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return true;
        }
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
