//! Indexed collection of resolved commits.
//!
//! The store maps full hashes to [`CommitRecord`]s with a secondary index
//! from short hash to full hash, replacing the ad-hoc "known hashes" sets
//! the chat scanner would otherwise rebuild on every pass. Entries are
//! merged rather than replaced when a commit is re-resolved, and the whole
//! store is cleared when the active repository changes.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::record::CommitRecord;

/// Indexed collection of resolved commits for one active repository.
#[derive(Debug, Default)]
pub struct CommitStore {
    /// Full hash → record.
    records: HashMap<String, CommitRecord>,
    /// Short hash → full hash.
    short_index: HashMap<String, String>,
}

impl CommitStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct commits held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no commits.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by full hash, short hash, or unique prefix.
    ///
    /// Prefix search mirrors the backend's own lookup: the first record
    /// whose full hash starts with `key` wins. Exact matches on either
    /// index are checked first so they never lose to a prefix scan.
    pub fn get(&self, key: &str) -> Option<&CommitRecord> {
        if let Some(record) = self.records.get(key) {
            return Some(record);
        }
        if let Some(full) = self.short_index.get(key) {
            return self.records.get(full);
        }
        self.records
            .iter()
            .find(|(hash, _)| hash.starts_with(key))
            .map(|(_, record)| record)
    }

    /// Whether a commit is already known under `key` (full or short form).
    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key) || self.short_index.contains_key(key)
    }

    /// All full hashes currently held.
    pub fn known_hashes(&self) -> HashSet<String> {
        self.records.keys().cloned().collect()
    }

    /// All short hashes currently held.
    pub fn known_short_hashes(&self) -> HashSet<String> {
        self.short_index.keys().cloned().collect()
    }

    /// Inserts or merges a freshly resolved record.
    ///
    /// Authoritative fields are last-write-wins. UI-local state on file
    /// changes (`display_content`, `show_diff`, `loading`, and an already
    /// fetched `diff`) is carried over from the existing entry by path, so
    /// a re-resolution never discards content the user already loaded.
    pub fn upsert(&mut self, mut record: CommitRecord) {
        if let Some(existing) = self.records.get(&record.hash) {
            for change in &mut record.file_changes {
                let Some(prior) = existing
                    .file_changes
                    .iter()
                    .find(|c| c.path == change.path)
                else {
                    continue;
                };
                if change.diff.is_none() {
                    change.diff.clone_from(&prior.diff);
                }
                if change.display_content.is_none() {
                    change.display_content.clone_from(&prior.display_content);
                }
                change.show_diff = prior.show_diff;
                change.loading = prior.loading;
            }
            debug!(hash = %record.hash, "merging re-resolved commit");
        } else {
            debug!(hash = %record.hash, "storing new commit");
        }

        self.short_index
            .insert(record.short_hash.clone(), record.hash.clone());
        self.records.insert(record.hash.clone(), record);
    }

    /// Applies `update` to the stored file change for `(hash, path)`.
    ///
    /// Used by lazy diff/content fetches to persist their result. Returns
    /// false when the commit or path is unknown.
    pub fn update_file_change(
        &mut self,
        hash: &str,
        path: &str,
        update: impl FnOnce(&mut super::record::FileChange),
    ) -> bool {
        let Some(record) = self.records.get_mut(hash) else {
            return false;
        };
        let Some(change) = record.file_changes.iter_mut().find(|c| c.path == path) else {
            return false;
        };
        update(change);
        true
    }

    /// Drops every entry. Called when the active repository changes.
    pub fn clear(&mut self) {
        debug!(dropped = self.records.len(), "clearing commit store");
        self.records.clear();
        self.short_index.clear();
    }
}
