//! Commit metadata structures shared with the backend wire format.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A verified commit returned by one of the data sources.
///
/// Identity key is `hash`; `short_hash` is a secondary lookup key.
/// Authoritative fields are immutable once constructed, but UI-local
/// state on `file_changes` may be updated in place through the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full SHA-1 hash of the commit.
    pub hash: String,
    /// Seven-character abbreviated hash.
    pub short_hash: String,
    /// Author name and email address.
    pub author: String,
    /// Commit date in ISO format with timezone.
    pub date: DateTime<FixedOffset>,
    /// The commit message as written by the author.
    pub message: String,
    /// Aggregate change statistics.
    pub stats: CommitStats,
    /// Per-file changes in this commit.
    #[serde(default)]
    pub file_changes: Vec<FileChange>,
}

/// Aggregate statistics for one commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitStats {
    /// Number of files touched by the commit.
    pub files_changed: usize,
    /// Total inserted lines across all files.
    pub insertions: usize,
    /// Total deleted lines across all files.
    pub deletions: usize,
    /// Backend note when counts could not be computed (e.g. the commit
    /// was fetched outside the cached history and line stats were skipped).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// How a file was changed in a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// File did not exist in the parent.
    Added,
    /// File no longer exists in this commit.
    Deleted,
    /// File content changed.
    Modified,
    /// File moved, possibly with content changes.
    Renamed,
}

impl ChangeType {
    /// Whether "view content at this commit" is a meaningful operation.
    ///
    /// Deleted files have no content on the right-hand side.
    pub fn has_content(self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

/// One file touched by a commit, with lazily populated view state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the repository root.
    pub path: String,
    /// Kind of change.
    pub change_type: ChangeType,
    /// Lines inserted in this file.
    #[serde(default)]
    pub insertions: usize,
    /// Lines deleted from this file.
    #[serde(default)]
    pub deletions: usize,
    /// Raw diff text, fetched lazily from the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Full file content at this commit, fetched lazily.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_content: Option<String>,
    /// Whether a lazy fetch for this file is in flight.
    #[serde(default, skip)]
    pub loading: bool,
    /// Whether the diff view for this file is expanded.
    #[serde(default, skip)]
    pub show_diff: bool,
}

impl FileChange {
    /// Creates a change entry with no lazily fetched state.
    pub fn new(path: impl Into<String>, change_type: ChangeType) -> Self {
        Self {
            path: path.into(),
            change_type,
            insertions: 0,
            deletions: 0,
            diff: None,
            display_content: None,
            loading: false,
            show_diff: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn change_type_content_gate() {
        assert!(ChangeType::Added.has_content());
        assert!(ChangeType::Modified.has_content());
        assert!(ChangeType::Renamed.has_content());
        assert!(!ChangeType::Deleted.has_content());
    }

    #[test]
    fn change_type_serializes_lowercase() {
        let json = serde_json::to_string(&ChangeType::Renamed).unwrap();
        assert_eq!(json, "\"renamed\"");
        let back: ChangeType = serde_json::from_str("\"deleted\"").unwrap();
        assert_eq!(back, ChangeType::Deleted);
    }

    #[test]
    fn record_deserializes_backend_shape() {
        let json = r#"{
            "hash": "0123456789abcdef0123456789abcdef01234567",
            "short_hash": "0123456",
            "author": "Jane Doe <jane@example.com>",
            "date": "2025-03-14T12:00:00+00:00",
            "message": "Fix diff pagination",
            "stats": {"files_changed": 2, "insertions": 10, "deletions": 3},
            "file_changes": [
                {"path": "src/main.rs", "change_type": "modified", "insertions": 8, "deletions": 3},
                {"path": "docs/api.md", "change_type": "added", "insertions": 2, "deletions": 0}
            ]
        }"#;
        let record: CommitRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.short_hash, "0123456");
        assert_eq!(record.file_changes.len(), 2);
        assert!(!record.file_changes[0].loading);
        assert!(record.stats.note.is_none());
    }

    #[test]
    fn record_tolerates_missing_file_changes() {
        let json = r#"{
            "hash": "0123456789abcdef0123456789abcdef01234567",
            "short_hash": "0123456",
            "author": "Jane Doe <jane@example.com>",
            "date": "2025-03-14T12:00:00+00:00",
            "message": "empty",
            "stats": {"files_changed": 0, "insertions": 0, "deletions": 0,
                      "note": "line counts unavailable for fetched commit"}
        }"#;
        let record: CommitRecord = serde_json::from_str(json).unwrap();
        assert!(record.file_changes.is_empty());
        assert!(record.stats.note.is_some());
    }
}
