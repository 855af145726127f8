//! Sentinel diff messages.
//!
//! When a line-level diff is not meaningful (binary files, whole-file
//! additions or deletions, rename-only commits) the backend substitutes a
//! fixed status string for real diff text. Classification is by known
//! message prefix only, never by content heuristics, so real hunks that
//! happen to contain blank lines can never be mistaken for a sentinel.

/// What a sentinel implies for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelKind {
    /// The message is the entire payload; nothing line-level to show.
    Plain,
    /// Whole-file content may follow the message; render it as all-added.
    WholeFileAdded,
    /// Prior content may follow the message; render it as all-removed.
    WholeFileDeleted,
}

/// Known sentinel prefixes, checked in order.
const SENTINELS: &[(&str, SentinelKind)] = &[
    ("Binary file or encoding error", SentinelKind::Plain),
    ("No changes detected", SentinelKind::Plain),
    ("Could not retrieve diff", SentinelKind::Plain),
    ("Error retrieving diff", SentinelKind::Plain),
    ("Initial commit, file added", SentinelKind::WholeFileAdded),
    ("File added", SentinelKind::WholeFileAdded),
    ("File deleted. Previous content:", SentinelKind::WholeFileDeleted),
    ("File renamed without content changes", SentinelKind::Plain),
    ("File mode or metadata changed", SentinelKind::Plain),
];

/// A recognized sentinel, split into message and optional embedded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel<'a> {
    /// Rendering class of this sentinel.
    pub kind: SentinelKind,
    /// The status message itself.
    pub message: &'a str,
    /// Whole-file content embedded after the first blank-line separator.
    ///
    /// Only present for the whole-file kinds, which use the
    /// `"<message>\n\n<content>"` format.
    pub content: Option<&'a str>,
}

/// Classifies diff text as a sentinel message, if it is one.
///
/// For the whole-file kinds the text is split at the first blank-line
/// separator; anything after it is the embedded file content. Plain
/// sentinels never carry content regardless of what follows them.
pub fn classify(text: &str) -> Option<Sentinel<'_>> {
    let trimmed = text.trim_end();
    let (_, kind) = SENTINELS
        .iter()
        .find(|(prefix, _)| trimmed.starts_with(prefix))?;

    if *kind == SentinelKind::Plain {
        return Some(Sentinel {
            kind: *kind,
            message: trimmed,
            content: None,
        });
    }

    match trimmed.split_once("\n\n") {
        Some((message, content)) if !content.is_empty() => Some(Sentinel {
            kind: *kind,
            message,
            content: Some(content),
        }),
        _ => Some(Sentinel {
            kind: *kind,
            message: trimmed,
            content: None,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn binary_sentinel_is_plain() {
        let s = classify("Binary file or encoding error").unwrap();
        assert_eq!(s.kind, SentinelKind::Plain);
        assert!(s.content.is_none());
    }

    #[test]
    fn file_added_with_content_splits() {
        let s = classify("File added\n\nfn main() {\n    println!(\"hi\");\n}").unwrap();
        assert_eq!(s.kind, SentinelKind::WholeFileAdded);
        assert_eq!(s.message, "File added");
        assert!(s.content.unwrap().starts_with("fn main()"));
    }

    #[test]
    fn initial_commit_without_content() {
        let s = classify("Initial commit, file added").unwrap();
        assert_eq!(s.kind, SentinelKind::WholeFileAdded);
        assert!(s.content.is_none());
    }

    #[test]
    fn deleted_file_with_prior_content() {
        let s = classify("File deleted. Previous content:\n\nold line 1\nold line 2").unwrap();
        assert_eq!(s.kind, SentinelKind::WholeFileDeleted);
        assert_eq!(s.content, Some("old line 1\nold line 2"));
    }

    #[test]
    fn real_diff_is_not_a_sentinel() {
        assert!(classify("@@ -1,2 +1,2 @@\n-a\n+b").is_none());
        // Blank lines inside real diff text must not trigger the
        // whole-file format.
        assert!(classify("diff --git a/x b/x\n\n@@ -1 +1 @@").is_none());
    }

    #[test]
    fn empty_text_is_not_a_sentinel() {
        assert!(classify("").is_none());
    }
}
