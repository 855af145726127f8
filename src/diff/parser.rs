//! Unified-diff reconciliation into renderable blocks.
//!
//! Backends hand back arbitrary text for a file's diff: a real unified
//! diff, a sentinel status message, or something unexpected. [`parse`]
//! turns any of these into an ordered sequence of [`DiffBlock`]s that a
//! side-by-side view can render without further interpretation. Context
//! lines are deliberately dropped so the structure stays change-focused;
//! their positions survive in the line numbers.

use std::sync::OnceLock;

use regex::Regex;

use super::sentinel::{self, SentinelKind};

/// One renderable unit of a parsed diff.
///
/// Invariant: `removed.len() == removed_line_numbers.len()` and likewise
/// for the added side. A `header` that does not start with `@@` marks a
/// sentinel block: the header text is the entire payload and both line
/// arrays are empty unless whole-file content was embedded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffBlock {
    /// Hunk header (`@@ -a,b +c,d @@`) or sentinel message, if any.
    pub header: Option<String>,
    /// Lines removed on the left side, without the `-` prefix.
    pub removed: Vec<String>,
    /// Lines added on the right side, without the `+` prefix.
    pub added: Vec<String>,
    /// Old-file line number for each entry in `removed`.
    pub removed_line_numbers: Vec<usize>,
    /// New-file line number for each entry in `added`.
    pub added_line_numbers: Vec<usize>,
}

impl DiffBlock {
    /// Whether the block carries any line-level change.
    pub fn has_changes(&self) -> bool {
        !self.removed.is_empty() || !self.added.is_empty()
    }

    /// A sentinel-only block with the message as its header.
    fn sentinel(message: &str) -> Self {
        Self {
            header: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// An all-added block with dense line numbers starting at 1.
    fn whole_file_added(header: Option<&str>, content: &str) -> Self {
        let added: Vec<String> = content.lines().map(str::to_string).collect();
        let added_line_numbers = (1..=added.len()).collect();
        Self {
            header: header.map(str::to_string),
            added,
            added_line_numbers,
            ..Self::default()
        }
    }

    /// An all-removed block with dense line numbers starting at 1.
    fn whole_file_removed(header: Option<&str>, content: &str) -> Self {
        let removed: Vec<String> = content.lines().map(str::to_string).collect();
        let removed_line_numbers = (1..=removed.len()).collect();
        Self {
            header: header.map(str::to_string),
            removed,
            removed_line_numbers,
            ..Self::default()
        }
    }
}

/// Matches a hunk header and captures the starting line numbers.
fn hunk_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"^@@ -(\d+)(?:,\d+)? \+(\d+)(?:,\d+)? @@").expect("hunk header regex")
    })
}

/// Parses diff text into renderable blocks.
///
/// Sentinel messages are recognized first and produce a single block; the
/// whole-file sentinels emit their embedded content as an all-added or
/// all-removed block. Everything else is scanned as a unified diff with
/// independent left and right line counters. Non-empty text that yields
/// no blocks at all falls back to one all-added block, so unexpected
/// backend output still renders instead of disappearing.
pub fn parse(diff_text: &str) -> Vec<DiffBlock> {
    if diff_text.trim().is_empty() {
        return Vec::new();
    }

    if let Some(s) = sentinel::classify(diff_text) {
        let block = match (s.kind, s.content) {
            (SentinelKind::WholeFileAdded, Some(content)) => {
                DiffBlock::whole_file_added(Some(s.message), content)
            }
            (SentinelKind::WholeFileDeleted, Some(content)) => {
                DiffBlock::whole_file_removed(Some(s.message), content)
            }
            _ => DiffBlock::sentinel(s.message),
        };
        return vec![block];
    }

    let blocks = parse_hunks(diff_text);
    if blocks.is_empty() {
        // Unrecognized format: render everything as added rather than
        // dropping it.
        return vec![DiffBlock::whole_file_added(None, diff_text)];
    }
    blocks
}

/// Scans standard unified-diff text, one block per hunk.
fn parse_hunks(diff_text: &str) -> Vec<DiffBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<DiffBlock> = None;
    let mut left_line = 0usize;
    let mut right_line = 0usize;

    for line in diff_text.lines() {
        if let Some(caps) = hunk_header_re().captures(line) {
            if let Some(block) = current.take() {
                if block.has_changes() {
                    blocks.push(block);
                }
            }
            left_line = caps[1].parse().unwrap_or(1);
            right_line = caps[2].parse().unwrap_or(1);
            current = Some(DiffBlock {
                header: Some(line.to_string()),
                ..DiffBlock::default()
            });
            continue;
        }

        let Some(block) = current.as_mut() else {
            // File headers and git noise before the first hunk.
            continue;
        };

        if line.starts_with("---") || line.starts_with("+++") {
            continue;
        }

        if let Some(removed) = line.strip_prefix('-') {
            block.removed.push(removed.to_string());
            block.removed_line_numbers.push(left_line);
            left_line += 1;
        } else if let Some(added) = line.strip_prefix('+') {
            block.added.push(added.to_string());
            block.added_line_numbers.push(right_line);
            right_line += 1;
        } else {
            // Context advances both sides but is not rendered.
            left_line += 1;
            right_line += 1;
        }
    }

    if let Some(block) = current {
        if block.has_changes() {
            blocks.push(block);
        }
    }

    blocks
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn binary_sentinel_yields_single_empty_block() {
        let blocks = parse("Binary file or encoding error");
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].header.as_deref(),
            Some("Binary file or encoding error")
        );
        assert!(blocks[0].removed.is_empty());
        assert!(blocks[0].added.is_empty());
    }

    #[test]
    fn single_hunk_with_context() {
        let blocks = parse("@@ -1,2 +1,3 @@\n-old\n+new1\n+new2\n context");
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.header.as_deref(), Some("@@ -1,2 +1,3 @@"));
        assert_eq!(block.removed, vec!["old"]);
        assert_eq!(block.removed_line_numbers, vec![1]);
        assert_eq!(block.added, vec!["new1", "new2"]);
        assert_eq!(block.added_line_numbers, vec![1, 2]);
    }

    #[test]
    fn context_lines_advance_both_counters() {
        let blocks = parse("@@ -10,4 +20,4 @@\n keep\n-gone\n keep2\n+here");
        let block = &blocks[0];
        // "keep" consumes 10/20, so the removal sits at 11.
        assert_eq!(block.removed_line_numbers, vec![11]);
        // "keep" at 20, removal does not advance the right side, "keep2"
        // at 21, so the addition sits at 22.
        assert_eq!(block.added_line_numbers, vec![22]);
    }

    #[test]
    fn multiple_hunks_produce_multiple_blocks() {
        let text = "--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n-a\n+b\n@@ -10,1 +10,2 @@\n+c\n+d";
        let blocks = parse(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].added, vec!["c", "d"]);
        assert_eq!(blocks[1].added_line_numbers, vec![10, 11]);
    }

    #[test]
    fn file_headers_are_not_changes() {
        let text = "diff --git a/f b/f\nindex 123..456 100644\n--- a/f\n+++ b/f\n@@ -1 +1 @@\n-x\n+y";
        let blocks = parse(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].removed, vec!["x"]);
        assert_eq!(blocks[0].added, vec!["y"]);
    }

    #[test]
    fn hunk_header_without_counts() {
        let blocks = parse("@@ -5 +7 @@\n-a\n+b");
        assert_eq!(blocks[0].removed_line_numbers, vec![5]);
        assert_eq!(blocks[0].added_line_numbers, vec![7]);
    }

    #[test]
    fn blank_lines_inside_hunks_are_context() {
        // Embedded blank separators in real hunks must not trigger the
        // whole-file-content format.
        let text = "@@ -1,3 +1,3 @@\n-a\n\n+b";
        let blocks = parse(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].removed_line_numbers, vec![1]);
        // Blank context consumed line 1 right / line 2 left.
        assert_eq!(blocks[0].added_line_numbers, vec![2]);
    }

    #[test]
    fn added_file_sentinel_with_content() {
        let blocks = parse("File added\n\nline one\nline two\nline three");
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.header.as_deref(), Some("File added"));
        assert_eq!(block.added.len(), 3);
        assert_eq!(block.added_line_numbers, vec![1, 2, 3]);
        assert!(block.removed.is_empty());
    }

    #[test]
    fn deleted_file_sentinel_with_content() {
        let blocks = parse("File deleted. Previous content:\n\nold 1\nold 2");
        let block = &blocks[0];
        assert_eq!(block.removed, vec!["old 1", "old 2"]);
        assert_eq!(block.removed_line_numbers, vec![1, 2]);
        assert!(block.added.is_empty());
    }

    #[test]
    fn rename_only_commit_is_a_sentinel_block() {
        let blocks = parse("File renamed without content changes");
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].has_changes());
    }

    #[test]
    fn unexpected_text_falls_back_to_all_added() {
        let blocks = parse("something the backend made up\nsecond line");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].header, None);
        assert_eq!(blocks[0].added.len(), 2);
        assert_eq!(blocks[0].added_line_numbers, vec![1, 2]);
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(parse("").is_empty());
        assert!(parse("   \n  ").is_empty());
    }

    #[test]
    fn parse_is_idempotent() {
        let text = "@@ -1,2 +1,3 @@\n-old\n+new1\n+new2\n context";
        assert_eq!(parse(text), parse(text));
        let sentinel = "Binary file or encoding error";
        assert_eq!(parse(sentinel), parse(sentinel));
    }

    #[test]
    fn line_number_invariant_holds() {
        let text = "@@ -1,5 +1,6 @@\n ctx\n-a\n-b\n+c\n ctx\n+d";
        for block in parse(text) {
            assert_eq!(block.removed.len(), block.removed_line_numbers.len());
            assert_eq!(block.added.len(), block.added_line_numbers.len());
        }
    }
}
