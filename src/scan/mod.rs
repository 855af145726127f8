//! Hash discovery in assistant chat text.
//!
//! Model-generated answers mention commits by hash; the scanner pulls
//! candidate hashes out of free-form text so they can be resolved in the
//! background and become clickable. Diff excerpts are skipped wholesale:
//! their `index`/hunk headers are full of hex runs that are not commit
//! references in the conversational sense.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Decides whether a chat message is diff content rather than prose.
///
/// Kept behind a trait so the detection heuristics can be replaced
/// without touching the scanning logic.
pub trait ContentClassifier: Send + Sync {
    /// True when the text should be skipped entirely.
    fn is_diff_content(&self, text: &str) -> bool;
}

/// Default prefix-sniffing heuristic.
///
/// Flags text containing a fenced ```diff block, or any line that starts
/// with `+` or `-` immediately followed by a different character (which
/// excludes `+++`/`---` file headers but catches change lines).
#[derive(Debug, Default)]
pub struct DiffHeuristic;

impl ContentClassifier for DiffHeuristic {
    fn is_diff_content(&self, text: &str) -> bool {
        if text.contains("```diff") {
            return true;
        }
        text.lines().any(|line| {
            let mut chars = line.chars();
            match (chars.next(), chars.next()) {
                (Some(first @ ('+' | '-')), second) => second != Some(first),
                _ => false,
            }
        })
    }
}

/// Matches a hex token of plausible hash length.
///
/// Tokens may be preceded by a "commit"/"hash"/"sha" label in the text;
/// the label changes nothing about the match, so only the token itself
/// is captured. Word boundaries keep runs longer than 40 characters and
/// tokens embedded in identifiers from matching.
fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"\b[0-9a-fA-F]{7,40}\b").expect("hash token regex")
    })
}

/// Scans assistant text for commit-hash candidates to resolve.
pub struct HashScanner {
    classifier: Box<dyn ContentClassifier>,
}

impl Default for HashScanner {
    fn default() -> Self {
        Self::new(Box::new(DiffHeuristic))
    }
}

impl HashScanner {
    /// Creates a scanner with a custom diff-vs-prose classifier.
    pub fn new(classifier: Box<dyn ContentClassifier>) -> Self {
        Self { classifier }
    }

    /// Extracts unresolved hash candidates from one message.
    ///
    /// Returns lowercase candidates in order of first appearance, with
    /// duplicates and already-known hashes (full or short form) removed.
    /// The whole pass is discarded when the text looks like diff content.
    pub fn scan(
        &self,
        text: &str,
        known_hashes: &HashSet<String>,
        known_short_hashes: &HashSet<String>,
    ) -> Vec<String> {
        if self.classifier.is_diff_content(text) {
            debug!("skipping hash scan: text looks like diff content");
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for token in token_re().find_iter(text) {
            let candidate = token.as_str().to_ascii_lowercase();
            if known_hashes.contains(&candidate) || known_short_hashes.contains(&candidate) {
                continue;
            }
            if seen.insert(candidate.clone()) {
                candidates.push(candidate);
            }
        }

        if !candidates.is_empty() {
            debug!(count = candidates.len(), "found hash candidates in chat text");
        }
        candidates
    }
}
