//! Commit identifier normalization.
//!
//! User- and model-supplied commit references arrive as free text: pasted
//! with surrounding punctuation, wrapped in backticks, or truncated. This
//! module validates and cleans a raw string into a [`NormalizedHash`]
//! before any network lookup is attempted.

use crate::resolve::ResolveError;

/// Shortest hash prefix accepted for lookup.
///
/// Prefixes below seven characters are not reliably unique in a commit
/// graph, so they are rejected locally instead of being sent to a backend.
pub const MIN_HASH_LEN: usize = 7;

/// Longest valid hash (full SHA-1 hex length).
pub const MAX_HASH_LEN: usize = 40;

/// A validated, lowercase hexadecimal commit hash of 7–40 characters.
///
/// Only [`normalize`] produces values of this type; invalid input never
/// does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedHash(String);

impl NormalizedHash {
    /// Returns the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the seven-character short form.
    pub fn short(&self) -> &str {
        &self.0[..MIN_HASH_LEN]
    }

    /// Whether this is a full 40-character hash rather than a prefix.
    pub fn is_full(&self) -> bool {
        self.0.len() == MAX_HASH_LEN
    }
}

impl std::fmt::Display for NormalizedHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validates and cleans a raw commit identifier.
///
/// Trims whitespace, and if the remainder is not purely hexadecimal,
/// strips every non-hex character and tries again. Returns
/// [`ResolveError::MalformedHash`] when nothing hex survives cleaning,
/// [`ResolveError::HashTooShort`] when fewer than [`MIN_HASH_LEN`]
/// characters remain, and the lowercase hash otherwise. Input longer than
/// [`MAX_HASH_LEN`] hex characters is malformed rather than truncated.
///
/// Pure function: no side effects, no network.
pub fn normalize(raw: &str) -> Result<NormalizedHash, ResolveError> {
    let trimmed = raw.trim();

    let cleaned: String = if trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        trimmed.to_string()
    } else {
        trimmed.chars().filter(char::is_ascii_hexdigit).collect()
    };

    if cleaned.is_empty() {
        return Err(ResolveError::MalformedHash {
            input: trimmed.to_string(),
        });
    }

    if cleaned.len() < MIN_HASH_LEN {
        return Err(ResolveError::HashTooShort {
            input: trimmed.to_string(),
            length: cleaned.len(),
        });
    }

    if cleaned.len() > MAX_HASH_LEN {
        return Err(ResolveError::MalformedHash {
            input: trimmed.to_string(),
        });
    }

    Ok(NormalizedHash(cleaned.to_ascii_lowercase()))
}
