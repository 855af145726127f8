//! Resolution failure taxonomy.
//!
//! Every failure class carries its own remediation text so the UI never
//! has to show a generic "error occurred". Variants are `Clone` because a
//! single outcome may be shared with every caller awaiting the same
//! in-flight resolution.

use thiserror::Error;

/// Why a commit resolution failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The identifier contains no usable hex characters.
    #[error("'{input}' is not a commit hash")]
    MalformedHash {
        /// The raw identifier as supplied.
        input: String,
    },

    /// Fewer than seven hex characters survived cleaning.
    #[error("'{input}' is too short to identify a commit ({length} hex characters, minimum 7)")]
    HashTooShort {
        /// The raw identifier as supplied.
        input: String,
        /// Hex characters remaining after cleaning.
        length: usize,
    },

    /// Neither backend knows this commit.
    #[error("commit {hash} was not found")]
    NotFound {
        /// The normalized hash that was looked up.
        hash: String,
    },

    /// The commit predates the local mirror's clone depth.
    #[error("commit {hash} is older than the local clone history")]
    ShallowCloneDepthExceeded {
        /// The normalized hash that was looked up.
        hash: String,
    },

    /// A backend call exceeded its deadline.
    #[error("lookup of commit {hash} timed out")]
    Timeout {
        /// The normalized hash that was looked up.
        hash: String,
    },

    /// The remote hosting API refused the request for now.
    #[error("rate limited by the remote hosting API")]
    RateLimited {
        /// Server-supplied wait in seconds, when one was given.
        retry_after_secs: Option<u64>,
    },

    /// Credentials were missing or insufficient.
    #[error("permission denied while looking up commit {hash}")]
    PermissionDenied {
        /// The normalized hash that was looked up.
        hash: String,
    },

    /// The request never produced a backend answer.
    #[error("network error: {message}")]
    NetworkError {
        /// Transport-level failure description.
        message: String,
    },

    /// The backend answered with something unclassifiable.
    #[error("server error: {message}")]
    UnknownServerError {
        /// The backend's error message verbatim.
        message: String,
    },

    /// The originating context was torn down mid-resolution.
    #[error("resolution was cancelled")]
    Cancelled,
}

impl ResolveError {
    /// Whether a bounded automatic retry against the same backend is
    /// worthwhile.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::NetworkError { .. } | Self::RateLimited { .. }
        )
    }

    /// Whether a local-mirror failure should fall through to the remote
    /// hosting API.
    ///
    /// Only the "commit not known locally" classes qualify; arbitrary
    /// local errors do not.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::ShallowCloneDepthExceeded { .. }
        )
    }

    /// Actionable guidance for the user, specific to the failure class.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::MalformedHash { .. } => {
                "Enter a commit hash: 7 to 40 hexadecimal characters, e.g. a1b2c3d."
            }
            Self::HashTooShort { .. } => {
                "Use at least 7 characters of the hash so the commit can be identified uniquely."
            }
            Self::NotFound { .. } => {
                "Check the hash for typos, or confirm the commit belongs to this repository."
            }
            Self::ShallowCloneDepthExceeded { .. } => {
                "This commit is older than the local mirror keeps. Try a more recent commit, or re-clone the repository with a deeper history."
            }
            Self::Timeout { .. } => {
                "The backend took too long to answer. Large commits can be slow; try again in a moment."
            }
            Self::RateLimited { .. } => {
                "The hosting API rate limit was hit. Wait a minute before retrying, or add an access token to raise the limit."
            }
            Self::PermissionDenied { .. } => {
                "Access to this repository was refused. Check that your access token is valid and has read permission."
            }
            Self::NetworkError { .. } => {
                "The backend could not be reached. Check your connection and that the service is running."
            }
            Self::UnknownServerError { .. } => {
                "The backend reported an unexpected error. Retry, and check the server logs if it persists."
            }
            Self::Cancelled => "The lookup was abandoned before it finished.",
        }
    }
}

/// Classifies a backend `{"status":"error"}` message by known substrings.
///
/// The local mirror reports failures as free text; these fragments are
/// the stable parts of its messages. Clone-depth phrasing is checked
/// before "not found" because shallow-clone errors often contain both.
pub fn classify_backend_message(hash: &str, message: &str) -> ResolveError {
    let lowered = message.to_lowercase();

    if lowered.contains("clone depth") || lowered.contains("shallow clone") {
        ResolveError::ShallowCloneDepthExceeded {
            hash: hash.to_string(),
        }
    } else if lowered.contains("not found") || lowered.contains("object not found") {
        ResolveError::NotFound {
            hash: hash.to_string(),
        }
    } else if lowered.contains("timed out") {
        ResolveError::Timeout {
            hash: hash.to_string(),
        }
    } else if lowered.contains("api rate limit exceeded") {
        ResolveError::RateLimited {
            retry_after_secs: None,
        }
    } else if lowered.contains("access") || lowered.contains("permission") {
        ResolveError::PermissionDenied {
            hash: hash.to_string(),
        }
    } else {
        ResolveError::UnknownServerError {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_not_found_variants() {
        for msg in [
            "Commit abc1234 not found in repository",
            "fatal: object not found",
        ] {
            assert!(matches!(
                classify_backend_message("abc1234", msg),
                ResolveError::NotFound { .. }
            ));
        }
    }

    #[test]
    fn clone_depth_wins_over_not_found() {
        let err = classify_backend_message(
            "abc1234",
            "Commit abc1234 not found: exceeds shallow clone depth",
        );
        assert!(matches!(
            err,
            ResolveError::ShallowCloneDepthExceeded { .. }
        ));
    }

    #[test]
    fn classifies_timeout_permission_and_rate_limit() {
        assert!(matches!(
            classify_backend_message("a", "git fetch timed out after 240s"),
            ResolveError::Timeout { .. }
        ));
        assert!(matches!(
            classify_backend_message("a", "Permission denied (publickey)"),
            ResolveError::PermissionDenied { .. }
        ));
        assert!(matches!(
            classify_backend_message("a", "API rate limit exceeded for 10.0.0.1"),
            ResolveError::RateLimited { .. }
        ));
    }

    #[test]
    fn unknown_message_keeps_text() {
        match classify_backend_message("a", "disk on fire") {
            ResolveError::UnknownServerError { message } => assert_eq!(message, "disk on fire"),
            other => panic!("expected UnknownServerError, got {other:?}"),
        }
    }

    #[test]
    fn transience_and_fallback_classes() {
        let hash = "abc1234".to_string();
        assert!(ResolveError::Timeout { hash: hash.clone() }.is_transient());
        assert!(ResolveError::RateLimited {
            retry_after_secs: None
        }
        .is_transient());
        assert!(!ResolveError::NotFound { hash: hash.clone() }.is_transient());

        assert!(ResolveError::NotFound { hash: hash.clone() }.triggers_fallback());
        assert!(ResolveError::ShallowCloneDepthExceeded { hash: hash.clone() }.triggers_fallback());
        assert!(!ResolveError::PermissionDenied { hash }.triggers_fallback());
    }

    #[test]
    fn every_class_has_distinct_remediation() {
        use std::collections::HashSet;
        let errors = [
            ResolveError::MalformedHash {
                input: "x".into(),
            },
            ResolveError::HashTooShort {
                input: "x".into(),
                length: 3,
            },
            ResolveError::NotFound { hash: "a".into() },
            ResolveError::ShallowCloneDepthExceeded { hash: "a".into() },
            ResolveError::Timeout { hash: "a".into() },
            ResolveError::RateLimited {
                retry_after_secs: None,
            },
            ResolveError::PermissionDenied { hash: "a".into() },
            ResolveError::NetworkError {
                message: "x".into(),
            },
            ResolveError::UnknownServerError {
                message: "x".into(),
            },
            ResolveError::Cancelled,
        ];
        let texts: HashSet<&str> = errors.iter().map(|e| e.remediation()).collect();
        assert_eq!(texts.len(), errors.len());
    }
}
