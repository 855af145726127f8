//! Data-source clients for commit lookup.
//!
//! Two collaborators answer "what is commit X": the local repository
//! mirror (authoritative, richer diff output) and the remote hosting API
//! (fallback when the mirror does not have the commit). Both speak the
//! same JSON envelope; they differ in endpoint, deadline, and rate-limit
//! behavior. The resolver drives them through the [`CommitSource`] trait
//! so tests can substitute scripted sources.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::error::{classify_backend_message, ResolveError};
use crate::commit::{CommitRecord, NormalizedHash};

/// Which repository a lookup targets, plus credentials.
///
/// Opaque to the resolver; it is handed through to the backends verbatim.
#[derive(Debug, Clone)]
pub struct RepoContext {
    /// The repository being chatted about.
    pub repo_url: Url,
    /// Access token for private repositories, if any.
    pub access_token: Option<String>,
}

impl RepoContext {
    /// Creates a context for a repository URL.
    pub fn new(repo_url: &str) -> Result<Self> {
        let repo_url = Url::parse(repo_url)
            .with_context(|| format!("invalid repository URL: {repo_url}"))?;
        Ok(Self {
            repo_url,
            access_token: None,
        })
    }

    /// Attaches an access token for private repositories.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// Request body shared by both lookup endpoints.
#[derive(Serialize)]
struct CommitLookupRequest<'a> {
    repo_url: &'a str,
    commit_hash: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
}

/// Request body for the lazy per-file endpoints.
#[derive(Serialize)]
struct FileLookupRequest<'a> {
    repo_url: &'a str,
    commit_hash: &'a str,
    file_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
}

/// Backend reply envelope for commit lookup.
#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum CommitReply {
    /// The commit was found.
    Success {
        /// The resolved record.
        commit: CommitRecord,
    },
    /// The backend could not answer; `message` is free text.
    Error {
        /// Failure description for substring classification.
        message: String,
    },
}

/// Backend reply envelope for the lazy diff endpoint.
#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum DiffReply {
    /// Diff text was produced (possibly a sentinel message).
    Success {
        /// Opaque diff blob for the parser.
        diff: String,
    },
    /// The backend could not answer.
    Error {
        /// Failure description.
        message: String,
    },
}

/// Backend reply envelope for the lazy content endpoint.
#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum ContentReply {
    /// File content at the requested commit.
    Success {
        /// Full file text.
        content: String,
    },
    /// The backend could not answer.
    Error {
        /// Failure description.
        message: String,
    },
}

/// A backend that can turn a normalized hash into a commit record.
pub trait CommitSource: Send + Sync {
    /// Short backend name for progress messages and logs.
    fn name(&self) -> &'static str;

    /// Looks up one commit. Failures are pre-classified into the
    /// resolution taxonomy.
    fn lookup<'a>(
        &'a self,
        ctx: &'a RepoContext,
        hash: &'a NormalizedHash,
    ) -> BoxFuture<'a, Result<CommitRecord, ResolveError>>;
}

/// Maps a reqwest transport failure into the taxonomy.
fn transport_error(hash: &NormalizedHash, err: &reqwest::Error) -> ResolveError {
    if err.is_timeout() {
        ResolveError::Timeout {
            hash: hash.to_string(),
        }
    } else {
        ResolveError::NetworkError {
            message: err.to_string(),
        }
    }
}

/// Client for the local repository mirror service.
///
/// Deadline is generous: the mirror may need to run a targeted fetch for
/// a commit outside its cached history, and commit payloads can be large.
pub struct LocalRepositoryClient {
    client: Client,
    base_url: String,
}

impl LocalRepositoryClient {
    /// Creates a client against the given service base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for local repository service")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetches the raw diff text for one file of one commit.
    ///
    /// The returned blob is opaque here: it may be a unified diff or a
    /// sentinel status message, and it goes to the diff parser verbatim.
    pub async fn file_diff(
        &self,
        ctx: &RepoContext,
        hash: &NormalizedHash,
        file_path: &str,
    ) -> Result<String, ResolveError> {
        let request = FileLookupRequest {
            repo_url: ctx.repo_url.as_str(),
            commit_hash: hash.as_str(),
            file_path,
            access_token: ctx.access_token.as_deref(),
        };
        let url = format!("{}/api/commit-file-diff", self.base_url);
        debug!(%hash, file_path, "fetching file diff");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(hash, &e))?;

        if !response.status().is_success() {
            return Err(http_failure(hash, response).await);
        }

        match response.json().await.map_err(invalid_reply)? {
            DiffReply::Success { diff } => Ok(diff),
            DiffReply::Error { message } => Err(classify_backend_message(hash.as_str(), &message)),
        }
    }

    /// Fetches the full content of one file at one commit.
    pub async fn file_content(
        &self,
        ctx: &RepoContext,
        hash: &NormalizedHash,
        file_path: &str,
    ) -> Result<String, ResolveError> {
        let request = FileLookupRequest {
            repo_url: ctx.repo_url.as_str(),
            commit_hash: hash.as_str(),
            file_path,
            access_token: ctx.access_token.as_deref(),
        };
        let url = format!("{}/api/file-content-at-commit", self.base_url);
        debug!(%hash, file_path, "fetching file content");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(hash, &e))?;

        if !response.status().is_success() {
            return Err(http_failure(hash, response).await);
        }

        match response.json().await.map_err(invalid_reply)? {
            ContentReply::Success { content } => Ok(content),
            ContentReply::Error { message } => {
                Err(classify_backend_message(hash.as_str(), &message))
            }
        }
    }
}

impl CommitSource for LocalRepositoryClient {
    fn name(&self) -> &'static str {
        "local mirror"
    }

    fn lookup<'a>(
        &'a self,
        ctx: &'a RepoContext,
        hash: &'a NormalizedHash,
    ) -> BoxFuture<'a, Result<CommitRecord, ResolveError>> {
        Box::pin(async move {
            let request = CommitLookupRequest {
                repo_url: ctx.repo_url.as_str(),
                commit_hash: hash.as_str(),
                access_token: ctx.access_token.as_deref(),
            };
            let url = format!("{}/api/commit-by-hash", self.base_url);
            debug!(%hash, backend = self.name(), "looking up commit");

            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| transport_error(hash, &e))?;

            if !response.status().is_success() {
                return Err(http_failure(hash, response).await);
            }

            match response.json().await.map_err(invalid_reply)? {
                CommitReply::Success { commit } => Ok(commit),
                CommitReply::Error { message } => {
                    Err(classify_backend_message(hash.as_str(), &message))
                }
            }
        })
    }
}

/// Client for the remote hosting API fallback.
///
/// Subject to HTTP 429 with a `Retry-After` header; the resolver honors
/// that hint over its own computed backoff.
pub struct RemoteHostingClient {
    client: Client,
    base_url: String,
}

impl RemoteHostingClient {
    /// Creates a client against the given service base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for remote hosting API")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl CommitSource for RemoteHostingClient {
    fn name(&self) -> &'static str {
        "hosting API"
    }

    fn lookup<'a>(
        &'a self,
        ctx: &'a RepoContext,
        hash: &'a NormalizedHash,
    ) -> BoxFuture<'a, Result<CommitRecord, ResolveError>> {
        Box::pin(async move {
            let request = CommitLookupRequest {
                repo_url: ctx.repo_url.as_str(),
                commit_hash: hash.as_str(),
                access_token: ctx.access_token.as_deref(),
            };
            let url = format!("{}/api/github-commit", self.base_url);
            debug!(%hash, backend = self.name(), "looking up commit");

            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| transport_error(hash, &e))?;

            if !response.status().is_success() {
                return Err(http_failure(hash, response).await);
            }

            match response.json().await.map_err(invalid_reply)? {
                CommitReply::Success { commit } => Ok(commit),
                CommitReply::Error { message } => {
                    Err(classify_backend_message(hash.as_str(), &message))
                }
            }
        })
    }
}

/// Maps a non-success HTTP response into the taxonomy.
async fn http_failure(hash: &NormalizedHash, response: reqwest::Response) -> ResolveError {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return ResolveError::RateLimited { retry_after_secs };
    }

    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        // GitHub reports exhausted quota as 403 with this body text.
        if body.to_lowercase().contains("rate limit") {
            return ResolveError::RateLimited {
                retry_after_secs: None,
            };
        }
        return ResolveError::PermissionDenied {
            hash: hash.to_string(),
        };
    }

    ResolveError::UnknownServerError {
        message: format!("HTTP {status}: {body}"),
    }
}

/// A reply that did not match the expected envelope.
fn invalid_reply(err: reqwest::Error) -> ResolveError {
    ResolveError::UnknownServerError {
        message: format!("invalid backend reply: {err}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn repo_context_rejects_garbage_urls() {
        assert!(RepoContext::new("not a url").is_err());
        let ctx = RepoContext::new("https://github.com/rust-lang/rust")
            .unwrap()
            .with_token("tok");
        assert_eq!(ctx.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn lookup_request_omits_absent_token() {
        let request = CommitLookupRequest {
            repo_url: "https://github.com/a/b",
            commit_hash: "abc1234",
            access_token: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("access_token"));
    }

    #[test]
    fn reply_envelope_parses_both_arms() {
        let err: CommitReply =
            serde_json::from_str(r#"{"status":"error","message":"not found"}"#).unwrap();
        assert!(matches!(err, CommitReply::Error { .. }));

        let ok: CommitReply = serde_json::from_str(
            r#"{"status":"success","commit":{
                "hash":"0123456789abcdef0123456789abcdef01234567",
                "short_hash":"0123456",
                "author":"A <a@b.c>",
                "date":"2025-01-01T00:00:00+00:00",
                "message":"m",
                "stats":{"files_changed":0,"insertions":0,"deletions":0}
            }}"#,
        )
        .unwrap();
        match ok {
            CommitReply::Success { commit } => assert_eq!(commit.short_hash, "0123456"),
            CommitReply::Error { .. } => panic!("expected success arm"),
        }
    }
}
