//! Engine facade wiring resolution, storage, scanning, and lazy diffs.
//!
//! One `Engine` serves one chat session. User actions and scanned chat
//! text feed the resolver; resolved commits land in the shared store;
//! per-file diff text is fetched lazily from the local mirror and handed
//! to the parser only when a diff view is requested.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::debug;

use crate::commit::{normalize, CommitRecord, CommitStore};
use crate::config::EngineConfig;
use crate::diff::{self, DiffBlock};
use crate::resolve::{
    CancelToken, CommitResolver, CommitSource, LocalRepositoryClient, NullProgress, ProgressSink,
    RemoteHostingClient, RepoContext, ResolveError,
};
use crate::scan::HashScanner;

/// Facade over the resolution and diff pipeline.
pub struct Engine {
    config: EngineConfig,
    store: Arc<Mutex<CommitStore>>,
    resolver: CommitResolver,
    local: Arc<LocalRepositoryClient>,
    scanner: HashScanner,
    /// Replaced wholesale on repository switch so stale retry chains die.
    cancel: Mutex<CancelToken>,
}

impl Engine {
    /// Creates an engine with no progress reporting.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_progress(config, Arc::new(NullProgress))
    }

    /// Creates an engine that publishes interim retry feedback to `progress`.
    pub fn with_progress(config: EngineConfig, progress: Arc<dyn ProgressSink>) -> Result<Self> {
        let local = Arc::new(LocalRepositoryClient::new(
            config.local_base_url.clone(),
            config.local_timeout(),
        )?);
        let remote = Arc::new(RemoteHostingClient::new(
            config.remote_base_url.clone(),
            config.remote_timeout(),
        )?);
        let store = Arc::new(Mutex::new(CommitStore::new()));

        let resolver = CommitResolver::new(
            Arc::clone(&local) as Arc<dyn CommitSource>,
            remote as Arc<dyn CommitSource>,
            Arc::clone(&store),
        )
        .with_policy(config.retry_policy())
        .with_progress(progress);

        Ok(Self {
            config,
            store,
            resolver,
            local,
            scanner: HashScanner::default(),
            cancel: Mutex::new(CancelToken::new()),
        })
    }

    /// Builds a repository context, applying the configured access token.
    pub fn repo_context(&self, repo_url: &str) -> Result<RepoContext> {
        let ctx = RepoContext::new(repo_url)?;
        Ok(match &self.config.access_token {
            Some(token) => ctx.with_token(token.clone()),
            None => ctx,
        })
    }

    /// Resolves a raw commit identifier, updating the store on success.
    pub async fn resolve_commit(
        &self,
        identifier: &str,
        ctx: &RepoContext,
    ) -> Result<CommitRecord, ResolveError> {
        let cancel = self.current_cancel();
        self.resolver.resolve(identifier, ctx, &cancel).await
    }

    /// Snapshot of a stored commit by full hash, short hash, or prefix.
    pub fn commit(&self, key: &str) -> Option<CommitRecord> {
        #[allow(clippy::unwrap_used)]
        let store = self.store.lock().unwrap();
        store.get(key).cloned()
    }

    /// Extracts unresolved hash candidates from assistant chat text.
    pub fn scan_message(&self, text: &str) -> Vec<String> {
        let (known, known_short) = {
            #[allow(clippy::unwrap_used)]
            let store = self.store.lock().unwrap();
            (store.known_hashes(), store.known_short_hashes())
        };
        self.scanner.scan(text, &known, &known_short)
    }

    /// Scans chat text and resolves each candidate in the background.
    ///
    /// Fire-and-forget per candidate: the calling flow is never blocked,
    /// and failures are logged rather than surfaced. Returns the
    /// candidates that were scheduled.
    pub fn scan_and_resolve(self: &Arc<Self>, text: &str, ctx: &RepoContext) -> Vec<String> {
        let candidates = self.scan_message(text);
        for candidate in &candidates {
            let engine = Arc::clone(self);
            let ctx = ctx.clone();
            let candidate = candidate.clone();
            tokio::spawn(async move {
                if let Err(err) = engine.resolve_commit(&candidate, &ctx).await {
                    debug!(candidate, error = %err, "background hash resolution failed");
                }
            });
        }
        candidates
    }

    /// Fetches and parses the diff for one file of one commit.
    ///
    /// Diff text already cached on the stored record is reused; otherwise
    /// it is fetched from the local mirror and persisted onto the record
    /// so the next request is free.
    pub async fn file_diff(
        &self,
        ctx: &RepoContext,
        identifier: &str,
        file_path: &str,
    ) -> Result<Vec<DiffBlock>, ResolveError> {
        let hash = normalize(identifier)?;

        let (store_key, cached) = {
            #[allow(clippy::unwrap_used)]
            let store = self.store.lock().unwrap();
            match store.get(hash.as_str()) {
                Some(record) => {
                    let cached = record
                        .file_changes
                        .iter()
                        .find(|c| c.path == file_path)
                        .and_then(|c| c.diff.clone());
                    (Some(record.hash.clone()), cached)
                }
                None => (None, None),
            }
        };

        if let Some(text) = cached {
            return Ok(diff::parse(&text));
        }

        self.set_loading(store_key.as_deref(), file_path, true);
        let fetched = self.local.file_diff(ctx, &hash, file_path).await;
        self.set_loading(store_key.as_deref(), file_path, false);
        let text = fetched?;

        if let Some(full_hash) = &store_key {
            #[allow(clippy::unwrap_used)]
            let mut store = self.store.lock().unwrap();
            store.update_file_change(full_hash, file_path, |change| {
                change.diff = Some(text.clone());
            });
        }

        Ok(diff::parse(&text))
    }

    /// Fetches the full content of one file at one commit.
    ///
    /// Meaningless for deleted files; those fail as not-found without a
    /// network call when the store already knows the change type.
    pub async fn file_content(
        &self,
        ctx: &RepoContext,
        identifier: &str,
        file_path: &str,
    ) -> Result<String, ResolveError> {
        let hash = normalize(identifier)?;

        let store_key = {
            #[allow(clippy::unwrap_used)]
            let store = self.store.lock().unwrap();
            let record = store.get(hash.as_str());
            if let Some(change) = record
                .and_then(|r| r.file_changes.iter().find(|c| c.path == file_path))
            {
                if !change.change_type.has_content() {
                    return Err(ResolveError::NotFound {
                        hash: hash.to_string(),
                    });
                }
                if let Some(content) = &change.display_content {
                    return Ok(content.clone());
                }
            }
            record.map(|r| r.hash.clone())
        };

        self.set_loading(store_key.as_deref(), file_path, true);
        let fetched = self.local.file_content(ctx, &hash, file_path).await;
        self.set_loading(store_key.as_deref(), file_path, false);
        let content = fetched?;

        if let Some(full_hash) = &store_key {
            #[allow(clippy::unwrap_used)]
            let mut store = self.store.lock().unwrap();
            store.update_file_change(full_hash, file_path, |change| {
                change.display_content = Some(content.clone());
            });
        }

        Ok(content)
    }

    /// Switches the active repository: cancels every in-flight retry
    /// chain and clears the store.
    pub fn reset_repository(&self) {
        {
            #[allow(clippy::unwrap_used)]
            let mut cancel = self.cancel.lock().unwrap();
            cancel.cancel();
            *cancel = CancelToken::new();
        }
        #[allow(clippy::unwrap_used)]
        let mut store = self.store.lock().unwrap();
        store.clear();
    }

    /// Cancels all in-flight work without clearing the store.
    pub fn shutdown(&self) {
        #[allow(clippy::unwrap_used)]
        let cancel = self.cancel.lock().unwrap();
        cancel.cancel();
    }

    fn current_cancel(&self) -> CancelToken {
        #[allow(clippy::unwrap_used)]
        let cancel = self.cancel.lock().unwrap();
        cancel.clone()
    }

    fn set_loading(&self, store_key: Option<&str>, file_path: &str, loading: bool) {
        let Some(full_hash) = store_key else {
            return;
        };
        #[allow(clippy::unwrap_used)]
        let mut store = self.store.lock().unwrap();
        store.update_file_change(full_hash, file_path, |change| {
            change.loading = loading;
        });
    }
}
