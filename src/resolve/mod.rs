//! Commit lookup against the local mirror and the hosting API fallback.

pub mod backend;
pub mod error;
pub mod resolver;
pub mod retry;

pub use backend::{CommitSource, LocalRepositoryClient, RemoteHostingClient, RepoContext};
pub use error::{classify_backend_message, ResolveError};
pub use resolver::{CommitResolver, NullProgress, ProgressSink, ProgressUpdate, ResolveOutcome};
pub use retry::{CancelToken, RetryPolicy, RetryTimer, TokioTimer};
