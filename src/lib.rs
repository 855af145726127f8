//! # reposage-core
//!
//! Commit resolution and diff reconciliation engine for repository chat
//! assistants.
//!
//! The crate turns a possibly malformed, possibly stale commit identifier
//! into a verified [`commit::CommitRecord`] by querying a local repository
//! mirror first and a remote hosting API as fallback, with retry, backoff,
//! and a structured failure taxonomy. Unified-diff text returned by those
//! backends is normalized into line-addressable [`diff::DiffBlock`]s that
//! are safe to render side by side.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use reposage_core::config::EngineConfig;
//! use reposage_core::engine::Engine;
//! use reposage_core::resolve::RepoContext;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let engine = Engine::new(EngineConfig::default())?;
//! let ctx = RepoContext::new("https://github.com/rust-lang/rust")?;
//! let record = engine.resolve_commit("a1b2c3d", &ctx).await?;
//! println!("{}: {}", record.short_hash, record.message);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod commit;
pub mod config;
pub mod diff;
pub mod engine;
pub mod logging;
pub mod resolve;
pub mod scan;

pub use crate::engine::Engine;

/// The current version of reposage-core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
