//! Diff text reconciliation.

pub mod parser;
pub mod sentinel;

pub use parser::{parse, DiffBlock};
pub use sentinel::{classify, Sentinel, SentinelKind};
