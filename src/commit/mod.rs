//! Commit identity, metadata, and the resolved-commit store.

pub mod hash;
pub mod record;
pub mod store;

pub use hash::{normalize, NormalizedHash, MAX_HASH_LEN, MIN_HASH_LEN};
pub use record::{ChangeType, CommitRecord, CommitStats, FileChange};
pub use store::CommitStore;
