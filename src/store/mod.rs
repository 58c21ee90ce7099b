//! Persisted Stores
//!
//! File-backed implementations of the primary config store and the
//! topology cache. Every rewrite is atomic (temp file, fsync, rename).

mod atomic;
mod database_yml;
mod errors;
mod failover_yml;

pub use atomic::AtomicFile;
pub use database_yml::DatabaseYml;
pub use errors::{StoreError, StoreResult};
pub use failover_yml::FailoverDatabasesYml;
