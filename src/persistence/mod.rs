//! Client-side persistence
//!
//! Features:
//! - String key-value backends (LocalStorage on web, in-memory natively)
//! - Fail-soft JSON document reads with per-key defaults
//! - Versioned JSON envelope with step-wise migration

pub mod document;
pub mod lenient;
pub mod migration;
pub mod storage;

pub use document::{DocumentStore, StoredDocument};
pub use migration::{Envelope, Migrated, MigrationStep, SchemaMigrator};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStore;
pub use storage::{KeyValueStore, MemoryStore};
