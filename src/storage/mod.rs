//! Key-value persistence for router health state.
//!
//! # Data Flow
//! ```text
//! HealthStore / PathRegistry
//!     → KeyValueStore::get/set/set_many/remove (string keys, JSON string values)
//!         - memory.rs: process-local map (tests, session scope)
//!         - file.rs: JSON file mirrored in memory (durable across runs)
//! ```
//!
//! # Design Decisions
//! - The interface is synchronous; values are small and writes rare
//! - Implementations report failures; callers decide the fallback
//! - Values are opaque strings so stores never need to know router types

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Minimal string key-value interface backing all persisted router state.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace a value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Write several values as one update.
    ///
    /// The default writes them one by one; stores with a costly commit
    /// override it to commit once.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}
