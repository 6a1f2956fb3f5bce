//! Durable slot storage.
//!
//! A slot is a named key holding one serialized blob. The conversation
//! snapshot and the session token each live in their own slot.

pub mod memory_slot;
pub mod slot;
pub mod sqlite_slot;

use std::sync::Arc;

pub use memory_slot::MemorySlotStorage;
pub use slot::{SlotFuture, SlotStorage};
pub use sqlite_slot::SqliteSlotStorage;

use crate::core::config::StorageConfig;
use crate::core::errors::StorageResult;

/// Open the slot storage described by `config`.
///
/// # Errors
/// Returns an error if the `SQLite` file cannot be opened.
pub async fn open_storage(config: &StorageConfig) -> StorageResult<Arc<dyn SlotStorage>> {
    match &config.sqlite_path {
        Some(path) => {
            tracing::info!("Opening slot storage at {}", path.display());
            Ok(Arc::new(SqliteSlotStorage::open(path).await?))
        }
        None => {
            tracing::info!("No storage path configured, history kept in memory");
            Ok(Arc::new(MemorySlotStorage::new()))
        }
    }
}
