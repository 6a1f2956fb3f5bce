//! Durable key/blob slot abstraction.

use std::future::Future;
use std::pin::Pin;

use crate::core::errors::StorageResult;

/// Boxed future type for slot operations.
pub type SlotFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for durable named slots holding serialized blobs.
///
/// Writes are last-write-wins; there is no transaction across slots.
pub trait SlotStorage: Send + Sync {
    /// Read a slot. Absent slots yield `None`.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn read(&self, key: &str) -> SlotFuture<'_, StorageResult<Option<String>>>;

    /// Replace the content of a slot.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written.
    fn write(&self, key: &str, blob: String) -> SlotFuture<'_, StorageResult<()>>;

    /// Remove a slot. Removing an absent slot is not an error.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> SlotFuture<'_, StorageResult<()>>;
}
