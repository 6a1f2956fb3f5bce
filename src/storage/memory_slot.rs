//! In-memory slot storage.

use dashmap::DashMap;

use crate::core::errors::StorageResult;

use super::slot::{SlotFuture, SlotStorage};

/// Thread-safe in-memory slots; contents die with the process.
#[derive(Debug, Default)]
pub struct MemorySlotStorage {
    slots: DashMap<String, String>,
}

impl MemorySlotStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl SlotStorage for MemorySlotStorage {
    fn read(&self, key: &str) -> SlotFuture<'_, StorageResult<Option<String>>> {
        let value = self.slots.get(key).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(value) })
    }

    fn write(&self, key: &str, blob: String) -> SlotFuture<'_, StorageResult<()>> {
        self.slots.insert(key.to_string(), blob);
        Box::pin(async { Ok(()) })
    }

    fn remove(&self, key: &str) -> SlotFuture<'_, StorageResult<()>> {
        self.slots.remove(key);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let storage = MemorySlotStorage::new();
        storage.write("token", "abc".to_string()).await.unwrap();
        assert_eq!(storage.read("token").await.unwrap().as_deref(), Some("abc"));
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_slot_is_none() {
        let storage = MemorySlotStorage::new();
        assert!(storage.read("nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let storage = MemorySlotStorage::new();
        storage.write("k", "v".to_string()).await.unwrap();
        storage.remove("k").await.unwrap();
        storage.remove("k").await.unwrap();
        assert!(storage.is_empty());
    }
}
