//! SQLite-backed slot storage.

use std::path::Path;

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::core::errors::StorageResult;

use super::slot::{SlotFuture, SlotStorage};

/// `SQLite` implementation of the durable slots.
pub struct SqliteSlotStorage {
    conn: Connection,
    table: String,
}

impl SqliteSlotStorage {
    /// Table name for slots.
    pub const DEFAULT_TABLE: &'static str = "slots";

    /// Open (or create) the database file and the slot table.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialised.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref()).await?;
        Self::with_connection(conn).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialised.
    pub async fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> StorageResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl SlotStorage for SqliteSlotStorage {
    fn read(&self, key: &str) -> SlotFuture<'_, StorageResult<Option<String>>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let value = self
                .conn
                .call(move |conn| {
                    let value = conn
                        .query_row(
                            &format!("SELECT value FROM {table} WHERE key = ?1"),
                            rusqlite::params![key],
                            |row| row.get::<_, String>(0),
                        )
                        .optional()?;
                    Ok(value)
                })
                .await?;
            Ok(value)
        })
    }

    fn write(&self, key: &str, blob: String) -> SlotFuture<'_, StorageResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let now_ms = chrono::Utc::now().timestamp_millis();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table} (key, value, updated_at) VALUES (?1, ?2, ?3)
                             ON CONFLICT(key) DO UPDATE SET
                                value = excluded.value,
                                updated_at = excluded.updated_at"
                        ),
                        rusqlite::params![key, blob, now_ms],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> SlotFuture<'_, StorageResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!("DELETE FROM {table} WHERE key = ?1"),
                        rusqlite::params![key],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let storage = SqliteSlotStorage::open_in_memory().await.unwrap();
        storage.write("slot", "first".to_string()).await.unwrap();
        storage.write("slot", "second".to_string()).await.unwrap();
        assert_eq!(
            storage.read("slot").await.unwrap().as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_absent_and_removed() {
        let storage = SqliteSlotStorage::open_in_memory().await.unwrap();
        assert!(storage.read("slot").await.unwrap().is_none());
        storage.write("slot", "x".to_string()).await.unwrap();
        storage.remove("slot").await.unwrap();
        assert!(storage.read("slot").await.unwrap().is_none());
    }
}
