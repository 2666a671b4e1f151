//! Notification pointers and repository channel mappings.
//!
//! Two backends behind one enum: an in-memory map (tests, `:memory:`) and a
//! SQLite file. Both enforce one pointer per (repository_id, pull_request_id);
//! a second insert fails with [`StoreError::Duplicate`] instead of replacing it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::debug;

use crate::errors::StoreError;

/// Path value that selects the in-memory backend.
pub const IN_MEMORY: &str = ":memory:";

/// Stored location of the single message representing a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPointer {
    pub repository_id: u64,
    pub pull_request_id: u64,
    pub channel: String,
    /// Slack message `ts`.
    pub message_ts: String,
}

/// Repository to channel routing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapping {
    pub repository_id: u64,
    pub channel_id: String,
    pub repository_name: String,
}

#[derive(Debug, Clone)]
pub enum NotifyStore {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl NotifyStore {
    /// Opens the SQLite file at `path`, or an in-memory store for `:memory:`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path.as_os_str() == IN_MEMORY {
            return Ok(Self::in_memory());
        }
        Ok(NotifyStore::Sqlite(SqliteStore::open(path)?))
    }

    pub fn in_memory() -> Self {
        NotifyStore::Memory(MemoryStore::default())
    }

    pub fn get_pointer(
        &self,
        repository_id: u64,
        pull_request_id: u64,
    ) -> Result<Option<NotificationPointer>, StoreError> {
        match self {
            NotifyStore::Memory(s) => s.get_pointer(repository_id, pull_request_id),
            NotifyStore::Sqlite(s) => s.get_pointer(repository_id, pull_request_id),
        }
    }

    pub fn insert_pointer(&self, pointer: &NotificationPointer) -> Result<(), StoreError> {
        match self {
            NotifyStore::Memory(s) => s.insert_pointer(pointer),
            NotifyStore::Sqlite(s) => s.insert_pointer(pointer),
        }
    }

    pub fn get_channel(&self, repository_id: u64) -> Result<Option<String>, StoreError> {
        match self {
            NotifyStore::Memory(s) => s.get_channel(repository_id),
            NotifyStore::Sqlite(s) => s.get_channel(repository_id),
        }
    }

    /// Inserts or replaces the mapping for `repository_id`.
    pub fn set_channel(
        &self,
        repository_id: u64,
        channel_id: &str,
        repository_name: &str,
    ) -> Result<(), StoreError> {
        let mapping = ChannelMapping {
            repository_id,
            channel_id: channel_id.to_string(),
            repository_name: repository_name.to_string(),
        };
        match self {
            NotifyStore::Memory(s) => s.set_channel(mapping),
            NotifyStore::Sqlite(s) => s.set_channel(&mapping),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    pointers: HashMap<(u64, u64), NotificationPointer>,
    channels: HashMap<u64, ChannelMapping>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    fn get_pointer(
        &self,
        repository_id: u64,
        pull_request_id: u64,
    ) -> Result<Option<NotificationPointer>, StoreError> {
        Ok(self
            .lock()?
            .pointers
            .get(&(repository_id, pull_request_id))
            .cloned())
    }

    fn insert_pointer(&self, pointer: &NotificationPointer) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let key = (pointer.repository_id, pointer.pull_request_id);
        if inner.pointers.contains_key(&key) {
            return Err(StoreError::Duplicate {
                repository_id: key.0,
                pull_request_id: key.1,
            });
        }
        inner.pointers.insert(key, pointer.clone());
        Ok(())
    }

    fn get_channel(&self, repository_id: u64) -> Result<Option<String>, StoreError> {
        Ok(self
            .lock()?
            .channels
            .get(&repository_id)
            .map(|m| m.channel_id.clone()))
    }

    fn set_channel(&self, mapping: ChannelMapping) -> Result<(), StoreError> {
        self.lock()?.channels.insert(mapping.repository_id, mapping);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        debug!(path = %path.display(), "notify store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn get_pointer(
        &self,
        repository_id: u64,
        pull_request_id: u64,
    ) -> Result<Option<NotificationPointer>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT channel, message_ts FROM notification_pointers
                 WHERE repository_id = ?1 AND pull_request_id = ?2",
                params![repository_id as i64, pull_request_id as i64],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        Ok(row.map(|(channel, message_ts)| NotificationPointer {
            repository_id,
            pull_request_id,
            channel,
            message_ts,
        }))
    }

    fn insert_pointer(&self, pointer: &NotificationPointer) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let res = conn.execute(
            "INSERT INTO notification_pointers (repository_id, pull_request_id, channel, message_ts)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                pointer.repository_id as i64,
                pointer.pull_request_id as i64,
                pointer.channel,
                pointer.message_ts
            ],
        );
        match res {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::Duplicate {
                    repository_id: pointer.repository_id,
                    pull_request_id: pointer.pull_request_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_channel(&self, repository_id: u64) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let channel = conn
            .query_row(
                "SELECT channel_id FROM repo_channels WHERE repository_id = ?1",
                params![repository_id as i64],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(channel)
    }

    fn set_channel(&self, mapping: &ChannelMapping) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO repo_channels (repository_id, channel_id, repository_name)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(repository_id) DO UPDATE SET
               channel_id = excluded.channel_id,
               repository_name = excluded.repository_name",
            params![
                mapping.repository_id as i64,
                mapping.channel_id,
                mapping.repository_name
            ],
        )?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
PRAGMA journal_mode=WAL;
CREATE TABLE IF NOT EXISTS notification_pointers (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  repository_id INTEGER NOT NULL,
  pull_request_id INTEGER NOT NULL,
  channel TEXT NOT NULL,
  message_ts TEXT NOT NULL,
  UNIQUE(repository_id, pull_request_id)
);
CREATE TABLE IF NOT EXISTS repo_channels (
  repository_id INTEGER PRIMARY KEY,
  channel_id TEXT NOT NULL,
  repository_name TEXT NOT NULL DEFAULT ''
);
"#,
    )?;
    Ok(())
}
