//! SQLite document store
//!
//! Stores each document as a JSON text row in the `documents` table.
//! A single connection is shared behind a mutex; SQLite serialises writers
//! anyway, and requests are short.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::config::Config;
use crate::ids::{CollectionPath, DocumentPath};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{init_schema, needs_init};
use crate::storage::{DocumentStore, StoredDocument};

/// Document store backed by a SQLite database file
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open or create the database named by the configuration
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::open_path(&config.sqlite_path())
    }

    /// Open or create a database at `path`
    pub fn open_path(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
        }

        let location = path.display().to_string();
        let conn = Connection::open(path).map_err(|e| StorageError::from_sqlite(e, &location))?;
        Self::with_connection(conn, &location)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::from_sqlite(e, ":memory:"))?;
        Self::with_connection(conn, ":memory:")
    }

    fn with_connection(conn: Connection, location: &str) -> StorageResult<Self> {
        if needs_init(&conn) {
            debug!("Initializing document schema at {}", location);
            init_schema(&conn).map_err(|e| StorageError::from_sqlite(e, location))?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Number of documents in a collection
    #[cfg(test)]
    pub fn count(&self, collection: &CollectionPath) -> StorageResult<i64> {
        self.conn()?
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| StorageError::from_sqlite(e, collection.as_str()))
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, path: &DocumentPath) -> StorageResult<Option<String>> {
        self.conn()?
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![path.collection().as_str(), path.id().as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::from_sqlite(e, path.to_string()))
    }

    fn set(&self, path: &DocumentPath, body: &str) -> StorageResult<()> {
        self.conn()?
            .execute(
                r#"
                INSERT INTO documents (collection, id, body, written_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (collection, id)
                DO UPDATE SET body = excluded.body, written_at = excluded.written_at
                "#,
                params![
                    path.collection().as_str(),
                    path.id().as_str(),
                    body,
                    Utc::now().timestamp_millis()
                ],
            )
            .map_err(|e| StorageError::from_sqlite(e, path.to_string()))?;
        Ok(())
    }

    fn create(&self, path: &DocumentPath, body: &str) -> StorageResult<()> {
        let inserted = self
            .conn()?
            .execute(
                r#"
                INSERT INTO documents (collection, id, body, written_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (collection, id) DO NOTHING
                "#,
                params![
                    path.collection().as_str(),
                    path.id().as_str(),
                    body,
                    Utc::now().timestamp_millis()
                ],
            )
            .map_err(|e| StorageError::from_sqlite(e, path.to_string()))?;

        if inserted == 0 {
            return Err(StorageError::AlreadyExists {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn delete(&self, path: &DocumentPath) -> StorageResult<()> {
        self.conn()?
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![path.collection().as_str(), path.id().as_str()],
            )
            .map_err(|e| StorageError::from_sqlite(e, path.to_string()))?;
        Ok(())
    }

    fn list(&self, collection: &CollectionPath) -> StorageResult<Vec<StoredDocument>> {
        let conn = self.conn()?;
        let map_err = |e| StorageError::from_sqlite(e, collection.as_str());

        let mut stmt = conn
            .prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")
            .map_err(map_err)?;

        let rows = stmt
            .query_map(params![collection.as_str()], |row| {
                Ok(StoredDocument {
                    id: row.get(0)?,
                    body: row.get(1)?,
                })
            })
            .map_err(map_err)?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(row.map_err(map_err)?);
        }
        Ok(documents)
    }
}
