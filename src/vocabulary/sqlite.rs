use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::Connection;

use super::{Concept, Vocabulary, VocabularyStore};
use crate::error::EngineError;

/// A `VocabularyStore` backed by a SQLite connection, running the exact
/// `SELECT code, term, display FROM {vocab}_concepts` query the original
/// implementation issues directly against `sqlite3`.
///
/// `rusqlite`'s `Connection` is not `Sync`; access is serialized behind a
/// `Mutex` and queries run on `spawn_blocking` since they're synchronous
/// C-library calls.
pub struct SqliteVocabularyStore {
    conn: Mutex<Connection>,
}

impl SqliteVocabularyStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let conn = Connection::open(path).map_err(|err| EngineError::LocalSearchFailed {
            message: format!("failed to open vocabulary database: {err}"),
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query_rows(conn: &Connection, table: &str) -> rusqlite::Result<Vec<Concept>> {
        let sql = format!("SELECT code, term, display FROM {table}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(Concept {
                code: row.get(0)?,
                term: row.get(1)?,
                display: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    fn query_like(
        conn: &Connection,
        table: &str,
        pattern: &str,
        limit: usize,
    ) -> rusqlite::Result<Vec<Concept>> {
        let sql = format!("SELECT code, term, display FROM {table} WHERE term LIKE ?1 LIMIT ?2");
        let mut stmt = conn.prepare(&sql)?;
        let like_pattern = format!("%{pattern}%");
        let rows = stmt.query_map(rusqlite::params![like_pattern, limit as i64], |row| {
            Ok(Concept {
                code: row.get(0)?,
                term: row.get(1)?,
                display: row.get(2)?,
            })
        })?;
        rows.collect()
    }
}

#[async_trait]
impl VocabularyStore for SqliteVocabularyStore {
    async fn rows(&self, vocabulary: Vocabulary) -> Result<Vec<Concept>, EngineError> {
        let table = vocabulary.table_name();
        let conn = self.conn.lock().expect("vocabulary db mutex poisoned");
        Self::query_rows(&conn, table).map_err(|err| EngineError::LocalSearchFailed {
            message: format!("query failed for {table}: {err}"),
        })
    }

    async fn search_like(
        &self,
        vocabulary: Vocabulary,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<Concept>, EngineError> {
        let table = vocabulary.table_name();
        let conn = self.conn.lock().expect("vocabulary db mutex poisoned");
        Self::query_like(&conn, table, pattern, limit).map_err(|err| {
            EngineError::LocalSearchFailed {
                message: format!("LIKE query failed for {table}: {err}"),
            }
        })
    }
}
