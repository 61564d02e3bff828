pub mod queries;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::snippet::SnippetRecord;

/// Source of indexed snippets and their stored vectors
pub trait SnippetStore {
    fn fetch_all_snippets(&self) -> Result<Vec<(SnippetRecord, Vec<f32>)>>;
}

/// Main database handle wrapping rusqlite connection
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens or creates the database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::create_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Opens an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Gets a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn insert_snippet(&self, record: &SnippetRecord, vector: &[f32]) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        queries::insert_snippet(&self.conn, record, vector, &now)
    }

    /// Inserts a batch in a single transaction; nothing is written if any entry fails
    pub fn insert_snippets<'a, I>(&mut self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a SnippetRecord, &'a [f32])>,
    {
        let now = chrono::Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut count = 0;
        for (record, vector) in entries {
            queries::insert_snippet(&tx, record, vector, &now)?;
            count += 1;
        }
        tx.commit().context("Failed to commit snippet import")?;
        Ok(count)
    }

    pub fn list_snippets(&self, file_filter: Option<&str>, limit: usize) -> Result<Vec<SnippetRecord>> {
        queries::list_snippets(&self.conn, file_filter, limit)
    }

    pub fn count_snippets(&self) -> Result<usize> {
        queries::count_snippets(&self.conn)
    }
}

impl SnippetStore for Database {
    fn fetch_all_snippets(&self) -> Result<Vec<(SnippetRecord, Vec<f32>)>> {
        queries::fetch_all_snippets(&self.conn)
    }
}
