use anyhow::Result;
use rusqlite::Connection;

/// Creates the snippet table.
/// `vector` holds the embedding as a JSON array of floats.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS code_snippets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_path TEXT NOT NULL,
            function_name TEXT NOT NULL DEFAULT '',
            type TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            code TEXT NOT NULL,
            vector TEXT NOT NULL,
            indexed_at TEXT NOT NULL,
            CHECK (start_line <= end_line)
        );

        CREATE INDEX IF NOT EXISTS code_snippets_file_path ON code_snippets(file_path);
        ",
    )?;
    Ok(())
}
