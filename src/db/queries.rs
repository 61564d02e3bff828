use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::snippet::SnippetRecord;

const SNIPPET_COLUMNS: &str =
    "id, file_path, function_name, type, start_line, end_line, code, vector";

/// Inserts a snippet with its embedding, returning the new row id
pub fn insert_snippet(
    conn: &Connection,
    record: &SnippetRecord,
    vector: &[f32],
    indexed_at: &str,
) -> Result<i64> {
    if record.start_line > record.end_line {
        anyhow::bail!(
            "Invalid line range for {}: start_line {} > end_line {}",
            record.file_path,
            record.start_line,
            record.end_line
        );
    }
    if vector.is_empty() {
        anyhow::bail!("Empty vector for {}", record.location());
    }
    if let Some(dim) = stored_dimension(conn)? {
        if vector.len() != dim {
            anyhow::bail!(
                "Vector for {} has {} dimensions, stored snippets have {}",
                record.location(),
                vector.len(),
                dim
            );
        }
    }

    let encoded = serde_json::to_string(vector).context("Failed to encode vector")?;
    conn.execute(
        "INSERT INTO code_snippets (
            file_path, function_name, type, start_line, end_line, code, vector, indexed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.file_path,
            record.function_name,
            record.snippet_type,
            record.start_line,
            record.end_line,
            record.code,
            encoded,
            indexed_at,
        ],
    )
    .with_context(|| format!("Failed to insert snippet {}", record.location()))?;

    Ok(conn.last_insert_rowid())
}

/// Loads every snippet with its decoded vector, in insertion order
pub fn fetch_all_snippets(conn: &Connection) -> Result<Vec<(SnippetRecord, Vec<f32>)>> {
    let sql = format!("SELECT {} FROM code_snippets ORDER BY id", SNIPPET_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_row)?;

    let mut results = Vec::new();
    for row in rows {
        let (id, record, raw_vector) = row.context("Failed to read snippet row")?;
        let vector = decode_vector(&raw_vector)
            .with_context(|| format!("Snippet {} ({}) has a malformed vector", id, record.location()))?;
        results.push((record, vector));
    }

    Ok(results)
}

/// Lists snippets without their vectors, optionally filtered by file path substring
pub fn list_snippets(
    conn: &Connection,
    file_filter: Option<&str>,
    limit: usize,
) -> Result<Vec<SnippetRecord>> {
    let sql = format!(
        "SELECT {} FROM code_snippets
         WHERE ?1 IS NULL OR instr(file_path, ?1) > 0
         ORDER BY file_path, start_line
         LIMIT ?2",
        SNIPPET_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![file_filter, limit as i64], read_row)?;

    let mut results = Vec::new();
    for row in rows {
        let (_, record, _) = row?;
        results.push(record);
    }

    Ok(results)
}

pub fn count_snippets(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM code_snippets", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Dimensionality of the stored vectors, or None when the table is empty.
/// Every row shares it; the first one is read.
pub fn stored_dimension(conn: &Connection) -> Result<Option<usize>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT vector FROM code_snippets ORDER BY id LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        Some(raw) => Ok(Some(decode_vector(&raw).context("Stored vector is malformed")?.len())),
        None => Ok(None),
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(i64, SnippetRecord, String)> {
    Ok((
        row.get(0)?,
        SnippetRecord {
            file_path: row.get(1)?,
            function_name: row.get(2)?,
            snippet_type: row.get(3)?,
            start_line: row.get(4)?,
            end_line: row.get(5)?,
            code: row.get(6)?,
        },
        row.get(7)?,
    ))
}

/// Decodes the textual JSON-array encoding of a vector
fn decode_vector(raw: &str) -> Result<Vec<f32>> {
    let vector: Vec<f32> = serde_json::from_str(raw).context("Vector is not a JSON float array")?;
    Ok(vector)
}
