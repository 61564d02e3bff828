use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A stored unit of source code and its location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetRecord {
    pub file_path: String,

    /// Empty for snippets that are not functions
    #[serde(default)]
    pub function_name: String,

    /// "function", "class", "block", ...
    #[serde(rename = "type")]
    pub snippet_type: String,

    pub start_line: i64,
    pub end_line: i64,
    pub code: String,
}

impl SnippetRecord {
    /// "path:start-end" location string
    pub fn location(&self) -> String {
        format!("{}:{}-{}", self.file_path, self.start_line, self.end_line)
    }
}

/// One line of an import file: the record fields plus its embedding
#[derive(Debug, Deserialize)]
pub struct SnippetEntry {
    #[serde(flatten)]
    pub record: SnippetRecord,
    pub vector: Vec<f32>,
}

/// Parses a JSONL file of snippet entries, one JSON object per line.
/// Blank lines are ignored; any malformed line fails the whole parse.
pub fn parse_snippets_jsonl(path: &Path) -> Result<Vec<SnippetEntry>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {} of {:?}", i + 1, path))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: SnippetEntry = serde_json::from_str(&line)
            .with_context(|| format!("Invalid snippet on line {} of {:?}", i + 1, path))?;
        entries.push(entry);
    }

    Ok(entries)
}
