use std::path::PathBuf;

use snipsearch::db::{Database, SnippetStore};
use snipsearch::snippet::{self, SnippetRecord};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn record(path: &str, start: i64, end: i64) -> SnippetRecord {
    SnippetRecord {
        file_path: path.to_string(),
        function_name: "handler".to_string(),
        snippet_type: "function".to_string(),
        start_line: start,
        end_line: end,
        code: "fn handler() {}".to_string(),
    }
}

/// Helper to set up a test database with fixture data
fn setup_test_db() -> Database {
    let mut db = Database::open_in_memory().unwrap();
    let entries = snippet::parse_snippets_jsonl(&fixture_path("snippets.jsonl")).unwrap();
    db.insert_snippets(entries.iter().map(|e| (&e.record, e.vector.as_slice())))
        .unwrap();
    db
}

#[test]
fn test_parse_fixture() {
    let entries = snippet::parse_snippets_jsonl(&fixture_path("snippets.jsonl")).unwrap();

    // blank line is skipped
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].record.function_name, "login");
    assert_eq!(entries[2].record.snippet_type, "class");
    assert_eq!(entries[3].vector, vec![0.0, 0.0, 0.0]);
}

#[test]
fn test_parse_malformed_line_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.jsonl");
    std::fs::write(
        &path,
        "{\"file_path\":\"a\",\"type\":\"block\",\"start_line\":1,\"end_line\":1,\"code\":\"\",\"vector\":[1]}\nnot json\n",
    )
    .unwrap();

    let err = snippet::parse_snippets_jsonl(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("line 2"));
}

#[test]
fn test_fetch_all_round_trip() {
    let db = setup_test_db();

    let all = db.fetch_all_snippets().unwrap();
    assert_eq!(all.len(), 4);

    let (first, vector) = &all[0];
    assert_eq!(first.file_path, "app/auth.py");
    assert_eq!(first.start_line, 10);
    assert_eq!(first.end_line, 24);
    assert!(first.code.contains("check_password"));
    assert_eq!(vector, &vec![0.9, 0.1, 0.0]);

    // insertion order is preserved
    let paths: Vec<&str> = all.iter().map(|(r, _)| r.file_path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["app/auth.py", "app/db.py", "app/models.py", "app/util.py"]
    );
}

#[test]
fn test_count_and_list() {
    let db = setup_test_db();

    assert_eq!(db.count_snippets().unwrap(), 4);

    let all = db.list_snippets(None, 100).unwrap();
    assert_eq!(all.len(), 4);

    let filtered = db.list_snippets(Some("db.py"), 100).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].function_name, "connect");

    let limited = db.list_snippets(None, 2).unwrap();
    assert_eq!(limited.len(), 2);
}

#[test]
fn test_insert_rejects_inverted_line_range() {
    let db = Database::open_in_memory().unwrap();

    assert!(db.insert_snippet(&record("a.rs", 5, 4), &[1.0]).is_err());
    assert!(db.insert_snippet(&record("a.rs", 5, 5), &[1.0]).is_ok());
    assert_eq!(db.count_snippets().unwrap(), 1);
}

#[test]
fn test_insert_rejects_empty_vector() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.insert_snippet(&record("a.rs", 1, 2), &[]).is_err());
}

#[test]
fn test_batch_insert_is_all_or_nothing() {
    let mut db = Database::open_in_memory().unwrap();
    let good = record("good.rs", 1, 2);
    let bad = record("bad.rs", 9, 2);
    let v = vec![1.0f32, 0.0];

    let result = db.insert_snippets(vec![(&good, v.as_slice()), (&bad, v.as_slice())]);

    assert!(result.is_err());
    assert_eq!(db.count_snippets().unwrap(), 0);
}

#[test]
fn test_malformed_stored_vector_is_an_error() {
    let db = setup_test_db();
    db.conn()
        .execute(
            "INSERT INTO code_snippets
                (file_path, function_name, type, start_line, end_line, code, vector, indexed_at)
             VALUES ('broken.py', '', 'block', 1, 1, 'x', '[0.1, oops]', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

    let err = db.fetch_all_snippets().unwrap_err();
    assert!(format!("{:#}", err).contains("broken.py"));
}

#[test]
fn test_open_creates_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("snippets.db");

    let db = Database::open(&path).unwrap();
    db.insert_snippet(&record("a.rs", 1, 1), &[0.5]).unwrap();
    drop(db);

    let reopened = Database::open(&path).unwrap();
    assert_eq!(reopened.count_snippets().unwrap(), 1);
}

#[test]
fn test_import_with_different_dimension_is_rejected() {
    let mut db = Database::open_in_memory().unwrap();
    let first = record("first.rs", 1, 2);
    let second = record("second.rs", 3, 4);

    db.insert_snippets(vec![(&first, [1.0f32, 0.0].as_slice())])
        .unwrap();

    let result = db.insert_snippets(vec![(&second, [1.0f32, 0.0, 0.0].as_slice())]);
    assert!(result.is_err());
    assert_eq!(db.count_snippets().unwrap(), 1);

    let all = db.fetch_all_snippets().unwrap();
    assert_eq!(all[0].1.len(), 2);
}

#[test]
fn test_batch_with_mixed_dimensions_writes_nothing() {
    let mut db = Database::open_in_memory().unwrap();
    let a = record("a.rs", 1, 2);
    let b = record("b.rs", 1, 2);

    let result = db.insert_snippets(vec![
        (&a, [1.0f32, 0.0].as_slice()),
        (&b, [1.0f32, 0.0, 0.0].as_slice()),
    ]);

    assert!(result.is_err());
    assert_eq!(db.count_snippets().unwrap(), 0);
}

#[test]
fn test_list_file_filter_is_literal() {
    let db = Database::open_in_memory().unwrap();
    db.insert_snippet(&record("src/my_mod.rs", 1, 1), &[1.0]).unwrap();
    db.insert_snippet(&record("src/myXmod.rs", 1, 1), &[1.0]).unwrap();
    db.insert_snippet(&record("src/100%.rs", 1, 1), &[1.0]).unwrap();

    let found = db.list_snippets(Some("my_mod"), 100).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].file_path, "src/my_mod.rs");

    let found = db.list_snippets(Some("%"), 100).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].file_path, "src/100%.rs");
}
