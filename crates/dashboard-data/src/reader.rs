//! File-backed record collections.
//!
//! A collection named `expenditures` under `root` is read from
//! `root/expenditures.json` (a JSON array or a single object) and from every
//! `*.json` / `*.jsonl` file below `root/expenditures/`. Records are kept
//! only when they satisfy the [`FetchFilter`].

use std::io::BufRead;
use std::path::{Path, PathBuf};

use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::{FetchFilter, Record};
use serde_json::Value;
use tracing::debug;

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.json` / `.jsonl` files recursively under `dir`, sorted by path.
pub fn find_record_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_record_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load every record of `collection` under `root` that matches `filter`.
///
/// Fails when the collection does not exist or any of its files cannot be
/// read or parsed; a collection is either loaded completely or not at all.
pub fn load_collection(root: &Path, collection: &str, filter: &FetchFilter) -> Result<Vec<Record>> {
    let single_file = root.join(format!("{collection}.json"));
    let directory = root.join(collection);

    let mut files = Vec::new();
    if single_file.is_file() {
        files.push(single_file);
    }
    files.extend(find_record_files(&directory));

    if files.is_empty() && !directory.is_dir() {
        return Err(DashboardError::DataPathNotFound(directory));
    }

    let mut records = Vec::new();
    let mut read = 0usize;
    for file in &files {
        let loaded = read_records(file)?;
        read += loaded.len();
        records.extend(loaded.into_iter().filter(|r| filter.matches(r)));
    }

    debug!(
        collection,
        files = files.len(),
        read,
        kept = records.len(),
        "collection loaded"
    );

    Ok(records)
}

/// Read all objects from a single `.json` or `.jsonl` file.
///
/// Non-object JSON values (numbers, strings, nested arrays) are skipped.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file_read = |source| DashboardError::FileRead {
        path: path.to_path_buf(),
        source,
    };

    if path.extension().is_some_and(|ext| ext == "jsonl") {
        let file = std::fs::File::open(path).map_err(file_read)?;
        let mut records = Vec::new();
        for line in std::io::BufReader::new(file).lines() {
            let line = line.map_err(file_read)?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            collect_objects(serde_json::from_str(trimmed)?, &mut records);
        }
        return Ok(records);
    }

    let content = std::fs::read_to_string(path).map_err(file_read)?;
    let mut records = Vec::new();
    if !content.trim().is_empty() {
        collect_objects(serde_json::from_str(&content)?, &mut records);
    }
    Ok(records)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn is_record_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "json" || ext == "jsonl")
        .unwrap_or(false)
}

fn collect_objects(value: Value, out: &mut Vec<Record>) {
    match value {
        Value::Object(map) => out.push(map),
        Value::Array(items) => out.extend(items.into_iter().filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })),
        other => debug!("skipping non-object JSON value: {}", other),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::models::FilterClause;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn filter(clauses: &[&str]) -> FetchFilter {
        FetchFilter::new(
            clauses
                .iter()
                .map(|c| c.parse::<FilterClause>().unwrap())
                .collect(),
        )
    }

    // ── find_record_files ─────────────────────────────────────────────────────

    #[test]
    fn test_find_record_files_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "b.json", "[]");
        write_file(dir.path(), "a/nested.jsonl", "");
        write_file(dir.path(), "notes.txt", "ignored");

        let files = find_record_files(dir.path());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("nested.jsonl"));
        assert_eq!(names[1], "b.json");
    }

    #[test]
    fn test_find_record_files_nonexistent_path() {
        assert!(find_record_files(Path::new("/definitely/not/here")).is_empty());
    }

    // ── load_collection ───────────────────────────────────────────────────────

    #[test]
    fn test_load_collection_single_file_array() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "earnings.json",
            r#"[{"Mês": "01/2025", "Faturamento": "R$ 10.000,00"}, 42, {"Mês": "02/2025"}]"#,
        );

        let records = load_collection(dir.path(), "earnings", &FetchFilter::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Faturamento"], "R$ 10.000,00");
    }

    #[test]
    fn test_load_collection_file_and_directory_combined() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "expenditures.json", r#"{"Month": "2025-01"}"#);
        write_file(
            dir.path(),
            "expenditures/2025/feb.jsonl",
            "{\"Month\": \"2025-02\"}\n\n{\"Month\": \"2025-03\"}\n",
        );

        let records = load_collection(dir.path(), "expenditures", &FetchFilter::default()).unwrap();
        let months: Vec<&str> = records.iter().map(|r| r["Month"].as_str().unwrap()).collect();
        assert_eq!(months, vec!["2025-01", "2025-02", "2025-03"]);
    }

    #[test]
    fn test_load_collection_applies_filter() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "expenditures.json",
            r#"[{"company": "Acme", "Month": "2025-01"}, {"company": "Other", "Month": "2025-01"}]"#,
        );

        let records =
            load_collection(dir.path(), "expenditures", &filter(&["company=Acme"])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["company"], "Acme");
    }

    #[test]
    fn test_load_collection_missing_is_error() {
        let dir = TempDir::new().unwrap();
        let err = load_collection(dir.path(), "earnings", &FetchFilter::default()).unwrap_err();
        assert!(matches!(err, DashboardError::DataPathNotFound(_)));
    }

    #[test]
    fn test_load_collection_empty_directory_is_ok() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("earnings")).unwrap();
        let records = load_collection(dir.path(), "earnings", &FetchFilter::default()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_load_collection_malformed_json_is_error() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "earnings.json", "[{\"Mês\": ");
        let err = load_collection(dir.path(), "earnings", &FetchFilter::default()).unwrap_err();
        assert!(matches!(err, DashboardError::JsonParse(_)));
    }

    #[test]
    fn test_read_records_malformed_jsonl_line_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "rows.jsonl", "{\"a\": 1}\nnot json\n");
        assert!(read_records(&path).is_err());
    }

    #[test]
    fn test_read_records_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "rows.json", "  \n");
        assert!(read_records(&path).unwrap().is_empty());
    }
}
