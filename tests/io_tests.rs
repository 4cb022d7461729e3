use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use gridstate::io::config_io::{self, sidecar_path_for};
use gridstate::io::json_io;
use gridstate::io::IoError;
use gridstate::state::columns::Pin;
use gridstate::state::grouping::Aggregation;
use gridstate::state::options::{GridConfig, GridOptions};
use gridstate::state::selection::SelectionMode;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(name)
}

#[test]
fn test_load_records_fixture() {
    let records = json_io::load_records(&fixture("people.json")).unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[0]["name"], Value::String("Alice".to_string()));
    assert_eq!(records[0]["address"]["city"], json!("Oslo"));
    assert_eq!(records[3]["salary"], Value::Null);
}

#[test]
fn test_load_records_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");
    std::fs::write(&path, "[]").unwrap();

    assert!(json_io::load_records(&path).unwrap().is_empty());
}

#[test]
fn test_load_records_not_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("obj.json");
    std::fs::write(&path, r#"{"key": "value"}"#).unwrap();

    let err = json_io::load_records(&path).unwrap_err();
    assert!(matches!(err, IoError::NotAnArray));
}

#[test]
fn test_load_records_not_objects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.json");
    std::fs::write(&path, r#"[{"a": 1}, 2]"#).unwrap();

    let err = json_io::load_records(&path).unwrap_err();
    assert!(matches!(err, IoError::NotArrayOfObjects { index: 1 }));
}

#[test]
fn test_load_records_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "not json at all").unwrap();

    let err = json_io::load_records(&path).unwrap_err();
    assert!(matches!(err, IoError::Parse { .. }));
}

#[test]
fn test_parse_records_reports_invalid_json() {
    let err = json_io::parse_records("[{\"a\": 1},").unwrap_err();
    assert!(matches!(err, IoError::InvalidJson(_)));
    assert!(err.to_string().starts_with("invalid JSON:"));

    assert!(matches!(json_io::parse_records("3").unwrap_err(), IoError::NotAnArray));
}

#[test]
fn test_load_records_file_not_found() {
    let err = json_io::load_records(Path::new("/nonexistent/path/data.json")).unwrap_err();
    assert!(matches!(err, IoError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/path/data.json"));
}

#[test]
fn test_save_records_roundtrip() {
    let records = json_io::load_records(&fixture("people.json")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");

    json_io::save_records(&path, &records).unwrap();
    assert_eq!(json_io::load_records(&path).unwrap(), records);

    let shared: Vec<_> = records.into_iter().map(Arc::new).collect();
    json_io::save_records(&path, &shared).unwrap();
    assert_eq!(json_io::load_records(&path).unwrap().len(), 5);
}

#[test]
fn test_save_records_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    std::fs::write(&path, "stale").unwrap();

    let records = vec![json!({ "a": 1 }).as_object().cloned().unwrap()];
    json_io::save_records(&path, &records).unwrap();
    assert_eq!(json_io::load_records(&path).unwrap(), records);
}

#[test]
fn test_sidecar_path() {
    assert_eq!(
        sidecar_path_for(Path::new("/data/people.json")),
        PathBuf::from("/data/people.grid.json")
    );
    assert_eq!(sidecar_path_for(Path::new("table")), PathBuf::from("table.grid.json"));
}

#[test]
fn test_missing_sidecar_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_io::load_sidecar(&dir.path().join("none.json")).unwrap();

    assert_eq!(config.options, GridOptions::default());
    assert_eq!(config.options.row_height, 32.0);
    assert_eq!(config.options.overscan, 5);
    assert_eq!(config.options.page_size, 100);
    assert_eq!(config.options.selection_mode, SelectionMode::Multiple);
    assert!(config.columns.is_empty());
}

#[test]
fn test_load_fixture_sidecar() {
    let config = config_io::load_sidecar(&fixture("people.json")).unwrap();

    assert_eq!(config.options.row_height, 28.0);
    assert!(config.options.pagination);
    assert_eq!(config.options.page_size, 2);
    assert_eq!(config.options.overscan, 5);
    assert_eq!(config.options.id_field.as_deref(), Some("id"));
    assert_eq!(config.options.aggregations.get("salary"), Some(&Aggregation::Sum));
    assert_eq!(config.columns.len(), 6);
    assert_eq!(config.columns[0].pinned, Some(Pin::Left));
    assert!(config.columns[5].hidden);
}

#[test]
fn test_config_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("grid.json");

    let mut config = config_io::load_sidecar(&fixture("people.json")).unwrap();
    config.options.group_by = vec!["dept".to_string()];
    config_io::save_sidecar(&data_path, &config).unwrap();

    assert!(dir.path().join("grid.grid.json").exists());
    let loaded: GridConfig = config_io::load_sidecar(&data_path).unwrap();
    assert_eq!(loaded.options, config.options);
    assert_eq!(loaded.columns.len(), config.columns.len());
    assert_eq!(loaded.columns[2].field, "salary");
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.grid.json");
    std::fs::write(&path, r#"{ "rowHeight": "tall" }"#).unwrap();

    let err = config_io::load_config(&path).unwrap_err();
    assert!(matches!(err, IoError::InvalidConfig { .. }));
}
