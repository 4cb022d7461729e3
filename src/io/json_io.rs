use std::borrow::Borrow;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::io::{atomic_write_string, IoError};
use crate::state::data_model::Record;

/// Reads a JSON array of objects.
pub fn load_records(path: &Path) -> Result<Vec<Record>, IoError> {
    let content = fs::read_to_string(path).map_err(|e| IoError::io(path, e))?;
    let records = parse_records(&content).map_err(|err| match err {
        IoError::InvalidJson(source) => IoError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    debug!(path = %path.display(), records = records.len(), "records loaded");
    Ok(records)
}

pub fn parse_records(content: &str) -> Result<Vec<Record>, IoError> {
    let Value::Array(items) = serde_json::from_str::<Value>(content).map_err(IoError::InvalidJson)? else {
        return Err(IoError::NotAnArray);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(IoError::NotArrayOfObjects { index }),
        })
        .collect()
}

/// Pretty JSON, written atomically. Accepts plain or shared records.
pub fn save_records<R: Borrow<Record>>(path: &Path, records: &[R]) -> Result<(), IoError> {
    let array: Vec<&Record> = records.iter().map(<R as Borrow<Record>>::borrow).collect();
    let json = serde_json::to_string_pretty(&array)?;
    atomic_write_string(path, &json).map_err(|e| IoError::io(path, e))?;
    debug!(path = %path.display(), records = array.len(), "records saved");
    Ok(())
}
