use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

pub type Record = Map<String, Value>;
pub type RecordData = Vec<Arc<Record>>;

/// Result of resolving a field path against a record.
///
/// `Missing` means some segment of the path does not exist. A present JSON
/// `null` is `Found(Value::Null)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lookup<'a> {
    Missing,
    Found(&'a Value),
}

impl<'a> Lookup<'a> {
    pub fn value(self) -> Option<&'a Value> {
        match self {
            Lookup::Missing => None,
            Lookup::Found(value) => Some(value),
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Lookup::Missing)
    }

    /// Missing or explicit `null`.
    pub fn is_blank(self) -> bool {
        matches!(self, Lookup::Missing | Lookup::Found(Value::Null))
    }

    pub fn as_f64(self) -> Option<f64> {
        self.value().and_then(value_as_f64)
    }

    pub fn display(self) -> String {
        self.value().map(display_value).unwrap_or_default()
    }
}

/// Resolves a dot-separated path. A key that literally contains the whole
/// path wins over nested traversal; numeric segments index into arrays.
pub fn resolve_path<'a>(record: &'a Record, path: &str) -> Lookup<'a> {
    if let Some(value) = record.get(path) {
        return Lookup::Found(value);
    }

    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return Lookup::Missing;
    };
    let Some(mut current) = record.get(first) else {
        return Lookup::Missing;
    };

    for segment in segments {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Lookup::Missing,
        }
    }

    Lookup::Found(current)
}

/// Writes `value` at `path`, creating intermediate objects as needed.
/// Returns false when an intermediate segment exists but is not an object.
pub fn set_path(record: &mut Record, path: &str, value: Value) -> bool {
    if record.contains_key(path) || !path.contains('.') {
        record.insert(path.to_string(), value);
        return true;
    }

    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return false,
    };

    let mut current = record;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry {
            Value::Object(map) => current = map,
            _ => return false,
        }
    }

    current.insert(last.to_string(), value);
    true
}

/// Copy-on-write update: returns a new record with `value` written at `path`,
/// leaving `record` untouched.
pub fn with_path(record: &Record, path: &str, value: Value) -> Option<Record> {
    let mut next = record.clone();
    set_path(&mut next, path, value).then_some(next)
}

/// Returns the sorted union of all top-level keys across all records.
pub fn derive_columns(records: &[Arc<Record>]) -> Vec<String> {
    let mut cols = BTreeSet::new();
    for record in records {
        for key in record.keys() {
            cols.insert(key.clone());
        }
    }
    cols.into_iter().collect()
}

/// Formats a JSON value for display in a table cell.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Numeric view of a cell: numbers and numeric strings. Booleans and
/// everything else are not numeric.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

pub fn json_number_from_f64(value: f64) -> Option<serde_json::Number> {
    if !value.is_finite() {
        return None;
    }

    if value.fract() == 0.0 {
        if value >= i64::MIN as f64 && value <= i64::MAX as f64 {
            return Some((value as i64).into());
        }
        if value >= 0.0 && value <= u64::MAX as f64 {
            return Some((value as u64).into());
        }
    }

    serde_json::Number::from_f64(value)
}

pub type IdFn = Arc<dyn Fn(&Record) -> Option<String> + Send + Sync>;

/// How row ids are derived from records.
///
/// `Positional` ids (`row-{index}`) change when records are reordered, so
/// selection and editing only survive re-sorts with `Field` or `Custom`.
#[derive(Clone, Default)]
pub enum RowIdSource {
    #[default]
    Positional,
    Field(String),
    Custom(IdFn),
}

impl RowIdSource {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Option<String> + Send + Sync + 'static,
    {
        RowIdSource::Custom(Arc::new(f))
    }

    pub fn id_for(&self, record: &Record, index: usize) -> String {
        let extracted = match self {
            RowIdSource::Positional => None,
            RowIdSource::Field(field) => match resolve_path(record, field) {
                Lookup::Found(value) if !value.is_null() => Some(display_value(value)),
                _ => None,
            },
            RowIdSource::Custom(f) => f(record),
        };
        extracted.unwrap_or_else(|| positional_id(index))
    }
}

impl fmt::Debug for RowIdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIdSource::Positional => f.write_str("Positional"),
            RowIdSource::Field(field) => f.debug_tuple("Field").field(field).finish(),
            RowIdSource::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

pub fn positional_id(index: usize) -> String {
    format!("row-{index}")
}

/// The engine's wrapper around one host record.
#[derive(Clone, Debug, PartialEq)]
pub struct RowNode {
    pub id: String,
    pub data: Arc<Record>,
    /// Position in the list the node currently belongs to. Ingestion sets
    /// the source position; flattening renumbers to display position.
    pub row_index: usize,
    /// Position of the record in the source collection.
    pub source_index: usize,
    pub level: usize,
    pub parent_id: Option<String>,
    pub child_rows: Vec<RowNode>,
}

impl RowNode {
    pub fn new(id: String, data: Arc<Record>, index: usize) -> Self {
        Self {
            id,
            data,
            row_index: index,
            source_index: index,
            level: 0,
            parent_id: None,
            child_rows: Vec::new(),
        }
    }

    pub fn value(&self, field: &str) -> Lookup<'_> {
        resolve_path(&self.data, field)
    }
}

/// Wraps each record in a [`RowNode`] with an id from `ids`.
pub fn ingest(records: &[Arc<Record>], ids: &RowIdSource) -> Vec<RowNode> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| RowNode::new(ids.id_for(record, index), Arc::clone(record), index))
        .collect()
}
