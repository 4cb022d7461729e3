use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::state::columns::{ColumnDef, ColumnIndex};
use crate::state::data_model::{display_value, Lookup, RowNode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    Text,
    Number,
    Date,
    Select,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextOperator {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RangeOperator {
    Equals,
    GreaterThan,
    LessThan,
    Between,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filterType", rename_all = "lowercase")]
pub enum FilterCondition {
    Text {
        operator: TextOperator,
        #[serde(default)]
        value: Option<String>,
    },
    Number {
        operator: RangeOperator,
        #[serde(default)]
        value: Option<f64>,
        #[serde(default, rename = "valueTo")]
        value_to: Option<f64>,
    },
    Date {
        operator: RangeOperator,
        #[serde(default)]
        value: Option<String>,
        #[serde(default, rename = "valueTo")]
        value_to: Option<String>,
    },
    /// Allow-list of string-coerced values. Empty excludes every row.
    Select { values: Vec<String> },
}

impl FilterCondition {
    pub fn filter_type(&self) -> FilterType {
        match self {
            FilterCondition::Text { .. } => FilterType::Text,
            FilterCondition::Number { .. } => FilterType::Number,
            FilterCondition::Date { .. } => FilterType::Date,
            FilterCondition::Select { .. } => FilterType::Select,
        }
    }

    /// Conditions without a usable value let every row through. `Select` is
    /// never inactive: its empty list is a real "exclude all".
    pub fn is_active(&self) -> bool {
        match self {
            FilterCondition::Text { value, .. } => value.as_deref().is_some_and(|v| !v.is_empty()),
            FilterCondition::Number {
                operator,
                value,
                value_to,
            } => match operator {
                RangeOperator::Between => value.is_some() && value_to.is_some(),
                _ => value.is_some(),
            },
            FilterCondition::Date {
                operator,
                value,
                value_to,
            } => {
                let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
                match operator {
                    RangeOperator::Between => present(value) && present(value_to),
                    _ => present(value),
                }
            }
            FilterCondition::Select { .. } => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterEntry {
    pub field: String,
    #[serde(flatten)]
    pub condition: FilterCondition,
}

impl FilterEntry {
    pub fn new(field: impl Into<String>, condition: FilterCondition) -> Self {
        Self {
            field: field.into(),
            condition,
        }
    }
}

/// One entry per filtered field; entries combine with logical AND.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterModel {
    entries: Vec<FilterEntry>,
}

impl FilterModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&FilterEntry> {
        self.entries.iter().find(|e| e.field == field)
    }

    /// Inserts or replaces the entry for `entry.field`.
    pub fn set(&mut self, entry: FilterEntry) -> bool {
        match self.entries.iter_mut().find(|e| e.field == entry.field) {
            Some(existing) if *existing == entry => false,
            Some(existing) => {
                *existing = entry;
                true
            }
            None => {
                self.entries.push(entry);
                true
            }
        }
    }

    pub fn remove(&mut self, field: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.field != field);
        before != self.entries.len()
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.entries.is_empty();
        self.entries.clear();
        changed
    }
}

pub fn row_passes_filters(row: &RowNode, model: &FilterModel, columns: &ColumnIndex<'_>) -> bool {
    model.entries().iter().all(|entry| {
        let value = row.value(&entry.field);
        match columns
            .behavior(&entry.field)
            .and_then(|b| b.matches(value, &entry.condition))
        {
            Some(passed) => passed,
            None => condition_matches(value, &entry.condition),
        }
    })
}

/// Default filter semantics for one cell.
pub fn condition_matches(value: Lookup<'_>, condition: &FilterCondition) -> bool {
    if !condition.is_active() {
        return true;
    }

    match condition {
        FilterCondition::Text { operator, value: needle } => {
            let needle = needle.as_deref().unwrap_or_default().to_lowercase();
            let haystack = value.display().to_lowercase();
            match operator {
                TextOperator::Contains => haystack.contains(&needle),
                TextOperator::Equals => haystack == needle,
                TextOperator::StartsWith => haystack.starts_with(&needle),
                TextOperator::EndsWith => haystack.ends_with(&needle),
            }
        }
        FilterCondition::Number {
            operator,
            value: target,
            value_to,
        } => {
            let Some(cell) = value.as_f64() else {
                return false;
            };
            let (Some(from), to) = (*target, *value_to) else {
                return true;
            };
            match_range(*operator, cell.partial_cmp(&from), to.and_then(|to| cell.partial_cmp(&to)))
        }
        FilterCondition::Date {
            operator,
            value: target,
            value_to,
        } => {
            if value.is_blank() {
                return false;
            }
            let cell = value.display();
            let from = target.as_deref().unwrap_or_default();
            let to = value_to.as_deref().map(|to| compare_dates(&cell, to));
            match_range(*operator, Some(compare_dates(&cell, from)), to)
        }
        FilterCondition::Select { values } => {
            let cell = value.display();
            values.iter().any(|allowed| *allowed == cell)
        }
    }
}

fn match_range(operator: RangeOperator, vs_from: Option<Ordering>, vs_to: Option<Ordering>) -> bool {
    match operator {
        RangeOperator::Equals => vs_from == Some(Ordering::Equal),
        RangeOperator::GreaterThan => vs_from == Some(Ordering::Greater),
        RangeOperator::LessThan => vs_from == Some(Ordering::Less),
        RangeOperator::Between => {
            matches!(vs_from, Some(Ordering::Greater | Ordering::Equal))
                && matches!(vs_to, Some(Ordering::Less | Ordering::Equal))
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Compares as dates when both sides parse, otherwise as strings.
pub fn compare_dates(left: &str, right: &str) -> Ordering {
    match (parse_date(left), parse_date(right)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => left.cmp(right),
    }
}

/// Case-insensitive substring match against any visible column.
pub fn row_passes_quick_filter(row: &RowNode, needle_lower: &str, columns: &[ColumnDef]) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    columns.iter().filter(|c| !c.hidden).any(|column| {
        row.value(&column.field)
            .value()
            .map(display_value)
            .is_some_and(|text| text.to_lowercase().contains(needle_lower))
    })
}

/// Distinct string-coerced values of `field`, in first-seen order. This is the
/// "full set" a select filter offers.
pub fn unique_values(rows: &[RowNode], field: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    rows.iter()
        .map(|row| row.value(field).display())
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
