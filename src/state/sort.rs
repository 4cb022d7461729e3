use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::state::columns::ColumnIndex;
use crate::state::data_model::{display_value, Lookup, RowNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Ordered sort keys; the first entry is the primary key. A field appears at
/// most once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortModel {
    keys: Vec<SortKey>,
}

impl SortModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys(keys: Vec<SortKey>) -> Self {
        let mut model = Self::default();
        for key in keys {
            model.set(key.field, Some(key.direction));
        }
        model
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn direction_of(&self, field: &str) -> Option<SortDirection> {
        self.keys.iter().find(|k| k.field == field).map(|k| k.direction)
    }

    pub fn priority_of(&self, field: &str) -> Option<usize> {
        self.keys.iter().position(|k| k.field == field)
    }

    /// Sets or clears the direction of `field`, keeping its priority if it
    /// was already sorted and appending it otherwise.
    pub fn set(&mut self, field: String, direction: Option<SortDirection>) -> bool {
        let position = self.priority_of(&field);
        match (position, direction) {
            (Some(i), Some(direction)) => {
                let changed = self.keys[i].direction != direction;
                self.keys[i].direction = direction;
                changed
            }
            (Some(i), None) => {
                self.keys.remove(i);
                true
            }
            (None, Some(direction)) => {
                self.keys.push(SortKey { field, direction });
                true
            }
            (None, None) => false,
        }
    }

    /// Cycles `none → asc → desc → none`. Without `additive` the other keys
    /// are dropped so the field becomes the only sort key.
    pub fn toggle(&mut self, field: &str, additive: bool) -> Option<SortDirection> {
        let next = match self.direction_of(field) {
            None => Some(SortDirection::Asc),
            Some(SortDirection::Asc) => Some(SortDirection::Desc),
            Some(SortDirection::Desc) => None,
        };
        if !additive {
            self.keys.retain(|k| k.field == field);
        }
        self.set(field.to_string(), next);
        next
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.keys.is_empty();
        self.keys.clear();
        changed
    }
}

/// Stable multi-key sort. Column comparators take precedence over the
/// default; a comparator that declines (`None`) falls back to it.
pub fn sort_rows(rows: &mut [RowNode], model: &SortModel, columns: &ColumnIndex<'_>) {
    if model.is_empty() {
        return;
    }
    rows.sort_by(|a, b| compare_rows(a, b, model, columns));
}

pub fn compare_rows(a: &RowNode, b: &RowNode, model: &SortModel, columns: &ColumnIndex<'_>) -> Ordering {
    for key in model.keys() {
        let left = a.value(&key.field);
        let right = b.value(&key.field);
        let ordering = columns
            .behavior(&key.field)
            .and_then(|behavior| behavior.compare(left, right))
            .unwrap_or_else(|| compare_values(left, right));
        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Default comparator: missing/null first, then numbers numerically, then
/// everything else by display string. Ranking the kinds first keeps mixed
/// columns totally ordered.
pub fn compare_values(a: Lookup<'_>, b: Lookup<'_>) -> Ordering {
    let (left, right) = (a.value(), b.value());
    value_rank(left).cmp(&value_rank(right)).then_with(|| match (left, right) {
        (Some(Value::Number(left)), Some(Value::Number(right))) => compare_numbers(left, right),
        (Some(left), Some(right)) if !left.is_null() => compare_text(&display_value(left), &display_value(right)),
        _ => Ordering::Equal,
    })
}

fn value_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(_) => 2,
    }
}

fn compare_text(left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}

fn compare_numbers(left: &Number, right: &Number) -> Ordering {
    match (left.as_i64(), left.as_u64(), right.as_i64(), right.as_u64()) {
        (Some(a), _, Some(b), _) => a.cmp(&b),
        (Some(a), _, _, Some(b)) => {
            if a < 0 {
                Ordering::Less
            } else {
                (a as u64).cmp(&b)
            }
        }
        (_, Some(a), Some(b), _) => {
            if b < 0 {
                Ordering::Greater
            } else {
                a.cmp(&(b as u64))
            }
        }
        (_, Some(a), _, Some(b)) => a.cmp(&b),
        _ => {
            let left = left.as_f64().unwrap_or(f64::NAN);
            let right = right.as_f64().unwrap_or(f64::NAN);
            left.partial_cmp(&right).unwrap_or(Ordering::Equal)
        }
    }
}
