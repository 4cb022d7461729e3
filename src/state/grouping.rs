//! Grouping, aggregation and tree flattening.
//!
//! Groups are rebuilt wholesale on every pipeline run. Flattening turns
//! groups (or rows carrying child rows) into the display list, honouring
//! expand/collapse state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::columns::ColumnIndex;
use crate::state::data_model::{
    display_value, json_number_from_f64, resolve_path, Lookup, Record, RowIdSource, RowNode,
};

pub const GROUP_KEY_SEPARATOR: &str = "|||";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupNode {
    /// `group-` followed by the joined key.
    pub id: String,
    pub group_fields: Vec<String>,
    pub group_values: Vec<Value>,
    pub children: Vec<RowNode>,
    pub aggregated: Record,
}

impl GroupNode {
    pub fn key(&self) -> String {
        group_key(&self.group_values)
    }

    /// Value of a grouped field, else an aggregated value.
    pub fn value(&self, field: &str) -> Lookup<'_> {
        if let Some(i) = self.group_fields.iter().position(|f| f == field) {
            return Lookup::Found(&self.group_values[i]);
        }
        resolve_path(&self.aggregated, field)
    }
}

fn group_key(values: &[Value]) -> String {
    values
        .iter()
        .map(display_value)
        .collect::<Vec<_>>()
        .join(GROUP_KEY_SEPARATOR)
}

/// Partitions rows by their grouped-field key. Groups appear in first-seen
/// order and children keep their relative order.
pub fn group_rows(
    rows: &[RowNode],
    group_by: &[String],
    aggregations: &BTreeMap<String, Aggregation>,
    columns: &ColumnIndex<'_>,
) -> Vec<GroupNode> {
    let mut groups: Vec<GroupNode> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let values: Vec<Value> = group_by
            .iter()
            .map(|field| row.value(field).value().cloned().unwrap_or(Value::Null))
            .collect();
        let key = group_key(&values);
        let slot = *by_key.entry(key.clone()).or_insert_with(|| {
            groups.push(GroupNode {
                id: format!("group-{key}"),
                group_fields: group_by.to_vec(),
                group_values: values,
                children: Vec::new(),
                aggregated: Record::new(),
            });
            groups.len() - 1
        });
        groups[slot].children.push(row.clone());
    }

    for group in &mut groups {
        for (field, kind) in aggregations {
            let values: Vec<Lookup<'_>> = group.children.iter().map(|r| r.value(field)).collect();
            let value = columns
                .behavior(field)
                .and_then(|b| b.aggregate(&values))
                .unwrap_or_else(|| aggregate(*kind, &values));
            group.aggregated.insert(field.clone(), value);
        }
    }

    groups
}

pub fn aggregate(kind: Aggregation, values: &[Lookup<'_>]) -> Value {
    if kind == Aggregation::Count {
        return Value::from(values.len());
    }

    let nums: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
    let result = match kind {
        Aggregation::Sum => Some(nums.iter().sum()),
        Aggregation::Avg if nums.is_empty() => Some(0.0),
        Aggregation::Avg => Some(nums.iter().sum::<f64>() / nums.len() as f64),
        Aggregation::Min => nums.iter().copied().reduce(f64::min),
        Aggregation::Max => nums.iter().copied().reduce(f64::max),
        Aggregation::Count => None,
    };
    result
        .and_then(json_number_from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Expanded group ids. Until the first explicit toggle an empty set means
/// every group is expanded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupExpansion {
    expanded: HashSet<String>,
    touched: bool,
}

impl GroupExpansion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, group_id: &str) -> bool {
        if !self.touched && self.expanded.is_empty() {
            return true;
        }
        self.expanded.contains(group_id)
    }

    pub fn toggle(&mut self, group_id: &str) -> bool {
        self.touched = true;
        if !self.expanded.remove(group_id) {
            self.expanded.insert(group_id.to_string());
        }
        self.expanded.contains(group_id)
    }

    pub fn set_expanded(&mut self, group_id: &str, expanded: bool) {
        self.touched = true;
        if expanded {
            self.expanded.insert(group_id.to_string());
        } else {
            self.expanded.remove(group_id);
        }
    }

    /// Back to the first-render state where everything is expanded.
    pub fn reset(&mut self) {
        self.expanded.clear();
        self.touched = false;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupRow {
    pub node: Arc<GroupNode>,
    pub row_index: usize,
    pub expanded: bool,
}

/// One entry of the flattened display list.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayRow {
    Data(RowNode),
    Group(GroupRow),
}

impl DisplayRow {
    pub fn id(&self) -> &str {
        match self {
            DisplayRow::Data(row) => &row.id,
            DisplayRow::Group(group) => &group.node.id,
        }
    }

    pub fn row_index(&self) -> usize {
        match self {
            DisplayRow::Data(row) => row.row_index,
            DisplayRow::Group(group) => group.row_index,
        }
    }

    pub fn level(&self) -> usize {
        match self {
            DisplayRow::Data(row) => row.level,
            DisplayRow::Group(_) => 0,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, DisplayRow::Group(_))
    }

    pub fn as_data(&self) -> Option<&RowNode> {
        match self {
            DisplayRow::Data(row) => Some(row),
            DisplayRow::Group(_) => None,
        }
    }

    pub fn value(&self, field: &str) -> Lookup<'_> {
        match self {
            DisplayRow::Data(row) => row.value(field),
            DisplayRow::Group(group) => group.node.value(field),
        }
    }
}

/// Emits each group row followed, when expanded, by its children at level 1.
pub fn flatten_groups(groups: Vec<GroupNode>, expansion: &GroupExpansion) -> Vec<DisplayRow> {
    let mut out = Vec::new();
    for group in groups {
        let expanded = expansion.is_expanded(&group.id);
        let node = Arc::new(group);
        out.push(DisplayRow::Group(GroupRow {
            node: Arc::clone(&node),
            row_index: out.len(),
            expanded,
        }));
        if expanded {
            for child in &node.children {
                let mut child = child.clone();
                child.level = 1;
                child.parent_id = Some(node.id.clone());
                child.row_index = out.len();
                out.push(DisplayRow::Data(child));
            }
        }
    }
    out
}

/// Emits each row then, if its id is expanded, its child rows directly after.
/// `row_index` is renumbered to the display position.
pub fn flatten_tree(rows: Vec<RowNode>, expanded_rows: &HashSet<String>) -> Vec<DisplayRow> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        push_tree_row(row, expanded_rows, &mut out);
    }
    out
}

fn push_tree_row(mut row: RowNode, expanded_rows: &HashSet<String>, out: &mut Vec<DisplayRow>) {
    let children = if expanded_rows.contains(&row.id) {
        std::mem::take(&mut row.child_rows)
    } else {
        Vec::new()
    };
    let (id, level) = (row.id.clone(), row.level);
    row.row_index = out.len();
    out.push(DisplayRow::Data(row));

    for mut child in children {
        child.level = level + 1;
        child.parent_id = Some(id.clone());
        push_tree_row(child, expanded_rows, out);
    }
}

/// Builds child row nodes for a parent from host records. Children without
/// an extracted id get `{parent}-child-{i}`.
pub fn child_nodes(parent: &RowNode, records: &[Arc<Record>], ids: &RowIdSource) -> Vec<RowNode> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let id = match ids {
                RowIdSource::Positional => format!("{}-child-{i}", parent.id),
                _ => ids.id_for(record, i),
            };
            let mut node = RowNode::new(id, Arc::clone(record), i);
            node.level = parent.level + 1;
            node.parent_id = Some(parent.id.clone());
            node
        })
        .collect()
}

/// Indices where `field` differs from the previous row's value. The row list
/// itself is unchanged; these mark where a divider is drawn.
pub fn split_points(rows: &[DisplayRow], field: &str) -> Vec<usize> {
    rows.windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0].value(field) != pair[1].value(field))
        .map(|(i, _)| i + 1)
        .collect()
}
