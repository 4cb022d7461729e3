use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::behavior::{Behavior, ColumnBehavior};
use crate::state::data_model::Lookup;
use crate::state::filter::FilterType;

pub const DEFAULT_WIDTH: f64 = 150.0;
pub const DEFAULT_MIN_WIDTH: f64 = 50.0;
const HEADER_CHAR_WIDTH: f64 = 8.0;
const HEADER_PADDING: f64 = 32.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pin {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PinBucket {
    Left,
    Center,
    Right,
}

impl From<Option<Pin>> for PinBucket {
    fn from(pin: Option<Pin>) -> Self {
        match pin {
            Some(Pin::Left) => PinBucket::Left,
            None => PinBucket::Center,
            Some(Pin::Right) => PinBucket::Right,
        }
    }
}

/// Host-supplied column definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnDef {
    /// Dot-notation path into the record.
    pub field: String,
    pub header_name: Option<String>,
    pub width: f64,
    pub min_width: f64,
    pub max_width: Option<f64>,
    pub sortable: bool,
    pub filterable: bool,
    pub editable: bool,
    pub resizable: bool,
    pub draggable: bool,
    pub pinned: Option<Pin>,
    pub hidden: bool,
    pub filter_type: FilterType,
    #[serde(skip)]
    pub behavior: Option<Behavior>,
}

impl Default for ColumnDef {
    fn default() -> Self {
        Self {
            field: String::new(),
            header_name: None,
            width: DEFAULT_WIDTH,
            min_width: DEFAULT_MIN_WIDTH,
            max_width: None,
            sortable: true,
            filterable: true,
            editable: false,
            resizable: true,
            draggable: true,
            pinned: None,
            hidden: false,
            filter_type: FilterType::Text,
            behavior: None,
        }
    }
}

impl ColumnDef {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header_name = Some(header.into());
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn min_width(mut self, min_width: f64) -> Self {
        self.min_width = min_width;
        self
    }

    pub fn max_width(mut self, max_width: f64) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn pinned(mut self, pin: Option<Pin>) -> Self {
        self.pinned = pin;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn filter_type(mut self, filter_type: FilterType) -> Self {
        self.filter_type = filter_type;
        self
    }

    pub fn behavior<B: ColumnBehavior + 'static>(mut self, behavior: B) -> Self {
        self.behavior = Some(Behavior::new(behavior));
        self
    }

    pub fn header_label(&self) -> &str {
        self.header_name.as_deref().unwrap_or(&self.field)
    }

    pub fn behavior_ref(&self) -> Option<&dyn ColumnBehavior> {
        self.behavior.as_ref().map(Behavior::get)
    }

    pub fn clamp_width(&self, width: f64) -> f64 {
        let max = self.max_width.unwrap_or(f64::INFINITY).max(self.min_width);
        width.clamp(self.min_width, max)
    }

    /// Cell text as the column presents it: the formatter if one is set,
    /// otherwise the plain JSON display form.
    pub fn format(&self, value: Lookup<'_>) -> String {
        self.behavior_ref()
            .and_then(|b| b.format(value))
            .unwrap_or_else(|| value.display())
    }

    pub fn bucket(&self) -> PinBucket {
        PinBucket::from(self.pinned)
    }
}

/// Field → definition index for pipeline stages that look columns up by field.
pub struct ColumnIndex<'a> {
    by_field: HashMap<&'a str, &'a ColumnDef>,
}

impl<'a> ColumnIndex<'a> {
    pub fn new(columns: &'a [ColumnDef]) -> Self {
        Self {
            by_field: columns.iter().map(|c| (c.field.as_str(), c)).collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&'a ColumnDef> {
        self.by_field.get(field).copied()
    }

    pub fn behavior(&self, field: &str) -> Option<&'a dyn ColumnBehavior> {
        self.get(field).and_then(ColumnDef::behavior_ref)
    }
}

#[derive(Clone, Debug)]
pub struct ProcessedColumn {
    pub def: ColumnDef,
    pub computed_width: f64,
    pub left: f64,
    pub index: usize,
}

impl ProcessedColumn {
    pub fn field(&self) -> &str {
        &self.def.field
    }

    pub fn right(&self) -> f64 {
        self.left + self.computed_width
    }
}

/// Column geometry: visible columns ordered left-pinned, center, right-pinned.
#[derive(Clone, Debug, Default)]
pub struct ColumnLayout {
    pub columns: Vec<ProcessedColumn>,
    pub left_width: f64,
    pub center_width: f64,
    pub right_width: f64,
}

impl ColumnLayout {
    pub fn total_width(&self) -> f64 {
        self.left_width + self.center_width + self.right_width
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.field() == field)
    }

    pub fn get(&self, field: &str) -> Option<&ProcessedColumn> {
        self.columns.iter().find(|c| c.field() == field)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.columns.iter().map(ProcessedColumn::field).collect()
    }

    /// Column whose horizontal span contains `x`.
    pub fn column_at(&self, x: f64) -> Option<&ProcessedColumn> {
        self.columns.iter().find(|c| x >= c.left && x < c.right())
    }
}

pub fn layout_columns(defs: &[ColumnDef]) -> ColumnLayout {
    let mut visible: Vec<&ColumnDef> = defs.iter().filter(|c| !c.hidden).collect();
    visible.sort_by_key(|c| c.bucket());

    let mut layout = ColumnLayout::default();
    let mut left = 0.0;
    for (index, def) in visible.into_iter().enumerate() {
        let width = def.width;
        match def.bucket() {
            PinBucket::Left => layout.left_width += width,
            PinBucket::Center => layout.center_width += width,
            PinBucket::Right => layout.right_width += width,
        }
        layout.columns.push(ProcessedColumn {
            def: def.clone(),
            computed_width: width,
            left,
            index,
        });
        left += width;
    }
    layout
}

/// Approximate header width used by auto-size when no header measurement exists.
pub fn approx_header_width(def: &ColumnDef) -> f64 {
    def.header_label().chars().count() as f64 * HEADER_CHAR_WIDTH + HEADER_PADDING
}

/// Target width for a double-click auto-size given the measured content width.
pub fn autosize_width(def: &ColumnDef, measured_content_width: f64) -> f64 {
    let desired = measured_content_width.max(approx_header_width(def));
    let max = def.max_width.unwrap_or(f64::INFINITY);
    def.min_width.max(max.min(desired))
}

/// An in-progress column resize. Width follows the pointer continuously.
#[derive(Clone, Debug, PartialEq)]
pub struct ResizeSession {
    pub field: String,
    pub start_x: f64,
    pub start_width: f64,
    min_width: f64,
    max_width: f64,
}

impl ResizeSession {
    pub fn begin(def: &ColumnDef, pointer_x: f64) -> Self {
        Self {
            field: def.field.clone(),
            start_x: pointer_x,
            start_width: def.width,
            min_width: def.min_width,
            max_width: def.max_width.unwrap_or(f64::INFINITY).max(def.min_width),
        }
    }

    pub fn width_at(&self, pointer_x: f64) -> f64 {
        (self.start_width + (pointer_x - self.start_x)).clamp(self.min_width, self.max_width)
    }
}

/// Splice-moves one element from `from` to `to`. Same or out-of-range
/// indices are a no-op.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from == to || from >= items.len() || to >= items.len() {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}
