//! Row selection and rectangular cell-range selection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Single,
    #[default]
    Multiple,
}

/// Selected row ids plus the anchor used for shift-extension.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowSelection {
    mode: SelectionMode,
    selected: BTreeSet<String>,
    anchor_index: Option<usize>,
    last_selected_index: Option<usize>,
}

impl RowSelection {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        if mode == SelectionMode::Single && self.selected.len() > 1 {
            let keep = self.selected.iter().next().cloned();
            self.selected.clear();
            self.selected.extend(keep);
        }
        true
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn anchor_index(&self) -> Option<usize> {
        self.anchor_index
    }

    pub fn last_selected_index(&self) -> Option<usize> {
        self.last_selected_index
    }

    /// Applies a click on row `id`. `displayed` is the current display order.
    ///
    /// Shift with an anchor (multiple mode) unions the inclusive index range
    /// with the existing selection, or removes it when `selected` is false.
    /// Otherwise the target's membership is set to `selected` and the anchor
    /// moves to it. In single mode a ctrl-click on the selected row clears it.
    /// Returns whether the selected set changed.
    pub fn select_row<S: AsRef<str>>(
        &mut self,
        id: &str,
        selected: bool,
        shift: bool,
        ctrl: bool,
        displayed: &[S],
    ) -> bool {
        match displayed.iter().position(|d| d.as_ref() == id) {
            Some(target) => self.select_row_at(target, selected, shift, ctrl, displayed),
            None => false,
        }
    }

    /// [`Self::select_row`] for the row at `target` in `displayed`.
    pub fn select_row_at<S: AsRef<str>>(
        &mut self,
        target: usize,
        selected: bool,
        shift: bool,
        ctrl: bool,
        displayed: &[S],
    ) -> bool {
        let Some(id) = displayed.get(target).map(AsRef::as_ref) else {
            return false;
        };
        let before = self.selected.clone();

        match self.mode {
            SelectionMode::Single => {
                let deselect = !selected || (ctrl && self.selected.contains(id));
                self.selected.clear();
                if !deselect {
                    self.selected.insert(id.to_string());
                }
                self.anchor_index = Some(target);
            }
            SelectionMode::Multiple => match self.anchor_index {
                Some(anchor) if shift && anchor < displayed.len() => {
                    let range = anchor.min(target)..=anchor.max(target);
                    for row_id in &displayed[range] {
                        if selected {
                            self.selected.insert(row_id.as_ref().to_string());
                        } else {
                            self.selected.remove(row_id.as_ref());
                        }
                    }
                }
                _ => {
                    if selected {
                        self.selected.insert(id.to_string());
                    } else {
                        self.selected.remove(id);
                    }
                    self.anchor_index = Some(target);
                }
            },
        }

        self.last_selected_index = Some(target);
        before != self.selected
    }

    pub fn select_all<S: AsRef<str>>(&mut self, displayed: &[S]) -> bool {
        let before = self.selected.len();
        match self.mode {
            SelectionMode::Single => return false,
            SelectionMode::Multiple => {
                self.selected
                    .extend(displayed.iter().map(|d| d.as_ref().to_string()));
            }
        }
        before != self.selected.len()
    }

    pub fn deselect_all<S: AsRef<str>>(&mut self, displayed: &[S]) -> bool {
        let before = self.selected.len();
        for id in displayed {
            self.selected.remove(id.as_ref());
        }
        before != self.selected.len()
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.selected.is_empty();
        self.selected.clear();
        self.anchor_index = None;
        self.last_selected_index = None;
        changed
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRef {
    pub row_id: String,
    pub field: String,
}

impl CellRef {
    pub fn new(row_id: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            field: field.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

/// Inclusive index-space rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeBounds {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl RangeBounds {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn row_count(&self) -> usize {
        self.last_row - self.first_row + 1
    }

    pub fn col_count(&self) -> usize {
        self.last_col - self.first_col + 1
    }
}

impl CellRange {
    pub fn single(cell: CellRef) -> Self {
        Self {
            start: cell.clone(),
            end: cell,
        }
    }

    /// Bounding box of start/end against the current row and column order.
    /// Recomputed on each call, so re-sorting moves the rectangle with the
    /// indices rather than the cells. `None` if an endpoint is no longer shown.
    pub fn bounds<R: AsRef<str>, C: AsRef<str>>(&self, rows: &[R], fields: &[C]) -> Option<RangeBounds> {
        let row_of = |id: &str| rows.iter().position(|r| r.as_ref() == id);
        let col_of = |field: &str| fields.iter().position(|f| f.as_ref() == field);
        let (r0, r1) = (row_of(&self.start.row_id)?, row_of(&self.end.row_id)?);
        let (c0, c1) = (col_of(&self.start.field)?, col_of(&self.end.field)?);
        Some(RangeBounds {
            first_row: r0.min(r1),
            last_row: r0.max(r1),
            first_col: c0.min(c1),
            last_col: c0.max(c1),
        })
    }
}

/// Mouse-driven range selection with an independent fill-handle rectangle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeSelection {
    range: Option<CellRange>,
    selecting: bool,
    fill: Option<CellRange>,
    filling: bool,
}

impl RangeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self) -> Option<&CellRange> {
        self.range.as_ref()
    }

    pub fn fill_range(&self) -> Option<&CellRange> {
        self.fill.as_ref()
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    pub fn is_filling(&self) -> bool {
        self.filling
    }

    pub fn mouse_down(&mut self, cell: CellRef) {
        self.range = Some(CellRange::single(cell));
        self.selecting = true;
        self.fill = None;
        self.filling = false;
    }

    /// Extends the end corner while a drag is in progress.
    pub fn mouse_enter(&mut self, cell: CellRef) -> bool {
        if self.filling {
            return match self.fill.as_mut() {
                Some(fill) if fill.end != cell => {
                    fill.end = cell;
                    true
                }
                _ => false,
            };
        }
        if !self.selecting {
            return false;
        }
        match self.range.as_mut() {
            Some(range) if range.end != cell => {
                range.end = cell;
                true
            }
            _ => false,
        }
    }

    pub fn mouse_up(&mut self) {
        self.selecting = false;
    }

    /// Starts a fill-handle drag anchored at the primary range's end corner.
    pub fn begin_fill(&mut self) -> bool {
        let Some(range) = self.range.as_ref() else {
            return false;
        };
        if self.selecting {
            return false;
        }
        self.fill = Some(CellRange::single(range.end.clone()));
        self.filling = true;
        true
    }

    /// Finishes the fill drag and hands back the fill rectangle. The primary
    /// range is left as it was.
    pub fn end_fill(&mut self) -> Option<CellRange> {
        if !self.filling {
            return None;
        }
        self.filling = false;
        self.fill.take()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
