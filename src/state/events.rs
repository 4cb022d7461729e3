use serde_json::Value;

use crate::state::filter::FilterModel;
use crate::state::pipeline::PageInfo;
use crate::state::sort::SortModel;

/// Notifications for the rendering/host layer, drained after each call.
#[derive(Clone, Debug, PartialEq)]
pub enum GridEvent {
    SelectionChanged { selected: Vec<String> },
    SortChanged(SortModel),
    FilterChanged(FilterModel),
    CellValueChanged {
        row_id: String,
        field: String,
        old_value: Value,
        new_value: Value,
    },
    ColumnResized { field: String, width: f64, finished: bool },
    ColumnMoved { field: String, from: usize, to: usize },
    RowDragStart { row_id: String, index: usize },
    RowDragMove { row_id: String, index: usize },
    RowDragEnd { row_id: String, from: usize, to: usize },
    PaginationChanged(PageInfo),
}

#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<GridEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: GridEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
