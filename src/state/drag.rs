use crate::state::columns::ResizeSession;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDrag {
    pub field: String,
    /// Display index the drag started from.
    pub source: usize,
    pub target: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowDrag {
    pub row_id: String,
    /// Source-collection index of the dragged record.
    pub source: usize,
    pub target: usize,
}

/// Exclusive pointer capture. Only one resize or drag runs at a time.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PointerSession {
    #[default]
    Idle,
    Resizing(ResizeSession),
    DraggingColumn(ColumnDrag),
    DraggingRow(RowDrag),
}

impl PointerSession {
    pub fn is_idle(&self) -> bool {
        matches!(self, PointerSession::Idle)
    }

    pub fn take(&mut self) -> PointerSession {
        std::mem::take(self)
    }
}
