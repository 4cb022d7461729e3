//! Inline edit session: `Idle → Editing → (Committing | Cancelling) → Idle`.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::state::behavior::ColumnBehavior;
use crate::state::data_model::Lookup;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditPhase {
    #[default]
    Idle,
    Editing,
    Committing,
    Cancelling,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EditingCell {
    pub row_id: String,
    pub field: String,
    pub value: Value,
    pub original_value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CellChange {
    pub row_id: String,
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("no edit session is active")]
    NoSession,
    #[error("edit of '{field}' rejected: {reason}")]
    Rejected { field: String, reason: String },
    #[error("row '{row_id}' is no longer in the data set")]
    RowMissing { row_id: String },
    #[error("cannot write '{field}' into row '{row_id}'")]
    PathConflict { row_id: String, field: String },
}

/// At most one cell is edited at a time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditSession {
    phase: EditPhase,
    cell: Option<EditingCell>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> EditPhase {
        self.phase
    }

    pub fn is_editing(&self) -> bool {
        self.phase != EditPhase::Idle
    }

    pub fn cell(&self) -> Option<&EditingCell> {
        self.cell.as_ref()
    }

    /// No-op unless idle and the column is editable.
    pub fn start(&mut self, row_id: &str, field: &str, editable: bool, current: Lookup<'_>) -> bool {
        if !editable || self.is_editing() {
            return false;
        }
        let original = current.value().cloned().unwrap_or(Value::Null);
        self.cell = Some(EditingCell {
            row_id: row_id.to_string(),
            field: field.to_string(),
            value: original.clone(),
            original_value: original,
        });
        self.phase = EditPhase::Editing;
        debug!(row_id, field, "edit started");
        true
    }

    pub fn set_value(&mut self, value: Value) -> bool {
        match (self.phase, self.cell.as_mut()) {
            (EditPhase::Editing, Some(cell)) => {
                cell.value = value;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) -> Result<EditingCell, EditError> {
        if self.phase != EditPhase::Editing {
            return Err(EditError::NoSession);
        }
        self.phase = EditPhase::Cancelling;
        let cell = self.cell.take().ok_or(EditError::NoSession)?;
        self.phase = EditPhase::Idle;
        debug!(row_id = %cell.row_id, field = %cell.field, "edit cancelled");
        Ok(cell)
    }

    /// Validates then hands the change to `write`. A validator rejection or a
    /// failed write leaves the session in `Editing` with nothing written.
    /// Returns `None` when the value did not change.
    pub fn commit<W>(&mut self, behavior: Option<&dyn ColumnBehavior>, write: W) -> Result<Option<CellChange>, EditError>
    where
        W: FnOnce(&CellChange) -> Result<(), EditError>,
    {
        let Some(cell) = self.cell.as_ref().filter(|_| self.phase == EditPhase::Editing) else {
            return Err(EditError::NoSession);
        };
        self.phase = EditPhase::Committing;

        if cell.value == cell.original_value {
            self.cell = None;
            self.phase = EditPhase::Idle;
            return Ok(None);
        }

        if let Some(behavior) = behavior {
            if let Err(reason) = behavior.validate(&cell.original_value, &cell.value) {
                debug!(row_id = %cell.row_id, field = %cell.field, %reason, "edit rejected");
                let field = cell.field.clone();
                self.phase = EditPhase::Editing;
                return Err(EditError::Rejected { field, reason });
            }
        }

        let change = CellChange {
            row_id: cell.row_id.clone(),
            field: cell.field.clone(),
            old_value: cell.original_value.clone(),
            new_value: cell.value.clone(),
        };
        if let Err(err) = write(&change) {
            self.phase = EditPhase::Editing;
            return Err(err);
        }

        self.cell = None;
        self.phase = EditPhase::Idle;
        debug!(row_id = %change.row_id, field = %change.field, "edit committed");
        Ok(Some(change))
    }

    pub fn stop<W>(
        &mut self,
        cancel: bool,
        behavior: Option<&dyn ColumnBehavior>,
        write: W,
    ) -> Result<Option<CellChange>, EditError>
    where
        W: FnOnce(&CellChange) -> Result<(), EditError>,
    {
        if cancel {
            self.cancel().map(|_| None)
        } else {
            self.commit(behavior, write)
        }
    }
}
