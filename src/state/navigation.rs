use crate::state::selection::CellRef;

/// Rows moved by PageUp/PageDown.
pub const PAGE_ROWS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Tab,
    Home,
    End,
    PageUp,
    PageDown,
    Enter,
    F2,
    Escape,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub key: NavKey,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn plain(key: NavKey) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn shift(key: NavKey) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                shift: true,
                ctrl: false,
            },
        }
    }

    pub fn ctrl(key: NavKey) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                shift: false,
                ctrl: true,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavAction {
    Moved(CellRef),
    StartEdit(CellRef),
    CommitEdit,
    CancelEdit,
    Ignored,
}

/// Keyboard focus over the displayed rows and visible columns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FocusCursor {
    focus: Option<CellRef>,
}

impl FocusCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> Option<&CellRef> {
        self.focus.as_ref()
    }

    pub fn set_focus(&mut self, cell: CellRef) {
        self.focus = Some(cell);
    }

    pub fn clear(&mut self) {
        self.focus = None;
    }

    /// Resolves a key press. While `editing`, only Enter and Escape do
    /// anything and they are handed to the edit session.
    pub fn handle_key<R, C, E>(
        &mut self,
        input: KeyInput,
        rows: &[R],
        fields: &[C],
        editing: bool,
        is_editable: E,
    ) -> NavAction
    where
        R: AsRef<str>,
        C: AsRef<str>,
        E: Fn(&CellRef) -> bool,
    {
        if editing {
            return match input.key {
                NavKey::Enter => NavAction::CommitEdit,
                NavKey::Escape => NavAction::CancelEdit,
                _ => NavAction::Ignored,
            };
        }

        if rows.is_empty() || fields.is_empty() {
            return NavAction::Ignored;
        }

        let current = self.position(rows, fields);
        self.handle_key_from(current, input, rows, fields, is_editable)
    }

    /// Outside edit mode, [`Self::handle_key`] with the focused position
    /// already resolved against `rows` and `fields`.
    pub fn handle_key_from<R, C, E>(
        &mut self,
        current: Option<(usize, usize)>,
        input: KeyInput,
        rows: &[R],
        fields: &[C],
        is_editable: E,
    ) -> NavAction
    where
        R: AsRef<str>,
        C: AsRef<str>,
        E: Fn(&CellRef) -> bool,
    {
        if rows.is_empty() || fields.is_empty() {
            return NavAction::Ignored;
        }
        let current = current.filter(|&(row, col)| row < rows.len() && col < fields.len());
        match input.key {
            NavKey::Enter | NavKey::F2 => {
                let Some((row, col)) = current else {
                    return NavAction::Ignored;
                };
                let cell = cell_at(rows, fields, row, col);
                if is_editable(&cell) {
                    NavAction::StartEdit(cell)
                } else {
                    NavAction::Ignored
                }
            }
            NavKey::Escape => NavAction::Ignored,
            _ => {
                let (row, col) = match current {
                    Some(position) => step(position, input, rows.len(), fields.len()),
                    None => (0, 0),
                };
                if current == Some((row, col)) {
                    return NavAction::Ignored;
                }
                let cell = cell_at(rows, fields, row, col);
                self.focus = Some(cell.clone());
                NavAction::Moved(cell)
            }
        }
    }

    /// Index position of the focus, if its row and column are still shown.
    pub fn position<R: AsRef<str>, C: AsRef<str>>(&self, rows: &[R], fields: &[C]) -> Option<(usize, usize)> {
        let focus = self.focus.as_ref()?;
        let row = rows.iter().position(|r| r.as_ref() == focus.row_id)?;
        let col = fields.iter().position(|f| f.as_ref() == focus.field)?;
        Some((row, col))
    }
}

fn cell_at<R: AsRef<str>, C: AsRef<str>>(rows: &[R], fields: &[C], row: usize, col: usize) -> CellRef {
    CellRef::new(rows[row].as_ref(), fields[col].as_ref())
}

fn step((row, col): (usize, usize), input: KeyInput, row_count: usize, col_count: usize) -> (usize, usize) {
    let last_row = row_count - 1;
    let last_col = col_count - 1;
    let Modifiers { shift, ctrl } = input.modifiers;

    match input.key {
        NavKey::ArrowUp => (row.saturating_sub(1), col),
        NavKey::ArrowDown => ((row + 1).min(last_row), col),
        NavKey::ArrowLeft => (row, col.saturating_sub(1)),
        NavKey::ArrowRight => (row, (col + 1).min(last_col)),
        NavKey::Tab if shift => {
            if col > 0 {
                (row, col - 1)
            } else if row > 0 {
                (row - 1, last_col)
            } else {
                (row, col)
            }
        }
        NavKey::Tab => {
            if col < last_col {
                (row, col + 1)
            } else if row < last_row {
                (row + 1, 0)
            } else {
                (row, col)
            }
        }
        NavKey::Home if ctrl => (0, 0),
        NavKey::Home => (row, 0),
        NavKey::End if ctrl => (last_row, last_col),
        NavKey::End => (row, last_col),
        NavKey::PageUp => (row.saturating_sub(PAGE_ROWS), col),
        NavKey::PageDown => ((row + PAGE_ROWS).min(last_row), col),
        NavKey::Enter | NavKey::F2 | NavKey::Escape => (row, col),
    }
}
