//! Headless tabular-data presentation engine: filter, sort, group and page
//! records, window them for virtual scrolling, and track selection, keyboard
//! focus, inline edits and column layout.

pub mod io;
pub mod state;
