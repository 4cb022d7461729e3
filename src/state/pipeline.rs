use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::state::columns::{ColumnDef, ColumnIndex};
use crate::state::data_model::RowNode;
use crate::state::filter::{row_passes_filters, row_passes_quick_filter, FilterModel};
use crate::state::sort::{sort_rows, SortModel};

/// Quick filter, then column filters, then sort. Pure: the output depends
/// only on the arguments.
pub fn compute(
    rows: &[RowNode],
    columns: &[ColumnDef],
    sort: &SortModel,
    filters: &FilterModel,
    quick_filter: &str,
) -> Vec<RowNode> {
    let index = ColumnIndex::new(columns);
    let needle = quick_filter.trim().to_lowercase();

    let mut out: Vec<RowNode> = rows
        .iter()
        .filter(|row| row_passes_quick_filter(row, &needle, columns))
        .filter(|row| row_passes_filters(row, filters, &index))
        .cloned()
        .collect();
    sort_rows(&mut out, sort, &index);

    trace!(input = rows.len(), output = out.len(), "pipeline computed");
    out
}

pub fn total_pages(total_rows: usize, page_size: usize) -> usize {
    total_rows.div_ceil(page_size.max(1)).max(1)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub total_pages: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    page_size: usize,
    current_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            current_page: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Sets the requested page; it is clamped on the next [`Self::clamp`].
    pub fn set_page(&mut self, page: usize) -> bool {
        let changed = self.current_page != page;
        self.current_page = page;
        changed
    }

    /// Changing the page size returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        let page_size = page_size.max(1);
        if page_size == self.page_size {
            return false;
        }
        self.page_size = page_size;
        self.current_page = 0;
        true
    }

    /// Pulls the current page back into `[0, total_pages - 1]`.
    pub fn clamp(&mut self, total_rows: usize) -> bool {
        let last = total_pages(total_rows, self.page_size) - 1;
        if self.current_page > last {
            self.current_page = last;
            true
        } else {
            false
        }
    }

    pub fn info(&self, total_rows: usize) -> PageInfo {
        PageInfo {
            current_page: self.current_page,
            page_size: self.page_size,
            total_rows,
            total_pages: total_pages(total_rows, self.page_size),
        }
    }

    pub fn page_range(&self, total_rows: usize) -> Range<usize> {
        let start = (self.current_page * self.page_size).min(total_rows);
        let end = (start + self.page_size).min(total_rows);
        start..end
    }
}

/// Clamps `pagination` to `rows` and returns the current page's slice.
pub fn paginate<'a, T>(rows: &'a [T], pagination: &mut Pagination) -> &'a [T] {
    pagination.clamp(rows.len());
    &rows[pagination.page_range(rows.len())]
}
