use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::state::columns::{self, layout_columns, ColumnDef, ColumnIndex, ColumnLayout, Pin, ResizeSession};
use crate::state::data_model::{self, Record, RowIdSource, RowNode};
use crate::state::drag::{ColumnDrag, PointerSession, RowDrag};
use crate::state::editing::{CellChange, EditError, EditSession};
use crate::state::events::{EventQueue, GridEvent};
use crate::state::export::{export_rows, ExportTable};
use crate::state::filter::{FilterEntry, FilterModel};
use crate::state::grouping::{self, DisplayRow, GroupExpansion};
use crate::state::navigation::{FocusCursor, KeyInput, NavAction};
use crate::state::options::{GridConfig, GridOptions};
use crate::state::pipeline::{self, PageInfo, Pagination};
use crate::state::selection::{CellRange, CellRef, RangeBounds, RangeSelection, RowSelection, SelectionMode};
use crate::state::server::{PageRequest, PageResponse, PendingRequest, ServerPaging};
use crate::state::sort::SortModel;
use crate::state::viewport::{compute_window, ScrollSampler, ViewportMetrics, VirtualWindow};

/// Input revisions; the cached view is reused while they are unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Revisions {
    data: u64,
    columns: u64,
    sort: u64,
    filter: u64,
    quick_filter: u64,
    grouping: u64,
    expansion: u64,
}

#[derive(Debug)]
struct View {
    key: Revisions,
    rows: Vec<DisplayRow>,
    split_points: Vec<usize>,
    page: Option<PageIds>,
}

/// Ids of the current page, kept until the view or the page range changes.
/// `all` includes group rows; `rows` holds data rows only.
#[derive(Debug)]
struct PageIds {
    range: Range<usize>,
    all: Vec<String>,
    all_positions: HashMap<String, usize>,
    rows: Vec<String>,
    row_positions: HashMap<String, usize>,
}

impl PageIds {
    fn new(range: Range<usize>, page: &[DisplayRow]) -> Self {
        let all: Vec<String> = page.iter().map(|r| r.id().to_string()).collect();
        let rows: Vec<String> = page
            .iter()
            .filter(|r| !r.is_group())
            .map(|r| r.id().to_string())
            .collect();
        Self {
            range,
            all_positions: positions(&all),
            row_positions: positions(&rows),
            all,
            rows,
        }
    }
}

fn positions(ids: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        map.entry(id.clone()).or_insert(i);
    }
    map
}

fn page_ids(view: &Option<View>) -> Option<&PageIds> {
    view.as_ref()?.page.as_ref()
}

/// Where a row id's record lives.
#[derive(Clone, Debug)]
enum RecordSlot {
    Root(usize),
    Child { parent: String, index: usize },
}

/// Owns every piece of grid state and re-runs the pipeline when an input changes.
#[derive(Debug)]
pub struct GridState {
    options: GridOptions,
    columns: Vec<ColumnDef>,
    records: Vec<Arc<Record>>,
    ids: RowIdSource,
    child_records: HashMap<String, Vec<Arc<Record>>>,
    sort: SortModel,
    filters: FilterModel,
    quick_filter: String,
    pagination: Pagination,
    group_expansion: GroupExpansion,
    expanded_rows: HashSet<String>,
    selection: RowSelection,
    ranges: RangeSelection,
    focus: FocusCursor,
    edit: EditSession,
    pointer: PointerSession,
    scroll: ScrollSampler,
    scroll_top: f64,
    container_height: f64,
    server: ServerPaging,
    server_total_rows: Option<usize>,
    events: EventQueue,
    revisions: Revisions,
    nodes: Option<(u64, Vec<RowNode>)>,
    view: Option<View>,
    record_index: HashMap<String, RecordSlot>,
}

impl Default for GridState {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

impl GridState {
    pub fn new(config: GridConfig) -> Self {
        let GridConfig { options, columns } = config;
        Self {
            ids: options.id_source(),
            pagination: Pagination::new(options.page_size),
            selection: RowSelection::new(options.selection_mode),
            scroll: ScrollSampler::new(options.scroll_interval()),
            options,
            columns,
            records: Vec::new(),
            child_records: HashMap::new(),
            sort: SortModel::default(),
            filters: FilterModel::default(),
            quick_filter: String::new(),
            group_expansion: GroupExpansion::default(),
            expanded_rows: HashSet::new(),
            ranges: RangeSelection::default(),
            focus: FocusCursor::default(),
            edit: EditSession::default(),
            pointer: PointerSession::default(),
            scroll_top: 0.0,
            container_height: 0.0,
            server: ServerPaging::default(),
            server_total_rows: None,
            events: EventQueue::default(),
            revisions: Revisions::default(),
            nodes: None,
            view: None,
            record_index: HashMap::new(),
        }
    }

    pub fn from_records(config: GridConfig, records: Vec<Record>) -> Self {
        let mut state = Self::new(config);
        state.set_records(records);
        state
    }

    pub fn with_id_source(mut self, ids: RowIdSource) -> Self {
        self.ids = ids;
        self.data_changed();
        self
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        self.events.drain()
    }

    // Data

    pub fn records(&self) -> &[Arc<Record>] {
        &self.records
    }

    pub fn set_records(&mut self, records: Vec<Record>) {
        self.records = records.into_iter().map(Arc::new).collect();
        self.data_changed();
    }

    pub fn record(&self, row_id: &str) -> Option<&Arc<Record>> {
        match self.locate(row_id)? {
            RecordSlot::Root(index) => self.records.get(index),
            RecordSlot::Child { parent, index } => self.child_records.get(&parent)?.get(index),
        }
    }

    /// Bumps the data revision and rebuilds the id to record index.
    fn data_changed(&mut self) {
        self.revisions.data += 1;
        self.record_index = index_records(&self.records, &self.child_records, &self.ids);
    }

    pub fn set_child_rows(&mut self, parent_id: &str, children: Vec<Record>) {
        self.child_records
            .insert(parent_id.to_string(), children.into_iter().map(Arc::new).collect());
        self.data_changed();
    }

    pub fn is_row_expanded(&self, row_id: &str) -> bool {
        self.expanded_rows.contains(row_id)
    }

    pub fn toggle_row_expanded(&mut self, row_id: &str) -> bool {
        if !self.expanded_rows.remove(row_id) {
            self.expanded_rows.insert(row_id.to_string());
        }
        self.revisions.expansion += 1;
        self.expanded_rows.contains(row_id)
    }

    // Columns

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnDef>) {
        self.columns = columns;
        self.revisions.columns += 1;
    }

    pub fn column(&self, field: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.field == field)
    }

    fn column_mut(&mut self, field: &str) -> Option<&mut ColumnDef> {
        self.columns.iter_mut().find(|c| c.field == field)
    }

    pub fn layout(&self) -> ColumnLayout {
        layout_columns(&self.columns)
    }

    pub fn set_column_hidden(&mut self, field: &str, hidden: bool) -> bool {
        match self.column_mut(field) {
            Some(column) if column.hidden != hidden => {
                column.hidden = hidden;
                self.revisions.columns += 1;
                true
            }
            _ => false,
        }
    }

    pub fn set_column_pinned(&mut self, field: &str, pin: Option<Pin>) -> bool {
        match self.column_mut(field) {
            Some(column) if column.pinned != pin => {
                column.pinned = pin;
                true
            }
            _ => false,
        }
    }

    pub fn begin_resize(&mut self, field: &str, pointer_x: f64) -> bool {
        if !self.pointer.is_idle() {
            return false;
        }
        let Some(column) = self.column(field).filter(|c| c.resizable) else {
            return false;
        };
        self.pointer = PointerSession::Resizing(ResizeSession::begin(column, pointer_x));
        true
    }

    /// Applies the live width for the current pointer position.
    pub fn update_resize(&mut self, pointer_x: f64) -> Option<f64> {
        let PointerSession::Resizing(session) = &self.pointer else {
            return None;
        };
        let width = session.width_at(pointer_x);
        let field = session.field.clone();
        self.apply_width(&field, width, false);
        Some(width)
    }

    pub fn end_resize(&mut self) -> bool {
        if !matches!(self.pointer, PointerSession::Resizing(_)) {
            return false;
        }
        let PointerSession::Resizing(session) = self.pointer.take() else {
            return false;
        };
        let width = self.column(&session.field).map(|c| c.width).unwrap_or(session.start_width);
        debug!(field = %session.field, width, "column resize finished");
        self.events.push(GridEvent::ColumnResized {
            field: session.field,
            width,
            finished: true,
        });
        true
    }

    /// Double-click auto-size from a measured content width.
    pub fn autosize_column(&mut self, field: &str, measured_content_width: f64) -> bool {
        let Some(column) = self.column(field).filter(|c| c.resizable) else {
            return false;
        };
        let width = columns::autosize_width(column, measured_content_width);
        self.apply_width(field, width, true)
    }

    fn apply_width(&mut self, field: &str, width: f64, finished: bool) -> bool {
        let Some(column) = self.column_mut(field) else {
            return false;
        };
        if column.width == width {
            return false;
        }
        column.width = width;
        self.events.push(GridEvent::ColumnResized {
            field: field.to_string(),
            width,
            finished,
        });
        true
    }

    /// Moves the column at display index `from` to display index `to`.
    /// Pin buckets are reapplied by layout, so a pinned column stays pinned.
    pub fn move_column(&mut self, from: usize, to: usize) -> bool {
        let layout = self.layout();
        let (Some(source), Some(target)) = (layout.columns.get(from), layout.columns.get(to)) else {
            return false;
        };
        if from == to || !source.def.draggable {
            return false;
        }
        let field = source.def.field.clone();
        let Some(def_from) = self.columns.iter().position(|c| c.field == field) else {
            return false;
        };
        let Some(def_to) = self.columns.iter().position(|c| c.field == target.def.field) else {
            return false;
        };
        if !columns::move_item(&mut self.columns, def_from, def_to) {
            return false;
        }
        debug!(%field, from, to, "column moved");
        self.events.push(GridEvent::ColumnMoved { field, from, to });
        true
    }

    pub fn begin_column_drag(&mut self, from: usize) -> bool {
        if !self.pointer.is_idle() {
            return false;
        }
        let layout = self.layout();
        let Some(column) = layout.columns.get(from).filter(|c| c.def.draggable) else {
            return false;
        };
        self.pointer = PointerSession::DraggingColumn(ColumnDrag {
            field: column.def.field.clone(),
            source: from,
            target: from,
        });
        true
    }

    pub fn update_column_drag(&mut self, over: usize) -> bool {
        let count = self.layout().len();
        match &mut self.pointer {
            PointerSession::DraggingColumn(drag) if over < count && drag.target != over => {
                drag.target = over;
                true
            }
            _ => false,
        }
    }

    pub fn end_column_drag(&mut self) -> bool {
        if !matches!(self.pointer, PointerSession::DraggingColumn(_)) {
            return false;
        }
        let PointerSession::DraggingColumn(drag) = self.pointer.take() else {
            return false;
        };
        self.move_column(drag.source, drag.target)
    }

    // Sort / filter

    pub fn sort_model(&self) -> &SortModel {
        &self.sort
    }

    pub fn set_sort_model(&mut self, model: SortModel) -> bool {
        if model == self.sort {
            return false;
        }
        self.sort = model;
        self.sort_changed();
        true
    }

    /// Header click: cycles the field's direction. `additive` keeps other keys.
    pub fn toggle_sort(&mut self, field: &str, additive: bool) -> bool {
        if !self.column(field).is_some_and(|c| c.sortable) {
            return false;
        }
        self.sort.toggle(field, additive);
        self.sort_changed();
        true
    }

    fn sort_changed(&mut self) {
        self.revisions.sort += 1;
        self.events.push(GridEvent::SortChanged(self.sort.clone()));
    }

    pub fn filter_model(&self) -> &FilterModel {
        &self.filters
    }

    pub fn set_filter(&mut self, entry: FilterEntry) -> bool {
        if !self.column(&entry.field).is_some_and(|c| c.filterable) {
            return false;
        }
        let changed = self.filters.set(entry);
        if changed {
            self.filter_changed();
        }
        changed
    }

    pub fn remove_filter(&mut self, field: &str) -> bool {
        let changed = self.filters.remove(field);
        if changed {
            self.filter_changed();
        }
        changed
    }

    pub fn set_filter_model(&mut self, model: FilterModel) -> bool {
        if model == self.filters {
            return false;
        }
        self.filters = model;
        self.filter_changed();
        true
    }

    pub fn clear_filters(&mut self) -> bool {
        let changed = self.filters.clear();
        if changed {
            self.filter_changed();
        }
        changed
    }

    fn filter_changed(&mut self) {
        self.revisions.filter += 1;
        self.events.push(GridEvent::FilterChanged(self.filters.clone()));
    }

    pub fn quick_filter(&self) -> &str {
        &self.quick_filter
    }

    pub fn set_quick_filter(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text == self.quick_filter {
            return false;
        }
        self.quick_filter = text.to_string();
        self.revisions.quick_filter += 1;
        self.events.push(GridEvent::FilterChanged(self.filters.clone()));
        true
    }

    // Grouping

    pub fn set_group_by(&mut self, fields: Vec<String>) -> bool {
        if fields == self.options.group_by {
            return false;
        }
        self.options.group_by = fields;
        self.group_expansion.reset();
        self.revisions.grouping += 1;
        true
    }

    pub fn toggle_group(&mut self, group_id: &str) -> bool {
        let expanded = self.group_expansion.toggle(group_id);
        self.revisions.expansion += 1;
        expanded
    }

    pub fn is_group_expanded(&self, group_id: &str) -> bool {
        self.group_expansion.is_expanded(group_id)
    }

    // Pipeline output

    fn refresh_view(&mut self) {
        let key = self.revisions;
        if self.view.as_ref().is_some_and(|view| view.key == key) {
            return;
        }

        if self.nodes.as_ref().map(|(rev, _)| *rev) != Some(key.data) {
            let nodes = self.ingest_nodes();
            self.nodes = Some((key.data, nodes));
        }
        let nodes = self.nodes.as_ref().map(|(_, nodes)| nodes.as_slice()).unwrap_or_default();

        let filtered = pipeline::compute(nodes, &self.columns, &self.sort, &self.filters, &self.quick_filter);
        let rows = if self.options.group_by.is_empty() {
            grouping::flatten_tree(filtered, &self.expanded_rows)
        } else {
            let index = ColumnIndex::new(&self.columns);
            let groups = grouping::group_rows(&filtered, &self.options.group_by, &self.options.aggregations, &index);
            grouping::flatten_groups(groups, &self.group_expansion)
        };
        let split_points = match &self.options.split_by_field {
            Some(field) if self.options.group_by.is_empty() => grouping::split_points(&rows, field),
            _ => Vec::new(),
        };
        trace!(rows = rows.len(), "view rebuilt");

        let total = self.server_total_rows.unwrap_or(rows.len());
        if self.options.pagination && self.pagination.clamp(total) {
            self.events.push(GridEvent::PaginationChanged(self.pagination.info(total)));
        }

        self.view = Some(View {
            key,
            rows,
            split_points,
            page: None,
        });
    }

    /// Refreshes the view and the cached ids of the current page.
    fn refresh_page_ids(&mut self) {
        self.refresh_view();
        let range = self.page_range(self.view_rows().len());
        let Some(view) = self.view.as_mut() else {
            return;
        };
        if view.page.as_ref().is_some_and(|page| page.range == range) {
            return;
        }
        let page = PageIds::new(range.clone(), &view.rows[range.clone()]);
        view.page = Some(page);
    }

    fn view_rows(&self) -> &[DisplayRow] {
        self.view.as_ref().map(|view| view.rows.as_slice()).unwrap_or_default()
    }

    fn total_rows(&mut self) -> usize {
        self.refresh_view();
        self.server_total_rows.unwrap_or(self.view_rows().len())
    }

    fn ingest_nodes(&self) -> Vec<RowNode> {
        let mut nodes = data_model::ingest(&self.records, &self.ids);
        for node in &mut nodes {
            if let Some(children) = self.child_records.get(&node.id) {
                node.child_rows = grouping::child_nodes(node, children, &self.ids);
            }
        }
        nodes
    }

    fn page_range(&self, len: usize) -> Range<usize> {
        if self.options.pagination && self.server_total_rows.is_none() {
            self.pagination.page_range(len)
        } else {
            0..len
        }
    }

    /// All rows after filter, sort, grouping and flattening, before paging.
    pub fn all_rows(&mut self) -> &[DisplayRow] {
        self.refresh_view();
        self.view_rows()
    }

    /// Rows of the current page.
    pub fn displayed_rows(&mut self) -> &[DisplayRow] {
        self.refresh_view();
        let range = self.page_range(self.view_rows().len());
        &self.view_rows()[range]
    }

    /// Ids of the current page, group rows included.
    pub fn displayed_ids(&mut self) -> Vec<String> {
        self.refresh_page_ids();
        page_ids(&self.view).map(|page| page.all.clone()).unwrap_or_default()
    }

    pub fn split_points(&mut self) -> &[usize] {
        self.refresh_view();
        self.view.as_ref().map(|view| view.split_points.as_slice()).unwrap_or_default()
    }

    pub fn page_info(&mut self) -> PageInfo {
        let total = self.total_rows();
        self.pagination.info(total)
    }

    pub fn set_page(&mut self, page: usize) -> bool {
        let total = self.total_rows();
        let before = self.pagination;
        self.pagination.set_page(page);
        self.pagination.clamp(total);
        self.pagination_changed(before, total)
    }

    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        let total = self.total_rows();
        let before = self.pagination;
        self.pagination.set_page_size(page_size);
        self.options.page_size = self.pagination.page_size();
        self.pagination_changed(before, total)
    }

    fn pagination_changed(&mut self, before: Pagination, total: usize) -> bool {
        if self.pagination == before {
            return false;
        }
        self.events.push(GridEvent::PaginationChanged(self.pagination.info(total)));
        true
    }

    // Viewport

    pub fn set_container_height(&mut self, height: f64) {
        self.container_height = height.max(0.0);
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    /// Feeds a raw scroll offset through the sampler. Returns true when the
    /// window should be recomputed.
    pub fn scroll_to(&mut self, scroll_top: f64) -> bool {
        match self.scroll.offer(scroll_top) {
            Some(top) => {
                let changed = top != self.scroll_top;
                self.scroll_top = top;
                changed
            }
            None => false,
        }
    }

    pub fn flush_scroll(&mut self) -> bool {
        match self.scroll.flush() {
            Some(top) => {
                let changed = top != self.scroll_top;
                self.scroll_top = top;
                changed
            }
            None => false,
        }
    }

    pub fn window(&mut self) -> VirtualWindow {
        let count = self.displayed_rows().len();
        compute_window(
            count,
            ViewportMetrics {
                row_height: self.options.row_height,
                overscan: self.options.overscan,
                container_height: self.container_height,
                scroll_top: self.scroll_top,
            },
        )
    }

    /// The rows to realize for the current scroll position.
    pub fn visible_rows(&mut self) -> &[DisplayRow] {
        let window = self.window();
        window.slice(self.displayed_rows())
    }

    // Row selection

    pub fn selection(&self) -> &RowSelection {
        &self.selection
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) -> bool {
        self.options.selection_mode = mode;
        let changed = self.selection.set_mode(mode);
        if changed {
            self.selection_changed();
        }
        changed
    }

    /// Selects a data row of the current page. Group rows are not selectable
    /// and shift ranges skip them.
    pub fn select_row(&mut self, row_id: &str, selected: bool, shift: bool, ctrl: bool) -> bool {
        self.refresh_page_ids();
        let Some(page) = page_ids(&self.view) else {
            return false;
        };
        let changed = match page.row_positions.get(row_id) {
            Some(&target) => self.selection.select_row_at(target, selected, shift, ctrl, &page.rows),
            None => false,
        };
        if changed {
            self.selection_changed();
        }
        changed
    }

    pub fn select_all(&mut self) -> bool {
        self.refresh_page_ids();
        let changed = match page_ids(&self.view) {
            Some(page) => self.selection.select_all(&page.rows),
            None => false,
        };
        if changed {
            self.selection_changed();
        }
        changed
    }

    pub fn deselect_all(&mut self) -> bool {
        self.refresh_page_ids();
        let changed = match page_ids(&self.view) {
            Some(page) => self.selection.deselect_all(&page.rows),
            None => false,
        };
        if changed {
            self.selection_changed();
        }
        changed
    }

    fn selection_changed(&mut self) {
        let selected = self.selection.selected().iter().cloned().collect();
        self.events.push(GridEvent::SelectionChanged { selected });
    }

    // Cell ranges

    pub fn range_selection(&self) -> &RangeSelection {
        &self.ranges
    }

    pub fn range_mouse_down(&mut self, cell: CellRef) {
        self.ranges.mouse_down(cell);
    }

    pub fn range_mouse_enter(&mut self, cell: CellRef) -> bool {
        self.ranges.mouse_enter(cell)
    }

    pub fn range_mouse_up(&mut self) {
        self.ranges.mouse_up();
    }

    pub fn begin_fill(&mut self) -> bool {
        self.ranges.begin_fill()
    }

    pub fn end_fill(&mut self) -> Option<CellRange> {
        self.ranges.end_fill()
    }

    pub fn range_bounds(&mut self) -> Option<RangeBounds> {
        self.refresh_page_ids();
        let layout = self.layout();
        self.ranges.range()?.bounds(&page_ids(&self.view)?.all, &layout.fields())
    }

    pub fn fill_bounds(&mut self) -> Option<RangeBounds> {
        self.refresh_page_ids();
        let layout = self.layout();
        self.ranges.fill_range()?.bounds(&page_ids(&self.view)?.all, &layout.fields())
    }

    // Keyboard

    pub fn focus(&self) -> Option<&CellRef> {
        self.focus.focus()
    }

    pub fn set_focus(&mut self, cell: CellRef) {
        self.focus.set_focus(cell);
    }

    pub fn handle_key(&mut self, input: KeyInput) -> NavAction {
        let action = if self.edit.is_editing() {
            self.focus.handle_key(input, &[] as &[&str], &[] as &[&str], true, |_| false)
        } else {
            self.refresh_page_ids();
            let layout = self.layout();
            let fields = layout.fields();
            match page_ids(&self.view) {
                Some(page) => {
                    let current = self.focus.focus().and_then(|cell| {
                        let row = *page.all_positions.get(&cell.row_id)?;
                        let col = fields.iter().position(|f| *f == cell.field)?;
                        Some((row, col))
                    });
                    self.focus.handle_key_from(current, input, &page.all, &fields, |cell| {
                        page.row_positions.contains_key(&cell.row_id)
                            && layout.get(&cell.field).is_some_and(|c| c.def.editable)
                    })
                }
                None => NavAction::Ignored,
            }
        };

        match &action {
            NavAction::StartEdit(cell) => {
                let (row_id, field) = (cell.row_id.clone(), cell.field.clone());
                self.start_edit(&row_id, &field);
            }
            NavAction::CommitEdit => {
                if let Err(err) = self.stop_edit(false) {
                    debug!(%err, "commit from keyboard did not complete");
                }
            }
            NavAction::CancelEdit => {
                if let Err(err) = self.stop_edit(true) {
                    debug!(%err, "cancel from keyboard did not complete");
                }
            }
            NavAction::Moved(_) | NavAction::Ignored => {}
        }
        action
    }

    // Editing

    pub fn edit_session(&self) -> &EditSession {
        &self.edit
    }

    pub fn start_edit(&mut self, row_id: &str, field: &str) -> bool {
        let editable = self.column(field).is_some_and(|c| c.editable);
        let Some(record) = self.record(row_id).cloned() else {
            return false;
        };
        let started = self
            .edit
            .start(row_id, field, editable, data_model::resolve_path(&record, field));
        if started {
            self.focus.set_focus(CellRef::new(row_id, field));
        }
        started
    }

    pub fn set_edit_value(&mut self, value: Value) -> bool {
        self.edit.set_value(value)
    }

    /// Ends the edit session. On commit the value goes into a copy of the
    /// owning record; the previous record object is never mutated.
    pub fn stop_edit(&mut self, cancel: bool) -> Result<Option<CellChange>, EditError> {
        let field = self.edit.cell().map(|c| c.field.clone()).ok_or(EditError::NoSession)?;
        let behavior = self.columns.iter().find(|c| c.field == field).and_then(ColumnDef::behavior_ref);

        let records = &mut self.records;
        let child_records = &mut self.child_records;
        let index = &self.record_index;
        let result = self.edit.stop(cancel, behavior, |change| {
            write_back(records, child_records, index, change)
        });

        if let Ok(Some(change)) = &result {
            self.data_changed();
            self.events.push(GridEvent::CellValueChanged {
                row_id: change.row_id.clone(),
                field: change.field.clone(),
                old_value: change.old_value.clone(),
                new_value: change.new_value.clone(),
            });
        }
        result
    }

    // Row drag

    pub fn begin_row_drag(&mut self, row_id: &str) -> bool {
        if !self.pointer.is_idle() {
            return false;
        }
        let Some(RecordSlot::Root(source)) = self.locate(row_id) else {
            return false;
        };
        self.pointer = PointerSession::DraggingRow(RowDrag {
            row_id: row_id.to_string(),
            source,
            target: source,
        });
        self.events.push(GridEvent::RowDragStart {
            row_id: row_id.to_string(),
            index: source,
        });
        true
    }

    pub fn update_row_drag(&mut self, over_row_id: &str) -> bool {
        let Some(RecordSlot::Root(target)) = self.locate(over_row_id) else {
            return false;
        };
        match &mut self.pointer {
            PointerSession::DraggingRow(drag) if drag.target != target => {
                drag.target = target;
                let event = GridEvent::RowDragMove {
                    row_id: drag.row_id.clone(),
                    index: target,
                };
                self.events.push(event);
                true
            }
            _ => false,
        }
    }

    /// Releases the drag and moves the record in the source collection.
    pub fn end_row_drag(&mut self) -> bool {
        if !matches!(self.pointer, PointerSession::DraggingRow(_)) {
            return false;
        }
        let PointerSession::DraggingRow(drag) = self.pointer.take() else {
            return false;
        };
        let moved = self.move_record(drag.source, drag.target);
        debug!(row_id = %drag.row_id, from = drag.source, to = drag.target, moved, "row drag ended");
        self.events.push(GridEvent::RowDragEnd {
            row_id: drag.row_id,
            from: drag.source,
            to: drag.target,
        });
        moved
    }

    pub fn cancel_pointer(&mut self) {
        if let PointerSession::Resizing(session) = self.pointer.take() {
            self.apply_width(&session.field, session.start_width, true);
        }
    }

    pub fn move_record(&mut self, from: usize, to: usize) -> bool {
        if !columns::move_item(&mut self.records, from, to) {
            return false;
        }
        if matches!(self.ids, RowIdSource::Positional) {
            warn!("moving records with positional row ids; selection may follow the wrong rows");
        }
        self.data_changed();
        true
    }

    fn locate(&self, row_id: &str) -> Option<RecordSlot> {
        self.record_index.get(row_id).cloned()
    }

    // Export

    pub fn export(&mut self) -> ExportTable {
        let layout = self.layout();
        export_rows(self.displayed_rows(), &layout)
    }

    // Server paging

    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.pagination.current_page(),
            page_size: self.pagination.page_size(),
            sort_model: self.sort.clone(),
            filter_model: self.filters.clone(),
            quick_filter_text: self.quick_filter.clone(),
        }
    }

    pub fn request_server_page(&mut self) -> Option<PendingRequest> {
        let request = self.page_request();
        self.server.request(request)
    }

    /// Installs a server page if its key is still current.
    pub fn receive_server_page(&mut self, key: &str, response: PageResponse) -> bool {
        let Some(accepted) = self.server.receive(key, response) else {
            return false;
        };
        let PageResponse {
            data,
            total_rows,
            page,
            page_size,
        } = accepted.clone();
        let before = self.pagination;
        self.server_total_rows = Some(total_rows);
        self.pagination.set_page_size(page_size);
        self.pagination.set_page(page);
        self.pagination.clamp(total_rows);
        self.set_records(data);
        self.pagination_changed(before, total_rows);
        true
    }

    /// Leaves server mode; local paging applies again.
    pub fn clear_server_mode(&mut self) {
        self.server.invalidate();
        self.server_total_rows = None;
        self.revisions.data += 1;
    }
}

/// Maps every row id to its record. Root records win over children and the
/// first occurrence of a duplicate id wins.
fn index_records(
    records: &[Arc<Record>],
    child_records: &HashMap<String, Vec<Arc<Record>>>,
    ids: &RowIdSource,
) -> HashMap<String, RecordSlot> {
    let mut index = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        index.entry(ids.id_for(record, i)).or_insert(RecordSlot::Root(i));
    }

    let mut parents: Vec<&String> = child_records.keys().collect();
    parents.sort();
    for parent in parents {
        let Some(children) = child_records.get(parent) else {
            continue;
        };
        for (i, record) in children.iter().enumerate() {
            let id = match ids {
                RowIdSource::Positional => format!("{parent}-child-{i}"),
                _ => ids.id_for(record, i),
            };
            index.entry(id).or_insert_with(|| RecordSlot::Child {
                parent: parent.clone(),
                index: i,
            });
        }
    }
    index
}

fn write_back(
    records: &mut [Arc<Record>],
    child_records: &mut HashMap<String, Vec<Arc<Record>>>,
    index: &HashMap<String, RecordSlot>,
    change: &CellChange,
) -> Result<(), EditError> {
    let slot = index.get(&change.row_id).ok_or_else(|| EditError::RowMissing {
        row_id: change.row_id.clone(),
    })?;
    let target = match slot {
        RecordSlot::Root(i) => records.get_mut(*i),
        RecordSlot::Child { parent, index } => child_records.get_mut(parent).and_then(|c| c.get_mut(*index)),
    }
    .ok_or_else(|| EditError::RowMissing {
        row_id: change.row_id.clone(),
    })?;

    let updated = data_model::with_path(target, &change.field, change.new_value.clone()).ok_or_else(|| {
        EditError::PathConflict {
            row_id: change.row_id.clone(),
            field: change.field.clone(),
        }
    })?;
    *target = Arc::new(updated);
    Ok(())
}
