use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use gridstate::io::{config_io, json_io};
use gridstate::state::behavior::Callbacks;
use gridstate::state::columns::{ColumnDef, Pin};
use gridstate::state::data_model::Record;
use gridstate::state::editing::EditError;
use gridstate::state::events::GridEvent;
use gridstate::state::filter::{FilterCondition, FilterEntry, FilterType, RangeOperator};
use gridstate::state::navigation::{KeyInput, NavAction, NavKey};
use gridstate::state::options::GridConfig;
use gridstate::state::pipeline::PageInfo;
use gridstate::state::selection::CellRef;
use gridstate::state::server::PageResponse;
use gridstate::state::sort::{SortDirection, SortKey, SortModel};
use gridstate::state::GridState;

fn fixture_path() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join("people.json")
}

fn config() -> GridConfig {
    config_io::load_sidecar(&fixture_path()).unwrap()
}

fn people() -> Vec<Record> {
    json_io::load_records(&fixture_path()).unwrap()
}

/// Fixture grid: five people, two per page.
fn paged() -> GridState {
    GridState::from_records(config(), people())
}

fn unpaged() -> GridState {
    let mut config = config();
    config.options.pagination = false;
    GridState::from_records(config, people())
}

fn ids(grid: &mut GridState) -> Vec<String> {
    grid.displayed_ids()
}

#[test]
fn test_open_paginates_fixture() {
    let mut grid = paged();

    assert_eq!(ids(&mut grid), vec!["p1", "p2"]);
    assert_eq!(
        grid.page_info(),
        PageInfo {
            current_page: 0,
            page_size: 2,
            total_rows: 5,
            total_pages: 3
        }
    );
    assert!(grid.drain_events().is_empty());

    assert!(grid.set_page(2));
    assert_eq!(ids(&mut grid), vec!["p5"]);
    assert_eq!(
        grid.drain_events(),
        vec![GridEvent::PaginationChanged(PageInfo {
            current_page: 2,
            page_size: 2,
            total_rows: 5,
            total_pages: 3
        })]
    );

    assert!(!grid.set_page(7));
    assert_eq!(grid.page_info().current_page, 2);

    assert!(grid.set_page_size(3));
    assert_eq!(ids(&mut grid), vec!["p1", "p2", "p3"]);
    assert_eq!(grid.options().page_size, 3);
}

#[test]
fn test_sort_cycle_from_header_clicks() {
    let mut grid = unpaged();

    assert!(grid.toggle_sort("salary", false));
    assert_eq!(ids(&mut grid), vec!["p4", "p2", "p5", "p3", "p1"]);
    assert_eq!(
        grid.drain_events(),
        vec![GridEvent::SortChanged(SortModel::from_keys(vec![SortKey::new(
            "salary",
            SortDirection::Asc
        )]))]
    );

    grid.toggle_sort("salary", false);
    assert_eq!(ids(&mut grid), vec!["p1", "p3", "p5", "p2", "p4"]);

    grid.toggle_sort("salary", false);
    assert!(grid.sort_model().is_empty());
    assert_eq!(ids(&mut grid), vec!["p1", "p2", "p3", "p4", "p5"]);

    assert!(!grid.toggle_sort("nope", false));
}

#[test]
fn test_multi_key_sort() {
    let mut grid = unpaged();
    grid.toggle_sort("dept", false);
    grid.toggle_sort("salary", true);
    grid.toggle_sort("salary", true);

    assert_eq!(grid.sort_model().keys().len(), 2);
    assert_eq!(ids(&mut grid), vec!["p1", "p3", "p5", "p2", "p4"]);
}

#[test]
fn test_filters_and_quick_filter() {
    let mut grid = unpaged();

    assert!(grid.set_filter(FilterEntry::new(
        "salary",
        FilterCondition::Number {
            operator: RangeOperator::GreaterThan,
            value: Some(90.0),
            value_to: None,
        },
    )));
    assert_eq!(ids(&mut grid), vec!["p1", "p3", "p5"]);

    assert!(grid.set_quick_filter("  OSLO "));
    assert_eq!(grid.quick_filter(), "OSLO");
    assert_eq!(ids(&mut grid), vec!["p1", "p3"]);

    assert!(grid.clear_filters());
    assert_eq!(ids(&mut grid), vec!["p1", "p3"]);
    assert!(grid.set_quick_filter(""));
    assert_eq!(ids(&mut grid).len(), 5);

    let events = grid.drain_events();
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| matches!(e, GridEvent::FilterChanged(_))));
}

#[test]
fn test_filter_clamps_current_page() {
    let mut grid = paged();
    grid.set_page(2);
    grid.drain_events();

    grid.set_filter(FilterEntry::new(
        "dept",
        FilterCondition::Select {
            values: vec!["Eng".to_string()],
        },
    ));
    assert_eq!(ids(&mut grid), vec!["p1", "p3"]);

    let events = grid.drain_events();
    assert!(matches!(events[0], GridEvent::FilterChanged(_)));
    assert_eq!(
        events[1],
        GridEvent::PaginationChanged(PageInfo {
            current_page: 0,
            page_size: 2,
            total_rows: 2,
            total_pages: 1
        })
    );
}

#[test]
fn test_date_filter_between() {
    let mut grid = unpaged();
    grid.set_filter(FilterEntry::new(
        "joined",
        FilterCondition::Date {
            operator: RangeOperator::Between,
            value: Some("2020-01-01".to_string()),
            value_to: Some("2022-01-20".to_string()),
        },
    ));
    assert_eq!(ids(&mut grid), vec!["p1", "p3", "p4"]);
}

#[test]
fn test_grouping_with_aggregates() {
    let mut grid = unpaged();
    assert!(grid.set_group_by(vec!["dept".to_string()]));

    assert_eq!(
        ids(&mut grid),
        vec!["group-Eng", "p1", "p3", "group-Ops", "p2", "p5", "group-Sales", "p4"]
    );
    let rows = grid.all_rows();
    assert!(rows[0].is_group());
    assert_eq!(rows[0].value("salary").as_f64(), Some(220.0));
    assert_eq!(rows[3].value("salary").as_f64(), Some(175.0));
    assert_eq!(rows[6].value("salary").as_f64(), Some(0.0));
    assert_eq!(rows[1].level(), 1);
    assert_eq!(rows[4].row_index(), 4);

    assert!(grid.toggle_group("group-Eng"));
    assert_eq!(ids(&mut grid), vec!["group-Eng", "p1", "p3", "group-Ops", "group-Sales"]);
    assert!(!grid.toggle_group("group-Eng"));
    assert_eq!(ids(&mut grid), vec!["group-Eng", "group-Ops", "group-Sales"]);

    let export = grid.export();
    assert!(export.rows.is_empty());
}

#[test]
fn test_split_points_follow_sorted_field() {
    let mut config = config();
    config.options.pagination = false;
    config.options.split_by_field = Some("dept".to_string());
    let mut grid = GridState::from_records(config, people());
    grid.toggle_sort("dept", false);

    assert_eq!(ids(&mut grid), vec!["p1", "p3", "p2", "p5", "p4"]);
    assert_eq!(grid.split_points(), &[2, 4]);
}

#[test]
fn test_edit_commit_copies_record() {
    let mut grid = unpaged();
    let before = Arc::clone(grid.record("p1").unwrap());

    assert!(!grid.start_edit("p1", "name"));
    assert!(grid.start_edit("p1", "salary"));
    assert_eq!(grid.focus(), Some(&CellRef::new("p1", "salary")));
    assert!(grid.set_edit_value(json!(130)));

    let change = grid.stop_edit(false).unwrap().unwrap();
    assert_eq!(change.old_value, json!(120));
    assert_eq!(before["salary"], json!(120));
    assert_eq!(grid.record("p1").unwrap()["salary"], json!(130));
    assert!(!grid.edit_session().is_editing());

    assert_eq!(
        grid.drain_events(),
        vec![GridEvent::CellValueChanged {
            row_id: "p1".to_string(),
            field: "salary".to_string(),
            old_value: json!(120),
            new_value: json!(130),
        }]
    );

    grid.toggle_sort("salary", false);
    assert_eq!(ids(&mut grid).last().map(String::as_str), Some("p1"));
}

#[test]
fn test_edit_cancel_keeps_value() {
    let mut grid = unpaged();
    grid.start_edit("p2", "salary");
    grid.set_edit_value(json!(1));

    assert_eq!(grid.stop_edit(true), Ok(None));
    assert_eq!(grid.record("p2").unwrap()["salary"], json!(80));
    assert!(grid.drain_events().is_empty());
    assert_eq!(grid.stop_edit(true), Err(EditError::NoSession));
}

#[test]
fn test_validator_rejects_edit() {
    let mut config = config();
    config.columns[2] = ColumnDef::new("salary")
        .editable(true)
        .filter_type(FilterType::Number)
        .behavior(Callbacks::new().validator(|_, new| match new.as_f64() {
            Some(v) if v >= 0.0 => Ok(()),
            _ => Err("salary must be non-negative".to_string()),
        }));
    let mut grid = GridState::from_records(config, people());

    grid.start_edit("p1", "salary");
    grid.set_edit_value(json!(-10));
    let err = grid.stop_edit(false).unwrap_err();
    assert!(matches!(err, EditError::Rejected { .. }));
    assert!(grid.edit_session().is_editing());
    assert_eq!(grid.record("p1").unwrap()["salary"], json!(120));

    grid.set_edit_value(json!(10));
    assert!(grid.stop_edit(false).unwrap().is_some());
}

#[test]
fn test_keyboard_drives_edit() {
    let mut grid = paged();
    grid.set_focus(CellRef::new("p1", "name"));

    assert_eq!(
        grid.handle_key(KeyInput::plain(NavKey::ArrowRight)),
        NavAction::Moved(CellRef::new("p1", "dept"))
    );
    assert_eq!(grid.handle_key(KeyInput::plain(NavKey::Enter)), NavAction::Ignored);

    grid.handle_key(KeyInput::plain(NavKey::ArrowRight));
    assert_eq!(
        grid.handle_key(KeyInput::plain(NavKey::Enter)),
        NavAction::StartEdit(CellRef::new("p1", "salary"))
    );
    assert!(grid.edit_session().is_editing());

    assert_eq!(grid.handle_key(KeyInput::plain(NavKey::ArrowDown)), NavAction::Ignored);
    grid.set_edit_value(json!(121));
    assert_eq!(grid.handle_key(KeyInput::plain(NavKey::Enter)), NavAction::CommitEdit);
    assert!(!grid.edit_session().is_editing());
    assert_eq!(grid.record("p1").unwrap()["salary"], json!(121));

    grid.handle_key(KeyInput::plain(NavKey::F2));
    grid.set_edit_value(json!(5));
    assert_eq!(grid.handle_key(KeyInput::plain(NavKey::Escape)), NavAction::CancelEdit);
    assert_eq!(grid.record("p1").unwrap()["salary"], json!(121));
}

#[test]
fn test_column_resize_and_cancel() {
    let mut grid = paged();

    assert!(grid.begin_resize("name", 100.0));
    assert!(!grid.begin_resize("dept", 0.0));
    assert_eq!(grid.update_resize(150.0), Some(230.0));
    assert!(grid.end_resize());
    assert_eq!(grid.column("name").unwrap().width, 230.0);
    assert_eq!(
        grid.drain_events(),
        vec![
            GridEvent::ColumnResized {
                field: "name".to_string(),
                width: 230.0,
                finished: false
            },
            GridEvent::ColumnResized {
                field: "name".to_string(),
                width: 230.0,
                finished: true
            },
        ]
    );

    grid.begin_resize("dept", 0.0);
    grid.update_resize(40.0);
    grid.cancel_pointer();
    assert_eq!(grid.column("dept").unwrap().width, 150.0);
    assert_eq!(grid.layout().total_width(), 230.0 + 4.0 * 150.0);
}

#[test]
fn test_column_move_keeps_pins() {
    let mut grid = paged();
    assert_eq!(grid.layout().fields(), vec!["name", "dept", "salary", "joined", "address.city"]);

    assert!(grid.move_column(1, 3));
    assert_eq!(grid.layout().fields(), vec!["name", "salary", "joined", "dept", "address.city"]);
    assert_eq!(
        grid.drain_events(),
        vec![GridEvent::ColumnMoved {
            field: "dept".to_string(),
            from: 1,
            to: 3
        }]
    );

    assert!(grid.move_column(0, 2));
    assert_eq!(grid.layout().fields()[0], "name");

    assert!(grid.set_column_pinned("joined", Some(Pin::Right)));
    assert_eq!(grid.layout().fields().last().copied(), Some("joined"));
    assert!(grid.set_column_hidden("address.city", true));
    assert_eq!(grid.layout().len(), 4);
}

#[test]
fn test_column_drag_session() {
    let mut grid = paged();
    assert!(grid.begin_column_drag(1));
    assert!(grid.update_column_drag(2));
    assert!(!grid.update_column_drag(9));
    assert!(grid.end_column_drag());
    assert_eq!(grid.layout().fields()[1..3], ["salary", "dept"]);
}

#[test]
fn test_row_drag_reorders_records() {
    let mut grid = unpaged();

    assert!(!grid.begin_row_drag("missing"));
    assert!(grid.begin_row_drag("p1"));
    assert!(grid.update_row_drag("p3"));
    assert!(grid.end_row_drag());
    assert_eq!(ids(&mut grid), vec!["p2", "p3", "p1", "p4", "p5"]);

    assert_eq!(
        grid.drain_events(),
        vec![
            GridEvent::RowDragStart {
                row_id: "p1".to_string(),
                index: 0
            },
            GridEvent::RowDragMove {
                row_id: "p1".to_string(),
                index: 2
            },
            GridEvent::RowDragEnd {
                row_id: "p1".to_string(),
                from: 0,
                to: 2
            },
        ]
    );
}

#[test]
fn test_selection_spans_pages() {
    let mut grid = paged();

    assert!(grid.select_row("p1", true, false, false));
    assert_eq!(
        grid.drain_events(),
        vec![GridEvent::SelectionChanged {
            selected: vec!["p1".to_string()]
        }]
    );
    assert!(!grid.select_row("p5", true, false, false));

    assert!(grid.select_all());
    grid.set_page(1);
    assert!(grid.select_all());
    assert_eq!(grid.selection().selected().len(), 4);

    assert!(grid.deselect_all());
    assert!(grid.selection().is_selected("p1"));
    assert!(!grid.selection().is_selected("p3"));
}

#[test]
fn test_selection_skips_group_rows() {
    let mut grid = unpaged();
    grid.set_group_by(vec!["dept".to_string()]);
    grid.drain_events();

    assert!(grid.select_all());
    assert_eq!(
        grid.drain_events(),
        vec![GridEvent::SelectionChanged {
            selected: ["p1", "p2", "p3", "p4", "p5"].map(String::from).to_vec()
        }]
    );
    assert!(!grid.selection().is_selected("group-Eng"));
    assert!(!grid.select_row("group-Ops", true, false, false));

    assert!(grid.deselect_all());
    assert!(grid.selection().selected().is_empty());

    // p3 and p2 sit on either side of the Ops group row.
    grid.select_row("p3", true, false, false);
    assert!(grid.select_row("p2", true, true, false));
    let selected: Vec<&str> = grid.selection().selected().iter().map(String::as_str).collect();
    assert_eq!(selected, vec!["p2", "p3"]);

    grid.set_focus(CellRef::new("p3", "name"));
    assert_eq!(
        grid.handle_key(KeyInput::plain(NavKey::ArrowDown)),
        NavAction::Moved(CellRef::new("group-Ops", "name"))
    );
}

#[test]
fn test_edited_row_id_is_found_under_new_id() {
    let mut config = config();
    config.options.pagination = false;
    config.columns[5].editable = true;
    let mut grid = GridState::from_records(config, people());

    assert!(grid.start_edit("p2", "id"));
    grid.set_edit_value(json!("p9"));
    assert!(grid.stop_edit(false).unwrap().is_some());

    assert!(grid.record("p2").is_none());
    assert_eq!(grid.record("p9").unwrap()["name"], json!("bob"));
    assert!(grid.select_row("p9", true, false, false));
    assert_eq!(ids(&mut grid), vec!["p1", "p9", "p3", "p4", "p5"]);
}

#[test]
fn test_range_selection_over_display() {
    let mut grid = paged();
    grid.range_mouse_down(CellRef::new("p1", "dept"));
    assert!(grid.range_mouse_enter(CellRef::new("p2", "joined")));
    grid.range_mouse_up();

    let bounds = grid.range_bounds().unwrap();
    assert_eq!((bounds.first_row, bounds.last_row), (0, 1));
    assert_eq!((bounds.first_col, bounds.last_col), (1, 3));
    assert_eq!(bounds.row_count() * bounds.col_count(), 6);

    assert!(grid.begin_fill());
    grid.range_mouse_enter(CellRef::new("p2", "address.city"));
    assert!(grid.fill_bounds().is_some());
    let fill = grid.end_fill().unwrap();
    assert_eq!(fill.end, CellRef::new("p2", "address.city"));
}

#[test]
fn test_export_current_page() {
    let mut grid = paged();
    let table = grid.export();

    assert_eq!(table.headers, vec!["Name", "dept", "salary", "joined", "City"]);
    assert_eq!(
        table.rows,
        vec![
            vec!["Alice", "Eng", "120", "2021-03-01", "Oslo"],
            vec!["bob", "Ops", "80", "2019-07-15", "Bergen"],
        ]
    );
}

#[test]
fn test_child_rows_expand_under_parent() {
    let mut grid = unpaged();
    let children = vec![json!({ "id": "p1a", "name": "Ann", "salary": 10 })
        .as_object()
        .cloned()
        .unwrap()];
    grid.set_child_rows("p1", children);

    assert_eq!(ids(&mut grid).len(), 5);
    assert!(grid.toggle_row_expanded("p1"));
    assert_eq!(ids(&mut grid)[..3], ["p1", "p1a", "p2"]);
    let child = grid.all_rows()[1].as_data().unwrap().clone();
    assert_eq!(child.level, 1);
    assert_eq!(child.parent_id.as_deref(), Some("p1"));

    grid.start_edit("p1a", "salary");
    grid.set_edit_value(json!(11));
    grid.stop_edit(false).unwrap();
    assert_eq!(grid.record("p1a").unwrap()["salary"], json!(11));
}

#[test]
fn test_virtual_window_over_large_grid() {
    let records: Vec<Record> = (0..1000)
        .map(|i| json!({ "n": i }).as_object().cloned().unwrap())
        .collect();
    let mut grid = GridState::from_records(GridConfig::default(), records);
    grid.set_container_height(320.0);

    assert!(grid.scroll_to(3200.0));
    let window = grid.window();
    assert_eq!(window.range(), 95..115);
    assert_eq!(window.total_height, 32_000.0);
    assert_eq!(window.offset_top, 95.0 * 32.0);

    let visible = grid.visible_rows();
    assert_eq!(visible.len(), 20);
    assert_eq!(visible[0].id(), "row-95");
}

#[test]
fn test_server_page_replaces_local_paging() {
    let mut grid = paged();
    let stale = grid.request_server_page().unwrap();
    assert_eq!(stale.request.page_size, 2);

    grid.toggle_sort("name", false);
    let current = grid.request_server_page().unwrap();
    assert!(stale.cancel.is_cancelled());

    let response = PageResponse {
        data: people()[..2].to_vec(),
        total_rows: 40,
        page: 3,
        page_size: 2,
    };
    assert!(!grid.receive_server_page(&stale.key, response.clone()));
    assert!(grid.receive_server_page(&current.key, response));

    assert_eq!(
        grid.page_info(),
        PageInfo {
            current_page: 3,
            page_size: 2,
            total_rows: 40,
            total_pages: 20
        }
    );
    assert_eq!(ids(&mut grid), vec!["p1", "p2"]);

    grid.clear_server_mode();
    assert_eq!(grid.page_info().total_rows, 2);
}
