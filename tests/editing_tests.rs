use serde_json::{json, Value};

use gridstate::state::behavior::Callbacks;
use gridstate::state::data_model::{resolve_path, Lookup, Record};
use gridstate::state::editing::{EditError, EditPhase, EditSession};

fn record() -> Record {
    json!({ "name": "Alice", "salary": 100 }).as_object().cloned().unwrap()
}

fn positive_only() -> Callbacks {
    Callbacks::new().validator(|_, new| match new.as_f64() {
        Some(v) if v >= 0.0 => Ok(()),
        _ => Err("must be a non-negative number".to_string()),
    })
}

#[test]
fn test_start_requires_editable_and_idle() {
    let row = record();
    let mut session = EditSession::new();

    assert!(!session.start("r0", "salary", false, resolve_path(&row, "salary")));
    assert_eq!(session.phase(), EditPhase::Idle);

    assert!(session.start("r0", "salary", true, resolve_path(&row, "salary")));
    assert_eq!(session.phase(), EditPhase::Editing);
    assert_eq!(session.cell().unwrap().original_value, json!(100));

    assert!(!session.start("r0", "name", true, resolve_path(&row, "name")));
    assert_eq!(session.cell().unwrap().field, "salary");
}

#[test]
fn test_cancel_leaves_record_identical() {
    let row = record();
    let before = row.clone();
    let mut session = EditSession::new();

    session.start("r0", "salary", true, resolve_path(&row, "salary"));
    session.set_value(json!(999));
    let result = session.stop(true, None, |_| panic!("cancel must not write"));

    assert_eq!(result, Ok(None));
    assert_eq!(row, before);
    assert_eq!(session.phase(), EditPhase::Idle);
}

#[test]
fn test_commit_hands_change_to_writer() {
    let mut row = record();
    let mut session = EditSession::new();
    session.start("r0", "salary", true, resolve_path(&row, "salary"));
    session.set_value(json!(150));

    let change = session
        .commit(None, |change| {
            row.insert(change.field.clone(), change.new_value.clone());
            Ok(())
        })
        .unwrap()
        .unwrap();

    assert_eq!(change.old_value, json!(100));
    assert_eq!(change.new_value, json!(150));
    assert_eq!(row["salary"], json!(150));
    assert!(!session.is_editing());
}

#[test]
fn test_unchanged_commit_emits_nothing() {
    let row = record();
    let mut session = EditSession::new();
    session.start("r0", "name", true, resolve_path(&row, "name"));

    let result = session.commit(None, |_| panic!("nothing to write"));
    assert_eq!(result, Ok(None));
    assert_eq!(session.phase(), EditPhase::Idle);
}

#[test]
fn test_validator_rejection_keeps_session_open() {
    let row = record();
    let validator = positive_only();
    let mut session = EditSession::new();
    session.start("r0", "salary", true, resolve_path(&row, "salary"));
    session.set_value(json!(-5));

    let err = session
        .commit(Some(&validator), |_| panic!("rejected edits are not written"))
        .unwrap_err();
    assert!(matches!(err, EditError::Rejected { ref field, .. } if field == "salary"));
    assert_eq!(session.phase(), EditPhase::Editing);
    assert_eq!(session.cell().unwrap().value, json!(-5));

    session.set_value(json!(5));
    let change = session.commit(Some(&validator), |_| Ok(())).unwrap().unwrap();
    assert_eq!(change.new_value, json!(5));
}

#[test]
fn test_failed_write_keeps_session_open() {
    let row = record();
    let mut session = EditSession::new();
    session.start("r0", "salary", true, resolve_path(&row, "salary"));
    session.set_value(json!(1));

    let err = session
        .commit(None, |change| {
            Err(EditError::RowMissing {
                row_id: change.row_id.clone(),
            })
        })
        .unwrap_err();
    assert_eq!(
        err,
        EditError::RowMissing {
            row_id: "r0".to_string()
        }
    );
    assert!(session.is_editing());
}

#[test]
fn test_stop_without_session() {
    let mut session = EditSession::new();
    assert_eq!(session.stop(true, None, |_| Ok(())), Err(EditError::NoSession));
    assert_eq!(session.stop(false, None, |_| Ok(())), Err(EditError::NoSession));
    assert!(!session.set_value(Value::Null));
}

#[test]
fn test_missing_field_starts_from_null() {
    let mut session = EditSession::new();
    assert!(session.start("r0", "bonus", true, Lookup::Missing));
    assert_eq!(session.cell().unwrap().original_value, Value::Null);
}

#[test]
fn test_error_messages() {
    let err = EditError::Rejected {
        field: "salary".to_string(),
        reason: "too low".to_string(),
    };
    assert_eq!(err.to_string(), "edit of 'salary' rejected: too low");
}
