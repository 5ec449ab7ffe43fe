mod test_support;

use serde_json::json;
use test_support::{
    cell, effects_with_op, fetch_id, has_effect, request_err, request_ok, sample_grid,
    spawn_sidecar, with_fields,
};

#[test]
fn fill_down_writes_only_cells_empty_at_submit() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "1", "grid.load", json!({ "grid": sample_grid() }));

    let open = request_ok(&mut stdin, &mut reader, "2", "filldown.open", json!({ "activityId": "A" }));
    assert_eq!(open.get("cells").and_then(|v| v.as_u64()), Some(3));
    assert!(has_effect(&open, "openDialog"));

    // N2 gets a value after the dialog captured the column.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "cell.input",
        with_fields(cell("A", "N2"), json!({ "value": "6" })),
    );

    let _ = request_ok(&mut stdin, &mut reader, "4", "filldown.setValue", json!({ "value": "10" }));
    let submit = request_ok(&mut stdin, &mut reader, "5", "filldown.submit", json!({}));
    assert_eq!(submit.get("filled").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(submit.get("skipped").and_then(|v| v.as_u64()), Some(2));

    let values = effects_with_op(&submit, "setValue");
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].get("cell").and_then(|v| v.as_str()), Some("A_N3"));
    assert_eq!(values[0].get("value").and_then(|v| v.as_str()), Some("10"));
    // The filled cell goes through the normal validation path.
    assert_eq!(effects_with_op(&submit, "scheduleTimer").len(), 1);
    assert!(has_effect(&submit, "closeDialog"));

    let _ = child.kill();
}

#[test]
fn empty_fill_value_is_a_no_op_and_cancel_clears_it() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "1", "grid.load", json!({ "grid": sample_grid() }));
    let _ = request_ok(&mut stdin, &mut reader, "2", "filldown.open", json!({ "activityId": "C" }));

    let submit = request_ok(&mut stdin, &mut reader, "3", "filldown.submit", json!({ "value": "" }));
    assert_eq!(submit.get("filled").and_then(|v| v.as_u64()), Some(0));
    assert!(!has_effect(&submit, "showInput"));
    assert!(!has_effect(&submit, "closeDialog"));

    let cancel = request_ok(&mut stdin, &mut reader, "4", "filldown.cancel", json!({}));
    let cleared = effects_with_op(&cancel, "setDialogField");
    assert_eq!(cleared[0].get("value").and_then(|v| v.as_str()), Some(""));
    assert!(!has_effect(&cancel, "showInput"));

    assert_eq!(
        request_err(&mut stdin, &mut reader, "5", "filldown.submit", json!({ "value": "3" })),
        "not_found"
    );

    let _ = child.kill();
}

#[test]
fn comment_submit_stages_field_and_saves_form() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let mut grid = sample_grid();
    if let Some(activities) = grid.get_mut("activities").and_then(|v| v.as_array_mut()) {
        activities.push(json!({ "id": "K", "title": "Remarks", "comment": true }));
    }
    if let Some(cells) = grid.get_mut("cells").and_then(|v| v.as_array_mut()) {
        cells.push(json!({ "activityId": "K", "studentId": "N2", "comment": "<p>Late</p>" }));
    }
    let _ = request_ok(&mut stdin, &mut reader, "1", "grid.load", json!({ "grid": grid }));

    // Comment cells are not scorable.
    let click = request_ok(&mut stdin, &mut reader, "2", "cell.click", cell("K", "N2"));
    assert_eq!(click.get("editing").and_then(|v| v.as_bool()), Some(false));

    let open = request_ok(&mut stdin, &mut reader, "3", "comment.open", json!({ "row": 1, "col": 3 }));
    assert_eq!(open.get("cell").and_then(|v| v.as_str()), Some("K_N2"));
    let dialog = effects_with_op(&open, "openDialog");
    assert_eq!(dialog[0].pointer("/fields/body").and_then(|v| v.as_str()), Some("<p>Late</p>"));
    assert_eq!(dialog[0].pointer("/fields/studentTitle").and_then(|v| v.as_str()), Some("Brook"));

    let submit = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "comment.submit",
        json!({ "html": "<p>Handed in</p>" }),
    );
    let hidden = effects_with_op(&submit, "appendHiddenField");
    assert_eq!(hidden[0].get("name").and_then(|v| v.as_str()), Some("K_N2"));
    let save = effects_with_op(&submit, "fetch");
    assert_eq!(save[0].get("endpoint").and_then(|v| v.as_str()), Some("grades.submit"));
    assert_eq!(
        save[0].pointer("/params/fields/K_N2").and_then(|v| v.as_str()),
        Some("<p>Handed in</p>")
    );

    let id = fetch_id(&submit, "grades.submit").expect("submit id");
    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "fetch.complete",
        json!({ "requestId": id, "ok": true, "body": { "ok": true } }),
    );
    assert_eq!(saved.get("saved").and_then(|v| v.as_bool()), Some(true));

    // Once saved, the comment is no longer carried by the next form save.
    let next = request_ok(&mut stdin, &mut reader, "6", "form.save", json!({}));
    assert_eq!(next.get("fields").and_then(|v| v.as_u64()), Some(0));

    let _ = child.kill();
}

#[test]
fn score_and_comment_are_saved_side_by_side() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let mut grid = sample_grid();
    if let Some(activities) = grid.get_mut("activities").and_then(|v| v.as_array_mut()) {
        activities.push(json!({ "id": "K", "title": "Remarks", "comment": true }));
    }
    if let Some(cells) = grid.get_mut("cells").and_then(|v| v.as_array_mut()) {
        cells.push(json!({ "activityId": "K", "studentId": "N1" }));
    }
    let _ = request_ok(&mut stdin, &mut reader, "1", "grid.load", json!({ "grid": grid }));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "cell.input",
        with_fields(cell("A", "N1"), json!({ "value": "95" })),
    );
    // A score column cannot carry a comment; its field name belongs to the score.
    assert_eq!(
        request_err(&mut stdin, &mut reader, "3", "comment.open", json!({ "row": 0, "col": 0 })),
        "bad_params"
    );

    let _ = request_ok(&mut stdin, &mut reader, "4", "comment.open", json!({ "row": 0, "col": 3 }));
    let submit = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "comment.submit",
        json!({ "html": "<p>note</p>" }),
    );
    assert_eq!(submit.get("cell").and_then(|v| v.as_str()), Some("K_N1"));
    let save = effects_with_op(&submit, "fetch");
    assert_eq!(save[0].pointer("/params/fields/A_N1").and_then(|v| v.as_str()), Some("95"));
    assert_eq!(
        save[0].pointer("/params/fields/K_N1").and_then(|v| v.as_str()),
        Some("<p>note</p>")
    );

    let _ = child.kill();
}
