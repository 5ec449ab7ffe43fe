mod test_support;

use serde_json::json;
use test_support::{
    cell, request, request_err, request_ok, sample_grid, send_line, spawn_sidecar, with_fields,
};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert!(health.get("grid").map(|g| g.is_null()).unwrap_or(false));

    let code = request_err(&mut stdin, &mut reader, "2", "cell.click", cell("A", "N1"));
    assert_eq!(code, "no_grid");

    let load = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grid.load",
        json!({ "grid": sample_grid() }),
    );
    assert_eq!(load.get("generation").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(load.get("ready").and_then(|v| v.as_bool()), Some(true));

    let calls = vec![
        ("cell.click", cell("A", "N1")),
        ("cell.focus", cell("A", "N1")),
        ("cell.input", with_fields(cell("A", "N1"), json!({ "value": "8" }))),
        ("cell.keydown", with_fields(cell("A", "N1"), json!({ "key": "Tab" }))),
        ("cell.blur", cell("A", "N1")),
        ("timer.fire", json!({ "timerId": 999 })),
        ("fetch.complete", json!({ "requestId": "nope", "ok": true, "body": {} })),
        ("popup.open", json!({ "header": { "kind": "activity", "id": "A" } })),
        ("popup.preloadAll", json!({})),
        ("pane.scroll", json!({ "scrollLeft": 0 })),
        ("document.click", json!({ "target": "elsewhere" })),
        ("filldown.open", json!({ "activityId": "C" })),
        ("filldown.setValue", json!({ "value": "3" })),
        ("filldown.cancel", json!({})),
        ("comment.open", json!({ "row": 0, "col": 0 })),
        ("comment.cancel", json!({})),
        ("layout.measured", json!({ "metrics": { "gradebookWidth": 800, "studentsWidth": 200 } })),
        ("layout.zoom", json!({ "action": "reset" })),
        ("sidebar.toggle", json!({ "collapsed": true })),
        ("page.beforeUnload", json!({})),
        ("form.save", json!({})),
        ("grid.config", json!({})),
        ("grid.reload", json!({ "grid": sample_grid() })),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = format!("s{i}");
        let resp = request(&mut stdin, &mut reader, &id, method, params);
        assert_eq!(
            resp.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            resp
        );
    }

    let code = request_err(&mut stdin, &mut reader, "4", "grid.frobnicate", json!({}));
    assert_eq!(code, "not_implemented");

    let _ = child.kill();
}

#[test]
fn malformed_lines_get_bad_json_and_the_loop_survives() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = send_line(&mut stdin, &mut reader, "{ not json");
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_json")
    );

    // Valid JSON without a method still echoes the id back.
    let resp = send_line(&mut stdin, &mut reader, r#"{"id":"x1"}"#);
    assert_eq!(resp.get("id").and_then(|v| v.as_str()), Some("x1"));
    assert_eq!(
        resp.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_json")
    );

    let _ = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    let _ = child.kill();
}

#[test]
fn parameter_errors_use_stable_codes() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    assert_eq!(
        request_err(&mut stdin, &mut reader, "1", "grid.load", json!({})),
        "bad_params"
    );
    let duplicate = json!({
        "activities": [ { "id": "A", "title": "x" }, { "id": "A", "title": "y" } ],
        "students": []
    });
    assert_eq!(
        request_err(&mut stdin, &mut reader, "2", "grid.load", json!({ "grid": duplicate })),
        "bad_params"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "3",
            "grid.load",
            json!({ "grid": sample_grid(), "config": { "zoom": { "factor": 0.5 } } })
        ),
        "bad_params"
    );

    let _ = request_ok(&mut stdin, &mut reader, "4", "grid.load", json!({ "grid": sample_grid() }));
    assert_eq!(
        request_err(&mut stdin, &mut reader, "5", "cell.click", cell("Z", "N1")),
        "not_found"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "6", "cell.input", cell("A", "N1")),
        "bad_params"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "7", "layout.zoom", json!({ "action": "sideways" })),
        "bad_params"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "8", "filldown.open", json!({ "activityId": "B" })),
        "not_scorable"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "9", "comment.open", json!({ "row": 9, "col": 0 })),
        "not_found"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "10",
            "popup.open",
            json!({ "header": { "kind": "activity", "id": "nope" } })
        ),
        "not_found"
    );

    let _ = child.kill();
}
