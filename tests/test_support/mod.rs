#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub type Sidecar = (Child, ChildStdin, BufReader<ChildStdout>);

pub fn spawn_sidecar() -> Sidecar {
    spawn_sidecar_with_env(&[])
}

pub fn spawn_sidecar_with_env(env: &[(&str, &str)]) -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_gradegridd");
    let mut cmd = Command::new(exe);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .env_remove("GRADEGRID_CONFIG");
    for (k, v) in env {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().expect("spawn gradegridd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn send_line(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, line: &str) -> serde_json::Value {
    writeln!(stdin, "{}", line).expect("write request");
    stdin.flush().expect("flush request");
    let mut out = String::new();
    reader.read_line(&mut out).expect("read response line");
    assert!(!out.trim().is_empty(), "empty response for {}", line);
    serde_json::from_str(out.trim()).expect("parse response json")
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    let value = send_line(stdin, reader, &payload.to_string());
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_default()
}

/// Returns the error code of a request that must fail.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Three students by three activities; B is not scorable.
pub fn sample_grid() -> serde_json::Value {
    json!({
        "activities": [
            { "id": "A", "title": "Quiz 1" },
            { "id": "B", "title": "Notes", "scorable": false },
            { "id": "C", "title": "Test 1" }
        ],
        "students": [
            { "id": "N1", "title": "Ada" },
            { "id": "N2", "title": "Brook" },
            { "id": "N3", "title": "Cyd" }
        ],
        "totals": [ { "id": "T", "title": "Term" } ],
        "cells": [
            { "activityId": "A", "studentId": "N1", "value": "7" },
            { "activityId": "A", "studentId": "N2", "value": "" },
            { "activityId": "A", "studentId": "N3", "value": "" },
            { "activityId": "B", "studentId": "N1", "value": "" },
            { "activityId": "B", "studentId": "N2", "value": "" },
            { "activityId": "B", "studentId": "N3", "value": "" },
            { "activityId": "C", "studentId": "N1", "value": "" },
            { "activityId": "C", "studentId": "N2", "value": "9" },
            { "activityId": "C", "studentId": "N3", "value": "4" }
        ]
    })
}

pub fn cell(activity_id: &str, student_id: &str) -> serde_json::Value {
    json!({ "activityId": activity_id, "studentId": student_id })
}

pub fn with_fields(mut base: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    if let (Some(b), Some(e)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in e {
            b.insert(k.clone(), v.clone());
        }
    }
    base
}

pub fn effects(result: &serde_json::Value) -> Vec<serde_json::Value> {
    result
        .get("effects")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

pub fn effects_with_op(result: &serde_json::Value, op: &str) -> Vec<serde_json::Value> {
    effects(result)
        .into_iter()
        .filter(|e| e.get("op").and_then(|v| v.as_str()) == Some(op))
        .collect()
}

pub fn has_effect(result: &serde_json::Value, op: &str) -> bool {
    !effects_with_op(result, op).is_empty()
}

/// Request id of the first fetch to `endpoint`.
pub fn fetch_id(result: &serde_json::Value, endpoint: &str) -> Option<String> {
    effects_with_op(result, "fetch")
        .into_iter()
        .find(|e| e.get("endpoint").and_then(|v| v.as_str()) == Some(endpoint))
        .and_then(|e| e.get("requestId").and_then(|v| v.as_str()).map(str::to_string))
}

/// Timer id of the last timer the result scheduled.
pub fn scheduled_timer(result: &serde_json::Value) -> Option<u64> {
    effects_with_op(result, "scheduleTimer")
        .last()
        .and_then(|e| e.get("timerId").and_then(|v| v.as_u64()))
}
