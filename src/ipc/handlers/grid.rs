use crate::grid::controller::GridController;
use crate::grid::dispatch::{Detail, Event, EventKind, Target};
use crate::grid::model::GridData;
use crate::ipc::error::{grid_err, ok};
use crate::ipc::handlers::{dispatch, opt_param, typed_param};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_grid_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let data: GridData = match typed_param(req, "grid") {
        Ok(v) => v,
        Err(e) => return grid_err(&req.id, e),
    };
    let preload = req
        .params
        .get("preload")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let config = match state
        .config
        .with_overrides(req.params.get("config").unwrap_or(&serde_json::Value::Null))
    {
        Ok(c) => c,
        Err(e) => return grid_err(&req.id, e),
    };
    if state.grid.is_some() {
        tracing::info!("grid.load replaces the loaded grid");
    }
    let mut ctl = match GridController::load(config, data, preload) {
        Ok(c) => c,
        Err(e) => return grid_err(&req.id, e),
    };
    let result = json!({
        "effects": ctl.drain(),
        "handled": ["grid.load"],
        "generation": ctl.generation(),
        "ready": ctl.ensure_ready().is_ok(),
    });
    state.grid = Some(ctl);
    ok(&req.id, result)
}

fn handle_grid_reload(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |req| {
        let data: GridData = typed_param(req, "grid")?;
        Ok(Event::new(EventKind::Reload, Target::Page).with(Detail::Grid(Box::new(data))))
    })
}

fn handle_grid_config(state: &mut AppState, req: &Request) -> serde_json::Value {
    let overrides: Option<serde_json::Value> = match opt_param(req, "config") {
        Ok(v) => v,
        Err(e) => return grid_err(&req.id, e),
    };
    let config = match &state.grid {
        Some(ctl) => ctl.config().clone(),
        None => state.config.clone(),
    };
    match overrides {
        Some(o) => match config.with_overrides(&o) {
            Ok(merged) => ok(&req.id, json!({ "config": merged })),
            Err(e) => grid_err(&req.id, e),
        },
        None => ok(&req.id, json!({ "config": config })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grid.load" => Some(handle_grid_load(state, req)),
        "grid.reload" => Some(handle_grid_reload(state, req)),
        "grid.config" => Some(handle_grid_config(state, req)),
        _ => None,
    }
}
