pub mod cells;
pub mod core;
pub mod dialogs;
pub mod grid;
pub mod layout;
pub mod popups;
pub mod session;

use serde::de::DeserializeOwned;
use serde_json::json;

use crate::grid::dispatch::Event;
use crate::grid::error::GridError;
use crate::grid::model::CellKey;
use crate::ipc::error::{err, grid_err, ok};
use crate::ipc::types::{AppState, Request};

/// Run `event` through the dispatcher and wrap the effects it produced.
///
/// The event is built lazily so a missing grid is reported before any
/// parameter problem.
pub(crate) fn dispatch(
    state: &mut AppState,
    req: &Request,
    event: impl FnOnce(&Request) -> Result<Event, GridError>,
) -> serde_json::Value {
    let AppState {
        dispatcher, grid, ..
    } = state;
    let Some(ctl) = grid.as_mut() else {
        return err(&req.id, "no_grid", "no grid loaded; call grid.load first", None);
    };
    let event = match event(req) {
        Ok(e) => e,
        Err(e) => return grid_err(&req.id, e),
    };
    match dispatcher.dispatch(ctl, &event) {
        Ok(handled) => {
            let mut result = ctl.take_notes();
            result.insert("effects".into(), json!(ctl.drain()));
            result.insert("handled".into(), json!(handled));
            ok(&req.id, serde_json::Value::Object(result))
        }
        Err(e) => {
            ctl.take_notes();
            let dropped = ctl.drain();
            if !dropped.is_empty() {
                tracing::warn!(method = %req.method, dropped = dropped.len(), "effects dropped with failed event");
            }
            grid_err(&req.id, e)
        }
    }
}

pub(crate) fn str_param<'a>(req: &'a Request, name: &str) -> Result<&'a str, GridError> {
    req.params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| GridError::bad_params(format!("missing params.{name}")))
}

pub(crate) fn typed_param<T: DeserializeOwned>(req: &Request, name: &str) -> Result<T, GridError> {
    let Some(v) = req.params.get(name) else {
        return Err(GridError::bad_params(format!("missing params.{name}")));
    };
    serde_json::from_value(v.clone())
        .map_err(|e| GridError::bad_params(format!("invalid params.{name}: {e}")))
}

pub(crate) fn opt_param<T: DeserializeOwned>(
    req: &Request,
    name: &str,
) -> Result<Option<T>, GridError> {
    match req.params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => typed_param(req, name).map(Some),
    }
}

pub(crate) fn cell_param(req: &Request) -> Result<CellKey, GridError> {
    Ok(CellKey::new(
        str_param(req, "activityId")?,
        str_param(req, "studentId")?,
    ))
}
