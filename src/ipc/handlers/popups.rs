use crate::grid::dispatch::{Detail, Event, EventKind, Target};
use crate::grid::error::GridError;
use crate::grid::popup::{HeaderRef, PopupGeometry};
use crate::ipc::handlers::{dispatch, opt_param, typed_param};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_popup_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |req| {
        let header: HeaderRef = typed_param(req, "header")?;
        let geometry: Option<PopupGeometry> = opt_param(req, "geometry")?;
        Ok(Event::new(EventKind::Click, Target::PopupTrigger(header))
            .with(Detail::Geometry(geometry)))
    })
}

fn handle_popup_preload_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |_| Ok(Event::new(EventKind::Preload, Target::Page)))
}

fn handle_pane_scroll(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |req| {
        let left: f64 = typed_param(req, "scrollLeft")?;
        Ok(Event::new(EventKind::Scroll, Target::GradePane).with(Detail::ScrollLeft(left)))
    })
}

/// `target` is `"elsewhere"` (the default) or `"popup"` with a `header`.
fn handle_document_click(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |req| {
        let target = req
            .params
            .get("target")
            .and_then(|v| v.as_str())
            .unwrap_or("elsewhere");
        let target = match target {
            "elsewhere" => Target::Elsewhere,
            "popup" => Target::Popup(typed_param(req, "header")?),
            other => {
                return Err(GridError::bad_params("target must be one of: elsewhere, popup")
                    .with_details(json!({ "target": other })))
            }
        };
        Ok(Event::new(EventKind::Click, target))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "popup.open" => Some(handle_popup_open(state, req)),
        "popup.preloadAll" => Some(handle_popup_preload_all(state, req)),
        "pane.scroll" => Some(handle_pane_scroll(state, req)),
        "document.click" => Some(handle_document_click(state, req)),
        _ => None,
    }
}
