use crate::grid::dispatch::{Detail, Event, EventKind, Target};
use crate::grid::error::GridError;
use crate::grid::layout::{LayoutMetrics, ZoomAction};
use crate::ipc::handlers::{dispatch, typed_param};
use crate::ipc::types::{AppState, Request};

fn handle_layout_measured(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |req| {
        let metrics: LayoutMetrics = typed_param(req, "metrics")?;
        Ok(Event::new(EventKind::Measured, Target::Page).with(Detail::Metrics(metrics)))
    })
}

fn handle_layout_zoom(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |req| {
        let action: ZoomAction = typed_param(req, "action")
            .map_err(|_| GridError::bad_params("action must be one of: in, out, reset"))?;
        Ok(Event::new(EventKind::Zoom, Target::ZoomControl).with(Detail::Zoom(action)))
    })
}

fn handle_sidebar_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |req| {
        let collapsed: bool = typed_param(req, "collapsed")?;
        Ok(Event::new(EventKind::Toggle, Target::Sidebar).with(Detail::Collapsed(collapsed)))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "layout.measured" => Some(handle_layout_measured(state, req)),
        "layout.zoom" => Some(handle_layout_zoom(state, req)),
        "sidebar.toggle" => Some(handle_sidebar_toggle(state, req)),
        _ => None,
    }
}
