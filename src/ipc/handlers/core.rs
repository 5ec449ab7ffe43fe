use crate::grid::controller::Phase;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let grid = state.grid.as_ref().map(|ctl| {
        let ready = matches!(ctl.phase(), Phase::Ready);
        json!({
            "generation": ctl.generation(),
            "ready": ready,
            "rows": ctl.model().row_count(),
            "cols": ctl.model().col_count(),
            "inFlight": ctl.in_flight(),
            "fontSize": ctl.layout().font_size(),
            "scrollLeft": ctl.layout().scroll_left(),
            "sidebarCollapsed": ctl.layout().sidebar_collapsed(),
            "activePopup": ctl.popups().active(),
            "config": ctl.config(),
        })
    });
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "grid": grid
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        _ => None,
    }
}
