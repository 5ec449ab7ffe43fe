use crate::grid::dispatch::{Detail, Event, EventKind, Target};
use crate::ipc::handlers::{cell_param, dispatch, str_param};
use crate::ipc::types::{AppState, Request};

fn cell_event(state: &mut AppState, req: &Request, kind: EventKind) -> serde_json::Value {
    dispatch(state, req, |req| {
        let key = cell_param(req)?;
        let event = Event::new(kind, Target::Cell(key));
        Ok(match kind {
            EventKind::Input => event.with(Detail::Text(str_param(req, "value")?.to_string())),
            EventKind::KeyDown => event.with(Detail::Key(str_param(req, "key")?.to_string())),
            _ => event,
        })
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let kind = match req.method.as_str() {
        "cell.click" => EventKind::Click,
        "cell.focus" => EventKind::Focus,
        "cell.input" => EventKind::Input,
        "cell.keydown" => EventKind::KeyDown,
        "cell.blur" => EventKind::Blur,
        _ => return None,
    };
    Some(cell_event(state, req, kind))
}
