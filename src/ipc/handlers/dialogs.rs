use crate::grid::dispatch::{Detail, Event, EventKind, Target};
use crate::ipc::handlers::{dispatch, opt_param, str_param, typed_param};
use crate::ipc::types::{AppState, Request};

fn handle_fill_down(state: &mut AppState, req: &Request, kind: EventKind) -> serde_json::Value {
    dispatch(state, req, |req| {
        let event = Event::new(kind, Target::FillDown);
        Ok(match kind {
            EventKind::Open => {
                event.with(Detail::Text(str_param(req, "activityId")?.to_string()))
            }
            EventKind::Change => event.with(Detail::Text(str_param(req, "value")?.to_string())),
            EventKind::Submit => event.with(Detail::OptionalText(opt_param(req, "value")?)),
            _ => event,
        })
    })
}

fn handle_comment(state: &mut AppState, req: &Request, kind: EventKind) -> serde_json::Value {
    dispatch(state, req, |req| {
        let event = Event::new(kind, Target::CommentDialog);
        Ok(match kind {
            EventKind::Open => event.with(Detail::Position {
                row: typed_param(req, "row")?,
                col: typed_param(req, "col")?,
            }),
            EventKind::Submit => event.with(Detail::Text(str_param(req, "html")?.to_string())),
            _ => event,
        })
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "filldown.open" => Some(handle_fill_down(state, req, EventKind::Open)),
        "filldown.setValue" => Some(handle_fill_down(state, req, EventKind::Change)),
        "filldown.submit" => Some(handle_fill_down(state, req, EventKind::Submit)),
        "filldown.cancel" => Some(handle_fill_down(state, req, EventKind::Cancel)),
        "comment.open" => Some(handle_comment(state, req, EventKind::Open)),
        "comment.submit" => Some(handle_comment(state, req, EventKind::Submit)),
        "comment.cancel" => Some(handle_comment(state, req, EventKind::Cancel)),
        _ => None,
    }
}
