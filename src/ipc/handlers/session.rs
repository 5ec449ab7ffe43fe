use crate::grid::dispatch::{Detail, Event, EventKind, Target};
use crate::grid::error::GridError;
use crate::ipc::handlers::{dispatch, str_param, typed_param};
use crate::ipc::types::{AppState, Request};

fn handle_timer_fire(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |req| {
        let timer_id: u64 = typed_param(req, "timerId")?;
        Ok(Event::new(EventKind::TimerFired, Target::Page).with(Detail::Timer(timer_id)))
    })
}

fn handle_fetch_complete(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |req| {
        let request_id = str_param(req, "requestId")?.to_string();
        let ok = req
            .params
            .get("ok")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| GridError::bad_params("missing params.ok"))?;
        let body = req.params.get("body").cloned().unwrap_or_default();
        Ok(
            Event::new(EventKind::FetchComplete, Target::Page).with(Detail::Fetch {
                request_id,
                ok,
                body,
            }),
        )
    })
}

fn handle_form_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |_| {
        Ok(Event::new(EventKind::Submit, Target::GradeForm))
    })
}

fn handle_before_unload(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |_| {
        Ok(Event::new(EventKind::BeforeUnload, Target::Page))
    })
}

fn handle_confirm_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    dispatch(state, req, |req| {
        let confirmed: bool = typed_param(req, "confirmed")?;
        Ok(Event::new(EventKind::Confirm, Target::Page).with(Detail::Answer(confirmed)))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timer.fire" => Some(handle_timer_fire(state, req)),
        "fetch.complete" => Some(handle_fetch_complete(state, req)),
        "form.save" => Some(handle_form_save(state, req)),
        "page.beforeUnload" => Some(handle_before_unload(state, req)),
        "page.confirmSave" => Some(handle_confirm_save(state, req)),
        _ => None,
    }
}
