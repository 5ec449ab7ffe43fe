//! Event dispatch.
//!
//! Handlers are registered by name against a (selector, event kind) pair.
//! For one event, handlers whose selector matches the target directly run
//! first, in registration order; document-level handlers run after them, in
//! registration order. A handler returning [`Flow::Stop`] ends propagation.

use serde_json::{json, Value};

use super::controller::{Completion, GridController};
use super::debounce::FireOutcome;
use super::effects::TimerId;
use super::error::GridError;
use super::layout::{LayoutMetrics, ZoomAction};
use super::model::{CellKey, GridData};
use super::navigation::KeyAction;
use super::popup::{HeaderRef, PopupGeometry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    Focus,
    Input,
    KeyDown,
    Blur,
    Scroll,
    Open,
    Change,
    Submit,
    Cancel,
    Measured,
    Zoom,
    Toggle,
    Preload,
    Reload,
    BeforeUnload,
    Confirm,
    TimerFired,
    FetchComplete,
}

/// Where an event happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Cell(CellKey),
    PopupTrigger(HeaderRef),
    /// Inside an open popup menu.
    Popup(HeaderRef),
    GradePane,
    ZoomControl,
    Sidebar,
    FillDown,
    CommentDialog,
    GradeForm,
    Page,
    /// Anywhere else in the document.
    Elsewhere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Cell,
    PopupTrigger,
    GradePane,
    ZoomControl,
    Sidebar,
    FillDown,
    CommentDialog,
    GradeForm,
    Page,
    /// Every target; runs after the target's own handlers.
    Document,
}

impl Selector {
    fn matches(self, target: &Target) -> bool {
        match self {
            Selector::Document => true,
            Selector::Cell => matches!(target, Target::Cell(_)),
            Selector::PopupTrigger => matches!(target, Target::PopupTrigger(_)),
            Selector::GradePane => *target == Target::GradePane,
            Selector::ZoomControl => *target == Target::ZoomControl,
            Selector::Sidebar => *target == Target::Sidebar,
            Selector::FillDown => *target == Target::FillDown,
            Selector::CommentDialog => *target == Target::CommentDialog,
            Selector::GradeForm => *target == Target::GradeForm,
            Selector::Page => *target == Target::Page,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    None,
    Key(String),
    Text(String),
    OptionalText(Option<String>),
    ScrollLeft(f64),
    Geometry(Option<PopupGeometry>),
    Position { row: usize, col: usize },
    Metrics(LayoutMetrics),
    Zoom(ZoomAction),
    Collapsed(bool),
    /// Answer to a confirmation prompt.
    Answer(bool),
    Timer(TimerId),
    Fetch {
        request_id: String,
        ok: bool,
        body: Value,
    },
    Grid(Box<GridData>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub target: Target,
    pub detail: Detail,
}

impl Event {
    pub fn new(kind: EventKind, target: Target) -> Self {
        Self {
            kind,
            target,
            detail: Detail::None,
        }
    }

    pub fn with(mut self, detail: Detail) -> Self {
        self.detail = detail;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub type Handler = fn(&mut GridController, &Event) -> Result<Flow, GridError>;

struct Registration {
    name: &'static str,
    selector: Selector,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
pub struct Dispatcher {
    registrations: Vec<Registration>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.registrations.iter().map(|r| r.name))
            .finish()
    }
}

impl Dispatcher {
    pub fn on(
        &mut self,
        selector: Selector,
        kind: EventKind,
        name: &'static str,
        handler: Handler,
    ) -> &mut Self {
        self.registrations.push(Registration {
            name,
            selector,
            kind,
            handler,
        });
        self
    }

    /// Names of the handlers an event would reach, in run order.
    #[cfg(test)]
    pub fn route(&self, event: &Event) -> Vec<&'static str> {
        self.ordered(event).map(|r| r.name).collect()
    }

    fn ordered<'a>(&'a self, event: &'a Event) -> impl Iterator<Item = &'a Registration> + 'a {
        let direct = self.registrations.iter().filter(move |r| {
            r.kind == event.kind
                && r.selector != Selector::Document
                && r.selector.matches(&event.target)
        });
        let document = self
            .registrations
            .iter()
            .filter(move |r| r.kind == event.kind && r.selector == Selector::Document);
        direct.chain(document)
    }

    /// Run every matching handler. Returns the names of those that ran.
    pub fn dispatch(
        &self,
        ctl: &mut GridController,
        event: &Event,
    ) -> Result<Vec<&'static str>, GridError> {
        let mut ran = Vec::new();
        for reg in self.ordered(event) {
            ran.push(reg.name);
            if (reg.handler)(ctl, event)? == Flow::Stop {
                break;
            }
        }
        tracing::debug!(kind = ?event.kind, handlers = ?ran, "event dispatched");
        Ok(ran)
    }

    /// The handler table the sidecar runs with.
    pub fn standard() -> Self {
        let mut d = Dispatcher::default();
        d.on(Selector::Page, EventKind::Reload, "grid.reload", grid_reload)
            .on(Selector::Page, EventKind::TimerFired, "validation.fire", timer_fire)
            .on(Selector::Page, EventKind::FetchComplete, "fetch.route", fetch_complete)
            .on(Selector::Cell, EventKind::Click, "cell.activate", cell_activate)
            .on(Selector::Cell, EventKind::Focus, "cell.activate", cell_activate)
            .on(Selector::Cell, EventKind::Input, "cell.input", cell_input)
            .on(Selector::Cell, EventKind::KeyDown, "cell.escapeRevert", cell_escape)
            .on(Selector::Cell, EventKind::KeyDown, "cell.navigate", cell_navigate)
            .on(Selector::Cell, EventKind::Blur, "cell.blur", cell_blur)
            .on(Selector::PopupTrigger, EventKind::Click, "popup.toggle", popup_toggle)
            .on(Selector::Page, EventKind::Preload, "popup.preloadAll", popup_preload)
            .on(Selector::GradePane, EventKind::Scroll, "layout.trackScroll", pane_scroll)
            .on(Selector::GradePane, EventKind::Scroll, "popup.hideOnScroll", popup_hide)
            .on(Selector::FillDown, EventKind::Open, "filldown.open", fill_down_open)
            .on(Selector::FillDown, EventKind::Change, "filldown.setValue", fill_down_change)
            .on(Selector::FillDown, EventKind::Submit, "filldown.submit", fill_down_submit)
            .on(Selector::FillDown, EventKind::Cancel, "filldown.cancel", fill_down_cancel)
            .on(Selector::CommentDialog, EventKind::Open, "comment.open", comment_open)
            .on(Selector::CommentDialog, EventKind::Submit, "comment.submit", comment_submit)
            .on(Selector::CommentDialog, EventKind::Cancel, "comment.cancel", comment_cancel)
            .on(Selector::Page, EventKind::Measured, "layout.apply", layout_measured)
            .on(Selector::ZoomControl, EventKind::Zoom, "layout.zoom", layout_zoom)
            .on(Selector::Sidebar, EventKind::Toggle, "layout.sidebar", layout_sidebar)
            .on(Selector::GradeForm, EventKind::Submit, "form.save", form_save)
            .on(Selector::Page, EventKind::BeforeUnload, "guard.unsaved", guard_before_unload)
            .on(Selector::Page, EventKind::Confirm, "guard.confirmSave", guard_confirm_save)
            .on(Selector::Document, EventKind::Click, "popup.hideOnOutsideClick", popup_outside_click);
        d
    }
}

fn missing(what: &str) -> GridError {
    GridError::bad_params(format!("missing {what}"))
}

fn cell_of(event: &Event) -> Result<&CellKey, GridError> {
    match &event.target {
        Target::Cell(key) => Ok(key),
        _ => Err(missing("cell target")),
    }
}

fn grid_reload(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    let Detail::Grid(data) = &event.detail else {
        return Err(missing("grid"));
    };
    ctl.reload(data.as_ref().clone())?;
    ctl.note("generation", json!(ctl.generation()));
    Ok(Flow::Continue)
}

fn timer_fire(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    let Detail::Timer(timer_id) = event.detail else {
        return Err(missing("timerId"));
    };
    match ctl.timer_fired(timer_id) {
        FireOutcome::Dispatched { seq } => ctl.note("seq", json!(seq)),
        FireOutcome::Unchanged => ctl.note("unchanged", json!(true)),
        FireOutcome::Stale => ctl.note("stale", json!(true)),
    }
    Ok(Flow::Continue)
}

fn fetch_complete(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    let Detail::Fetch {
        request_id,
        ok,
        body,
    } = &event.detail
    else {
        return Err(missing("requestId"));
    };
    let completion = ctl.fetch_complete(request_id, *ok, body);
    match completion {
        Completion::Stale => ctl.note("stale", json!(true)),
        Completion::Validation(outcome) => {
            ctl.note("validation", json!(format!("{outcome:?}").to_lowercase()))
        }
        Completion::Saved => ctl.note("saved", json!(true)),
        Completion::SaveFailed => ctl.note("saved", json!(false)),
        Completion::Menu | Completion::Preload => {}
    }
    Ok(Flow::Continue)
}

fn cell_activate(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    ctl.ensure_ready()?;
    let editing = ctl.activate(cell_of(event)?)?;
    ctl.note("editing", json!(editing));
    Ok(Flow::Continue)
}

fn cell_input(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    ctl.ensure_ready()?;
    let Detail::Text(value) = &event.detail else {
        return Err(missing("value"));
    };
    ctl.input(cell_of(event)?, value)?;
    Ok(Flow::Continue)
}

fn key_of(event: &Event) -> Result<KeyAction, GridError> {
    match &event.detail {
        Detail::Key(key) => Ok(KeyAction::from_key(key)),
        _ => Err(missing("key")),
    }
}

fn cell_escape(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    ctl.ensure_ready()?;
    if key_of(event)? != KeyAction::Escape {
        return Ok(Flow::Continue);
    }
    let key = cell_of(event)?;
    ctl.resolve(key)?;
    let reverted = ctl.escape(key);
    ctl.note("reverted", json!(reverted));
    Ok(Flow::Stop)
}

fn cell_navigate(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    ctl.ensure_ready()?;
    let KeyAction::Move(direction) = key_of(event)? else {
        return Ok(Flow::Continue);
    };
    let key = cell_of(event)?;
    ctl.resolve(key)?;
    let moved = ctl.navigate(key, direction);
    ctl.note("moved", json!(moved.map(|k| k.field_name())));
    Ok(Flow::Stop)
}

fn cell_blur(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    let key = cell_of(event)?;
    ctl.resolve(key)?;
    let removed = ctl.blur(key);
    ctl.note("removed", json!(removed));
    Ok(Flow::Continue)
}

fn popup_toggle(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    ctl.ensure_ready()?;
    let Target::PopupTrigger(header) = &event.target else {
        return Err(missing("header"));
    };
    let geometry = match &event.detail {
        Detail::Geometry(g) => *g,
        _ => None,
    };
    let phase = ctl.open_popup(header, geometry.as_ref())?;
    ctl.note("phase", json!(format!("{phase:?}").to_lowercase()));
    // The trigger click must not reach the outside-click handler.
    Ok(Flow::Stop)
}

fn popup_preload(ctl: &mut GridController, _event: &Event) -> Result<Flow, GridError> {
    ctl.ensure_ready()?;
    let started = ctl.preload_popups();
    ctl.note("started", json!(started));
    Ok(Flow::Continue)
}

fn pane_scroll(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    let Detail::ScrollLeft(left) = event.detail else {
        return Err(missing("scrollLeft"));
    };
    ctl.scrolled(left);
    Ok(Flow::Continue)
}

fn popup_hide(ctl: &mut GridController, _event: &Event) -> Result<Flow, GridError> {
    let hidden = ctl.hide_popups();
    ctl.note("hidden", json!(hidden));
    Ok(Flow::Continue)
}

fn popup_outside_click(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    if matches!(event.target, Target::Popup(_) | Target::PopupTrigger(_)) {
        return Ok(Flow::Continue);
    }
    popup_hide(ctl, event)
}

fn fill_down_open(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    ctl.ensure_ready()?;
    let Detail::Text(activity_id) = &event.detail else {
        return Err(missing("activityId"));
    };
    let cells = ctl.fill_down_open(activity_id)?;
    ctl.note("cells", json!(cells));
    Ok(Flow::Continue)
}

fn fill_down_change(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    let Detail::Text(value) = &event.detail else {
        return Err(missing("value"));
    };
    ctl.fill_down_set_value(value)?;
    Ok(Flow::Continue)
}

fn fill_down_submit(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    ctl.ensure_ready()?;
    let value = match &event.detail {
        Detail::OptionalText(v) => v.as_deref(),
        Detail::Text(v) => Some(v.as_str()),
        _ => None,
    };
    let outcome = ctl.fill_down_submit(value)?;
    ctl.note("filled", json!(outcome.filled));
    ctl.note("skipped", json!(outcome.skipped));
    Ok(Flow::Continue)
}

fn fill_down_cancel(ctl: &mut GridController, _event: &Event) -> Result<Flow, GridError> {
    ctl.fill_down_cancel();
    Ok(Flow::Continue)
}

fn comment_open(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    ctl.ensure_ready()?;
    let Detail::Position { row, col } = event.detail else {
        return Err(missing("row/col"));
    };
    let key = ctl.comment_open(row, col)?;
    ctl.note("cell", json!(key.field_name()));
    Ok(Flow::Continue)
}

fn comment_submit(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    ctl.ensure_ready()?;
    let Detail::Text(html) = &event.detail else {
        return Err(missing("html"));
    };
    let key = ctl.comment_submit(html)?;
    ctl.note("cell", json!(key.field_name()));
    Ok(Flow::Continue)
}

fn comment_cancel(ctl: &mut GridController, _event: &Event) -> Result<Flow, GridError> {
    ctl.comment_cancel();
    Ok(Flow::Continue)
}

fn layout_measured(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    let Detail::Metrics(metrics) = &event.detail else {
        return Err(missing("metrics"));
    };
    let plan = ctl.layout_measured(metrics.clone());
    ctl.note("plan", json!(plan));
    Ok(Flow::Continue)
}

fn layout_zoom(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    let Detail::Zoom(action) = event.detail else {
        return Err(missing("action"));
    };
    let changed = ctl.zoom(action);
    ctl.note("changed", json!(changed));
    ctl.note("fontSize", json!(ctl.layout().font_size()));
    Ok(Flow::Continue)
}

fn layout_sidebar(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    let Detail::Collapsed(collapsed) = event.detail else {
        return Err(missing("collapsed"));
    };
    ctl.toggle_sidebar(collapsed);
    Ok(Flow::Continue)
}

fn form_save(ctl: &mut GridController, _event: &Event) -> Result<Flow, GridError> {
    let fields = ctl.save()?;
    ctl.note("fields", json!(fields));
    Ok(Flow::Continue)
}

fn guard_before_unload(ctl: &mut GridController, _event: &Event) -> Result<Flow, GridError> {
    let message = ctl.before_unload().map(str::to_string);
    ctl.note("prompt", json!(message.is_some()));
    ctl.note("message", json!(message));
    Ok(Flow::Continue)
}

fn guard_confirm_save(ctl: &mut GridController, event: &Event) -> Result<Flow, GridError> {
    let Detail::Answer(confirmed) = event.detail else {
        return Err(missing("confirmed"));
    };
    let saved = ctl.confirm_save(confirmed)?;
    ctl.note("saving", json!(saved.is_some()));
    if let Some(fields) = saved {
        ctl.note("fields", json!(fields));
    }
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::grid::effects::Effect;

    fn controller() -> GridController {
        let data: GridData = serde_json::from_value(json!({
            "activities": [
                { "id": "A", "title": "Quiz" },
                { "id": "B", "title": "Notes", "scorable": false },
                { "id": "C", "title": "Test" }
            ],
            "students": [ { "id": "N1", "title": "Ada" }, { "id": "N2", "title": "Brook" } ],
            "cells": [
                { "activityId": "A", "studentId": "N1", "value": "1" },
                { "activityId": "B", "studentId": "N1", "value": "" },
                { "activityId": "C", "studentId": "N1", "value": "3" },
                { "activityId": "A", "studentId": "N2", "value": "" },
                { "activityId": "C", "studentId": "N2", "value": "" }
            ]
        }))
        .expect("grid data");
        let mut ctl = GridController::load(GridConfig::default(), data, false).expect("load");
        ctl.drain();
        ctl
    }

    fn keydown(cell: CellKey, key: &str) -> Event {
        Event::new(EventKind::KeyDown, Target::Cell(cell)).with(Detail::Key(key.to_string()))
    }

    #[test]
    fn route_runs_direct_handlers_before_document() {
        let d = Dispatcher::standard();
        let click = Event::new(EventKind::Click, Target::Cell(CellKey::new("A", "N1")));
        assert_eq!(d.route(&click), vec!["cell.activate", "popup.hideOnOutsideClick"]);

        let keys = keydown(CellKey::new("A", "N1"), "ArrowLeft");
        assert_eq!(d.route(&keys), vec!["cell.escapeRevert", "cell.navigate"]);

        let scroll = Event::new(EventKind::Scroll, Target::GradePane).with(Detail::ScrollLeft(0.0));
        assert_eq!(d.route(&scroll), vec!["layout.trackScroll", "popup.hideOnScroll"]);
    }

    #[test]
    fn registration_order_is_run_order() {
        fn first(ctl: &mut GridController, _: &Event) -> Result<Flow, GridError> {
            ctl.note("order", json!("first"));
            Ok(Flow::Continue)
        }
        fn second(ctl: &mut GridController, _: &Event) -> Result<Flow, GridError> {
            ctl.note("order", json!("second"));
            Ok(Flow::Continue)
        }
        let mut d = Dispatcher::default();
        d.on(Selector::Document, EventKind::Click, "doc", second)
            .on(Selector::Page, EventKind::Click, "page", first);
        let mut ctl = controller();
        let ran = d
            .dispatch(&mut ctl, &Event::new(EventKind::Click, Target::Page))
            .expect("dispatch");
        assert_eq!(ran, vec!["page", "doc"]);
        assert_eq!(ctl.take_notes()["order"], "second");
    }

    #[test]
    fn escape_stops_before_navigation() {
        let d = Dispatcher::standard();
        let mut ctl = controller();
        let a1 = CellKey::new("A", "N1");
        ctl.activate(&a1).expect("activate");
        ctl.input(&a1, "2").expect("input");
        ctl.drain();
        let ran = d.dispatch(&mut ctl, &keydown(a1.clone(), "Escape")).expect("dispatch");
        assert_eq!(ran, vec!["cell.escapeRevert"]);
        assert!(ctl.drain().contains(&Effect::Blur { cell: "A_N1".into() }));
    }

    #[test]
    fn arrow_key_moves_and_reports_target() {
        let d = Dispatcher::standard();
        let mut ctl = controller();
        let c1 = CellKey::new("C", "N1");
        ctl.activate(&c1).expect("activate");
        let ran = d.dispatch(&mut ctl, &keydown(c1, "ArrowLeft")).expect("dispatch");
        assert_eq!(ran, vec!["cell.escapeRevert", "cell.navigate"]);
        assert_eq!(ctl.take_notes()["moved"], "A_N1");
    }

    #[test]
    fn trigger_click_does_not_hide_its_own_popup() {
        let d = Dispatcher::standard();
        let mut ctl = controller();
        let open = Event::new(
            EventKind::Click,
            Target::PopupTrigger(HeaderRef::Activity("A".into())),
        );
        let ran = d.dispatch(&mut ctl, &open).expect("dispatch");
        assert_eq!(ran, vec!["popup.toggle"]);

        let elsewhere = Event::new(EventKind::Click, Target::Elsewhere);
        let ran = d.dispatch(&mut ctl, &elsewhere).expect("dispatch");
        assert_eq!(ran, vec!["popup.hideOnOutsideClick"]);
    }

    #[test]
    fn handler_errors_propagate() {
        let d = Dispatcher::standard();
        let mut ctl = controller();
        let bad = Event::new(EventKind::Input, Target::Cell(CellKey::new("A", "N1")));
        assert_eq!(d.dispatch(&mut ctl, &bad).expect_err("no value").code, "bad_params");
    }
}
