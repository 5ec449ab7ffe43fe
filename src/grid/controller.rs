//! The single owner of a loaded grid and everything that hangs off it.
//!
//! A controller lives from `grid.load` until the sidecar exits. Reloads keep
//! the controller but bump its generation, so every timer and fetch issued
//! against older data resolves as stale.

use serde_json::{json, Map, Value};

use super::comment::CommentDialog;
use super::contract::{preload_markup, MenuContent, ValidateResponse};
use super::debounce::{ApplyOutcome, Debouncer, FireOutcome};
use super::editor;
use super::effects::{Effect, Outbox, PendingRequest, PreloadSlot, TimerId};
use super::error::GridError;
use super::fill_down::{FillDownDialog, FillOutcome};
use super::layout::{LayoutEngine, LayoutMetrics, LayoutPlan, ZoomAction};
use super::model::{CellKey, GridData, GridModel, Verdict};
use super::navigation::{self, Direction};
use super::popup::{HeaderRef, MenuPhase, PopupGeometry, PopupManager};
use crate::config::GridConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Waiting on page preloads; cell events are refused.
    Preloading { outstanding: Vec<PreloadSlot> },
    Ready,
}

/// What a `fetch.complete` turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Validation(ApplyOutcome),
    Menu,
    Preload,
    Saved,
    SaveFailed,
    /// Unknown request id, or one issued before the last reload.
    Stale,
}

#[derive(Debug)]
pub struct GridController {
    config: GridConfig,
    generation: u64,
    phase: Phase,
    model: GridModel,
    current: Option<CellKey>,
    debouncer: Debouncer,
    popups: PopupManager,
    fill_down: FillDownDialog,
    comments: CommentDialog,
    layout: LayoutEngine,
    guard_suppressed: bool,
    out: Outbox,
    notes: Map<String, Value>,
}

impl GridController {
    /// Build a controller for freshly loaded grid data.
    ///
    /// With `preload` set, the fill-down and comment-cell markup is fetched
    /// first and the grid only becomes interactive once both fetches settle.
    pub fn load(config: GridConfig, data: GridData, preload: bool) -> Result<Self, GridError> {
        config.validate()?;
        let model = GridModel::from_data(data)?;
        let mut ctl = Self {
            debouncer: Debouncer::new(
                config.validation.debounce_ms,
                config.validation.discard_stale,
            ),
            layout: LayoutEngine::new(config.zoom),
            config,
            generation: 1,
            phase: Phase::Ready,
            model,
            current: None,
            popups: PopupManager::default(),
            fill_down: FillDownDialog::default(),
            comments: CommentDialog::default(),
            guard_suppressed: false,
            out: Outbox::default(),
            notes: Map::new(),
        };
        tracing::info!(
            rows = ctl.model.row_count(),
            cols = ctl.model.col_count(),
            preload,
            "grid loaded"
        );
        if preload {
            let outstanding = vec![PreloadSlot::FillDown, PreloadSlot::CommentCell];
            for slot in &outstanding {
                ctl.out.fetch(
                    PendingRequest::Preload { slot: *slot },
                    slot.endpoint(),
                    json!({}),
                );
            }
            ctl.phase = Phase::Preloading { outstanding };
        } else {
            ctl.become_ready();
        }
        Ok(ctl)
    }

    /// Replace the grid data. Inputs, timers, in-flight requests and open
    /// dialogs from the previous data are all dropped.
    pub fn reload(&mut self, data: GridData) -> Result<(), GridError> {
        let model = GridModel::from_data(data)?;
        self.debouncer.reset(&mut self.out);
        self.out.forget_grid_requests();
        self.popups.hide_all(&mut self.out);
        self.fill_down.cancel(&mut self.out);
        self.comments.cancel(&mut self.out);
        self.comments.reset();
        self.model = model;
        self.current = None;
        self.guard_suppressed = false;
        self.generation += 1;
        tracing::info!(
            generation = self.generation,
            rows = self.model.row_count(),
            cols = self.model.col_count(),
            "grid reloaded"
        );
        self.become_ready();
        Ok(())
    }

    fn become_ready(&mut self) {
        self.phase = Phase::Ready;
        self.popups.register(&self.model, &mut self.out);
        for key in self.model.highlighted_keys() {
            let verdict = self.model.cell(&key).map(|c| c.verdict).unwrap_or_default();
            self.out.push(Effect::set_class(&key, verdict));
        }
        self.out.push(Effect::GridReady);
        self.layout.request_measure(&mut self.out);
        if self.config.popups.eager_preload {
            let started = self.popups.preload_all(&mut self.out);
            tracing::debug!(started, "popup menus preloaded");
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn model(&self) -> &GridModel {
        &self.model
    }

    pub fn current(&self) -> Option<&CellKey> {
        self.current.as_ref()
    }

    pub fn popups(&self) -> &PopupManager {
        &self.popups
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn in_flight(&self) -> usize {
        self.out.in_flight()
    }

    pub fn ensure_ready(&self) -> Result<(), GridError> {
        match &self.phase {
            Phase::Ready => Ok(()),
            Phase::Preloading { outstanding } => Err(GridError::new(
                "not_ready",
                "grid is waiting on page preloads",
            )
            .with_details(json!({ "outstanding": outstanding }))),
        }
    }

    /// Resolve a cell reference from the host, refusing ids the grid lacks.
    pub fn resolve(&self, key: &CellKey) -> Result<(), GridError> {
        match (self.model.column_header(key), self.model.row_header(key)) {
            (Some(_), Some(_)) => Ok(()),
            _ => Err(GridError::not_found("unknown cell").with_details(json!({
                "activityId": key.activity_id,
                "studentId": key.student_id
            }))),
        }
    }

    /// Record a method-specific result field for the current response.
    pub fn note(&mut self, key: &str, value: Value) {
        self.notes.insert(key.to_string(), value);
    }

    pub fn take_notes(&mut self) -> Map<String, Value> {
        std::mem::take(&mut self.notes)
    }

    pub fn drain(&mut self) -> Vec<Effect> {
        self.out.drain()
    }

    // Cell editing

    /// Click or focus on a cell. Returns whether the cell now holds an input.
    pub fn activate(&mut self, key: &CellKey) -> Result<bool, GridError> {
        self.resolve(key)?;
        if !self.model.is_scorable(key) {
            return Ok(false);
        }
        if let Some(previous) = self.current.clone() {
            if previous != *key {
                self.blur(&previous);
            }
        }
        if editor::get_input(&mut self.model, key, &mut self.out).is_none() {
            return Ok(false);
        }
        self.out.push(Effect::SelectAll {
            cell: key.field_name(),
        });
        self.current = Some(key.clone());
        Ok(true)
    }

    /// A keystroke changed the input's value.
    pub fn input(&mut self, key: &CellKey, value: &str) -> Result<(), GridError> {
        self.resolve(key)?;
        if !self.model.is_scorable(key) {
            return Err(GridError::new("not_scorable", "cell does not accept scores")
                .with_details(json!({ "cell": key.field_name() })));
        }
        if self.model.cell(key).map(|c| c.has_input()) != Some(true) {
            editor::get_input(&mut self.model, key, &mut self.out);
        }
        let differs = editor::set_value(&mut self.model, key, value).unwrap_or(false);
        if !differs {
            if let Some(cell) = self.model.cell_mut(key) {
                if cell.verdict != cell.baseline_verdict {
                    cell.verdict = cell.baseline_verdict;
                    self.out.push(Effect::set_class(key, cell.baseline_verdict));
                }
            }
        }
        self.debouncer.keystroke(key, differs, &mut self.out);
        self.current = Some(key.clone());
        Ok(())
    }

    /// Focus left the cell. The input goes away only if nothing changed.
    pub fn blur(&mut self, key: &CellKey) -> bool {
        if self.current.as_ref() == Some(key) {
            self.current = None;
        }
        let unchanged = self
            .model
            .cell(key)
            .map(|c| c.has_input() && c.is_unchanged())
            .unwrap_or(false);
        if !unchanged {
            return false;
        }
        self.debouncer.cancel(key, &mut self.out);
        editor::remove_input(&mut self.model, key, &mut self.out)
    }

    /// Revert to the baseline and leave the cell without validating.
    pub fn escape(&mut self, key: &CellKey) -> bool {
        if !editor::revert_value(&mut self.model, key, &mut self.out) {
            return false;
        }
        self.debouncer.keystroke(key, false, &mut self.out);
        self.out.push(Effect::Blur {
            cell: key.field_name(),
        });
        self.blur(key);
        true
    }

    /// Move from `from` towards `direction`. `None` leaves focus where it is.
    pub fn navigate(&mut self, from: &CellKey, direction: Direction) -> Option<CellKey> {
        let target = navigation::scan(&self.model, from, direction)?;
        self.blur(from);
        editor::get_input(&mut self.model, &target, &mut self.out)?;
        self.out.push(Effect::SelectAll {
            cell: target.field_name(),
        });
        self.current = Some(target.clone());
        if let Some((_, col)) = self.model.position(&target) {
            if let Some(scroll_left) = self.layout.reveal_column(col) {
                self.out.push(Effect::SetScrollLeft { scroll_left });
                self.popups.hide_all(&mut self.out);
            }
        }
        Some(target)
    }

    // Host callbacks

    pub fn timer_fired(&mut self, timer_id: TimerId) -> FireOutcome {
        self.debouncer.fire(timer_id, &self.model, &mut self.out)
    }

    pub fn fetch_complete(&mut self, request_id: &str, ok: bool, body: &Value) -> Completion {
        let Some(pending) = self.out.take_request(request_id) else {
            tracing::debug!(request_id, "completion for unknown request");
            return Completion::Stale;
        };
        if !ok {
            tracing::warn!(request_id, ?pending, "fetch failed");
        }
        match pending {
            PendingRequest::Validation { cell, seq, value } => {
                let response = if ok {
                    match serde_json::from_value::<ValidateResponse>(body.clone()) {
                        Ok(r) => Some(r),
                        Err(e) => {
                            tracing::warn!(cell = %cell.field_name(), error = %e, "malformed validation response");
                            None
                        }
                    }
                } else {
                    None
                };
                let outcome = self.debouncer.apply(
                    &cell,
                    seq,
                    &value,
                    response.as_ref(),
                    &mut self.model,
                    &mut self.out,
                );
                Completion::Validation(outcome)
            }
            PendingRequest::Menu { header } => {
                let content = if ok {
                    match serde_json::from_value::<MenuContent>(body.clone()) {
                        Ok(c) => Some(c),
                        Err(e) => {
                            tracing::warn!(endpoint = header.endpoint(), error = %e, "malformed menu content");
                            None
                        }
                    }
                } else {
                    None
                };
                self.popups.loaded(&header, content, &mut self.out);
                Completion::Menu
            }
            PendingRequest::Preload { slot } => {
                if ok {
                    if let Some(html) = preload_markup(body) {
                        self.out.push(Effect::InsertMarkup { slot, html });
                    }
                }
                self.preload_settled(slot);
                Completion::Preload
            }
            PendingRequest::Submit { scores, comments } => {
                if !ok {
                    return Completion::SaveFailed;
                }
                self.commit(&scores, &comments);
                Completion::Saved
            }
        }
    }

    fn preload_settled(&mut self, slot: PreloadSlot) {
        let done = match &mut self.phase {
            Phase::Preloading { outstanding } => {
                outstanding.retain(|s| *s != slot);
                outstanding.is_empty()
            }
            Phase::Ready => false,
        };
        if done {
            self.become_ready();
        }
    }

    /// A save went through: submitted values become the new baselines.
    fn commit(&mut self, scores: &[(CellKey, String)], comments: &[String]) {
        for (key, value) in scores {
            let Some(cell) = self.model.cell_mut(key) else {
                continue;
            };
            let moved = cell.text != *value;
            cell.text = value.clone();
            if cell.input.is_none() {
                // Reverted after submitting; the page still shows the old text.
                if moved {
                    self.out.push(Effect::ShowText {
                        cell: key.field_name(),
                        text: value.clone(),
                    });
                    cell.baseline_verdict = Verdict::None;
                    if cell.verdict != Verdict::None {
                        cell.verdict = Verdict::None;
                        self.out.push(Effect::set_class(key, Verdict::None));
                    }
                }
                continue;
            }
            cell.original = Some(value.clone());
            cell.baseline_verdict = match cell.verdict {
                Verdict::Error => Verdict::Error,
                _ => Verdict::None,
            };
            let unchanged = cell.is_unchanged();
            if unchanged && self.current.as_ref() != Some(key) {
                self.debouncer.cancel(key, &mut self.out);
                editor::remove_input(&mut self.model, key, &mut self.out);
            }
        }
        self.comments.committed(comments);
        tracing::info!(scores = scores.len(), comments = comments.len(), "grades saved");
    }

    // Popups

    pub fn open_popup(
        &mut self,
        header: &HeaderRef,
        geometry: Option<&PopupGeometry>,
    ) -> Result<MenuPhase, GridError> {
        self.popups.open(header, geometry, &mut self.out)
    }

    pub fn preload_popups(&mut self) -> usize {
        self.popups.preload_all(&mut self.out)
    }

    pub fn hide_popups(&mut self) -> usize {
        self.popups.hide_all(&mut self.out)
    }

    pub fn scrolled(&mut self, scroll_left: f64) {
        self.layout.scrolled(scroll_left);
    }

    // Fill-down

    pub fn fill_down_open(&mut self, activity_id: &str) -> Result<usize, GridError> {
        self.fill_down
            .open(&self.model, activity_id, &mut self.out)
    }

    pub fn fill_down_set_value(&mut self, value: &str) -> Result<(), GridError> {
        if !self.fill_down.is_open() {
            return Err(GridError::not_found("fill-down dialog is not open"));
        }
        self.fill_down.set_value(value);
        Ok(())
    }

    pub fn fill_down_submit(&mut self, value: Option<&str>) -> Result<FillOutcome, GridError> {
        let outcome = self.fill_down.submit(
            value,
            &mut self.model,
            &mut self.debouncer,
            &mut self.out,
        )?;
        if let Some(current) = self.current.clone() {
            if self.model.cell(&current).map(|c| c.has_input()) != Some(true) {
                self.current = None;
            }
        }
        Ok(outcome)
    }

    pub fn fill_down_cancel(&mut self) {
        self.fill_down.cancel(&mut self.out);
    }

    // Comments

    pub fn comment_open(&mut self, row: usize, col: usize) -> Result<CellKey, GridError> {
        self.comments.open(&self.model, row, col, &mut self.out)
    }

    /// Stage the comment and submit the grade form with it.
    pub fn comment_submit(&mut self, html: &str) -> Result<CellKey, GridError> {
        let key = self.comments.submit(html, &mut self.out)?;
        self.save()?;
        Ok(key)
    }

    pub fn comment_cancel(&mut self) {
        self.comments.cancel(&mut self.out);
    }

    // Layout

    pub fn layout_measured(&mut self, metrics: LayoutMetrics) -> LayoutPlan {
        self.layout.measured(metrics, &mut self.out)
    }

    pub fn zoom(&mut self, action: ZoomAction) -> bool {
        self.layout.zoom(action, &mut self.out)
    }

    pub fn toggle_sidebar(&mut self, collapsed: bool) {
        self.layout.toggle_sidebar(collapsed, &mut self.out);
    }

    // Grade form

    /// Submit every open input and staged comment. Returns the field count.
    pub fn save(&mut self) -> Result<usize, GridError> {
        let scores: Vec<(CellKey, String)> = self
            .model
            .input_keys()
            .into_iter()
            .filter_map(|key| {
                let value = self.model.cell(&key)?.input.clone()?;
                Some((key, value))
            })
            .collect();
        let comments: Vec<(String, String)> = self
            .comments
            .staged()
            .iter()
            .map(|(key, body)| (key.field_name(), body.clone()))
            .collect();

        let mut fields = Map::new();
        for (key, value) in &scores {
            fields.insert(key.field_name(), Value::String(value.clone()));
        }
        for (name, body) in &comments {
            if fields.contains_key(name) {
                return Err(GridError::new(
                    "field_conflict",
                    "a comment and a score share one form field",
                )
                .with_details(json!({ "field": name })));
            }
            fields.insert(name.clone(), Value::String(body.clone()));
        }
        self.guard_suppressed = true;
        let count = fields.len();
        self.out.fetch(
            PendingRequest::Submit {
                scores,
                comments: comments.into_iter().map(|(name, _)| name).collect(),
            },
            "grades.submit",
            json!({ "fields": fields }),
        );
        tracing::info!(fields = count, "grade form submitted");
        Ok(count)
    }

    /// The prompt to show before leaving the page, if any.
    pub fn before_unload(&self) -> Option<&str> {
        if self.guard_suppressed || !self.model.has_inputs() {
            return None;
        }
        Some(self.config.guard.warning_text.as_str())
    }

    /// The user answered the leave prompt. Accepting saves the form; the
    /// answer is ignored when nothing was prompted for.
    pub fn confirm_save(&mut self, confirmed: bool) -> Result<Option<usize>, GridError> {
        if !confirmed || self.before_unload().is_none() {
            return Ok(None);
        }
        self.save().map(Some)
    }
}
