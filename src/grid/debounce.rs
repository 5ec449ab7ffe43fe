//! Debounced score validation.
//!
//! Every keystroke that leaves an input different from its baseline restarts
//! a per-cell timer; only when a timer fires does a `validate` request go out.
//! A dispatched request is never cancelled. Each one carries a per-cell
//! sequence number and the value it asked about. With `discard_stale` set a
//! response is applied only when it is newer than the last one applied to
//! that cell, the input still holds the validated value and no later
//! keystroke is waiting on its own timer.

use serde_json::json;
use std::collections::HashMap;

use super::contract::ValidateResponse;
use super::effects::{Effect, Outbox, PendingRequest, TimerId};
use super::model::{CellKey, GridModel};

#[derive(Debug, Clone, Copy, Default)]
struct SeqState {
    issued: u64,
    applied: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Dispatched { seq: u64 },
    /// Value had returned to its baseline by the time the timer fired.
    Unchanged,
    /// Timer was cancelled, superseded or belongs to a previous load.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Superseded,
    NoInput,
    Failed,
}

#[derive(Debug)]
pub struct Debouncer {
    delay_ms: u64,
    discard_stale: bool,
    pending: HashMap<CellKey, TimerId>,
    timers: HashMap<TimerId, CellKey>,
    seqs: HashMap<CellKey, SeqState>,
}

impl Debouncer {
    pub fn new(delay_ms: u64, discard_stale: bool) -> Self {
        Self {
            delay_ms,
            discard_stale,
            pending: HashMap::new(),
            timers: HashMap::new(),
            seqs: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn pending_timer(&self, key: &CellKey) -> Option<TimerId> {
        self.pending.get(key).copied()
    }

    pub fn keystroke(&mut self, key: &CellKey, differs: bool, out: &mut Outbox) {
        self.cancel(key, out);
        if differs {
            let timer_id = out.schedule_timer(self.delay_ms);
            self.pending.insert(key.clone(), timer_id);
            self.timers.insert(timer_id, key.clone());
            tracing::trace!(cell = %key.field_name(), timer_id, "validation scheduled");
        } else if self.discard_stale {
            // Anything still in flight describes a value that is gone.
            let seq = self.seqs.entry(key.clone()).or_default();
            seq.applied = seq.issued;
        }
    }

    pub fn cancel(&mut self, key: &CellKey, out: &mut Outbox) -> bool {
        let Some(timer_id) = self.pending.remove(key) else {
            return false;
        };
        self.timers.remove(&timer_id);
        out.cancel_timer(timer_id);
        tracing::trace!(cell = %key.field_name(), timer_id, "validation timer cancelled");
        true
    }

    pub fn fire(&mut self, timer_id: TimerId, model: &GridModel, out: &mut Outbox) -> FireOutcome {
        let Some(key) = self.timers.remove(&timer_id) else {
            return FireOutcome::Stale;
        };
        self.pending.remove(&key);

        let Some(cell) = model.cell(&key) else {
            return FireOutcome::Stale;
        };
        let Some(value) = cell.input.clone() else {
            return FireOutcome::Stale;
        };
        if cell.is_unchanged() {
            return FireOutcome::Unchanged;
        }

        let seq = {
            let state = self.seqs.entry(key.clone()).or_default();
            state.issued += 1;
            state.issued
        };
        out.fetch(
            PendingRequest::Validation {
                cell: key.clone(),
                seq,
                value: value.clone(),
            },
            "validate",
            json!({ "activityId": key.activity_id, "score": value }),
        );
        tracing::trace!(cell = %key.field_name(), seq, "validation dispatched");
        FireOutcome::Dispatched { seq }
    }

    pub fn apply(
        &mut self,
        key: &CellKey,
        seq: u64,
        validated: &str,
        response: Option<&ValidateResponse>,
        model: &mut GridModel,
        out: &mut Outbox,
    ) -> ApplyOutcome {
        let Some(response) = response else {
            return ApplyOutcome::Failed;
        };
        let Some(cell) = model.cell_mut(key) else {
            return ApplyOutcome::NoInput;
        };
        let Some(input) = cell.input.as_mut() else {
            return ApplyOutcome::NoInput;
        };
        let state = self.seqs.entry(key.clone()).or_default();
        if self.discard_stale {
            let edited = input.as_str() != validated || self.pending.contains_key(key);
            if seq <= state.applied || edited {
                tracing::trace!(
                    cell = %key.field_name(),
                    seq,
                    applied = state.applied,
                    edited,
                    "stale validation discarded"
                );
                return ApplyOutcome::Superseded;
            }
        }
        state.applied = state.applied.max(seq);

        if let Some(score) = response.normalized_score() {
            if *input != score {
                *input = score.clone();
                out.push(Effect::SetValue {
                    cell: key.field_name(),
                    value: score,
                });
            }
        }
        let verdict = response.verdict();
        cell.verdict = verdict;
        out.push(Effect::set_class(key, verdict));
        ApplyOutcome::Applied
    }

    /// Drop every pending timer, e.g. when the grid is reloaded.
    pub fn reset(&mut self, out: &mut Outbox) {
        let mut timers: Vec<TimerId> = self.timers.keys().copied().collect();
        timers.sort_unstable();
        for timer_id in timers {
            out.cancel_timer(timer_id);
        }
        self.pending.clear();
        self.timers.clear();
        self.seqs.clear();
    }
}
