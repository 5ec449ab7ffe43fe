use serde::Serialize;
use serde_json::json;

use super::debounce::Debouncer;
use super::editor;
use super::effects::{DialogKind, Effect, Outbox};
use super::error::GridError;
use super::model::{CellKey, GridModel};

#[derive(Debug, Clone)]
pub struct FillDownSelection {
    pub activity_id: String,
    pub cells: Vec<CellKey>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillOutcome {
    pub filled: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct FillDownDialog {
    selection: Option<FillDownSelection>,
    value: String,
}

impl FillDownDialog {
    pub fn is_open(&self) -> bool {
        self.selection.is_some()
    }

    #[cfg(test)]
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn open(
        &mut self,
        model: &GridModel,
        activity_id: &str,
        out: &mut Outbox,
    ) -> Result<usize, GridError> {
        let Some(activity) = model.activity(activity_id) else {
            return Err(GridError::not_found("unknown activity")
                .with_details(json!({ "activityId": activity_id })));
        };
        if !activity.is_scorable() {
            return Err(GridError::new("not_scorable", "fill-down needs a scorable column")
                .with_details(json!({ "activityId": activity_id })));
        }
        let cells = model.column_keys(activity_id);
        let count = cells.len();
        out.push(Effect::OpenDialog {
            dialog: DialogKind::FillDown,
            fields: json!({
                "activityId": activity.id,
                "title": activity.title,
                "cells": count,
            }),
        });
        self.selection = Some(FillDownSelection {
            activity_id: activity_id.to_string(),
            cells,
        });
        self.value.clear();
        Ok(count)
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
    }

    /// Write `value` (or the typed value) into every captured cell that is
    /// empty right now, running each through the normal validation path.
    /// A reload always cancels the dialog, so the captured cells belong to
    /// the current grid.
    pub fn submit(
        &mut self,
        value: Option<&str>,
        model: &mut GridModel,
        debouncer: &mut Debouncer,
        out: &mut Outbox,
    ) -> Result<FillOutcome, GridError> {
        let Some(selection) = self.selection.as_ref() else {
            return Err(GridError::not_found("fill-down dialog is not open"));
        };
        let value = value.unwrap_or(self.value.as_str()).to_string();
        if value.trim().is_empty() {
            return Ok(FillOutcome::default());
        }

        let mut outcome = FillOutcome::default();
        for key in &selection.cells {
            let empty = model
                .cell(key)
                .map(|c| c.current_value().trim().is_empty())
                .unwrap_or(false);
            if !empty || !model.is_scorable(key) {
                outcome.skipped += 1;
                continue;
            }
            if editor::get_input(model, key, out).is_none() {
                outcome.skipped += 1;
                continue;
            }
            let differs = editor::set_value(model, key, &value).unwrap_or(false);
            out.push(Effect::SetValue {
                cell: key.field_name(),
                value: value.clone(),
            });
            debouncer.keystroke(key, differs, out);
            let unchanged = model.cell(key).map(|c| c.is_unchanged()).unwrap_or(false);
            if unchanged {
                debouncer.cancel(key, out);
                editor::remove_input(model, key, out);
            }
            outcome.filled += 1;
        }

        if let Some(selection) = self.selection.take() {
            tracing::debug!(
                activity = %selection.activity_id,
                filled = outcome.filled,
                skipped = outcome.skipped,
                "fill-down applied"
            );
        }
        self.value.clear();
        out.push(Effect::CloseDialog {
            dialog: DialogKind::FillDown,
        });
        Ok(outcome)
    }

    pub fn cancel(&mut self, out: &mut Outbox) {
        self.value.clear();
        out.push(Effect::SetDialogField {
            dialog: DialogKind::FillDown,
            field: "value".to_string(),
            value: String::new(),
        });
        if self.selection.take().is_some() {
            out.push(Effect::CloseDialog {
                dialog: DialogKind::FillDown,
            });
        }
    }
}
