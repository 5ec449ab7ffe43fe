//! Per-cell comment editing. Comments are staged as hidden form fields and
//! only reach the server with the next full grade-form save.

use serde_json::json;
use std::collections::BTreeMap;

use super::effects::{DialogKind, Effect, Outbox};
use super::error::GridError;
use super::model::{CellKey, GridModel};

#[derive(Debug, Default)]
pub struct CommentDialog {
    open: Option<CellKey>,
    staged: BTreeMap<CellKey, String>,
}

impl CommentDialog {
    pub fn staged(&self) -> &BTreeMap<CellKey, String> {
        &self.staged
    }

    /// Open the editor for the cell at `(row, col)`. Only comment columns
    /// carry comments; their field names never collide with score inputs.
    pub fn open(
        &mut self,
        model: &GridModel,
        row: usize,
        col: usize,
        out: &mut Outbox,
    ) -> Result<CellKey, GridError> {
        let (Some(student), Some(activity)) = (model.student_at(row), model.activity_at(col)) else {
            return Err(GridError::not_found("no cell at position")
                .with_details(json!({ "row": row, "col": col })));
        };
        if !activity.comment {
            return Err(GridError::bad_params("column does not take comments")
                .with_details(json!({ "row": row, "col": col, "activityId": activity.id })));
        }
        let key = CellKey::new(activity.id.clone(), student.id.clone());
        let body = self
            .staged
            .get(&key)
            .cloned()
            .or_else(|| model.cell(&key).and_then(|c| c.comment.clone()))
            .unwrap_or_default();
        out.push(Effect::OpenDialog {
            dialog: DialogKind::Comment,
            fields: json!({
                "activityId": activity.id,
                "studentId": student.id,
                "activityTitle": activity.title,
                "studentTitle": student.title,
                "body": body,
            }),
        });
        self.open = Some(key.clone());
        Ok(key)
    }

    /// Stage the edited body as a hidden field. The caller submits the form.
    pub fn submit(&mut self, html: &str, out: &mut Outbox) -> Result<CellKey, GridError> {
        let Some(key) = self.open.take() else {
            return Err(GridError::not_found("comment dialog is not open"));
        };
        out.push(Effect::AppendHiddenField {
            name: key.field_name(),
            value: html.to_string(),
        });
        out.push(Effect::CloseDialog {
            dialog: DialogKind::Comment,
        });
        self.staged.insert(key.clone(), html.to_string());
        Ok(key)
    }

    pub fn cancel(&mut self, out: &mut Outbox) {
        if self.open.take().is_some() {
            out.push(Effect::CloseDialog {
                dialog: DialogKind::Comment,
            });
        }
    }

    /// Forget staged bodies that a successful save carried to the server.
    pub fn committed(&mut self, names: &[String]) {
        self.staged.retain(|k, _| !names.contains(&k.field_name()));
    }

    pub fn reset(&mut self) {
        self.open = None;
        self.staged.clear();
    }
}
