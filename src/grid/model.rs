//! Grid model accessor.
//!
//! Rows are students and columns are activities. Body cells resolve to their
//! headers through an id mapping table built once per load, so header lookups
//! never depend on where a cell happens to sit in the rendered table.
//! Every lookup is read-only and answers `None` for anything it cannot resolve.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};

use super::error::GridError;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellKey {
    pub activity_id: String,
    pub student_id: String,
}

impl CellKey {
    pub fn new(activity_id: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            student_id: student_id.into(),
        }
    }

    /// Form field name of the cell's input: `{activity_id}_{student_id}`.
    pub fn field_name(&self) -> String {
        format!("{}_{}", self.activity_id, self.student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub title: String,
    #[serde(default = "default_true")]
    pub scorable: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Discrete/ranged rule descriptor. Only the server interprets it.
    #[serde(default)]
    pub score_rule: Option<serde_json::Value>,
    #[serde(default)]
    pub comment: bool,
    #[serde(default = "default_true")]
    pub menu: bool,
}

impl Activity {
    pub fn is_scorable(&self) -> bool {
        self.scorable && !self.comment
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub title: String,
    #[serde(default = "default_true")]
    pub menu: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalColumn {
    pub id: String,
    pub title: String,
    #[serde(default = "default_true")]
    pub menu: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub activity_id: String,
    pub student_id: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub comment: Option<String>,
    /// Server's view of the stored value. `false` highlights it on load.
    #[serde(default)]
    pub is_valid: Option<bool>,
}

/// Grid payload delivered by the page on load and reload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridData {
    pub activities: Vec<Activity>,
    pub students: Vec<Student>,
    #[serde(default)]
    pub totals: Vec<TotalColumn>,
    #[serde(default)]
    pub cells: Vec<CellData>,
    /// Whether the students column header carries a name menu.
    #[serde(default = "default_true")]
    pub name_menu: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    #[default]
    None,
    Valid,
    Error,
    ExtraCredit,
}

impl Verdict {
    pub fn css_class(self) -> &'static str {
        match self {
            Verdict::None => "default_bg",
            Verdict::Valid => "changed_bg",
            Verdict::Error => "error_bg",
            Verdict::ExtraCredit => "warning_bg",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Display text; also the last server-confirmed value.
    pub text: String,
    /// Baseline captured when the input was built. Present iff `input` is.
    pub original: Option<String>,
    /// Current value of the editable input, when one exists.
    pub input: Option<String>,
    pub verdict: Verdict,
    /// Styling of the stored value, restored whenever the input goes back to it.
    pub baseline_verdict: Verdict,
    pub comment: Option<String>,
}

impl Cell {
    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Value the user currently sees in the cell.
    pub fn current_value(&self) -> &str {
        self.input.as_deref().unwrap_or(&self.text)
    }

    pub fn is_unchanged(&self) -> bool {
        match (&self.input, &self.original) {
            (Some(v), Some(o)) => v == o,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GridModel {
    activities: Vec<Activity>,
    students: Vec<Student>,
    totals: Vec<TotalColumn>,
    name_menu: bool,
    activity_cols: HashMap<String, usize>,
    student_rows: HashMap<String, usize>,
    cells: HashMap<CellKey, Cell>,
}

impl GridModel {
    pub fn from_data(data: GridData) -> Result<Self, GridError> {
        let mut activity_cols = HashMap::with_capacity(data.activities.len());
        for (col, a) in data.activities.iter().enumerate() {
            if activity_cols.insert(a.id.clone(), col).is_some() {
                return Err(GridError::bad_params("duplicate activity id")
                    .with_details(json!({ "activityId": a.id })));
            }
        }
        let mut student_rows = HashMap::with_capacity(data.students.len());
        for (row, s) in data.students.iter().enumerate() {
            if student_rows.insert(s.id.clone(), row).is_some() {
                return Err(GridError::bad_params("duplicate student id")
                    .with_details(json!({ "studentId": s.id })));
            }
        }
        let mut seen_totals = HashSet::new();
        for t in &data.totals {
            if !seen_totals.insert(t.id.as_str()) {
                return Err(GridError::bad_params("duplicate total id")
                    .with_details(json!({ "totalId": t.id })));
            }
        }

        let mut cells = HashMap::with_capacity(data.cells.len());
        for c in data.cells {
            if !activity_cols.contains_key(&c.activity_id)
                || !student_rows.contains_key(&c.student_id)
            {
                return Err(GridError::bad_params("cell references unknown header").with_details(
                    json!({ "activityId": c.activity_id, "studentId": c.student_id }),
                ));
            }
            let baseline_verdict = match c.is_valid {
                Some(false) if !c.value.trim().is_empty() => Verdict::Error,
                _ => Verdict::None,
            };
            cells.insert(
                CellKey::new(c.activity_id, c.student_id),
                Cell {
                    text: c.value,
                    comment: c.comment,
                    verdict: baseline_verdict,
                    baseline_verdict,
                    ..Cell::default()
                },
            );
        }

        Ok(Self {
            activities: data.activities,
            students: data.students,
            totals: data.totals,
            name_menu: data.name_menu,
            activity_cols,
            student_rows,
            cells,
        })
    }

    pub fn row_count(&self) -> usize {
        self.students.len()
    }

    pub fn col_count(&self) -> usize {
        self.activities.len()
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn totals(&self) -> &[TotalColumn] {
        &self.totals
    }

    pub fn has_name_menu(&self) -> bool {
        self.name_menu
    }

    pub fn activity(&self, activity_id: &str) -> Option<&Activity> {
        self.activity_cols
            .get(activity_id)
            .and_then(|&c| self.activities.get(c))
    }

    pub fn activity_at(&self, col: usize) -> Option<&Activity> {
        self.activities.get(col)
    }

    pub fn student_at(&self, row: usize) -> Option<&Student> {
        self.students.get(row)
    }

    pub fn column_header(&self, key: &CellKey) -> Option<&Activity> {
        self.activity(&key.activity_id)
    }

    pub fn row_header(&self, key: &CellKey) -> Option<&Student> {
        self.student_rows
            .get(&key.student_id)
            .and_then(|&r| self.students.get(r))
    }

    /// `(row, col)` of a cell, whether or not the cell carries data.
    pub fn position(&self, key: &CellKey) -> Option<(usize, usize)> {
        let row = *self.student_rows.get(&key.student_id)?;
        let col = *self.activity_cols.get(&key.activity_id)?;
        Some((row, col))
    }

    /// Key of the cell at a position. Missing cells and out-of-range
    /// positions both answer `None`.
    pub fn cell_at(&self, row: usize, col: usize) -> Option<CellKey> {
        let student = self.students.get(row)?;
        let activity = self.activities.get(col)?;
        let key = CellKey::new(activity.id.clone(), student.id.clone());
        self.cells.contains_key(&key).then_some(key)
    }

    pub fn is_scorable(&self, key: &CellKey) -> bool {
        self.cells.contains_key(key)
            && self
                .column_header(key)
                .map(Activity::is_scorable)
                .unwrap_or(false)
    }

    pub fn cell(&self, key: &CellKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub(crate) fn cell_mut(&mut self, key: &CellKey) -> Option<&mut Cell> {
        self.cells.get_mut(key)
    }

    /// Present body cells of one column, in row order.
    pub fn column_keys(&self, activity_id: &str) -> Vec<CellKey> {
        let Some(&col) = self.activity_cols.get(activity_id) else {
            return Vec::new();
        };
        (0..self.students.len())
            .filter_map(|row| self.cell_at(row, col))
            .collect()
    }

    pub fn has_inputs(&self) -> bool {
        self.cells.values().any(Cell::has_input)
    }

    /// Cells holding an input, ordered by row then column.
    pub fn input_keys(&self) -> Vec<CellKey> {
        self.keys_where(Cell::has_input)
    }

    /// Cells currently styled as anything but the default, in row order.
    pub fn highlighted_keys(&self) -> Vec<CellKey> {
        self.keys_where(|c| c.verdict != Verdict::None)
    }

    fn keys_where(&self, pred: impl Fn(&Cell) -> bool) -> Vec<CellKey> {
        let mut keys: Vec<(usize, usize, CellKey)> = self
            .cells
            .iter()
            .filter(|(_, c)| pred(c))
            .filter_map(|(k, _)| self.position(k).map(|(r, c)| (r, c, k.clone())))
            .collect();
        keys.sort();
        keys.into_iter().map(|(_, _, k)| k).collect()
    }
}
