//! Pane widths, margins and horizontal scroll of the grade pane.
//!
//! Widths are never carried across font-size changes: a zoom or sidebar toggle
//! drops the last measurement and asks the host to measure again.

use serde::{Deserialize, Serialize};

use super::effects::{Effect, Outbox};
use crate::config::ZoomConfig;

/// Rendered widths reported by the host, in CSS pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetrics {
    /// Outer width of the whole gradebook container.
    pub gradebook_width: f64,
    /// Outer width of the fixed student-name pane.
    pub students_width: f64,
    /// Width of one total-column header.
    #[serde(default)]
    pub total_column_width: f64,
    #[serde(default)]
    pub total_columns: usize,
    /// Outer width of each activity header, in column order.
    #[serde(default)]
    pub activity_widths: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPlan {
    pub font_size: f64,
    pub grades_margin_left: f64,
    pub grades_margin_right: f64,
    pub totals_width: f64,
    /// Filler shown when activity columns do not fill the grade pane.
    pub placeholder_width: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoomAction {
    In,
    Out,
    Reset,
}

pub fn compute_plan(m: &LayoutMetrics, font_size: f64) -> LayoutPlan {
    let totals_width = m.total_column_width * m.total_columns as f64;
    let grades_margin_left = m.students_width;
    let grades_margin_right = totals_width;
    let inner = m.gradebook_width - grades_margin_left - grades_margin_right;
    let activities: f64 = m.activity_widths.iter().sum();
    let placeholder_width = (inner > activities).then_some(inner - activities);
    LayoutPlan {
        font_size,
        grades_margin_left,
        grades_margin_right,
        totals_width,
        placeholder_width,
    }
}

#[derive(Debug)]
pub struct LayoutEngine {
    zoom: ZoomConfig,
    font_size: f64,
    sidebar_collapsed: bool,
    metrics: Option<LayoutMetrics>,
    plan: Option<LayoutPlan>,
    scroll_left: f64,
}

impl LayoutEngine {
    pub fn new(zoom: ZoomConfig) -> Self {
        Self {
            font_size: zoom.default_font_size,
            zoom,
            sidebar_collapsed: false,
            metrics: None,
            plan: None,
            scroll_left: 0.0,
        }
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    pub fn scroll_left(&self) -> f64 {
        self.scroll_left
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.sidebar_collapsed
    }

    pub fn request_measure(&mut self, out: &mut Outbox) {
        self.metrics = None;
        out.push(Effect::Remeasure);
    }

    pub fn measured(&mut self, metrics: LayoutMetrics, out: &mut Outbox) -> LayoutPlan {
        let plan = compute_plan(&metrics, self.font_size);
        self.metrics = Some(metrics);
        self.plan = Some(plan.clone());
        out.push(Effect::ApplyLayout(plan.clone()));
        plan
    }

    /// Step the base font size. Steps that would leave the permitted range
    /// are ignored, but widths are re-measured either way.
    pub fn zoom(&mut self, action: ZoomAction, out: &mut Outbox) -> bool {
        let next = match action {
            ZoomAction::In => self.font_size * self.zoom.factor,
            ZoomAction::Out => self.font_size / self.zoom.factor,
            ZoomAction::Reset => self.zoom.default_font_size,
        };
        let changed = next >= self.zoom.min_font_size
            && next <= self.zoom.max_font_size
            && (next - self.font_size).abs() > f64::EPSILON;
        if changed {
            self.font_size = next;
            out.push(Effect::SetFontSize {
                font_size: self.font_size,
            });
        }
        self.request_measure(out);
        changed
    }

    pub fn toggle_sidebar(&mut self, collapsed: bool, out: &mut Outbox) {
        self.sidebar_collapsed = collapsed;
        self.request_measure(out);
    }

    pub fn scrolled(&mut self, scroll_left: f64) {
        self.scroll_left = scroll_left.max(0.0);
    }

    /// Scroll just enough to bring column `col` fully into the grade pane.
    ///
    /// Returns the new scroll offset when one is needed. Without a current
    /// measurement nothing is known about positions, so nothing scrolls.
    pub fn reveal_column(&mut self, col: usize) -> Option<f64> {
        let m = self.metrics.as_ref()?;
        let plan = self.plan.as_ref()?;
        let width = *m.activity_widths.get(col)?;
        let left: f64 = m.activity_widths[..col].iter().sum();
        let right = left + width;
        let visible = m.gradebook_width - plan.grades_margin_left - plan.grades_margin_right;
        if visible <= 0.0 {
            return None;
        }

        let view_left = self.scroll_left;
        let view_right = view_left + visible;
        let next = if left < view_left {
            left
        } else if right > view_right {
            self.scroll_left + (right - view_right)
        } else {
            return None;
        };
        self.scroll_left = next;
        Some(next)
    }
}
