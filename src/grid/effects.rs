//! Effects are the host's side of every handled event: DOM patches, timers,
//! fetches and scroll changes, in the order they must be applied.

use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::contract::MenuContent;
use super::layout::LayoutPlan;
use super::model::{CellKey, Verdict};
use super::popup::HeaderRef;

pub type TimerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DialogKind {
    FillDown,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PreloadSlot {
    FillDown,
    CommentCell,
}

impl PreloadSlot {
    pub fn endpoint(self) -> &'static str {
        match self {
            PreloadSlot::FillDown => "preload.fillDown",
            PreloadSlot::CommentCell => "preload.commentCell",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Effect {
    ShowInput {
        cell: String,
        value: String,
    },
    ShowText {
        cell: String,
        text: String,
    },
    SetValue {
        cell: String,
        value: String,
    },
    SelectAll {
        cell: String,
    },
    Blur {
        cell: String,
    },
    SetClass {
        cell: String,
        verdict: Verdict,
        class: String,
    },
    ScheduleTimer {
        timer_id: TimerId,
        delay_ms: u64,
    },
    CancelTimer {
        timer_id: TimerId,
    },
    Fetch {
        request_id: String,
        endpoint: String,
        params: serde_json::Value,
    },
    SetScrollLeft {
        scroll_left: f64,
    },
    InsertPopupPlaceholder {
        header: HeaderRef,
    },
    RenderPopup {
        header: HeaderRef,
        content: MenuContent,
    },
    ShowPopup {
        header: HeaderRef,
        left: Option<f64>,
    },
    HidePopup {
        header: HeaderRef,
    },
    InsertMarkup {
        slot: PreloadSlot,
        html: String,
    },
    GridReady,
    ApplyLayout(LayoutPlan),
    SetFontSize {
        font_size: f64,
    },
    Remeasure,
    OpenDialog {
        dialog: DialogKind,
        fields: serde_json::Value,
    },
    SetDialogField {
        dialog: DialogKind,
        field: String,
        value: String,
    },
    CloseDialog {
        dialog: DialogKind,
    },
    AppendHiddenField {
        name: String,
        value: String,
    },
}

impl Effect {
    pub fn set_class(key: &CellKey, verdict: Verdict) -> Self {
        Effect::SetClass {
            cell: key.field_name(),
            verdict,
            class: verdict.css_class().to_string(),
        }
    }
}

/// What an outstanding fetch was for, so its completion can be routed back.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingRequest {
    /// `value` is the input text the request asked about.
    Validation {
        cell: CellKey,
        seq: u64,
        value: String,
    },
    Menu { header: HeaderRef },
    Preload { slot: PreloadSlot },
    Submit {
        scores: Vec<(CellKey, String)>,
        comments: Vec<String>,
    },
}

#[derive(Debug, Default)]
pub struct Outbox {
    effects: Vec<Effect>,
    next_timer_id: TimerId,
    requests: HashMap<String, PendingRequest>,
}

impl Outbox {
    pub fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn schedule_timer(&mut self, delay_ms: u64) -> TimerId {
        self.next_timer_id += 1;
        let timer_id = self.next_timer_id;
        self.push(Effect::ScheduleTimer { timer_id, delay_ms });
        timer_id
    }

    pub fn cancel_timer(&mut self, timer_id: TimerId) {
        self.push(Effect::CancelTimer { timer_id });
    }

    pub fn fetch(
        &mut self,
        pending: PendingRequest,
        endpoint: &str,
        params: serde_json::Value,
    ) -> String {
        let request_id = Uuid::new_v4().to_string();
        self.requests.insert(request_id.clone(), pending);
        self.push(Effect::Fetch {
            request_id: request_id.clone(),
            endpoint: endpoint.to_string(),
            params,
        });
        request_id
    }

    pub fn take_request(&mut self, request_id: &str) -> Option<PendingRequest> {
        self.requests.remove(request_id)
    }

    pub fn in_flight(&self) -> usize {
        self.requests.len()
    }

    /// Forget every outstanding request tied to grid data; late completions
    /// then resolve as stale. Menu loads are page-wide and stay routed.
    pub fn forget_grid_requests(&mut self) {
        self.requests
            .retain(|_, pending| matches!(pending, PendingRequest::Menu { .. }));
    }

    pub fn drain(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timer_ids_are_unique_and_increasing() {
        let mut out = Outbox::default();
        let a = out.schedule_timer(200);
        let b = out.schedule_timer(200);
        assert!(b > a);
        assert_eq!(out.drain().len(), 2);
        assert!(out.drain().is_empty());
    }

    #[test]
    fn fetch_registers_routing_entry_once() {
        let mut out = Outbox::default();
        let id = out.fetch(
            PendingRequest::Submit {
                scores: vec![],
                comments: vec![],
            },
            "grades.submit",
            json!({}),
        );
        assert_eq!(out.in_flight(), 1);
        assert!(out.take_request(&id).is_some());
        assert!(out.take_request(&id).is_none());
    }

    #[test]
    fn forgetting_grid_requests_keeps_menu_loads() {
        let mut out = Outbox::default();
        let menu = out.fetch(
            PendingRequest::Menu {
                header: HeaderRef::Name,
            },
            "menu.name",
            json!({}),
        );
        let check = out.fetch(
            PendingRequest::Validation {
                cell: CellKey::new("A", "N1"),
                seq: 1,
                value: "4".into(),
            },
            "validate",
            json!({}),
        );
        out.forget_grid_requests();
        assert!(out.take_request(&check).is_none());
        assert!(out.take_request(&menu).is_some());
    }

    #[test]
    fn effects_serialize_with_op_tag() {
        let v = serde_json::to_value(Effect::ScheduleTimer {
            timer_id: 3,
            delay_ms: 200,
        })
        .expect("serialize");
        assert_eq!(v, json!({ "op": "scheduleTimer", "timerId": 3, "delayMs": 200 }));

        let v = serde_json::to_value(Effect::set_class(&CellKey::new("A", "N1"), Verdict::ExtraCredit))
            .expect("serialize");
        assert_eq!(v["class"], "warning_bg");
        assert_eq!(v["verdict"], "extracredit");
    }
}
