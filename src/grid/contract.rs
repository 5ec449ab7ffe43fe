//! Payloads exchanged with the grading server through `fetch` effects.

use serde::{Deserialize, Serialize};

use super::model::Verdict;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    /// Normalized score to display in place of what was typed.
    #[serde(default)]
    pub score: Option<serde_json::Value>,
    pub is_valid: bool,
    #[serde(default)]
    pub is_extracredit: bool,
}

impl ValidateResponse {
    pub fn verdict(&self) -> Verdict {
        if !self.is_valid {
            Verdict::Error
        } else if self.is_extracredit {
            Verdict::ExtraCredit
        } else {
            Verdict::Valid
        }
    }

    pub fn normalized_score(&self) -> Option<String> {
        match self.score.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuContent {
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MenuItem {
    Link {
        label: String,
        url: String,
        #[serde(default)]
        current: bool,
    },
    /// Hover group of nested items; `current` marks the group holding the active choice.
    Group {
        label: String,
        #[serde(default)]
        items: Vec<MenuItem>,
        #[serde(default)]
        current: bool,
    },
}

/// Preload endpoints answer with raw markup or `{ "html": ... }`.
pub fn preload_markup(body: &serde_json::Value) -> Option<String> {
    match body {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => map.get("html").and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}
