use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

use crate::grid::error::GridError;

pub const CONFIG_ENV: &str = "GRADEGRID_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationConfig {
    pub debounce_ms: u64,
    /// Drop validation responses older than the last one applied to a cell.
    pub discard_stale: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            discard_stale: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoomConfig {
    pub factor: f64,
    pub min_font_size: f64,
    pub max_font_size: f64,
    pub default_font_size: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            factor: 1.125,
            min_font_size: 7.0,
            max_font_size: 18.0,
            default_font_size: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PopupConfig {
    /// Fetch every header menu as soon as the grid is ready.
    pub eager_preload: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuardConfig {
    pub warning_text: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            warning_text: "You have unsaved changes. Save before leaving?".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    pub validation: ValidationConfig,
    pub zoom: ZoomConfig,
    pub popups: PopupConfig,
    pub guard: GuardConfig,
}

fn merge(base: &mut serde_json::Value, overrides: &serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(b), serde_json::Value::Object(o)) => {
            for (k, v) in o {
                match b.get_mut(k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        b.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (slot, v) => *slot = v.clone(),
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), GridError> {
        let z = &self.zoom;
        if !(z.factor > 1.0) {
            return Err(GridError::bad_params("zoom.factor must be > 1")
                .with_details(json!({ "factor": z.factor })));
        }
        if !(z.min_font_size > 0.0
            && z.min_font_size <= z.default_font_size
            && z.default_font_size <= z.max_font_size)
        {
            return Err(GridError::bad_params(
                "zoom font sizes must satisfy 0 < min <= default <= max",
            )
            .with_details(json!({
                "minFontSize": z.min_font_size,
                "defaultFontSize": z.default_font_size,
                "maxFontSize": z.max_font_size
            })));
        }
        if self.validation.debounce_ms > 10_000 {
            return Err(GridError::bad_params("validation.debounceMs must be <= 10000")
                .with_details(json!({ "debounceMs": self.validation.debounce_ms })));
        }
        Ok(())
    }

    /// Layer a partial JSON object over this config.
    pub fn with_overrides(&self, overrides: &serde_json::Value) -> Result<GridConfig, GridError> {
        if overrides.is_null() {
            return Ok(self.clone());
        }
        if !overrides.is_object() {
            return Err(GridError::bad_params("config must be an object"));
        }
        let mut merged = serde_json::to_value(self)
            .map_err(|e| GridError::new("internal", e.to_string()))?;
        merge(&mut merged, overrides);
        let cfg: GridConfig = serde_json::from_value(merged)
            .map_err(|e| GridError::bad_params(format!("invalid config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<GridConfig> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let overrides: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("parse config {}", path.display()))?;
        GridConfig::default()
            .with_overrides(&overrides)
            .with_context(|| format!("apply config {}", path.display()))
    }

    /// Defaults, layered with the file named by `GRADEGRID_CONFIG` when set.
    pub fn load() -> anyhow::Result<GridConfig> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => GridConfig::from_file(Path::new(&path)),
            _ => Ok(GridConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_legacy_gradebook() {
        let cfg = GridConfig::default();
        assert_eq!(cfg.validation.debounce_ms, 200);
        assert!(cfg.validation.discard_stale);
        assert_eq!(cfg.zoom.factor, 1.125);
        assert_eq!(cfg.zoom.min_font_size, 7.0);
        assert_eq!(cfg.zoom.max_font_size, 18.0);
        assert_eq!(cfg.zoom.default_font_size, 10.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn overrides_merge_nested_fields_only() {
        let cfg = GridConfig::default()
            .with_overrides(&json!({ "validation": { "debounceMs": 50 } }))
            .expect("override");
        assert_eq!(cfg.validation.debounce_ms, 50);
        assert!(cfg.validation.discard_stale);
        assert_eq!(cfg.zoom, ZoomConfig::default());
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let base = GridConfig::default();
        let err = base
            .with_overrides(&json!({ "zoom": { "minFontSize": 12, "maxFontSize": 11 } }))
            .expect_err("bounds");
        assert_eq!(err.code, "bad_params");
        assert!(base.with_overrides(&json!({ "zoom": { "factor": 1.0 } })).is_err());
        assert!(base.with_overrides(&json!([1, 2])).is_err());
        assert!(base
            .with_overrides(&json!({ "validation": { "debounceMs": "fast" } }))
            .is_err());
    }

    #[test]
    fn config_file_layers_over_defaults() {
        let dir = std::env::temp_dir().join(format!("gradegrid-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("grid.json");
        std::fs::write(&path, r#"{ "popups": { "eagerPreload": true } }"#).expect("write");
        let cfg = GridConfig::from_file(&path).expect("load");
        assert!(cfg.popups.eager_preload);
        assert_eq!(cfg.validation, ValidationConfig::default());

        std::fs::write(&path, "{ nope").expect("write");
        let err = GridConfig::from_file(&path).expect_err("bad json");
        assert!(format!("{err:#}").contains("parse config"));
    }
}
