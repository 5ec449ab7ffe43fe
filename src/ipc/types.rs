use serde::Deserialize;

use crate::config::GridConfig;
use crate::grid::controller::GridController;
use crate::grid::dispatch::Dispatcher;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    /// Startup config: defaults layered with the config file.
    pub config: GridConfig,
    pub dispatcher: Dispatcher,
    pub grid: Option<GridController>,
}

impl AppState {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::standard(),
            grid: None,
        }
    }
}
