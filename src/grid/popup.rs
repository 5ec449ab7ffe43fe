//! Header popup menus.
//!
//! A menu is fetched once per page, cached on its header and rendered from the
//! cache on every later show, across grid reloads too. A failed fetch leaves
//! the loading placeholder in place; nothing retries it.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use super::contract::MenuContent;
use super::effects::{Effect, Outbox, PendingRequest};
use super::error::GridError;
use super::model::GridModel;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum HeaderRef {
    Name,
    Activity(String),
    Student(String),
    Total(String),
}

impl HeaderRef {
    pub fn endpoint(&self) -> &'static str {
        match self {
            HeaderRef::Name => "menu.name",
            HeaderRef::Activity(_) => "menu.activity",
            HeaderRef::Student(_) => "menu.student",
            HeaderRef::Total(_) => "menu.total",
        }
    }

    fn entity_id(&self) -> Option<&str> {
        match self {
            HeaderRef::Name => None,
            HeaderRef::Activity(id) | HeaderRef::Student(id) | HeaderRef::Total(id) => Some(id),
        }
    }

    /// Column and total headers sit in horizontally scrolling panels.
    pub fn is_column(&self) -> bool {
        matches!(self, HeaderRef::Activity(_) | HeaderRef::Total(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupGeometry {
    pub header_left: f64,
    pub header_width: f64,
    pub menu_width: f64,
    pub panel_width: f64,
}

/// Left offset of a menu inside its panel.
///
/// Column menus that would spill past the panel's right edge are flipped so
/// their right edge lines up with the header's right edge.
pub fn menu_left(header: &HeaderRef, g: &PopupGeometry) -> f64 {
    if header.is_column() && g.header_left + g.menu_width > g.panel_width {
        g.header_left + g.header_width - g.menu_width
    } else {
        g.header_left
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuPhase {
    Unloaded,
    Loading,
    Loaded,
    Rendered,
}

#[derive(Debug)]
struct PopupMenu {
    phase: MenuPhase,
    cache: Option<MenuContent>,
    active: bool,
    /// Show requested while loading; carries the computed left offset.
    show_when_loaded: Option<Option<f64>>,
    fetches: u32,
}

impl PopupMenu {
    fn new() -> Self {
        Self {
            phase: MenuPhase::Unloaded,
            cache: None,
            active: false,
            show_when_loaded: None,
            fetches: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct PopupManager {
    menus: BTreeMap<HeaderRef, PopupMenu>,
}

impl PopupManager {
    /// Register every header that carries a trigger and insert its placeholder.
    ///
    /// Headers that survive a reload keep their menu: cached content is shown
    /// again without a fetch, and a load still in flight completes normally.
    pub fn register(&mut self, model: &GridModel, out: &mut Outbox) {
        let mut previous = std::mem::take(&mut self.menus);
        let mut headers = Vec::new();
        if model.has_name_menu() {
            headers.push(HeaderRef::Name);
        }
        headers.extend(
            model
                .activities()
                .iter()
                .filter(|a| a.menu)
                .map(|a| HeaderRef::Activity(a.id.clone())),
        );
        headers.extend(
            model
                .students()
                .iter()
                .filter(|s| s.menu)
                .map(|s| HeaderRef::Student(s.id.clone())),
        );
        headers.extend(
            model
                .totals()
                .iter()
                .filter(|t| t.menu)
                .map(|t| HeaderRef::Total(t.id.clone())),
        );
        for header in headers {
            out.push(Effect::InsertPopupPlaceholder {
                header: header.clone(),
            });
            let menu = match previous.remove(&header) {
                Some(mut kept) => {
                    kept.active = false;
                    kept.show_when_loaded = None;
                    if kept.phase == MenuPhase::Rendered {
                        kept.phase = MenuPhase::Loaded;
                    }
                    kept
                }
                None => PopupMenu::new(),
            };
            self.menus.insert(header, menu);
        }
    }

    pub fn phase(&self, header: &HeaderRef) -> Option<MenuPhase> {
        self.menus.get(header).map(|m| m.phase)
    }

    #[cfg(test)]
    pub fn fetch_count(&self, header: &HeaderRef) -> u32 {
        self.menus.get(header).map(|m| m.fetches).unwrap_or(0)
    }

    pub fn active(&self) -> Option<&HeaderRef> {
        self.menus.iter().find(|(_, m)| m.active).map(|(h, _)| h)
    }

    fn start_load(header: &HeaderRef, menu: &mut PopupMenu, out: &mut Outbox) {
        if menu.phase != MenuPhase::Unloaded {
            return;
        }
        let params = match header.entity_id() {
            Some(id) => json!({ "id": id }),
            None => json!({}),
        };
        out.fetch(
            PendingRequest::Menu {
                header: header.clone(),
            },
            header.endpoint(),
            params,
        );
        menu.phase = MenuPhase::Loading;
        menu.fetches += 1;
    }

    /// Fetch every menu not yet requested.
    pub fn preload_all(&mut self, out: &mut Outbox) -> usize {
        let mut started = 0;
        for (header, menu) in self.menus.iter_mut() {
            if menu.phase == MenuPhase::Unloaded {
                Self::start_load(header, menu, out);
                started += 1;
            }
        }
        started
    }

    pub fn open(
        &mut self,
        header: &HeaderRef,
        geometry: Option<&PopupGeometry>,
        out: &mut Outbox,
    ) -> Result<MenuPhase, GridError> {
        if !self.menus.contains_key(header) {
            return Err(GridError::not_found("header has no popup menu")
                .with_details(json!({ "header": header })));
        }
        self.hide_all_except(Some(header), out);

        let left = geometry.map(|g| menu_left(header, g));
        let Some(menu) = self.menus.get_mut(header) else {
            return Err(GridError::not_found("header has no popup menu"));
        };
        match menu.phase {
            MenuPhase::Unloaded => {
                menu.show_when_loaded = Some(left);
                Self::start_load(header, menu, out);
            }
            MenuPhase::Loading => {
                menu.show_when_loaded = Some(left);
            }
            MenuPhase::Loaded | MenuPhase::Rendered => {
                Self::show_from_cache(header, menu, left, out);
            }
        }
        Ok(menu.phase)
    }

    fn show_from_cache(header: &HeaderRef, menu: &mut PopupMenu, left: Option<f64>, out: &mut Outbox) {
        let Some(content) = menu.cache.clone() else {
            return;
        };
        out.push(Effect::RenderPopup {
            header: header.clone(),
            content,
        });
        out.push(Effect::ShowPopup {
            header: header.clone(),
            left,
        });
        menu.phase = MenuPhase::Rendered;
        menu.active = true;
    }

    /// Route a menu fetch completion. `None` content means the fetch failed.
    pub fn loaded(&mut self, header: &HeaderRef, content: Option<MenuContent>, out: &mut Outbox) {
        let Some(menu) = self.menus.get_mut(header) else {
            return;
        };
        let Some(content) = content else {
            tracing::warn!(endpoint = header.endpoint(), "popup menu load failed");
            return;
        };
        menu.cache = Some(content);
        menu.phase = MenuPhase::Loaded;
        if let Some(left) = menu.show_when_loaded.take() {
            self.hide_all_except(Some(header), out);
            if let Some(menu) = self.menus.get_mut(header) {
                Self::show_from_cache(header, menu, left, out);
            }
        }
    }

    pub fn hide_all(&mut self, out: &mut Outbox) -> usize {
        self.hide_all_except(None, out)
    }

    fn hide_all_except(&mut self, keep: Option<&HeaderRef>, out: &mut Outbox) -> usize {
        let mut hidden = 0;
        for (header, menu) in self.menus.iter_mut() {
            if Some(header) == keep {
                continue;
            }
            menu.show_when_loaded = None;
            if menu.active {
                menu.active = false;
                out.push(Effect::HidePopup {
                    header: header.clone(),
                });
                hidden += 1;
            }
        }
        hidden
    }
}
