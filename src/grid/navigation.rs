//! Arrow-key movement between scorable cells.

use super::model::{CellKey, GridModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Move(Direction),
    Escape,
    Other,
}

impl KeyAction {
    /// Map a DOM `KeyboardEvent.key` (or legacy key code) to an action.
    pub fn from_key(key: &str) -> Self {
        match key {
            "ArrowLeft" | "Left" | "37" => KeyAction::Move(Direction::Left),
            "ArrowRight" | "Right" | "39" => KeyAction::Move(Direction::Right),
            "ArrowUp" | "Up" | "38" => KeyAction::Move(Direction::Up),
            "ArrowDown" | "Down" | "40" | "Enter" | "13" => KeyAction::Move(Direction::Down),
            "Escape" | "Esc" | "27" => KeyAction::Escape,
            _ => KeyAction::Other,
        }
    }
}

/// Next scorable cell from `from` in `direction`.
///
/// Left/Right stay in the row and Up/Down stay in the column; the scan never
/// wraps. `None` means there is nowhere to go and focus should stay put.
pub fn scan(model: &GridModel, from: &CellKey, direction: Direction) -> Option<CellKey> {
    let (row, col) = model.position(from)?;
    let candidates: Vec<(usize, usize)> = match direction {
        Direction::Left => (0..col).rev().map(|c| (row, c)).collect(),
        Direction::Right => (col + 1..model.col_count()).map(|c| (row, c)).collect(),
        Direction::Up => (0..row).rev().map(|r| (r, col)).collect(),
        Direction::Down => (row + 1..model.row_count()).map(|r| (r, col)).collect(),
    };
    candidates
        .into_iter()
        .filter_map(|(r, c)| model.cell_at(r, c))
        .find(|key| model.is_scorable(key))
}
