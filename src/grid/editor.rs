use super::effects::{Effect, Outbox};
use super::model::{CellKey, GridModel};

/// Turn a scorable cell into an editable input, seeded with its current text.
///
/// Calling it again on a cell that already has an input returns that input's
/// value untouched. Non-scorable and missing cells never get an input.
pub fn get_input(model: &mut GridModel, key: &CellKey, out: &mut Outbox) -> Option<String> {
    if !model.is_scorable(key) {
        return None;
    }
    let cell = model.cell_mut(key)?;
    if let Some(value) = &cell.input {
        return Some(value.clone());
    }
    cell.original = Some(cell.text.clone());
    cell.input = Some(cell.text.clone());
    out.push(Effect::ShowInput {
        cell: key.field_name(),
        value: cell.text.clone(),
    });
    Some(cell.text.clone())
}

/// Drop the input and restore the baseline text.
///
/// Callers only invoke this once they have checked the input still equals
/// its baseline; anything typed since would otherwise be lost.
pub fn remove_input(model: &mut GridModel, key: &CellKey, out: &mut Outbox) -> bool {
    let Some(cell) = model.cell_mut(key) else {
        return false;
    };
    if cell.input.take().is_none() {
        return false;
    }
    let original = cell.original.take().unwrap_or_default();
    cell.text = original.clone();
    let restyle = cell.verdict != cell.baseline_verdict;
    cell.verdict = cell.baseline_verdict;
    out.push(Effect::ShowText {
        cell: key.field_name(),
        text: original,
    });
    if restyle {
        out.push(Effect::set_class(key, cell.baseline_verdict));
    }
    true
}

/// Store a new input value. Returns whether it now differs from the baseline.
pub fn set_value(model: &mut GridModel, key: &CellKey, value: &str) -> Option<bool> {
    let cell = model.cell_mut(key)?;
    let input = cell.input.as_mut()?;
    *input = value.to_string();
    Some(cell.original.as_deref() != Some(value))
}

/// Put the baseline back into the input without removing it.
pub fn revert_value(model: &mut GridModel, key: &CellKey, out: &mut Outbox) -> bool {
    let Some(cell) = model.cell_mut(key) else {
        return false;
    };
    let Some(original) = cell.original.clone() else {
        return false;
    };
    cell.input = Some(original.clone());
    cell.verdict = cell.baseline_verdict;
    out.push(Effect::SetValue {
        cell: key.field_name(),
        value: original,
    });
    out.push(Effect::set_class(key, cell.baseline_verdict));
    true
}
