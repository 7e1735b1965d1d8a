use crate::spreadsheet::sheet::Grid;
use crate::subtable::config::StopPolicy;
use crate::subtable::events::StopCondition;
use crate::subtable::mapper::ColumnBinding;
use crate::subtable::value::cell_text;

/// Checks the stop conditions of `row` in order: merged bound cell, then end pattern.
///
/// The end pattern column is examined whether or not it is bound.
pub fn check_stop<G: Grid + ?Sized>(
    grid: &G,
    row: usize,
    bindings: &[ColumnBinding],
    policy: &StopPolicy,
) -> Option<StopCondition> {
    if policy.stop_on_merged_cell {
        if let Some(binding) = bindings.iter().find(|binding| grid.is_merged(row, binding.position.index())) {
            return Some(StopCondition::MergedCell {
                row,
                position: binding.position,
            });
        }
    }

    if let (Some(pattern), Some(position)) = (&policy.end_pattern, policy.end_pattern_column) {
        let text = cell_text(grid, row, position.index());
        if !text.is_empty() && pattern.matches(&text) {
            return Some(StopCondition::EndPattern { row, position, text });
        }
    }

    None
}
