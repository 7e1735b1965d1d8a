use crate::spreadsheet::sheet::Grid;
use crate::subtable::config::ColumnSpec;
use crate::subtable::value::cell_text;

/// Number of rows examined for a header row
pub const HEADER_SEARCH_WINDOW: usize = 10;

/// First row within the search window where any configured header pattern
/// matches the trimmed text at its column.
pub fn find_header_row<G: Grid + ?Sized>(grid: &G, from_row: usize, columns: &[ColumnSpec]) -> Option<usize> {
    let from_row = from_row.max(1);
    (from_row..from_row + HEADER_SEARCH_WINDOW)
        .take_while(|row| *row <= grid.max_row())
        .find(|row| columns.iter().any(|spec| header_matches(grid, *row, spec)))
}

/// True when the header cell of `spec` on `row` is non-empty and matches.
pub(crate) fn header_matches<G: Grid + ?Sized>(grid: &G, row: usize, spec: &ColumnSpec) -> bool {
    let text = cell_text(grid, row, spec.position.index());
    let text = text.trim();
    !text.is_empty() && spec.header_pattern.matches(text)
}
