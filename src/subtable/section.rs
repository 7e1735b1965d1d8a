use crate::spreadsheet::sheet::Grid;
use crate::subtable::config::SectionHeaderSpec;
use crate::subtable::value::cell_text;

/// The label preceding a subtable and the rows it occupies (1-based, inclusive).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub label: String,
    pub first_row: usize,
    pub last_row: usize,
}

/// A zero span is treated as unset
fn expected_span(span: Option<usize>) -> Option<usize> {
    span.filter(|span| *span > 0)
}

/// Finds the first section header at or below `from_row`.
///
/// Only the cell at `spec.start_position` is examined on each row. In merged
/// mode the label must be a merged region whose first column is that position
/// and whose spans equal the expected ones when given; regions failing those
/// checks are skipped, not errors.
pub fn find_section<G: Grid + ?Sized>(grid: &G, from_row: usize, spec: &SectionHeaderSpec) -> Option<Section> {
    let column = spec.start_position.index();
    for row in from_row.max(1)..=grid.max_row() {
        if spec.is_merged {
            for region in grid.regions_containing(row, column) {
                if region.first_column != column
                    || expected_span(spec.expected_merged_row_span).is_some_and(|span| span != region.row_span())
                    || expected_span(spec.expected_merged_column_span).is_some_and(|span| span != region.column_span())
                {
                    continue;
                }
                let label = cell_text(grid, region.first_row, region.first_column);
                if !label.is_empty() && spec.pattern.matches(&label) {
                    return Some(Section {
                        label,
                        first_row: region.first_row,
                        last_row: region.last_row,
                    });
                }
            }
        } else {
            let label = cell_text(grid, row, column);
            if !label.is_empty() && spec.pattern.matches(&label) {
                return Some(Section {
                    label,
                    first_row: row,
                    last_row: row,
                });
            }
        }
    }
    None
}
