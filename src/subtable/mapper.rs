use crate::spreadsheet::sheet::Grid;
use crate::subtable::config::Column;
use crate::subtable::config::SearchConfig;
use crate::subtable::header::header_matches;
use crate::subtable::pattern::Pattern;
use crate::subtable::value::cell_text;
use serde::Serialize;
use std::fmt::Display;

/// A grid column resolved to a field for one subtable pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnBinding {
    pub position: Column,
    /// Trimmed header text found in the header row
    pub field_name: String,
    pub value_pattern: Pattern,
    /// Found through a discoverable header pattern rather than configured
    pub discovered: bool,
}

/// A non-empty header cell that no column configuration accounts for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnexpectedColumn {
    pub position: Column,
    /// A1-style reference of the header cell
    pub reference: String,
    pub text: String,
}

impl Display for UnexpectedColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.reference, self.text)
    }
}

/// Outcome of resolving the columns of a header row
#[derive(Debug, PartialEq)]
pub enum ColumnMapping {
    Bound(Vec<ColumnBinding>),
    /// Strict mode found header cells left unbound
    Unexpected(Vec<UnexpectedColumn>),
}

/// Resolves the columns of `header_row`.
///
/// Configured columns come first in configuration order, discovered columns
/// follow in sheet order. An empty `Bound` list means nothing matched.
pub fn map_columns<G: Grid + ?Sized>(grid: &G, header_row: usize, config: &SearchConfig) -> ColumnMapping {
    let mut bindings: Vec<ColumnBinding> = config
        .columns
        .iter()
        .filter(|spec| header_matches(grid, header_row, spec))
        .map(|spec| ColumnBinding {
            position: spec.position,
            field_name: header_text(grid, header_row, spec.position.index()),
            value_pattern: spec.value_pattern.clone(),
            discovered: false,
        })
        .collect();

    if !config.discoverable_header_patterns.is_empty() {
        for column in unbound_columns(grid, &bindings) {
            let text = header_text(grid, header_row, column.index());
            if text.is_empty() {
                continue;
            }
            if config.discoverable_header_patterns.iter().any(|pattern| pattern.matches(&text)) {
                bindings.push(ColumnBinding {
                    position: column,
                    field_name: text,
                    value_pattern: Pattern::any(),
                    discovered: true,
                });
            }
        }
    }

    if config.strict_columns {
        let unexpected: Vec<UnexpectedColumn> = unbound_columns(grid, &bindings)
            .into_iter()
            .filter_map(|column| {
                let text = header_text(grid, header_row, column.index());
                (!text.is_empty()).then(|| UnexpectedColumn {
                    position: column,
                    reference: column.reference(header_row),
                    text,
                })
            })
            .collect();
        if !unexpected.is_empty() {
            return ColumnMapping::Unexpected(unexpected);
        }
    }

    ColumnMapping::Bound(bindings)
}

fn header_text<G: Grid + ?Sized>(grid: &G, row: usize, column: usize) -> String {
    cell_text(grid, row, column).trim().to_owned()
}

/// Columns 1..=max_column not yet bound, left to right
fn unbound_columns<G: Grid + ?Sized>(grid: &G, bindings: &[ColumnBinding]) -> Vec<Column> {
    (1..=grid.max_column())
        .filter_map(|index| Column::new(index).ok())
        .filter(|column| bindings.iter().all(|binding| binding.position != *column))
        .collect()
}
