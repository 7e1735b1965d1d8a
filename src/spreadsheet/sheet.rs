use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::reference::index_to_reference;
use std::collections::HashMap;

/// A rectangular merged region. Bounds are 1-based and inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MergedRegion {
    pub first_row: usize,
    pub first_column: usize,
    pub last_row: usize,
    pub last_column: usize,
}

impl MergedRegion {
    /// Builds a region from 0-based inclusive corners as produced by `range_to_indexes`.
    pub fn from_indexes(start: (usize, usize), end: (usize, usize)) -> Self {
        MergedRegion {
            first_row: start.0 + 1,
            first_column: start.1 + 1,
            last_row: end.0 + 1,
            last_column: end.1 + 1,
        }
    }

    /// Returns true if the 1-based (row, column) lies inside this region.
    pub fn contains(&self, row: usize, column: usize) -> bool {
        self.first_row <= row && row <= self.last_row
            && self.first_column <= column && column <= self.last_column
    }

    pub fn row_span(&self) -> usize {
        self.last_row - self.first_row + 1
    }

    pub fn column_span(&self) -> usize {
        self.last_column - self.first_column + 1
    }

    /// A1-style range of the region, e.g. "A1:C2".
    pub fn reference(&self) -> String {
        format!(
            "{}:{}",
            index_to_reference(self.first_row - 1, self.first_column - 1),
            index_to_reference(self.last_row - 1, self.last_column - 1)
        )
    }
}

/// Read-only access to one sheet's grid. All coordinates are 1-based.
///
/// Implementations must be free of side effects so independent extractions
/// can share a grid across threads.
pub trait Grid: Sync {
    /// Name of the sheet this grid was read from.
    fn name(&self) -> &str;

    /// Last row carrying a value or a merged region, 0 for an empty grid.
    fn max_row(&self) -> usize;

    /// Last column carrying a value or a merged region, 0 for an empty grid.
    fn max_column(&self) -> usize;

    /// The cell at (row, column), `None` when nothing is stored there.
    fn cell(&self, row: usize, column: usize) -> Option<&Cell>;

    fn merged_regions(&self) -> &[MergedRegion];

    /// Merged regions covering (row, column), in declaration order.
    fn regions_containing(&self, row: usize, column: usize) -> Vec<&MergedRegion> {
        self.merged_regions()
            .iter()
            .filter(|region| region.contains(row, column))
            .collect()
    }

    fn is_merged(&self, row: usize, column: usize) -> bool {
        self.merged_regions()
            .iter()
            .any(|region| region.contains(row, column))
    }
}

/// One sheet of a spreadsheet, fully loaded in memory.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    /// Source file name
    pub file_name: String,
    /// Sheet name
    pub name: String,
    /// Cells keyed by 0-based (row, col)
    cells: HashMap<(usize, usize), Cell>,
    merged_regions: Vec<MergedRegion>,
    /// 1-based extent
    max_row: usize,
    max_column: usize,
}

impl Sheet {
    pub fn new(file_name: &str, name: &str) -> Self {
        Sheet {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Returns true if the sheet contains no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell, replacing any previous cell at the same position.
    /// Empty cells are dropped so they never extend the sheet extent.
    pub fn push(&mut self, cell: Cell) {
        if cell.is_empty() {
            return;
        }
        self.max_row = self.max_row.max(cell.row + 1);
        self.max_column = self.max_column.max(cell.col + 1);
        self.cells.insert((cell.row, cell.col), cell);
    }

    pub fn merge(&mut self, region: MergedRegion) {
        self.max_row = self.max_row.max(region.last_row);
        self.max_column = self.max_column.max(region.last_column);
        self.merged_regions.push(region);
    }

    /// Convenience for building grids by hand: stores a text cell at an A1 reference.
    pub fn set_text(&mut self, reference: &str, text: &str) -> &mut Self {
        self.set(reference, CellType::InlineString, text)
    }

    /// Stores a cell of the given kind at an A1 reference. Invalid references are ignored.
    pub fn set(&mut self, reference: &str, kind: CellType, value: &str) -> &mut Self {
        if let Some((row, col)) = crate::spreadsheet::reference::reference_to_index(reference) {
            self.push(Cell::new(row, col, kind, value));
        }
        self
    }

    /// Merges an A1-style range such as "A1:C1". Invalid ranges are ignored.
    pub fn merge_range(&mut self, range: &str) -> &mut Self {
        if let Some((start, end)) = crate::spreadsheet::reference::range_to_indexes(range) {
            self.merge(MergedRegion::from_indexes(start, end));
        }
        self
    }
}

impl Grid for Sheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_row(&self) -> usize {
        self.max_row
    }

    fn max_column(&self) -> usize {
        self.max_column
    }

    fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        if row == 0 || column == 0 {
            return None;
        }
        self.cells.get(&(row - 1, column - 1))
    }

    fn merged_regions(&self) -> &[MergedRegion] {
        &self.merged_regions
    }
}
