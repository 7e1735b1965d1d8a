use crate::spreadsheet::sheet::Grid;
use crate::subtable::events::ScanOutcome;
use crate::subtable::mapper::ColumnBinding;
use crate::subtable::value::Value;
use serde::Serialize;

/// One field of an extracted row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractedField {
    pub name: String,
    pub value: Value,
    /// Source cell, e.g. "C14"
    pub coordinate: String,
}

/// An accepted row with its origin.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractedRow {
    /// 1-based grid row
    pub row_number: usize,
    /// Coordinate of the first bound column
    pub row_start: String,
    /// Coordinate of the last bound column
    pub row_end: String,
    pub section_label: String,
    pub sheet_name: String,
    /// Set when several subtables are harvested from the sheet
    pub subtable_index: Option<usize>,
    /// In binding order
    pub fields: Vec<ExtractedField>,
}

impl ExtractedRow {
    /// Value of the first field with this name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).map(|field| &field.value)
    }

    /// Source coordinate of the first field with this name
    pub fn coordinate(&self, name: &str) -> Option<&str> {
        self.field(name).map(|field| field.coordinate.as_str())
    }

    pub fn fields(&self) -> &[ExtractedField] {
        &self.fields
    }

    fn field(&self, name: &str) -> Option<&ExtractedField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Rows of one subtable.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Subtable {
    pub sheet_name: String,
    pub section_label: String,
    pub subtable_index: usize,
    pub rows: Vec<ExtractedRow>,
    /// Why the row scan of this subtable halted
    pub outcome: ScanOutcome,
}

/// Result of an extraction.
///
/// Single subtable extraction and combined multi subtable extraction yield
/// `Rows`; uncombined multi subtable extraction yields `Subtables`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Extraction {
    Rows(Vec<ExtractedRow>),
    Subtables(Vec<Subtable>),
}

impl Extraction {
    /// All rows in extraction order
    pub fn rows(&self) -> Vec<&ExtractedRow> {
        match self {
            Extraction::Rows(rows) => rows.iter().collect(),
            Extraction::Subtables(subtables) => subtables.iter().flat_map(|subtable| subtable.rows.iter()).collect(),
        }
    }

    pub fn into_rows(self) -> Vec<ExtractedRow> {
        match self {
            Extraction::Rows(rows) => rows,
            Extraction::Subtables(subtables) => subtables.into_iter().flat_map(|subtable| subtable.rows).collect(),
        }
    }

    /// The subtables when they were kept apart
    pub fn subtables(&self) -> Option<&[Subtable]> {
        match self {
            Extraction::Rows(_) => None,
            Extraction::Subtables(subtables) => Some(subtables),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Extraction::Rows(rows) => rows.len(),
            Extraction::Subtables(subtables) => subtables.iter().map(|subtable| subtable.rows.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads the bound cells of `row`, in binding order.
pub fn read_fields<G: Grid + ?Sized>(grid: &G, row: usize, bindings: &[ColumnBinding]) -> Vec<ExtractedField> {
    bindings
        .iter()
        .map(|binding| ExtractedField {
            name: binding.field_name.to_owned(),
            value: Value::from_cell(grid.cell(row, binding.position.index())),
            coordinate: binding.position.reference(row),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;
    use crate::spreadsheet::sheet::Sheet;
    use crate::subtable::config::Column;
    use crate::subtable::pattern::Pattern;

    fn binding(index: usize, name: &str) -> ColumnBinding {
        ColumnBinding {
            position: Column::new(index).unwrap(),
            field_name: name.to_owned(),
            value_pattern: Pattern::any(),
            discovered: false,
        }
    }

    fn row(row_number: usize, fields: Vec<ExtractedField>) -> ExtractedRow {
        ExtractedRow {
            row_number,
            row_start: String::new(),
            row_end: String::new(),
            section_label: String::new(),
            sheet_name: "Data".to_owned(),
            subtable_index: None,
            fields,
        }
    }

    #[test]
    fn test_read_fields() {
        let mut sheet = Sheet::new("", "Data");
        sheet.set_text("C14", "x").set("A14", CellType::Number, "7");

        let fields = read_fields(&sheet, 14, &[binding(3, "name"), binding(1, "count"), binding(2, "empty")]);
        let record = row(14, fields);
        assert_eq!(record.get("name"), Some(&Value::Text("x".to_owned())));
        assert_eq!(record.get("count"), Some(&Value::Integer(7)));
        assert_eq!(record.get("empty"), Some(&Value::Empty));
        assert_eq!(record.coordinate("name"), Some("C14"));
        assert_eq!(record.get("missing"), None);
        let names: Vec<&str> = record.fields().iter().map(|field| field.name.as_str()).collect();
        assert_eq!(names, vec!["name", "count", "empty"]);
    }

    #[test]
    fn test_extraction_accessors() {
        let subtables = vec![
            Subtable {
                sheet_name: "Data".to_owned(),
                section_label: "First".to_owned(),
                subtable_index: 0,
                rows: vec![row(4, Vec::new()), row(5, Vec::new())],
                outcome: ScanOutcome::BlankThreshold,
            },
            Subtable {
                sheet_name: "Data".to_owned(),
                section_label: "Second".to_owned(),
                subtable_index: 1,
                rows: vec![row(12, Vec::new())],
                outcome: ScanOutcome::GridExhausted,
            },
        ];
        let extraction = Extraction::Subtables(subtables);
        assert_eq!(extraction.len(), 3);
        assert_eq!(extraction.subtables().map(|subtables| subtables.len()), Some(2));
        let numbers: Vec<usize> = extraction.rows().iter().map(|row| row.row_number).collect();
        assert_eq!(numbers, vec![4, 5, 12]);
        assert_eq!(extraction.into_rows().len(), 3);

        let empty = Extraction::Rows(Vec::new());
        assert!(empty.is_empty());
        assert!(empty.subtables().is_none());
    }
}
