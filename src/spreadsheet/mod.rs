//! # Spreadsheet Module
//!
//! Reads Excel (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument (`.ods`) files into
//! in-memory [`Sheet`] grids with cell kinds and merged regions, the input the
//! subtable extractor scans.
use crate::error::RustySubtableError;
use std::ffi::OsStr;
use std::path::Path;
use thiserror::Error;

pub mod cell;
pub mod criteria;
pub(crate) mod excel;
pub mod ods;
pub mod reference;
pub mod sheet;
pub mod workbook;
pub mod xlsx;

pub use cell::{Cell, CellType, FormulaResult};
pub use criteria::Criteria;
pub use sheet::{Grid, MergedRegion, Sheet};
pub use workbook::Workbook;

/// Errors raised while opening or reading spreadsheet files.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Unsupported spreadsheet format '{0}'")]
    UnsupportedFormat(String),

    #[error("Spreadsheet '{0}' is password protected")]
    PasswordProtected(String),

    #[error("Spreadsheet '{0}' contains no sheets")]
    SpreadsheetEmpty(String),

    #[error("Missing part '{0}' in spreadsheet")]
    MissingPart(String),

    #[error("Sheet '{sheet}' not found in '{file}'")]
    SheetNotFound { file: String, sheet: String },
}

/// A spreadsheet file whose sheets can be loaded by name.
pub trait Spreadsheet {
    /// Returns the file name of this spreadsheet
    fn name(&self) -> String;

    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Loads one sheet, failing with `SpreadsheetError::SheetNotFound` for an unknown name
    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, RustySubtableError>;

    fn sheet_not_found(&self, sheet_name: &str) -> RustySubtableError {
        SpreadsheetError::SheetNotFound {
            file: self.name(),
            sheet: sheet_name.to_owned(),
        }
        .into()
    }
}

/// Opens a spreadsheet file, choosing the reader by file extension.
///
/// # Arguments
/// * `path` - Path to a `.xlsx`, `.xlsm`, `.xlam` or `.ods` file
///
/// # Returns
/// A boxed reader or `SpreadsheetError::UnsupportedFormat`
pub fn open_spreadsheet<P: AsRef<Path>>(path: P) -> Result<Box<dyn Spreadsheet>, RustySubtableError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") | Some("xlam") => Ok(Box::new(xlsx::XlsxSpreadsheet::open(path)?)),
        Some("ods") => Ok(Box::new(ods::OdsSpreadsheet::open(path)?)),
        _ => Err(SpreadsheetError::UnsupportedFormat(path.to_string_lossy().to_string()).into()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format() {
        let result = open_spreadsheet("report.csv");
        assert!(matches!(
            result,
            Err(RustySubtableError::SpreadsheetError(SpreadsheetError::UnsupportedFormat(_)))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(open_spreadsheet("missing.xlsx"), Err(RustySubtableError::IoError(_))));
    }
}
