//! # Rusty Subtable
//!
//! Extracts structured records from semi-structured spreadsheet sheets, where
//! a sheet holds one or more small tables ("subtables") surrounded by titles,
//! notes, totals and blank space.
//!
//! ## Features
//!
//! - **Multi-format support**: Read Excel files (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument
//!   spreadsheet files (`.ods`), or build sheets in memory
//! - **Section headers**: Locate a subtable by its label, optionally as a merged region with
//!   expected spans
//! - **Header mapping**: Bind configured columns by header pattern and discover extra columns
//!   from a pattern list, or reject unexpected columns in strict mode
//! - **Row validation**: Accept rows by per-column value patterns and a minimum fill count
//! - **Stop policies**: Halt on merged cells, an end marker, or consecutive invalid or blank rows
//! - **Multiple subtables**: Harvest every matching subtable of a sheet, combined or kept apart
//! - **JSON configuration**: Load a [`SearchConfig`] from JSON text or a file
//! - **Extraction events**: Observe every decision through an [`EventSink`], e.g. the `log` crate
//!
//! ## Example
//!
//! ```no_run
//! use rusty_subtable::spreadsheet::open_spreadsheet;
//! use rusty_subtable::{LogEvents, SearchConfig, SubtableExtractor};
//!
//! # fn main() -> Result<(), rusty_subtable::RustySubtableError> {
//! let config = SearchConfig::from_json_file("report.json")?;
//! let mut spreadsheet = open_spreadsheet("report.xlsx")?;
//! let extraction = SubtableExtractor::new(&config)
//!     .with_events(&LogEvents)
//!     .extract_sheet(spreadsheet.as_mut(), "Sheet1")?;
//! for row in extraction.rows() {
//!     println!("{} {:?}", row.row_number, row.get("Amount"));
//! }
//! # Ok(())
//! # }
//! ```
mod error;
pub(crate) mod helpers;
pub mod spreadsheet;
pub mod subtable;

pub use error::RustySubtableError;
pub use subtable::{
    Column, ColumnSpec, EventSink, ExtractedField, ExtractedRow, Extraction, ExtractionError, ExtractionEvent,
    LogEvents, NullEvents, Pattern, RowValidationSpec, ScanOutcome, SearchConfig, SectionHeaderSpec, StopPolicy,
    Subtable, SubtableExtractor, Value,
};
