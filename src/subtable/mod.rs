//! # Subtable Module
//!
//! Locates and extracts subtables embedded in a sheet: an optional section
//! label, a header row, and the data rows below it, driven by a
//! [`SearchConfig`].
//!
//! Each subtable pass runs the section locator, the header row locator, the
//! column mapper and the row scanner in turn. In multi subtable mode the pass
//! repeats down the sheet until the section locator gives up, the maximum
//! subtable count is reached, or too many passes in a row find nothing.
use crate::error::RustySubtableError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Grid;
use crate::spreadsheet::Spreadsheet;
use thiserror::Error;

pub mod config;
pub mod events;
pub mod header;
pub mod mapper;
pub mod pattern;
pub mod record;
pub mod scanner;
pub mod section;
pub mod stop;
pub mod validator;
pub mod value;

pub use config::{Column, ColumnSpec, ConfigError, RowValidationSpec, SearchConfig, SectionHeaderSpec, StopPolicy};
pub use events::{EventSink, ExtractionEvent, LogEvents, NullEvents, ScanOutcome, StopCondition};
pub use mapper::{ColumnBinding, UnexpectedColumn};
pub use pattern::Pattern;
pub use record::{ExtractedField, ExtractedRow, Extraction, Subtable};
pub use value::Value;

use header::find_header_row;
use mapper::map_columns;
use mapper::ColumnMapping;
use scanner::RowScanner;
use section::find_section;
use section::Section;

/// Fatal extraction failures
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unexpected columns in header row {row} of sheet '{sheet}': {}", join_columns(.columns))]
    UnexpectedColumns {
        sheet: String,
        row: usize,
        columns: Vec<UnexpectedColumn>,
    },

    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),
}

fn join_columns(columns: &[UnexpectedColumn]) -> String {
    columns.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Outcome of one section, header, mapping and scan pass
enum Pass {
    /// A section header is configured but none lies below the start row
    NoSection,
    Found {
        section: Option<Section>,
        rows: Vec<record::ExtractedRow>,
        outcome: Option<ScanOutcome>,
    },
}

/// Extracts subtables from grids according to one configuration.
///
/// Extraction never mutates the configuration or the grid and keeps no state
/// between calls, so one extractor can serve several threads.
pub struct SubtableExtractor<'a> {
    config: &'a SearchConfig,
    events: &'a dyn EventSink,
}

impl<'a> SubtableExtractor<'a> {
    pub fn new(config: &'a SearchConfig) -> Self {
        SubtableExtractor {
            config,
            events: &NullEvents,
        }
    }

    /// Reports every decision of later extractions to `events`.
    pub fn with_events(mut self, events: &'a dyn EventSink) -> Self {
        self.events = events;
        self
    }

    /// Extracts from one grid.
    ///
    /// # Returns
    /// `Extraction::Rows` unless multiple subtables are extracted without
    /// combining them. No match is an empty extraction; an invalid
    /// configuration or a strict column violation is an error.
    pub fn extract<G: Grid + ?Sized>(&self, grid: &G) -> Result<Extraction, RustySubtableError> {
        self.config.validate()?;
        if !self.config.extract_multiple {
            let rows = match self.extract_pass(grid, 1)? {
                Pass::NoSection => Vec::new(),
                Pass::Found { rows, .. } => rows,
            };
            return Ok(Extraction::Rows(rows));
        }

        let subtables = self.extract_subtables(grid)?;
        if self.config.combine_subtables {
            Ok(Extraction::Rows(subtables.into_iter().flat_map(|subtable| subtable.rows).collect()))
        } else {
            Ok(Extraction::Subtables(subtables))
        }
    }

    /// Loads the named sheet and extracts from it.
    pub fn extract_sheet<S: Spreadsheet + ?Sized>(
        &self,
        spreadsheet: &mut S,
        sheet_name: &str,
    ) -> Result<Extraction, RustySubtableError> {
        if !spreadsheet.sheet_names().iter().any(|name| name == sheet_name) {
            Err(ExtractionError::SheetNotFound(sheet_name.to_owned()))?;
        }
        let sheet = spreadsheet.read_sheet(sheet_name)?;
        self.extract(&sheet)
    }

    /// Extracts from every sheet whose name matches any glob pattern, in workbook order.
    pub fn extract_sheets<S: Spreadsheet + ?Sized, P: AsRef<str>>(
        &self,
        spreadsheet: &mut S,
        patterns: &[P],
    ) -> Result<Vec<(String, Extraction)>, RustySubtableError> {
        let criteria = Criteria::with_patterns(patterns)?;
        let mut extractions = Vec::new();
        for sheet_name in criteria.select(&spreadsheet.sheet_names()) {
            let sheet = spreadsheet.read_sheet(&sheet_name)?;
            let extraction = self.extract(&sheet)?;
            extractions.push((sheet_name, extraction));
        }
        Ok(extractions)
    }

    fn extract_subtables<G: Grid + ?Sized>(&self, grid: &G) -> Result<Vec<Subtable>, RustySubtableError> {
        let mut subtables = Vec::<Subtable>::new();
        let mut current_row = 1usize;
        let mut gap = 0usize;
        while current_row <= grid.max_row() {
            if self.config.max_subtables.is_some_and(|limit| subtables.len() >= limit) {
                break;
            }
            let (section, rows, outcome) = match self.extract_pass(grid, current_row)? {
                Pass::NoSection => break,
                Pass::Found { section, rows, outcome } => (section, rows, outcome),
            };

            if let Some(outcome) = outcome.filter(|_| !rows.is_empty()) {
                let subtable_index = subtables.len();
                current_row = rows.last().map_or(current_row, |row| row.row_number) + 1;
                gap = 0;
                self.events.record(ExtractionEvent::SubtableCompleted {
                    subtable_index,
                    rows: rows.len(),
                });
                let rows = rows
                    .into_iter()
                    .map(|row| record::ExtractedRow {
                        subtable_index: Some(subtable_index),
                        ..row
                    })
                    .collect();
                subtables.push(Subtable {
                    sheet_name: grid.name().to_owned(),
                    section_label: section.map(|section| section.label).unwrap_or_default(),
                    subtable_index,
                    rows,
                    outcome,
                });
                continue;
            }

            gap += 1;
            self.events.record(ExtractionEvent::SubtableMissed { from_row: current_row, gap });
            current_row = match section {
                Some(section) => section.last_row + 1,
                None => current_row + 1,
            };
            if gap >= self.config.max_blank_rows_between_subtables {
                break;
            }
        }
        Ok(subtables)
    }

    /// Runs section location, header location, column mapping and the row scan from `from_row`.
    fn extract_pass<G: Grid + ?Sized>(&self, grid: &G, from_row: usize) -> Result<Pass, RustySubtableError> {
        let section = match &self.config.section_header {
            Some(spec) => match find_section(grid, from_row, spec) {
                Some(section) => {
                    self.events.record(ExtractionEvent::SectionFound {
                        label: section.label.to_owned(),
                        first_row: section.first_row,
                        last_row: section.last_row,
                    });
                    Some(section)
                }
                None => {
                    self.events.record(ExtractionEvent::SectionNotFound { from_row });
                    return Ok(Pass::NoSection);
                }
            },
            None => None,
        };
        let search_row = section.as_ref().map(|section| section.last_row + 1).unwrap_or(from_row);
        let not_found = |section: Option<Section>| Pass::Found {
            section,
            rows: Vec::new(),
            outcome: None,
        };

        let header_row = match find_header_row(grid, search_row, &self.config.columns) {
            Some(row) => row,
            None => {
                self.events.record(ExtractionEvent::HeaderRowNotFound { from_row: search_row });
                return Ok(not_found(section));
            }
        };
        self.events.record(ExtractionEvent::HeaderRowFound { row: header_row });

        let bindings = match map_columns(grid, header_row, self.config) {
            ColumnMapping::Bound(bindings) => bindings,
            ColumnMapping::Unexpected(columns) => {
                return Err(ExtractionError::UnexpectedColumns {
                    sheet: grid.name().to_owned(),
                    row: header_row,
                    columns,
                }
                .into())
            }
        };
        if bindings.is_empty() {
            self.events.record(ExtractionEvent::NoColumnsBound { row: header_row });
            return Ok(not_found(section));
        }
        for binding in &bindings {
            self.events.record(ExtractionEvent::ColumnBound {
                position: binding.position,
                field_name: binding.field_name.to_owned(),
                discovered: binding.discovered,
            });
        }

        let scanner = RowScanner {
            grid,
            bindings: &bindings,
            config: self.config,
            events: self.events,
            section_label: section.as_ref().map(|section| section.label.as_str()).unwrap_or_default(),
        };
        let result = scanner.scan(header_row + 1);
        Ok(Pass::Found {
            section,
            rows: result.rows,
            outcome: Some(result.outcome),
        })
    }
}
