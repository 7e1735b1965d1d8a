use crate::error::RustySubtableError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::match_xml_events;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::FormulaResult;
use crate::spreadsheet::sheet::MergedRegion;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
const CONTENT: &str = "content.xml";
const MANIFEST: &str = "META-INF/manifest.xml";

const SPREADSHEET: QName = QName(b"office:spreadsheet");
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
/// Cell hidden under a spanned cell
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// Comments attached to a cell
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
/// Run of spaces, `text:c` gives the count
const SPACES: QName = QName(b"text:s");
const MANIFEST_FILE_ENTRY: QName = QName(b"manifest:file-entry");
const MANIFEST_ENCRYPTION_DATA: QName = QName(b"manifest:encryption-data");

/// Error types specific to ODS spreadsheet processing
#[derive(Error, Debug)]
pub enum OdsError {
    #[error("Invalid ODS MIME type")]
    MimeTypeError,
}

/// OpenDocument spreadsheet reader
pub struct OdsSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
    /// Table names in document order
    sheets: Vec<String>,
}

impl OdsSpreadsheet {
    /// Opens an ODS file from disk and validates its format
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RustySubtableError> {
        let name = path.as_ref().to_string_lossy().to_string();
        Self::from_reader(&name, UnifiedReader::open(path)?)
    }

    /// Opens an ODS package already held in memory
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, RustySubtableError> {
        Self::from_reader(name, UnifiedReader::from_bytes(bytes))
    }

    fn from_reader(name: &str, reader: UnifiedReader) -> Result<Self, RustySubtableError> {
        let mut zip = ZipArchive::new(reader)?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::PasswordProtected(name.to_owned()))?;
        }
        let sheets = load_table_names(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmpty(name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: name.to_owned(),
            zip,
            sheets,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.clone()
    }

    /// Streams content.xml up to the named table and loads it.
    ///
    /// Repeated rows and columns are expanded, spanned cells become merged
    /// regions and cells carrying `table:formula` get a formula kind.
    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, RustySubtableError> {
        if !self.sheets.iter().any(|name| name == sheet_name) {
            return Err(self.sheet_not_found(sheet_name));
        }
        let mut sheet = Sheet::new(&self.name, sheet_name);
        let mut reader = self.zip.required_xml_part(CONTENT)?;

        let mut found = false;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == SPREADSHEET => break,
            Event::Start(event) if event.name() == TABLE => {
                if event.get_attribute_value("table:name")?.as_deref() == Some(sheet_name) {
                    found = true;
                    break;
                }
            }
        });
        if !found {
            Err(SpreadsheetError::SheetNotFound {
                file: self.name.to_owned(),
                sheet: sheet_name.to_owned(),
            })?;
        }

        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 1usize;
        let mut col_count = 1usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        // Inside the text of a string cell
        let mut element_context = false;
        let mut comment_context = false;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == TABLE => break,
            Event::Start(event) if event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if event.name() == TABLE_ROW => row += row_count,
            Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                value.clear();
                col_count = event.parse_attribute_value("table:number-columns-repeated")?.unwrap_or(1);
                let row_span = event.parse_attribute_value::<usize>("table:number-rows-spanned")?.unwrap_or(1);
                let column_span = event.parse_attribute_value::<usize>("table:number-columns-spanned")?.unwrap_or(1);
                if row_span > 1 || column_span > 1 {
                    for row_offset in 0..row_count {
                        let first_row = row + row_offset;
                        sheet.merge(MergedRegion::from_indexes(
                            (first_row, col),
                            (first_row + row_span - 1, col + column_span - 1),
                        ));
                    }
                }
                kind = read_cell_kind(&event)?;
                element_context = matches!(
                    kind,
                    CellType::InlineString | CellType::Error | CellType::Formula(FormulaResult::Text | FormulaResult::Error)
                );
                if !element_context {
                    value.push_str(&read_cell_value(&event)?);
                }
            }
            Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                if kind != CellType::Empty && !value.is_empty() {
                    for row_offset in 0..row_count {
                        for col_offset in 0..col_count {
                            sheet.push(Cell::new(row + row_offset, col + col_offset, kind, value.as_str()));
                        }
                    }
                }
                col += col_count;
                element_context = false;
                comment_context = false;
            }
            Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if element_context && !comment_context && event.name() == SPACES => {
                let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                value.push_str(&" ".repeat(count));
            }
            Event::Text(event) if element_context && !comment_context => value.push_bytes_text(&event)?,
            Event::GeneralRef(event) if element_context && !comment_context => value.push_bytes_ref(&event)?,
        });
        Ok(sheet)
    }
}

/// Declared kind of a table cell from its `office:value-type`
fn read_cell_kind(event: &BytesStart) -> Result<CellType, RustySubtableError> {
    let value_type = match event.get_attribute_value("office:value-type")? {
        Some(value_type) => value_type,
        None => return Ok(CellType::Empty),
    };
    let is_error = event.get_attribute_value("calcext:value-type")?.as_deref() == Some("error");
    let is_formula = event.has_attribute("table:formula")?;
    let kind = match (value_type.as_ref(), is_formula) {
        ("date", _) => CellType::IsoDateTime,
        ("time", _) => CellType::IsoDuration,
        ("boolean", false) => CellType::Boolean,
        ("boolean", true) => CellType::Formula(FormulaResult::Boolean),
        ("string", false) if is_error => CellType::Error,
        ("string", false) => CellType::InlineString,
        ("string", true) if is_error => CellType::Formula(FormulaResult::Error),
        ("string", true) => CellType::Formula(FormulaResult::Text),
        (_, false) => CellType::Number,
        (_, true) => CellType::Formula(FormulaResult::Number),
    };
    Ok(kind)
}

/// Value of a non-text cell, carried by an `office:*-value` attribute
fn read_cell_value(event: &BytesStart) -> Result<String, RustySubtableError> {
    let value_type = event.get_attribute_value("office:value-type")?;
    let value = match value_type.as_deref() {
        Some("boolean") => event
            .get_attribute_value("office:boolean-value")?
            .map(|value| if value != "false" && value != "0" { "1" } else { "0" }.to_owned()),
        Some("date") => event.get_attribute_value("office:date-value")?.map(|value| value.to_string()),
        Some("time") => event.get_attribute_value("office:time-value")?.map(|value| value.to_string()),
        Some(_) => event.get_attribute_value("office:value")?.map(|value| value.to_string()),
        None => None,
    };
    Ok(value.unwrap_or_default())
}

/// Validates the `mimetype` part when it is present
fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), RustySubtableError> {
    if let Some(file) = &mut zip.entry("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Checks the manifest for encryption data on any entry
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, RustySubtableError> {
    let mut reader = match zip.xml_part(MANIFEST)? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == MANIFEST_FILE_ENTRY => in_file_entry = true,
        Event::End(event) if event.name() == MANIFEST_FILE_ENTRY => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == MANIFEST_ENCRYPTION_DATA => return Ok(true),
    });
    Ok(false)
}

fn load_table_names(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<String>, RustySubtableError> {
    let mut reader = zip.required_xml_part(CONTENT)?;
    let mut names = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TABLE => {
            if let Some(name) = event.get_attribute_value("table:name")? {
                names.push(name.to_string());
            }
        }
    });
    Ok(names)
}
