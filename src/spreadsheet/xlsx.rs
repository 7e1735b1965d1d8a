use crate::error::RustySubtableError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::match_xml_events;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::FormulaResult;
use crate::spreadsheet::excel;
use crate::spreadsheet::reference::range_to_indexes;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::MergedRegion;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_FORMULA: QName = QName(b"f");               // Formula of a cell
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content
const TAG_MERGE_CELL: QName = QName(b"mergeCell");    // Merged region

/// Represents an Excel XLSX spreadsheet file
pub struct XlsxSpreadsheet {
    /// File name of the spreadsheet
    name: String,
    /// ZIP archive containing the XLSX file contents
    zip: ZipArchive<UnifiedReader>,
    /// Cell types indexed by style ID
    number_formats: Vec<CellType>,
    /// Shared string table, loaded on first sheet read
    shared_strings: Option<Vec<String>>,
    /// List of worksheets with (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    /// Opens an XLSX file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<XlsxSpreadsheet, RustySubtableError> {
        let name = path.as_ref().to_string_lossy().to_string();
        Self::from_reader(&name, UnifiedReader::open(path)?)
    }

    /// Opens an XLSX package already held in memory
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<XlsxSpreadsheet, RustySubtableError> {
        Self::from_reader(name, UnifiedReader::from_bytes(bytes))
    }

    fn from_reader(name: &str, reader: UnifiedReader) -> Result<XlsxSpreadsheet, RustySubtableError> {
        let mut zip = excel::open_package(name, reader)?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmpty(name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        Ok(XlsxSpreadsheet {
            name: name.to_owned(),
            zip,
            number_formats,
            shared_strings: None,
            sheets,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Parses one worksheet part into a `Sheet`, including its `<mergeCells>` regions
    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, RustySubtableError> {
        let zip_path = match self.sheets.iter().find(|(name, _)| name == sheet_name) {
            Some((_, zip_path)) => zip_path.to_owned(),
            None => return Err(self.sheet_not_found(sheet_name)),
        };
        if self.shared_strings.is_none() {
            self.shared_strings = Some(load_shared_strings(&mut self.zip)?);
        }
        let XlsxSpreadsheet { name, zip, number_formats, shared_strings, .. } = self;
        let shared_strings = shared_strings.as_deref().unwrap_or_default();

        let mut sheet = Sheet::new(name.as_str(), sheet_name);
        let mut reader = zip.required_xml_part(&zip_path)?;
        let mut next_row = 0usize;
        let mut next_col = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut is_formula = false;
        let mut value = String::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                row = event.parse_attribute_value::<usize>("r")?
                    .filter(|number| *number > 0)
                    .map(|number| number - 1)
                    .unwrap_or(next_row);
                next_row = row + 1;
                next_col = 0;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row, next_col));
                next_col = col + 1;
                is_formula = false;
                value.clear();
                kind = match event.get_attribute_value("t")?.as_deref() {
                    Some("inlineStr") | Some("str") => CellType::InlineString,
                    Some("s") => CellType::SharedString,
                    Some("d") => CellType::IsoDateTime,
                    Some("b") => CellType::Boolean,
                    Some("e") => CellType::Error,
                    _ => CellType::Number,
                };
                if kind == CellType::Number {
                    if let Some(format_id) = event.get_attribute_value("s")?.filter(|id| !id.is_empty()) {
                        let index = format_id.parse::<usize>()?;
                        kind = number_formats.get(index).copied().unwrap_or(CellType::Number);
                    }
                }
            }
            Event::Start(event) if event.name() == TAG_FORMULA => is_formula = true,
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if !value.is_empty() {
                    if kind == CellType::SharedString {
                        let index = value.trim().parse::<usize>()?;
                        value = shared_strings.get(index).cloned().unwrap_or_default();
                    }
                    let kind = if is_formula { formula_kind(kind) } else { kind };
                    sheet.push(Cell::new(row, col, kind, value.as_str()));
                }
                value.clear();
            }
            Event::Start(event) if event.name() == TAG_MERGE_CELL => {
                if let Some((start, end)) = event.get_attribute_value("ref")?
                    .and_then(|range| range_to_indexes(&range))
                {
                    sheet.merge(MergedRegion::from_indexes(start, end));
                }
            }
        });
        Ok(sheet)
    }
}

/// Declared kind of a formula cell, derived from the kind of its cached result.
/// Date-formatted numbers and ISO dates keep their date kind.
fn formula_kind(kind: CellType) -> CellType {
    match kind {
        CellType::Boolean => CellType::Formula(FormulaResult::Boolean),
        CellType::Number => CellType::Formula(FormulaResult::Number),
        CellType::Error => CellType::Formula(FormulaResult::Error),
        CellType::InlineString | CellType::SharedString => CellType::Formula(FormulaResult::Text),
        other => other,
    }
}

/// Loads the whole shared string table; a missing part means no shared strings
fn load_shared_strings(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<String>, RustySubtableError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_part("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Loads worksheet names and part paths, and whether the 1904 date system is used
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<(Vec<(String, String)>, bool), RustySubtableError> {
    let relationships = excel::load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.required_xml_part("xl/workbook.xml")?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads the style table of styles.xml as one `CellType` per cell format index
fn load_number_formats(zip: &mut ZipArchive<UnifiedReader>, is_1904: bool) -> Result<Vec<CellType>, RustySubtableError> {
    let mut reader = match zip.xml_part("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            format_indexes.push(event.get_attribute_value("numFmtId")?.unwrap_or_default().to_string());
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Reads string content up to `end_tag`, skipping phonetic annotations.
/// With `is_text_content` the element's own text counts; otherwise only `<t>` runs do.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, RustySubtableError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::spreadsheet::sheet::Grid;
    use crate::spreadsheet::testutil::zip_parts;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <workbookPr date1904="false"/>
  <sheets>
    <sheet name="Report" sheetId="1" r:id="rId1"/>
    <sheet name="Empty" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/></numFmts>
  <cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="2"/></cellXfs>
</styleSheet>"#;

    const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>Sample Data Report</t></si>
  <si><r><t>Name</t></r><r><t xml:space="preserve"> &amp; Title</t></r><rPh><t>ignored</t></rPh></si>
  <si><t>Amount</t></si>
</sst>"#;

    const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c></row>
    <row r="3"><c r="A3" t="s"><v>1</v></c><c r="B3" t="s"><v>2</v></c><c r="C3" t="inlineStr"><is><t>When</t></is></c></row>
    <row r="4"><c r="A4" t="str"><f>UPPER("x")</f><v>X</v></c><c r="B4"><v>42</v></c><c r="C4" s="1"><v>45292</v></c></row>
    <row r="5"><c r="A5" t="b"><v>1</v></c><c r="B5"><f>B4/0</f><v>2.5</v></c><c r="C5" t="e"><v>#DIV/0!</v></c></row>
    <row><c t="inlineStr"><is><t>positional</t></is></c><c r="C6"/></row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A1:C2"/></mergeCells>
</worksheet>"#;

    const SHEET2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#;

    pub(crate) fn sample_xlsx() -> Vec<u8> {
        zip_parts(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/styles.xml", STYLES),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ])
    }

    #[test]
    fn test_sheet_names() {
        let spreadsheet = XlsxSpreadsheet::from_bytes("sample.xlsx", sample_xlsx()).unwrap();
        assert_eq!(spreadsheet.sheet_names(), vec!["Report".to_owned(), "Empty".to_owned()]);
    }

    #[test]
    fn test_read_cells() {
        let mut spreadsheet = XlsxSpreadsheet::from_bytes("sample.xlsx", sample_xlsx()).unwrap();
        let sheet = spreadsheet.read_sheet("Report").unwrap();
        let cell = |row, column| sheet.cell(row, column).map(|cell| (cell.kind, cell.value.as_str()));

        assert_eq!(cell(1, 1), Some((CellType::SharedString, "Sample Data Report")));
        assert_eq!(cell(3, 1), Some((CellType::SharedString, "Name & Title")));
        assert_eq!(cell(3, 3), Some((CellType::InlineString, "When")));
        assert_eq!(cell(4, 1), Some((CellType::Formula(FormulaResult::Text), "X")));
        assert_eq!(cell(4, 2), Some((CellType::Number, "42")));
        assert_eq!(cell(4, 3), Some((CellType::NumberDate1900, "45292")));
        assert_eq!(cell(5, 1), Some((CellType::Boolean, "1")));
        assert_eq!(cell(5, 2), Some((CellType::Formula(FormulaResult::Number), "2.5")));
        assert_eq!(cell(5, 3), Some((CellType::Error, "#DIV/0!")));
        assert_eq!(cell(6, 1), Some((CellType::InlineString, "positional")));
        assert_eq!(cell(6, 3), None);
        assert_eq!(sheet.max_row(), 6);
        assert_eq!(sheet.max_column(), 3);
    }

    #[test]
    fn test_read_merged_regions() {
        let mut spreadsheet = XlsxSpreadsheet::from_bytes("sample.xlsx", sample_xlsx()).unwrap();
        let sheet = spreadsheet.read_sheet("Report").unwrap();
        assert_eq!(
            sheet.merged_regions(),
            &[MergedRegion { first_row: 1, first_column: 1, last_row: 2, last_column: 3 }]
        );
        assert!(sheet.is_merged(2, 2));
    }

    #[test]
    fn test_empty_sheet() {
        let mut spreadsheet = XlsxSpreadsheet::from_bytes("sample.xlsx", sample_xlsx()).unwrap();
        let sheet = spreadsheet.read_sheet("Empty").unwrap();
        assert!(sheet.is_empty());
        assert_eq!(sheet.max_row(), 0);
    }

    #[test]
    fn test_sheet_not_found() {
        let mut spreadsheet = XlsxSpreadsheet::from_bytes("sample.xlsx", sample_xlsx()).unwrap();
        let result = spreadsheet.read_sheet("Missing");
        assert!(matches!(
            result,
            Err(RustySubtableError::SpreadsheetError(SpreadsheetError::SheetNotFound { .. }))
        ));
    }

    #[test]
    fn test_workbook_without_sheets() {
        let workbook = r#"<workbook><sheets/></workbook>"#;
        let relationships = r#"<Relationships/>"#;
        let bytes = zip_parts(&[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", relationships),
        ]);
        let result = XlsxSpreadsheet::from_bytes("empty.xlsx", bytes);
        assert!(matches!(
            result,
            Err(RustySubtableError::SpreadsheetError(SpreadsheetError::SpreadsheetEmpty(_)))
        ));
    }
}
