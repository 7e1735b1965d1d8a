//! Part lookup inside the ZIP packages of `.xlsx` and `.ods` files
use crate::error::RustySubtableError;
use crate::helpers::xml::XmlReader;
use crate::spreadsheet::SpreadsheetError;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// XML reader over one package part
pub(crate) type PartReader<'a, RS> = XmlReader<BufReader<ZipFile<'a, RS>>>;

pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Finds a package entry. Names compare case-insensitively and `\` equals `/`.
    fn entry(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, RustySubtableError>;

    /// XML reader for an optional part
    fn xml_part(&'_ mut self, name: &str) -> Result<Option<PartReader<'_, RS>>, RustySubtableError>;

    /// XML reader for a part the package cannot do without
    fn required_xml_part(&'_ mut self, name: &str) -> Result<PartReader<'_, RS>, RustySubtableError> {
        match self.xml_part(name)? {
            Some(reader) => Ok(reader),
            None => Err(SpreadsheetError::MissingPart(name.to_owned()).into()),
        }
    }
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn entry(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, RustySubtableError> {
        let wanted = name.replace('\\', "/");
        let Some(stored) = self
            .file_names()
            .find(|stored| stored.replace('\\', "/").eq_ignore_ascii_case(&wanted))
            .map(str::to_owned)
        else {
            return Ok(None);
        };
        match self.by_name(&stored) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_part(&'_ mut self, name: &str) -> Result<Option<PartReader<'_, RS>>, RustySubtableError> {
        Ok(self.entry(name)?.map(|file| XmlReader::new(BufReader::new(file))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::testutil::zip_parts;
    use std::io::Cursor;

    fn archive() -> ZipArchive<Cursor<Vec<u8>>> {
        ZipArchive::new(Cursor::new(zip_parts(&[("xl/Workbook.xml", "<workbook/>")]))).unwrap()
    }

    #[test]
    fn test_entry_lookup() {
        let mut zip = archive();
        assert!(zip.entry("xl/workbook.xml").unwrap().is_some());
        assert!(zip.entry("XL\\WORKBOOK.XML").unwrap().is_some());
        assert!(zip.entry("xl/styles.xml").unwrap().is_none());
    }

    #[test]
    fn test_required_part() {
        let mut zip = archive();
        assert!(zip.required_xml_part("xl/workbook.xml").is_ok());
        assert!(zip.xml_part("xl/styles.xml").unwrap().is_none());
        assert!(matches!(
            zip.required_xml_part("xl/styles.xml"),
            Err(RustySubtableError::SpreadsheetError(SpreadsheetError::MissingPart(name))) if name == "xl/styles.xml"
        ));
    }
}
