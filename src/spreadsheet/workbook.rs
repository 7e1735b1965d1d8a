use crate::error::RustySubtableError;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;

/// A spreadsheet assembled in memory from already loaded sheets.
#[derive(Clone, Debug, Default)]
pub struct Workbook {
    pub name: String,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(name: &str) -> Self {
        Workbook {
            name: name.to_owned(),
            sheets: Vec::new(),
        }
    }

    /// Appends a sheet and returns it for population.
    pub fn add_sheet(&mut self, sheet_name: &str) -> &mut Sheet {
        let index = self.sheets.len();
        self.sheets.push(Sheet::new(&self.name, sheet_name));
        &mut self.sheets[index]
    }
}

impl Spreadsheet for Workbook {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.to_owned()).collect()
    }

    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, RustySubtableError> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name == sheet_name)
            .cloned()
            .ok_or_else(|| self.sheet_not_found(sheet_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::sheet::Grid;

    #[test]
    fn test_read_sheet() {
        let mut workbook = Workbook::new("memory");
        workbook.add_sheet("First").set_text("A1", "one");
        workbook.add_sheet("Second").set_text("B2", "two");

        assert_eq!(workbook.sheet_names(), vec!["First".to_owned(), "Second".to_owned()]);
        let sheet = workbook.read_sheet("Second").unwrap();
        assert_eq!(sheet.file_name, "memory");
        assert_eq!(sheet.cell(2, 2).map(|cell| cell.value.as_str()), Some("two"));
        assert!(workbook.read_sheet("Third").is_err());
    }
}
