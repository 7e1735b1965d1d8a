use crate::error::RustySubtableError;
use glob::Pattern;

/// Criteria for selecting which sheets of a spreadsheet to process.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    /// Sheet name patterns; `None` accepts every sheet.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Maximum number of sheets to process.
    pub sheet_limit: Option<usize>,
}

impl Criteria {
    /// Builds criteria from glob patterns such as `"Q*"` or `"Report [0-9]"`.
    pub fn with_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, RustySubtableError> {
        let patterns = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Criteria {
            sheet_name_patterns: Some(patterns),
            sheet_limit: None,
        })
    }

    /// Checks if a sheet name matches the criteria patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }

    /// Filters sheet names in workbook order, honouring the sheet limit.
    pub fn select(&self, sheet_names: &[String]) -> Vec<String> {
        sheet_names
            .iter()
            .filter(|name| self.accept(name))
            .take(self.sheet_limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        ["Summary", "Q1", "Q2", "Notes"].iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_accept_all_by_default() {
        let criteria = Criteria::default();
        assert!(criteria.accept("anything"));
        assert_eq!(criteria.select(&names()).len(), 4);
    }

    #[test]
    fn test_select_by_pattern() {
        let criteria = Criteria::with_patterns(&["Q*"]).unwrap();
        assert_eq!(criteria.select(&names()), vec!["Q1".to_owned(), "Q2".to_owned()]);
    }

    #[test]
    fn test_select_with_limit() {
        let mut criteria = Criteria::with_patterns(&["Q*", "Notes"]).unwrap();
        criteria.sheet_limit = Some(2);
        assert_eq!(criteria.select(&names()), vec!["Q1".to_owned(), "Q2".to_owned()]);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Criteria::with_patterns(&["[unclosed"]).is_err());
    }
}
