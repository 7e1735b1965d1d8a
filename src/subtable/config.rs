//! Declarative search configuration.
//!
//! A [`SearchConfig`] is built in code or loaded from JSON. Positions are
//! written as letters (`"C"`) or 1-based numbers (`3`), patterns as strings.
use crate::error::ResultMessage;
use crate::error::RustySubtableError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::index_to_col;
use crate::subtable::pattern::Pattern;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors found in a search configuration
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid column position '{0}'")]
    InvalidColumn(String),

    #[error("Column {0} is configured more than once")]
    DuplicateColumn(Column),

    #[error("end_pattern and end_pattern_column must be set together")]
    IncompleteEndPattern,
}

/// A 1-based column position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Column(usize);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColumn {
    Index(usize),
    Letter(String),
}

impl Column {
    pub fn new(index: usize) -> Result<Self, ConfigError> {
        if index == 0 {
            Err(ConfigError::InvalidColumn(index.to_string()))?;
        }
        Ok(Column(index))
    }

    /// Parses column letters such as "A" or "AB", case-insensitively.
    pub fn from_letter(letter: &str) -> Result<Self, ConfigError> {
        col_to_index(letter.trim())
            .map(|index| Column(index + 1))
            .ok_or_else(|| ConfigError::InvalidColumn(letter.to_owned()))
    }

    pub fn index(&self) -> usize {
        self.0
    }

    pub fn letter(&self) -> String {
        index_to_col(self.0 - 1)
    }

    /// A1-style reference of this column at a 1-based row.
    pub fn reference(&self, row: usize) -> String {
        format!("{}{}", self.letter(), row)
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Column {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().parse::<usize>() {
            Ok(index) => Column::new(index),
            Err(_) => Column::from_letter(value),
        }
    }
}

impl TryFrom<&str> for Column {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<usize> for Column {
    type Error = ConfigError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Column::new(index)
    }
}

impl<'de> Deserialize<'de> for Column {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let column = match RawColumn::deserialize(deserializer)? {
            RawColumn::Index(index) => Column::new(index),
            RawColumn::Letter(letter) => letter.parse(),
        };
        column.map_err(serde::de::Error::custom)
    }
}

/// An explicitly configured column.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ColumnSpec {
    pub position: Column,
    /// Matched against the trimmed header cell text
    pub header_pattern: Pattern,
    /// Matched against every value in the column, including empty values
    #[serde(default = "Pattern::any")]
    pub value_pattern: Pattern,
}

impl ColumnSpec {
    pub fn new(position: Column, header_pattern: Pattern, value_pattern: Pattern) -> Self {
        ColumnSpec {
            position,
            header_pattern,
            value_pattern,
        }
    }

    /// Builds a column spec from its textual form, e.g. `("B", "Amount", "[0-9]+")`.
    pub fn parse(position: &str, header_pattern: &str, value_pattern: &str) -> Result<Self, ConfigError> {
        Ok(ColumnSpec {
            position: position.parse()?,
            header_pattern: Pattern::new(header_pattern)?,
            value_pattern: Pattern::new(value_pattern)?,
        })
    }
}

/// Locates the label preceding a subtable.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SectionHeaderSpec {
    pub pattern: Pattern,
    /// The only column examined
    pub start_position: Column,
    /// Look for a merged region starting at `start_position` instead of a plain cell
    #[serde(default)]
    pub is_merged: bool,
    #[serde(default)]
    pub expected_merged_row_span: Option<usize>,
    #[serde(default)]
    pub expected_merged_column_span: Option<usize>,
}

impl SectionHeaderSpec {
    pub fn new(pattern: Pattern, start_position: Column) -> Self {
        SectionHeaderSpec {
            pattern,
            start_position,
            is_merged: false,
            expected_merged_row_span: None,
            expected_merged_column_span: None,
        }
    }

    /// Requires the label to be a merged region, optionally of exact dimensions.
    pub fn merged(mut self, row_span: Option<usize>, column_span: Option<usize>) -> Self {
        self.is_merged = true;
        self.expected_merged_row_span = row_span;
        self.expected_merged_column_span = column_span;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RowValidationSpec {
    /// 0 disables the check
    pub minimum_filled_columns: usize,
}

/// When the row scan halts. Zero thresholds are unbounded.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StopPolicy {
    pub max_consecutive_invalid_rows: usize,
    pub max_consecutive_blank_rows: usize,
    /// Halt on a bound column cell belonging to a merged region
    pub stop_on_merged_cell: bool,
    pub end_pattern: Option<Pattern>,
    /// Checked whether or not the column is bound
    pub end_pattern_column: Option<Column>,
}

/// Complete configuration of one extraction.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub columns: Vec<ColumnSpec>,
    pub section_header: Option<SectionHeaderSpec>,
    pub row_validation: RowValidationSpec,
    #[serde(flatten)]
    pub stop_policy: StopPolicy,
    /// Tried in order against unbound header cells, first match wins
    pub discoverable_header_patterns: Vec<Pattern>,
    /// Fail on any non-empty header cell left unbound
    pub strict_columns: bool,
    pub extract_multiple: bool,
    pub max_subtables: Option<usize>,
    pub max_blank_rows_between_subtables: usize,
    pub combine_subtables: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            columns: Vec::new(),
            section_header: None,
            row_validation: RowValidationSpec::default(),
            stop_policy: StopPolicy::default(),
            discoverable_header_patterns: Vec::new(),
            strict_columns: false,
            extract_multiple: false,
            max_subtables: None,
            max_blank_rows_between_subtables: 50,
            combine_subtables: true,
        }
    }
}

impl SearchConfig {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        SearchConfig {
            columns,
            ..Default::default()
        }
    }

    /// Checks that column positions are unique and the end pattern is complete.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut positions = HashSet::new();
        for spec in &self.columns {
            if !positions.insert(spec.position) {
                Err(ConfigError::DuplicateColumn(spec.position))?;
            }
        }
        if self.stop_policy.end_pattern.is_some() != self.stop_policy.end_pattern_column.is_some() {
            Err(ConfigError::IncompleteEndPattern)?;
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, RustySubtableError> {
        let config: SearchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, RustySubtableError> {
        let path = path.as_ref();
        let prefix = format!("Failed to load search config '{}'", path.display());
        let json = std::fs::read_to_string(path)
            .map_err(RustySubtableError::from)
            .with_prefix(&prefix)?;
        Self::from_json_str(&json).with_prefix(&prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_positions() {
        assert_eq!(Column::from_letter("A").unwrap().index(), 1);
        assert_eq!(Column::from_letter("ab").unwrap().index(), 28);
        assert_eq!("3".parse::<Column>().unwrap().letter(), "C");
        assert_eq!(Column::try_from(26usize).unwrap().to_string(), "Z");
        assert_eq!(Column::new(3).unwrap().reference(14), "C14");
    }

    #[test]
    fn test_invalid_column_positions() {
        assert_eq!(Column::new(0), Err(ConfigError::InvalidColumn("0".to_owned())));
        assert!(Column::from_letter("A1").is_err());
        assert!("".parse::<Column>().is_err());
    }

    #[test]
    fn test_validate_duplicate_column() {
        let config = SearchConfig::new(vec![
            ColumnSpec::parse("A", "colA", ".*").unwrap(),
            ColumnSpec::parse("1", "other", ".*").unwrap(),
        ]);
        assert_eq!(config.validate(), Err(ConfigError::DuplicateColumn(Column(1))));
    }

    #[test]
    fn test_validate_end_pattern() {
        let mut config = SearchConfig::new(vec![ColumnSpec::parse("A", "colA", ".*").unwrap()]);
        config.stop_policy.end_pattern = Some(Pattern::new("Total").unwrap());
        assert_eq!(config.validate(), Err(ConfigError::IncompleteEndPattern));
        config.stop_policy.end_pattern_column = Some(Column(1));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.max_blank_rows_between_subtables, 50);
        assert!(config.combine_subtables);
        assert!(!config.extract_multiple);
        assert_eq!(config.stop_policy.max_consecutive_invalid_rows, 0);
    }

    #[test]
    fn test_from_json_str() {
        let config = SearchConfig::from_json_str(r#"{
            "columns": [
                {"position": "A", "header_pattern": "colA", "value_pattern": ".+"},
                {"position": 2, "header_pattern": "colB"}
            ],
            "section_header": {"pattern": "Sample.*", "start_position": "A", "is_merged": true, "expected_merged_column_span": 3},
            "row_validation": {"minimum_filled_columns": 1},
            "max_consecutive_blank_rows": 2,
            "end_pattern": "Total",
            "end_pattern_column": "A",
            "discoverable_header_patterns": ["Note.*"],
            "extract_multiple": true
        }"#).unwrap();

        assert_eq!(config.columns.len(), 2);
        assert_eq!(config.columns[1].position, Column(2));
        assert!(config.columns[1].value_pattern.matches(""));
        assert!(!config.columns[0].value_pattern.matches(""));
        let section = config.section_header.as_ref().unwrap();
        assert!(section.is_merged);
        assert_eq!(section.expected_merged_column_span, Some(3));
        assert_eq!(section.expected_merged_row_span, None);
        assert_eq!(config.row_validation.minimum_filled_columns, 1);
        assert_eq!(config.stop_policy.max_consecutive_blank_rows, 2);
        assert_eq!(config.stop_policy.end_pattern_column, Some(Column(1)));
        assert_eq!(config.discoverable_header_patterns.len(), 1);
        assert!(config.extract_multiple);
        assert_eq!(config.max_blank_rows_between_subtables, 50);
    }

    #[test]
    fn test_from_json_str_rejects_bad_values() {
        let bad_pattern = r#"{"columns": [{"position": "A", "header_pattern": "("}]}"#;
        assert!(matches!(SearchConfig::from_json_str(bad_pattern), Err(RustySubtableError::JsonError(_))));

        let bad_column = r#"{"columns": [{"position": 0, "header_pattern": "a"}]}"#;
        assert!(matches!(SearchConfig::from_json_str(bad_column), Err(RustySubtableError::JsonError(_))));

        let duplicate = r#"{"columns": [
            {"position": "A", "header_pattern": "a"},
            {"position": "a", "header_pattern": "b"}
        ]}"#;
        assert!(matches!(
            SearchConfig::from_json_str(duplicate),
            Err(RustySubtableError::ConfigError(ConfigError::DuplicateColumn(_)))
        ));
    }

    #[test]
    fn test_from_json_file_missing() {
        let error = SearchConfig::from_json_file("missing-config.json").unwrap_err();
        assert!(matches!(error, RustySubtableError::WithContextError(_)));
        assert!(error.to_string().starts_with("Failed to load search config 'missing-config.json': "));
    }
}
