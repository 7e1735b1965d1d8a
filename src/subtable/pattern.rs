use crate::subtable::config::ConfigError;
use regex::Regex;
use regex::RegexBuilder;
use serde::Deserialize;
use serde::Deserializer;
use std::fmt::Display;
use std::str::FromStr;

/// A regular expression matched against the whole of a text.
///
/// `".*"` accepts the empty string while `".+"` rejects it, because the
/// expression is compiled as `^(?:...)$`. `.` also matches line breaks, so
/// multi-line cell text is matched as a whole.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    /// `None` accepts every text
    regex: Option<Regex>,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, ConfigError> {
        let regex = RegexBuilder::new(&format!("^(?:{source})$"))
            .dot_matches_new_line(true)
            .build()
            .map_err(|error| ConfigError::InvalidPattern {
                pattern: source.to_owned(),
                message: error.to_string(),
            })?;
        Ok(Pattern {
            source: source.to_owned(),
            regex: Some(regex),
        })
    }

    /// Accepts anything, including empty and multi-line text.
    pub fn any() -> Self {
        Pattern {
            source: ".*".to_owned(),
            regex: None,
        }
    }

    /// The expression as written, without the anchors.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, text: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(text),
            None => true,
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.regex.is_some() == other.regex.is_some()
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl FromStr for Pattern {
    type Err = ConfigError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Pattern::new(source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}
