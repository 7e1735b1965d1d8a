use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::FormulaResult;
use crate::spreadsheet::sheet::Grid;
use chrono::DateTime;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use iso8601_duration::Duration as IsoDuration;
use serde::Serialize;
use std::fmt::Display;

/// Largest magnitude at which every whole `f64` is exactly representable
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;
const MILLISECONDS_PER_DAY: f64 = 86_400_000.0;
/// Days from the 1900 to the 1904 date system
const DATE_1904_OFFSET: i64 = 1_462;

/// Typed scalar of one extracted cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Empty,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    /// Error code such as `#DIV/0!`
    Error(String),
}

impl Value {
    /// Types the cell at a grid position; absent cells are empty.
    pub fn from_cell(cell: Option<&Cell>) -> Self {
        match cell {
            Some(cell) => Self::convert(cell.kind, &cell.value),
            None => Value::Empty,
        }
    }

    /// Maps a declared kind and raw value to a scalar.
    /// Payloads that fail to parse as their declared kind are kept as text.
    pub fn convert(kind: CellType, raw: &str) -> Self {
        if raw.is_empty() {
            return Value::Empty;
        }
        match kind {
            CellType::Empty => Value::Empty,
            CellType::InlineString | CellType::SharedString => Value::Text(raw.to_owned()),
            CellType::Boolean => Value::Boolean(raw == "1" || raw.eq_ignore_ascii_case("true")),
            CellType::Number => to_number(raw),
            CellType::NumberDate1900 | CellType::NumberDate1904 => {
                to_serial_datetime(raw, kind.is_1904(), true).unwrap_or_else(|| Value::Text(raw.to_owned()))
            }
            CellType::NumberDateTime1900 | CellType::NumberDateTime1904 => {
                to_serial_datetime(raw, kind.is_1904(), false).unwrap_or_else(|| Value::Text(raw.to_owned()))
            }
            CellType::NumberTime1900 | CellType::NumberTime1904 => {
                to_serial_time(raw).unwrap_or_else(|| Value::Text(raw.to_owned()))
            }
            CellType::IsoDateTime => to_iso_datetime(raw).unwrap_or_else(|| Value::Text(raw.to_owned())),
            CellType::IsoDuration => to_iso_duration(raw).unwrap_or_else(|| Value::Text(raw.to_owned())),
            CellType::Error => Value::Error(raw.to_owned()),
            CellType::Formula(FormulaResult::Boolean) => Self::convert(CellType::Boolean, raw),
            CellType::Formula(FormulaResult::Number) => Self::convert(CellType::Number, raw),
            CellType::Formula(FormulaResult::Text | FormulaResult::Error) => Value::Text(raw.to_owned()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(text) => write!(f, "{text}"),
            Value::Integer(integer) => write!(f, "{integer}"),
            Value::Real(real) => write!(f, "{real}"),
            Value::Boolean(boolean) => write!(f, "{boolean}"),
            Value::Timestamp(timestamp) => write!(f, "{timestamp}"),
            Value::Error(code) => write!(f, "ERROR: {code}"),
        }
    }
}

/// String form of the cell at a 1-based grid position, empty when absent
pub(crate) fn cell_text<G: Grid + ?Sized>(grid: &G, row: usize, column: usize) -> String {
    Value::from_cell(grid.cell(row, column)).to_string()
}

fn to_number(raw: &str) -> Value {
    match raw.trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER => {
            Value::Integer(number as i64)
        }
        Ok(number) => Value::Real(number),
        Err(_) => Value::Text(raw.to_owned()),
    }
}

/// Day zero of serial dates, chosen so that serial 61 is 1900-03-01
fn serial_base() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

/// Converts an Excel serial number to a timestamp.
/// Serials below 60 in the 1900 system are shifted by one day for the
/// nonexistent 1900-02-29 (Lotus 1-2-3 leap year bug).
fn to_serial_datetime(raw: &str, is_1904: bool, date_only: bool) -> Option<Value> {
    let serial = raw.trim().parse::<f64>().ok().filter(|serial| serial.is_finite())?;
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        DATE_1904_OFFSET
    } else if days < 60 {
        1
    } else {
        0
    };
    let mut timestamp = serial_base()?.checked_add_signed(Duration::try_days(days + offset)?)?;
    if !date_only {
        let milliseconds = (serial.fract() * MILLISECONDS_PER_DAY).round() as i64;
        timestamp = timestamp.checked_add_signed(Duration::try_milliseconds(milliseconds)?)?;
    }
    Some(Value::Timestamp(timestamp))
}

/// A fraction of a day placed on the serial base date
fn to_serial_time(raw: &str) -> Option<Value> {
    let serial = raw.trim().parse::<f64>().ok().filter(|serial| serial.is_finite())?;
    let milliseconds = (serial.fract().abs() * MILLISECONDS_PER_DAY).round() as i64;
    let timestamp = serial_base()?.checked_add_signed(Duration::try_milliseconds(milliseconds)?)?;
    Some(Value::Timestamp(timestamp))
}

fn to_iso_datetime(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    let timestamp = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|datetime| datetime.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(Value::Timestamp(timestamp))
}

/// ISO 8601 durations such as `PT01H30M00S`, as an offset from the serial base date
fn to_iso_duration(raw: &str) -> Option<Value> {
    let duration = raw.trim().parse::<IsoDuration>().ok()?;
    let seconds = ((duration.day as f64 * 24.0 + duration.hour as f64) * 60.0 + duration.minute as f64) * 60.0
        + duration.second as f64;
    let milliseconds = (seconds * 1_000.0).round() as i64;
    let timestamp = serial_base()?.checked_add_signed(Duration::try_milliseconds(milliseconds)?)?;
    Some(Value::Timestamp(timestamp))
}
