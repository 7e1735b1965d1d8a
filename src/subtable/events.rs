//! Structured diagnostics of an extraction.
//!
//! The engine reports every locator, validator and stop decision as an
//! [`ExtractionEvent`]. Sinks decide what to do with them; the default drops them.
use crate::subtable::config::Column;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Mutex;

/// Why a row scan halted
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ScanOutcome {
    /// A stop condition triggered on a row, which was not included
    StopCondition(StopCondition),
    InvalidThreshold,
    BlankThreshold,
    /// The last row of the grid was processed
    GridExhausted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum StopCondition {
    /// A bound column's cell lies inside a merged region
    MergedCell { row: usize, position: Column },
    /// The end pattern matched the text at the end pattern column
    EndPattern { row: usize, position: Column, text: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExtractionEvent {
    SectionFound { label: String, first_row: usize, last_row: usize },
    SectionNotFound { from_row: usize },
    HeaderRowFound { row: usize },
    HeaderRowNotFound { from_row: usize },
    ColumnBound { position: Column, field_name: String, discovered: bool },
    NoColumnsBound { row: usize },
    RowAccepted { row: usize },
    RowRejected { row: usize, blank: bool, reason: String },
    ScanFinished { outcome: ScanOutcome, rows: usize },
    SubtableCompleted { subtable_index: usize, rows: usize },
    SubtableMissed { from_row: usize, gap: usize },
}

impl Display for ScanOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanOutcome::StopCondition(StopCondition::MergedCell { row, position }) => {
                write!(f, "merged cell at {}", position.reference(*row))
            }
            ScanOutcome::StopCondition(StopCondition::EndPattern { row, position, text }) => {
                write!(f, "end pattern matched '{text}' at {}", position.reference(*row))
            }
            ScanOutcome::InvalidThreshold => write!(f, "consecutive invalid rows threshold reached"),
            ScanOutcome::BlankThreshold => write!(f, "consecutive blank rows threshold reached"),
            ScanOutcome::GridExhausted => write!(f, "end of grid"),
        }
    }
}

impl Display for ExtractionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionEvent::SectionFound { label, first_row, last_row } => {
                write!(f, "section '{label}' found at rows {first_row}-{last_row}")
            }
            ExtractionEvent::SectionNotFound { from_row } => write!(f, "no section found from row {from_row}"),
            ExtractionEvent::HeaderRowFound { row } => write!(f, "header row found at row {row}"),
            ExtractionEvent::HeaderRowNotFound { from_row } => write!(f, "no header row found from row {from_row}"),
            ExtractionEvent::ColumnBound { position, field_name, discovered } => {
                let how = if *discovered { "discovered" } else { "configured" };
                write!(f, "column {position} bound to '{field_name}' ({how})")
            }
            ExtractionEvent::NoColumnsBound { row } => write!(f, "no columns bound in header row {row}"),
            ExtractionEvent::RowAccepted { row } => write!(f, "row {row} accepted"),
            ExtractionEvent::RowRejected { row, blank: true, .. } => write!(f, "row {row} rejected: blank"),
            ExtractionEvent::RowRejected { row, reason, .. } => write!(f, "row {row} rejected: {reason}"),
            ExtractionEvent::ScanFinished { outcome, rows } => write!(f, "scan finished with {rows} rows: {outcome}"),
            ExtractionEvent::SubtableCompleted { subtable_index, rows } => {
                write!(f, "subtable {subtable_index} completed with {rows} rows")
            }
            ExtractionEvent::SubtableMissed { from_row, gap } => {
                write!(f, "no subtable from row {from_row} ({gap} consecutive misses)")
            }
        }
    }
}

/// Receives the events of an extraction.
pub trait EventSink: Send + Sync {
    fn record(&self, event: ExtractionEvent);
}

/// Drops every event.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullEvents;

impl EventSink for NullEvents {
    fn record(&self, _event: ExtractionEvent) {}
}

/// Forwards events to the `log` facade: subtable level decisions at `debug`,
/// per-row decisions at `trace`.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogEvents;

impl EventSink for LogEvents {
    fn record(&self, event: ExtractionEvent) {
        match event {
            ExtractionEvent::RowAccepted { .. } | ExtractionEvent::RowRejected { .. } => log::trace!("{event}"),
            _ => log::debug!("{event}"),
        }
    }
}

/// Collects events in order.
impl EventSink for Mutex<Vec<ExtractionEvent>> {
    fn record(&self, event: ExtractionEvent) {
        match self.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_events() {
        let sink: Mutex<Vec<ExtractionEvent>> = Mutex::new(Vec::new());
        sink.record(ExtractionEvent::HeaderRowFound { row: 3 });
        sink.record(ExtractionEvent::RowAccepted { row: 4 });
        let events = sink.into_inner().unwrap();
        assert_eq!(events, vec![
            ExtractionEvent::HeaderRowFound { row: 3 },
            ExtractionEvent::RowAccepted { row: 4 },
        ]);
    }

    #[test]
    fn test_display() {
        let position = Column::new(3).unwrap();
        let event = ExtractionEvent::ScanFinished {
            outcome: ScanOutcome::StopCondition(StopCondition::EndPattern { row: 9, position, text: "Total".to_owned() }),
            rows: 5,
        };
        assert_eq!(event.to_string(), "scan finished with 5 rows: end pattern matched 'Total' at C9");
        let event = ExtractionEvent::RowRejected { row: 7, blank: true, reason: String::new() };
        assert_eq!(event.to_string(), "row 7 rejected: blank");
    }

    #[test]
    fn test_silent_sinks() {
        NullEvents.record(ExtractionEvent::RowAccepted { row: 1 });
        LogEvents.record(ExtractionEvent::SectionNotFound { from_row: 1 });
    }
}
