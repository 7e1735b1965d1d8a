use crate::spreadsheet::sheet::Grid;
use crate::subtable::config::SearchConfig;
use crate::subtable::events::EventSink;
use crate::subtable::events::ExtractionEvent;
use crate::subtable::events::ScanOutcome;
use crate::subtable::mapper::ColumnBinding;
use crate::subtable::record::read_fields;
use crate::subtable::record::ExtractedRow;
use crate::subtable::stop::check_stop;
use crate::subtable::validator::validate_row;

/// Rows accepted by one scan and the reason it halted.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanResult {
    pub rows: Vec<ExtractedRow>,
    pub outcome: ScanOutcome,
}

/// Walks the data rows below a header row.
pub struct RowScanner<'a, G: Grid + ?Sized> {
    pub grid: &'a G,
    pub bindings: &'a [ColumnBinding],
    pub config: &'a SearchConfig,
    pub events: &'a dyn EventSink,
    pub section_label: &'a str,
}

impl<'a, G: Grid + ?Sized> RowScanner<'a, G> {
    /// Scans from `start_row` to the end of the grid.
    ///
    /// Stop conditions are checked first on every row and halt without
    /// including it. Invalid rows advance the invalid counter; blank ones also
    /// advance the blank counter, other invalid rows reset it. A valid row
    /// resets both.
    pub fn scan(&self, start_row: usize) -> ScanResult {
        let policy = &self.config.stop_policy;
        let (start, end) = match (self.bindings.first(), self.bindings.last()) {
            (Some(first), Some(last)) => (first.position, last.position),
            _ => return self.finish(Vec::new(), ScanOutcome::GridExhausted),
        };

        let mut rows = Vec::<ExtractedRow>::new();
        let mut consecutive_invalid = 0usize;
        let mut consecutive_blank = 0usize;
        for row in start_row.max(1)..=self.grid.max_row() {
            if let Some(condition) = check_stop(self.grid, row, self.bindings, policy) {
                return self.finish(rows, ScanOutcome::StopCondition(condition));
            }

            let fields = read_fields(self.grid, row, self.bindings);
            let verdict = validate_row(&fields, self.bindings, &self.config.row_validation);
            if verdict.valid {
                self.events.record(ExtractionEvent::RowAccepted { row });
                rows.push(ExtractedRow {
                    row_number: row,
                    row_start: start.reference(row),
                    row_end: end.reference(row),
                    section_label: self.section_label.to_owned(),
                    sheet_name: self.grid.name().to_owned(),
                    subtable_index: None,
                    fields,
                });
                consecutive_invalid = 0;
                consecutive_blank = 0;
                continue;
            }

            self.events.record(ExtractionEvent::RowRejected {
                row,
                blank: verdict.blank,
                reason: verdict.reason.unwrap_or_default(),
            });
            consecutive_invalid += 1;
            if verdict.blank {
                consecutive_blank += 1;
            } else {
                consecutive_blank = 0;
            }
            if policy.max_consecutive_invalid_rows > 0 && consecutive_invalid >= policy.max_consecutive_invalid_rows {
                return self.finish(rows, ScanOutcome::InvalidThreshold);
            }
            if policy.max_consecutive_blank_rows > 0 && consecutive_blank >= policy.max_consecutive_blank_rows {
                return self.finish(rows, ScanOutcome::BlankThreshold);
            }
        }
        self.finish(rows, ScanOutcome::GridExhausted)
    }

    fn finish(&self, rows: Vec<ExtractedRow>, outcome: ScanOutcome) -> ScanResult {
        self.events.record(ExtractionEvent::ScanFinished {
            outcome: outcome.clone(),
            rows: rows.len(),
        });
        ScanResult { rows, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::sheet::Sheet;
    use crate::subtable::config::Column;
    use crate::subtable::events::NullEvents;
    use crate::subtable::events::StopCondition;
    use crate::subtable::pattern::Pattern;
    use std::sync::Mutex;

    fn bindings() -> Vec<ColumnBinding> {
        ["colA", "colB"]
            .iter()
            .enumerate()
            .map(|(index, name)| ColumnBinding {
                position: Column::new(index + 1).unwrap(),
                field_name: name.to_string(),
                value_pattern: Pattern::new("[a-z0-9]*").unwrap(),
                discovered: false,
            })
            .collect()
    }

    fn scan(sheet: &Sheet, config: &SearchConfig) -> ScanResult {
        let bindings = bindings();
        let scanner = RowScanner {
            grid: sheet,
            bindings: &bindings,
            config,
            events: &NullEvents,
            section_label: "Section",
        };
        scanner.scan(2)
    }

    fn row_numbers(result: &ScanResult) -> Vec<usize> {
        result.rows.iter().map(|row| row.row_number).collect()
    }

    #[test]
    fn test_scan_to_end_of_grid() {
        let mut sheet = Sheet::new("", "Data");
        sheet.set_text("A1", "colA").set_text("A2", "a").set_text("B3", "b").set_text("A5", "c");

        let result = scan(&sheet, &SearchConfig::default());
        assert_eq!(row_numbers(&result), vec![2, 3, 5]);
        assert_eq!(result.outcome, ScanOutcome::GridExhausted);

        let row = &result.rows[1];
        assert_eq!(row.row_start, "A3");
        assert_eq!(row.row_end, "B3");
        assert_eq!(row.section_label, "Section");
        assert_eq!(row.sheet_name, "Data");
    }

    #[test]
    fn test_blank_threshold() {
        let mut sheet = Sheet::new("", "Data");
        sheet.set_text("A2", "a").set_text("A5", "b");

        let mut config = SearchConfig::default();
        config.stop_policy.max_consecutive_blank_rows = 2;
        let result = scan(&sheet, &config);
        assert_eq!(row_numbers(&result), vec![2]);
        assert_eq!(result.outcome, ScanOutcome::BlankThreshold);
    }

    #[test]
    fn test_invalid_row_resets_blank_counter() {
        let mut sheet = Sheet::new("", "Data");
        sheet.set_text("A2", "a").set_text("A4", "BAD").set_text("A6", "b").set_text("A9", "c");

        let mut config = SearchConfig::default();
        config.stop_policy.max_consecutive_blank_rows = 2;
        let result = scan(&sheet, &config);
        assert_eq!(row_numbers(&result), vec![2, 6]);
        assert_eq!(result.outcome, ScanOutcome::BlankThreshold);
    }

    #[test]
    fn test_invalid_threshold() {
        let mut sheet = Sheet::new("", "Data");
        sheet.set_text("A2", "a").set_text("A3", "X").set_text("A5", "Y").set_text("A6", "b");

        let mut config = SearchConfig::default();
        config.stop_policy.max_consecutive_invalid_rows = 3;
        let result = scan(&sheet, &config);
        assert_eq!(row_numbers(&result), vec![2]);
        assert_eq!(result.outcome, ScanOutcome::InvalidThreshold);
    }

    #[test]
    fn test_stop_condition_excludes_row() {
        let mut sheet = Sheet::new("", "Data");
        sheet.set_text("A2", "a").set_text("A3", "end").set_text("A4", "b");

        let mut config = SearchConfig::default();
        config.stop_policy.end_pattern = Some(Pattern::new("end").unwrap());
        config.stop_policy.end_pattern_column = Some(Column::new(1).unwrap());
        let result = scan(&sheet, &config);
        assert_eq!(row_numbers(&result), vec![2]);
        assert_eq!(
            result.outcome,
            ScanOutcome::StopCondition(StopCondition::EndPattern {
                row: 3,
                position: Column::new(1).unwrap(),
                text: "end".to_owned(),
            })
        );
    }

    #[test]
    fn test_events() {
        let mut sheet = Sheet::new("", "Data");
        sheet.set_text("A2", "a");

        let bindings = bindings();
        let config = SearchConfig::default();
        let events: Mutex<Vec<ExtractionEvent>> = Mutex::new(Vec::new());
        let scanner = RowScanner {
            grid: &sheet,
            bindings: &bindings,
            config: &config,
            events: &events,
            section_label: "",
        };
        scanner.scan(2);
        assert_eq!(events.into_inner().unwrap(), vec![
            ExtractionEvent::RowAccepted { row: 2 },
            ExtractionEvent::ScanFinished { outcome: ScanOutcome::GridExhausted, rows: 1 },
        ]);
    }
}
