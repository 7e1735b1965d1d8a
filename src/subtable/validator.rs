use crate::subtable::config::RowValidationSpec;
use crate::subtable::mapper::ColumnBinding;
use crate::subtable::record::ExtractedField;

/// Acceptance decision for one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowVerdict {
    pub valid: bool,
    /// Every bound field is empty
    pub blank: bool,
    pub reason: Option<String>,
}

/// Accepts a row when each field's string form matches its binding's value
/// pattern and enough fields are non-empty. Blank rows are never accepted.
///
/// `fields` must be in the same order as `bindings`.
pub fn validate_row(fields: &[ExtractedField], bindings: &[ColumnBinding], spec: &RowValidationSpec) -> RowVerdict {
    let blank = fields.iter().all(|field| field.value.is_empty());
    let reject = |reason: String| RowVerdict {
        valid: false,
        blank,
        reason: Some(reason),
    };

    for (field, binding) in fields.iter().zip(bindings) {
        let text = field.value.to_string();
        if !binding.value_pattern.matches(&text) {
            return reject(format!(
                "value '{text}' at {} does not match '{}'",
                field.coordinate, binding.value_pattern
            ));
        }
    }

    let filled = fields.iter().filter(|field| !field.value.is_empty()).count();
    if spec.minimum_filled_columns > 0 && filled < spec.minimum_filled_columns {
        return reject(format!(
            "{filled} filled columns, {} required",
            spec.minimum_filled_columns
        ));
    }
    if blank {
        return reject("blank row".to_owned());
    }

    RowVerdict {
        valid: true,
        blank,
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtable::config::Column;
    use crate::subtable::pattern::Pattern;
    use crate::subtable::value::Value;

    fn binding(index: usize, value_pattern: &str) -> ColumnBinding {
        ColumnBinding {
            position: Column::new(index).unwrap(),
            field_name: format!("col{index}"),
            value_pattern: Pattern::new(value_pattern).unwrap(),
            discovered: false,
        }
    }

    fn field(index: usize, value: Value) -> ExtractedField {
        let position = Column::new(index).unwrap();
        ExtractedField {
            name: format!("col{index}"),
            value,
            coordinate: position.reference(4),
        }
    }

    fn spec(minimum_filled_columns: usize) -> RowValidationSpec {
        RowValidationSpec { minimum_filled_columns }
    }

    #[test]
    fn test_valid_row() {
        let bindings = vec![binding(1, ".+"), binding(2, "[0-9]+")];
        let fields = vec![field(1, Value::Text("a".to_owned())), field(2, Value::Integer(10))];
        let verdict = validate_row(&fields, &bindings, &spec(2));
        assert_eq!(verdict, RowVerdict { valid: true, blank: false, reason: None });
    }

    #[test]
    fn test_pattern_mismatch() {
        let bindings = vec![binding(1, ".*"), binding(2, "[0-9]+")];
        let fields = vec![field(1, Value::Text("a".to_owned())), field(2, Value::Real(2.5))];
        let verdict = validate_row(&fields, &bindings, &spec(0));
        assert!(!verdict.valid);
        assert!(!verdict.blank);
        assert_eq!(verdict.reason.as_deref(), Some("value '2.5' at B4 does not match '[0-9]+'"));
    }

    #[test]
    fn test_empty_value_checked_against_pattern() {
        let bindings = vec![binding(1, ".*"), binding(2, ".+")];
        let fields = vec![field(1, Value::Text("a".to_owned())), field(2, Value::Empty)];
        assert!(!validate_row(&fields, &bindings, &spec(0)).valid);
    }

    #[test]
    fn test_minimum_filled_columns() {
        let bindings = vec![binding(1, ".*"), binding(2, ".*"), binding(3, ".*")];
        let fields = vec![field(1, Value::Text("a".to_owned())), field(2, Value::Empty), field(3, Value::Empty)];
        assert!(validate_row(&fields, &bindings, &spec(1)).valid);
        let verdict = validate_row(&fields, &bindings, &spec(3));
        assert!(!verdict.valid);
        assert_eq!(verdict.reason.as_deref(), Some("1 filled columns, 3 required"));
    }

    #[test]
    fn test_blank_row_is_invalid() {
        let bindings = vec![binding(1, ".*"), binding(2, ".*")];
        let fields = vec![field(1, Value::Empty), field(2, Value::Empty)];
        let verdict = validate_row(&fields, &bindings, &spec(0));
        assert!(!verdict.valid);
        assert!(verdict.blank);
    }
}
