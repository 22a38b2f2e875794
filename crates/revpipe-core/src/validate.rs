//! Field validation kernel
//!
//! Pure predicates over a JSON record (`serde_json` object). Each validator
//! returns `Ok(())` or a [`ValidationError`] describing the failure; none of
//! them panic on malformed input. A missing record (`None`) and a missing
//! key produce distinct messages so rejected rows stay diagnosable.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::time;

/// Record type the validators operate on: one parsed JSON object.
pub type JsonRecord = Map<String, Value>;

/// A single structured validation failure, serialisable to a JSON object
/// for persistence in `rejected_imports`.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{} : {message}", .field_name.as_deref().unwrap_or("<record>"))]
pub struct ValidationError {
    pub message: String,
    pub field_name: Option<String>,
    pub value: Option<Value>,
    pub metadata: Map<String, Value>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_name: None,
            value: None,
            metadata: Map::new(),
        }
    }

    pub fn with_field(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// JSON-object form persisted alongside rejected rows.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "message": self.message,
            "field_name": self.field_name,
            "value": self.value,
            "metadata": self.metadata,
        })
    }
}

/// Accumulator for multi-field validation passes.
///
/// Phase I validators push into the report; Phase II only runs when the
/// report is still clean.
#[derive(Debug, Default)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a single validator call.
    pub fn check(&mut self, outcome: Result<(), ValidationError>) {
        if let Err(err) = outcome {
            self.errors.push(err);
        }
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// The persisted form: a JSON array of error objects.
    pub fn to_json(&self) -> Value {
        Value::Array(self.errors.iter().map(ValidationError::to_json).collect())
    }
}

fn missing_record(field_name: &str, metadata: Map<String, Value>) -> ValidationError {
    ValidationError::new("Value is NULL!")
        .with_field(field_name)
        .with_metadata(metadata)
}

fn missing_field(field_name: &str, metadata: Map<String, Value>) -> ValidationError {
    ValidationError::new(format!("{field_name} is missing"))
        .with_field(field_name)
        .with_metadata(metadata)
}

fn bounds_metadata(min: Option<i64>, max: Option<i64>) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("min_value".into(), min.map_or(Value::Null, Value::from));
    metadata.insert("max_value".into(), max.map_or(Value::Null, Value::from));
    metadata
}

/// Integer field: rejects booleans, accepts integers and integer-parseable
/// trimmed non-empty strings; inclusive bounds.
pub fn validate_int(
    record: Option<&JsonRecord>,
    field_name: &str,
    min_value: Option<i64>,
    max_value: Option<i64>,
) -> Result<(), ValidationError> {
    let metadata = bounds_metadata(min_value, max_value);

    let Some(record) = record else {
        return Err(missing_record(field_name, metadata));
    };
    let Some(field_value) = record.get(field_name) else {
        return Err(missing_field(field_name, metadata));
    };

    if field_value.is_boolean() {
        return Err(ValidationError::new(format!("{field_name} must be an integer"))
            .with_field(field_name)
            .with_value(field_value.clone())
            .with_metadata(metadata));
    }

    let parsed = match field_value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<i64>().ok()
            }
        }
        _ => None,
    };

    let Some(value) = parsed else {
        return Err(ValidationError::new(format!(
            "{field_name} must be an integer or integer-like string"
        ))
        .with_field(field_name)
        .with_value(field_value.clone())
        .with_metadata(metadata));
    };

    if let Some(min) = min_value {
        if value < min {
            return Err(ValidationError::new(format!(
                "{field_name} field value {value} must be >= {min}"
            ))
            .with_field(field_name)
            .with_value(Value::from(value))
            .with_metadata(metadata));
        }
    }
    if let Some(max) = max_value {
        if value > max {
            return Err(ValidationError::new(format!(
                "{field_name} field value {value} must be <= {max}"
            ))
            .with_field(field_name)
            .with_value(Value::from(value))
            .with_metadata(metadata));
        }
    }

    Ok(())
}

/// Finite number field; `allow_int=false` additionally rejects
/// integer-valued numbers. Accepts numeric strings.
pub fn validate_number(
    record: Option<&JsonRecord>,
    field_name: &str,
    min_value: Option<f64>,
    max_value: Option<f64>,
    allow_int: bool,
) -> Result<(), ValidationError> {
    let mut metadata = Map::new();
    metadata.insert("min_value".into(), min_value.map_or(Value::Null, Value::from));
    metadata.insert("max_value".into(), max_value.map_or(Value::Null, Value::from));
    metadata.insert("allow_int".into(), Value::Bool(allow_int));

    let Some(record) = record else {
        return Err(missing_record(field_name, metadata));
    };
    let Some(field_value) = record.get(field_name) else {
        return Err(missing_field(field_name, metadata));
    };

    if field_value.is_null() {
        return Err(ValidationError::new(format!("{field_name} is NULL"))
            .with_field(field_name)
            .with_value(Value::Null)
            .with_metadata(metadata));
    }
    if field_value.is_boolean() {
        return Err(ValidationError::new(format!("{field_name} must be a number"))
            .with_field(field_name)
            .with_value(field_value.clone())
            .with_metadata(metadata));
    }

    let parsed = match field_value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };

    let Some(value) = parsed else {
        return Err(ValidationError::new(format!("{field_name} must be a number"))
            .with_field(field_name)
            .with_value(field_value.clone())
            .with_metadata(metadata));
    };

    if !value.is_finite() {
        return Err(ValidationError::new(format!("{field_name} must be finite number"))
            .with_field(field_name)
            .with_value(field_value.clone())
            .with_metadata(metadata));
    }

    if !allow_int && value.fract() == 0.0 {
        return Err(ValidationError::new(format!(
            "{field_name} must be non-integer number"
        ))
        .with_field(field_name)
        .with_value(field_value.clone())
        .with_metadata(metadata));
    }

    if let Some(min) = min_value {
        if value < min {
            return Err(ValidationError::new(format!(
                "{field_name} field value {value} must be >= {min}"
            ))
            .with_field(field_name)
            .with_value(Value::from(value))
            .with_metadata(metadata));
        }
    }
    if let Some(max) = max_value {
        if value > max {
            return Err(ValidationError::new(format!(
                "{field_name} field value {value} must be <= {max}"
            ))
            .with_field(field_name)
            .with_value(Value::from(value))
            .with_metadata(metadata));
        }
    }

    Ok(())
}

/// String field; optional emptiness check (whitespace-trimmed) and
/// allowed-values set.
pub fn validate_string(
    record: Option<&JsonRecord>,
    field_name: &str,
    allow_empty_string: bool,
    allowed_values: Option<&[&str]>,
) -> Result<(), ValidationError> {
    let mut metadata = Map::new();
    metadata.insert("allow_empty_string".into(), Value::Bool(allow_empty_string));
    metadata.insert(
        "allowed_values".into(),
        allowed_values.map_or(Value::Null, |vs| {
            Value::Array(vs.iter().map(|v| Value::from(*v)).collect())
        }),
    );

    let Some(record) = record else {
        return Err(missing_record(field_name, metadata));
    };
    let Some(field_value) = record.get(field_name) else {
        return Err(missing_field(field_name, metadata));
    };

    let Value::String(s) = field_value else {
        return Err(ValidationError::new(format!("{field_name} must be a string"))
            .with_field(field_name)
            .with_value(field_value.clone())
            .with_metadata(metadata));
    };

    if !allow_empty_string && s.trim().is_empty() {
        return Err(ValidationError::new(format!(
            "{field_name} must NOT be empty string"
        ))
        .with_field(field_name)
        .with_value(field_value.clone())
        .with_metadata(metadata));
    }

    if let Some(allowed) = allowed_values {
        if !allowed.contains(&s.as_str()) {
            return Err(ValidationError::new(format!(
                "{field_name} must be one of {}",
                allowed.join(", ")
            ))
            .with_field(field_name)
            .with_value(field_value.clone())
            .with_metadata(metadata));
        }
    }

    Ok(())
}

/// Boolean field: a boolean instance or a case-insensitive
/// `"true"`/`"false"` string.
pub fn validate_boolean(
    record: Option<&JsonRecord>,
    field_name: &str,
) -> Result<(), ValidationError> {
    let Some(record) = record else {
        return Err(missing_record(field_name, Map::new()));
    };
    let Some(field_value) = record.get(field_name) else {
        return Err(missing_field(field_name, Map::new()));
    };

    match field_value {
        Value::Bool(_) => Ok(()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty()
                || (!trimmed.eq_ignore_ascii_case("true") && !trimmed.eq_ignore_ascii_case("false"))
            {
                Err(ValidationError::new(format!(
                    "{field_name} must be a boolean or boolean-like"
                ))
                .with_field(field_name)
                .with_value(field_value.clone()))
            } else {
                Ok(())
            }
        }
        _ => Err(ValidationError::new(format!("{field_name} must be a boolean"))
            .with_field(field_name)
            .with_value(field_value.clone())),
    }
}

fn date_metadata(
    pattern: &str,
    min_date: Option<NaiveDate>,
    max_date: Option<NaiveDate>,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("pattern".into(), Value::from(pattern));
    metadata.insert(
        "min_date".into(),
        min_date.map_or(Value::Null, |d| Value::from(d.to_string())),
    );
    metadata.insert(
        "max_date".into(),
        max_date.map_or(Value::Null, |d| Value::from(d.to_string())),
    );
    metadata
}

/// Date field: a string matching `pattern` that is a pure date. Strings
/// that carry a time component are rejected; inclusive bounds.
pub fn validate_date(
    record: Option<&JsonRecord>,
    field_name: &str,
    pattern: &str,
    min_date: Option<NaiveDate>,
    max_date: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    let metadata = date_metadata(pattern, min_date, max_date);

    let Some(record) = record else {
        return Err(missing_record(field_name, metadata));
    };
    let Some(field_value) = record.get(field_name) else {
        return Err(missing_field(field_name, metadata));
    };

    let Value::String(s) = field_value else {
        return Err(ValidationError::new(format!(
            "{field_name} must be a date string or date (not datetime)"
        ))
        .with_field(field_name)
        .with_value(field_value.clone())
        .with_metadata(metadata));
    };

    // A value that parses as a datetime is not a pure date.
    if time::parse_datetime(s, time::DEFAULT_DATETIME_PATTERN).is_some()
        || time::parse_datetime(s, time::DATETIME_PATTERN).is_some()
    {
        return Err(ValidationError::new(format!(
            "{field_name} must be a date string or date (not datetime)"
        ))
        .with_field(field_name)
        .with_value(field_value.clone())
        .with_metadata(metadata));
    }

    let Some(date_value) = time::parse_date(s, pattern) else {
        return Err(ValidationError::new(format!(
            "{field_name} must be valid date value"
        ))
        .with_field(field_name)
        .with_value(field_value.clone())
        .with_metadata(metadata));
    };

    if let Some(min) = min_date {
        if date_value < min {
            return Err(ValidationError::new(format!(
                "{field_name} field value {date_value} must be >= {min}"
            ))
            .with_field(field_name)
            .with_value(field_value.clone())
            .with_metadata(metadata));
        }
    }
    if let Some(max) = max_date {
        if date_value > max {
            return Err(ValidationError::new(format!(
                "{field_name} field value {date_value} must be <= {max}"
            ))
            .with_field(field_name)
            .with_value(field_value.clone())
            .with_metadata(metadata));
        }
    }

    Ok(())
}

/// Datetime field: a string matching `pattern`; inclusive bounds.
pub fn validate_datetime(
    record: Option<&JsonRecord>,
    field_name: &str,
    pattern: &str,
    min_datetime: Option<chrono::NaiveDateTime>,
    max_datetime: Option<chrono::NaiveDateTime>,
) -> Result<(), ValidationError> {
    let mut metadata = Map::new();
    metadata.insert("pattern".into(), Value::from(pattern));
    metadata.insert(
        "min_datetime".into(),
        min_datetime.map_or(Value::Null, |d| Value::from(d.to_string())),
    );
    metadata.insert(
        "max_datetime".into(),
        max_datetime.map_or(Value::Null, |d| Value::from(d.to_string())),
    );

    let Some(record) = record else {
        return Err(missing_record(field_name, metadata));
    };
    let Some(field_value) = record.get(field_name) else {
        return Err(missing_field(field_name, metadata));
    };

    let Value::String(s) = field_value else {
        return Err(ValidationError::new(format!(
            "{field_name} must be a datetime string or datetime"
        ))
        .with_field(field_name)
        .with_value(field_value.clone())
        .with_metadata(metadata));
    };

    let Some(datetime_value) = time::parse_datetime(s, pattern) else {
        return Err(ValidationError::new(format!(
            "{field_name} must be valid datetime value"
        ))
        .with_field(field_name)
        .with_value(field_value.clone())
        .with_metadata(metadata));
    };

    if let Some(min) = min_datetime {
        if datetime_value < min {
            return Err(ValidationError::new(format!(
                "{field_name} field value {datetime_value} must be >= {min}"
            ))
            .with_field(field_name)
            .with_value(field_value.clone())
            .with_metadata(metadata));
        }
    }
    if let Some(max) = max_datetime {
        if datetime_value > max {
            return Err(ValidationError::new(format!(
                "{field_name} field value {datetime_value} must be <= {max}"
            ))
            .with_field(field_name)
            .with_value(field_value.clone())
            .with_metadata(metadata));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> JsonRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_validate_int_accepts_integers_and_strings() {
        let rec = record(json!({"quantity": 5, "as_string": " 12 "}));
        assert!(validate_int(Some(&rec), "quantity", Some(0), None).is_ok());
        assert!(validate_int(Some(&rec), "as_string", None, None).is_ok());
    }

    #[test]
    fn test_validate_int_rejects_booleans_and_floats() {
        let rec = record(json!({"flag": true, "ratio": 1.5, "empty": "  "}));
        assert!(validate_int(Some(&rec), "flag", None, None).is_err());
        assert!(validate_int(Some(&rec), "ratio", None, None).is_err());
        assert!(validate_int(Some(&rec), "empty", None, None).is_err());
    }

    #[test]
    fn test_validate_int_bounds_and_missing() {
        let rec = record(json!({"quantity": -1}));
        let err = validate_int(Some(&rec), "quantity", Some(0), None).unwrap_err();
        assert!(err.message.contains("must be >= 0"));

        let err = validate_int(Some(&rec), "absent", None, None).unwrap_err();
        assert_eq!(err.message, "absent is missing");

        let err = validate_int(None, "quantity", None, None).unwrap_err();
        assert_eq!(err.message, "Value is NULL!");
    }

    #[test]
    fn test_validate_number_finite_and_allow_int() {
        let rec = record(json!({"amount": 10.5, "whole": 4, "text": "3.25"}));
        assert!(validate_number(Some(&rec), "amount", None, None, true).is_ok());
        assert!(validate_number(Some(&rec), "whole", None, None, true).is_ok());
        assert!(validate_number(Some(&rec), "text", None, None, true).is_ok());
        // allow_int=false rejects integer-valued numbers
        assert!(validate_number(Some(&rec), "whole", None, None, false).is_err());
    }

    #[test]
    fn test_validate_number_rejects_null_and_garbage() {
        let rec = record(json!({"amount": null, "word": "abc", "flag": false}));
        assert!(validate_number(Some(&rec), "amount", None, None, true).is_err());
        assert!(validate_number(Some(&rec), "word", None, None, true).is_err());
        assert!(validate_number(Some(&rec), "flag", None, None, true).is_err());
    }

    #[test]
    fn test_validate_string_emptiness_and_allowed_values() {
        let rec = record(json!({"status": "confirmed", "blank": "   ", "num": 3}));
        assert!(validate_string(Some(&rec), "status", false, None).is_ok());
        assert!(validate_string(Some(&rec), "blank", true, None).is_ok());
        assert!(validate_string(Some(&rec), "blank", false, None).is_err());
        assert!(validate_string(Some(&rec), "num", true, None).is_err());

        assert!(validate_string(Some(&rec), "status", false, Some(&["confirmed"])).is_ok());
        let err =
            validate_string(Some(&rec), "status", false, Some(&["cancelled"])).unwrap_err();
        assert!(err.message.contains("must be one of"));
    }

    #[test]
    fn test_validate_boolean() {
        let rec = record(json!({"a": true, "b": "FALSE", "c": "yes", "d": 1}));
        assert!(validate_boolean(Some(&rec), "a").is_ok());
        assert!(validate_boolean(Some(&rec), "b").is_ok());
        assert!(validate_boolean(Some(&rec), "c").is_err());
        assert!(validate_boolean(Some(&rec), "d").is_err());
    }

    #[test]
    fn test_validate_date_patterns_and_datetime_rejection() {
        let rec = record(json!({
            "iso": "2025-05-10",
            "dotted": "10.05.2025",
            "stamp": "2025-05-10 12:30:00.000000",
            "bad": "2025-13-40",
        }));
        assert!(validate_date(Some(&rec), "iso", "%Y-%m-%d", None, None).is_ok());
        assert!(validate_date(Some(&rec), "dotted", "%d.%m.%Y", None, None).is_ok());
        // Datetime values are explicitly not dates
        assert!(validate_date(Some(&rec), "stamp", "%Y-%m-%d", None, None).is_err());
        assert!(validate_date(Some(&rec), "bad", "%Y-%m-%d", None, None).is_err());
    }

    #[test]
    fn test_validate_date_bounds() {
        let rec = record(json!({"d": "2025-05-10"}));
        let min = NaiveDate::from_ymd_opt(2025, 5, 11).unwrap();
        let err = validate_date(Some(&rec), "d", "%Y-%m-%d", Some(min), None).unwrap_err();
        assert!(err.message.contains("must be >="));
    }

    #[test]
    fn test_validate_datetime() {
        let rec = record(json!({
            "ts": "2025-05-10 12:30:00.123456",
            "plain": "2025-05-10",
        }));
        assert!(validate_datetime(Some(&rec), "ts", crate::time::DATETIME_PATTERN, None, None)
            .is_ok());
        assert!(
            validate_datetime(Some(&rec), "plain", crate::time::DATETIME_PATTERN, None, None)
                .is_err()
        );
    }

    #[test]
    fn test_report_accumulates() {
        let mut report = ValidationReport::new();
        assert!(report.is_clean());
        report.check(Ok(()));
        assert!(report.is_clean());
        report.check(Err(ValidationError::new("boom").with_field("f")));
        assert!(!report.is_clean());
        assert_eq!(report.errors().len(), 1);
        let json = report.to_json();
        assert_eq!(json[0]["message"], "boom");
        assert_eq!(json[0]["field_name"], "f");
    }
}
