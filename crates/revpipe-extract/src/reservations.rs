//! Local filesystem extractor: reservation batches
//!
//! Each `*.json` drop-file is acquired independently; a malformed file
//! is committed to the error directory without disturbing its siblings.
//! Per reservation, validation runs in two phases: shape/type checks on
//! every field, then cross-field business rules only when the shapes
//! were clean. Stay-dates validate the same way underneath their
//! reservation.
//!
//! A reservation whose own fields are clean but which carries invalid
//! stay-dates is split: the accepted copy keeps only the valid
//! stay-dates and is persisted, while a second copy holding only the
//! invalid ones lands in `rejected_imports` for observability.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{error, info};

use revpipe_core::hash::row_hash;
use revpipe_core::records::{
    RejectedImportRecord, ReservationImportRecord, ReservationStatus, StayDateRecord, TableRecord,
};
use revpipe_core::time::{self, DATETIME_PATTERN, DATE_PATTERN};
use revpipe_core::validate::{
    validate_date, validate_datetime, validate_int, validate_number, validate_string, JsonRecord,
    ValidationError, ValidationReport,
};
use revpipe_core::RecordBatch;

use crate::error::{ExtractError, Result};
use crate::inventory::LocalExtractor;
use crate::{FileInfo, ReservationExtract};

/// Validation result of one reservations file.
struct FileValidation {
    valid: Vec<JsonRecord>,
    rejected: Vec<RejectedReservation>,
}

struct RejectedReservation {
    row: Value,
    errors: Vec<ValidationError>,
}

impl LocalExtractor {
    pub(crate) fn acquire_reservations(&self) -> Result<Vec<ReservationExtract>> {
        fs::create_dir_all(self.reservations_path())
            .map_err(|source| ExtractError::io(self.reservations_path(), source))?;
        self.archive().ensure()?;

        info!("Loading reservations JSON file(s)...");
        let json_filenames = self.list_drop_files(self.reservations_path(), ".json")?;

        if json_filenames.is_empty() {
            info!("No reservations JSON files found!");
            return Ok(Vec::new());
        }

        let mut extracts = Vec::new();

        for json_filename in json_filenames {
            let drop_path = self.reservations_path().join(&json_filename);
            let tmp_path = self.archive().tmp_path(&json_filename);
            self.archive().rename(&drop_path, &tmp_path)?;

            let validated = validate_reservations_file(&tmp_path);
            match validated {
                Ok(validation) => {
                    let (imports, stay_dates, rejected) =
                        assemble_batches(&json_filename, validation);
                    info!(
                        file = %json_filename,
                        accepted = imports.len(),
                        rejected = rejected.len(),
                        "Reservations file validated"
                    );
                    extracts.push(ReservationExtract {
                        file: FileInfo {
                            original_filename: json_filename,
                            temporary_filepath: tmp_path,
                        },
                        imports,
                        stay_dates,
                        rejected,
                    });
                }
                Err(err) => {
                    // File-level failure: commit to error and move on to
                    // the next file.
                    error!(file = %json_filename, error = %err, "Error reading reservations file");
                    let error_path = self.archive().error_path_for_tmp(&tmp_path);
                    self.archive().rename(&tmp_path, &error_path)?;
                }
            }
        }

        Ok(extracts)
    }
}

/// Parse and validate one reservations document. File-shape problems
/// (unreadable, bad JSON, no `data` array) are errors; row-level
/// problems land in the returned rejected set.
fn validate_reservations_file(path: &Path) -> Result<FileValidation> {
    let raw = fs::read_to_string(path).map_err(|source| ExtractError::io(path, source))?;
    let document: Value = serde_json::from_str(&raw)
        .map_err(|err| ExtractError::document(path, format!("invalid JSON: {err}")))?;
    let data = document
        .as_object()
        .and_then(|object| object.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| ExtractError::document(path, "Reservations list not found in JSON file"))?;

    info!(rows = data.len(), file = %path.display(), "Reservations document loaded");

    let mut valid = Vec::new();
    let mut rejected = Vec::new();

    for reservation in data {
        let (accepted, spill) = validate_reservation(reservation);
        if let Some(record) = accepted {
            valid.push(record);
        }
        rejected.extend(spill);
    }

    Ok(FileValidation { valid, rejected })
}

/// Two-phase validation of a single reservation. Returns the accepted
/// record (stay-dates filtered to the valid ones) and zero or more
/// rejected entries.
fn validate_reservation(reservation: &Value) -> (Option<JsonRecord>, Vec<RejectedReservation>) {
    let record = reservation.as_object();
    let mut report = ValidationReport::new();

    // Phase I: shape and type of the reservation itself.
    report.check(validate_string(record, "hotel_id", false, None));
    report.check(validate_string(record, "reservation_id", false, None));
    let allowed_statuses = ReservationStatus::allowed_values();
    report.check(validate_string(record, "status", false, Some(&allowed_statuses)));
    report.check(validate_date(record, "departure_date", DATE_PATTERN, None, None));
    report.check(validate_date(record, "arrival_date", DATE_PATTERN, None, None));
    report.check(validate_datetime(record, "created_at", DATETIME_PATTERN, None, None));
    report.check(validate_datetime(record, "updated_at", DATETIME_PATTERN, None, None));

    // Phase II: business rules, only meaningful on clean shapes.
    if report.is_clean() {
        if let Some(map) = record {
            if let (Some(arrival), Some(departure)) =
                (date_field(map, "arrival_date"), date_field(map, "departure_date"))
            {
                if arrival >= departure {
                    report.push(
                        ValidationError::new(format!(
                            "arrival_date '{arrival}' should be less than departure_date '{departure}'"
                        ))
                        .with_field("arrival_date")
                        .with_value(Value::from(arrival.to_string())),
                    );
                }
            }
            if let (Some(created), Some(updated)) =
                (datetime_field(map, "created_at"), datetime_field(map, "updated_at"))
            {
                if updated < created {
                    report.push(
                        ValidationError::new(format!(
                            "updated_at '{updated}' should be greater than or equal to created_at '{created}'"
                        ))
                        .with_field("updated_at")
                        .with_value(Value::from(updated.to_string())),
                    );
                }
            }
        }
    }

    // Stay-dates are validated regardless of the reservation's own
    // verdict so their errors are observable either way.
    let mut valid_stay_dates: Vec<Value> = Vec::new();
    let mut invalid_stay_dates: Vec<(Value, Vec<ValidationError>)> = Vec::new();

    let stay_dates = record
        .and_then(|map| map.get("stay_dates"))
        .and_then(Value::as_array)
        .filter(|list| !list.is_empty());

    match stay_dates {
        None => report.push(ValidationError::new("stay_dates missing or invalid")),
        Some(stay_dates) => {
            for stay_date in stay_dates {
                let errors = validate_stay_date(stay_date, record);
                if errors.is_empty() {
                    valid_stay_dates.push(stay_date.clone());
                } else {
                    invalid_stay_dates.push((stay_date.clone(), errors));
                }
            }
        }
    }

    if !report.is_clean() {
        // The reservation itself is invalid; its rejected payload keeps
        // every stay-date, valid or not.
        return (
            None,
            vec![RejectedReservation {
                row: reservation.clone(),
                errors: report.into_errors(),
            }],
        );
    }

    // A clean report implies the reservation was an object.
    let Some(map) = record else {
        return (None, Vec::new());
    };

    let mut valid_record = map.clone();
    valid_record.insert("stay_dates".to_string(), Value::Array(valid_stay_dates));

    let mut spill = Vec::new();
    if !invalid_stay_dates.is_empty() {
        // Fresh record carrying only the failing stay-dates, each
        // wrapped with its own errors.
        let mut invalid_record = map.clone();
        invalid_record.insert(
            "stay_dates".to_string(),
            Value::Array(
                invalid_stay_dates
                    .into_iter()
                    .map(|(stay_date, errors)| {
                        serde_json::json!({
                            "stay_date": stay_date,
                            "validation_errors": errors
                                .iter()
                                .map(ValidationError::to_json)
                                .collect::<Vec<_>>(),
                        })
                    })
                    .collect(),
            ),
        );
        spill.push(RejectedReservation {
            row: Value::Object(invalid_record),
            errors: Vec::new(),
        });
    }

    (Some(valid_record), spill)
}

/// Validate one stay-date under its reservation. An empty vector means
/// the stay-date is valid.
fn validate_stay_date(
    stay_date: &Value,
    reservation: Option<&JsonRecord>,
) -> Vec<ValidationError> {
    let record = stay_date.as_object();
    let mut report = ValidationReport::new();

    // Phase I
    report.check(validate_date(record, "start_date", DATE_PATTERN, None, None));
    report.check(validate_date(record, "end_date", DATE_PATTERN, None, None));
    report.check(validate_string(record, "room_type_id", false, None));
    report.check(validate_string(record, "room_type_name", false, None));
    report.check(validate_int(record, "number_of_adults", Some(1), None));
    report.check(validate_int(record, "number_of_children", Some(0), None));
    report.check(validate_number(record, "room_revenue_gross_amount", None, None, true));
    report.check(validate_number(record, "room_revenue_net_amount", None, None, true));
    for optional_field in ["fnb_gross_amount", "fnb_net_amount"] {
        if record.is_some_and(|map| map.contains_key(optional_field)) {
            report.check(validate_number(record, optional_field, None, None, true));
        }
    }

    // Phase II
    if report.is_clean() {
        if let Some(map) = record {
            if let (Some(start), Some(end)) =
                (date_field(map, "start_date"), date_field(map, "end_date"))
            {
                if start > end {
                    report.push(
                        ValidationError::new(format!(
                            "start_date '{start}' should be less than or equal to end_date '{end}'"
                        ))
                        .with_field("start_date")
                        .with_value(stay_date.clone()),
                    );
                }

                let arrival = reservation.and_then(|map| date_field(map, "arrival_date"));
                let departure = reservation.and_then(|map| date_field(map, "departure_date"));
                match (arrival, departure) {
                    (Some(arrival), Some(departure)) => {
                        if !(start >= arrival && end <= departure) {
                            report.push(ValidationError::new(format!(
                                "All dates must fall within the reservation period. \
                                 '{start}' and '{end}' not fall into '{arrival}' and '{departure}'"
                            )));
                        }
                    }
                    _ => {
                        report.push(ValidationError::new(
                            "All dates must fall within the reservation period. \
                             Invalid arrival_date and/or departure_date",
                        ));
                    }
                }
            }
        }
    }

    report.into_errors()
}

/// Build the three per-file batches from this file's validated rows.
fn assemble_batches(
    source_filename: &str,
    validation: FileValidation,
) -> (RecordBatch, RecordBatch, RecordBatch) {
    let ingested_at = time::now();
    let mut import_records = Vec::new();
    let mut stay_date_records = Vec::new();
    let mut rejected_records = Vec::new();

    info!("Generating import rows...");
    for record in validation.valid {
        let Some(import) = import_record(&record, source_filename, ingested_at) else {
            // Unreachable for validated rows; never silently drop one.
            error!(file = source_filename, "Validated reservation no longer assembles; skipping");
            continue;
        };
        let reservation_hash = import.reservation_hash.clone();

        if let Some(stay_dates) = record.get("stay_dates").and_then(Value::as_array) {
            for stay_date in stay_dates {
                if let Some(stay_record) =
                    stay_date_record(stay_date, &record, &reservation_hash, ingested_at)
                {
                    stay_date_records.push(stay_record);
                }
            }
        }
        import_records.push(import);
    }

    for rejected in validation.rejected {
        let errors = Value::Array(rejected.errors.iter().map(ValidationError::to_json).collect());
        rejected_records.push(RejectedImportRecord {
            rejected_row: rejected.row.to_string(),
            validation_errors: errors.to_string(),
            source_filename: source_filename.to_string(),
            ingested_at,
        });
    }

    (
        ReservationImportRecord::batch(import_records),
        StayDateRecord::batch(stay_date_records),
        RejectedImportRecord::batch(rejected_records),
    )
}

fn import_record(
    record: &JsonRecord,
    source_filename: &str,
    ingested_at: chrono::NaiveDateTime,
) -> Option<ReservationImportRecord> {
    // The dedup hash covers the reservation as it was accepted,
    // including its (filtered) stay-dates.
    let reservation_hash = row_hash(&Value::Object(record.clone()));

    Some(ReservationImportRecord {
        hotel_id: string_field(record, "hotel_id")?,
        reservation_id: string_field(record, "reservation_id")?,
        status: record
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<ReservationStatus>().ok())?,
        arrival_date: date_field(record, "arrival_date")?,
        departure_date: date_field(record, "departure_date")?,
        source_name: string_field(record, "source_name"),
        source_id: string_field(record, "source_id"),
        created_at: datetime_field(record, "created_at")?,
        updated_at: datetime_field(record, "updated_at")?,
        source_filename: source_filename.to_string(),
        ingested_at,
        reservation_hash,
    })
}

fn stay_date_record(
    stay_date: &Value,
    reservation: &JsonRecord,
    reservation_hash: &str,
    ingested_at: chrono::NaiveDateTime,
) -> Option<StayDateRecord> {
    let record = stay_date.as_object()?;

    Some(StayDateRecord {
        hotel_id: string_field(reservation, "hotel_id")?,
        reservation_id: string_field(reservation, "reservation_id")?,
        start_date: date_field(record, "start_date")?,
        end_date: date_field(record, "end_date")?,
        room_type_id: string_field(record, "room_type_id")?,
        room_type_name: string_field(record, "room_type_name")?,
        number_of_adults: int_field(record, "number_of_adults")?,
        number_of_children: int_field(record, "number_of_children")?,
        revenue_gross_amount: float_field(record, "room_revenue_gross_amount")?,
        revenue_net_amount: float_field(record, "room_revenue_net_amount")?,
        fnb_gross_amount: record.contains_key("fnb_gross_amount").then(|| float_field(record, "fnb_gross_amount")).flatten(),
        fnb_net_amount: record.contains_key("fnb_net_amount").then(|| float_field(record, "fnb_net_amount")).flatten(),
        created_at: datetime_field(reservation, "created_at")?,
        updated_at: datetime_field(reservation, "updated_at")?,
        ingested_at,
        reservation_hash: reservation_hash.to_string(),
        stay_date_hash: row_hash(stay_date),
    })
}

// Field readers over validated records. Validators already accepted the
// shapes; these mirror their coercions (numeric strings included).

fn string_field(record: &JsonRecord, field_name: &str) -> Option<String> {
    record.get(field_name)?.as_str().map(str::to_string)
}

fn int_field(record: &JsonRecord, field_name: &str) -> Option<i64> {
    match record.get(field_name)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float_field(record: &JsonRecord, field_name: &str) -> Option<f64> {
    match record.get(field_name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn date_field(record: &JsonRecord, field_name: &str) -> Option<chrono::NaiveDate> {
    record
        .get(field_name)
        .and_then(Value::as_str)
        .and_then(|s| time::parse_date(s, DATE_PATTERN))
}

fn datetime_field(record: &JsonRecord, field_name: &str) -> Option<chrono::NaiveDateTime> {
    record
        .get(field_name)
        .and_then(Value::as_str)
        .and_then(|s| time::parse_datetime(s, DATETIME_PATTERN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_reservation() -> Value {
        json!({
            "hotel_id": "1",
            "reservation_id": "RES-100",
            "status": "confirmed",
            "arrival_date": "2025-05-10",
            "departure_date": "2025-05-12",
            "created_at": "2025-05-01 10:00:00.000000",
            "updated_at": "2025-05-01 11:00:00.000000",
            "stay_dates": [stay(10, 11)],
        })
    }

    fn stay(start_day: u32, end_day: u32) -> Value {
        json!({
            "start_date": format!("2025-05-{start_day:02}"),
            "end_date": format!("2025-05-{end_day:02}"),
            "room_type_id": "RT1",
            "room_type_name": "Double",
            "number_of_adults": 2,
            "number_of_children": 0,
            "room_revenue_gross_amount": 120.0,
            "room_revenue_net_amount": 100.0,
        })
    }

    #[test]
    fn test_valid_reservation_is_accepted() {
        let (accepted, rejected) = validate_reservation(&base_reservation());
        let record = accepted.unwrap();
        assert!(rejected.is_empty());
        assert_eq!(record["stay_dates"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_phase_two_rejects_inverted_dates() {
        let mut reservation = base_reservation();
        reservation["arrival_date"] = json!("2025-05-10");
        reservation["departure_date"] = json!("2025-05-09");
        // Keep the stay window irrelevant to this case
        reservation["stay_dates"] = json!([stay(10, 10)]);

        let (accepted, rejected) = validate_reservation(&reservation);
        assert!(accepted.is_none());
        assert_eq!(rejected.len(), 1);
        let errors = &rejected[0].errors;
        assert!(errors
            .iter()
            .any(|e| e.field_name.as_deref() == Some("arrival_date")));
    }

    #[test]
    fn test_phase_two_updated_at_field_name_is_literal() {
        let mut reservation = base_reservation();
        reservation["created_at"] = json!("2025-05-02 10:00:00.000000");
        reservation["updated_at"] = json!("2025-05-01 10:00:00.000000");

        let (_, rejected) = validate_reservation(&reservation);
        assert!(rejected[0]
            .errors
            .iter()
            .any(|e| e.field_name.as_deref() == Some("updated_at")));
    }

    #[test]
    fn test_phase_two_skipped_when_phase_one_fails() {
        let mut reservation = base_reservation();
        reservation["status"] = json!("booked");
        reservation["arrival_date"] = json!("2025-05-10");
        reservation["departure_date"] = json!("2025-05-09");

        let (_, rejected) = validate_reservation(&reservation);
        // Only the Phase I status error; the date rule never ran.
        let errors = &rejected[0].errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field_name.as_deref(), Some("status"));
    }

    #[test]
    fn test_split_keeps_valid_and_spills_invalid_stay_dates() {
        let mut reservation = base_reservation();
        // First stay starts before arrival, second is fine.
        reservation["stay_dates"] = json!([stay(9, 10), stay(10, 11)]);

        let (accepted, rejected) = validate_reservation(&reservation);
        let record = accepted.unwrap();
        assert_eq!(record["stay_dates"].as_array().unwrap().len(), 1);

        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].errors.is_empty());
        let spilled = rejected[0].row["stay_dates"].as_array().unwrap();
        assert_eq!(spilled.len(), 1);
        assert!(spilled[0]["validation_errors"].as_array().is_some());
    }

    #[test]
    fn test_missing_stay_dates_rejects_reservation() {
        let mut reservation = base_reservation();
        reservation.as_object_mut().unwrap().remove("stay_dates");
        let (accepted, rejected) = validate_reservation(&reservation);
        assert!(accepted.is_none());
        assert!(rejected[0]
            .errors
            .iter()
            .any(|e| e.message.contains("stay_dates missing or invalid")));

        let mut reservation = base_reservation();
        reservation["stay_dates"] = json!([]);
        let (accepted, _) = validate_reservation(&reservation);
        assert!(accepted.is_none());
    }

    #[test]
    fn test_non_object_reservation_is_rejected() {
        let (accepted, rejected) = validate_reservation(&json!("not a reservation"));
        assert!(accepted.is_none());
        assert_eq!(rejected.len(), 1);
        assert!(!rejected[0].errors.is_empty());
    }

    #[test]
    fn test_stay_date_window_error_when_reservation_dates_unusable() {
        let stay_value = stay(10, 11);
        let mut reservation_map = base_reservation().as_object().unwrap().clone();
        reservation_map.insert("arrival_date".into(), json!("garbage"));

        let errors = validate_stay_date(&stay_value, Some(&reservation_map));
        assert!(errors
            .iter()
            .any(|e| e.message.contains("Invalid arrival_date and/or departure_date")));
    }

    #[test]
    fn test_assembly_hashes_are_stable_per_content() {
        let reservation = base_reservation();
        let (accepted, _) = validate_reservation(&reservation);
        let record = accepted.unwrap();

        let first = import_record(&record, "a.json", time::now()).unwrap();
        let second = import_record(&record, "b.json", time::now()).unwrap();
        // Same content, same hash, regardless of filename or time.
        assert_eq!(first.reservation_hash, second.reservation_hash);
    }

    #[test]
    fn test_assembly_accepts_numeric_strings() {
        let mut stay_value = stay(10, 11);
        stay_value["number_of_adults"] = json!("2");
        stay_value["room_revenue_net_amount"] = json!("99.5");
        let mut reservation = base_reservation();
        reservation["stay_dates"] = json!([stay_value]);

        let (accepted, rejected) = validate_reservation(&reservation);
        assert!(rejected.is_empty());
        let record = accepted.unwrap();
        let (imports, stay_dates, rejects) = assemble_batches("r.json", FileValidation {
            valid: vec![record],
            rejected: vec![],
        });
        assert_eq!(imports.len(), 1);
        assert_eq!(stay_dates.len(), 1);
        assert_eq!(rejects.len(), 0);
        assert_eq!(
            stay_dates.cell(0, "number_of_adults"),
            Some(&revpipe_core::DbValue::Integer(2))
        );
        assert_eq!(
            stay_dates.cell(0, "revenue_net_amount"),
            Some(&revpipe_core::DbValue::Real(99.5))
        );
    }
}
