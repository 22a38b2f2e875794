//! Local filesystem extractor: inventory snapshots
//!
//! The inventory drop directory may hold at most one CSV per cycle;
//! there is no ordering key in the filename or the content, so with two
//! or more files a late arrival could silently shadow a newer snapshot.
//! In that case every candidate goes to the error directory and nothing
//! is ingested until an operator intervenes.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{error, info};

use revpipe_config::{PipelineConfig, SourceType};
use revpipe_core::records::{InventoryRecord, TableRecord};
use revpipe_core::validate::{validate_int, validate_string};
use revpipe_core::{time, RecordBatch};

use crate::archive::ArchiveLayout;
use crate::error::{ExtractError, Result};
use crate::{Extractor, FileInfo, InventoryExtract, ReservationExtract};

const REQUIRED_COLUMNS: [&str; 3] = ["hotel_id", "room_type_id", "quantity"];

/// Extractor over the configured local drop directories.
pub struct LocalExtractor {
    inventory_path: PathBuf,
    reservations_path: PathBuf,
    column_separator: String,
    row_separator: String,
    ignore_empty_lines: bool,
    archive: ArchiveLayout,
}

impl LocalExtractor {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        if config.source_type != SourceType::Local {
            return Err(ExtractError::Config(format!(
                "local extractor cannot serve source type '{}'",
                config.source_type
            )));
        }
        let source = &config.source_config;
        let inventory_path = source
            .inventory_path
            .clone()
            .ok_or_else(|| ExtractError::Config("source_config.inventory_path missing".into()))?;
        let reservations_path = source
            .reservations_path
            .clone()
            .ok_or_else(|| ExtractError::Config("source_config.reservations_path missing".into()))?;

        Ok(Self {
            inventory_path,
            reservations_path,
            column_separator: source.inventory_column_separator().to_string(),
            row_separator: source.inventory_row_separator().to_string(),
            ignore_empty_lines: true,
            archive: ArchiveLayout::new(&config.archive_path),
        })
    }

    pub fn archive(&self) -> &ArchiveLayout {
        &self.archive
    }

    pub(crate) fn reservations_path(&self) -> &Path {
        &self.reservations_path
    }

    /// Sorted filenames in `dir` carrying `suffix` (case-sensitive).
    pub(crate) fn list_drop_files(&self, dir: &Path, suffix: &str) -> Result<Vec<String>> {
        let entries = fs::read_dir(dir).map_err(|source| ExtractError::io(dir, source))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ExtractError::io(dir, source))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(suffix) && entry.path().is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Stream the file row by row (configured row separator), handing
    /// each trimmed non-empty line to `handle`. `handle` returns false
    /// to stop early.
    fn for_each_line(
        &self,
        path: &Path,
        mut handle: impl FnMut(&str) -> Result<bool>,
    ) -> Result<()> {
        let file = fs::File::open(path).map_err(|source| ExtractError::io(path, source))?;
        let reader = BufReader::new(file);
        let separator = self.row_separator.as_bytes().first().copied().unwrap_or(b'\n');
        for chunk in reader.split(separator) {
            let chunk = chunk.map_err(|source| ExtractError::io(path, source))?;
            let line = String::from_utf8_lossy(&chunk);
            let line = line.trim();
            if line.is_empty() && self.ignore_empty_lines {
                continue;
            }
            if !handle(line)? {
                break;
            }
        }
        Ok(())
    }

    /// Row-level validation, streamed so snapshot size is unbounded.
    /// Returns false (after logging) on the first offending line.
    fn validate_inventory_file(&self, path: &Path) -> Result<bool> {
        let mut header: Option<InventoryHeader> = None;
        let mut valid = true;
        let mut row_index = 0usize;

        self.for_each_line(path, |line| {
            let values: Vec<&str> = line.split(self.column_separator.as_str()).collect();

            if let Some(header) = &header {
                row_index += 1;
                if values.len() < header.width {
                    error!(
                        row = row_index,
                        expected = header.width,
                        got = values.len(),
                        "Invalid row: column count mismatch"
                    );
                    valid = false;
                    return Ok(false);
                }

                for (field_name, index, check) in [
                    ("hotel_id", header.hotel_id, Check::NonEmptyString),
                    ("room_type_id", header.room_type_id, Check::NonEmptyString),
                    ("quantity", header.quantity, Check::NonNegativeInt),
                ] {
                    let mut record = Map::new();
                    record.insert(field_name.to_string(), Value::from(values[index]));
                    let outcome = match check {
                        Check::NonEmptyString => {
                            validate_string(Some(&record), field_name, false, None)
                        }
                        Check::NonNegativeInt => {
                            validate_int(Some(&record), field_name, Some(0), None)
                        }
                    };
                    if let Err(err) = outcome {
                        error!(row = row_index, "Invalid {field_name}. {}", err.message);
                        valid = false;
                        return Ok(false);
                    }
                }

                return Ok(true);
            }

            match InventoryHeader::from_columns(&values) {
                Some(parsed) => {
                    header = Some(parsed);
                    Ok(true)
                }
                None => {
                    error!(
                        file = %path.display(),
                        "Inventory file should have the columns {}",
                        REQUIRED_COLUMNS.join(", ")
                    );
                    valid = false;
                    Ok(false)
                }
            }
        })?;

        // A file that never produced a header has no rows at all.
        Ok(valid && header.is_some())
    }

    /// Second pass: parse the validated file into an inventory batch.
    fn inventory_to_batch(&self, file: &FileInfo) -> Result<RecordBatch> {
        let mut header: Option<InventoryHeader> = None;
        let mut records = Vec::new();
        let ingested_at = time::now();
        let path = file.temporary_filepath.clone();

        self.for_each_line(&path, |line| {
            let values: Vec<&str> = line.split(self.column_separator.as_str()).collect();

            if let Some(header) = &header {
                if values.len() < header.width {
                    return Err(ExtractError::document(&path, "row narrower than the header"));
                }

                let hotel_id: i64 = values[header.hotel_id].trim().parse().map_err(|_| {
                    ExtractError::document(
                        &path,
                        format!("hotel_id '{}' is not numeric", values[header.hotel_id]),
                    )
                })?;
                let quantity: i64 = values[header.quantity].trim().parse().map_err(|_| {
                    ExtractError::document(
                        &path,
                        format!("quantity '{}' is not numeric", values[header.quantity]),
                    )
                })?;

                records.push(InventoryRecord {
                    hotel_id,
                    room_type_id: values[header.room_type_id].trim().to_string(),
                    quantity,
                    ingested_at,
                    source_filename: file.original_filename.clone(),
                    is_active: true,
                });
                return Ok(true);
            }

            header = InventoryHeader::from_columns(&values);
            Ok(header.is_some())
        })?;

        Ok(InventoryRecord::batch(records))
    }

    fn acquire_inventory(&self) -> Result<Option<InventoryExtract>> {
        fs::create_dir_all(&self.inventory_path)
            .map_err(|source| ExtractError::io(&self.inventory_path, source))?;
        self.archive.ensure()?;

        info!("Loading inventory CSV file(s)...");
        let csv_filenames = self.list_drop_files(&self.inventory_path, ".csv")?;

        if csv_filenames.is_empty() {
            info!("No inventory CSV files found!");
            return Ok(None);
        }

        if csv_filenames.len() > 1 {
            error!(
                count = csv_filenames.len(),
                "Multiple files in the inventory folder. There should be only ONE file \
                 per cycle. Moving all CSV files into the error folder..."
            );
            for csv_filename in &csv_filenames {
                let drop_path = self.inventory_path.join(csv_filename);
                let error_path = self.archive.error_path(csv_filename);
                info!(file = %csv_filename, target = %error_path.display(), "Moving to error folder");
                self.archive.rename(&drop_path, &error_path)?;
            }
            return Ok(None);
        }

        let csv_filename = &csv_filenames[0];
        let drop_path = self.inventory_path.join(csv_filename);
        let tmp_path = self.archive.tmp_path(csv_filename);
        self.archive.rename(&drop_path, &tmp_path)?;

        if !self.validate_inventory_file(&tmp_path)? {
            let error_path = self.archive.error_path_for_tmp(&tmp_path);
            error!(file = %tmp_path.display(), "INVALID: moving inventory file to error folder");
            self.archive.rename(&tmp_path, &error_path)?;
            return Ok(None);
        }

        info!(file = %tmp_path.display(), "VALID: inventory file accepted");
        let file = FileInfo {
            original_filename: csv_filename.clone(),
            temporary_filepath: tmp_path.clone(),
        };

        match self.inventory_to_batch(&file) {
            Ok(batch) => Ok(Some(InventoryExtract { file, batch })),
            Err(err) => {
                // Validation passed but the cast to the table shape did
                // not; the file still has to terminate in error.
                error!(file = %tmp_path.display(), error = %err, "Inventory parse failed");
                let error_path = self.archive.error_path_for_tmp(&tmp_path);
                self.archive.rename(&tmp_path, &error_path)?;
                Ok(None)
            }
        }
    }
}

impl Extractor for LocalExtractor {
    fn extract_inventory(&self) -> Result<Option<InventoryExtract>> {
        self.acquire_inventory()
    }

    fn extract_reservations(&self) -> Result<Vec<ReservationExtract>> {
        self.acquire_reservations()
    }
}

enum Check {
    NonEmptyString,
    NonNegativeInt,
}

/// Column positions resolved from the header line; order in the file is
/// free and extra columns are tolerated.
struct InventoryHeader {
    width: usize,
    hotel_id: usize,
    room_type_id: usize,
    quantity: usize,
}

impl InventoryHeader {
    fn from_columns(columns: &[&str]) -> Option<Self> {
        let position = |name: &str| columns.iter().position(|c| c.trim() == name);
        Some(Self {
            width: columns.len(),
            hotel_id: position("hotel_id")?,
            room_type_id: position("room_type_id")?,
            quantity: position("quantity")?,
        })
    }
}
