//! File extraction for the ingestion pipeline
//!
//! Extractors acquire candidate files from the drop directories by atomic
//! rename into the archive's tmp directory, validate their content, and
//! hand back tabular batches plus the file-tracking metadata the runner
//! needs to commit each file to the success directory. Invalid files are
//! committed to the error directory here; the runner never sees them.

use std::path::PathBuf;

use revpipe_core::RecordBatch;

mod api;
mod archive;
mod error;
mod inventory;
mod reservations;

pub use api::ApiExtractor;
pub use archive::ArchiveLayout;
pub use error::{ExtractError, Result};
pub use inventory::LocalExtractor;

/// Identity of an acquired drop-file while it sits in tmp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Filename as it was dropped, used for `source_filename` columns
    /// and the success rename.
    pub original_filename: String,
    /// Current location under `<archive>/tmp`.
    pub temporary_filepath: PathBuf,
}

/// A validated inventory snapshot ready for ingestion.
#[derive(Debug)]
pub struct InventoryExtract {
    pub file: FileInfo,
    pub batch: RecordBatch,
}

/// One validated reservations file: the three per-file batches.
#[derive(Debug)]
pub struct ReservationExtract {
    pub file: FileInfo,
    pub imports: RecordBatch,
    pub stay_dates: RecordBatch,
    pub rejected: RecordBatch,
}

/// Source-side of the pipeline: where the runner gets its batches from.
pub trait Extractor {
    /// At most one inventory snapshot per cycle; `None` when the drop
    /// directory holds nothing usable.
    fn extract_inventory(&self) -> Result<Option<InventoryExtract>>;

    /// All reservation files present this cycle, in lexicographic
    /// filename order.
    fn extract_reservations(&self) -> Result<Vec<ReservationExtract>>;
}

/// Build the extractor selected by the configuration.
pub fn for_config(config: &revpipe_config::PipelineConfig) -> Result<Box<dyn Extractor>> {
    match config.source_type {
        revpipe_config::SourceType::Local => Ok(Box::new(LocalExtractor::new(config)?)),
        revpipe_config::SourceType::Api => Ok(Box::new(ApiExtractor::new(config)?)),
    }
}
