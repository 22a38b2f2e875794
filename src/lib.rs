//! revpipe - periodic ingestion pipeline for hotel revenue management
//!
//! Inventory snapshots (CSV) and reservation batches (JSON) dropped into
//! configured directories are validated at two levels, deduplicated by
//! canonical content hash, and merged into an embedded analytical store.
//! A KPI report (per-night occupancy, net revenue, ADR) reads from the
//! populated store.
//!
//! This crate is the binary front end; the functionality lives in the
//! workspace members re-exported below.

pub use revpipe_config::{DbConfig, PipelineConfig, SourceConfig, SourceType};
pub use revpipe_core::{records, DbValue, RecordBatch, ValidationError};
pub use revpipe_pipeline::{ExportType, KpiReport, PipelineContext, Runner, Scheduler};
