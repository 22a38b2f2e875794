//! Shared building blocks for the revpipe ingestion pipeline
//!
//! This crate has no I/O: it holds the field validation kernel, the
//! canonical content hash, date/time parsing helpers, and the tabular
//! batch value types carried between the extractors and the store.

pub mod batch;
pub mod hash;
pub mod records;
pub mod time;
pub mod validate;

pub use batch::{DbValue, RecordBatch};
pub use hash::row_hash;
pub use records::{
    InventoryRecord, RejectedImportRecord, ReservationImportRecord, ReservationStatus,
    StayDateRecord, TableRecord,
};
pub use validate::{ValidationError, ValidationReport};
