//! Typed rows for the four store tables
//!
//! Each record knows its table name and column order; batches are built
//! from slices of records so the extractors never hand the store a
//! misaligned row.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

use crate::batch::{DbValue, RecordBatch};

/// Lifecycle states a reservation can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationStatus {
    Provisional,
    WaitingList,
    Confirmed,
    Cancelled,
    NoShow,
    CheckedIn,
    CheckedOut,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 7] = [
        ReservationStatus::Provisional,
        ReservationStatus::WaitingList,
        ReservationStatus::Confirmed,
        ReservationStatus::Cancelled,
        ReservationStatus::NoShow,
        ReservationStatus::CheckedIn,
        ReservationStatus::CheckedOut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Provisional => "provisional",
            ReservationStatus::WaitingList => "waiting_list",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::NoShow => "no_show",
            ReservationStatus::CheckedIn => "checked_in",
            ReservationStatus::CheckedOut => "checked_out",
        }
    }

    /// The accepted wire values, in declaration order.
    pub fn allowed_values() -> [&'static str; 7] {
        Self::ALL.map(|s| s.as_str())
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown reservation status: {s}"))
    }
}

/// A typed row destined for one store table.
pub trait TableRecord {
    /// Target table name.
    const TABLE: &'static str;
    /// Column order used for batches and inserts.
    const COLUMNS: &'static [&'static str];

    fn into_row(self) -> Vec<DbValue>;

    /// Build a batch from a record sequence.
    fn batch(records: impl IntoIterator<Item = Self>) -> RecordBatch
    where
        Self: Sized,
    {
        let mut batch = RecordBatch::new(Self::COLUMNS.iter().copied());
        for record in records {
            batch.push_row(record.into_row());
        }
        batch
    }
}

/// One room-type line of the live inventory snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRecord {
    pub hotel_id: i64,
    pub room_type_id: String,
    pub quantity: i64,
    pub ingested_at: NaiveDateTime,
    pub source_filename: String,
    pub is_active: bool,
}

impl TableRecord for InventoryRecord {
    const TABLE: &'static str = "inventory";
    const COLUMNS: &'static [&'static str] = &[
        "hotel_id",
        "room_type_id",
        "quantity",
        "ingested_at",
        "source_filename",
        "is_active",
    ];

    fn into_row(self) -> Vec<DbValue> {
        vec![
            self.hotel_id.into(),
            self.room_type_id.into(),
            self.quantity.into(),
            self.ingested_at.into(),
            self.source_filename.into(),
            self.is_active.into(),
        ]
    }
}

/// One accepted reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationImportRecord {
    pub hotel_id: String,
    pub reservation_id: String,
    pub status: ReservationStatus,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub source_name: Option<String>,
    pub source_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub source_filename: String,
    pub ingested_at: NaiveDateTime,
    pub reservation_hash: String,
}

impl TableRecord for ReservationImportRecord {
    const TABLE: &'static str = "reservation_imports";
    const COLUMNS: &'static [&'static str] = &[
        "hotel_id",
        "reservation_id",
        "status",
        "arrival_date",
        "departure_date",
        "source_name",
        "source_id",
        "created_at",
        "updated_at",
        "source_filename",
        "ingested_at",
        "reservation_hash",
    ];

    fn into_row(self) -> Vec<DbValue> {
        vec![
            self.hotel_id.into(),
            self.reservation_id.into(),
            self.status.as_str().into(),
            self.arrival_date.into(),
            self.departure_date.into(),
            self.source_name.into(),
            self.source_id.into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.source_filename.into(),
            self.ingested_at.into(),
            self.reservation_hash.into(),
        ]
    }
}

/// One accepted stay-date line item under a reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct StayDateRecord {
    pub hotel_id: String,
    pub reservation_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_type_id: String,
    pub room_type_name: String,
    pub number_of_adults: i64,
    pub number_of_children: i64,
    pub revenue_gross_amount: f64,
    pub revenue_net_amount: f64,
    pub fnb_gross_amount: Option<f64>,
    pub fnb_net_amount: Option<f64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub ingested_at: NaiveDateTime,
    pub reservation_hash: String,
    pub stay_date_hash: String,
}

impl TableRecord for StayDateRecord {
    const TABLE: &'static str = "reservation_stay_dates";
    const COLUMNS: &'static [&'static str] = &[
        "hotel_id",
        "reservation_id",
        "start_date",
        "end_date",
        "room_type_id",
        "room_type_name",
        "number_of_adults",
        "number_of_children",
        "revenue_gross_amount",
        "revenue_net_amount",
        "fnb_gross_amount",
        "fnb_net_amount",
        "created_at",
        "updated_at",
        "ingested_at",
        "reservation_hash",
        "stay_date_hash",
    ];

    fn into_row(self) -> Vec<DbValue> {
        vec![
            self.hotel_id.into(),
            self.reservation_id.into(),
            self.start_date.into(),
            self.end_date.into(),
            self.room_type_id.into(),
            self.room_type_name.into(),
            self.number_of_adults.into(),
            self.number_of_children.into(),
            self.revenue_gross_amount.into(),
            self.revenue_net_amount.into(),
            self.fnb_gross_amount.into(),
            self.fnb_net_amount.into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.ingested_at.into(),
            self.reservation_hash.into(),
            self.stay_date_hash.into(),
        ]
    }
}

/// A reservation (or reservation fragment) that failed validation, kept
/// with its structured errors for observability.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedImportRecord {
    /// Opaque JSON text of the rejected payload.
    pub rejected_row: String,
    /// JSON array text of the validation errors.
    pub validation_errors: String,
    pub source_filename: String,
    pub ingested_at: NaiveDateTime,
}

impl TableRecord for RejectedImportRecord {
    const TABLE: &'static str = "rejected_imports";
    const COLUMNS: &'static [&'static str] = &[
        "rejected_row",
        "validation_errors",
        "source_filename",
        "ingested_at",
    ];

    fn into_row(self) -> Vec<DbValue> {
        vec![
            self.rejected_row.into(),
            self.validation_errors.into(),
            self.source_filename.into(),
            self.ingested_at.into(),
        ]
    }
}
