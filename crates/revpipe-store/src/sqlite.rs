//! Embedded SQLite engine
//!
//! Connections are opened per call and closed when the call returns, so
//! the engine value itself is cheap to share and safe under repeated
//! open/close. Temp objects created by an `insert_rows` pre-statement
//! live exactly as long as that call's connection, which scopes staging
//! tables to a single upsert.

use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info};

use revpipe_config::DbConfig;
use revpipe_core::batch::{DbValue, RecordBatch};

use crate::error::{Result, StoreError};
use crate::{ExecuteOutcome, InsertOptions, StoreEngine};

/// DDL scripts executed by `init_schema`, in lexicographic filename
/// order. Embedded at compile time from `sql/`.
const DDL_SCRIPTS: &[(&str, &str)] = &[
    ("001_create_inventory.sql", include_str!("../sql/001_create_inventory.sql")),
    (
        "002_create_reservation_imports.sql",
        include_str!("../sql/002_create_reservation_imports.sql"),
    ),
    (
        "003_create_reservation_stay_dates.sql",
        include_str!("../sql/003_create_reservation_stay_dates.sql"),
    ),
    (
        "004_create_rejected_imports.sql",
        include_str!("../sql/004_create_rejected_imports.sql"),
    ),
    ("005_create_view_kpi.sql", include_str!("../sql/005_create_view_kpi.sql")),
];

/// Engine backed by a single SQLite database file.
pub struct SqliteEngine {
    db_path: PathBuf,
}

impl SqliteEngine {
    pub const NAME: &'static str = "sqlite";

    /// Factory registered under [`Self::NAME`].
    pub fn factory(config: &DbConfig) -> Result<Box<dyn StoreEngine>> {
        Ok(Box::new(Self::new(config)?))
    }

    pub fn new(config: &DbConfig) -> Result<Self> {
        let db_path = config
            .db_path
            .clone()
            .ok_or_else(|| StoreError::InvalidConfig("sqlite engine requires db_config.db_path".into()))?;
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { db_path })
    }

    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        // Renames into the archive and inserts happen in the same cycle;
        // keep readers from blocking the single writer.
        conn.pragma_update(None, "busy_timeout", 5_000)?;
        Ok(conn)
    }

    fn run_insert(
        &self,
        table: &str,
        batch: &RecordBatch,
        options: &InsertOptions<'_>,
    ) -> Result<usize> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        if options.overwrite {
            // SQLite has no TRUNCATE; an unqualified DELETE is its spelling.
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }

        if let Some(pre) = options.pre {
            tx.execute_batch(pre)?;
        }

        {
            let placeholders = (1..=batch.columns().len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let statement = format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders})",
                batch.columns().join(", ")
            );
            let mut stmt = tx.prepare(&statement)?;
            for row in batch.rows() {
                stmt.execute(rusqlite::params_from_iter(row.iter().map(to_sql_value)))?;
            }
        }

        if let Some(post) = options.post {
            tx.execute_batch(post)?;
        }

        tx.commit()?;
        Ok(batch.len())
    }
}

impl StoreEngine for SqliteEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate_connection(&self) -> bool {
        info!(db_path = %self.db_path.display(), "Validating SQLite connection");
        match self.open().and_then(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(StoreError::from)
        }) {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, "SQLite connection check failed");
                false
            }
        }
    }

    fn init_schema(&self) -> Result<()> {
        info!(db_path = %self.db_path.display(), "Initializing store schema");
        let conn = self.open()?;
        for (script, sql) in DDL_SCRIPTS {
            debug!(script, "Running DDL script");
            conn.execute_batch(sql)
                .map_err(|source| StoreError::Schema { script, source })?;
        }
        Ok(())
    }

    fn execute(&self, query: &str, safe: bool) -> Result<ExecuteOutcome> {
        let outcome = (|| -> Result<ExecuteOutcome> {
            let conn = self.open()?;
            let mut stmt = conn.prepare(query)?;

            if stmt.column_count() > 0 {
                let columns: Vec<String> =
                    stmt.column_names().iter().map(|c| c.to_string()).collect();
                let mut batch = RecordBatch::new(columns);
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    let mut cells = Vec::with_capacity(batch.columns().len());
                    for idx in 0..batch.columns().len() {
                        cells.push(from_sql_value(row.get::<_, SqlValue>(idx)?));
                    }
                    batch.push_row(cells);
                }
                return Ok(ExecuteOutcome::Table(batch));
            }

            let affected = stmt.execute([])?;
            Ok(ExecuteOutcome::RowsAffected(affected))
        })();

        match outcome {
            Ok(result) => Ok(result),
            Err(err) if safe => {
                error!(error = %err, "Error executing query");
                Ok(ExecuteOutcome::Success(false))
            }
            Err(err) => Err(err),
        }
    }

    fn insert_rows(
        &self,
        table: &str,
        batch: &RecordBatch,
        options: InsertOptions<'_>,
    ) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        match self.run_insert(table, batch, &options) {
            Ok(count) => Ok(count),
            Err(err) if options.safe => {
                error!(table, error = %err, "Error inserting rows");
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }
}

fn to_sql_value(value: &DbValue) -> SqlValue {
    match value {
        DbValue::Null => SqlValue::Null,
        DbValue::Integer(v) => SqlValue::Integer(*v),
        DbValue::Real(v) => SqlValue::Real(*v),
        DbValue::Text(v) => SqlValue::Text(v.clone()),
        DbValue::Bool(v) => SqlValue::Integer(i64::from(*v)),
        DbValue::Date(v) => SqlValue::Text(v.format("%Y-%m-%d").to_string()),
        DbValue::DateTime(v) => SqlValue::Text(v.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
    }
}

fn from_sql_value(value: SqlValue) -> DbValue {
    match value {
        SqlValue::Null => DbValue::Null,
        SqlValue::Integer(v) => DbValue::Integer(v),
        SqlValue::Real(v) => DbValue::Real(v),
        SqlValue::Text(v) => DbValue::Text(v),
        SqlValue::Blob(v) => DbValue::Text(hex::encode(v)),
    }
}
