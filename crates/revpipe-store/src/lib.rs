//! Store adapter for the analytical database
//!
//! The pipeline talks to its store through the narrow [`StoreEngine`]
//! trait; concrete engines are looked up by name in a process-wide
//! registry so `db_config.engine` in the configuration file selects the
//! implementation. The built-in engine is an embedded SQLite database.

use revpipe_core::RecordBatch;

mod error;
mod registry;
mod sqlite;

pub use error::{Result, StoreError};
pub use registry::{create_engine, register_engine, registered_engines, EngineFactory};
pub use sqlite::SqliteEngine;

/// Outcome of [`StoreEngine::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteOutcome {
    /// The query produced a result set.
    Table(RecordBatch),
    /// The statement reported an affected-row count.
    RowsAffected(usize),
    /// Plain success flag (DDL, or a swallowed error under safe mode).
    Success(bool),
}

impl ExecuteOutcome {
    pub fn as_table(&self) -> Option<&RecordBatch> {
        match self {
            ExecuteOutcome::Table(batch) => Some(batch),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<RecordBatch> {
        match self {
            ExecuteOutcome::Table(batch) => Some(batch),
            _ => None,
        }
    }
}

/// Options for [`StoreEngine::insert_rows`].
///
/// `pre` and `post` run inside the same transaction (and connection) as
/// the bulk insert; a temp staging table created by `pre` is still
/// visible to `post`. That pairing is what the runner's staging-merge
/// upsert builds on.
#[derive(Debug, Clone, Default)]
pub struct InsertOptions<'a> {
    /// Statement executed before the bulk insert.
    pub pre: Option<&'a str>,
    /// Statement executed after the bulk insert.
    pub post: Option<&'a str>,
    /// Delete all existing rows of the target table first.
    pub overwrite: bool,
    /// Log-and-return-zero instead of surfacing errors.
    pub safe: bool,
}

impl<'a> InsertOptions<'a> {
    pub fn safe() -> Self {
        Self {
            safe: true,
            ..Self::default()
        }
    }

    pub fn with_pre(mut self, pre: &'a str) -> Self {
        self.pre = Some(pre);
        self
    }

    pub fn with_post(mut self, post: &'a str) -> Self {
        self.post = Some(post);
        self
    }
}

/// Narrow contract every store engine implements.
///
/// Engines open and close their connection per call; callers may invoke
/// them repeatedly without holding any open handle.
pub trait StoreEngine: Send + Sync {
    /// Engine name as registered (and as configured).
    fn name(&self) -> &'static str;

    /// Smoke-test connectivity.
    fn validate_connection(&self) -> bool;

    /// Run all DDL scripts in lexicographic order (idempotent).
    fn init_schema(&self) -> Result<()>;

    /// Execute one statement. With `safe`, errors are logged and
    /// surfaced as `Success(false)`.
    fn execute(&self, query: &str, safe: bool) -> Result<ExecuteOutcome>;

    /// Transactional bulk insert with optional pre/post statements and
    /// overwrite. Returns the number of inserted rows; with
    /// `options.safe`, failures are logged and reported as 0.
    fn insert_rows(
        &self,
        table: &str,
        batch: &RecordBatch,
        options: InsertOptions<'_>,
    ) -> Result<usize>;
}

impl std::fmt::Debug for dyn StoreEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreEngine").field("name", &self.name()).finish()
    }
}
