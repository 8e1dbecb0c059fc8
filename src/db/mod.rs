//! Relational store sink and the three-phase parallel loader

pub mod loader;
pub mod postgres;

use std::fmt;

use crate::error::Result;
use crate::record::{IndicatorRow, Record};

pub use self::loader::{chunk_spans, LoadReport, ParallelLoader};
pub use self::postgres::PostgresSink;

/// Store-side contract for the bulk load.
///
/// This is the seam the loader and the tests exercise: the production
/// implementation talks PostgreSQL, tests substitute an in-memory sink.
/// `copy_span` is called from pool workers concurrently and must open its
/// own wire-level session per invocation; the other operations run serially
/// on the driver thread (except `save_indicators`, which runs as a single
/// background task).
pub trait BulkSink: Send + Sync {
    /// Idempotent schema bootstrap: tables, constraints, indexes
    fn init_schema(&self) -> Result<()>;

    /// Phase P1: truncate and drop the primary key and secondary index so
    /// the bulk streams write into an unindexed table
    fn prepare(&self) -> Result<()>;

    /// Phase P2 worker body: stream one span of records through a bulk
    /// COPY channel in its own transaction. Returns rows written.
    fn copy_span(&self, records: &[Record]) -> Result<u64>;

    /// Phase P3: rebuild the primary key and the `(symbol, timestamp)`
    /// index in one bulk pass
    fn finalize(&self) -> Result<()>;

    /// Append the run's indicator rows in one transaction, all stamped
    /// with the same `computed_at`
    fn save_indicators(&self, rows: &[IndicatorRow], computed_at: i64) -> Result<()>;
}

/// Where the load driver ended up.
///
/// ```text
/// Idle -> Prepared -> Copying -> Finalized        happy path
///      \
///       PrepFailed                 terminal, schema intact
/// Prepared -> CopyFailed           manual cleanup: truncate + rerun prepare
/// Copying  -> FinalizeFailed       data loaded, no indexes; retriable
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No load attempted yet
    Idle,
    /// P1 committed; table truncated and unindexed
    Prepared,
    /// P2 workers launched
    Copying,
    /// P3 committed; constraints rebuilt
    Finalized,
    /// P1 failed; nothing was launched
    PrepFailed,
    /// At least one P2 worker failed
    CopyFailed,
    /// P3 failed; rows are loaded but unindexed
    FinalizeFailed,
}

impl LoadState {
    /// True for the states a successful rerun can start from without
    /// operator intervention
    pub fn is_success(self) -> bool {
        matches!(self, Self::Finalized)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Prepared => "prepared",
            Self::Copying => "copying",
            Self::Finalized => "finalized",
            Self::PrepFailed => "prep_failed",
            Self::CopyFailed => "copy_failed",
            Self::FinalizeFailed => "finalize_failed",
        };
        f.write_str(s)
    }
}
