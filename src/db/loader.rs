//! Three-phase parallel load orchestration
//!
//! P1 (prepare) and P3 (finalize) run serially on the driver thread; P2
//! fans the record buffer out to pool workers as contiguous spans, each
//! streamed over its own connection. The tiny indicator write is submitted
//! as a background task before P1 and awaited after P3.
//!
//! `wait_all` on the pool only proves the queue drained; failures live
//! inside the task handles, so every handle is collected and the first
//! error re-surfaces.

use std::ops::Range;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::concurrent::ThreadPool;
use crate::error::Result;
use crate::record::{IndicatorRow, Record};

use super::{BulkSink, LoadState};

/// Split `[0, total)` into `workers` contiguous non-overlapping spans.
///
/// The first `total % workers` spans carry one extra element; together the
/// spans cover the range exactly. Spans can be empty when `workers > total`.
pub fn chunk_spans(total: usize, workers: usize) -> Vec<Range<usize>> {
    assert!(workers >= 1, "at least one worker required");
    let chunk_size = total / workers;
    let remainder = total % workers;

    let mut spans = Vec::with_capacity(workers);
    let mut offset = 0;
    for i in 0..workers {
        let len = chunk_size + usize::from(i < remainder);
        spans.push(offset..offset + len);
        offset += len;
    }
    spans
}

/// Outcome of a completed load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows streamed by the P2 workers in total
    pub rows_loaded: u64,
    /// Indicator rows appended for this run
    pub indicator_rows: usize,
    /// Shared persist stamp for the run's indicator rows
    pub computed_at: i64,
}

/// Drives one three-phase load and records the state it ended in
pub struct ParallelLoader {
    state: LoadState,
}

impl Default for ParallelLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelLoader {
    /// Create a loader in the idle state
    pub fn new() -> Self {
        Self {
            state: LoadState::Idle,
        }
    }

    /// State reached by the most recent [`load`](Self::load) call
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Run P1 → P2(N) → P3 plus the concurrent indicator write.
    ///
    /// The record buffer is shared read-only across workers; spans index
    /// into it and never copy. On error the loader's state names the phase
    /// that failed and the first captured failure is returned.
    pub fn load(
        &mut self,
        sink: Arc<dyn BulkSink>,
        pool: &ThreadPool,
        records: Arc<Vec<Record>>,
        indicators: Vec<IndicatorRow>,
    ) -> Result<LoadReport> {
        let computed_at = now_nanos();
        let indicator_rows = indicators.len();

        // Submitted before P1, awaited after P3.
        let indicator_handle = {
            let sink = Arc::clone(&sink);
            pool.submit(move || sink.save_indicators(&indicators, computed_at))?
        };

        if let Err(e) = sink.prepare() {
            self.state = LoadState::PrepFailed;
            // The indicator task is already in flight; don't leave it
            // dangling, but P1 is the failure that matters.
            if let Err(ind_err) = indicator_handle.wait() {
                tracing::warn!(error = %ind_err, "indicator write also failed");
            }
            return Err(e);
        }
        self.state = LoadState::Prepared;
        tracing::debug!("prepare committed; table truncated and unindexed");

        self.state = LoadState::Copying;
        let spans = chunk_spans(records.len(), pool.worker_count());
        let mut copy_handles = Vec::with_capacity(spans.len());
        for span in spans.into_iter().filter(|s| !s.is_empty()) {
            let sink = Arc::clone(&sink);
            let records = Arc::clone(&records);
            copy_handles.push(pool.submit(move || sink.copy_span(&records[span]))?);
        }

        pool.wait_all();

        // Every handle, not just the first failure: nothing gets dropped
        // silently even when multiple workers failed.
        let mut rows_loaded = 0u64;
        let mut first_error = None;
        for handle in copy_handles {
            match handle.wait() {
                Ok(rows) => rows_loaded += rows,
                Err(e) => first_error = first_error.or(Some(e)),
            }
        }
        if let Some(e) = first_error {
            self.state = LoadState::CopyFailed;
            if let Err(ind_err) = indicator_handle.wait() {
                tracing::warn!(error = %ind_err, "indicator write also failed");
            }
            return Err(e);
        }
        tracing::debug!(rows_loaded, "copy phase complete");

        if let Err(e) = sink.finalize() {
            // Data is loaded; the operator can retry the constraint build.
            self.state = LoadState::FinalizeFailed;
            if let Err(ind_err) = indicator_handle.wait() {
                tracing::warn!(error = %ind_err, "indicator write also failed");
            }
            return Err(e);
        }
        self.state = LoadState::Finalized;

        indicator_handle.wait()?;

        Ok(LoadReport {
            rows_loaded,
            indicator_rows,
            computed_at,
        })
    }
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}
