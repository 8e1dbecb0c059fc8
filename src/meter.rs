//! Scoped benchmark meter
//!
//! Stage timings are collected through scope guards: a guard records its
//! start on creation and pushes a [`BenchmarkResult`] when it leaves scope,
//! on every exit path. The recorder serializes pushes and can be shared
//! across threads.

use std::time::Instant;

use parking_lot::Mutex;

/// One measured pipeline stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkResult {
    /// Stage label
    pub label: &'static str,
    /// Wall-clock duration in nanoseconds
    pub duration_ns: u64,
    /// Items processed inside the scope
    pub item_count: u64,
}

impl BenchmarkResult {
    /// Items per second over the measured window; 0.0 for an empty window
    pub fn throughput_per_sec(&self) -> f64 {
        if self.duration_ns == 0 {
            return 0.0;
        }
        self.item_count as f64 * 1_000_000_000.0 / self.duration_ns as f64
    }

    /// Nanoseconds spent per item; 0.0 when no items were counted
    pub fn ns_per_item(&self) -> f64 {
        if self.item_count == 0 {
            return 0.0;
        }
        self.duration_ns as f64 / self.item_count as f64
    }
}

/// Thread-safe collector of stage timings
#[derive(Default)]
pub struct BenchRecorder {
    results: Mutex<Vec<BenchmarkResult>>,
}

impl BenchRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start measuring a scope; the result is pushed when the guard drops
    pub fn measure(&self, label: &'static str) -> MeterGuard<'_> {
        MeterGuard {
            recorder: self,
            label,
            items: 0,
            start: Instant::now(),
        }
    }

    /// Snapshot of everything recorded so far, in completion order
    pub fn results(&self) -> Vec<BenchmarkResult> {
        self.results.lock().clone()
    }

    /// Emit one log line per recorded stage
    pub fn report(&self) {
        for result in self.results.lock().iter() {
            tracing::info!(
                stage = result.label,
                duration_ms = result.duration_ns / 1_000_000,
                items = result.item_count,
                throughput_per_sec = result.throughput_per_sec(),
                ns_per_item = result.ns_per_item(),
                "stage timing"
            );
        }
    }

    fn push(&self, result: BenchmarkResult) {
        self.results.lock().push(result);
    }
}

/// Scope guard created by [`BenchRecorder::measure`]
pub struct MeterGuard<'a> {
    recorder: &'a BenchRecorder,
    label: &'static str,
    items: u64,
    start: Instant,
}

impl MeterGuard<'_> {
    /// Set the item count reported with this scope
    pub fn items(&mut self, count: u64) {
        self.items = count;
    }
}

impl Drop for MeterGuard<'_> {
    fn drop(&mut self) {
        self.recorder.push(BenchmarkResult {
            label: self.label,
            duration_ns: self.start.elapsed().as_nanos() as u64,
            item_count: self.items,
        });
    }
}
