//! Pipeline driver
//!
//! Stages the components in order and collects per-stage timings through
//! the benchmark recorder. The driver thread itself stays serial;
//! parallelism lives inside the loader's worker pool.

use std::sync::Arc;

use crate::columnar::{self, ColumnarArtifact};
use crate::concurrent::ThreadPool;
use crate::config::Config;
use crate::db::{BulkSink, LoadReport, LoadState, ParallelLoader};
use crate::error::Result;
use crate::indicators;
use crate::meter::BenchRecorder;
use crate::parser;
use crate::validator::{self, TracingRejectLog};

/// Everything a run produced, for reporting
#[derive(Debug)]
pub struct PipelineSummary {
    /// Records parsed from the input file
    pub parsed: usize,
    /// Records surviving validation
    pub clean: usize,
    /// Records rejected with diagnostics
    pub rejected: usize,
    /// Columnar artifact on disk
    pub artifact: ColumnarArtifact,
    /// Store-side load outcome
    pub load: LoadReport,
    /// Final load driver state
    pub load_state: LoadState,
}

/// Run the full pipeline: parse → validate → indicators → columnar
/// artifact → three-phase parallel load.
pub fn run_pipeline(
    config: &Config,
    sink: Arc<dyn BulkSink>,
    recorder: &BenchRecorder,
) -> Result<PipelineSummary> {
    sink.init_schema()?;

    let records = {
        let mut meter = recorder.measure("parse");
        let records = parser::parse_file(&config.input_path)?;
        meter.items(records.len() as u64);
        records
    };
    let parsed = records.len();
    tracing::info!(parsed, input = %config.input_path.display(), "parsed input");

    let (clean, rejected) = {
        let mut meter = recorder.measure("validate");
        let (clean, rejected) = validator::validate_batch(records, &TracingRejectLog);
        meter.items(clean.len() as u64);
        (clean, rejected)
    };
    if rejected > 0 {
        tracing::info!(rejected, "records dropped by validation");
    }

    let indicator_rows = {
        let mut meter = recorder.measure("indicators");
        let rows = indicators::compute(&clean, config.indicator_period);
        meter.items(rows.len() as u64);
        rows
    };

    let artifact = {
        let mut meter = recorder.measure("parquet");
        let artifact = columnar::write_parquet(&clean, &config.parquet_dir)?;
        meter.items(artifact.rows as u64);
        artifact
    };
    tracing::info!(path = %artifact.path.display(), bytes = artifact.bytes, "columnar artifact written");

    let clean = Arc::new(clean);
    let pool = ThreadPool::new(config.worker_count)?;
    let mut loader = ParallelLoader::new();
    let load = {
        let mut meter = recorder.measure("db_load");
        let load = loader.load(sink, &pool, Arc::clone(&clean), indicator_rows);
        if let Ok(report) = &load {
            meter.items(report.rows_loaded);
        }
        load
    };
    let load_state = loader.state();
    if let Err(e) = &load {
        tracing::error!(state = %load_state, error = %e, "store load failed");
    }
    let load = load?;
    tracing::info!(
        rows = load.rows_loaded,
        indicators = load.indicator_rows,
        state = %load_state,
        "store load complete"
    );

    Ok(PipelineSummary {
        parsed,
        clean: clean.len(),
        rejected,
        artifact,
        load,
        load_state,
    })
}

