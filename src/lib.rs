//! tradeflow - High-throughput batch ETL for exchange trade records

pub mod columnar;
pub mod concurrent;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod gen;
pub mod indicators;
pub mod meter;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod validator;

// Re-export main components
pub use concurrent::{ring, Consumer, Producer, TaskHandle, ThreadPool};
pub use config::Config;
pub use db::{BulkSink, LoadState, ParallelLoader, PostgresSink};
pub use error::{Result, StoreErrorKind, TradeflowError};
pub use meter::{BenchRecorder, BenchmarkResult};
pub use pipeline::{run_pipeline, PipelineSummary};
pub use record::{IndicatorRow, Record, ValidationOutcome};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
