//! Pipeline configuration sourced from the environment

use std::env;
use std::path::PathBuf;

use crate::constants::{DEFAULT_INDICATOR_PERIOD, DEFAULT_WORKER_COUNT};
use crate::error::{Result, TradeflowError};

/// Runtime configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct Config {
    /// Input record file
    pub input_path: PathBuf,
    /// libpq-style connection string
    pub connection_string: String,
    /// Number of parallel load workers
    pub worker_count: usize,
    /// Directory receiving the columnar artifact
    pub parquet_dir: PathBuf,
    /// Indicator look-back window
    pub indicator_period: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("trades.csv"),
            connection_string: "host=localhost user=postgres dbname=tradeflow".to_string(),
            worker_count: DEFAULT_WORKER_COUNT,
            parquet_dir: PathBuf::from("."),
            indicator_period: DEFAULT_INDICATOR_PERIOD,
        }
    }
}

impl Config {
    /// Build a configuration from `TRADEFLOW_*` environment variables,
    /// falling back to defaults for anything unset.
    ///
    /// `TRADEFLOW_WORKERS=0` means "one worker per core".
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = env::var("TRADEFLOW_INPUT") {
            config.input_path = PathBuf::from(path);
        }
        if let Ok(conn) = env::var("TRADEFLOW_DB") {
            config.connection_string = conn;
        }
        if let Ok(workers) = env::var("TRADEFLOW_WORKERS") {
            let n: usize = workers
                .parse()
                .map_err(|_| TradeflowError::config(format!("bad TRADEFLOW_WORKERS: {workers}")))?;
            config.worker_count = if n == 0 { num_cpus::get() } else { n };
        }
        if let Ok(dir) = env::var("TRADEFLOW_PARQUET_DIR") {
            config.parquet_dir = PathBuf::from(dir);
        }
        if let Ok(period) = env::var("TRADEFLOW_PERIOD") {
            config.indicator_period = period
                .parse()
                .map_err(|_| TradeflowError::config(format!("bad TRADEFLOW_PERIOD: {period}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(TradeflowError::config("worker_count must be at least 1"));
        }
        if self.indicator_period == 0 {
            return Err(TradeflowError::config("indicator_period must be at least 1"));
        }
        Ok(())
    }
}
