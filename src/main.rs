//! tradeflow binary: run the ETL pipeline or generate synthetic input

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tradeflow::{gen, run_pipeline, BenchRecorder, Config, PostgresSink};

#[derive(Parser)]
#[command(name = "tradeflow", version, about = "Batch ETL for exchange trade records")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline (default)
    Run,
    /// Write a synthetic record file to the configured input path
    Generate {
        /// Number of rows to generate
        #[arg(default_value_t = 100_000)]
        rows: u64,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Generate { rows } => {
            gen::generate_file(&config.input_path, rows)?;
            tracing::info!(rows, path = %config.input_path.display(), "synthetic file written");
        }
        Command::Run => {
            let sink = Arc::new(PostgresSink::new(config.connection_string.as_str()));
            let recorder = BenchRecorder::new();

            let summary = run_pipeline(&config, sink, &recorder)?;
            recorder.report();
            tracing::info!(
                parsed = summary.parsed,
                clean = summary.clean,
                rejected = summary.rejected,
                rows_loaded = summary.load.rows_loaded,
                indicators = summary.load.indicator_rows,
                artifact = %summary.artifact.path.display(),
                state = %summary.load_state,
                "pipeline complete"
            );
        }
    }
    Ok(())
}
