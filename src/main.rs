//! Dependency Combobulator
//!
//! Checks the dependencies of an npm, Maven or PyPI project against the
//! public registry of its ecosystem to surface dependency-confusion risk.

mod cli;

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use cli::Args;
use dependency_combobulator::{analyzer_for, export_csv, Ecosystem, ExitStatus, ScanPipeline};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        // Only warn if it's not a "file not found" error
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let args = Args::parse();
    if let Err(e) = cli::init_tracing(&args) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitStatus::FileError.into();
    }

    run(args).await.into()
}

async fn run(args: Args) -> ExitStatus {
    let ecosystem = Ecosystem::from(args.package_type);
    let config = args.run_config();
    let input = args.input_mode();

    info!(%ecosystem, ?input, "Starting scan");

    let analyzer = analyzer_for(args.analysis.into(), &config);
    let pipeline = ScanPipeline::new(ecosystem, config).with_analyzer(analyzer);

    let report = match pipeline.execute(&input).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Scan aborted");
            return e.exit_status();
        }
    };

    info!(
        packages = report.store.len(),
        existing = report.stats.resolution.existing,
        absent = report.stats.resolution.absent,
        duration_ms = report.stats.total_duration_ms,
        "Scan finished"
    );

    if let Some(path) = &args.csv {
        if let Err(e) = export_csv(&report.store, path) {
            error!(error = %e, "CSV export failed");
            return ExitStatus::FileError;
        }
    }

    ExitStatus::Success
}
