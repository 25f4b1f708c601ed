//! Command-line surface of the binary.

use clap::{ArgGroup, Parser, ValueEnum};
use dependency_combobulator::{AnalysisLevel, Ecosystem, InputMode, RetryPolicy, RunConfig};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Dependency Combobulator - Dependency Confusion Checker
#[derive(Parser, Debug)]
#[command(name = "dependency-combobulator", version, about)]
#[command(group(ArgGroup::new("input").required(true).args(["load_list", "directory", "package"])))]
pub struct Args {
    /// Package manager type
    #[arg(short = 't', long = "type", value_enum)]
    pub package_type: PackageType,

    /// Load list of dependencies from a file
    #[arg(short = 'l', long = "load_list")]
    pub load_list: Option<PathBuf>,

    /// Extract dependencies from local source repository
    #[arg(short = 'd', long)]
    pub directory: Option<PathBuf>,

    /// Name a single package
    #[arg(short = 'p', long)]
    pub package: Option<String>,

    /// Recursively scan directories when scanning from source
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Export packages properties onto CSV file
    #[arg(short = 'c', long)]
    pub csv: Option<PathBuf>,

    /// GitHub access token (overrides the GITHUB_TOKEN environment setting)
    #[arg(long = "github", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Required analysis level
    #[arg(short = 'a', long = "analysis", value_enum, default_value = "compare")]
    pub analysis: Level,

    /// Set the logging level
    #[arg(long = "loglevel", value_enum, default_value = "INFO", ignore_case = true)]
    pub log_level: LogLevel,

    /// Log output file
    #[arg(long = "logfile")]
    pub log_file: Option<PathBuf>,

    /// Registry requests allowed in flight at once
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Retries for unreachable or overloaded registries
    #[arg(long, default_value_t = RetryPolicy::default().max_retries)]
    pub retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum PackageType {
    Npm,
    #[value(alias = "PyPI")]
    Pypi,
    Maven,
}

impl From<PackageType> for Ecosystem {
    fn from(value: PackageType) -> Self {
        match value {
            PackageType::Npm => Ecosystem::Npm,
            PackageType::Pypi => Ecosystem::Pypi,
            PackageType::Maven => Ecosystem::Maven,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Level {
    #[value(alias = "comp")]
    Compare,
    #[value(alias = "heur")]
    Heuristics,
}

impl From<Level> for AnalysisLevel {
    fn from(value: Level) -> Self {
        match value {
            Level::Compare => AnalysisLevel::Compare,
            Level::Heuristics => AnalysisLevel::Heuristics,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl Args {
    /// Picks the input mode. `--recursive` only applies to directory scans.
    pub fn input_mode(&self) -> InputMode {
        if self.recursive && self.directory.is_none() {
            warn!("Recursive option is only applicable to source scans.");
        }

        if let Some(path) = &self.load_list {
            InputMode::List(path.clone())
        } else if let Some(path) = &self.directory {
            InputMode::Directory {
                path: path.clone(),
                recursive: self.recursive,
            }
        } else {
            InputMode::Single(self.package.clone().unwrap_or_default())
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            retry: RetryPolicy::default().with_max_retries(self.retries),
            request_timeout: Duration::from_secs(self.timeout),
            concurrency: self.concurrency.max(1),
            ..RunConfig::default()
        }
        .with_github_token(self.github_token.clone())
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `--loglevel`.
pub fn init_tracing(args: &Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.directive()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()?;
        }
        None => builder.with_writer(std::io::stderr).try_init()?,
    }
    Ok(())
}
