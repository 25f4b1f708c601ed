//! Scan pipeline: ingestion, resolution and analysis.
//!
//! [`ScanPipeline`] runs the stages strictly in order:
//! 1. **Ingestion**: turn the selected [`InputMode`] into a [`PackageStore`]
//! 2. **Resolution**: query the ecosystem's public registry for every record
//! 3. **Analysis**: score the resolved store with a [`ConfusionAnalyzer`]
//!
//! Each stage is timed and logged through `tracing`. Any fatal error aborts
//! the run and no partial store is handed back.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::analysis::ConfusionAnalyzer;
use crate::config::RunConfig;
use crate::executor::ResolutionStats;
use crate::manifest::scan_source;
use crate::model::{Ecosystem, PackageRecord, PackageStore, RecordError};
use crate::registry::resolve_store;
use crate::traits::{ExtractionError, ResolveError};

// ============================================================================
// Inputs and results
// ============================================================================

/// Where the dependency identifiers of a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// File with one identifier per line
    List(PathBuf),

    /// Project tree scanned with the ecosystem's manifest extractor
    Directory { path: PathBuf, recursive: bool },

    /// One literal identifier
    Single(String),
}

/// Final store plus timing and counters.
#[derive(Debug)]
pub struct ScanReport {
    pub store: PackageStore,
    pub stats: ScanStats,
}

#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    pub total_duration_ms: u64,
    pub ingestion_duration_ms: u64,
    pub resolution_duration_ms: u64,
    pub analysis_duration_ms: u64,
    pub resolution: ResolutionStats,
}

/// Process exit taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success = 0,
    FileError = 1,
    ConnectionError = 2,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The identifier list could not be read
    #[error("Cannot process input list {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Stage '{stage}' timed out after {timeout_ms}ms")]
    StageTimeout { stage: String, timeout_ms: u64 },

    #[error("Ingestion task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            PipelineError::Resolve(_) | PipelineError::StageTimeout { .. } => {
                ExitStatus::ConnectionError
            }
            PipelineError::Input { .. }
            | PipelineError::Extraction(_)
            | PipelineError::Record(_)
            | PipelineError::Task(_) => ExitStatus::FileError,
        }
    }
}

// ============================================================================
// Ingestion
// ============================================================================

/// Builds the store for `ecosystem` from an input mode.
///
/// Maven identifiers are split into group and artifact here; any identifier
/// that does not fit its ecosystem fails the whole ingestion.
pub fn ingest(ecosystem: Ecosystem, input: &InputMode) -> Result<PackageStore, PipelineError> {
    let identifiers: Vec<String> = match input {
        InputMode::List(path) => load_list(path)?,
        InputMode::Directory { path, recursive } => {
            scan_source(ecosystem, path, *recursive)?.into_iter().collect()
        }
        InputMode::Single(name) => vec![name.clone()],
    };

    info!(%ecosystem, count = identifiers.len(), "Package list imported");

    let mut store = PackageStore::new();
    for identifier in &identifiers {
        store.push(PackageRecord::new(identifier, ecosystem, None)?);
    }
    Ok(store)
}

fn load_list(path: &Path) -> Result<Vec<String>, PipelineError> {
    let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct ScanPipeline {
    ecosystem: Ecosystem,
    config: RunConfig,
    analyzer: Option<Box<dyn ConfusionAnalyzer>>,
}

impl ScanPipeline {
    /// Default configuration comes from [`RunConfig`]; no analyzer is
    /// attached, so records keep an unset risk score.
    pub fn new(ecosystem: Ecosystem, config: RunConfig) -> Self {
        Self {
            ecosystem,
            config,
            analyzer: None,
        }
    }

    pub fn with_analyzer(mut self, analyzer: Box<dyn ConfusionAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Registry calls allowed in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    /// Upper bound for the whole resolution stage.
    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.config.stage_timeout = Some(stage_timeout);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs ingestion, resolution and analysis for one input.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the input cannot be read or parsed, a
    /// registry cannot be reached or answers unexpectedly, or the resolution
    /// stage exceeds its timeout.
    pub async fn execute(&self, input: &InputMode) -> Result<ScanReport, PipelineError> {
        let start = Instant::now();
        let mut stats = ScanStats::default();

        // ====================================================================
        // Stage 1: Ingestion
        // ====================================================================

        info!("Starting ingestion stage");
        let ingestion_start = Instant::now();

        let ecosystem = self.ecosystem;
        let owned_input = input.clone();
        let mut store = tokio::task::spawn_blocking(move || ingest(ecosystem, &owned_input))
            .await
            .map_err(|e| PipelineError::Task(format!("Task join error: {}", e)))??;

        stats.ingestion_duration_ms = ingestion_start.elapsed().as_millis() as u64;
        info!(
            duration_ms = stats.ingestion_duration_ms,
            records = store.len(),
            "Ingestion completed"
        );

        // ====================================================================
        // Stage 2: Resolution
        // ====================================================================

        info!("Starting resolution stage");
        let resolution_start = Instant::now();

        let resolution = resolve_store(ecosystem, &mut store, &self.config);
        stats.resolution = match self.config.stage_timeout {
            Some(limit) => timeout(limit, resolution)
                .await
                .map_err(|_| PipelineError::StageTimeout {
                    stage: "resolution".to_string(),
                    timeout_ms: limit.as_millis() as u64,
                })??,
            None => resolution.await?,
        };

        stats.resolution_duration_ms = resolution_start.elapsed().as_millis() as u64;
        info!(
            duration_ms = stats.resolution_duration_ms,
            existing = stats.resolution.existing,
            absent = stats.resolution.absent,
            "Resolution completed"
        );

        // ====================================================================
        // Stage 3: Analysis
        // ====================================================================

        match &self.analyzer {
            Some(analyzer) => {
                info!(level = %analyzer.level(), "Starting analysis stage");
                let analysis_start = Instant::now();
                analyzer.analyze(&mut store);
                stats.analysis_duration_ms = analysis_start.elapsed().as_millis() as u64;
                info!(duration_ms = stats.analysis_duration_ms, "Analysis completed");
            }
            None => warn!("No analyzer attached, skipping analysis stage"),
        }

        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        Ok(ScanReport { store, stats })
    }
}

// ============================================================================
// Tests
// ============================================================================
