pub mod analysis;
pub mod config;
pub mod executor;
pub mod export;
pub mod manifest;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod traits;

// Re-export common types for convenience
pub use executor::*;
pub use model::*;
pub use traits::*;

pub use analysis::{analyzer_for, AnalysisLevel, ConfusionAnalyzer};
pub use config::{RegistryEndpoints, RetryPolicy, RunConfig};
pub use export::{export_csv, ExportError};
pub use manifest::scan_source;
pub use pipeline::{ingest, ExitStatus, InputMode, PipelineError, ScanPipeline, ScanReport};
pub use registry::{resolve_store, MavenResolver, NpmResolver, PypiResolver, RegistryClient};
