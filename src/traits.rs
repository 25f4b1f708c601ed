use crate::model::{Ecosystem, PackageRecord, RecordError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{manifest} not found in {}", dir.display())]
    NotFound {
        manifest: &'static str,
        dir: PathBuf,
    },
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed manifest {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Connection error while querying {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Registry at {url} answered with unexpected status {status}")]
    UnexpectedStatus { url: String, status: u16 },
    #[error("Malformed registry response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
    #[error("Package '{package}' belongs to {found}, resolver handles {expected}")]
    EcosystemMismatch {
        package: String,
        expected: Ecosystem,
        found: Ecosystem,
    },
    #[error("Registry endpoint {url} cannot take a package path")]
    InvalidEndpoint { url: String },
    #[error("Maven package '{0}' has no group id")]
    MissingOrganization(String),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Executor error: {0}")]
    Executor(String),
}

/// Turns a project directory into raw dependency identifiers for one ecosystem.
pub trait ManifestExtractor: Send + Sync {
    /// File name of the manifest this extractor reads (e.g., "pom.xml").
    fn manifest_name(&self) -> &'static str;

    /// Parses one manifest's content into raw identifiers.
    fn parse(&self, path: &Path, content: &str) -> Result<Vec<String>, ExtractionError>;

    /// Directories skipped during a recursive walk.
    fn skip_dir(&self, _dir_name: &str) -> bool {
        false
    }

    /// Locates every manifest under `root` and unions their identifiers.
    ///
    /// Non-recursive mode only looks at `root/<manifest>` and fails when it is
    /// missing; recursive mode walks the whole tree and yields an empty set
    /// when nothing is found.
    fn extract(&self, root: &Path, recursive: bool) -> Result<BTreeSet<String>, ExtractionError> {
        let manifests = crate::manifest::locate(self, root, recursive)?;

        let mut identifiers = BTreeSet::new();
        for path in manifests {
            let content = std::fs::read_to_string(&path).map_err(|source| ExtractionError::Io {
                path: path.clone(),
                source,
            })?;
            identifiers.extend(self.parse(&path, &content)?);
        }
        Ok(identifiers)
    }
}

/// Determines existence of a package on one public registry and enriches
/// the record with whatever metadata the registry exposes.
#[async_trait]
pub trait RegistryResolver: Send + Sync {
    /// Ecosystem served by this resolver.
    fn ecosystem(&self) -> Ecosystem;

    /// Issues one registry query and writes the outcome into `record`.
    ///
    /// Expected negative signals (404, ambiguous search hits) and soft body
    /// failures resolve the record as absent and return `Ok`. Anything that
    /// prevents a trustworthy answer is returned as [`ResolveError`].
    async fn resolve(&self, record: &mut PackageRecord) -> Result<(), ResolveError>;
}
