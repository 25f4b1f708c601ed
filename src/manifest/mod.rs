//! Manifest extractors, one per ecosystem.
//!
//! Each extractor implements [`ManifestExtractor`]; [`scan_source`] picks the
//! right one for an [`Ecosystem`].

mod maven;
mod npm;
mod pypi;

pub use maven::MavenExtractor;
pub use npm::NpmExtractor;
pub use pypi::PypiExtractor;

use crate::model::Ecosystem;
use crate::traits::{ExtractionError, ManifestExtractor};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extracts the deduplicated dependency identifiers of `ecosystem` from `root`.
pub fn scan_source(
    ecosystem: Ecosystem,
    root: &Path,
    recursive: bool,
) -> Result<BTreeSet<String>, ExtractionError> {
    info!(%ecosystem, root = %root.display(), recursive, "Scanning source for manifests");

    let identifiers = match ecosystem {
        Ecosystem::Npm => NpmExtractor.extract(root, recursive)?,
        Ecosystem::Maven => MavenExtractor.extract(root, recursive)?,
        Ecosystem::Pypi => PypiExtractor.extract(root, recursive)?,
    };

    info!(%ecosystem, count = identifiers.len(), "Dependencies extracted");
    Ok(identifiers)
}

/// Finds the manifest files an extractor should read.
pub(crate) fn locate<E>(
    extractor: &E,
    root: &Path,
    recursive: bool,
) -> Result<Vec<PathBuf>, ExtractionError>
where
    E: ManifestExtractor + ?Sized,
{
    let manifest = extractor.manifest_name();

    if !recursive {
        let path = root.join(manifest);
        if path.is_file() {
            return Ok(vec![path]);
        }
        return Err(ExtractionError::NotFound {
            manifest,
            dir: root.to_path_buf(),
        });
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(root).sort_by_file_name().into_iter();
    for entry in walker.filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || !extractor.skip_dir(&e.file_name().to_string_lossy())
    }) {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == manifest {
            debug!(path = %entry.path().display(), "Found manifest");
            found.push(entry.into_path());
        }
    }
    Ok(found)
}
