//! npm `package.json` extraction.

use crate::traits::{ExtractionError, ManifestExtractor};
use serde_json::Value;
use std::path::Path;

pub const PACKAGE_JSON_FILE: &str = "package.json";

const DEPENDENCY_SECTIONS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Reads the dependency maps of `package.json` files. Installed packages under
/// `node_modules` are not part of the project and are never walked.
#[derive(Debug, Default, Clone, Copy)]
pub struct NpmExtractor;

impl ManifestExtractor for NpmExtractor {
    fn manifest_name(&self) -> &'static str {
        PACKAGE_JSON_FILE
    }

    fn parse(&self, path: &Path, content: &str) -> Result<Vec<String>, ExtractionError> {
        let json: Value = serde_json::from_str(content).map_err(|e| ExtractionError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut names = Vec::new();
        for section in DEPENDENCY_SECTIONS {
            if let Some(deps) = json.get(section).and_then(Value::as_object) {
                names.extend(deps.keys().cloned());
            }
        }
        Ok(names)
    }

    fn skip_dir(&self, dir_name: &str) -> bool {
        dir_name == "node_modules"
    }
}
