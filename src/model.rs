//! Package identity model.
//!
//! A [`PackageRecord`] tracks one dependency through the whole run:
//! created during ingestion, resolved once against its registry, scored by
//! the analysis stage and finally read by the exporter. All records of a run
//! live in a [`PackageStore`], which keeps insertion order.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Ecosystem
// ============================================================================

/// Package-manager universe a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    Maven,
    Pypi,
}

impl Ecosystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::Maven => "maven",
            Ecosystem::Pypi => "pypi",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the public registry knows the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Existence {
    /// Not resolved yet
    #[default]
    Unknown,
    Exists,
    Absent,
}

impl Existence {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Existence::Unknown)
    }

    /// `None` while unresolved.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Existence::Unknown => None,
            Existence::Exists => Some(true),
            Existence::Absent => Some(false),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Package identifier is empty")]
    EmptyName,

    #[error("Invalid Maven coordinate '{0}': expected 'group:artifact'")]
    InvalidCoordinate(String),

    #[error("Identifier '{identifier}' looks like a Maven coordinate but the ecosystem is {ecosystem}")]
    UnexpectedCoordinate {
        identifier: String,
        ecosystem: Ecosystem,
    },

    #[error("Identifier '{identifier}' contains '{character}', which no package name may carry")]
    InvalidCharacter { identifier: String, character: char },

    #[error("Package '{0}' was already resolved")]
    AlreadyResolved(String),
}

// ============================================================================
// Package Record
// ============================================================================

/// Social and trust signals written by the analysis stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrustSignals {
    pub fork_count: Option<u64>,
    pub star_count: Option<u64>,
    pub subscriber_count: Option<u64>,
    pub contributor_count: Option<u64>,
    pub download_count: Option<u64>,
    pub issue_count: Option<u64>,
    pub author: Option<String>,
    pub author_email: Option<String>,
    pub publisher: Option<String>,
    pub publisher_email: Option<String>,
    pub maintainer: Option<String>,
    pub maintainer_email: Option<String>,
    /// Further dependency identifiers
    pub dependencies: Vec<String>,
}

/// Canonical per-dependency record.
///
/// Identity (`name`, `ecosystem`, `organization_id`) is fixed at creation and
/// existence can only move once from [`Existence::Unknown`] to a terminal
/// value, so later stages can read but never rewrite them.
///
/// Records serialize for reporting but never deserialize: the only way to
/// build one is [`PackageRecord::new`].
///
/// ```compile_fail
/// let record: dependency_combobulator::PackageRecord =
///     serde_json::from_str(r#"{"name":"","ecosystem":"npm"}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageRecord {
    name: String,
    ecosystem: Ecosystem,
    organization_id: Option<String>,
    existence: Existence,

    /// Written only by the analysis stage
    pub risk_score: Option<f64>,

    version_count: Option<u64>,

    /// Epoch milliseconds of the latest release
    published_timestamp: Option<i64>,

    /// Written only by the analysis stage
    pub signals: TrustSignals,
}

impl PackageRecord {
    /// Builds a record from a raw identifier.
    ///
    /// For Maven, a bare `group:artifact` token without an explicit
    /// organization is split into both fields. Other ecosystems take the
    /// identifier as-is and reject anything that looks like a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when the identifier is empty, the coordinate
    /// shape does not fit the ecosystem, or a name carries a character that
    /// would change the meaning of a registry URL.
    pub fn new(
        raw: &str,
        ecosystem: Ecosystem,
        organization: Option<&str>,
    ) -> Result<Self, RecordError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RecordError::EmptyName);
        }

        let organization = organization.map(str::trim);

        let (name, organization_id) = match (ecosystem, organization) {
            (Ecosystem::Maven, Some(org)) => {
                if org.is_empty() {
                    return Err(RecordError::InvalidCoordinate(raw.to_string()));
                }
                (raw.to_string(), Some(org.to_string()))
            }
            (Ecosystem::Maven, None) => {
                let (group, artifact) = split_coordinate(raw)
                    .ok_or_else(|| RecordError::InvalidCoordinate(raw.to_string()))?;
                (artifact.to_string(), Some(group.to_string()))
            }
            (_, organization) => {
                if raw.contains(':') {
                    return Err(RecordError::UnexpectedCoordinate {
                        identifier: raw.to_string(),
                        ecosystem,
                    });
                }
                let org = organization.filter(|o| !o.is_empty()).map(str::to_string);
                (raw.to_string(), org)
            }
        };

        check_name(raw, ecosystem, &name)?;
        if let Some(org) = &organization_id {
            check_name(raw, Ecosystem::Maven, org)?;
        }

        Ok(Self {
            name,
            ecosystem,
            organization_id,
            existence: Existence::Unknown,
            risk_score: None,
            version_count: None,
            published_timestamp: None,
            signals: TrustSignals::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    pub fn existence(&self) -> Existence {
        self.existence
    }

    pub fn version_count(&self) -> Option<u64> {
        self.version_count
    }

    pub fn published_timestamp(&self) -> Option<i64> {
        self.published_timestamp
    }

    /// `group:artifact` for Maven, the bare name elsewhere.
    pub fn display_id(&self) -> String {
        match &self.organization_id {
            Some(org) => format!("{}:{}", org, self.name),
            None => self.name.clone(),
        }
    }

    /// Marks the package as present on the public registry.
    pub fn mark_exists(&mut self) -> Result<(), RecordError> {
        self.resolve_to(Existence::Exists)
    }

    /// Marks the package as missing (or unverifiable) on the public registry.
    pub fn mark_absent(&mut self) -> Result<(), RecordError> {
        self.resolve_to(Existence::Absent)
    }

    pub fn set_version_count(&mut self, count: u64) {
        self.version_count = Some(count);
    }

    pub fn set_published_timestamp(&mut self, epoch_millis: i64) {
        self.published_timestamp = Some(epoch_millis);
    }

    fn resolve_to(&mut self, existence: Existence) -> Result<(), RecordError> {
        if self.existence.is_resolved() {
            return Err(RecordError::AlreadyResolved(self.display_id()));
        }
        self.existence = existence;
        Ok(())
    }
}

impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn split_coordinate(raw: &str) -> Option<(&str, &str)> {
    let mut parts = raw.split(':');
    let group = parts.next()?.trim();
    let artifact = parts.next()?.trim();
    if parts.next().is_some() || group.is_empty() || artifact.is_empty() {
        return None;
    }
    Some((group, artifact))
}

/// Rejects whitespace, control characters, URL delimiters and slashes. The
/// only slash allowed is the one of an npm scope (`@scope/name`). Maven
/// property references such as `${project.groupId}` pass.
fn check_name(identifier: &str, ecosystem: Ecosystem, name: &str) -> Result<(), RecordError> {
    let scoped = ecosystem == Ecosystem::Npm
        && name.starts_with('@')
        && matches!(name.split_once('/'), Some((scope, rest)) if scope.len() > 1 && !rest.is_empty());

    let mut slashes = 0;
    for character in name.chars() {
        let forbidden = match character {
            '/' => {
                slashes += 1;
                !scoped || slashes > 1
            }
            '?' | '#' | '%' | '\\' => true,
            c => c.is_whitespace() || c.is_control(),
        };
        if forbidden {
            return Err(RecordError::InvalidCharacter {
                identifier: identifier.to_string(),
                character,
            });
        }
    }
    Ok(())
}

// ============================================================================
// Package Store
// ============================================================================

/// Ordered, append-only collection of every record in the current run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageStore {
    records: Vec<PackageRecord>,
}

impl PackageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. Records with the same identity are kept side by side.
    pub fn push(&mut self, record: PackageRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PackageRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[PackageRecord] {
        &self.records
    }

    /// Mutable view for the resolution and analysis stages. The slice cannot
    /// grow or shrink, so insertion order is untouched.
    pub fn records_mut(&mut self) -> &mut [PackageRecord] {
        &mut self.records
    }
}

impl<'a> IntoIterator for &'a PackageStore {
    type Item = &'a PackageRecord;
    type IntoIter = std::slice::Iter<'a, PackageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maven_coordinate_is_split() {
        let record = PackageRecord::new("com.example:foo", Ecosystem::Maven, None).unwrap();
        assert_eq!(record.name(), "foo");
        assert_eq!(record.organization_id(), Some("com.example"));
        assert_eq!(record.existence(), Existence::Unknown);
        assert_eq!(record.display_id(), "com.example:foo");
    }

    #[test]
    fn test_maven_explicit_organization() {
        let record = PackageRecord::new("foo", Ecosystem::Maven, Some("com.example")).unwrap();
        assert_eq!(record.name(), "foo");
        assert_eq!(record.organization_id(), Some("com.example"));
    }

    #[test]
    fn test_maven_rejects_malformed_coordinates() {
        for raw in ["foo", "com.example:", ":foo", "a:b:c"] {
            assert_eq!(
                PackageRecord::new(raw, Ecosystem::Maven, None),
                Err(RecordError::InvalidCoordinate(raw.to_string())),
                "{raw}"
            );
        }
        assert!(PackageRecord::new("foo", Ecosystem::Maven, Some("  ")).is_err());
    }

    #[test]
    fn test_coordinate_rejected_outside_maven() {
        let err = PackageRecord::new("com.example:foo", Ecosystem::Pypi, None).unwrap_err();
        assert!(matches!(err, RecordError::UnexpectedCoordinate { .. }));
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert_eq!(
            PackageRecord::new("   ", Ecosystem::Npm, None),
            Err(RecordError::EmptyName)
        );
    }

    #[test]
    fn test_url_delimiters_rejected() {
        for (raw, ecosystem, character) in [
            ("left-pad?internal-corp-lib", Ecosystem::Npm, '?'),
            ("flask#egg", Ecosystem::Pypi, '#'),
            ("requests/../flask", Ecosystem::Pypi, '/'),
            ("foo%2Fbar", Ecosystem::Npm, '%'),
            ("internal lib", Ecosystem::Npm, ' '),
            ("@corp/auth/extra", Ecosystem::Npm, '/'),
            ("com.example:foo?x", Ecosystem::Maven, '?'),
            ("com/example:foo", Ecosystem::Maven, '/'),
        ] {
            assert_eq!(
                PackageRecord::new(raw, ecosystem, None),
                Err(RecordError::InvalidCharacter {
                    identifier: raw.to_string(),
                    character,
                }),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_maven_property_reference_passes() {
        let record =
            PackageRecord::new("${project.groupId}:core", Ecosystem::Maven, None).unwrap();
        assert_eq!(record.organization_id(), Some("${project.groupId}"));
    }

    #[test]
    fn test_npm_scope_keeps_its_slash() {
        let record = PackageRecord::new("@corp/auth", Ecosystem::Npm, None).unwrap();
        assert_eq!(record.name(), "@corp/auth");

        for raw in ["@/auth", "@corp/", "corp/auth"] {
            assert!(PackageRecord::new(raw, Ecosystem::Npm, None).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_existence_is_set_once() {
        let mut record = PackageRecord::new("flask", Ecosystem::Pypi, None).unwrap();
        assert_eq!(record.existence().as_bool(), None);

        record.mark_exists().unwrap();
        assert_eq!(record.existence(), Existence::Exists);

        assert_eq!(
            record.mark_absent(),
            Err(RecordError::AlreadyResolved("flask".to_string()))
        );
        assert_eq!(record.existence(), Existence::Exists);
    }

    #[test]
    fn test_store_keeps_order_and_duplicates() {
        let mut store = PackageStore::new();
        for name in ["b", "a", "b"] {
            store.push(PackageRecord::new(name, Ecosystem::Npm, None).unwrap());
        }

        let names: Vec<&str> = store.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["b", "a", "b"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_record_serialization() {
        let record = PackageRecord::new("left-pad", Ecosystem::Npm, None).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ecosystem"], "npm");
        assert_eq!(json["existence"], "unknown");
    }
}
