//! CSV export of the final store.

use crate::model::{Ecosystem, PackageStore};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CSV_HEADERS: [&str; 7] = [
    "Package Name",
    "Package Type",
    "Exists on External",
    "Org/Group ID",
    "Score",
    "Version Count",
    "Timestamp",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV file couldn't be written to {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("CSV file couldn't be flushed to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Serialize)]
struct Row<'a> {
    name: &'a str,
    ecosystem: Ecosystem,
    exists: Option<bool>,
    organization_id: Option<&'a str>,
    score: Option<f64>,
    version_count: Option<u64>,
    published_timestamp: Option<i64>,
}

/// Writes one row per record, in store order, to `path`.
pub fn export_csv(store: &PackageStore, path: &Path) -> Result<(), ExportError> {
    let file = std::fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_csv(store, file).map_err(|source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), rows = store.len(), "CSV file has been successfully exported");
    Ok(())
}

/// Writes the header and one row per record to any writer.
pub fn write_csv<W: Write>(store: &PackageStore, writer: W) -> Result<(), csv::Error> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv.write_record(CSV_HEADERS)?;
    for record in store {
        csv.serialize(Row {
            name: record.name(),
            ecosystem: record.ecosystem(),
            exists: record.existence().as_bool(),
            organization_id: record.organization_id(),
            score: record.risk_score,
            version_count: record.version_count(),
            published_timestamp: record.published_timestamp(),
        })?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PackageRecord;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_rows_follow_store_order() {
        let mut store = PackageStore::new();

        let mut foo = PackageRecord::new("com.example:foo", Ecosystem::Maven, None).unwrap();
        foo.mark_exists().unwrap();
        foo.set_version_count(7);
        foo.set_published_timestamp(1620000000000);
        foo.risk_score = Some(0.0);
        store.push(foo);

        let mut internal = PackageRecord::new("com.internal:core", Ecosystem::Maven, None).unwrap();
        internal.mark_absent().unwrap();
        internal.risk_score = Some(1.0);
        store.push(internal);

        store.push(PackageRecord::new("org.other:lib", Ecosystem::Maven, None).unwrap());

        let mut out = Vec::new();
        write_csv(&store, &mut out).unwrap();

        let expected = "\
Package Name,Package Type,Exists on External,Org/Group ID,Score,Version Count,Timestamp
foo,maven,true,com.example,0.0,7,1620000000000
core,maven,false,com.internal,1.0,,
lib,maven,,org.other,,,
";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_empty_store_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");

        export_csv(&PackageStore::new(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().collect::<Vec<_>>(), vec![CSV_HEADERS.join(",")]);
    }

    #[test]
    fn test_unwritable_path_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("report.csv");

        let err = export_csv(&PackageStore::new(), &path).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
