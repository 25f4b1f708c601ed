//! PyPI JSON API resolver.

use super::client::{endpoint_url, read_body, RegistryClient};
use crate::model::{Ecosystem, PackageRecord};
use crate::traits::{RegistryResolver, ResolveError};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

/// Resolves PyPI records through `<base>/<name>/json`.
pub struct PypiResolver {
    client: RegistryClient,
    base_url: String,
}

impl PypiResolver {
    pub fn new(client: RegistryClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn detail_url(&self, name: &str) -> Result<String, ResolveError> {
        endpoint_url(&self.base_url, &[name, "json"])
    }
}

#[async_trait]
impl RegistryResolver for PypiResolver {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pypi
    }

    async fn resolve(&self, record: &mut PackageRecord) -> Result<(), ResolveError> {
        let url = self.detail_url(record.name())?;
        debug!(%url, "Querying PyPI");

        let response = self.client.get_json(&url, &[]).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!(package = record.name(), "Not found on PyPI");
            record.mark_absent()?;
            return Ok(());
        }
        if !status.is_success() {
            return Err(ResolveError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = read_body(&url, response).await?;
        let detail: Value = match serde_json::from_str(&body) {
            Ok(detail) => detail,
            Err(e) => {
                warn!(
                    package = record.name(),
                    error = %e,
                    "Malformed PyPI response, marking package absent"
                );
                record.mark_absent()?;
                return Ok(());
            }
        };

        apply_detail(record, &detail)
    }
}

fn apply_detail(record: &mut PackageRecord, detail: &Value) -> Result<(), ResolveError> {
    let info = match detail.get("info") {
        Some(Value::Object(info)) if !info.is_empty() => info,
        _ => {
            debug!(package = record.name(), "PyPI response has no info section");
            record.mark_absent()?;
            return Ok(());
        }
    };

    record.mark_exists()?;

    let releases = detail.get("releases").and_then(Value::as_object);
    record.set_version_count(releases.map_or(0, |r| r.len() as u64));

    let latest = info.get("version").and_then(Value::as_str);
    let uploaded = latest
        .and_then(|version| releases?.get(version))
        .and_then(Value::as_array)
        .and_then(|files| files.first())
        .and_then(|file| file.get("upload_time_iso_8601"))
        .and_then(Value::as_str);

    match uploaded.map(DateTime::parse_from_rfc3339) {
        Some(Ok(time)) => record.set_published_timestamp(time.timestamp_millis()),
        Some(Err(e)) => {
            debug!(package = record.name(), error = %e, "Unparseable upload time");
        }
        None => {
            debug!(
                package = record.name(),
                latest = latest.unwrap_or_default(),
                "Latest version missing from release history"
            );
        }
    }
    Ok(())
}
