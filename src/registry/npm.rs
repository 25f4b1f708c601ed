//! npm registry resolver.

use super::client::{endpoint_url, read_body, RegistryClient};
use crate::model::{Ecosystem, PackageRecord};
use crate::traits::{RegistryResolver, ResolveError};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, serde_json::Value>,
    /// Publish times keyed by version, plus `created`/`modified`, or an
    /// `unpublished` object once every version was pulled
    #[serde(default)]
    time: HashMap<String, serde_json::Value>,
}

/// Resolves npm records through the packument endpoint `<base>/<name>`.
pub struct NpmResolver {
    client: RegistryClient,
    base_url: String,
}

impl NpmResolver {
    pub fn new(client: RegistryClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Scoped names keep their `@` but send the slash encoded.
    fn packument_url(&self, name: &str) -> Result<String, ResolveError> {
        endpoint_url(&self.base_url, &[name])
    }
}

#[async_trait]
impl RegistryResolver for NpmResolver {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    async fn resolve(&self, record: &mut PackageRecord) -> Result<(), ResolveError> {
        let url = self.packument_url(record.name())?;
        let response = self.client.get_json(&url, &[]).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!(package = record.name(), "Not found on npm");
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
        match serde_json::from_str::<Packument>(&body) {
            Ok(packument) => apply_packument(record, &packument),
            Err(e) => {
                warn!(
                    package = record.name(),
                    error = %e,
                    "Malformed npm response, marking package absent"
                );
                record.mark_absent()?;
                Ok(())
            }
        }
    }
}

fn apply_packument(record: &mut PackageRecord, packument: &Packument) -> Result<(), ResolveError> {
    if packument.versions.is_empty() && packument.time.contains_key("unpublished") {
        debug!(package = record.name(), "Package was unpublished from npm");
        record.mark_absent()?;
        return Ok(());
    }

    record.mark_exists()?;
    record.set_version_count(packument.versions.len() as u64);

    let published = packument
        .dist_tags
        .get("latest")
        .and_then(|latest| packument.time.get(latest))
        .and_then(|time| time.as_str())
        .and_then(|time| DateTime::parse_from_rfc3339(time).ok());
    if let Some(time) = published {
        record.set_published_timestamp(time.timestamp_millis());
    }
    Ok(())
}
