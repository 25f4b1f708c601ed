//! Maven Central search resolver.

use super::client::{read_body, RegistryClient};
use crate::model::{Ecosystem, PackageRecord};
use crate::traits::{RegistryResolver, ResolveError};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Rows requested per search. Anything above one hit is ambiguous anyway.
const SEARCH_ROWS: &str = "20";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    #[serde(default)]
    a: Option<String>,
    /// Epoch milliseconds of the latest upload
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(rename = "versionCount", default)]
    version_count: Option<u64>,
}

/// Resolves Maven records through the keyword-search endpoint.
///
/// The search is fuzzy, so a record only counts as existing when the query
/// returns exactly one document. Zero or several hits resolve to absent.
pub struct MavenResolver {
    client: RegistryClient,
    search_url: String,
}

impl MavenResolver {
    pub fn new(client: RegistryClient, search_url: impl Into<String>) -> Self {
        Self {
            client,
            search_url: search_url.into(),
        }
    }
}

#[async_trait]
impl RegistryResolver for MavenResolver {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    async fn resolve(&self, record: &mut PackageRecord) -> Result<(), ResolveError> {
        let group = record
            .organization_id()
            .ok_or_else(|| ResolveError::MissingOrganization(record.name().to_string()))?;
        let query = format!("g:{} a:{}", group, record.name());

        let url = self.search_url.as_str();
        let response = self
            .client
            .get_json(url, &[("q", query.as_str()), ("rows", SEARCH_ROWS), ("wt", "json")])
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = read_body(url, response).await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| ResolveError::MalformedResponse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        apply_search(record, &parsed.response)
    }
}

fn apply_search(record: &mut PackageRecord, body: &SearchBody) -> Result<(), ResolveError> {
    if body.num_found != 1 {
        debug!(
            package = %record.display_id(),
            num_found = body.num_found,
            "No unique Maven match"
        );
        record.mark_absent()?;
        return Ok(());
    }

    record.mark_exists()?;
    if let Some(doc) = body.docs.first() {
        if let Some(timestamp) = doc.timestamp {
            record.set_published_timestamp(timestamp);
        }
        if let Some(count) = doc.version_count {
            record.set_version_count(count);
        }
        debug!(
            package = %record.display_id(),
            artifact = doc.a.as_deref().unwrap_or_default(),
            "Unique Maven match"
        );
    }
    Ok(())
}
