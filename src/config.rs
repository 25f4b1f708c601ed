//! Run configuration shared by the pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_MAVEN_SEARCH_URL: &str = "https://search.maven.org/solrsearch/select";
pub const DEFAULT_PYPI_URL: &str = "https://pypi.org/pypi";
pub const DEFAULT_NPM_URL: &str = "https://registry.npmjs.org";

/// Public registry query endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEndpoints {
    /// Solr keyword-search endpoint
    pub maven_search: String,

    /// Base of the `<base>/<name>/json` detail endpoint
    pub pypi: String,

    /// Base of the `<base>/<name>` packument endpoint
    pub npm: String,
}

impl Default for RegistryEndpoints {
    fn default() -> Self {
        Self {
            maven_search: DEFAULT_MAVEN_SEARCH_URL.to_string(),
            pypi: DEFAULT_PYPI_URL.to_string(),
            npm: DEFAULT_NPM_URL.to_string(),
        }
    }
}

/// Bounded retry with exponential backoff for registry calls.
///
/// Only transport failures and 429/5xx statuses are retried. Once the budget
/// is spent the failure is returned to the caller as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, fail immediately.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}

/// Everything a scan needs besides its input.
#[derive(Clone)]
pub struct RunConfig {
    pub endpoints: RegistryEndpoints,
    pub retry: RetryPolicy,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Registry calls allowed in flight at once (1 = sequential)
    pub concurrency: usize,

    /// Upper bound for the whole resolution stage
    pub stage_timeout: Option<Duration>,

    /// Token for the trust-signal source used by heuristic analysis
    pub github_token: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            endpoints: RegistryEndpoints::default(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            concurrency: 1,
            stage_timeout: None,
            github_token: None,
        }
    }
}

impl RunConfig {
    /// Blank tokens count as absent.
    pub fn with_github_token(mut self, token: Option<String>) -> Self {
        self.github_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn has_github_token(&self) -> bool {
        self.github_token.is_some()
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("endpoints", &self.endpoints)
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .field("concurrency", &self.concurrency)
            .field("stage_timeout", &self.stage_timeout)
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
