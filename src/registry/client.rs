//! Shared HTTP client with bounded retry.

use crate::config::{RetryPolicy, RunConfig};
use crate::traits::ResolveError;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode, Url};
use tokio::time::sleep;
use tracing::{debug, warn};

/// HTTP client used by every resolver.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    retry: RetryPolicy,
}

impl RegistryClient {
    pub fn new(config: &RunConfig) -> Result<Self, ResolveError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("dependency-combobulator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ResolveError::Client)?;

        Ok(Self {
            http,
            retry: config.retry,
        })
    }

    /// Sends a JSON GET request, retrying transport failures and 429/5xx
    /// answers according to the retry policy.
    ///
    /// Every other status is handed back to the caller, which owns the
    /// ecosystem-specific meaning of 404 and friends. A status that is still
    /// retryable after the last attempt is returned as well.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Connection`] once the transport keeps failing after
    /// the last retry.
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, ResolveError> {
        let mut retry = 0;
        loop {
            let mut request = self.http.get(url).header(ACCEPT, "application/json");
            if !query.is_empty() {
                request = request.query(query);
            }

            let exhausted = retry >= self.retry.max_retries;
            match request.send().await {
                Ok(response) if !exhausted && is_retryable(response.status()) => {
                    warn!(
                        url,
                        status = response.status().as_u16(),
                        attempt = retry + 1,
                        "Registry answered with a retryable status"
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if !exhausted => {
                    warn!(url, attempt = retry + 1, error = %e, "Registry request failed");
                }
                Err(source) => {
                    return Err(ResolveError::Connection {
                        url: url.to_string(),
                        source,
                    })
                }
            }

            retry += 1;
            let delay = self.retry.backoff(retry);
            debug!(url, retry, backoff_ms = delay.as_millis() as u64, "Retrying registry request");
            sleep(delay).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Appends `segments` to `base`, each percent-encoded as one path segment.
pub(crate) fn endpoint_url(base: &str, segments: &[&str]) -> Result<String, ResolveError> {
    let invalid = || ResolveError::InvalidEndpoint {
        url: base.to_string(),
    };
    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

/// Reads a response body, mapping read failures to connection errors.
pub(crate) async fn read_body(url: &str, response: Response) -> Result<String, ResolveError> {
    response.text().await.map_err(|source| ResolveError::Connection {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_segments_are_encoded() {
        assert_eq!(
            endpoint_url("https://registry.npmjs.org/", &["@corp/auth"]).unwrap(),
            "https://registry.npmjs.org/@corp%2Fauth"
        );
        assert_eq!(
            endpoint_url("https://pypi.org/pypi", &["left-pad?internal-corp-lib", "json"]).unwrap(),
            "https://pypi.org/pypi/left-pad%3Finternal-corp-lib/json"
        );
        assert_eq!(
            endpoint_url("http://127.0.0.1:8080", &["a#b"]).unwrap(),
            "http://127.0.0.1:8080/a%23b"
        );
        assert!(matches!(
            endpoint_url("not a url", &["flask"]),
            Err(ResolveError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::FORBIDDEN));
    }
}
