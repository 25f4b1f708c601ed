//! Shared helpers for registry-backed integration tests.

#![allow(dead_code)]

use dependency_combobulator::{RegistryClient, RegistryEndpoints, RetryPolicy, RunConfig};
use std::time::Duration;
use wiremock::MockServer;

/// Run configuration pointing every ecosystem at the mock server.
///
/// Retries are disabled so failure tests stay fast and deterministic.
pub fn mock_config(server: &MockServer) -> RunConfig {
    RunConfig {
        endpoints: RegistryEndpoints {
            maven_search: format!("{}/solrsearch/select", server.uri()),
            pypi: format!("{}/pypi", server.uri()),
            npm: server.uri(),
        },
        retry: RetryPolicy::none(),
        request_timeout: Duration::from_secs(5),
        ..RunConfig::default()
    }
}

/// Same as [`mock_config`] but with quick retries enabled.
pub fn retrying_config(server: &MockServer, max_retries: u32) -> RunConfig {
    RunConfig {
        retry: RetryPolicy {
            max_retries,
            initial_backoff_ms: 10,
            max_backoff_ms: 50,
        },
        ..mock_config(server)
    }
}

pub fn client(config: &RunConfig) -> RegistryClient {
    RegistryClient::new(config).expect("client builds")
}
