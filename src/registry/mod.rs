//! Registry resolvers, one per ecosystem.
//!
//! - [`MavenResolver`]: Solr keyword search, unique-hit rule
//! - [`PypiResolver`]: exact-name JSON detail endpoint, 404 means absent
//! - [`NpmResolver`]: packument endpoint, 404 means absent
//!
//! [`resolve_store`] builds the resolver for an ecosystem and runs it over a
//! store through the [`ResolutionExecutor`].

mod client;
mod maven;
mod npm;
mod pypi;

pub use client::RegistryClient;
pub use maven::MavenResolver;
pub use npm::NpmResolver;
pub use pypi::PypiResolver;

use crate::config::RunConfig;
use crate::executor::{ResolutionExecutor, ResolutionStats};
use crate::model::{Ecosystem, PackageStore};
use crate::traits::ResolveError;

/// Resolves every record of `store` against the public registry of `ecosystem`.
pub async fn resolve_store(
    ecosystem: Ecosystem,
    store: &mut PackageStore,
    config: &RunConfig,
) -> Result<ResolutionStats, ResolveError> {
    let client = RegistryClient::new(config)?;
    let executor = ResolutionExecutor::new(config.concurrency);
    let endpoints = &config.endpoints;
    let records = store.records_mut();

    match ecosystem {
        Ecosystem::Npm => {
            let resolver = NpmResolver::new(client, endpoints.npm.as_str());
            executor.execute(&resolver, records).await
        }
        Ecosystem::Maven => {
            let resolver = MavenResolver::new(client, endpoints.maven_search.as_str());
            executor.execute(&resolver, records).await
        }
        Ecosystem::Pypi => {
            let resolver = PypiResolver::new(client, endpoints.pypi.as_str());
            executor.execute(&resolver, records).await
        }
    }
}
