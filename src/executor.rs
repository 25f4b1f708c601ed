use crate::model::{Existence, PackageRecord};
use crate::traits::{RegistryResolver, ResolveError};
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

/// Counters for one resolution pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Records resolved by this pass
    pub resolved: usize,
    /// Records already resolved before the pass
    pub skipped: usize,
    pub existing: usize,
    pub absent: usize,
}

pub struct ResolutionExecutor {
    semaphore: Arc<Semaphore>,
}

impl ResolutionExecutor {
    /// A limit of 1 resolves strictly in store order.
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit.max(1))),
        }
    }

    /// Resolves every unresolved record exactly once, in place.
    ///
    /// The first fatal error stops the pass and is returned; records that
    /// were still pending are left untouched.
    #[instrument(skip(self, resolver, records), fields(ecosystem = %resolver.ecosystem(), count = records.len()))]
    pub async fn execute<R>(
        &self,
        resolver: &R,
        records: &mut [PackageRecord],
    ) -> Result<ResolutionStats, ResolveError>
    where
        R: RegistryResolver + ?Sized,
    {
        let expected = resolver.ecosystem();
        if let Some(foreign) = records.iter().find(|r| r.ecosystem() != expected) {
            return Err(ResolveError::EcosystemMismatch {
                package: foreign.display_id(),
                expected,
                found: foreign.ecosystem(),
            });
        }

        let mut stats = ResolutionStats {
            skipped: records.iter().filter(|r| r.existence().is_resolved()).count(),
            ..Default::default()
        };

        info!("Starting resolution for ecosystem: {}", expected);

        let semaphore = &self.semaphore;
        let pending = records
            .iter_mut()
            .filter(|r| !r.existence().is_resolved())
            .map(|record| async move {
                let _permit = semaphore.acquire().await.map_err(|e| {
                    ResolveError::Executor(format!("Semaphore error: {}", e))
                })?;
                debug!(package = %record.display_id(), "Resolving");
                resolver.resolve(record).await
            });
        stats.resolved = try_join_all(pending).await?.len();

        for record in records.iter() {
            match record.existence() {
                Existence::Exists => stats.existing += 1,
                Existence::Absent => stats.absent += 1,
                Existence::Unknown => {}
            }
        }

        info!(
            resolved = stats.resolved,
            existing = stats.existing,
            absent = stats.absent,
            "Finished resolution for ecosystem: {}",
            expected
        );
        Ok(stats)
    }
}
