//! Confusion-risk analysis over a resolved store.
//!
//! Analyzers may only write `risk_score` and the trust-signal block of a
//! record. Identity and existence are read-only by construction.

use crate::config::RunConfig;
use crate::model::{Existence, PackageRecord, PackageStore, TrustSignals};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

const DAY_MS: f64 = 86_400_000.0;
const FRESH_DAYS: f64 = 30.0;
const SETTLED_DAYS: f64 = 365.0;
const UNKNOWN_FACTOR: f64 = 0.5;

/// Depth of analysis requested for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisLevel {
    /// Existence comparison only
    Compare,
    /// Existence plus registry metadata heuristics
    Heuristics,
}

impl fmt::Display for AnalysisLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisLevel::Compare => f.write_str("compare"),
            AnalysisLevel::Heuristics => f.write_str("heuristics"),
        }
    }
}

/// Scores a fully resolved store.
pub trait ConfusionAnalyzer: Send + Sync {
    fn level(&self) -> AnalysisLevel;

    fn analyze(&self, store: &mut PackageStore);
}

/// Secondary data source for social and trust signals (stars, forks,
/// maintainers, ...).
pub trait TrustSignalSource: Send + Sync {
    fn lookup(&self, record: &PackageRecord) -> Option<TrustSignals>;
}

/// Builds the analyzer for a level.
pub fn analyzer_for(level: AnalysisLevel, config: &RunConfig) -> Box<dyn ConfusionAnalyzer> {
    match level {
        AnalysisLevel::Compare => Box::new(CompareAnalyzer),
        AnalysisLevel::Heuristics => Box::new(HeuristicAnalyzer::new(config.has_github_token())),
    }
}

// ============================================================================
// Compare
// ============================================================================

/// Flags every package the public registry does not know.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompareAnalyzer;

impl ConfusionAnalyzer for CompareAnalyzer {
    fn level(&self) -> AnalysisLevel {
        AnalysisLevel::Compare
    }

    fn analyze(&self, store: &mut PackageStore) {
        for record in store.records_mut() {
            record.risk_score = match record.existence() {
                Existence::Exists => Some(0.0),
                Existence::Absent => Some(1.0),
                Existence::Unknown => None,
            };
            match record.existence().as_bool() {
                Some(exists) => info!(package = %record.display_id(), exists, "Package compared"),
                None => warn!(package = %record.display_id(), "Package was never resolved"),
            }
        }
    }
}

// ============================================================================
// Heuristics
// ============================================================================

/// Scores existing packages by how fresh and how thin their public history is.
///
/// Absent packages score 1.0. For existing ones the score is the mean of a
/// recency factor (1.0 when the latest release is at most 30 days old,
/// falling linearly to 0.0 at a year) and a sparseness factor
/// (`1 / version_count`). Missing metadata counts as 0.5.
pub struct HeuristicAnalyzer {
    token_available: bool,
    signal_source: Option<Box<dyn TrustSignalSource>>,
    now_millis: Option<i64>,
}

impl HeuristicAnalyzer {
    pub fn new(token_available: bool) -> Self {
        Self {
            token_available,
            signal_source: None,
            now_millis: None,
        }
    }

    /// Attaches the trust-signal source. It is only consulted when a token
    /// is available.
    pub fn with_signal_source(mut self, source: Box<dyn TrustSignalSource>) -> Self {
        self.signal_source = Some(source);
        self
    }

    /// Fixes the reference time instead of the wall clock.
    pub fn with_reference_time(mut self, epoch_millis: i64) -> Self {
        self.now_millis = Some(epoch_millis);
        self
    }

    fn score(&self, record: &PackageRecord, now: i64) -> Option<f64> {
        match record.existence() {
            Existence::Unknown => None,
            Existence::Absent => Some(1.0),
            Existence::Exists => {
                let recency = record
                    .published_timestamp()
                    .map_or(UNKNOWN_FACTOR, |ts| recency_factor(now, ts));
                let sparseness = record
                    .version_count()
                    .map_or(UNKNOWN_FACTOR, |count| 1.0 / count.max(1) as f64);
                Some((recency + sparseness) / 2.0)
            }
        }
    }
}

impl ConfusionAnalyzer for HeuristicAnalyzer {
    fn level(&self) -> AnalysisLevel {
        AnalysisLevel::Heuristics
    }

    fn analyze(&self, store: &mut PackageStore) {
        let now = self
            .now_millis
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

        let source = if self.token_available {
            self.signal_source.as_ref()
        } else {
            warn!("No GitHub token configured, trust-signal enrichment unavailable");
            None
        };

        for record in store.records_mut() {
            record.risk_score = self.score(record, now);
            let signals = match source {
                Some(source) => source.lookup(record),
                None => None,
            };
            if let Some(signals) = signals {
                record.signals = signals;
            }
            info!(
                package = %record.display_id(),
                exists = ?record.existence().as_bool(),
                score = ?record.risk_score,
                "Package scored"
            );
        }
    }
}

fn recency_factor(now: i64, published: i64) -> f64 {
    let age_days = (now - published) as f64 / DAY_MS;
    if age_days <= FRESH_DAYS {
        1.0
    } else if age_days >= SETTLED_DAYS {
        0.0
    } else {
        1.0 - (age_days - FRESH_DAYS) / (SETTLED_DAYS - FRESH_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Ecosystem;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    const NOW: i64 = 1_700_000_000_000;

    fn store() -> PackageStore {
        let mut store = PackageStore::new();

        let mut old = PackageRecord::new("requests", Ecosystem::Pypi, None).unwrap();
        old.mark_exists().unwrap();
        old.set_version_count(100);
        old.set_published_timestamp(NOW - 400 * DAY_MS as i64);
        store.push(old);

        let mut fresh = PackageRecord::new("freshly-squatted", Ecosystem::Pypi, None).unwrap();
        fresh.mark_exists().unwrap();
        fresh.set_version_count(1);
        fresh.set_published_timestamp(NOW - 2 * DAY_MS as i64);
        store.push(fresh);

        let mut absent = PackageRecord::new("internal-only", Ecosystem::Pypi, None).unwrap();
        absent.mark_absent().unwrap();
        store.push(absent);

        store.push(PackageRecord::new("never-resolved", Ecosystem::Pypi, None).unwrap());
        store
    }

    fn scores(store: &PackageStore) -> Vec<Option<f64>> {
        store.iter().map(|r| r.risk_score).collect()
    }

    #[test]
    fn test_compare_scores_existence() {
        let mut store = store();
        CompareAnalyzer.analyze(&mut store);
        assert_eq!(scores(&store), vec![Some(0.0), Some(0.0), Some(1.0), None]);
    }

    #[test]
    fn test_heuristics_score_fresh_thin_packages_higher() {
        let mut store = store();
        HeuristicAnalyzer::new(false)
            .with_reference_time(NOW)
            .analyze(&mut store);

        assert_eq!(scores(&store), vec![Some(0.005), Some(1.0), Some(1.0), None]);
    }

    #[test]
    fn test_heuristics_missing_metadata_is_neutral() {
        let mut record = PackageRecord::new("bare", Ecosystem::Npm, None).unwrap();
        record.mark_exists().unwrap();

        let analyzer = HeuristicAnalyzer::new(false);
        assert_eq!(analyzer.score(&record, NOW), Some(0.5));
    }

    #[test]
    fn test_recency_decays_linearly() {
        let mid = NOW - ((FRESH_DAYS + SETTLED_DAYS) / 2.0 * DAY_MS) as i64;
        assert!((recency_factor(NOW, mid) - 0.5).abs() < 1e-9);
        assert_eq!(recency_factor(NOW, NOW + 1_000), 1.0);
    }

    struct StaticSource;

    impl TrustSignalSource for StaticSource {
        fn lookup(&self, _record: &PackageRecord) -> Option<TrustSignals> {
            Some(TrustSignals {
                star_count: Some(42),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_signals_need_a_token() {
        let mut store = store();
        HeuristicAnalyzer::new(false)
            .with_signal_source(Box::new(StaticSource))
            .with_reference_time(NOW)
            .analyze(&mut store);
        assert!(store.iter().all(|r| r.signals.star_count.is_none()));

        let mut store = self::store();
        HeuristicAnalyzer::new(true)
            .with_signal_source(Box::new(StaticSource))
            .with_reference_time(NOW)
            .analyze(&mut store);
        assert!(store.iter().all(|r| r.signals.star_count == Some(42)));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn analyze_with_logs(analyzer: &dyn ConfusionAnalyzer) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let mut store = store();
        tracing::subscriber::with_default(subscriber, || analyzer.analyze(&mut store));

        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_missing_token_is_reported_without_signal_source() {
        let analyzer = analyzer_for(AnalysisLevel::Heuristics, &RunConfig::default());
        let logs = analyze_with_logs(analyzer.as_ref());
        assert!(logs.contains("No GitHub token configured"), "{logs}");

        let config = RunConfig::default().with_github_token(Some("ghp_test".to_string()));
        let analyzer = analyzer_for(AnalysisLevel::Heuristics, &config);
        let logs = analyze_with_logs(analyzer.as_ref());
        assert!(!logs.contains("No GitHub token configured"), "{logs}");
    }

    #[test]
    fn test_analysis_keeps_identity_and_existence() {
        let mut store = store();
        let before: Vec<_> = store
            .iter()
            .map(|r| (r.name().to_string(), r.ecosystem(), r.existence()))
            .collect();

        HeuristicAnalyzer::new(false).analyze(&mut store);

        let after: Vec<_> = store
            .iter()
            .map(|r| (r.name().to_string(), r.ecosystem(), r.existence()))
            .collect();
        assert_eq!(before, after);
    }
}
