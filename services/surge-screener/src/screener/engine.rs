//! Screener engine module.
//!
//! Runs one scan end to end: snapshot filter, growth analysis, reporting.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::data::{HistorySource, Quote, SnapshotSource};

use super::config::ScreenerConfig;
use super::growth::GrowthAnalyzer;
use super::report::{ResultReporter, ScanReport};
use super::snapshot_filter::{average_turnover, SnapshotFilter};

// ============================================================================
// Scan Outcome
// ============================================================================

/// Result of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Scan ID (timestamp-based)
    pub id: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub completed_at: DateTime<Utc>,
    /// Duration in seconds
    pub duration_secs: f64,
    /// Snapshot threshold used
    pub min_turnover: f64,
    /// Mean snapshot turnover of the candidates
    pub average_candidate_turnover: Option<f64>,
    /// Shaped results
    pub report: ScanReport,
}

impl ScanOutcome {
    /// Summary string for logging.
    pub fn summary(&self) -> String {
        format!(
            "Scanned {} candidates in {:.1}s: {} instruments above the loosest tier",
            self.report.candidate_count,
            self.duration_secs,
            self.report.merged.len()
        )
    }
}

// ============================================================================
// Screener Engine
// ============================================================================

/// The turnover-surge screener.
///
/// Orchestrates one scan:
/// 1. Filter the market snapshot by turnover threshold
/// 2. Compare the two most recent sessions of each candidate
/// 3. Merge and rank the growth tiers
pub struct ScreenerEngine {
    config: ScreenerConfig,
    filter: SnapshotFilter,
    history: Arc<dyn HistorySource>,
    as_of: Option<NaiveDate>,
}

impl ScreenerEngine {
    pub fn new(
        config: ScreenerConfig,
        snapshot: Arc<dyn SnapshotSource>,
        history: Arc<dyn HistorySource>,
    ) -> Self {
        Self {
            config,
            filter: SnapshotFilter::new(snapshot),
            history,
            as_of: None,
        }
    }

    /// Pin the reference date used for session selection.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Run a full scan.
    ///
    /// Never fails: an unavailable snapshot yields an empty report and
    /// per-instrument failures are skipped.
    pub async fn run_scan(&self) -> ScanOutcome {
        let started_at = Utc::now();
        let id = format!("scan_{}", started_at.format("%Y%m%d_%H%M%S"));

        info!(scan_id = %id, min_turnover = self.config.min_turnover, "Starting turnover scan");

        // Phase 1: Snapshot filter
        let candidates = self.filter.fetch_candidates(self.config.min_turnover).await;
        info!(candidates = candidates.len(), "Phase 1 (Snapshot filter) complete");

        // Phase 2: Growth analysis
        let mut analyzer = GrowthAnalyzer::new(self.history.clone(), &self.config);
        if let Some(as_of) = self.as_of {
            analyzer = analyzer.with_as_of(as_of);
        }
        let tiers = analyzer.analyze(&candidates).await;
        info!(
            analyzed = tiers.stats.analyzed,
            skipped = tiers.stats.insufficient_history + tiers.stats.zero_previous,
            failed = tiers.stats.failed,
            "Phase 2 (Growth analysis) complete"
        );

        // Phase 3: Report
        let report = ResultReporter::build_report(&tiers, candidates.len());

        let completed_at = Utc::now();
        let duration_secs = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let outcome = ScanOutcome {
            id,
            started_at,
            completed_at,
            duration_secs,
            min_turnover: self.config.min_turnover,
            average_candidate_turnover: average_turnover(&candidates),
            report,
        };

        info!(
            scan_id = %outcome.id,
            merged = outcome.report.merged.len(),
            duration = format!("{:.1}s", duration_secs),
            "Turnover scan complete"
        );

        outcome
    }

    /// Top instruments by snapshot turnover.
    pub async fn top_turnover(&self, limit: usize) -> Vec<Quote> {
        self.filter.top_by_turnover(limit).await
    }

    /// Check that the history source answers.
    pub async fn health_check(&self) -> Result<(), crate::data::ProviderError> {
        self.history.health_check().await
    }
}
