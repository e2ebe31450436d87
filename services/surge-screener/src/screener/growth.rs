//! Session-over-session turnover growth.
//!
//! For each candidate the two most recent daily sessions are compared by
//! turnover (volume × close). Results are ranked by growth ratio and split
//! into three overlapping tiers by configured cutoffs.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::config::{ScreenerConfig, SessionSelection, TierConfig};
use super::snapshot_filter::Candidate;
use crate::data::{ComparisonWindow, HistorySource, ProviderError, SessionRecord};

// ============================================================================
// Result Types
// ============================================================================

/// Growth of one instrument between its two most recent sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub name: String,
    /// Turnover of the most recent session
    pub recent_turnover: f64,
    /// Turnover of the session before it, always > 0
    pub previous_turnover: f64,
    /// `recent_turnover / previous_turnover`; 1.0 means unchanged
    pub growth_ratio: f64,
    pub recent_date: NaiveDate,
    pub previous_date: NaiveDate,
}

impl AnalysisResult {
    /// Growth as a percentage (ratio 1.5 -> 50.0).
    pub fn growth_pct(&self) -> f64 {
        (self.growth_ratio - 1.0) * 100.0
    }
}

/// Growth tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthTier {
    Grow50,
    Grow100,
    Grow200,
}

impl GrowthTier {
    /// All tiers, loosest first.
    pub const ALL: [GrowthTier; 3] = [Self::Grow50, Self::Grow100, Self::Grow200];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Grow50 => "50%",
            Self::Grow100 => "100%",
            Self::Grow200 => "200%",
        }
    }

    /// Tag used in exported file names.
    pub fn file_tag(&self) -> &'static str {
        match self {
            Self::Grow50 => "50pct",
            Self::Grow100 => "100pct",
            Self::Grow200 => "200pct",
        }
    }

    pub fn cutoff(&self, tiers: &TierConfig) -> f64 {
        match self {
            Self::Grow50 => tiers.grow50,
            Self::Grow100 => tiers.grow100,
            Self::Grow200 => tiers.grow200,
        }
    }
}

impl std::fmt::Display for GrowthTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "grow{}", self.label().trim_end_matches('%'))
    }
}

/// Counters for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Candidates submitted
    pub candidates: usize,
    /// Candidates that produced a result
    pub analyzed: usize,
    /// Skipped for fewer than two usable sessions
    pub insufficient_history: usize,
    /// Skipped because the previous session turnover was not positive
    pub zero_previous: usize,
    /// History fetch failures
    pub failed: usize,
}

/// Results split into the three growth tiers.
///
/// Each tier is sorted by growth ratio descending. Tiers overlap:
/// `grow200 ⊆ grow100 ⊆ grow50` whenever cutoffs ascend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TieredResults {
    pub grow50: Vec<AnalysisResult>,
    pub grow100: Vec<AnalysisResult>,
    pub grow200: Vec<AnalysisResult>,
    pub stats: AnalysisStats,
    /// Cutoffs the tiers were built with
    pub cutoffs: TierConfig,
    /// Reference weekday window for this run
    pub window: Option<ComparisonWindow>,
}

impl TieredResults {
    pub fn tier(&self, tier: GrowthTier) -> &[AnalysisResult] {
        match tier {
            GrowthTier::Grow50 => &self.grow50,
            GrowthTier::Grow100 => &self.grow100,
            GrowthTier::Grow200 => &self.grow200,
        }
    }

    /// True when no tier holds any result.
    pub fn is_empty(&self) -> bool {
        self.grow50.is_empty() && self.grow100.is_empty() && self.grow200.is_empty()
    }
}

// ============================================================================
// Pure Comparison
// ============================================================================

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Analyzed(AnalysisResult),
    InsufficientHistory,
    ZeroPrevious,
}

/// Compare the two most recent sessions in `history`.
///
/// Records dated after `latest_allowed` are ignored when it is set.
pub fn compare_sessions(
    candidate: &Candidate,
    mut history: Vec<SessionRecord>,
    latest_allowed: Option<NaiveDate>,
) -> CandidateOutcome {
    if let Some(limit) = latest_allowed {
        history.retain(|r| r.date <= limit);
    }
    if history.len() < 2 {
        return CandidateOutcome::InsufficientHistory;
    }

    history.sort_by(|a, b| b.date.cmp(&a.date));
    let recent = history[0];
    let previous = history[1];

    let previous_turnover = previous.session_turnover();
    if !(previous_turnover.is_finite() && previous_turnover > 0.0) {
        return CandidateOutcome::ZeroPrevious;
    }

    let recent_turnover = recent.session_turnover();
    let growth_ratio = recent_turnover / previous_turnover;
    if !growth_ratio.is_finite() {
        return CandidateOutcome::ZeroPrevious;
    }

    CandidateOutcome::Analyzed(AnalysisResult {
        symbol: candidate.symbol.clone(),
        name: candidate.name.clone(),
        recent_turnover,
        previous_turnover,
        growth_ratio,
        recent_date: recent.date,
        previous_date: previous.date,
    })
}

/// Sort results by ratio descending and split them by cutoff.
pub fn bucket_results(
    mut results: Vec<AnalysisResult>,
    cutoffs: &TierConfig,
) -> [Vec<AnalysisResult>; 3] {
    results.sort_by(|a, b| {
        b.growth_ratio
            .partial_cmp(&a.growth_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    GrowthTier::ALL.map(|tier| {
        let cutoff = tier.cutoff(cutoffs);
        results
            .iter()
            .filter(|r| r.growth_ratio > cutoff)
            .cloned()
            .collect()
    })
}

// ============================================================================
// Growth Analyzer
// ============================================================================

/// Fetches history for each candidate and builds [`TieredResults`].
pub struct GrowthAnalyzer {
    source: Arc<dyn HistorySource>,
    tiers: TierConfig,
    pacing: Duration,
    history_limit: usize,
    selection: SessionSelection,
    window_days: usize,
    as_of: Option<NaiveDate>,
}

impl GrowthAnalyzer {
    pub fn new(source: Arc<dyn HistorySource>, config: &ScreenerConfig) -> Self {
        Self {
            source,
            tiers: config.tiers,
            pacing: Duration::from_millis(config.pacing_ms),
            history_limit: config.history_limit,
            selection: config.session.selection,
            window_days: config.session.window_days,
            as_of: None,
        }
    }

    /// Pin the reference date instead of using the local clock.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Analyze candidates sequentially, pacing between history requests.
    ///
    /// Per-candidate failures are logged and counted; they never abort the run.
    pub async fn analyze(&self, candidates: &[Candidate]) -> TieredResults {
        let as_of = self.as_of.unwrap_or_else(|| Local::now().date_naive());
        let window = ComparisonWindow::from_weekdays(as_of, self.window_days);

        match &window {
            Some(w) => info!(
                as_of = %as_of,
                recent = %w.recent,
                previous = %w.previous,
                selection = %self.selection,
                "Reference sessions"
            ),
            None => warn!(window_days = self.window_days, "Weekday window too short"),
        }

        let latest_allowed = match self.selection {
            SessionSelection::Latest => None,
            SessionSelection::Completed => window.as_ref().map(|w| w.recent),
        };

        let total = candidates.len();
        let mut outcomes = Vec::with_capacity(total);

        for (idx, candidate) in candidates.iter().enumerate() {
            if idx > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            let outcome = self
                .source
                .get_daily_history(&candidate.symbol, Some(self.history_limit))
                .await
                .map(|history| compare_sessions(candidate, history, latest_allowed));

            match &outcome {
                Ok(CandidateOutcome::Analyzed(_)) => {}
                Ok(skipped) => debug!(symbol = %candidate.symbol, outcome = ?skipped, "Candidate skipped"),
                Err(e) => warn!(
                    symbol = %candidate.symbol,
                    error = %e,
                    recoverable = e.is_recoverable(),
                    "History fetch failed"
                ),
            }
            outcomes.push(outcome);

            if (idx + 1) % 10 == 0 {
                info!(processed = idx + 1, total, "Growth analysis progress");
            }
        }

        let initial = (Vec::new(), AnalysisStats {
            candidates: total,
            ..Default::default()
        });
        let (results, stats) = outcomes.into_iter().fold(initial, accumulate);

        let [grow50, grow100, grow200] = bucket_results(results, &self.tiers);

        info!(
            analyzed = stats.analyzed,
            failed = stats.failed,
            grow50 = grow50.len(),
            grow100 = grow100.len(),
            grow200 = grow200.len(),
            "Growth analysis complete"
        );

        TieredResults {
            grow50,
            grow100,
            grow200,
            stats,
            cutoffs: self.tiers,
            window,
        }
    }
}

fn accumulate(
    (mut results, mut stats): (Vec<AnalysisResult>, AnalysisStats),
    outcome: Result<CandidateOutcome, ProviderError>,
) -> (Vec<AnalysisResult>, AnalysisStats) {
    match outcome {
        Ok(CandidateOutcome::Analyzed(result)) => {
            stats.analyzed += 1;
            results.push(result);
        }
        Ok(CandidateOutcome::InsufficientHistory) => stats.insufficient_history += 1,
        Ok(CandidateOutcome::ZeroPrevious) => stats.zero_previous += 1,
        Err(_) => stats.failed += 1,
    }
    (results, stats)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn candidate(symbol: &str) -> Candidate {
        Candidate {
            symbol: symbol.to_string(),
            name: format!("Name {}", symbol),
            turnover: 5e7,
        }
    }

    fn result(symbol: &str, ratio: f64) -> AnalysisResult {
        AnalysisResult {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            recent_turnover: ratio * 100.0,
            previous_turnover: 100.0,
            growth_ratio: ratio,
            recent_date: date(2024, 6, 4),
            previous_date: date(2024, 6, 3),
        }
    }

    #[test]
    fn test_compare_sessions_growth() {
        // Unordered input: newest is 2024-06-04 with 3000 × 10
        let history = vec![
            SessionRecord::new(date(2024, 6, 3), 1000.0, 10.0),
            SessionRecord::new(date(2024, 6, 4), 3000.0, 10.0),
            SessionRecord::new(date(2024, 5, 31), 9000.0, 10.0),
        ];

        match compare_sessions(&candidate("00700"), history, None) {
            CandidateOutcome::Analyzed(r) => {
                assert_eq!(r.recent_turnover, 30_000.0);
                assert_eq!(r.previous_turnover, 10_000.0);
                assert_eq!(r.growth_ratio, 3.0);
                assert_eq!(r.recent_date, date(2024, 6, 4));
                assert_eq!(r.previous_date, date(2024, 6, 3));
                assert_eq!(r.growth_pct(), 200.0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_compare_sessions_short_history() {
        let one = vec![SessionRecord::new(date(2024, 6, 4), 1.0, 1.0)];
        assert_eq!(
            compare_sessions(&candidate("a"), one, None),
            CandidateOutcome::InsufficientHistory
        );
        assert_eq!(
            compare_sessions(&candidate("a"), Vec::new(), None),
            CandidateOutcome::InsufficientHistory
        );
    }

    #[test]
    fn test_compare_sessions_zero_previous() {
        let history = vec![
            SessionRecord::new(date(2024, 6, 4), 5000.0, 10.0),
            SessionRecord::new(date(2024, 6, 3), 0.0, 10.0),
        ];
        assert_eq!(
            compare_sessions(&candidate("a"), history, None),
            CandidateOutcome::ZeroPrevious
        );
    }

    #[test]
    fn test_compare_sessions_zero_recent_is_emitted() {
        let history = vec![
            SessionRecord::new(date(2024, 6, 4), 0.0, 10.0),
            SessionRecord::new(date(2024, 6, 3), 100.0, 10.0),
        ];
        match compare_sessions(&candidate("a"), history, None) {
            CandidateOutcome::Analyzed(r) => assert_eq!(r.growth_ratio, 0.0),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_compare_sessions_drops_records_after_limit() {
        let history = vec![
            SessionRecord::new(date(2024, 6, 5), 9000.0, 10.0),
            SessionRecord::new(date(2024, 6, 4), 2000.0, 10.0),
            SessionRecord::new(date(2024, 6, 3), 1000.0, 10.0),
        ];
        match compare_sessions(&candidate("a"), history, Some(date(2024, 6, 4))) {
            CandidateOutcome::Analyzed(r) => {
                assert_eq!(r.recent_date, date(2024, 6, 4));
                assert_eq!(r.growth_ratio, 2.0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_bucket_results_strict_cutoffs() {
        let results = vec![
            result("a", 1.5),
            result("b", 3.0),
            result("c", 2.5),
            result("d", 3.01),
            result("e", 0.8),
        ];
        let [g50, g100, g200] = bucket_results(results, &TierConfig::default());

        let symbols = |v: &[AnalysisResult]| v.iter().map(|r| r.symbol.clone()).collect::<Vec<_>>();
        assert_eq!(symbols(&g50), vec!["d", "b", "c"]);
        assert_eq!(symbols(&g100), vec!["d", "b", "c"]);
        assert_eq!(symbols(&g200), vec!["d"]);
    }

    #[test]
    fn test_tier_metadata() {
        let tiers = TierConfig::default();
        assert_eq!(GrowthTier::Grow50.cutoff(&tiers), 1.5);
        assert_eq!(GrowthTier::Grow200.file_tag(), "200pct");
        assert_eq!(GrowthTier::Grow100.label(), "100%");
        assert_eq!(GrowthTier::Grow100.to_string(), "grow100");
    }

    #[test]
    fn test_accumulate_counts_outcomes() {
        let outcomes = vec![
            Ok(CandidateOutcome::Analyzed(result("a", 2.0))),
            Ok(CandidateOutcome::InsufficientHistory),
            Ok(CandidateOutcome::ZeroPrevious),
            Err(ProviderError::Network("timeout".into())),
        ];
        let (results, stats) = outcomes
            .into_iter()
            .fold((Vec::new(), AnalysisStats::default()), accumulate);

        assert_eq!(results.len(), 1);
        assert_eq!(stats.analyzed, 1);
        assert_eq!(stats.insufficient_history, 1);
        assert_eq!(stats.zero_previous, 1);
        assert_eq!(stats.failed, 1);
    }
}
