//! Result shaping and report rendering.
//!
//! [`ResultReporter`] merges the growth tiers into one deduplicated ranking
//! with per-tier counts. [`ScreenerReport`] renders a finished scan for the
//! console in one of three formats:
//! - Text (compact, console)
//! - Markdown (for documentation)
//! - JSON (for programmatic use)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::engine::ScanOutcome;
use super::growth::{AnalysisResult, GrowthTier, TieredResults};
use crate::data::Quote;

// ============================================================================
// Scan Report
// ============================================================================

/// Count of one tier relative to the candidate set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSummary {
    pub tier: GrowthTier,
    pub cutoff: f64,
    pub count: usize,
    /// `count / candidate_count × 100`, 0.0 without candidates
    pub percent_of_candidates: f64,
}

/// Shaped results of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Candidates that entered growth analysis
    pub candidate_count: usize,
    /// Union of all tiers, deduplicated, ratio descending
    pub merged: Vec<AnalysisResult>,
    /// The tiers as produced by the analyzer
    pub tiers: TieredResults,
    /// One entry per tier, loosest first
    pub summary: Vec<TierSummary>,
}

impl ScanReport {
    /// The first `n` merged results.
    pub fn top(&self, n: usize) -> &[AnalysisResult] {
        &self.merged[..n.min(self.merged.len())]
    }

    /// True when no tier holds any result.
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    pub fn tier_summary(&self, tier: GrowthTier) -> Option<&TierSummary> {
        self.summary.iter().find(|s| s.tier == tier)
    }
}

/// Builds a [`ScanReport`] from tiered results. Holds no state.
pub struct ResultReporter;

impl ResultReporter {
    /// Merge, deduplicate and rank the tiers; count each tier.
    pub fn build_report(tiers: &TieredResults, candidate_count: usize) -> ScanReport {
        let mut seen = HashSet::new();
        let mut merged: Vec<AnalysisResult> = GrowthTier::ALL
            .iter()
            .flat_map(|tier| tiers.tier(*tier).iter())
            .filter(|r| seen.insert(dedup_key(r)))
            .cloned()
            .collect();

        merged.sort_by(|a, b| {
            b.growth_ratio
                .partial_cmp(&a.growth_ratio)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let summary = GrowthTier::ALL
            .iter()
            .map(|tier| {
                let count = tiers.tier(*tier).len();
                TierSummary {
                    tier: *tier,
                    cutoff: tier.cutoff(&tiers.cutoffs),
                    count,
                    percent_of_candidates: percent(count, candidate_count),
                }
            })
            .collect();

        ScanReport {
            candidate_count,
            merged,
            tiers: tiers.clone(),
            summary,
        }
    }
}

type DedupKey = (String, String, u64, u64, u64, chrono::NaiveDate, chrono::NaiveDate);

/// Every field participates; floats compare bitwise.
fn dedup_key(r: &AnalysisResult) -> DedupKey {
    (
        r.symbol.clone(),
        r.name.clone(),
        r.recent_turnover.to_bits(),
        r.previous_turnover.to_bits(),
        r.growth_ratio.to_bits(),
        r.recent_date,
        r.previous_date,
    )
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Compact console text
    Text,
    /// Markdown format (human-readable)
    Markdown,
    /// JSON format (machine-readable)
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

/// Compact amount: `1.23亿` (≥ 1e8), `4.56万` (≥ 1e4), else two decimals.
pub fn format_amount(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e8 {
        format!("{:.2}亿", value / 1e8)
    } else if abs >= 1e4 {
        format!("{:.2}万", value / 1e4)
    } else {
        format!("{:.2}", value)
    }
}

// ============================================================================
// Screener Report
// ============================================================================

/// Console renderer for a finished scan.
pub struct ScreenerReport {
    outcome: ScanOutcome,
    preview_rows: usize,
}

impl ScreenerReport {
    /// Create a report showing `preview_rows` rows per tier.
    pub fn new(outcome: ScanOutcome, preview_rows: usize) -> Self {
        Self {
            outcome,
            preview_rows,
        }
    }

    pub fn generate(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Text => self.to_text(),
            ReportFormat::Markdown => self.to_markdown(),
            ReportFormat::Json => self.to_json(),
        }
    }

    /// Generate console text.
    pub fn to_text(&self) -> String {
        let outcome = &self.outcome;
        let report = &outcome.report;
        let mut out = String::new();

        out.push_str(&format!(
            "港股成交额增长筛选  {}  (耗时 {:.1}秒)\n",
            outcome.id, outcome.duration_secs
        ));
        out.push_str(&format!(
            "成交额门槛: {}  候选: {} 只",
            format_amount(outcome.min_turnover),
            report.candidate_count
        ));
        if let Some(avg) = outcome.average_candidate_turnover {
            out.push_str(&format!("  平均成交额: {}", format_amount(avg)));
        }
        out.push('\n');
        if let Some(window) = &report.tiers.window {
            out.push_str(&format!(
                "对比交易日: {} vs {}\n",
                window.recent, window.previous
            ));
        }

        if report.is_empty() {
            out.push_str("\nno qualifying instruments\n");
            return out;
        }

        for summary in &report.summary {
            out.push_str(&format!(
                "\n增长超过{}: {} 只 ({:.1}%)\n",
                summary.tier.label(),
                summary.count,
                summary.percent_of_candidates
            ));
            for r in report.tiers.tier(summary.tier).iter().take(self.preview_rows) {
                out.push_str(&format!(
                    "  {} {:<12} {:>10} -> {:>10}  {:+.1}%\n",
                    r.symbol,
                    r.name,
                    format_amount(r.previous_turnover),
                    format_amount(r.recent_turnover),
                    r.growth_pct()
                ));
            }
        }

        out
    }

    /// Generate markdown report.
    pub fn to_markdown(&self) -> String {
        let outcome = &self.outcome;
        let report = &outcome.report;
        let mut md = String::new();

        md.push_str(&format!(
            "# 港股成交额增长筛选报告\n\n**扫描ID**: {}\n**时间**: {}\n**耗时**: {:.1}秒\n\n",
            outcome.id,
            outcome.completed_at.format("%Y-%m-%d %H:%M:%S"),
            outcome.duration_secs
        ));

        md.push_str("## 筛选摘要\n\n");
        md.push_str(&format!("- **成交额门槛**: {}\n", format_amount(outcome.min_turnover)));
        md.push_str(&format!("- **候选股票**: {} 只\n", report.candidate_count));
        if let Some(avg) = outcome.average_candidate_turnover {
            md.push_str(&format!("- **平均成交额**: {}\n", format_amount(avg)));
        }
        if let Some(window) = &report.tiers.window {
            md.push_str(&format!("- **对比交易日**: {} vs {}\n", window.recent, window.previous));
        }
        md.push('\n');

        md.push_str("| 档位 | 阈值 | 数量 | 占比 |\n");
        md.push_str("|------|------|------|------|\n");
        for s in &report.summary {
            md.push_str(&format!(
                "| {} | >{:.2}x | {} | {:.1}% |\n",
                s.tier.label(),
                s.cutoff,
                s.count,
                s.percent_of_candidates
            ));
        }
        md.push('\n');

        md.push_str("## 增长排名\n\n");
        if report.is_empty() {
            md.push_str("no qualifying instruments\n");
            return md;
        }

        md.push_str("| 代码 | 名称 | 前一日成交额 | 最近成交额 | 增长率 |\n");
        md.push_str("|------|------|--------------|------------|--------|\n");
        for r in report.top(15) {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {:+.1}% |\n",
                r.symbol,
                r.name,
                format_amount(r.previous_turnover),
                format_amount(r.recent_turnover),
                r.growth_pct()
            ));
        }

        md
    }

    /// Generate JSON report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.outcome).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn outcome(&self) -> &ScanOutcome {
        &self.outcome
    }
}

/// Render the turnover leaderboard used by `surge top`.
pub fn render_top_turnover(quotes: &[Quote]) -> String {
    if quotes.is_empty() {
        return "no qualifying instruments\n".to_string();
    }

    let mut out = String::from("成交额排名\n");
    for (idx, q) in quotes.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {} {:<12} {:>10}\n",
            idx + 1,
            q.symbol,
            q.name,
            q.turnover.map(format_amount).unwrap_or_else(|| "-".to_string())
        ));
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
