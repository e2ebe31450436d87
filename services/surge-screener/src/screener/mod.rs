//! Turnover-Surge Screener Module.
//!
//! Finds Hong Kong equities that trade heavily today and whose daily
//! turnover grew sharply between their two most recent sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   candidates   ┌──────────────┐   tiers   ┌──────────────┐
//! │  Snapshot    │───────────────▶│   Growth     │──────────▶│   Result     │
//! │  Filter      │                │   Analyzer   │           │   Reporter   │
//! └──────┬───────┘                └──────┬───────┘           └──────┬───────┘
//!        │ SnapshotSource                │ HistorySource            │
//!        ▼                               ▼                          ▼
//!   market snapshot               daily sessions          console / CSV export
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use surge_screener::screener::{ScreenerConfig, ScreenerEngine};
//!
//! let engine = ScreenerEngine::new(ScreenerConfig::default(), snapshot, history);
//! let outcome = engine.run_scan().await;
//! println!("{}", outcome.summary());
//! ```

pub mod config;
pub mod engine;
pub mod export;
pub mod growth;
pub mod report;
pub mod snapshot_filter;

pub use config::{OutputConfig, ScreenerConfig, SessionConfig, SessionSelection, TierConfig};
pub use engine::{ScanOutcome, ScreenerEngine};
pub use export::CsvExporter;
pub use growth::{
    AnalysisResult, AnalysisStats, CandidateOutcome, GrowthAnalyzer, GrowthTier, TieredResults,
};
pub use report::{
    format_amount, render_top_turnover, ReportFormat, ResultReporter, ScanReport, ScreenerReport,
    TierSummary,
};
pub use snapshot_filter::{Candidate, SnapshotFilter};
