//! Screener configuration module.
//!
//! Defines the thresholds, tier cutoffs, pacing and output settings for the
//! turnover-surge scan.

use serde::{Deserialize, Serialize};
use surge_common::{Error, Result};

use crate::data::calendar::MIN_WINDOW_DAYS;

// ============================================================================
// Main Screener Configuration
// ============================================================================

/// Configuration for the turnover-surge screener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Minimum snapshot turnover for a candidate (strictly greater than)
    #[serde(default = "default_min_turnover")]
    pub min_turnover: f64,

    /// Growth tier cutoffs
    #[serde(default)]
    pub tiers: TierConfig,

    /// Delay between consecutive history fetches, in milliseconds (0 disables)
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Number of most recent sessions requested per instrument
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Session selection
    #[serde(default)]
    pub session: SessionConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            min_turnover: default_min_turnover(),
            tiers: TierConfig::default(),
            pacing_ms: default_pacing_ms(),
            history_limit: default_history_limit(),
            session: SessionConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl ScreenerConfig {
    /// Check invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if !self.min_turnover.is_finite() || self.min_turnover <= 0.0 {
            return Err(Error::Config(format!(
                "min_turnover must be a positive number, got {}",
                self.min_turnover
            )));
        }

        self.tiers.validate()?;

        if self.history_limit < 2 {
            return Err(Error::Config(format!(
                "history_limit must be at least 2, got {}",
                self.history_limit
            )));
        }

        if self.session.window_days < MIN_WINDOW_DAYS {
            return Err(Error::Config(format!(
                "session.window_days must be at least {}, got {}",
                MIN_WINDOW_DAYS, self.session.window_days
            )));
        }

        Ok(())
    }
}

fn default_min_turnover() -> f64 {
    30_000_000.0 // 3000万 HKD
}

fn default_pacing_ms() -> u64 {
    300
}

fn default_history_limit() -> usize {
    10
}

// ============================================================================
// Tier Configuration
// ============================================================================

/// Growth ratio cutoffs; a result joins a tier when its ratio is strictly above the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// +50% growth
    #[serde(default = "default_grow50")]
    pub grow50: f64,

    /// +100% growth
    #[serde(default = "default_grow100")]
    pub grow100: f64,

    /// +200% growth
    #[serde(default = "default_grow200")]
    pub grow200: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            grow50: default_grow50(),
            grow100: default_grow100(),
            grow200: default_grow200(),
        }
    }
}

impl TierConfig {
    /// Cutoffs must be positive and strictly ascending, so each tier contains the next.
    pub fn validate(&self) -> Result<()> {
        if !(self.grow50.is_finite() && self.grow50 > 0.0) {
            return Err(Error::Config(format!(
                "tiers.grow50 must be positive, got {}",
                self.grow50
            )));
        }
        if !(self.grow100 > self.grow50 && self.grow200 > self.grow100 && self.grow200.is_finite()) {
            return Err(Error::Config(format!(
                "tier cutoffs must be ascending (grow50 < grow100 < grow200), got {} / {} / {}",
                self.grow50, self.grow100, self.grow200
            )));
        }
        Ok(())
    }
}

fn default_grow50() -> f64 {
    1.5
}

fn default_grow100() -> f64 {
    2.0
}

fn default_grow200() -> f64 {
    3.0
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Which two sessions are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionSelection {
    /// The two newest records the source returns
    #[default]
    Latest,
    /// The two newest records on or before the last completed weekday
    Completed,
}

impl std::str::FromStr for SessionSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Unknown session selection: {}", s)),
        }
    }
}

impl std::fmt::Display for SessionSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Session selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub selection: SessionSelection,

    /// Weekday window used to pick the reference dates
    #[serde(default = "default_window_days")]
    pub window_days: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            selection: SessionSelection::default(),
            window_days: default_window_days(),
        }
    }
}

fn default_window_days() -> usize {
    5
}

// ============================================================================
// Output Configuration
// ============================================================================

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Whether to write one CSV per non-empty tier
    #[serde(default = "default_true")]
    pub save_csv: bool,

    /// Whether to also write the merged table
    #[serde(default)]
    pub save_merged: bool,

    /// Directory for CSV files
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Rows shown per tier in console output
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Console format (text, markdown, json)
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_csv: true,
            save_merged: false,
            dir: default_output_dir(),
            preview_rows: default_preview_rows(),
            format: default_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> String {
    "results".to_string()
}

fn default_preview_rows() -> usize {
    5
}

fn default_format() -> String {
    "text".to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScreenerConfig::default();
        assert!((config.min_turnover - 30_000_000.0).abs() < 0.001);
        assert_eq!(config.pacing_ms, 300);
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.session.selection, SessionSelection::Latest);
        assert_eq!(config.session.window_days, 5);
        assert!(config.output.save_csv);
        assert!(!config.output.save_merged);
        assert_eq!(config.output.preview_rows, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_tiers() {
        let tiers = TierConfig::default();
        assert_eq!(tiers.grow50, 1.5);
        assert_eq!(tiers.grow100, 2.0);
        assert_eq!(tiers.grow200, 3.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ScreenerConfig =
            serde_json::from_str(r#"{"min_turnover": 5e7, "session": {"selection": "completed"}}"#)
                .unwrap();
        assert_eq!(config.min_turnover, 50_000_000.0);
        assert_eq!(config.session.selection, SessionSelection::Completed);
        assert_eq!(config.session.window_days, 5);
        assert_eq!(config.tiers, TierConfig::default());
    }

    #[test]
    fn test_validate_rejects_non_ascending_cutoffs() {
        let mut config = ScreenerConfig::default();
        config.tiers.grow100 = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("ascending"));

        config.tiers = TierConfig {
            grow50: 1.5,
            grow100: 3.0,
            grow200: 2.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_window() {
        let mut config = ScreenerConfig::default();
        config.session.window_days = 2;
        assert!(config.validate().is_err());
        config.session.window_days = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_threshold() {
        let mut config = ScreenerConfig::default();
        config.min_turnover = -1.0;
        assert!(config.validate().is_err());
        config.min_turnover = 0.0;
        assert!(config.validate().is_err());
        config.min_turnover = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_selection_from_str() {
        assert_eq!("latest".parse::<SessionSelection>(), Ok(SessionSelection::Latest));
        assert_eq!("Completed".parse::<SessionSelection>(), Ok(SessionSelection::Completed));
        assert!("weekly".parse::<SessionSelection>().is_err());
        assert_eq!(SessionSelection::Completed.to_string(), "completed");
    }
}
