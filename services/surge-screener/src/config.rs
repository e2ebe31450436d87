//! Application configuration for the `surge` binary.
//!
//! Layering: `~/.surge/config.json`, then an optional explicit file, then
//! `SURGE_*` environment variables. Command line flags are applied by the
//! binary on top of the result.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use surge_common::config::load_layered;
use surge_common::ObservabilityConfig;

use crate::data::{
    CsvDataSource, EastmoneyHkAdapter, HistorySource, SnapshotSource, EASTMONEY_CLIST_URL,
    EASTMONEY_KLINE_URL,
};
use crate::screener::ScreenerConfig;

// ============================================================================
// Application Configuration
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Where market data comes from
    #[serde(default)]
    pub data_source: DataSourceConfig,

    /// Screening parameters
    #[serde(default)]
    pub screener: ScreenerConfig,
}

impl AppConfig {
    /// Load the layered configuration and apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let value = load_layered(explicit)?;
        let mut config: Self =
            serde_json::from_value(value).context("Invalid configuration structure")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply `SURGE_*` overrides from an arbitrary lookup.
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("SURGE_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("SURGE_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(min) = lookup("SURGE_MIN_TURNOVER") {
            if let Ok(v) = min.trim().parse() {
                self.screener.min_turnover = v;
            }
        }
        if let Some(pacing) = lookup("SURGE_PACING_MS") {
            if let Ok(v) = pacing.trim().parse() {
                self.screener.pacing_ms = v;
            }
        }
        if let Some(dir) = lookup("SURGE_OUTPUT_DIR") {
            self.screener.output.dir = dir;
        }
        if let Some(provider) = lookup("SURGE_PROVIDER") {
            if let Ok(kind) = provider.parse() {
                self.data_source.provider = kind;
            }
        }
    }

    /// Validate the assembled configuration.
    pub fn validate(&self) -> surge_common::Result<()> {
        self.screener
            .validate()
            .map_err(|e| e.with_context("screener"))?;
        if self.data_source.eastmoney.page_size == 0 {
            return Err(surge_common::Error::Config(
                "data_source.eastmoney.page_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Data Source Configuration
// ============================================================================

/// Supported providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Eastmoney,
    Csv,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eastmoney" => Ok(Self::Eastmoney),
            "csv" => Ok(Self::Csv),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// Provider selection and per-provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSourceConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default)]
    pub eastmoney: EastmoneyConfig,

    #[serde(default)]
    pub csv: CsvSourceConfig,
}

impl DataSourceConfig {
    /// Build the snapshot and history sources for the selected provider.
    pub fn build_sources(&self) -> (Arc<dyn SnapshotSource>, Arc<dyn HistorySource>) {
        match self.provider {
            ProviderKind::Eastmoney => {
                let adapter = Arc::new(EastmoneyHkAdapter::from_config(&self.eastmoney));
                let snapshot: Arc<dyn SnapshotSource> = adapter.clone();
                let history: Arc<dyn HistorySource> = adapter;
                (snapshot, history)
            }
            ProviderKind::Csv => {
                let source = Arc::new(CsvDataSource::from_config(&self.csv));
                let snapshot: Arc<dyn SnapshotSource> = source.clone();
                let history: Arc<dyn HistorySource> = source;
                (snapshot, history)
            }
        }
    }
}

/// Eastmoney endpoints and client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EastmoneyConfig {
    #[serde(default = "default_snapshot_url")]
    pub snapshot_url: String,

    #[serde(default = "default_kline_url")]
    pub kline_url: String,

    /// Rows per snapshot page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EastmoneyConfig {
    fn default() -> Self {
        Self {
            snapshot_url: default_snapshot_url(),
            kline_url: default_kline_url(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_snapshot_url() -> String {
    EASTMONEY_CLIST_URL.to_string()
}

fn default_kline_url() -> String {
    EASTMONEY_KLINE_URL.to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

/// Offline CSV source paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvSourceConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    #[serde(default = "default_history_dir")]
    pub history_dir: String,
}

impl Default for CsvSourceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            history_dir: default_history_dir(),
        }
    }
}

fn default_snapshot_path() -> String {
    "~/.surge/data/snapshot.csv".to_string()
}

fn default_history_dir() -> String {
    "~/.surge/data/history".to_string()
}

// ============================================================================
// Tests
// ============================================================================
