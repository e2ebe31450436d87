//! Offline data source backed by CSV files.
//!
//! Layout:
//! - a snapshot file with arbitrary column labels (resolved by the screener)
//! - one history file per symbol, `<history_dir>/<symbol>.csv`, with
//!   `date`, `volume` and `close` columns; other columns are ignored

use async_trait::async_trait;
use chrono::NaiveDate;
use csv::StringRecord;
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::provider::{HistorySource, ProviderError, SnapshotSource};
use super::{RawSnapshot, SessionRecord};
use crate::config::CsvSourceConfig;

const DATE_COLUMNS: &[&str] = &["date", "日期"];
const VOLUME_COLUMNS: &[&str] = &["volume", "成交量"];
const CLOSE_COLUMNS: &[&str] = &["close", "收盘"];

/// CSV-backed snapshot and history source.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    snapshot_path: PathBuf,
    history_dir: PathBuf,
}

impl CsvDataSource {
    /// Create a source from explicit paths
    pub fn new(snapshot_path: impl Into<PathBuf>, history_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            history_dir: history_dir.into(),
        }
    }

    /// Create from config, expanding `~` and environment variables
    pub fn from_config(config: &CsvSourceConfig) -> Self {
        Self::new(
            surge_common::config::expand_path(&config.snapshot_path),
            surge_common::config::expand_path(&config.history_dir),
        )
    }

    fn history_path(&self, symbol: &str) -> PathBuf {
        self.history_dir.join(format!("{}.csv", symbol))
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, ProviderError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProviderError::DataNotAvailable(format!("{} not found", path.display()))
        } else {
            ProviderError::Internal(format!("Failed to open '{}': {}", path.display(), e))
        }
    })?;

    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

/// Header labels with a UTF-8 BOM stripped from the first one
fn read_headers(reader: &mut csv::Reader<File>) -> Result<Vec<String>, ProviderError> {
    let headers = reader
        .headers()
        .map_err(|e| ProviderError::Internal(format!("Failed to read CSV headers: {}", e)))?;

    Ok(headers
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            if idx == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect())
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let lower = h.to_lowercase();
        names.iter().any(|n| lower == *n)
    })
}

fn parse_history_row(
    record: &StringRecord,
    date_idx: usize,
    volume_idx: usize,
    close_idx: usize,
) -> Option<SessionRecord> {
    let date = record
        .get(date_idx)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())?;
    let volume = record.get(volume_idx)?.parse::<f64>().ok()?;
    let close = record.get(close_idx)?.parse::<f64>().ok()?;
    Some(SessionRecord::new(date, volume, close))
}

#[async_trait]
impl SnapshotSource for CsvDataSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn get_market_snapshot(&self) -> Result<RawSnapshot, ProviderError> {
        let mut reader = open_reader(&self.snapshot_path)?;
        let headers = read_headers(&mut reader)?;
        let mut rows = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            match result {
                Ok(record) => rows.push(
                    (0..headers.len())
                        .map(|i| record.get(i).map_or(Value::Null, |s| Value::String(s.to_string())))
                        .collect(),
                ),
                Err(e) => warn!(line = idx + 2, error = %e, "Skipping malformed snapshot row"),
            }
        }

        debug!(path = %self.snapshot_path.display(), rows = rows.len(), "Loaded CSV snapshot");
        Ok(RawSnapshot::new(headers, rows))
    }
}

#[async_trait]
impl HistorySource for CsvDataSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if !self.snapshot_path.is_file() {
            return Err(ProviderError::Unavailable(format!(
                "Snapshot file {} missing",
                self.snapshot_path.display()
            )));
        }
        if !self.history_dir.is_dir() {
            return Err(ProviderError::Unavailable(format!(
                "History directory {} missing",
                self.history_dir.display()
            )));
        }
        Ok(())
    }

    async fn get_daily_history(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SessionRecord>, ProviderError> {
        let path = self.history_path(symbol);
        let mut reader = open_reader(&path)?;
        let headers = read_headers(&mut reader)?;

        let missing = |col: &str| {
            ProviderError::Internal(format!("{} has no {} column", path.display(), col))
        };
        let date_idx = find_column(&headers, DATE_COLUMNS).ok_or_else(|| missing("date"))?;
        let volume_idx = find_column(&headers, VOLUME_COLUMNS).ok_or_else(|| missing("volume"))?;
        let close_idx = find_column(&headers, CLOSE_COLUMNS).ok_or_else(|| missing("close"))?;

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let parsed = result
                .ok()
                .and_then(|record| parse_history_row(&record, date_idx, volume_idx, close_idx));
            match parsed {
                Some(record) => records.push(record),
                None => warn!(symbol = symbol, line = idx + 2, "Skipping malformed history row"),
            }
        }

        if let Some(limit) = limit {
            records.sort_by_key(|r| r.date);
            let excess = records.len().saturating_sub(limit);
            records.drain(..excess);
        }

        Ok(records)
    }
}
