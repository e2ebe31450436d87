//! Market data module for Hong Kong equities.
//!
//! Provides the two narrow interfaces the screener consumes (a market-wide
//! snapshot and per-symbol daily history), the adapters that implement them,
//! and the schema normalization that turns provider tables into typed quotes.
//!
//! # Data Sources
//! - **Eastmoney** (default): HK spot list + daily K-lines over HTTP
//! - **CSV**: offline snapshot file plus one history file per symbol

pub mod calendar;
mod csv_source;
mod eastmoney;
mod provider;
pub mod schema;

pub use calendar::{recent_weekdays, ComparisonWindow};
pub use csv_source::CsvDataSource;
pub use eastmoney::{EastmoneyHkAdapter, EASTMONEY_CLIST_URL, EASTMONEY_KLINE_URL};
pub use provider::{HistorySource, ProviderError, SnapshotSource};
pub use schema::{ColumnMap, SchemaError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Core Data Types
// ============================================================================

/// A provider table before normalization.
///
/// Header labels vary between providers and provider versions; cells keep
/// whatever JSON shape the provider sent (number, numeric text, "-", null).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    /// Column labels in provider order
    pub headers: Vec<String>,
    /// Rows aligned with `headers`; short rows are padded with null on read
    pub rows: Vec<Vec<Value>>,
}

impl RawSnapshot {
    /// Create a snapshot from headers and rows.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the snapshot has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One instrument from the market snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Exchange symbol, zero-padded to five digits (e.g., "00700")
    pub symbol: String,
    /// Instrument name
    pub name: String,
    /// Traded value so far in the session; `None` when the provider value is not numeric
    pub turnover: Option<f64>,
}

/// One completed daily session for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Trading date
    pub date: NaiveDate,
    /// Shares traded
    pub volume: f64,
    /// Closing price
    pub close: f64,
}

impl SessionRecord {
    /// Create a new session record.
    pub fn new(date: NaiveDate, volume: f64, close: f64) -> Self {
        Self { date, volume, close }
    }

    /// Session turnover approximated as volume × close.
    pub fn session_turnover(&self) -> f64 {
        self.volume * self.close
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_turnover() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let record = SessionRecord::new(date, 3000.0, 10.0);
        assert!((record.session_turnover() - 30_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_session_turnover_zero_volume() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(SessionRecord::new(date, 0.0, 12.5).session_turnover(), 0.0);
    }

    #[test]
    fn test_raw_snapshot_len() {
        let snapshot = RawSnapshot::new(
            vec!["代码".into(), "名称".into(), "成交额".into()],
            vec![vec![Value::from("00700"), Value::from("腾讯控股"), Value::from(1.0e9)]],
        );
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.is_empty());
        assert!(RawSnapshot::default().is_empty());
    }
}
