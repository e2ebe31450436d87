//! Eastmoney adapter for Hong Kong equities.
//!
//! Uses the public eastmoney push APIs, no API key required.
//!
//! # Data Sources
//! - Market snapshot: push2.eastmoney.com `clist` (paged, all HK boards)
//! - Daily K-line: push2his.eastmoney.com, market code 116 for HK

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::provider::{HistorySource, ProviderError, SnapshotSource};
use super::{RawSnapshot, SessionRecord};
use crate::config::EastmoneyConfig;

// ============================================================================
// Constants
// ============================================================================

/// Eastmoney market list API
pub const EASTMONEY_CLIST_URL: &str = "https://push2.eastmoney.com/api/qt/clist/get";

/// Eastmoney historical data API
pub const EASTMONEY_KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";

/// Board filter covering HK main board, GEM and the other HK listings
const HK_BOARD_FILTER: &str = "m:128 t:3,m:128 t:4,m:128 t:1,m:128 t:2";

/// Eastmoney market prefix for HK securities
const HK_MARKET: &str = "116";

/// Snapshot columns: (eastmoney field, label)
const SNAPSHOT_FIELDS: &[(&str, &str)] = &[
    ("f12", "代码"),
    ("f14", "名称"),
    ("f2", "最新价"),
    ("f3", "涨跌幅"),
    ("f5", "成交量"),
    ("f6", "成交额"),
];

/// Upper bound on snapshot pages, guards against a server that never reports `total`
const MAX_SNAPSHOT_PAGES: usize = 200;

/// Default K-line count when the caller sets no limit
const DEFAULT_KLINE_LIMIT: usize = 120;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ClistResponse {
    rc: i32,
    data: Option<ClistData>,
}

#[derive(Debug, Deserialize)]
struct ClistData {
    total: Option<usize>,
    /// Either an array of rows or an object keyed by row index
    diff: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    rc: i32,
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    klines: Option<Vec<String>>,
}

// ============================================================================
// Eastmoney Adapter
// ============================================================================

/// Eastmoney adapter serving both the HK snapshot and daily history.
pub struct EastmoneyHkAdapter {
    /// HTTP client
    client: reqwest::Client,
    /// Market list endpoint
    snapshot_url: String,
    /// K-line endpoint
    kline_url: String,
    /// Rows per snapshot page
    page_size: usize,
}

impl EastmoneyHkAdapter {
    /// Create an adapter against the public endpoints
    pub fn new() -> Self {
        Self::from_config(&EastmoneyConfig::default())
    }

    /// Create an adapter against custom endpoints (mirrors, test servers)
    pub fn with_base_urls(snapshot_url: impl Into<String>, kline_url: impl Into<String>) -> Self {
        Self {
            snapshot_url: snapshot_url.into(),
            kline_url: kline_url.into(),
            ..Self::new()
        }
    }

    /// Create from config
    pub fn from_config(config: &EastmoneyConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            snapshot_url: config.snapshot_url.clone(),
            kline_url: config.kline_url.clone(),
            page_size: config.page_size.max(1),
        }
    }

    /// Fetch one page of the market list
    async fn fetch_snapshot_page(&self, page: usize) -> Result<ClistData, ProviderError> {
        let fields = SNAPSHOT_FIELDS
            .iter()
            .map(|(field, _)| *field)
            .collect::<Vec<_>>()
            .join(",");

        let query = [
            ("pn", page.to_string()),
            ("pz", self.page_size.to_string()),
            ("po", "1".to_string()),
            ("np", "1".to_string()),
            ("fltt", "2".to_string()),
            ("invt", "2".to_string()),
            ("fid", "f6".to_string()),
            ("fs", HK_BOARD_FILTER.to_string()),
            ("fields", fields),
        ];

        debug!(url = %self.snapshot_url, page, "Fetching HK snapshot page from eastmoney");

        let response = self
            .client
            .get(&self.snapshot_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_error(&response));
        }

        let data: ClistResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("Failed to parse response: {}", e)))?;

        if data.rc != 0 {
            return Err(ProviderError::Internal(format!(
                "Eastmoney API error: rc={}",
                data.rc
            )));
        }

        Ok(data.data.unwrap_or(ClistData {
            total: Some(0),
            diff: None,
        }))
    }

    /// Fetch daily K-lines for one HK symbol
    async fn fetch_kline(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SessionRecord>, ProviderError> {
        let secid = to_secid(symbol)
            .ok_or_else(|| ProviderError::InvalidRequest(format!("Invalid HK symbol: {}", symbol)))?;

        let query = [
            ("secid", secid),
            ("klt", "101".to_string()),
            ("fqt", "0".to_string()),
            ("lmt", limit.unwrap_or(DEFAULT_KLINE_LIMIT).to_string()),
            ("end", "20500101".to_string()),
            ("fields1", "f1,f2,f3,f4,f5,f6".to_string()),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57".to_string()),
        ];

        debug!(url = %self.kline_url, symbol = symbol, "Fetching kline from eastmoney");

        let response = self
            .client
            .get(&self.kline_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_error(&response));
        }

        let data: KlineResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("Failed to parse response: {}", e)))?;

        if data.rc != 0 {
            return Err(ProviderError::Internal(format!(
                "Eastmoney API error: rc={}",
                data.rc
            )));
        }

        let klines = data
            .data
            .ok_or_else(|| ProviderError::DataNotAvailable(format!("No kline data for {}", symbol)))?
            .klines
            .unwrap_or_default();

        parse_klines(&klines)
    }
}

impl Default for EastmoneyHkAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Map a non-2xx response to a provider error; 429 honours `Retry-After`.
fn status_error(response: &reqwest::Response) -> ProviderError {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        return ProviderError::RateLimited { retry_after_secs };
    }
    ProviderError::Network(format!("HTTP {}", status))
}

/// Convert a five-digit HK symbol to eastmoney secid ("00700" -> "116.00700")
fn to_secid(symbol: &str) -> Option<String> {
    let code = symbol.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}.{:0>5}", HK_MARKET, code))
}

/// Parse eastmoney kline strings into session records.
///
/// Unparseable rows (suspended sessions report "-") are skipped; the batch
/// only fails when rows were returned and none of them parse.
fn parse_klines(klines: &[String]) -> Result<Vec<SessionRecord>, ProviderError> {
    let mut records = Vec::with_capacity(klines.len());

    for line in klines {
        match parse_kline(line) {
            Some(record) => records.push(record),
            None => warn!(line = line, "Invalid kline row, skipping"),
        }
    }

    if records.is_empty() && !klines.is_empty() {
        return Err(ProviderError::Internal(format!(
            "None of {} kline rows could be parsed",
            klines.len()
        )));
    }

    Ok(records)
}

/// Fields: date,open,close,high,low,volume,amount
fn parse_kline(line: &str) -> Option<SessionRecord> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 7 {
        return None;
    }

    let date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d").ok()?;
    let close = parts[2].parse::<f64>().ok().filter(|v| v.is_finite())?;
    let volume = parts[5].parse::<f64>().ok().filter(|v| v.is_finite())?;

    Some(SessionRecord::new(date, volume, close))
}

/// Turn the `diff` payload into rows ordered like [`SNAPSHOT_FIELDS`]
fn diff_rows(diff: Option<Value>) -> Vec<Vec<Value>> {
    let items: Vec<Value> = match diff {
        Some(Value::Array(items)) => items,
        Some(Value::Object(map)) => map.into_iter().map(|(_, v)| v).collect(),
        _ => Vec::new(),
    };

    items
        .iter()
        .map(|item| {
            SNAPSHOT_FIELDS
                .iter()
                .map(|(field, _)| item.get(*field).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect()
}

// ============================================================================
// Source Implementations
// ============================================================================

#[async_trait]
impl SnapshotSource for EastmoneyHkAdapter {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    async fn get_market_snapshot(&self) -> Result<RawSnapshot, ProviderError> {
        let headers = SNAPSHOT_FIELDS
            .iter()
            .map(|(_, label)| label.to_string())
            .collect();
        let mut rows = Vec::new();

        for page in 1..=MAX_SNAPSHOT_PAGES {
            let data = self.fetch_snapshot_page(page).await?;
            let total = data.total;
            let page_rows = diff_rows(data.diff);

            if page_rows.is_empty() {
                break;
            }
            rows.extend(page_rows);

            if total.is_some_and(|t| rows.len() >= t) {
                break;
            }
            if page == MAX_SNAPSHOT_PAGES {
                warn!(pages = page, rows = rows.len(), "Snapshot page limit reached");
            }
        }

        debug!(rows = rows.len(), "Fetched HK snapshot");
        Ok(RawSnapshot::new(headers, rows))
    }
}

#[async_trait]
impl HistorySource for EastmoneyHkAdapter {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        // Fetch one daily session for a well-known stock
        let records = self.fetch_kline("00700", Some(1)).await?;

        if records.is_empty() {
            return Err(ProviderError::Unavailable(
                "Health check returned no data".into(),
            ));
        }

        Ok(())
    }

    async fn get_daily_history(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SessionRecord>, ProviderError> {
        self.fetch_kline(symbol, limit).await
    }
}

// ============================================================================
// Tests
// ============================================================================
