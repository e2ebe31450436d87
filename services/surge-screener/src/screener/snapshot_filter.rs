//! Snapshot threshold filter.
//!
//! First stage of a scan: pull the market snapshot once and keep every
//! instrument whose turnover so far exceeds the threshold.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::data::schema::normalize_snapshot;
use crate::data::{Quote, SnapshotSource};

/// An instrument that passed the snapshot threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub name: String,
    /// Snapshot turnover, always above the threshold used to select it
    pub turnover: f64,
}

/// Keep quotes whose numeric turnover is strictly above `threshold`.
///
/// Input order is preserved; duplicates are not removed.
pub fn select_candidates(quotes: &[Quote], threshold: f64) -> Vec<Candidate> {
    quotes
        .iter()
        .filter_map(|q| match q.turnover {
            Some(turnover) if turnover > threshold => Some(Candidate {
                symbol: q.symbol.clone(),
                name: q.name.clone(),
                turnover,
            }),
            _ => None,
        })
        .collect()
}

/// Mean turnover across candidates, `None` when there are none.
pub fn average_turnover(candidates: &[Candidate]) -> Option<f64> {
    if candidates.is_empty() {
        return None;
    }
    Some(candidates.iter().map(|c| c.turnover).sum::<f64>() / candidates.len() as f64)
}

/// Snapshot filter over a [`SnapshotSource`].
pub struct SnapshotFilter {
    source: Arc<dyn SnapshotSource>,
}

impl SnapshotFilter {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self { source }
    }

    /// Fetch the snapshot and return instruments with turnover above `threshold`.
    ///
    /// Source and schema failures are logged and yield an empty list.
    pub async fn fetch_candidates(&self, threshold: f64) -> Vec<Candidate> {
        let Some(quotes) = self.load_quotes().await else {
            return Vec::new();
        };

        let candidates = select_candidates(&quotes, threshold);
        info!(
            snapshot_size = quotes.len(),
            candidates = candidates.len(),
            threshold,
            "Snapshot filter complete"
        );
        candidates
    }

    /// The `limit` instruments with the highest turnover, descending.
    ///
    /// Rows without numeric turnover are ignored; failures yield an empty list.
    pub async fn top_by_turnover(&self, limit: usize) -> Vec<Quote> {
        let Some(quotes) = self.load_quotes().await else {
            return Vec::new();
        };

        let mut ranked: Vec<Quote> = quotes.into_iter().filter(|q| q.turnover.is_some()).collect();
        ranked.sort_by(|a, b| {
            b.turnover
                .partial_cmp(&a.turnover)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(limit);
        ranked
    }

    async fn load_quotes(&self) -> Option<Vec<Quote>> {
        let snapshot = match self.source.get_market_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(
                    source = self.source.name(),
                    error = %e,
                    recoverable = e.is_recoverable(),
                    "Failed to fetch market snapshot"
                );
                return None;
            }
        };

        if snapshot.is_empty() {
            warn!(source = self.source.name(), "Market snapshot is empty");
            return Some(Vec::new());
        }

        match normalize_snapshot(&snapshot) {
            Ok(quotes) => Some(quotes),
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "Snapshot schema not recognized");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, turnover: Option<f64>) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            name: format!("Name {}", symbol),
            turnover,
        }
    }

    #[test]
    fn test_select_is_strictly_greater() {
        let quotes = vec![
            quote("00001", Some(30_000_000.0)),
            quote("00002", Some(30_000_000.01)),
            quote("00003", None),
            quote("00004", Some(1.0)),
        ];

        let candidates = select_candidates(&quotes, 30_000_000.0);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].symbol, "00002");
    }

    #[test]
    fn test_select_keeps_order_and_duplicates() {
        let quotes = vec![
            quote("00700", Some(5e9)),
            quote("00005", Some(2e9)),
            quote("00700", Some(5e9)),
        ];

        let symbols: Vec<_> = select_candidates(&quotes, 0.0)
            .into_iter()
            .map(|c| c.symbol)
            .collect();
        assert_eq!(symbols, vec!["00700", "00005", "00700"]);
    }

    #[test]
    fn test_average_turnover() {
        assert_eq!(average_turnover(&[]), None);
        let candidates = select_candidates(&[quote("a", Some(2.0)), quote("b", Some(4.0))], 0.0);
        assert_eq!(average_turnover(&candidates), Some(3.0));
    }
}
