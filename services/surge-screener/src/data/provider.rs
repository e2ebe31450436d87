//! Data source abstraction for the screener.
//!
//! The screener needs exactly two things from the outside world: a
//! point-in-time listing of every instrument on the market, and the recent
//! daily history of one instrument. Each is a separate trait so that an
//! adapter (or a test double) can supply one without the other.

use async_trait::async_trait;
use thiserror::Error;

use super::{RawSnapshot, SessionRecord};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to data providers.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network error (connection failed, timeout, non-2xx status)
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded
    #[error("Rate limited{}", .retry_after_secs.map(|s| format!(", retry after {} seconds", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// Data not available for the requested symbol
    #[error("Data not available: {0}")]
    DataNotAvailable(String),

    /// Provider is temporarily unavailable
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal provider error (bad payload, unexpected return code)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Check if the error is recoverable (worth retrying on a later run)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited { .. } | Self::Unavailable(_)
        )
    }
}

// ============================================================================
// Source Traits
// ============================================================================

/// Source of the market-wide quote table.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Provider name (e.g., "eastmoney", "csv")
    fn name(&self) -> &'static str;

    /// Fetch the full market snapshot as of now.
    ///
    /// Column labels are provider-defined; the caller resolves them.
    async fn get_market_snapshot(&self) -> Result<RawSnapshot, ProviderError>;
}

/// Source of per-symbol daily trading history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Provider name (e.g., "eastmoney", "csv")
    fn name(&self) -> &'static str;

    /// Lightweight availability check.
    async fn health_check(&self) -> Result<(), ProviderError>;

    /// Fetch daily sessions for a symbol.
    ///
    /// # Arguments
    /// * `symbol` - Five-digit HK symbol (e.g., "00700")
    /// * `limit` - Optional maximum number of most recent sessions
    ///
    /// Ordering of the returned records is not guaranteed.
    async fn get_daily_history(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SessionRecord>, ProviderError>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_recoverable() {
        assert!(ProviderError::Network("timeout".into()).is_recoverable());
        assert!(ProviderError::RateLimited { retry_after_secs: Some(60) }.is_recoverable());
        assert!(ProviderError::Unavailable("maintenance".into()).is_recoverable());
        assert!(!ProviderError::InvalidRequest("bad symbol".into()).is_recoverable());
        assert!(!ProviderError::DataNotAvailable("no data".into()).is_recoverable());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(err.to_string().contains("30 seconds"));

        let err = ProviderError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "Rate limited");

        let err = ProviderError::Network("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }
}
