//! Snapshot schema normalization.
//!
//! Providers label the same columns differently ("成交额", "成交额(元)",
//! "Turnover", "amount", ...). Each field has an ordered alias list; the
//! header row is resolved once per snapshot into a [`ColumnMap`], which then
//! turns every row into a typed [`Quote`].
//!
//! Resolution order per field:
//! 1. exact match (ASCII case-insensitive) against each alias in order
//! 2. substring match in either direction against each alias in order
//! 3. turnover only: keyword fallback on "amount" / "turnover" / "额"

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{Quote, RawSnapshot};

/// Fixed width of an HK symbol.
pub const SYMBOL_WIDTH: usize = 5;

/// Aliases for the symbol column, in priority order.
pub const SYMBOL_ALIASES: &[&str] = &["代码", "symbol", "code", "ticker"];

/// Aliases for the name column, in priority order.
pub const NAME_ALIASES: &[&str] = &["名称", "name"];

/// Aliases for the turnover column, in priority order.
pub const TURNOVER_ALIASES: &[&str] = &["成交额", "turnover", "amount"];

/// Last-resort keywords for locating a turnover column.
const TURNOVER_KEYWORDS: &[&str] = &["amount", "turnover", "额"];

/// Errors raised while resolving a snapshot header row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A required column could not be matched to any header
    #[error("no {field} column among headers {headers:?}")]
    MissingColumn {
        field: &'static str,
        headers: Vec<String>,
    },
}

// ============================================================================
// Column Map
// ============================================================================

/// Resolved column positions for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub symbol: usize,
    pub name: usize,
    pub turnover: usize,
}

impl ColumnMap {
    /// Resolve the header row against the alias lists.
    pub fn resolve(headers: &[String]) -> Result<Self, SchemaError> {
        let missing = |field: &'static str| SchemaError::MissingColumn {
            field,
            headers: headers.to_vec(),
        };

        let symbol = resolve_column(headers, SYMBOL_ALIASES).ok_or_else(|| missing("symbol"))?;
        let name = resolve_column(headers, NAME_ALIASES).ok_or_else(|| missing("name"))?;
        let turnover = resolve_column(headers, TURNOVER_ALIASES)
            .or_else(|| keyword_column(headers, TURNOVER_KEYWORDS))
            .ok_or_else(|| missing("turnover"))?;

        debug!(
            symbol = %headers[symbol],
            name = %headers[name],
            turnover = %headers[turnover],
            "Resolved snapshot columns"
        );

        Ok(Self {
            symbol,
            name,
            turnover,
        })
    }

    /// Convert one row into a quote.
    ///
    /// Rows without a usable symbol are dropped; a non-numeric turnover
    /// becomes `None` rather than an error.
    pub fn quote_from_row(&self, row: &[Value]) -> Option<Quote> {
        let symbol = normalize_symbol(row.get(self.symbol)?)?;
        let name = row.get(self.name).map(cell_to_string).unwrap_or_default();
        let turnover = row.get(self.turnover).and_then(coerce_number);

        Some(Quote {
            symbol,
            name,
            turnover,
        })
    }
}

/// Resolve and convert a whole snapshot.
pub fn normalize_snapshot(snapshot: &RawSnapshot) -> Result<Vec<Quote>, SchemaError> {
    let columns = ColumnMap::resolve(&snapshot.headers)?;
    Ok(snapshot
        .rows
        .iter()
        .filter_map(|row| columns.quote_from_row(row))
        .collect())
}

fn resolve_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    for alias in aliases {
        if let Some(idx) = normalized.iter().position(|h| h == alias) {
            return Some(idx);
        }
    }

    for alias in aliases {
        if let Some(idx) = normalized
            .iter()
            .position(|h| !h.is_empty() && (h.contains(alias) || alias.contains(h.as_str())))
        {
            return Some(idx);
        }
    }

    None
}

fn keyword_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let lower = h.to_lowercase();
        keywords.iter().any(|k| lower.contains(k))
    })
}

// ============================================================================
// Cell Coercion
// ============================================================================

/// Normalize a symbol cell to a zero-padded five-character string.
///
/// Numeric cells (`700`, `700.0`) and text cells (`"700"`) both become
/// `"00700"`. Longer symbols are left as they are.
pub fn normalize_symbol(cell: &Value) -> Option<String> {
    let raw = match cell {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match (n.as_u64(), n.as_f64()) {
            (Some(int), _) => int.to_string(),
            (None, Some(f)) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => {
                format!("{:.0}", f)
            }
            _ => n.to_string(),
        },
        _ => return None,
    };

    if raw.is_empty() {
        return None;
    }

    Some(format!("{:0>width$}", raw, width = SYMBOL_WIDTH))
}

/// Coerce a cell to a finite number, or `None` when it is not numeric.
///
/// Thousands separators in text cells are ignored ("1,234.5" → 1234.5).
pub fn coerce_number(cell: &Value) -> Option<f64> {
    let value = match cell {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };

    value.is_finite().then_some(value)
}

fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
