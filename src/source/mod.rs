//! Upstream market data adapters
//!
//! Fetches BTC/USD quotes from:
//! - CME Bitcoin Real Time Index (BRTI)
//! - Bitstamp (hourly ticker)
//! - Coinbase (ticker and historic candles)
//!
//! Each adapter owns its wire format and normalizes responses into the
//! crate's canonical records before anything else sees them.

pub mod bitstamp;
pub mod brti;
pub mod coinbase;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::types::{Candle, Source, Ticker};

/// Upstream feed exposing a point-in-time BTC/USD quote
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Series this adapter feeds
    fn source(&self) -> Source;

    /// Fetch the current quote and normalize it
    async fn fetch_ticker(&self) -> Result<Ticker>;
}

/// Upstream feed that can also backfill historic OHLC buckets
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Fetch candles covering `[start, end]` (Unix seconds), in the
    /// order the upstream returns them
    async fn fetch_candles(&self, start: i64, end: i64) -> Result<Vec<Candle>>;
}

/// Parse a decimal field that the upstream serializes as a JSON string
pub(crate) fn parse_f64(field: &str, raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| StoreError::Format(format!("{field}: not a decimal: {raw:?}")))?;
    if !value.is_finite() {
        return Err(StoreError::Format(format!("{field}: not finite: {raw:?}")));
    }
    Ok(value)
}

/// Parse an integer field that the upstream serializes as a JSON string
pub(crate) fn parse_i64(field: &str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| StoreError::Format(format!("{field}: not an integer: {raw:?}")))
}
