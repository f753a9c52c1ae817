//! Canonical record types shared by the ingestion and query layers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Upstream feed identity. Each source owns exactly one tick series, so
/// the source doubles as the storage key for that series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// CME Bitcoin Real Time Index (spot index, price only).
    Brti,
    /// Bitstamp hourly ticker (price plus the hourly low/high window).
    Bitstamp,
    /// Coinbase exchange ticker (price only; candles are a separate series).
    Coinbase,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Brti, Source::Bitstamp, Source::Coinbase];

    /// Table holding this source's tick series.
    pub fn tick_table(&self) -> &'static str {
        match self {
            Source::Brti => "brti_btcusd_ticks",
            Source::Bitstamp => "bitstamp_btcusd_ticks",
            Source::Coinbase => "coinbase_btcusd_ticks",
        }
    }

    /// Whether inserts into this tick series reject a non-positive price.
    pub fn requires_positive_price(&self) -> bool {
        matches!(self, Source::Coinbase)
    }

    /// Whether this tick series records the given column.
    pub fn records_column(&self, column: MinColumn) -> bool {
        match column {
            MinColumn::Price => true,
            MinColumn::Low | MinColumn::High => matches!(self, Source::Bitstamp),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Brti => "brti",
            Source::Bitstamp => "bitstamp",
            Source::Coinbase => "coinbase",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "brti" => Ok(Source::Brti),
            "bitstamp" => Ok(Source::Bitstamp),
            "coinbase" => Ok(Source::Coinbase),
            other => Err(StoreError::InvalidArgument(format!(
                "unknown source: {other}"
            ))),
        }
    }
}

/// Key for a candle (OHLC) series. Only Coinbase exposes one today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleSeries {
    Coinbase,
}

impl CandleSeries {
    pub fn table(&self) -> &'static str {
        match self {
            CandleSeries::Coinbase => "coinbase_btcusd_candles",
        }
    }

    pub fn records_column(&self, column: MinColumn) -> bool {
        match column {
            MinColumn::Low | MinColumn::High => true,
            MinColumn::Price => false,
        }
    }
}

/// Column selector for range-minimum queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinColumn {
    Price,
    Low,
    High,
}

impl MinColumn {
    /// Column name as it appears in every series table that records it.
    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            MinColumn::Price => "price",
            MinColumn::Low => "low",
            MinColumn::High => "high",
        }
    }
}

/// Normalized price observation, independent of any upstream wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub source: Source,
    /// Event time in Unix seconds (the upstream quote time, not fetch time).
    pub timestamp: i64,
    pub price: f64,
    /// Window low, for sources that report one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    /// Window high, for sources that report one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
}

/// One OHLC bucket from a candle endpoint, in upstream column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start in Unix seconds.
    pub timestamp: i64,
    pub low: f64,
    pub high: f64,
    pub open: f64,
    pub close: f64,
}
