//! Coinbase Exchange adapter
//!
//! Covers two endpoints for the BTC-USD product: the spot ticker and
//! the historic candles range query.

use chrono::{DateTime, SecondsFormat};
use reqwest::Client;
use serde::Deserialize;

use super::{parse_f64, CandleSource, TickerSource};
use crate::error::{Result, StoreError};
use crate::types::{Candle, Source, Ticker};

const COINBASE_URL: &str = "https://api.exchange.coinbase.com";
const PRODUCT: &str = "BTC-USD";

/// Adapter for the Coinbase Exchange BTC-USD product
pub struct CoinbaseSource {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ProductTicker {
    /// Decimal as string
    price: String,
    /// RFC 3339 with fractional seconds
    time: String,
}

impl CoinbaseSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(COINBASE_URL)
    }

    /// Point the adapter at a different endpoint
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn window_bound(ts: i64) -> Result<String> {
        let tm = DateTime::from_timestamp(ts, 0).ok_or_else(|| {
            StoreError::InvalidArgument(format!("window bound out of range: {ts}"))
        })?;
        Ok(tm.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

#[async_trait::async_trait]
impl TickerSource for CoinbaseSource {
    fn source(&self) -> Source {
        Source::Coinbase
    }

    async fn fetch_ticker(&self) -> Result<Ticker> {
        let url = format!("{}/products/{}/ticker", self.base_url, PRODUCT);
        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let raw: ProductTicker = serde_json::from_str(&body)?;

        let timestamp = DateTime::parse_from_rfc3339(&raw.time)
            .map_err(|_| StoreError::Format(format!("ticker time: {:?}", raw.time)))?
            .timestamp();

        Ok(Ticker {
            source: Source::Coinbase,
            timestamp,
            price: parse_f64("price", &raw.price)?,
            low: None,
            high: None,
        })
    }
}

#[async_trait::async_trait]
impl CandleSource for CoinbaseSource {
    /// Candles come back as arrays of `[time, low, high, open, close, volume]`,
    /// newest bucket first. Extra trailing columns are ignored.
    async fn fetch_candles(&self, start: i64, end: i64) -> Result<Vec<Candle>> {
        let url = format!("{}/products/{}/candles", self.base_url, PRODUCT);
        let body = self
            .http
            .get(&url)
            .query(&[
                ("start", Self::window_bound(start)?),
                ("end", Self::window_bound(end)?),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let rows: Vec<Vec<f64>> = serde_json::from_str(&body)?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() < 5 {
                return Err(StoreError::Format(format!(
                    "candle row has {} columns, expected at least 5",
                    row.len()
                )));
            }
            if row[..5].iter().any(|v| !v.is_finite()) {
                return Err(StoreError::Format(
                    "candle row contains a non-finite value".to_string(),
                ));
            }
            candles.push(Candle {
                timestamp: row[0] as i64,
                low: row[1],
                high: row[2],
                open: row[3],
                close: row[4],
            });
        }

        Ok(candles)
    }
}
