//! Bitstamp hourly ticker adapter

use reqwest::Client;
use serde::Deserialize;

use super::{parse_f64, parse_i64, TickerSource};
use crate::error::Result;
use crate::types::{Source, Ticker};

const BITSTAMP_URL: &str = "https://www.bitstamp.net";

/// Adapter for the Bitstamp hourly BTC/USD ticker
pub struct BitstampSource {
    http: Client,
    base_url: String,
}

/// Bitstamp serializes every field as a string
#[derive(Debug, Deserialize)]
struct HourTicker {
    timestamp: String,
    last: String,
    low: String,
    high: String,
}

impl BitstampSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BITSTAMP_URL)
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
}

#[async_trait::async_trait]
impl TickerSource for BitstampSource {
    fn source(&self) -> Source {
        Source::Bitstamp
    }

    async fn fetch_ticker(&self) -> Result<Ticker> {
        let url = format!("{}/api/v2/ticker_hour/btcusd/", self.base_url);
        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let raw: HourTicker = serde_json::from_str(&body)?;

        Ok(Ticker {
            source: Source::Bitstamp,
            timestamp: parse_i64("timestamp", &raw.timestamp)?,
            price: parse_f64("last", &raw.last)?,
            low: Some(parse_f64("low", &raw.low)?),
            high: Some(parse_f64("high", &raw.high)?),
        })
    }
}
