//! CME Bitcoin Real Time Index adapter
//!
//! The index endpoint sits behind an aggressive CDN cache, so every
//! request carries the current Unix time as a cache-busting query param.

use chrono::{NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::TickerSource;
use crate::error::{Result, StoreError};
use crate::types::{Source, Ticker};

const BRTI_URL: &str = "https://www.cmegroup.com/CmeWS/mvc/Bitcoin/BRTI";

/// Adapter for the CME Bitcoin Real Time Index
pub struct BrtiSource {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct BrtiIndex {
    value: f64,
    /// "YYYY-MM-DD HH:MM:SS", implicitly UTC
    date: String,
}

impl BrtiSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BRTI_URL)
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
impl TickerSource for BrtiSource {
    fn source(&self) -> Source {
        Source::Brti
    }

    async fn fetch_ticker(&self) -> Result<Ticker> {
        let bust = Utc::now().timestamp().to_string();
        let body = self
            .http
            .get(&self.base_url)
            .query(&[("_", bust.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let raw: BrtiIndex = serde_json::from_str(&body)?;

        if !raw.value.is_finite() {
            return Err(StoreError::Format(format!(
                "index value not finite: {}",
                raw.value
            )));
        }

        let timestamp = NaiveDateTime::parse_from_str(&raw.date, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| StoreError::Format(format!("index date: {:?}", raw.date)))?
            .and_utc()
            .timestamp();

        Ok(Ticker {
            source: Source::Brti,
            timestamp,
            price: raw.value,
            low: None,
            high: None,
        })
    }
}
