//! Polling scheduler
//!
//! One long-lived loop per enabled source. Each tick sleeps the
//! configured interval, then dispatches the fetch-persist work as its
//! own task and goes straight back to sleep, so a slow upstream never
//! delays the next tick. Overlapping units of work are expected; the
//! store's idempotent inserts collapse any duplicates they produce.


use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::config::SourcesConfig;
use crate::error::Result;
use crate::source::bitstamp::BitstampSource;
use crate::source::brti::BrtiSource;
use crate::source::coinbase::CoinbaseSource;
use crate::source::{CandleSource, TickerSource};
use crate::storage::TickerStore;
use crate::types::CandleSeries;

/// Owns one polling loop per enabled source
pub struct PollSupervisor {
    store: Arc<TickerStore>,
    config: SourcesConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl PollSupervisor {
    pub fn new(
        store: Arc<TickerStore>,
        config: SourcesConfig,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            store,
            config,
            shutdown_tx,
        }
    }

    /// Spawn the enabled polling loops and return their join handles
    pub fn spawn(&self) -> Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::new();

        if self.config.brti.enabled {
            handles.push(tokio::spawn(run_ticker_loop(
                BrtiSource::new()?,
                Arc::clone(&self.store),
                Duration::from_millis(self.config.brti.interval_ms),
                self.shutdown_tx.subscribe(),
            )));
        }

        if self.config.bitstamp.enabled {
            handles.push(tokio::spawn(run_ticker_loop(
                BitstampSource::new()?,
                Arc::clone(&self.store),
                Duration::from_millis(self.config.bitstamp.interval_ms),
                self.shutdown_tx.subscribe(),
            )));
        }

        if self.config.coinbase.enabled {
            handles.push(tokio::spawn(run_ticker_candle_loop(
                CoinbaseSource::new()?,
                CandleSeries::Coinbase,
                Arc::clone(&self.store),
                Duration::from_millis(self.config.coinbase.interval_ms),
                self.config.coinbase.candle_window_secs,
                self.shutdown_tx.subscribe(),
            )));
        }

        info!("[Poller] started {} polling loops", handles.len());
        Ok(handles)
    }
}

/// Sleep-then-dispatch loop for a ticker-only source
async fn run_ticker_loop<S>(
    source: S,
    store: Arc<TickerStore>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    S: TickerSource + 'static,
{
    let source = Arc::new(source);
    info!(
        "[Poller] {} loop running, interval={}ms",
        source.source(),
        interval.as_millis()
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("[Poller] {} loop stopping", source.source());
                break;
            }
            _ = sleep(interval) => {
                let source = Arc::clone(&source);
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    ingest_tick(source.as_ref(), &store).await;
                });
            }
        }
    }
}

/// Loop for a source that pairs each ticker fetch with a candle
/// backfill over the trailing window. Both units dispatch on the same
/// tick and run independently.
async fn run_ticker_candle_loop<S>(
    source: S,
    series: CandleSeries,
    store: Arc<TickerStore>,
    interval: Duration,
    candle_window_secs: i64,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    S: TickerSource + CandleSource + 'static,
{
    let source = Arc::new(source);
    info!(
        "[Poller] {} loop running, interval={}ms, candle_window={}s",
        source.source(),
        interval.as_millis(),
        candle_window_secs
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("[Poller] {} loop stopping", source.source());
                break;
            }
            _ = sleep(interval) => {
                {
                    let source = Arc::clone(&source);
                    let store = Arc::clone(&store);
                    tokio::spawn(async move {
                        ingest_tick(source.as_ref(), &store).await;
                    });
                }
                {
                    let source = Arc::clone(&source);
                    let store = Arc::clone(&store);
                    tokio::spawn(async move {
                        ingest_candles(source.as_ref(), series, &store, candle_window_secs).await;
                    });
                }
            }
        }
    }
}

/// One fetch-normalize-persist unit for a tick. Errors are logged and
/// die here; the owning loop never sees them.
async fn ingest_tick<S>(source: &S, store: &TickerStore)
where
    S: TickerSource + ?Sized,
{
    let name = source.source();
    match source.fetch_ticker().await {
        Ok(tick) => match store.insert_tick(&tick).await {
            Ok(true) => info!(
                "[Poller] saved {} tick, timestamp={}, price={}",
                name, tick.timestamp, tick.price
            ),
            Ok(false) => debug!("[Poller] duplicate {} tick at {}", name, tick.timestamp),
            Err(e) => error!("[Poller] persist {} tick failed: {}", name, e),
        },
        Err(e) => error!("[Poller] fetch {} tick failed: {}", name, e),
    }
}

/// One candle backfill unit covering the trailing window
async fn ingest_candles<S>(source: &S, series: CandleSeries, store: &TickerStore, window_secs: i64)
where
    S: CandleSource + ?Sized,
{
    let end = Utc::now().timestamp();
    let start = end - window_secs;

    match source.fetch_candles(start, end).await {
        Ok(candles) => match store.insert_candles(series, &candles).await {
            Ok(written) if written > 0 => {
                info!("[Poller] saved {} new candles", written)
            }
            Ok(_) => {}
            Err(e) => error!("[Poller] persist candles failed: {}", e),
        },
        Err(e) => error!("[Poller] fetch candles failed: {}", e),
    }
}
