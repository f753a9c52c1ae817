//! Time-series persistence for normalized ticks and candles
//!
//! One table per (source, kind), keyed by the event timestamp. Rows are
//! immutable once written; inserts are idempotent via INSERT OR IGNORE,
//! so overlapping polls of the same quote collapse into a single row.


use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::types::{Candle, CandleSeries, MinColumn, Source, Ticker};

/// Store for all persisted price series
pub struct TickerStore {
    pool: SqlitePool,
}

impl TickerStore {
    /// Connect to SQLite database (creates if not exists) and set up schema
    pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path.as_ref().display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let store = Self::new(pool);
        store.init().await?;

        Ok(store)
    }

    /// Create a store using an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables and indices
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS brti_btcusd_ticks (
                timestamp INTEGER PRIMARY KEY,
                price REAL NOT NULL,
                created_time TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bitstamp_btcusd_ticks (
                timestamp INTEGER PRIMARY KEY,
                price REAL NOT NULL,
                low REAL NOT NULL,
                high REAL NOT NULL,
                created_time TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bitstamp_ticks_low ON bitstamp_btcusd_ticks(low)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bitstamp_ticks_high ON bitstamp_btcusd_ticks(high)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS coinbase_btcusd_ticks (
                timestamp INTEGER PRIMARY KEY,
                price REAL NOT NULL,
                created_time TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS coinbase_btcusd_candles (
                timestamp INTEGER PRIMARY KEY,
                low REAL NOT NULL,
                high REAL NOT NULL,
                open REAL NOT NULL,
                close REAL NOT NULL,
                created_time TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_coinbase_candles_low ON coinbase_btcusd_candles(low)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_coinbase_candles_high ON coinbase_btcusd_candles(high)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert one tick, keyed by its event timestamp. Returns whether a
    /// new row was written; a duplicate timestamp is a no-op, not an error.
    pub async fn insert_tick(&self, tick: &Ticker) -> Result<bool> {
        if tick.timestamp <= 0 {
            return Err(StoreError::InvalidRecord(format!(
                "non-positive timestamp: {}",
                tick.timestamp
            )));
        }
        if !tick.price.is_finite() {
            return Err(StoreError::InvalidRecord(format!(
                "non-finite price: {}",
                tick.price
            )));
        }
        if tick.source.requires_positive_price() && tick.price <= 0.0 {
            return Err(StoreError::InvalidRecord(format!(
                "non-positive {} price: {}",
                tick.source, tick.price
            )));
        }

        let result = match tick.source {
            Source::Bitstamp => {
                let (low, high) = match (tick.low, tick.high) {
                    (Some(low), Some(high)) => (low, high),
                    _ => {
                        return Err(StoreError::InvalidRecord(
                            "bitstamp tick missing hourly low/high".to_string(),
                        ))
                    }
                };
                let sql = format!(
                    "INSERT OR IGNORE INTO {} (timestamp, price, low, high) VALUES (?, ?, ?, ?)",
                    tick.source.tick_table()
                );
                sqlx::query(&sql)
                    .bind(tick.timestamp)
                    .bind(tick.price)
                    .bind(low)
                    .bind(high)
                    .execute(&self.pool)
                    .await?
            }
            Source::Brti | Source::Coinbase => {
                let sql = format!(
                    "INSERT OR IGNORE INTO {} (timestamp, price) VALUES (?, ?)",
                    tick.source.tick_table()
                );
                sqlx::query(&sql)
                    .bind(tick.timestamp)
                    .bind(tick.price)
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    /// Insert a batch of candles, one idempotent insert per record.
    /// Records with a non-positive open (empty bucket sentinel) or a
    /// non-positive timestamp are skipped. Returns how many new rows
    /// were written.
    pub async fn insert_candles(&self, series: CandleSeries, candles: &[Candle]) -> Result<usize> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (timestamp, low, high, open, close) VALUES (?, ?, ?, ?, ?)",
            series.table()
        );

        let mut written = 0;
        for candle in candles {
            if candle.open <= 0.0 || candle.timestamp <= 0 {
                tracing::debug!(timestamp = candle.timestamp, "skipping empty candle bucket");
                continue;
            }
            let result = sqlx::query(&sql)
                .bind(candle.timestamp)
                .bind(candle.low)
                .bind(candle.high)
                .bind(candle.open)
                .bind(candle.close)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() > 0 {
                written += 1;
            }
        }

        Ok(written)
    }

    /// Most recent ticks for a source, newest first
    pub async fn find_latest_ticks(&self, source: Source, count: u32) -> Result<Vec<Ticker>> {
        check_count(count)?;

        match source {
            Source::Bitstamp => {
                let sql = format!(
                    "SELECT timestamp, price, low, high FROM {} ORDER BY timestamp DESC LIMIT ?",
                    source.tick_table()
                );
                let rows = sqlx::query_as::<_, HourlyTickRow>(&sql)
                    .bind(count as i64)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(rows.into_iter().map(|r| r.into_ticker(source)).collect())
            }
            Source::Brti | Source::Coinbase => {
                let sql = format!(
                    "SELECT timestamp, price FROM {} ORDER BY timestamp DESC LIMIT ?",
                    source.tick_table()
                );
                let rows = sqlx::query_as::<_, TickRow>(&sql)
                    .bind(count as i64)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(rows.into_iter().map(|r| r.into_ticker(source)).collect())
            }
        }
    }

    /// Tick with an exact event timestamp
    pub async fn find_tick_at(&self, source: Source, timestamp: i64) -> Result<Ticker> {
        let row = match source {
            Source::Bitstamp => {
                let sql = format!(
                    "SELECT timestamp, price, low, high FROM {} WHERE timestamp = ?",
                    source.tick_table()
                );
                sqlx::query_as::<_, HourlyTickRow>(&sql)
                    .bind(timestamp)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|r| r.into_ticker(source))
            }
            Source::Brti | Source::Coinbase => {
                let sql = format!(
                    "SELECT timestamp, price FROM {} WHERE timestamp = ?",
                    source.tick_table()
                );
                sqlx::query_as::<_, TickRow>(&sql)
                    .bind(timestamp)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|r| r.into_ticker(source))
            }
        };

        row.ok_or_else(|| StoreError::NotFound(format!("no {source} tick at {timestamp}")))
    }

    /// Tick with the smallest value of `column` within `[start, end]`
    /// inclusive. Ties break on scan order.
    pub async fn find_lowest_tick(
        &self,
        source: Source,
        column: MinColumn,
        start: i64,
        end: i64,
    ) -> Result<Ticker> {
        if !source.records_column(column) {
            return Err(StoreError::InvalidArgument(format!(
                "{} ticks do not record a {} column",
                source,
                column.as_sql()
            )));
        }

        let row = match source {
            Source::Bitstamp => {
                let sql = format!(
                    "SELECT timestamp, price, low, high FROM {} WHERE timestamp BETWEEN ? AND ? ORDER BY {} ASC LIMIT 1",
                    source.tick_table(),
                    column.as_sql()
                );
                sqlx::query_as::<_, HourlyTickRow>(&sql)
                    .bind(start)
                    .bind(end)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|r| r.into_ticker(source))
            }
            Source::Brti | Source::Coinbase => {
                let sql = format!(
                    "SELECT timestamp, price FROM {} WHERE timestamp BETWEEN ? AND ? ORDER BY {} ASC LIMIT 1",
                    source.tick_table(),
                    column.as_sql()
                );
                sqlx::query_as::<_, TickRow>(&sql)
                    .bind(start)
                    .bind(end)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|r| r.into_ticker(source))
            }
        };

        row.ok_or_else(|| {
            StoreError::NotFound(format!("no {source} ticks in [{start}, {end}]"))
        })
    }

    /// Most recent candles, newest bucket first
    pub async fn find_latest_candles(
        &self,
        series: CandleSeries,
        count: u32,
    ) -> Result<Vec<Candle>> {
        check_count(count)?;

        let sql = format!(
            "SELECT timestamp, low, high, open, close FROM {} ORDER BY timestamp DESC LIMIT ?",
            series.table()
        );
        let rows = sqlx::query_as::<_, CandleRow>(&sql)
            .bind(count as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_candle()).collect())
    }

    /// Candle with the smallest value of `column` within `[start, end]` inclusive
    pub async fn find_lowest_candle(
        &self,
        series: CandleSeries,
        column: MinColumn,
        start: i64,
        end: i64,
    ) -> Result<Candle> {
        if !series.records_column(column) {
            return Err(StoreError::InvalidArgument(format!(
                "candles do not record a {} column",
                column.as_sql()
            )));
        }

        let sql = format!(
            "SELECT timestamp, low, high, open, close FROM {} WHERE timestamp BETWEEN ? AND ? ORDER BY {} ASC LIMIT 1",
            series.table(),
            column.as_sql()
        );
        let row = sqlx::query_as::<_, CandleRow>(&sql)
            .bind(start)
            .bind(end)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_candle()).ok_or_else(|| {
            StoreError::NotFound(format!("no candles in [{start}, {end}]"))
        })
    }
}

fn check_count(count: u32) -> Result<()> {
    if !(1..=100).contains(&count) {
        return Err(StoreError::InvalidArgument(format!(
            "count out of range: {count}"
        )));
    }
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct TickRow {
    timestamp: i64,
    price: f64,
}

impl TickRow {
    fn into_ticker(self, source: Source) -> Ticker {
        Ticker {
            source,
            timestamp: self.timestamp,
            price: self.price,
            low: None,
            high: None,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HourlyTickRow {
    timestamp: i64,
    price: f64,
    low: f64,
    high: f64,
}

impl HourlyTickRow {
    fn into_ticker(self, source: Source) -> Ticker {
        Ticker {
            source,
            timestamp: self.timestamp,
            price: self.price,
            low: Some(self.low),
            high: Some(self.high),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandleRow {
    timestamp: i64,
    low: f64,
    high: f64,
    open: f64,
    close: f64,
}

impl CandleRow {
    fn into_candle(self) -> Candle {
        Candle {
            timestamp: self.timestamp,
            low: self.low,
            high: self.high,
            open: self.open,
            close: self.close,
        }
    }
}
