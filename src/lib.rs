//! Multi-source BTC/USD ticker ingestion and query service
//!
//! Polls independent market data feeds on fixed intervals, normalizes
//! their payloads into canonical records, and persists them in
//! idempotent per-source time series with a small query API on top.

pub mod api;
pub mod config;
pub mod error;
pub mod poller;
pub mod source;
pub mod storage;
pub mod types;
