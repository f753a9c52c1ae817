//! HTTP query API
//!
//! Thin read-only transport over the store: each route parses its
//! parameters, calls exactly one store operation, and maps the error
//! taxonomy to a status code. Every error, parameter rejections
//! included, answers with a `{"message": ...}` body. No caching, no
//! pagination beyond `count`.


use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::StoreError;
use crate::storage::TickerStore;
use crate::types::{Candle, CandleSeries, MinColumn, Source, Ticker};

pub struct ApiState {
    pub store: Arc<TickerStore>,
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/:source/btcusd/latest", get(latest_ticks))
        .route("/:source/btcusd/at/:timestamp", get(tick_at))
        .route("/:source/btcusd/lowest/:start/:end", get(lowest_in_window))
        .route("/coinbase/btcusd/candles/latest", get(latest_candles))
        .with_state(state)
}

/// Bind and serve the query API
pub async fn serve(store: Arc<TickerStore>, bind: &str) -> anyhow::Result<()> {
    let state = Arc::new(ApiState { store });
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("[Api] listening on {}", bind);
    axum::serve(listener, router).await?;
    Ok(())
}

/// Store error carried out to a response
struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("[Api] request failed: {}", self.0);
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct LatestParams {
    #[serde(default = "default_count")]
    count: u32,
}

fn default_count() -> u32 {
    10
}

async fn latest_ticks(
    State(state): State<Arc<ApiState>>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<LatestParams>, QueryRejection>,
) -> Result<Json<Vec<Ticker>>, ApiError> {
    let Path(source) = path.map_err(|e| StoreError::InvalidArgument(e.body_text()))?;
    let Query(params) = query.map_err(|e| StoreError::InvalidArgument(e.body_text()))?;
    let source: Source = source.parse()?;
    let ticks = state.store.find_latest_ticks(source, params.count).await?;
    Ok(Json(ticks))
}

async fn tick_at(
    State(state): State<Arc<ApiState>>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> Result<Json<Ticker>, ApiError> {
    let Path((source, timestamp)) =
        path.map_err(|e| StoreError::InvalidArgument(e.body_text()))?;
    let source: Source = source.parse()?;
    let tick = state.store.find_tick_at(source, timestamp).await?;
    Ok(Json(tick))
}

/// The window minimum is taken over the column that records the
/// series' low: the bitstamp hourly low or the coinbase candle low.
/// Sources without a low column are rejected by the store. The
/// response row keeps the shape of its series.
async fn lowest_in_window(
    State(state): State<Arc<ApiState>>,
    path: Result<Path<(String, i64, i64)>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path((source, start, end)) =
        path.map_err(|e| StoreError::InvalidArgument(e.body_text()))?;
    let source: Source = source.parse()?;
    let response = match source {
        Source::Coinbase => {
            let candle = state
                .store
                .find_lowest_candle(CandleSeries::Coinbase, MinColumn::Low, start, end)
                .await?;
            Json(candle).into_response()
        }
        Source::Brti | Source::Bitstamp => {
            let tick = state
                .store
                .find_lowest_tick(source, MinColumn::Low, start, end)
                .await?;
            Json(tick).into_response()
        }
    };
    Ok(response)
}

async fn latest_candles(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<LatestParams>, QueryRejection>,
) -> Result<Json<Vec<Candle>>, ApiError> {
    let Query(params) = query.map_err(|e| StoreError::InvalidArgument(e.body_text()))?;
    let candles = state
        .store
        .find_latest_candles(CandleSeries::Coinbase, params.count)
        .await?;
    Ok(Json(candles))
}
