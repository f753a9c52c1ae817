//! Error types for the ticker service

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("payload parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field format error: {0}")]
    Format(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
