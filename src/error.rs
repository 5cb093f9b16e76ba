//! Errors surfaced by `AppStore` operations.
//!
//! Rejected input never reaches the backend; backend failures carry the
//! underlying anyhow chain.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Backend request failed: {0:#}")]
    Backend(anyhow::Error),

    #[error("Invalid import document: {0}")]
    Import(#[from] serde_json::Error),

    #[error("Time calculation failed: {0:#}")]
    Time(anyhow::Error),
}

impl From<anyhow::Error> for StoreError {
    fn from(value: anyhow::Error) -> Self {
        Self::Backend(value)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
