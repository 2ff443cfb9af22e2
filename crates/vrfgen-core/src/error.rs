//! Error types for vrfgen-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Curve arithmetic error: {0}")]
    Curve(String),

    #[error("Proof construction failed: {0}")]
    ProofConstruction(String),

    #[error("Invalid curve point: {0}")]
    InvalidPoint(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
