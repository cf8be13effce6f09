//! Error types shared by the library modules.

use thiserror::Error;

/// Errors raised by data loading, model fitting, the oracle and the engine
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("insufficient data: need at least {needed} bars, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("data error: {0}")]
    Data(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("oracle error: {0}")]
    Oracle(String),

    #[error("JSON-RPC error: code={code}, message={message}")]
    Rpc { code: i64, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, RiskError>;
