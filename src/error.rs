use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Chain query error: {0}")]
    Chain(#[from] ChainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures talking to the chain's query interface. Always fatal to a cycle.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("RPC transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    MalformedResponse(String),
}

/// Per-transaction decode failures. The scanner logs and skips these.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("tx_log payload is not valid JSON: {0}")]
    MalformedLog(#[from] serde_json::Error),

    #[error("tx_log data is not valid base64: {0}")]
    MalformedLogData(#[from] base64::DecodeError),

    #[error("tx_log topic {index} is not valid hex: {topic}")]
    MalformedTopic { index: usize, topic: String },

    #[error("log amount does not fit in 256 bits ({0} bytes)")]
    AmountOverflow(usize),

    #[error("log amount {0} is not a decimal")]
    LogAmount(String),

    #[error("transfer amount: {0}")]
    Amount(#[from] AmountError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("empty address string is not allowed")]
    Empty,

    #[error("bech32 prefix mismatch: expected {expected}, found {found}")]
    PrefixMismatch { expected: String, found: String },

    #[error("address payload must be 20 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid address {0}: must provide bech32 or hex address")]
    Unrecognized(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount string {0:?}: missing magnitude")]
    MissingMagnitude(String),

    #[error("invalid amount string {0:?}: missing denomination")]
    MissingDenom(String),

    #[error("invalid amount string {0:?}: bad denomination")]
    InvalidDenom(String),
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
                None,
            ),
            AppError::Conflict(what) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                what,
                None,
            ),
            AppError::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                msg,
                None,
            ),
            AppError::InvalidAddress(err) => (
                StatusCode::BAD_REQUEST,
                "INVALID_ADDRESS",
                err.to_string(),
                None,
            ),
            AppError::RateLimited(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                msg,
                None,
            ),
            AppError::Chain(err) => (
                StatusCode::BAD_GATEWAY,
                "CHAIN_UNAVAILABLE",
                "The chain query interface is unavailable".to_string(),
                Some(serde_json::json!({ "cause": err.to_string() })),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
