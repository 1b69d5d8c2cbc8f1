//! The closed error taxonomy shared by the state machine, the dispatcher, and the transport.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Renders a Unix timestamp as an RFC 3339 string for error messages; falls back to the
/// raw integer if it's out of `chrono`'s representable range.
fn format_unix(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("escrow {0} does not exist")]
    NotFound(uuid::Uuid),

    #[error("operation not permitted in current status: {0}")]
    InvalidState(String),

    #[error("hashlock mismatch")]
    InvalidSecret,

    #[error("caller is not authorized to perform this action")]
    Unauthorized,

    #[error("not available until {} ({opens_at})", format_unix(*opens_at))]
    NotYetOpen { opens_at: i64 },

    #[error("action window closed at {} ({closed_at})", format_unix(*closed_at))]
    WindowClosed { closed_at: i64 },

    #[error("insufficient funding: required {required}, received {received}")]
    InsufficientFunding { required: String, received: String },

    #[error("invalid transaction {tx_id}: {reason}")]
    InvalidTransaction { tx_id: String, reason: String },

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("ledger call timed out: {0}")]
    LedgerTimeout(String),

    #[error("settlement failed: {0}")]
    SettlementFailed(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidState(_) => "InvalidState",
            AppError::InvalidSecret => "InvalidSecret",
            AppError::Unauthorized => "Unauthorized",
            AppError::NotYetOpen { .. } => "NotYetOpen",
            AppError::WindowClosed { .. } => "WindowClosed",
            AppError::InsufficientFunding { .. } => "InsufficientFunding",
            AppError::InvalidTransaction { .. } => "InvalidTransaction",
            AppError::LedgerUnavailable(_) => "LedgerUnavailable",
            AppError::LedgerTimeout(_) => "LedgerTimeout",
            AppError::SettlementFailed(_) => "SettlementFailed",
            AppError::InvalidParameters(_) => "InvalidParameters",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_)
            | AppError::InvalidSecret
            | AppError::InvalidParameters(_)
            | AppError::InvalidTransaction { .. }
            | AppError::InsufficientFunding { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::NotYetOpen { .. } | AppError::WindowClosed { .. } => StatusCode::CONFLICT,
            AppError::LedgerUnavailable(_) | AppError::LedgerTimeout(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::SettlementFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(detail) => {
                AppError::InvalidTransaction { tx_id: detail, reason: "not found".into() }
            }
            LedgerError::NotValidated(tx_id) => AppError::InvalidTransaction {
                tx_id,
                reason: "not yet validated".into(),
            },
            LedgerError::Network(detail) => AppError::LedgerUnavailable(detail),
            LedgerError::Timeout(detail) => AppError::LedgerTimeout(detail),
            LedgerError::Signing(detail) => AppError::SettlementFailed(detail),
            LedgerError::Rejected(detail) => AppError::SettlementFailed(detail),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            kind: self.kind(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
