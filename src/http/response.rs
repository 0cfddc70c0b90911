//! Error responses.
//!
//! Every failure leaves the API as `{"error": "..."}` with a status code
//! chosen by error kind.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::minting::MintError;
use crate::wallet::SessionError;

/// An error ready to be sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Status code for a mint failure.
pub fn mint_error_status(error: &MintError) -> StatusCode {
    match error {
        MintError::NotConnected => StatusCode::PRECONDITION_FAILED,
        MintError::InvalidForm(_) => StatusCode::BAD_REQUEST,
        MintError::AlreadyRunning
        | MintError::PendingCheckpoint { .. }
        | MintError::Conflict(_) => StatusCode::CONFLICT,
        MintError::Unfunded { .. } => StatusCode::PAYMENT_REQUIRED,
        MintError::Ledger(_) => StatusCode::BAD_GATEWAY,
        MintError::Custody(_) | MintError::Checkpoint(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<MintError> for ApiError {
    fn from(error: MintError) -> Self {
        Self::new(mint_error_status(&error), error.user_message())
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
