//! JSON API handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::http::page::INDEX_HTML;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::minting::MintForm;
use crate::wallet::{SessionInfo, WalletSession};

/// Body of `POST /api/wallet/connect`.
#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub public_key: String,
}

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /health`: is the ledger reachable.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.health().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Ledger health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": e.to_string() })),
            )
        }
    }
}

/// `GET /api/wallet`
pub async fn wallet(State(state): State<AppState>) -> Json<SessionInfo> {
    Json(state.minter.session().info())
}

/// `POST /api/wallet/connect`
pub async fn connect_wallet(
    State(state): State<AppState>,
    body: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<SessionInfo>, ApiError> {
    let Json(request) = body?;
    let key = WalletSession::parse_public_key(&request.public_key)?;
    let session = state.minter.session();
    session.connect(key);
    Ok(Json(session.info()))
}

/// `POST /api/wallet/disconnect`
pub async fn disconnect_wallet(State(state): State<AppState>) -> Json<SessionInfo> {
    let session = state.minter.session();
    session.disconnect();
    Json(session.info())
}

/// `POST /api/mint`: start an attempt, progress follows on the event stream.
pub async fn start_mint(
    State(state): State<AppState>,
    body: Result<Json<MintForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = body?;
    let attempt = state.minter.start(form)?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "attempt": attempt }))))
}

/// `POST /api/mint/check`: whether the page may enable its submit button.
///
/// Submit needs a name, a symbol and a connected wallet. Other field
/// problems are reported when the mint is started.
pub async fn check_form(
    State(state): State<AppState>,
    body: Result<Json<MintForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = body?;
    let form = form.normalized();
    let connected = state.minter.session().connected();
    Ok(Json(json!({
        "can_submit": form.can_submit(connected),
        "symbol": form.symbol,
    })))
}

/// `GET /api/status`
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.minter.board().snapshot())
}

/// `GET /api/checkpoint`: the unfinished attempt, if any.
pub async fn checkpoint(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let pending = state.minter.pending()?;
    Ok(Json(json!({ "pending": pending })))
}

/// `DELETE /api/checkpoint`: abandon the unfinished attempt.
pub async fn abandon(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let mint = state.minter.abandon()?;
    Ok(Json(json!({ "abandoned": mint.map(|m| m.to_string()) })))
}

/// `GET /api/authority`: address that pays fees, with its balance.
///
/// The first call generates and stores the authority keypair so it can be
/// funded before minting. Repeated calls return the same address.
pub async fn authority(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let address = state.minter.authority()?;
    let lamports = state
        .ledger
        .balance(&address)
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(Json(json!({
        "authority": address.to_string(),
        "lamports": lamports,
    })))
}
