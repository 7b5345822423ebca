//! HTTP front of the faucet.
//!
//! A single endpoint, `POST /`, takes `{"beneficiary": "<address>@<chain>"}`
//! and answers with `{"txHash": …}` or `{"error": …}`.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::{error::DispatchError, fill::FillOutcome, registry::FaucetRegistry};

/// Body of a fill request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FillRequest {
    /// `<address>@<chain>`.
    pub beneficiary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillResponse {
    pub tx_hash: TxHash,
}

/// A beneficiary split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub address: Address,
    pub chain: String,
}

/// Splits `<address>@<chain>`. Exactly one `@` is allowed, both halves must
/// be non-empty and the address must be 20 hex bytes.
pub fn parse_target(beneficiary: &str) -> Result<Target, String> {
    let mut parts = beneficiary.split('@');
    let (Some(address), Some(chain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("beneficiary `{beneficiary}` is not of the form address@chain"));
    };

    if address.is_empty() {
        return Err("beneficiary address is empty".to_string());
    }
    if chain.is_empty() {
        return Err("beneficiary chain is empty".to_string());
    }
    let address = address
        .parse::<Address>()
        .map_err(|e| format!("invalid beneficiary address `{address}`: {e}"))?;

    Ok(Target {
        address,
        chain: chain.to_string(),
    })
}

/// Rejections a fill request can end in.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body or unknown chain.
    BadRequest(String),
    AlreadyFunded,
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyFunded => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(message) | Self::Internal(message) => message,
            Self::AlreadyFunded => "Beneficiary already has enough balance.",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(error: DispatchError) -> Self {
        Self::Internal(error.redacted())
    }
}

/// The faucet's routes over `registry`, with permissive CORS.
pub fn router(registry: Arc<FaucetRegistry>) -> Router {
    Router::new()
        .route("/", post(handle_fill))
        .layer(CorsLayer::permissive())
        .with_state(registry)
}

/// Serves the faucet on `listener` until the process stops.
pub async fn serve(listener: TcpListener, registry: Arc<FaucetRegistry>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, chains = ?registry.chains(), "serving faucet");
    }
    axum::serve(listener, router(registry)).await
}

async fn handle_fill(
    State(registry): State<Arc<FaucetRegistry>>,
    body: Bytes,
) -> Result<Json<FillResponse>, ApiError> {
    let request: FillRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "malformed fill request");
        ApiError::BadRequest(format!("invalid request body: {e}"))
    })?;
    let target = parse_target(&request.beneficiary).map_err(|message| {
        tracing::warn!(beneficiary = %request.beneficiary, error = %message, "malformed beneficiary");
        ApiError::BadRequest(message)
    })?;

    let Some(faucet) = registry.get(&target.chain).cloned() else {
        tracing::warn!(chain = %target.chain, "fill requested for unknown chain");
        return Err(ApiError::BadRequest(format!(
            "chain `{}` is not served by this faucet",
            target.chain
        )));
    };

    let beneficiary = target.address;
    // The fill outlives the request, a client hanging up must not abandon a
    // reserved nonce mid-flight.
    let fill = tokio::spawn(async move { faucet.fill(beneficiary).await });
    let outcome = fill.await.map_err(|e| {
        tracing::error!(chain = %target.chain, %beneficiary, error = %e, "fill task failed");
        ApiError::Internal("fill task failed".to_string())
    })?;

    match outcome {
        Ok(FillOutcome::Sent(tx_hash)) => Ok(Json(FillResponse { tx_hash })),
        Ok(FillOutcome::AlreadyFunded { balance }) => {
            tracing::warn!(chain = %target.chain, %beneficiary, %balance, "declined fill, already funded");
            Err(ApiError::AlreadyFunded)
        }
        Err(error) => {
            tracing::error!(chain = %target.chain, %beneficiary, %error, "fill failed");
            Err(error.into())
        }
    }
}
