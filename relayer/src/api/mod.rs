//! HTTP API for health checks and bet relaying

use crate::amount::format_usdc_amount;
use crate::config::ApiConfig;
use crate::error::{RelayerError, RelayerResult};
use crate::relay::{RelayEngine, RelayFailure, RelayRequest, RelayState};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RelayEngine>,
}

/// Routes, without binding a socket
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/relay", post(relay_bet))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, engine: Arc<RelayEngine>) -> RelayerResult<()> {
    let app = router(AppState { engine });

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayerError::Config(format!("cannot bind API address {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| RelayerError::Internal(format!("API server stopped: {}", e)))
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check - the RPC node answers and is not catching up
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.engine.session();
    let (rpc_reachable, syncing, latest_block_height) = match state.engine.rpc().status().await {
        Ok(status) => (
            true,
            status.sync_info.syncing,
            Some(status.sync_info.latest_block_height),
        ),
        Err(_) => (false, false, None),
    };
    let ready = rpc_reachable && !syncing;

    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(ReadinessResponse {
            ready,
            rpc_reachable,
            syncing,
            latest_block_height,
            network_id: session.network_id().to_string(),
            relayer_account_id: session.account_id().to_string(),
        }),
    )
}

/// Place one bet through the proxy contract
async fn relay_bet(State(state): State<AppState>, Json(request): Json<RelayRequest>) -> Response {
    let amount_display = format_usdc_amount(&request.amount, 2);

    match state.engine.relay_bet(request).await {
        Ok(result) => (
            StatusCode::OK,
            Json(RelaySuccessResponse {
                relay_id: result.relay_id.to_string(),
                transaction_hash: result.outcome.transaction_hash.clone(),
                proxy_transaction_hash: result.proxy_transaction_hash,
                amount_display,
                outcome: result.outcome.raw,
            }),
        )
            .into_response(),
        Err(failure) => {
            (status_for(&failure), Json(RelayErrorResponse::from(&failure))).into_response()
        }
    }
}

/// HTTP status for a failed relay
fn status_for(failure: &RelayFailure) -> StatusCode {
    match &failure.error {
        RelayerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        RelayerError::NotFound { .. } => StatusCode::NOT_FOUND,
        RelayerError::ProxyExecution(_)
        | RelayerError::BroadcastExecution(_)
        | RelayerError::MalformedPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RelayerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        RelayerError::Rpc { .. } => StatusCode::BAD_GATEWAY,
        RelayerError::Config(_) | RelayerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    rpc_reachable: bool,
    syncing: bool,
    latest_block_height: Option<u64>,
    network_id: String,
    relayer_account_id: String,
}

#[derive(Serialize)]
struct RelaySuccessResponse {
    relay_id: String,
    transaction_hash: String,
    proxy_transaction_hash: String,
    amount_display: String,
    outcome: Value,
}

#[derive(Serialize)]
struct RelayErrorResponse {
    error: String,
    kind: &'static str,
    state: RelayState,
    uncertain: bool,
    retryable: bool,
    failing_receipt_id: Option<String>,
}

impl From<&RelayFailure> for RelayErrorResponse {
    fn from(failure: &RelayFailure) -> Self {
        Self {
            error: failure.error.to_string(),
            kind: failure.error.kind(),
            state: failure.state,
            uncertain: failure.is_uncertain(),
            retryable: !failure.is_uncertain() && failure.error.is_retryable(),
            failing_receipt_id: failure
                .error
                .failing_receipt()
                .map(|receipt| receipt.receipt_id.clone()),
        }
    }
}
