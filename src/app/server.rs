use crate::config::PoolConfig;
use crate::core::bootstrap::PoolBootstrap;
use crate::domain::model::BootstrapOutcome;
use crate::domain::ports::LedgerClientFactory;
use crate::utils::error::BootstrapError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 服務狀態：每個請求由 factory 建立獨立的帳本客戶端
pub struct AppState<F> {
    factory: F,
    pool: PoolConfig,
}

impl<F: LedgerClientFactory> AppState<F> {
    pub fn new(factory: F, pool: PoolConfig) -> Self {
        Self { factory, pool }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAmmResponse {
    pub amm_hash: String,
    pub lp_wallet: String,
    pub issuer_wallet: String,
    pub token_hex: String,
}

impl From<&BootstrapOutcome> for CreateAmmResponse {
    fn from(outcome: &BootstrapOutcome) -> Self {
        Self {
            amm_hash: outcome.pool_transaction_hash.clone(),
            lp_wallet: outcome.lp_address.clone(),
            issuer_wallet: outcome.issuer_address.clone(),
            token_hex: outcome.token_currency.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router<F>(state: Arc<AppState<F>>) -> Router
where
    F: LedgerClientFactory + 'static,
{
    Router::new()
        .route("/api/create-amm", get(create_amm::<F>))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn serve<F>(listener: tokio::net::TcpListener, state: Arc<AppState<F>>) -> std::io::Result<()>
where
    F: LedgerClientFactory + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutdown signal received");
}

async fn health() -> &'static str {
    "ok"
}

async fn create_amm<F>(State(state): State<Arc<AppState<F>>>) -> Response
where
    F: LedgerClientFactory + 'static,
{
    tracing::info!("🚀 GET /api/create-amm");

    let client = match state.factory.create() {
        Ok(client) => client,
        Err(source) => return error_response(BootstrapError::Connection { source }),
    };

    let bootstrap = PoolBootstrap::new(client, state.pool.clone());
    match bootstrap.run().await {
        Ok(outcome) => (StatusCode::OK, Json(CreateAmmResponse::from(&outcome))).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: BootstrapError) -> Response {
    tracing::error!("❌ create-amm failed at {}: {}", e.step(), e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}
