//! HTTP API for the routing service.
//!
//! Endpoints:
//! - `POST /api/v1/route` - route computation
//! - `POST /api/v1/instruction` - instruction-based swap submission
//! - `GET /health` - health check

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use lib_schemas::DEFAULT_SLIPPAGE_BPS;
use lib_types::{Account, AssetId};

use crate::directory::PoolDirectory;
use crate::errors::RouterError;
use crate::executor::DexExecutor;
use crate::service::{RouteQuery, RouterService};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Build the axum router over a routing service.
pub fn build_router<D, E>(service: Arc<RouterService<D, E>>) -> Router
where
    D: PoolDirectory + Send + Sync + 'static,
    E: DexExecutor + Send + Sync + 'static,
{
    Router::new()
        .route("/api/v1/route", post(handle_compute_route::<D, E>))
        .route("/api/v1/instruction", post(handle_execute_instruction::<D, E>))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(service)
}

/// Serve until ctrl-c.
pub async fn serve<D, E>(service: Arc<RouterService<D, E>>, port: u16) -> anyhow::Result<()>
where
    D: PoolDirectory + Send + Sync + 'static,
    E: DexExecutor + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "router service listening");
    axum::serve(listener, build_router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down router service");
        })
        .await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteBody {
    from_asset: String,
    to_asset: String,
    amount: u64,
    #[serde(default)]
    min_out: u64,
    #[serde(default)]
    slippage_bps: Option<u16>,
    #[serde(default)]
    sender: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstructionBody {
    instruction: serde_json::Value,
    amount_in: u64,
}

async fn handle_compute_route<D, E>(
    State(service): State<Arc<RouterService<D, E>>>,
    Json(body): Json<RouteBody>,
) -> Response
where
    D: PoolDirectory + Send + Sync + 'static,
    E: DexExecutor + Send + Sync + 'static,
{
    let query = RouteQuery {
        from_asset: AssetId::new(body.from_asset),
        to_asset: AssetId::new(body.to_asset),
        amount: body.amount,
        min_out: body.min_out,
        slippage_bps: body.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS),
        sender: body.sender.map(Account::new),
    };
    match service.compute_route(&query).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(err),
    }
}

async fn handle_execute_instruction<D, E>(
    State(service): State<Arc<RouterService<D, E>>>,
    Json(body): Json<InstructionBody>,
) -> Response
where
    D: PoolDirectory + Send + Sync + 'static,
    E: DexExecutor + Send + Sync + 'static,
{
    if body.amount_in == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "amountIn must be greater than 0"})),
        )
            .into_response();
    }
    let raw = match serde_json::to_vec(&body.instruction) {
        Ok(raw) => raw,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("invalid instruction: {err}")})),
            )
                .into_response()
        }
    };
    match service.execute_instruction(&raw, body.amount_in).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(err),
    }
}

async fn handle_health() -> Response {
    Json(json!({"status": "healthy", "service": "dex-router"})).into_response()
}

/// Validation problems are the client's fault; upstream failures are not.
fn error_response(err: RouterError) -> Response {
    let status = match &err {
        RouterError::Schema(_) | RouterError::Amm(_) => StatusCode::BAD_REQUEST,
        RouterError::Indexer(_)
        | RouterError::IndexerStatus(_)
        | RouterError::Decode(_)
        | RouterError::Executor(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({"error": err.to_string()}))).into_response()
}
