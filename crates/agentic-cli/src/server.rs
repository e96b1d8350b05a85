//! # HTTP Server
//!
//! axum routes over [`AgentService`]:
//!
//! - `GET /` health check
//! - `POST /v1/agent/execute` (form) one cycle of a session
//! - `POST /v1/agent/validate_action` (JSON)
//! - `POST /v1/agent/validate_completion` (JSON)

use crate::api::{ErrorBody, TaskRequest, ValidateActionRequest, ValidateCompletionRequest};
use crate::service::{AgentService, ServiceError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::ValidatorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Model(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(service: Arc<AgentService>) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/v1/agent/execute", post(execute_handler))
        .route("/v1/agent/validate_action", post(validate_action_handler))
        .route("/v1/agent/validate_completion", post(validate_completion_handler))
        .with_state(service)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "agentic",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn execute_handler(
    State(service): State<Arc<AgentService>>,
    Form(request): Form<TaskRequest>,
) -> Result<Response, ServiceError> {
    Ok(Json(service.execute(request).await?).into_response())
}

async fn validate_action_handler(
    State(service): State<Arc<AgentService>>,
    Json(request): Json<ValidateActionRequest>,
) -> Result<Response, ServiceError> {
    let verdict = service
        .validate_action(&request.screenshot_base64, &request.desired_outcome)
        .await?;
    Ok(Json(verdict).into_response())
}

async fn validate_completion_handler(
    State(service): State<Arc<AgentService>>,
    Json(request): Json<ValidateCompletionRequest>,
) -> Result<Response, ServiceError> {
    let verdict = service
        .validate_completion(&request.goal, &request.screen_description)
        .await?;
    Ok(Json(verdict).into_response())
}

/// Periodically stop sessions that clients stopped triggering
fn spawn_session_sweeper(service: Arc<AgentService>, ttl: Duration) -> tokio::task::JoinHandle<()> {
    let period = (ttl / 2).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = service.evict_idle().await;
            if evicted > 0 {
                debug!("Evicted {} idle session(s)", evicted);
            }
        }
    })
}

/// Serve until Ctrl-C, then stop every live automation session
pub async fn serve(service: Arc<AgentService>, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    let sweeper = service
        .session_ttl()
        .map(|ttl| spawn_session_sweeper(service.clone(), ttl));

    axum::serve(listener, router(service.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    service.shutdown().await;
    Ok(())
}
