use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use kq_bus::Pusher;
use kq_prometheus::PrometheusMetrics;
use serde::Serialize;
use taskvisor::{TaskError, TaskFn, TaskRef};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const SLOT: &str = "kq-http";

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self {
            HttpError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct AcceptedResponse {
    accepted: bool,
}

#[derive(Clone)]
struct AppState {
    metrics: PrometheusMetrics,
    heartbeats: Arc<dyn Pusher>,
}

/// Routes:
/// - GET /metrics - Prometheus text exposition
/// - POST /v1/heartbeat - remote node heartbeat into the scheduler pipeline
pub fn router(metrics: PrometheusMetrics, heartbeats: Arc<dyn Pusher>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/v1/heartbeat", post(heartbeat_handler))
        .with_state(AppState {
            metrics,
            heartbeats,
        })
}

/// Bind `listen` and serve `app` until the run is cancelled.
///
/// Bind and serve failures fail the run, so the supervisor retries with backoff.
pub fn serve_task(listen: String, app: Router) -> TaskRef {
    let task: TaskRef = TaskFn::arc(SLOT, move |ctx: CancellationToken| {
        let listen = listen.clone();
        let app = app.clone();

        async move {
            let listener = tokio::net::TcpListener::bind(&listen)
                .await
                .map_err(|e| TaskError::Fail {
                    reason: format!("bind {listen}: {e}"),
                })?;
            info!(%listen, "http listening (/metrics, /v1/heartbeat)");

            axum::serve(listener, app)
                .with_graceful_shutdown(async move { ctx.cancelled().await })
                .await
                .map_err(|e| TaskError::Fail {
                    reason: format!("http server: {e}"),
                })
        }
    });
    task
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Result<Response, HttpError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| HttpError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body).into_response())
}

/// POST /v1/heartbeat
async fn heartbeat_handler(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, HttpError> {
    let serde_json::Value::Object(payload) = body else {
        return Err(HttpError::InvalidRequest("heartbeat must be a JSON object".into()));
    };
    debug!(node = ?payload.get("node"), "remote heartbeat received");

    state
        .heartbeats
        .push(payload)
        .await
        .map_err(|e| HttpError::Internal(e.to_string()))?;

    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true })))
}
