//! HTTP import server for mdgraph.
//!
//! Accepts whole snapshots (`meta`, `objects`, `relations`) over HTTP and
//! imports them through the graph control plane.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use mdgraph_core::control::{CallScope, ControlError, GraphControlPlane, ImportReport};
use mdgraph_core::snapshot::SnapshotError;
use mdgraph_store::models::{Keyed, Snapshot};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;
use tracing::{info, warn};

const USAGE: &str = "mdgraph ingest server

GET  /health  liveness probe, returns ok
POST /import  body {\"meta\": {...}, \"objects\": [...], \"relations\": [...]}
              imports the snapshot and returns a summary
";

/// Configuration for the ingest HTTP server.
#[derive(Debug, Clone)]
pub struct IngestServerConfig {
    pub addr: SocketAddr,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
}

impl IngestServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            max_body_bytes: 64 * 1024 * 1024,
            request_timeout: Duration::from_secs(120),
        }
    }

    #[must_use]
    pub const fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

impl Default for IngestServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 4010)))
    }
}

/// HTTP ingest server wrapper.
pub struct IngestServer<C: Connection> {
    config: IngestServerConfig,
    state: AppState<C>,
}

impl<C: Connection> IngestServer<C> {
    #[must_use]
    pub const fn new(control: GraphControlPlane<C>, config: IngestServerConfig) -> Self {
        let state = AppState {
            control,
            request_timeout: config.request_timeout,
        };
        Self { config, state }
    }
}

impl<C> IngestServer<C>
where
    C: Connection + Send + Sync + 'static,
{
    /// Returns the router without binding a listener.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.config.max_body_bytes)
    }

    /// Runs the HTTP server until shutdown.
    ///
    /// # Errors
    /// Returns any listener or server error.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.addr;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let app = build_router(self.state, self.config.max_body_bytes);

        info!("mdgraph-ingest listening on {addr}");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

struct AppState<C: Connection> {
    control: GraphControlPlane<C>,
    request_timeout: Duration,
}

impl<C: Connection> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            control: self.control.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn timeout() -> Self {
        Self {
            status: StatusCode::REQUEST_TIMEOUT,
            message: "import request timed out".to_string(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Validation(message) => Self::bad_request(message),
            ControlError::Store(err) if err.is_invalid_input() => Self::bad_request(err.to_string()),
            ControlError::Snapshot(
                err @ (SnapshotError::NotFound { .. }
                | SnapshotError::PathEscape { .. }
                | SnapshotError::Parse { .. }),
            ) => Self::bad_request(err.to_string()),
            ControlError::DeadlineExceeded | ControlError::Canceled => Self::timeout(),
            ControlError::Snapshot(err) => Self::internal(err.to_string()),
            ControlError::Store(err) => Self::internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            StatusCode::PAYLOAD_TOO_LARGE
        } else {
            StatusCode::BAD_REQUEST
        };
        Self {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "import failed");
        }
        let payload = Json(ErrorResponse { error: self.message });
        (self.status, payload).into_response()
    }
}

/// Body of a successful `POST /import`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: ImportReport,
}

fn build_router<C>(state: AppState<C>, max_body_bytes: usize) -> Router
where
    C: Connection + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(usage))
        .route("/health", get(health))
        .route("/import", post(import::<C>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn usage() -> &'static str {
    USAGE
}

async fn health() -> &'static str {
    "ok"
}

async fn import<C>(
    State(state): State<AppState<C>>,
    payload: Result<Json<Keyed<Snapshot>>, JsonRejection>,
) -> Result<Json<ImportResponse>, ApiError>
where
    C: Connection + Send + Sync + 'static,
{
    let Json(snapshot) = payload?;
    let scope = CallScope::with_timeout(state.request_timeout);
    let report = state
        .control
        .import_snapshot(&scope, snapshot.into_inner())
        .await?;
    Ok(Json(ImportResponse { ok: true, report }))
}
