//! HTTP surface: an axum router around [`crate::generate`].
//!
//! ```text
//! GET  /, /health          plaintext liveness message
//! POST /gerar-simulado     JSON exam → DOCX attachment
//! POST /generate           alias of the above
//! ```
//!
//! Generation is CPU-bound (chart rasterisation, PNG and zip encoding), so each
//! request runs the pipeline on `spawn_blocking`. The only state shared between
//! requests is the immutable [`AppState`].

use crate::config::{GeneratorConfig, ServerConfig};
use crate::error::SimuladoError;
use crate::generate::{generate_from_bytes, GeneratedDocument};
use crate::pipeline::chart::ChartRenderer;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const HEALTH_MESSAGE: &str = "Exam API online! Send a POST to /gerar-simulado";

/// Shared, read-only state for all requests.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: GeneratorConfig,
    pub charts: ChartRenderer,
}

impl AppState {
    /// Build state with a chart renderer backed by the system fonts.
    pub fn new(config: GeneratorConfig) -> Self {
        let charts = ChartRenderer::new(&config);
        Self { config, charts }
    }
}

/// Error response for the generation endpoint.
///
/// Input problems map to `400`, everything else to `500`; the body is always
/// `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub SimuladoError);

impl From<SimuladoError> for ApiError {
    fn from(e: SimuladoError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.0.is_client_error() {
            warn!("Rejected request: {}", self.0);
            (StatusCode::BAD_REQUEST, self.0.to_string())
        } else {
            error!("Generation failed: {}", self.0);
            let message = match &self.0 {
                SimuladoError::Internal(_) => self.0.to_string(),
                other => format!("Internal error: {other}"),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, message)
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/gerar-simulado", post(generate_exam))
        .route("/generate", post(generate_exam))
        .layer(DefaultBodyLimit::max(server.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, server: ServerConfig) -> std::io::Result<()> {
    let addr = server.socket_addr();
    let app = router(state, &server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Exam API listening on http://{}", addr);
    axum::serve(listener, app).await
}

async fn health() -> &'static str {
    HEALTH_MESSAGE
}

async fn generate_exam(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let generated = tokio::task::spawn_blocking(move || {
        generate_from_bytes(&body, &state.charts, &state.config)
    })
    .await
    .map_err(|e| SimuladoError::Internal(format!("generation worker failed: {e}")))??;

    attachment(generated)
}

fn attachment(doc: GeneratedDocument) -> Result<Response, ApiError> {
    // Non-ASCII subjects are sent as raw UTF-8, which `from_bytes` accepts.
    let disposition =
        HeaderValue::from_bytes(format!("attachment; filename=\"{}\"", doc.filename).as_bytes())
            .map_err(|e| SimuladoError::Internal(format!("invalid filename header: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(doc.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        doc.bytes,
    )
        .into_response())
}
