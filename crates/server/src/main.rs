use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use client_core::{
    config::{load_settings, DEFAULT_CONFIG_FILE},
    AnalysisOutcome, Controller, HttpClassifier, Presenter, ViewState,
};
use dataset::source_from_location;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::AnalyzeRequest,
};
use tokio::sync::{watch, Mutex};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;

/// Concurrent requests queue on the controller lock and complete in
/// arrival order. `view` always holds the last rendered frame, so status
/// reads never wait on the lock.
#[derive(Clone)]
struct AppState {
    controller: Arc<Mutex<Controller>>,
    view: watch::Receiver<ViewState>,
    default_token: Option<String>,
}

impl AppState {
    fn new(controller: Controller, default_token: Option<String>) -> Self {
        let (tx, view) = watch::channel(controller.view().clone());
        let controller = controller.with_presenter(Box::new(ViewPublisher(tx)));
        Self {
            controller: Arc::new(Mutex::new(controller)),
            view,
            default_token,
        }
    }
}

struct ViewPublisher(watch::Sender<ViewState>);

impl Presenter for ViewPublisher {
    fn render(&mut self, view: &ViewState) {
        self.0.send_replace(view.clone());
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var("SENTIMENT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    let settings = load_settings(&config_path);
    settings.validate()?;

    let controller = Controller::new(
        source_from_location(&settings.dataset),
        Arc::new(HttpClassifier::new(settings.classifier_url.clone())),
    );
    let state = AppState::new(controller, settings.token().map(str::to_string));
    if let Err(error) = state.controller.lock().await.load().await {
        warn!(%error, dataset = %settings.dataset, "initial dataset load failed; use /api/reload");
    }
    let app = build_router(state);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/status", get(status))
        .route("/api/reload", post(reload))
        .route("/api/analyze", post(analyze))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn status(State(state): State<AppState>) -> Json<ViewState> {
    Json(state.view.borrow().clone())
}

async fn reload(State(state): State<AppState>) -> ApiResult<ViewState> {
    let mut controller = state.controller.lock().await;
    match controller.load().await {
        Ok(_) => Ok(Json(controller.view().clone())),
        Err(err) => Err((status_for(err.code()), Json(ApiError::from(&err)))),
    }
}

async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ViewState> {
    let request = parse_analyze_request(&body)?;
    let token = request
        .token
        .or_else(|| bearer_token(&headers))
        .or_else(|| state.default_token.clone());

    let mut controller = state.controller.lock().await;
    match controller.analyze(token.as_deref()).await {
        AnalysisOutcome::Rendered { .. } => Ok(Json(controller.view().clone())),
        AnalysisOutcome::Failed(err) => Err((status_for(err.code()), Json(ApiError::from(&err)))),
    }
}

fn parse_analyze_request(body: &[u8]) -> Result<AnalyzeRequest, (StatusCode, Json<ApiError>)> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AnalyzeRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(ErrorCode::Validation, e.to_string())),
        )
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotLoaded => StatusCode::CONFLICT,
        ErrorCode::DatasetEmpty => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::ModelLoading => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::DatasetUnavailable
        | ErrorCode::Network
        | ErrorCode::Upstream
        | ErrorCode::InvalidResponse => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
