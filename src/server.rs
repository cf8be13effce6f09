//! HTTP surface: chat, snapshot, on-demand risk, avatar and health routes.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Query, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::agent::LLMProvider;
use crate::avatar::{AvatarView, RiskAvatarManager};
use crate::chat::intent::MAX_HORIZON_HOURS;
use crate::chat::{ChatError, ChatReply, ChatRouter};
use crate::config::Settings;
use crate::desk::{self, RiskDesk};
use crate::engine::{RiskAppetite, RiskAssessment};
use crate::oracle::PriceSource;
use crate::safety::{GuardError, SafetyGuard};
use crate::snapshot::{self, Snapshot};

pub struct ServerError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ServerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error: anyhow::anyhow!(message.into()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.error, "request failed");
        }
        (self.status, Json(json!({ "error": self.error.to_string() }))).into_response()
    }
}

impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}

fn chat_error(err: ChatError) -> ServerError {
    let status = match &err {
        ChatError::Guard(GuardError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
        ChatError::Guard(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ChatError::Provider(_) => StatusCode::BAD_GATEWAY,
    };
    ServerError::new(status, err.to_string())
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub provider: Arc<dyn LLMProvider>,
    pub desk: Option<Arc<RiskDesk>>,
    pub chat: Arc<ChatRouter>,
    pub price_source: Option<Arc<dyn PriceSource>>,
    pub avatar: Arc<RwLock<RiskAvatarManager>>,
    pub snapshot_path: PathBuf,
}

impl AppState {
    pub fn new(
        settings: Settings,
        provider: Arc<dyn LLMProvider>,
        desk: Option<Arc<RiskDesk>>,
        price_source: Option<Arc<dyn PriceSource>>,
    ) -> Self {
        let snapshot_path = PathBuf::from(&settings.latest_update_path);

        let mut chat = ChatRouter::new(provider.clone(), settings.gemini_model.clone())
            .with_desk(desk.clone())
            .with_snapshot_path(snapshot_path.clone())
            .with_guard(SafetyGuard::new(settings.llm_calls_per_minute));
        if let Some(source) = &price_source {
            chat = chat.with_price_source(source.clone());
        }

        Self {
            settings: Arc::new(settings),
            provider,
            desk,
            chat: Arc::new(chat),
            price_source,
            avatar: Arc::new(RwLock::new(RiskAvatarManager::default())),
            snapshot_path,
        }
    }

    fn desk(&self) -> Result<Arc<RiskDesk>, ServerError> {
        self.desk
            .clone()
            .ok_or_else(|| ServerError::new(StatusCode::SERVICE_UNAVAILABLE, "risk engine is not loaded"))
    }
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Deserialize)]
struct RiskQuery {
    appetite: Option<String>,
    horizon_hours: Option<u32>,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(list))
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);
    Router::new()
        .route("/health", get(health))
        .route("/v1/chat", post(chat))
        .route("/v1/snapshot", get(get_snapshot))
        .route("/v1/snapshot/refresh", post(refresh_snapshot))
        .route("/v1/risk", get(risk))
        .route("/v1/avatar", get(avatar))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "risk_engine": state.desk.is_some(),
        "bars": state.desk.as_ref().map(|d| d.bars().len()),
        "llm_provider": state.provider.name(),
        "price_source": state.price_source.as_ref().map(|s| s.name().to_string()),
    }))
}

async fn chat(
    State(state): State<AppState>,
    req: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ServerError> {
    let Json(req) = req.map_err(|r| ServerError::new(r.status(), r.body_text()))?;
    let reply = state.chat.handle(&req.message).await.map_err(chat_error)?;
    Ok(Json(reply))
}

async fn get_snapshot(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ServerError> {
    snapshot::load(&state.snapshot_path)
        .map(Json)
        .ok_or_else(|| ServerError::new(StatusCode::NOT_FOUND, "no snapshot available"))
}

async fn refresh_snapshot(State(state): State<AppState>) -> Result<Json<Snapshot>, ServerError> {
    let desk = state.desk()?;
    let snap = desk
        .build_snapshot(state.price_source.as_deref(), RiskAppetite::Medium, 24)
        .await?;

    let path = state.snapshot_path.clone();
    let written = snap.clone();
    tokio::task::spawn_blocking(move || snapshot::write_atomic(path, &written)).await??;

    Ok(Json(snap))
}

async fn risk(
    State(state): State<AppState>,
    query: Result<Query<RiskQuery>, QueryRejection>,
) -> Result<Json<RiskAssessment>, ServerError> {
    let Query(q) = query.map_err(|r| ServerError::new(r.status(), r.body_text()))?;
    let appetite = match q.appetite.as_deref() {
        Some(raw) => raw
            .parse::<RiskAppetite>()
            .map_err(|e| ServerError::new(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => RiskAppetite::Medium,
    };
    let horizon = q.horizon_hours.unwrap_or(24);
    if !(1..=MAX_HORIZON_HOURS).contains(&horizon) {
        return Err(ServerError::new(
            StatusCode::BAD_REQUEST,
            format!("horizon_hours must be between 1 and {}", MAX_HORIZON_HOURS),
        ));
    }

    let desk = state.desk()?;
    let live = desk::live_price(state.price_source.as_deref()).await;
    let assessment = desk.evaluate_blocking(appetite, horizon, live).await?;
    Ok(Json(assessment))
}

async fn avatar(State(state): State<AppState>) -> Json<AvatarView> {
    Json(state.avatar.read().await.view())
}

/// Fetch one oracle price and feed it to the avatar.
pub async fn poll_avatar_once(state: &AppState) -> bool {
    let Some(source) = state.price_source.as_ref() else {
        return false;
    };
    match source.latest_price().await {
        Ok(quote) if quote.is_usable() => {
            state.avatar.write().await.observe(quote.price, quote.timestamp);
            true
        }
        Ok(quote) => {
            warn!(source = source.name(), price = quote.price, "avatar poll ignoring unusable price");
            false
        }
        Err(e) => {
            debug!(error = %e, "avatar poll skipped");
            false
        }
    }
}

pub fn spawn_avatar_poller(state: AppState) -> Option<tokio::task::JoinHandle<()>> {
    state.price_source.as_ref()?;
    let every = Duration::from_secs(state.settings.avatar_poll_secs.max(1));
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            poll_avatar_once(&state).await;
        }
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.settings.bind_addr.clone();
    let poller = spawn_avatar_poller(state.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "crash radar listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = poller {
        handle.abort();
    }
    Ok(())
}
