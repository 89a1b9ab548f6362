//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .allowed_origins()
        .into_iter()
        .filter_map(|s| match s.parse::<header::HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = s, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .fallback_service(static_files)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connections: usize,
    roster_size: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.relay.stats();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        connections: stats.connections,
        roster_size: stats.roster_size,
    })
}
