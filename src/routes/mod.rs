//! Router assembly: HTTP endpoints, WebSocket upgrade, access gate, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::require_access;
use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - open routes: health, login, logout
/// - gated routes (access flag required): prompts, wheel, progress, speech, admin, `/ws`
/// - Static SPA from the configured static dir with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_dir = state.config.static_dir.clone();
    let static_service = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    let gated = Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // Student flows
        .route("/api/v1/me", get(http::http_me))
        .route("/api/v1/prompts", get(http::http_list_prompts))
        .route("/api/v1/prompts/:id", get(http::http_get_prompt))
        .route(
            "/api/v1/prompts/:id/finished",
            post(http::http_mark_finished).delete(http::http_unmark_finished),
        )
        .route("/api/v1/prompts/:id/speak", post(http::http_speak))
        .route("/api/v1/wheel", get(http::http_load_wheel))
        .route("/api/v1/wheel/spin", post(http::http_spin))
        .route("/api/v1/speech", get(http::http_speech_status))
        .route("/api/v1/speech/stop", post(http::http_stop_speech))
        // Admin
        .route(
            "/api/v1/admin/prompts",
            get(http::http_admin_list).post(http::http_admin_create),
        )
        .route(
            "/api/v1/admin/prompts/:id",
            put(http::http_admin_update).delete(http::http_admin_delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_access));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/login", post(http::http_login))
        .route("/api/v1/logout", post(http::http_logout))
        .merge(gated)
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
