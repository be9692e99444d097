//! Prompt Wheel Backend
//!
//! - Axum HTTP + WebSocket API
//! - Finished-state tracking in a local state file or a Supabase project
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   APP_CONFIG_PATH    : path to TOML config (wheel settings + extra prompts)
//!   PROGRESS_BACKEND   : "local" (default) or "remote"
//!   SUPABASE_URL       : remote record store base URL
//!   SUPABASE_ANON_KEY  : remote record store API key
//!   LOCAL_STATE_PATH   : local state file (default "local_state.json", empty = in memory)
//!   WHEEL_MAX_SEGMENTS : prompts shown on the wheel (default 5)
//!   SPIN_DURATION_MS   : reveal delay (default 4000)
//!   ACCESS_PASSWORD    : access gate password
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use prompt_wheel::config::AppConfig;
use prompt_wheel::routes::build_router;
use prompt_wheel::state::AppState;
use prompt_wheel::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = AppConfig::load();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

  // Local state, identity, catalog, progress backend, narrator.
  let state = Arc::new(AppState::new(config).await);

  // Build the HTTP router with routes, access gate, CORS and tracing layers.
  let app = build_router(state.clone());

  let listener = TcpListener::bind(addr).await?;
  info!(target: "prompt_wheel", %addr, backend = state.finished.kind().as_str(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  state.narrator.stop().await;
  info!(target: "prompt_wheel", "Server stopped");
  Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!(target: "prompt_wheel", error = %e, "Cannot listen for Ctrl-C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        error!(target: "prompt_wheel", error = %e, "Cannot listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => info!(target: "prompt_wheel", "Received Ctrl-C, shutting down"),
    () = terminate => info!(target: "prompt_wheel", "Received SIGTERM, shutting down"),
  }
}
