//! Access gate: a shared password that flips the persisted `journal_auth` flag.

use std::sync::Arc;

use axum::{
  extract::{Request, State},
  middleware::Next,
  response::Response,
};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::local_store::AUTH_KEY;
use crate::state::AppState;

pub async fn is_authenticated(state: &AppState) -> bool {
  state.storage.get_item(AUTH_KEY).await.as_deref() == Some("true")
}

/// Check the password and set the flag on success.
pub async fn login(state: &AppState, password: &str) -> Result<(), ApiError> {
  if password != state.config.access_password {
    warn!(target: "prompt_wheel", "Login rejected: wrong password");
    return Err(ApiError::Unauthorized);
  }
  state.storage.set_item(AUTH_KEY, "true").await?;
  info!(target: "prompt_wheel", "Access granted");
  Ok(())
}

pub async fn logout(state: &AppState) -> Result<(), ApiError> {
  state.storage.remove_item(AUTH_KEY).await?;
  info!(target: "prompt_wheel", "Access cleared");
  Ok(())
}

/// Middleware for gated routes: 401 unless the flag is set.
pub async fn require_access(
  State(state): State<Arc<AppState>>,
  request: Request,
  next: Next,
) -> Result<Response, ApiError> {
  if !is_authenticated(&state).await {
    return Err(ApiError::Unauthorized);
  }
  Ok(next.run(request).await)
}
