//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, Query, State}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::auth;
use crate::catalog::{PromptAdmin, PromptDraft};
use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body))]
pub async fn http_login(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LoginIn>,
) -> Result<Json<AuthOut>, ApiError> {
  auth::login(&state, &body.password).await?;
  Ok(Json(AuthOut { authenticated: true }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_logout(State(state): State<Arc<AppState>>) -> Result<Json<AuthOut>, ApiError> {
  auth::logout(&state).await?;
  Ok(Json(AuthOut { authenticated: false }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_me(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(MeOut {
    user_id: state.user_id.clone(),
    backend: state.finished.kind().as_str(),
    remote_catalog: state.catalog.has_remote(),
  })
}

#[instrument(level = "info", skip(state), fields(grade = %q.grade, section = %q.section))]
pub async fn http_list_prompts(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ScopeQuery>,
) -> Result<Json<PromptListOut>, ApiError> {
  let (grade, section) = q.scope()?;
  let out = browse_scope(&state, &state.user_id, grade, section).await;
  info!(target: "prompt_wheel", %grade, %section, total = out.total, finished = out.finished_count, "HTTP prompts listed");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_prompt(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<PromptOut>, ApiError> {
  Ok(Json(prompt_view(&state, &state.user_id, &id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_mark_finished(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<FinishedOut>, ApiError> {
  Ok(Json(set_finished(&state, &state.user_id, &id, true).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_unmark_finished(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<FinishedOut>, ApiError> {
  Ok(Json(set_finished(&state, &state.user_id, &id, false).await?))
}

#[instrument(level = "info", skip(state), fields(grade = %q.grade, section = %q.section))]
pub async fn http_load_wheel(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ScopeQuery>,
) -> Result<Json<WheelOut>, ApiError> {
  let (grade, section) = q.scope()?;
  Ok(Json(load_wheel(&state, &state.user_id, grade, section).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_spin(State(state): State<Arc<AppState>>) -> Result<Json<SpinOut>, ApiError> {
  let (plan, winner) = spin_wheel(&state, &state.user_id).await?;
  info!(target: "wheel", id = %winner.id, segment = plan.segment, "HTTP spin revealed");
  Ok(Json(SpinOut { plan, duration_ms: state.config.wheel.spin_duration_ms, winner }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_speak(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SpeechOut>, ApiError> {
  Ok(Json(narrate_prompt(&state, &id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_stop_speech(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  state.narrator.stop().await;
  Json(speech_status(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_speech_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(speech_status(&state).await)
}

//
// Admin (remote store only)
//

fn admin(state: &AppState) -> Result<PromptAdmin<'_>, ApiError> {
  state
    .catalog
    .admin()
    .ok_or_else(|| ApiError::Unavailable("Prompt administration needs a remote store".into()))
}

#[instrument(level = "info", skip(state))]
pub async fn http_admin_list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<PromptRecordOut>>, ApiError> {
  let rows = admin(&state)?.list_all().await?;
  Ok(Json(rows.into_iter().map(PromptRecordOut::from).collect()))
}

#[instrument(level = "info", skip(state, draft), fields(prompt_id = %draft.prompt_id))]
pub async fn http_admin_create(
  State(state): State<Arc<AppState>>,
  Json(draft): Json<PromptDraft>,
) -> Result<(StatusCode, Json<PromptRecordOut>), ApiError> {
  draft.validate().map_err(ApiError::BadRequest)?;
  let row = admin(&state)?
    .create(&draft)
    .await?
    .ok_or_else(|| ApiError::Unavailable("Store returned no row for the new prompt".into()))?;
  Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(level = "info", skip(state, draft), fields(prompt_id = %draft.prompt_id))]
pub async fn http_admin_update(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(draft): Json<PromptDraft>,
) -> Result<Json<PromptRecordOut>, ApiError> {
  draft.validate().map_err(ApiError::BadRequest)?;
  let row = admin(&state)?
    .update(&id, &draft)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Prompt record not found: {id}")))?;
  Ok(Json(row.into()))
}

#[instrument(level = "info", skip(state))]
pub async fn http_admin_delete(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  if admin(&state)?.soft_delete(&id).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("Prompt record not found: {id}")))
  }
}
