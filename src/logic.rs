//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Browsing a scope with finished flags
//!   - Loading a wheel from the unfinished pool and spinning it
//!   - Marking / unmarking prompts finished
//!   - Narrating a prompt

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::domain::{Grade, Prompt, Section};
use crate::error::ApiError;
use crate::protocol::{FinishedOut, PromptListOut, PromptOut, SpeechOut, WheelOut};
use crate::selection::{SpinError, SpinPlan, Wheel};
use crate::state::AppState;

/// Catalog and finished ids for one scope, fetched concurrently.
async fn scope_with_finished(state: &AppState, user_id: &str, grade: Grade, section: Section) -> (Vec<Prompt>, HashSet<String>) {
  tokio::join!(
    state.catalog.by_scope(grade, section),
    state.finished.finished_ids_for_scope(user_id, grade, section),
  )
}

#[instrument(level = "info", skip(state))]
pub async fn browse_scope(state: &AppState, user_id: &str, grade: Grade, section: Section) -> PromptListOut {
  let (prompts, finished) = scope_with_finished(state, user_id, grade, section).await;
  let prompts: Vec<PromptOut> = prompts
    .into_iter()
    .map(|p| PromptOut { finished: finished.contains(&p.id), prompt: p })
    .collect();
  let finished_count = prompts.iter().filter(|p| p.finished).count();
  PromptListOut { grade, section, total: prompts.len(), finished_count, prompts }
}

#[instrument(level = "info", skip(state))]
pub async fn prompt_view(state: &AppState, user_id: &str, id: &str) -> Result<PromptOut, ApiError> {
  let prompt = state
    .catalog
    .by_id(id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("Prompt not found: {id}")))?;
  let finished = state.finished.is_finished(user_id, &prompt.id).await;
  Ok(PromptOut { prompt, finished })
}

/// Sample a fresh wheel out of the user's unfinished prompts for a scope.
/// Rejected while that user's wheel is spinning.
#[instrument(level = "info", skip(state))]
pub async fn load_wheel(state: &AppState, user_id: &str, grade: Grade, section: Section) -> Result<WheelOut, ApiError> {
  let (all, finished) = scope_with_finished(state, user_id, grade, section).await;
  let pool: Vec<Prompt> = all.iter().filter(|p| !finished.contains(&p.id)).cloned().collect();

  let slot = state.wheel_for(user_id).await;
  let mut wheel = slot.lock().await;
  if wheel.is_spinning() {
    return Err(SpinError::AlreadySpinning.into());
  }
  *wheel = Wheel::sampled(&pool, state.config.wheel.max_segments, &mut rand::thread_rng());
  info!(target: "wheel", total = all.len(), remaining = pool.len(), shown = wheel.prompts().len(), "Wheel loaded");

  Ok(WheelOut {
    grade,
    section,
    prompts: wheel.prompts().to_vec(),
    remaining: pool.len(),
    total: all.len(),
    all_done: pool.is_empty(),
    phase: wheel.phase(),
  })
}

/// Spin the user's wheel and wait for the reveal. The reveal happens even if
/// the caller stops waiting.
#[instrument(level = "info", skip(state))]
pub async fn spin_wheel(state: &AppState, user_id: &str) -> Result<(SpinPlan, Prompt), ApiError> {
  let slot = state.wheel_for(user_id).await;
  Ok(crate::selection::spin(slot, state.spin_delay()).await?)
}

/// First half of a streamed spin: enter the spinning phase and hand back the
/// plan. The caller waits `AppState::spin_delay` and calls `reveal`.
#[instrument(level = "info", skip(state))]
pub async fn begin_spin(state: &AppState, user_id: &str) -> Result<(SpinPlan, Arc<Mutex<Wheel>>), ApiError> {
  let slot = state.wheel_for(user_id).await;
  let plan = {
    let mut wheel = slot.lock().await;
    wheel.begin_spin(&mut rand::thread_rng())?
  };
  debug!(target: "wheel", segment = plan.segment, rotation = plan.rotation, "Spin started");
  Ok((plan, slot))
}

pub async fn reveal(slot: &Mutex<Wheel>) -> Result<Prompt, ApiError> {
  let winner = slot.lock().await.complete_spin().ok_or(SpinError::Empty)?;
  info!(target: "wheel", id = %winner.id, "Spin revealed winner");
  Ok(winner)
}

/// Set or clear the finished mark, then report what the store now says.
#[instrument(level = "info", skip(state))]
pub async fn set_finished(state: &AppState, user_id: &str, prompt_id: &str, finished: bool) -> Result<FinishedOut, ApiError> {
  if finished {
    let prompt = state
      .catalog
      .by_id(prompt_id)
      .await
      .ok_or_else(|| ApiError::NotFound(format!("Prompt not found: {prompt_id}")))?;
    state.finished.mark_finished(user_id, &prompt.id, prompt.grade, prompt.section).await;
  } else {
    state.finished.unmark_finished(user_id, prompt_id).await;
  }
  let now = state.finished.is_finished(user_id, prompt_id).await;
  Ok(FinishedOut { prompt_id: prompt_id.to_string(), finished: now })
}

#[instrument(level = "info", skip(state))]
pub async fn narrate_prompt(state: &AppState, prompt_id: &str) -> Result<SpeechOut, ApiError> {
  let prompt = state
    .catalog
    .by_id(prompt_id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("Prompt not found: {prompt_id}")))?;
  let id = prompt.id.clone();
  let utterance = state
    .narrator
    .speak(&prompt.narration(), move || debug!(target: "speech", %id, "Narration ended"))
    .await;
  Ok(SpeechOut { supported: state.narrator.is_supported(), playing: utterance.is_some(), utterance })
}

pub async fn speech_status(state: &AppState) -> SpeechOut {
  SpeechOut {
    supported: state.narrator.is_supported(),
    playing: state.narrator.is_playing().await,
    utterance: state.narrator.now_playing().await,
  }
}
