//! Wheel selection: bounded random sampling of candidates and the spin that
//! picks one winner after a fixed reveal delay.
//!
//! Segments are laid out clockwise starting under the pointer while the wheel
//! rotates the other way, so the segment that ends up under the pointer is
//! `n - 1 - segment`, not `segment`. `winner_index` is the only place that
//! mapping lives.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use crate::domain::Prompt;

/// Upper bound on segments shown at once.
pub const DEFAULT_MAX_SEGMENTS: usize = 5;
/// Length of the spin animation the reveal waits for.
pub const SPIN_DURATION_MS: u64 = 4000;
/// Minimum number of full rotations.
pub const MIN_SPINS: f64 = 5.0;
/// Random extra rotations on top of `MIN_SPINS`.
pub const EXTRA_SPINS: f64 = 5.0;

/// Uniform sample of at most `max_size` distinct candidates, in random order.
/// Returns every candidate (shuffled) when there are no more than `max_size`.
pub fn sample_subset<T: Clone, R: Rng + ?Sized>(candidates: &[T], max_size: usize, rng: &mut R) -> Vec<T> {
  if max_size == 0 || candidates.is_empty() {
    return Vec::new();
  }
  let mut out = candidates.to_vec();
  out.shuffle(rng);
  out.truncate(max_size);
  out
}

/// Index of the segment under the pointer after landing on `segment`.
pub fn winner_index(n: usize, segment: usize) -> usize {
  n - 1 - segment
}

/// Everything the client needs to animate one spin.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinPlan {
  pub segment: usize,
  pub segment_angle: f64,
  /// Total rotation in degrees.
  pub rotation: f64,
  pub winner_index: usize,
}

/// Pick a segment and a total rotation for a wheel of `n` segments.
pub fn plan_spin<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Option<SpinPlan> {
  if n == 0 {
    return None;
  }
  let segment_angle = 360.0 / n as f64;
  let segment = rng.gen_range(0..n);
  let turns = MIN_SPINS + rng.gen::<f64>() * EXTRA_SPINS;
  Some(SpinPlan {
    segment,
    segment_angle,
    rotation: turns * 360.0 + segment as f64 * segment_angle,
    winner_index: winner_index(n, segment),
  })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelPhase {
  Idle,
  Spinning,
  Revealed,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpinError {
  #[error("a spin is already in progress")]
  AlreadySpinning,
  #[error("no prompts left on the wheel")]
  Empty,
}

/// Prompts currently on the wheel plus the revealed winner, if any.
#[derive(Clone, Debug)]
pub struct Wheel {
  prompts: Vec<Prompt>,
  phase: WheelPhase,
  pending: Option<SpinPlan>,
  winner: Option<Prompt>,
}

impl Wheel {
  pub fn new(prompts: Vec<Prompt>) -> Self {
    Self { prompts, phase: WheelPhase::Idle, pending: None, winner: None }
  }

  /// Sample a fresh wheel of at most `max_segments` out of `pool`.
  pub fn sampled<R: Rng + ?Sized>(pool: &[Prompt], max_segments: usize, rng: &mut R) -> Self {
    Self::new(sample_subset(pool, max_segments, rng))
  }

  pub fn prompts(&self) -> &[Prompt] { &self.prompts }
  pub fn phase(&self) -> WheelPhase { self.phase }
  pub fn winner(&self) -> Option<&Prompt> { self.winner.as_ref() }
  pub fn is_spinning(&self) -> bool { self.phase == WheelPhase::Spinning }

  /// Enter the spinning phase. Rejected while another spin is in flight or
  /// when the wheel is empty.
  pub fn begin_spin<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<SpinPlan, SpinError> {
    if self.is_spinning() {
      return Err(SpinError::AlreadySpinning);
    }
    let plan = plan_spin(self.prompts.len(), rng).ok_or(SpinError::Empty)?;
    self.phase = WheelPhase::Spinning;
    self.winner = None;
    self.pending = Some(plan.clone());
    Ok(plan)
  }

  /// Leave the spinning phase and reveal the prompt under the pointer.
  pub fn complete_spin(&mut self) -> Option<Prompt> {
    let plan = self.pending.take()?;
    let winner = self.prompts.get(plan.winner_index).cloned();
    self.phase = if winner.is_some() { WheelPhase::Revealed } else { WheelPhase::Idle };
    self.winner = winner.clone();
    winner
  }
}

/// Full spin: start, wait out the reveal delay without holding the lock, reveal.
///
/// The delay and the reveal run on their own task, so the wheel leaves the
/// spinning phase even when the caller is dropped mid-wait.
#[instrument(level = "info", skip(wheel), fields(delay_ms = delay.as_millis() as u64))]
pub async fn spin(wheel: Arc<Mutex<Wheel>>, delay: Duration) -> Result<(SpinPlan, Prompt), SpinError> {
  let plan = {
    let mut w = wheel.lock().await;
    w.begin_spin(&mut rand::thread_rng())?
  };
  debug!(target: "wheel", segment = plan.segment, rotation = plan.rotation, "Spin started");

  let reveal = tokio::spawn(async move {
    tokio::time::sleep(delay).await;
    wheel.lock().await.complete_spin()
  });
  let winner = match reveal.await {
    Ok(winner) => winner.ok_or(SpinError::Empty)?,
    Err(e) => {
      error!(target: "wheel", error = %e, "Reveal task failed");
      return Err(SpinError::Empty);
    }
  };
  info!(target: "wheel", id = %winner.id, index = plan.winner_index, "Spin revealed winner");
  Ok((plan, winner))
}
