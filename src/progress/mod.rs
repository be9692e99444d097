//! Finished-state tracking: which prompts a user has completed.
//!
//! Two interchangeable backends implement the fallible `ProgressBackend`
//! trait: `LocalProgress` (the persisted local state file) and
//! `RemoteProgress` (the `user_progress` table of the record store).
//! `FinishedStore` wraps whichever one configuration picked and applies the
//! fail-open policy, one default per operation:
//!
//!   mark_finished / unmark_finished : log and continue (no-op)
//!   is_finished                     : false
//!   finished_ids_for_scope          : empty set
//!
//! Nothing in here ever blocks a student flow on a storage failure.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AppConfig, BackendKind};
use crate::domain::{Grade, Section};
use crate::error::StoreError;
use crate::local_store::LocalStorage;
use crate::remote::RecordStore;

pub mod local;
pub mod remote;

pub use local::LocalProgress;
pub use remote::RemoteProgress;

#[async_trait]
pub trait ProgressBackend: Send + Sync {
  fn kind(&self) -> BackendKind;

  /// Create the mark if absent. Marking twice leaves one mark.
  async fn mark_finished(&self, user_id: &str, prompt_id: &str, grade: Grade, section: Section) -> Result<(), StoreError>;

  /// Delete the mark if present.
  async fn unmark_finished(&self, user_id: &str, prompt_id: &str) -> Result<(), StoreError>;

  async fn is_finished(&self, user_id: &str, prompt_id: &str) -> Result<bool, StoreError>;

  async fn finished_ids_for_scope(&self, user_id: &str, grade: Grade, section: Section) -> Result<HashSet<String>, StoreError>;
}

/// Fail-open facade over the configured backend.
#[derive(Clone)]
pub struct FinishedStore {
  backend: Arc<dyn ProgressBackend>,
}

impl FinishedStore {
  pub fn new(backend: Arc<dyn ProgressBackend>) -> Self {
    Self { backend }
  }

  /// Pick the backend once from configuration. Asking for `remote` without a
  /// usable remote store degrades to local.
  pub fn from_config(cfg: &AppConfig, storage: &LocalStorage, remote: Option<&RecordStore>) -> Self {
    let backend: Arc<dyn ProgressBackend> = match (cfg.progress_backend, remote) {
      (BackendKind::Remote, Some(store)) => Arc::new(RemoteProgress::new(store.clone())),
      (BackendKind::Remote, None) => {
        warn!(target: "progress", "Remote progress requested but no remote store configured; using local");
        Arc::new(LocalProgress::new(storage.clone()))
      }
      (BackendKind::Local, _) => Arc::new(LocalProgress::new(storage.clone())),
    };
    info!(target: "progress", backend = backend.kind().as_str(), "Finished-state store selected");
    Self { backend }
  }

  pub fn kind(&self) -> BackendKind { self.backend.kind() }

  #[instrument(level = "info", skip(self), fields(backend = self.kind().as_str()))]
  pub async fn mark_finished(&self, user_id: &str, prompt_id: &str, grade: Grade, section: Section) {
    match self.backend.mark_finished(user_id, prompt_id, grade, section).await {
      Ok(()) => debug!(target: "progress", %prompt_id, "Marked finished"),
      Err(e) => error!(target: "progress", %prompt_id, error = %e, "mark_finished failed; ignoring"),
    }
  }

  #[instrument(level = "info", skip(self), fields(backend = self.kind().as_str()))]
  pub async fn unmark_finished(&self, user_id: &str, prompt_id: &str) {
    match self.backend.unmark_finished(user_id, prompt_id).await {
      Ok(()) => debug!(target: "progress", %prompt_id, "Unmarked"),
      Err(e) => error!(target: "progress", %prompt_id, error = %e, "unmark_finished failed; ignoring"),
    }
  }

  #[instrument(level = "debug", skip(self), fields(backend = self.kind().as_str()))]
  pub async fn is_finished(&self, user_id: &str, prompt_id: &str) -> bool {
    self.backend.is_finished(user_id, prompt_id).await.unwrap_or_else(|e| {
      error!(target: "progress", %prompt_id, error = %e, "is_finished failed; reporting unfinished");
      false
    })
  }

  #[instrument(level = "debug", skip(self), fields(backend = self.kind().as_str()))]
  pub async fn finished_ids_for_scope(&self, user_id: &str, grade: Grade, section: Section) -> HashSet<String> {
    self
      .backend
      .finished_ids_for_scope(user_id, grade, section)
      .await
      .unwrap_or_else(|e| {
        error!(target: "progress", error = %e, "finished_ids_for_scope failed; reporting none");
        HashSet::new()
      })
  }
}
