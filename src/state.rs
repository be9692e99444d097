//! Application state: local state file, user identity, prompt catalog,
//! finished-state store, per-user wheels and the narrator.
//!
//! This module owns:
//!   - the persisted local state (auth flag, user id, local finished marks)
//!   - the catalog (remote store when configured, built-in bank otherwise)
//!   - the finished-state store, with its backend chosen once here
//!   - one wheel per user, each behind its own mutex

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument};

use crate::catalog::PromptCatalog;
use crate::config::AppConfig;
use crate::domain::Prompt;
use crate::identity::load_or_create_user_id;
use crate::local_store::LocalStorage;
use crate::progress::FinishedStore;
use crate::remote::RecordStore;
use crate::selection::Wheel;
use crate::speech::{Narrator, SimulatedEngine};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: LocalStorage,
    pub user_id: String,
    pub catalog: PromptCatalog,
    pub finished: FinishedStore,
    pub wheels: Arc<RwLock<HashMap<String, Arc<Mutex<Wheel>>>>>,
    pub narrator: Arc<Narrator>,
}

impl AppState {
    /// Build state from config: open local state, resolve identity, connect
    /// the remote store (if configured) and pick the progress backend.
    #[instrument(level = "info", skip_all)]
    pub async fn new(config: AppConfig) -> Self {
        let storage = match &config.local_state_path {
            Some(path) => LocalStorage::open(path).await,
            None => LocalStorage::in_memory(),
        };
        Self::with_storage(config, storage).await
    }

    /// Same as `new` over an already opened local state.
    pub async fn with_storage(config: AppConfig, storage: LocalStorage) -> Self {
        let remote = RecordStore::from_config(&config.remote);
        match (&remote, config.remote_configured()) {
            (Some(store), _) => {
                info!(target: "prompt_wheel", base_url = %store.base_url, "Remote record store enabled.");
            }
            (None, true) => {
                error!(target: "prompt_wheel", "Remote record store configured but the client could not be built. Using built-in prompts.");
            }
            (None, false) => {
                info!(target: "prompt_wheel", "Remote record store disabled (no SUPABASE_URL/SUPABASE_ANON_KEY). Using built-in prompts.");
            }
        }

        let finished = FinishedStore::from_config(&config, &storage, remote.as_ref());
        let extra: Vec<Prompt> = config.prompts.iter().cloned().map(Prompt::from).collect();
        let catalog = PromptCatalog::new(remote, extra);
        let user_id = load_or_create_user_id(&storage).await;
        info!(target: "prompt_wheel", %user_id, local_state = ?storage.path(), "User identity ready");

        Self {
            config: Arc::new(config),
            storage,
            user_id,
            catalog,
            finished,
            wheels: Arc::new(RwLock::new(HashMap::new())),
            narrator: Arc::new(Narrator::new(Some(Arc::new(SimulatedEngine::default())))),
        }
    }

    /// The wheel of `user_id`, created empty on first use.
    pub async fn wheel_for(&self, user_id: &str) -> Arc<Mutex<Wheel>> {
        if let Some(w) = self.wheels.read().await.get(user_id) {
            return w.clone();
        }
        self.wheels
            .write()
            .await
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Wheel::new(Vec::new()))))
            .clone()
    }

    pub fn spin_delay(&self) -> Duration {
        Duration::from_millis(self.config.wheel.spin_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wheel_is_shared_per_user() {
        let cfg = AppConfig { local_state_path: None, ..AppConfig::default() };
        let state = AppState::new(cfg).await;
        let a = state.wheel_for("u").await;
        let b = state.wheel_for("u").await;
        let c = state.wheel_for("v").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn identity_is_stable_across_restarts() {
        let storage = LocalStorage::in_memory();
        let cfg = AppConfig { local_state_path: None, ..AppConfig::default() };
        let first = AppState::with_storage(cfg.clone(), storage.clone()).await;
        let second = AppState::with_storage(cfg, storage).await;
        assert_eq!(first.user_id, second.user_id);
    }
}
