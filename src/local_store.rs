//! File-backed key/value state, laid out like a browser's local storage: one
//! JSON object of string values. Keys used by the service:
//!
//!   finished_prompts : JSON array of finished records (see `progress::local`)
//!   journal_auth     : "true" once the access password was entered
//!   user_id          : opaque user identifier
//!
//! A missing, unreadable or corrupt file is treated as empty state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::StoreError;

pub const FINISHED_PROMPTS_KEY: &str = "finished_prompts";
pub const AUTH_KEY: &str = "journal_auth";
pub const USER_ID_KEY: &str = "user_id";

#[derive(Clone, Debug)]
pub struct LocalStorage {
  path: Option<PathBuf>,
  items: Arc<Mutex<BTreeMap<String, String>>>,
}

impl LocalStorage {
  /// Open (or lazily create) the state file at `path`.
  #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
  pub async fn open(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref().to_path_buf();
    let items = match tokio::fs::read_to_string(&path).await {
      Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
        Ok(map) => map,
        Err(e) => {
          warn!(target: "prompt_wheel", error = %e, "Local state is corrupt; starting empty");
          BTreeMap::new()
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
      Err(e) => {
        warn!(target: "prompt_wheel", error = %e, "Local state unreadable; starting empty");
        BTreeMap::new()
      }
    };
    debug!(target: "prompt_wheel", keys = items.len(), "Local state loaded");
    Self { path: Some(path), items: Arc::new(Mutex::new(items)) }
  }

  /// Non-persistent storage, used when no state path is configured.
  pub fn in_memory() -> Self {
    Self { path: None, items: Arc::new(Mutex::new(BTreeMap::new())) }
  }

  pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

  pub async fn get_item(&self, key: &str) -> Option<String> {
    self.items.lock().await.get(key).cloned()
  }

  pub async fn set_item(&self, key: &str, value: impl Into<String>) -> Result<(), StoreError> {
    let value = value.into();
    self.update(key, move |_| Some(value)).await.map(|_| ())
  }

  pub async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
    self.update(key, |_| None).await.map(|_| ())
  }

  /// Read-modify-write of one key under the storage lock. `f` receives the
  /// current value and returns the new one (`None` removes the key). Returns
  /// the value that was written. Nothing changes in memory unless the file
  /// write succeeds.
  pub async fn update<F>(&self, key: &str, f: F) -> Result<Option<String>, StoreError>
  where
    F: FnOnce(Option<&str>) -> Option<String>,
  {
    let mut items = self.items.lock().await;
    let next = f(items.get(key).map(String::as_str));
    let mut staged = items.clone();
    match &next {
      Some(v) => { staged.insert(key.to_string(), v.clone()); }
      None => { staged.remove(key); }
    }
    self.flush(&staged).await?;
    *items = staged;
    Ok(next)
  }

  async fn flush(&self, items: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let Some(path) = &self.path else { return Ok(()) };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(dir).await?;
    }
    let body = serde_json::to_string_pretty(items)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let store = LocalStorage::open(&path).await;
    store.set_item(USER_ID_KEY, "abc").await.unwrap();
    store.set_item(AUTH_KEY, "true").await.unwrap();
    store.remove_item(AUTH_KEY).await.unwrap();

    let reopened = LocalStorage::open(&path).await;
    assert_eq!(reopened.get_item(USER_ID_KEY).await.as_deref(), Some("abc"));
    assert_eq!(reopened.get_item(AUTH_KEY).await, None);
  }

  #[tokio::test]
  async fn corrupt_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = LocalStorage::open(&path).await;
    assert_eq!(store.get_item(USER_ID_KEY).await, None);
    store.set_item(USER_ID_KEY, "fresh").await.unwrap();
    assert_eq!(LocalStorage::open(&path).await.get_item(USER_ID_KEY).await.as_deref(), Some("fresh"));
  }

  #[tokio::test]
  async fn failed_write_leaves_memory_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let store = LocalStorage::open(blocker.join("state.json")).await;
    assert!(store.set_item(AUTH_KEY, "true").await.is_err());
    assert_eq!(store.get_item(AUTH_KEY).await, None);
  }

  #[tokio::test]
  async fn update_sees_current_value() {
    let store = LocalStorage::in_memory();
    store.set_item("n", "1").await.unwrap();
    let written = store
      .update("n", |cur| cur.map(|v| format!("{v}1")))
      .await
      .unwrap();
    assert_eq!(written.as_deref(), Some("11"));
    assert_eq!(store.get_item("n").await.as_deref(), Some("11"));
  }
}
