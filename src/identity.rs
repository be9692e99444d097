//! Opaque per-client user identity: generated once, persisted, reused.

use tracing::{info, warn};
use uuid::Uuid;

use crate::local_store::{LocalStorage, USER_ID_KEY};

/// Return the persisted user id, creating and storing a new one on first use.
/// If the id cannot be persisted it is still returned for this run.
pub async fn load_or_create_user_id(storage: &LocalStorage) -> String {
  let fresh = Uuid::new_v4().to_string();
  let result = storage
    .update(USER_ID_KEY, |current| match current {
      Some(id) if !id.trim().is_empty() => Some(id.to_string()),
      _ => Some(fresh.clone()),
    })
    .await;

  match result {
    Ok(Some(id)) => {
      if id == fresh {
        info!(target: "prompt_wheel", user_id = %id, "Generated new user identity");
      }
      id
    }
    Ok(None) => fresh,
    Err(e) => {
      warn!(target: "prompt_wheel", error = %e, "Could not persist user identity; using an ephemeral one");
      storage.get_item(USER_ID_KEY).await.unwrap_or(fresh)
    }
  }
}
