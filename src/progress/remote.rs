//! Remote backend: finished marks are rows of `user_progress`, keyed by the
//! internal id of the (active) prompt row. Uniqueness of `(user_id,
//! prompt_id)` is enforced by the store; a duplicate insert means "already
//! marked".

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::PROMPTS_TABLE;
use crate::config::BackendKind;
use crate::domain::{FinishedMark, Grade, Section};
use crate::error::StoreError;
use crate::remote::{eq, in_list, RecordStore};

use super::ProgressBackend;

pub const PROGRESS_TABLE: &str = "user_progress";

/// Internal id + external key of a prompt row.
#[derive(Deserialize)]
struct PromptKey {
  id: String,
  #[serde(default)]
  prompt_id: String,
}

#[derive(Deserialize)]
struct ProgressRef {
  prompt_id: String,
}

#[derive(Clone)]
pub struct RemoteProgress {
  store: RecordStore,
}

impl RemoteProgress {
  pub fn new(store: RecordStore) -> Self {
    Self { store }
  }

  /// Internal row id of the active prompt with external id `prompt_id`.
  async fn internal_id(&self, prompt_id: &str) -> Result<Option<String>, StoreError> {
    let rows: Vec<PromptKey> = self
      .store
      .select(
        PROMPTS_TABLE,
        &[
          ("select", "id".to_string()),
          ("prompt_id", eq(prompt_id)),
          ("is_active", eq(true)),
          ("limit", "1".to_string()),
        ],
      )
      .await?;
    Ok(rows.into_iter().next().map(|r| r.id))
  }
}

#[async_trait]
impl ProgressBackend for RemoteProgress {
  fn kind(&self) -> BackendKind { BackendKind::Remote }

  async fn mark_finished(&self, user_id: &str, prompt_id: &str, _grade: Grade, _section: Section) -> Result<(), StoreError> {
    let Some(internal) = self.internal_id(prompt_id).await? else {
      debug!(target: "progress", %prompt_id, "No active prompt row; nothing to mark");
      return Ok(());
    };
    let row = FinishedMark { user_id: user_id.to_string(), prompt_id: internal, finished_at: Utc::now() };
    match self.store.insert::<_, serde_json::Value>(PROGRESS_TABLE, &[row]).await {
      Ok(_) => Ok(()),
      Err(e) if e.is_unique_violation() => {
        debug!(target: "progress", %prompt_id, "Already marked");
        Ok(())
      }
      Err(e) => Err(e),
    }
  }

  async fn unmark_finished(&self, user_id: &str, prompt_id: &str) -> Result<(), StoreError> {
    let Some(internal) = self.internal_id(prompt_id).await? else {
      return Ok(());
    };
    self
      .store
      .delete(PROGRESS_TABLE, &[("user_id", eq(user_id)), ("prompt_id", eq(internal))])
      .await
  }

  async fn is_finished(&self, user_id: &str, prompt_id: &str) -> Result<bool, StoreError> {
    let Some(internal) = self.internal_id(prompt_id).await? else {
      return Ok(false);
    };
    let rows: Vec<serde_json::Value> = self
      .store
      .select(
        PROGRESS_TABLE,
        &[
          ("select", "id".to_string()),
          ("user_id", eq(user_id)),
          ("prompt_id", eq(internal)),
          ("limit", "1".to_string()),
        ],
      )
      .await?;
    Ok(!rows.is_empty())
  }

  async fn finished_ids_for_scope(&self, user_id: &str, grade: Grade, section: Section) -> Result<HashSet<String>, StoreError> {
    let prompts: Vec<PromptKey> = self
      .store
      .select(
        PROMPTS_TABLE,
        &[
          ("select", "id,prompt_id".to_string()),
          ("grade", eq(grade)),
          ("section", eq(section)),
          ("is_active", eq(true)),
        ],
      )
      .await?;
    if prompts.is_empty() {
      return Ok(HashSet::new());
    }

    let progress: Vec<ProgressRef> = self
      .store
      .select(
        PROGRESS_TABLE,
        &[
          ("select", "prompt_id".to_string()),
          ("user_id", eq(user_id)),
          ("prompt_id", in_list(prompts.iter().map(|p| p.id.as_str()))),
        ],
      )
      .await?;

    let by_internal: HashMap<&str, &str> = prompts.iter().map(|p| (p.id.as_str(), p.prompt_id.as_str())).collect();
    Ok(
      progress
        .iter()
        .filter_map(|row| by_internal.get(row.prompt_id.as_str()).map(|ext| ext.to_string()))
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::{Matcher, Server};
  use std::time::Duration;

  async fn backend(server: &Server) -> RemoteProgress {
    RemoteProgress::new(RecordStore::new(&server.url(), "k", Duration::from_secs(2)).unwrap())
  }

  async fn mock_prompt_lookup(server: &mut Server, prompt_id: &str, body: &str) -> mockito::Mock {
    server
      .mock("GET", "/rest/v1/prompts")
      .match_query(Matcher::UrlEncoded("prompt_id".into(), format!("eq.{prompt_id}")))
      .with_status(200)
      .with_body(body)
      .create_async()
      .await
  }

  #[tokio::test]
  async fn duplicate_mark_counts_as_marked() {
    let mut server = Server::new_async().await;
    mock_prompt_lookup(&mut server, "6h1", r#"[{"id":"uuid-1"}]"#).await;
    let insert = server
      .mock("POST", "/rest/v1/user_progress")
      .match_body(Matcher::Regex(r#""prompt_id":"uuid-1""#.into()))
      .with_status(409)
      .with_body(r#"{"code":"23505","message":"duplicate key"}"#)
      .create_async()
      .await;

    let p = backend(&server).await;
    p.mark_finished("u", "6h1", Grade::Sixth, Section::Humanity).await.unwrap();
    insert.assert_async().await;
  }

  #[tokio::test]
  async fn unknown_prompt_is_a_noop() {
    let mut server = Server::new_async().await;
    mock_prompt_lookup(&mut server, "gone", "[]").await;
    let insert = server.mock("POST", "/rest/v1/user_progress").expect(0).create_async().await;

    let p = backend(&server).await;
    p.mark_finished("u", "gone", Grade::Sixth, Section::Humanity).await.unwrap();
    p.unmark_finished("u", "gone").await.unwrap();
    assert!(!p.is_finished("u", "gone").await.unwrap());
    insert.assert_async().await;
  }

  #[tokio::test]
  async fn unmark_deletes_by_user_and_internal_id() {
    let mut server = Server::new_async().await;
    mock_prompt_lookup(&mut server, "7h1", r#"[{"id":"uuid-7"}]"#).await;
    let delete = server
      .mock("DELETE", "/rest/v1/user_progress")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("user_id".into(), "eq.u".into()),
        Matcher::UrlEncoded("prompt_id".into(), "eq.uuid-7".into()),
      ]))
      .with_status(204)
      .create_async()
      .await;

    backend(&server).await.unmark_finished("u", "7h1").await.unwrap();
    delete.assert_async().await;
  }

  #[tokio::test]
  async fn scope_ids_map_back_to_external_keys() {
    let mut server = Server::new_async().await;
    server
      .mock("GET", "/rest/v1/prompts")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("grade".into(), "eq.7".into()),
        Matcher::UrlEncoded("section".into(), "eq.Honors".into()),
      ]))
      .with_status(200)
      .with_body(r#"[{"id":"a","prompt_id":"7ho1"},{"id":"b","prompt_id":"7ho2"},{"id":"c","prompt_id":"7ho3"}]"#)
      .create_async()
      .await;
    server
      .mock("GET", "/rest/v1/user_progress")
      .match_query(Matcher::UrlEncoded("prompt_id".into(), r#"in.("a","b","c")"#.into()))
      .with_status(200)
      .with_body(r#"[{"prompt_id":"a"},{"prompt_id":"c"}]"#)
      .create_async()
      .await;

    let ids = backend(&server)
      .await
      .finished_ids_for_scope("u", Grade::Seventh, Section::Honors)
      .await
      .unwrap();
    assert_eq!(ids, HashSet::from(["7ho1".to_string(), "7ho3".to_string()]));
  }

  #[tokio::test]
  async fn unreachable_store_is_an_error_for_the_backend() {
    let store = RecordStore::new("http://127.0.0.1:9", "k", Duration::from_millis(500)).unwrap();
    let p = RemoteProgress::new(store);
    assert!(p.is_finished("u", "6h1").await.is_err());
  }
}
