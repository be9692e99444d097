//! Local backend: finished marks kept as a JSON array under the
//! `finished_prompts` key of the local state.
//!
//! Record layout: `{promptId, grade, section, finishedAt, userId?}`. Records
//! without `userId` were written by a single-user client and count for
//! whichever user asks.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::BackendKind;
use crate::domain::{Grade, Section};
use crate::error::StoreError;
use crate::local_store::{LocalStorage, FINISHED_PROMPTS_KEY};

use super::ProgressBackend;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedRecord {
  pub prompt_id: String,
  pub grade: Grade,
  pub section: Section,
  pub finished_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
}

impl FinishedRecord {
  fn belongs_to(&self, user_id: &str) -> bool {
    self.user_id.as_deref().map_or(true, |u| u == user_id)
  }

  fn matches(&self, user_id: &str, prompt_id: &str) -> bool {
    self.prompt_id == prompt_id && self.belongs_to(user_id)
  }
}

fn parse_records(raw: Option<&str>) -> Vec<FinishedRecord> {
  let Some(raw) = raw else { return Vec::new() };
  serde_json::from_str(raw).unwrap_or_else(|e| {
    warn!(target: "progress", error = %e, "Stored finished prompts are corrupt; treating as empty");
    Vec::new()
  })
}

#[derive(Clone)]
pub struct LocalProgress {
  storage: LocalStorage,
}

impl LocalProgress {
  pub fn new(storage: LocalStorage) -> Self {
    Self { storage }
  }

  pub async fn records(&self) -> Vec<FinishedRecord> {
    parse_records(self.storage.get_item(FINISHED_PROMPTS_KEY).await.as_deref())
  }

  /// Read-modify-write of the record list. `edit` returns whether it changed
  /// anything; unchanged lists are written back verbatim.
  async fn rewrite<F>(&self, edit: F) -> Result<(), StoreError>
  where
    F: FnOnce(&mut Vec<FinishedRecord>) -> bool,
  {
    self
      .storage
      .update(FINISHED_PROMPTS_KEY, |current| {
        let mut records = parse_records(current);
        if !edit(&mut records) {
          return current.map(str::to_string);
        }
        match serde_json::to_string(&records) {
          Ok(s) => Some(s),
          Err(e) => {
            warn!(target: "progress", error = %e, "Could not encode finished prompts; keeping previous state");
            current.map(str::to_string)
          }
        }
      })
      .await
      .map(|_| ())
  }
}

#[async_trait]
impl ProgressBackend for LocalProgress {
  fn kind(&self) -> BackendKind { BackendKind::Local }

  async fn mark_finished(&self, user_id: &str, prompt_id: &str, grade: Grade, section: Section) -> Result<(), StoreError> {
    self
      .rewrite(|records| {
        if records.iter().any(|r| r.matches(user_id, prompt_id)) {
          return false;
        }
        records.push(FinishedRecord {
          prompt_id: prompt_id.to_string(),
          grade,
          section,
          finished_at: Utc::now(),
          user_id: Some(user_id.to_string()),
        });
        true
      })
      .await
  }

  async fn unmark_finished(&self, user_id: &str, prompt_id: &str) -> Result<(), StoreError> {
    self
      .rewrite(|records| {
        let before = records.len();
        records.retain(|r| !r.matches(user_id, prompt_id));
        records.len() != before
      })
      .await
  }

  async fn is_finished(&self, user_id: &str, prompt_id: &str) -> Result<bool, StoreError> {
    Ok(self.records().await.iter().any(|r| r.matches(user_id, prompt_id)))
  }

  async fn finished_ids_for_scope(&self, user_id: &str, grade: Grade, section: Section) -> Result<HashSet<String>, StoreError> {
    Ok(
      self
        .records()
        .await
        .into_iter()
        .filter(|r| r.belongs_to(user_id) && r.grade == grade && r.section == section)
        .map(|r| r.prompt_id)
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn backend() -> LocalProgress {
    LocalProgress::new(LocalStorage::in_memory())
  }

  #[tokio::test]
  async fn mark_is_idempotent() {
    let p = backend();
    p.mark_finished("u", "6h1", Grade::Sixth, Section::Humanity).await.unwrap();
    p.mark_finished("u", "6h1", Grade::Sixth, Section::Humanity).await.unwrap();
    assert_eq!(p.records().await.len(), 1);
  }

  #[tokio::test]
  async fn unmark_of_unknown_is_noop() {
    let p = backend();
    p.unmark_finished("u", "never").await.unwrap();
    assert!(p.records().await.is_empty());
    assert_eq!(p.storage.get_item(FINISHED_PROMPTS_KEY).await, None);
  }

  #[tokio::test]
  async fn mark_and_unmark_toggle_is_finished() {
    let p = backend();
    p.mark_finished("u", "7h2", Grade::Seventh, Section::Humanity).await.unwrap();
    assert!(p.is_finished("u", "7h2").await.unwrap());
    assert!(!p.is_finished("other", "7h2").await.unwrap());
    p.unmark_finished("u", "7h2").await.unwrap();
    assert!(!p.is_finished("u", "7h2").await.unwrap());
  }

  #[tokio::test]
  async fn scope_query_filters_by_grade_and_section() {
    let p = backend();
    p.mark_finished("u", "7ho1", Grade::Seventh, Section::Honors).await.unwrap();
    p.mark_finished("u", "7h1", Grade::Seventh, Section::Humanity).await.unwrap();
    p.mark_finished("u", "8ho1", Grade::Eighth, Section::Honors).await.unwrap();
    p.mark_finished("v", "7ho2", Grade::Seventh, Section::Honors).await.unwrap();

    let ids = p.finished_ids_for_scope("u", Grade::Seventh, Section::Honors).await.unwrap();
    assert_eq!(ids, HashSet::from(["7ho1".to_string()]));
  }

  #[tokio::test]
  async fn reads_records_without_user_id() {
    let storage = LocalStorage::in_memory();
    storage
      .set_item(
        FINISHED_PROMPTS_KEY,
        r#"[{"promptId":"6h3","grade":6,"section":"Humanity","finishedAt":"2024-05-01T12:00:00.000Z"}]"#,
      )
      .await
      .unwrap();
    let p = LocalProgress::new(storage);
    assert!(p.is_finished("anyone", "6h3").await.unwrap());
    let ids = p.finished_ids_for_scope("anyone", Grade::Sixth, Section::Humanity).await.unwrap();
    assert!(ids.contains("6h3"));
  }

  #[tokio::test]
  async fn corrupt_list_reads_as_empty_and_is_replaced_on_mark() {
    let storage = LocalStorage::in_memory();
    storage.set_item(FINISHED_PROMPTS_KEY, "oops").await.unwrap();
    let p = LocalProgress::new(storage);
    assert!(!p.is_finished("u", "6h1").await.unwrap());
    p.mark_finished("u", "6h1", Grade::Sixth, Section::Humanity).await.unwrap();
    assert_eq!(p.records().await.len(), 1);
  }
}
