//! Prompt catalog: active prompts by scope or id from the remote record store,
//! falling back to the built-in bank when the remote is empty, down, or not
//! configured. Also hosts the admin operations on the `prompts` table.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::{Grade, Prompt, Section};
use crate::error::StoreError;
use crate::remote::{eq, RecordStore};
use crate::seeds::seed_prompts;

pub const PROMPTS_TABLE: &str = "prompts";

/// Row of the remote `prompts` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptRow {
  pub id: String,
  pub prompt_id: String,
  pub title: String,
  pub text: String,
  #[serde(default)] pub instructions: String,
  pub grade: Grade,
  pub section: Section,
  #[serde(default)] pub background_image: Option<String>,
  #[serde(default)] pub example_image: Option<String>,
  #[serde(default = "default_true")] pub is_active: bool,
  #[serde(default)] pub created_at: Option<DateTime<Utc>>,
  #[serde(default)] pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool { true }

impl From<PromptRow> for Prompt {
  fn from(r: PromptRow) -> Self {
    Prompt {
      id: r.prompt_id,
      title: r.title,
      text: r.text,
      instructions: r.instructions,
      grade: r.grade,
      section: r.section,
      background_image: r.background_image.filter(|s| !s.is_empty()),
      example_image: r.example_image.filter(|s| !s.is_empty()),
    }
  }
}

/// Admin input for creating or editing a prompt.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDraft {
  pub prompt_id: String,
  pub title: String,
  pub text: String,
  pub instructions: String,
  pub grade: Grade,
  pub section: Section,
  #[serde(default)] pub background_image: Option<String>,
  #[serde(default)] pub example_image: Option<String>,
}

impl PromptDraft {
  /// All text fields are required; image URLs are optional.
  pub fn validate(&self) -> Result<(), String> {
    let required = [
      ("promptId", &self.prompt_id),
      ("title", &self.title),
      ("text", &self.text),
      ("instructions", &self.instructions),
    ];
    for (name, value) in required {
      if value.trim().is_empty() {
        return Err(format!("{name} must not be empty"));
      }
    }
    Ok(())
  }

  fn to_write(&self) -> PromptWrite<'_> {
    let blank_to_none = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    PromptWrite {
      prompt_id: self.prompt_id.trim(),
      title: &self.title,
      text: &self.text,
      instructions: &self.instructions,
      grade: self.grade,
      section: self.section,
      background_image: blank_to_none(&self.background_image),
      example_image: blank_to_none(&self.example_image),
      is_active: true,
    }
  }
}

/// Body written to the `prompts` table on create/update.
#[derive(Serialize)]
struct PromptWrite<'a> {
  prompt_id: &'a str,
  title: &'a str,
  text: &'a str,
  instructions: &'a str,
  grade: Grade,
  section: Section,
  background_image: Option<String>,
  example_image: Option<String>,
  is_active: bool,
}

#[derive(Clone, Debug)]
pub struct PromptCatalog {
  remote: Option<RecordStore>,
  bank: Arc<Vec<Prompt>>,
}

impl PromptCatalog {
  /// Build the catalog over an optional remote store. `extra` prompts (from
  /// config) join the built-in seeds, replacing seeds with the same id.
  pub fn new(remote: Option<RecordStore>, extra: Vec<Prompt>) -> Self {
    let mut bank = seed_prompts();
    for p in extra {
      match bank.iter_mut().find(|b| b.id == p.id) {
        Some(slot) => *slot = p,
        None => bank.push(p),
      }
    }
    info!(target: "catalog", bank = bank.len(), remote = remote.is_some(), "Prompt catalog ready");
    Self { remote, bank: Arc::new(bank) }
  }

  pub fn has_remote(&self) -> bool { self.remote.is_some() }

  fn bank_scope(&self, grade: Grade, section: Section) -> Vec<Prompt> {
    self.bank.iter().filter(|p| p.in_scope(grade, section)).cloned().collect()
  }

  /// Active prompts for a scope, oldest first.
  #[instrument(level = "info", skip(self))]
  pub async fn by_scope(&self, grade: Grade, section: Section) -> Vec<Prompt> {
    if let Some(remote) = &self.remote {
      let query = [
        ("select", "*".to_string()),
        ("grade", eq(grade)),
        ("section", eq(section)),
        ("is_active", eq(true)),
        ("order", "created_at.asc".to_string()),
      ];
      match remote.select::<PromptRow>(PROMPTS_TABLE, &query).await {
        Ok(rows) if !rows.is_empty() => {
          debug!(target: "catalog", count = rows.len(), "Serving remote prompts");
          return rows.into_iter().map(Prompt::from).collect();
        }
        Ok(_) => debug!(target: "catalog", "Remote scope empty; using built-in bank"),
        Err(e) => warn!(target: "catalog", error = %e, "Remote catalog failed; using built-in bank"),
      }
    }
    self.bank_scope(grade, section)
  }

  /// Single active prompt by its external id.
  #[instrument(level = "info", skip(self))]
  pub async fn by_id(&self, id: &str) -> Option<Prompt> {
    if let Some(remote) = &self.remote {
      let query = [
        ("select", "*".to_string()),
        ("prompt_id", eq(id)),
        ("is_active", eq(true)),
        ("limit", "1".to_string()),
      ];
      match remote.select::<PromptRow>(PROMPTS_TABLE, &query).await {
        Ok(rows) => {
          if let Some(row) = rows.into_iter().next() {
            return Some(row.into());
          }
        }
        Err(e) => warn!(target: "catalog", %id, error = %e, "Remote lookup failed; using built-in bank"),
      }
    }
    self.bank.iter().find(|p| p.id == id).cloned()
  }

  /// Admin surface; only available with a remote store.
  pub fn admin(&self) -> Option<PromptAdmin<'_>> {
    self.remote.as_ref().map(|store| PromptAdmin { store })
  }
}

/// Create / edit / soft-delete on the remote `prompts` table. Errors are
/// returned to the admin caller.
pub struct PromptAdmin<'a> {
  store: &'a RecordStore,
}

impl PromptAdmin<'_> {
  /// Every prompt, active or not: by grade, then section, newest first.
  #[instrument(level = "info", skip(self))]
  pub async fn list_all(&self) -> Result<Vec<PromptRow>, StoreError> {
    let query = [
      ("select", "*".to_string()),
      ("order", "grade.asc,section.asc,created_at.desc".to_string()),
    ];
    self.store.select(PROMPTS_TABLE, &query).await
  }

  #[instrument(level = "info", skip(self, draft), fields(prompt_id = %draft.prompt_id))]
  pub async fn create(&self, draft: &PromptDraft) -> Result<Option<PromptRow>, StoreError> {
    let rows: Vec<PromptRow> = self.store.insert(PROMPTS_TABLE, &[draft.to_write()]).await?;
    info!(target: "catalog", prompt_id = %draft.prompt_id, "Prompt created");
    Ok(rows.into_iter().next())
  }

  /// Overwrite the row with internal id `id`. `None` when no row matched.
  #[instrument(level = "info", skip(self, draft), fields(prompt_id = %draft.prompt_id))]
  pub async fn update(&self, id: &str, draft: &PromptDraft) -> Result<Option<PromptRow>, StoreError> {
    let rows: Vec<PromptRow> = self
      .store
      .update(PROMPTS_TABLE, &[("id", eq(id))], &draft.to_write())
      .await?;
    Ok(rows.into_iter().next())
  }

  /// Mark the row inactive. Returns false when no row matched.
  #[instrument(level = "info", skip(self))]
  pub async fn soft_delete(&self, id: &str) -> Result<bool, StoreError> {
    let rows: Vec<PromptRow> = self
      .store
      .update(PROMPTS_TABLE, &[("id", eq(id))], &serde_json::json!({ "is_active": false }))
      .await?;
    if !rows.is_empty() {
      info!(target: "catalog", %id, "Prompt soft-deleted");
    }
    Ok(!rows.is_empty())
  }
}
