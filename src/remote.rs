//! Minimal PostgREST (Supabase) client for the remote record store.
//!
//! Only the handful of verbs the service needs: filtered select, insert,
//! update and delete on a table. Filters are passed as PostgREST query pairs
//! (`("grade", eq(6))`, `("order", "created_at.asc")`).
//!
//! NOTE: the API key is sent as both `apikey` and bearer token and never logged.

use std::fmt::Display;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::RemoteConfig;
use crate::error::{StoreError, UNIQUE_VIOLATION};

#[derive(Clone)]
pub struct RecordStore {
  pub client: reqwest::Client,
  pub base_url: String,
  api_key: String,
}

impl std::fmt::Debug for RecordStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RecordStore").field("base_url", &self.base_url).finish_non_exhaustive()
  }
}

/// Error payload PostgREST returns on failure.
#[derive(Deserialize, Default)]
struct PostgrestError {
  #[serde(default)] code: Option<String>,
  #[serde(default)] message: Option<String>,
}

/// `col=eq.value`
pub fn eq(v: impl Display) -> String { format!("eq.{v}") }

/// `col=in.("a","b")`
pub fn in_list<I, T>(values: I) -> String
where
  I: IntoIterator<Item = T>,
  T: Display,
{
  let quoted: Vec<String> = values
    .into_iter()
    .map(|v| format!("\"{}\"", v.to_string().replace('"', "\\\"")))
    .collect();
  format!("in.({})", quoted.join(","))
}

impl RecordStore {
  pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
    })
  }

  /// Build the client if both URL and key are configured; otherwise None.
  pub fn from_config(cfg: &RemoteConfig) -> Option<Self> {
    let url = cfg.url.as_deref().filter(|s| !s.trim().is_empty())?;
    let key = cfg.api_key.as_deref().filter(|s| !s.trim().is_empty())?;
    Self::new(url, key, Duration::from_millis(cfg.timeout_ms)).ok()
  }

  fn request(&self, method: Method, table: &str) -> RequestBuilder {
    self
      .client
      .request(method, format!("{}/rest/v1/{}", self.base_url, table))
      .header("apikey", &self.api_key)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .header(ACCEPT, "application/json")
  }

  #[instrument(level = "debug", skip(self, query), fields(%table))]
  pub async fn select<T: DeserializeOwned>(
    &self,
    table: &str,
    query: &[(&str, String)],
  ) -> Result<Vec<T>, StoreError> {
    let started = Instant::now();
    let resp = self.request(Method::GET, table).query(query).send().await?;
    let rows: Vec<T> = decode(resp).await?;
    debug!(target: "prompt_wheel", %table, rows = rows.len(), elapsed_ms = started.elapsed().as_millis() as u64, "select");
    Ok(rows)
  }

  #[instrument(level = "debug", skip(self, rows), fields(%table))]
  pub async fn insert<B, T>(&self, table: &str, rows: &B) -> Result<Vec<T>, StoreError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let resp = self
      .request(Method::POST, table)
      .header(CONTENT_TYPE, "application/json")
      .header("Prefer", "return=representation")
      .json(rows)
      .send()
      .await?;
    decode(resp).await
  }

  #[instrument(level = "debug", skip(self, filters, patch), fields(%table))]
  pub async fn update<B, T>(
    &self,
    table: &str,
    filters: &[(&str, String)],
    patch: &B,
  ) -> Result<Vec<T>, StoreError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let resp = self
      .request(Method::PATCH, table)
      .query(filters)
      .header(CONTENT_TYPE, "application/json")
      .header("Prefer", "return=representation")
      .json(patch)
      .send()
      .await?;
    decode(resp).await
  }

  #[instrument(level = "debug", skip(self, filters), fields(%table))]
  pub async fn delete(&self, table: &str, filters: &[(&str, String)]) -> Result<(), StoreError> {
    let resp = self.request(Method::DELETE, table).query(filters).send().await?;
    check(resp).await.map(|_| ())
  }
}

/// Fail on non-2xx, mapping PostgREST unique violations to their own variant.
async fn check(resp: Response) -> Result<String, StoreError> {
  let status = resp.status();
  let body = resp.text().await?;
  if status.is_success() {
    return Ok(body);
  }
  let err: PostgrestError = serde_json::from_str(&body).unwrap_or_default();
  let message = err.message.unwrap_or_else(|| body.chars().take(200).collect());
  let unique = match err.code.as_deref() {
    Some(code) => code == UNIQUE_VIOLATION,
    None => status == StatusCode::CONFLICT,
  };
  if unique {
    return Err(StoreError::UniqueViolation(message));
  }
  Err(StoreError::Status { status: status.as_u16(), code: err.code, message })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<Vec<T>, StoreError> {
  let body = check(resp).await?;
  if body.trim().is_empty() {
    return Ok(Vec::new());
  }
  Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::Matcher;

  #[derive(Deserialize, Debug, PartialEq)]
  struct Row {
    id: String,
  }

  #[test]
  fn filters_render_postgrest_syntax() {
    assert_eq!(eq(7), "eq.7");
    assert_eq!(eq("Honors"), "eq.Honors");
    assert_eq!(in_list(["a", "b"]), "in.(\"a\",\"b\")");
  }

  #[tokio::test]
  async fn select_sends_key_and_filters() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/rest/v1/prompts")
      .match_header("apikey", "k")
      .match_header("authorization", "Bearer k")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("grade".into(), "eq.6".into()),
        Matcher::UrlEncoded("is_active".into(), "eq.true".into()),
      ]))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"[{"id":"x"}]"#)
      .create_async()
      .await;

    let store = RecordStore::new(&server.url(), "k", Duration::from_secs(2)).unwrap();
    let rows: Vec<Row> = store
      .select("prompts", &[("grade", eq(6)), ("is_active", eq(true))])
      .await
      .unwrap();
    assert_eq!(rows, vec![Row { id: "x".into() }]);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn duplicate_insert_is_a_unique_violation() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/rest/v1/user_progress")
      .with_status(409)
      .with_body(r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#)
      .create_async()
      .await;

    let store = RecordStore::new(&server.url(), "k", Duration::from_secs(2)).unwrap();
    let err = store
      .insert::<_, Row>("user_progress", &[serde_json::json!({"user_id": "u"})])
      .await
      .unwrap_err();
    assert!(err.is_unique_violation(), "{err}");
  }

  #[tokio::test]
  async fn foreign_key_conflict_is_not_a_unique_violation() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/rest/v1/user_progress")
      .with_status(409)
      .with_body(r#"{"code":"23503","message":"insert or update violates foreign key constraint"}"#)
      .create_async()
      .await;

    let store = RecordStore::new(&server.url(), "k", Duration::from_secs(2)).unwrap();
    match store.insert::<_, Row>("user_progress", &[serde_json::json!({"user_id": "u"})]).await {
      Err(StoreError::Status { status, code, .. }) => {
        assert_eq!(status, 409);
        assert_eq!(code.as_deref(), Some("23503"));
      }
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[tokio::test]
  async fn bare_conflict_counts_as_unique_violation() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/rest/v1/user_progress")
      .with_status(409)
      .with_body("conflict")
      .create_async()
      .await;

    let store = RecordStore::new(&server.url(), "k", Duration::from_secs(2)).unwrap();
    let err = store
      .insert::<_, Row>("user_progress", &[serde_json::json!({"user_id": "u"})])
      .await
      .unwrap_err();
    assert!(err.is_unique_violation(), "{err}");
  }

  #[tokio::test]
  async fn server_errors_keep_status_and_code() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/rest/v1/prompts")
      .match_query(Matcher::Any)
      .with_status(400)
      .with_body(r#"{"code":"42703","message":"column prompts.nope does not exist"}"#)
      .create_async()
      .await;

    let store = RecordStore::new(&server.url(), "k", Duration::from_secs(2)).unwrap();
    match store.select::<Row>("prompts", &[("nope", eq(1))]).await {
      Err(StoreError::Status { status, code, .. }) => {
        assert_eq!(status, 400);
        assert_eq!(code.as_deref(), Some("42703"));
      }
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn missing_credentials_disable_the_client() {
    let cfg = RemoteConfig { url: Some("http://localhost".into()), api_key: None, timeout_ms: 1000 };
    assert!(RecordStore::from_config(&cfg).is_none());
  }
}
