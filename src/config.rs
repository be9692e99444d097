//! Service configuration: TOML file (APP_CONFIG_PATH) with env overrides.
//!
//! Example:
//!
//! ```toml
//! progress_backend = "remote"
//! local_state_path = "data/local_state.json"
//!
//! [remote]
//! url = "https://xyz.supabase.co"
//! api_key = "..."
//!
//! [wheel]
//! max_segments = 5
//! spin_duration_ms = 4000
//!
//! [[prompts]]
//! id = "6h9"
//! title = "The Lost Key"
//! text = "..."
//! instructions = "..."
//! grade = 6
//! section = "Humanity"
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{Grade, Prompt, Section};
use crate::selection::{DEFAULT_MAX_SEGMENTS, SPIN_DURATION_MS};

pub const DEFAULT_ACCESS_PASSWORD: &str = "6677";
pub const DEFAULT_LOCAL_STATE_PATH: &str = "local_state.json";

/// Which Finished-State Store backend serves progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
  #[default]
  Local,
  Remote,
}

impl BackendKind {
  pub fn as_str(self) -> &'static str {
    match self {
      BackendKind::Local => "local",
      BackendKind::Remote => "remote",
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
  pub url: Option<String>,
  pub api_key: Option<String>,
  pub timeout_ms: u64,
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self { url: None, api_key: None, timeout_ms: 10_000 }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
  pub max_segments: usize,
  pub spin_duration_ms: u64,
}

impl Default for WheelConfig {
  fn default() -> Self {
    Self { max_segments: DEFAULT_MAX_SEGMENTS, spin_duration_ms: SPIN_DURATION_MS }
  }
}

/// Prompt entry accepted in the TOML bank. Joins the built-in seeds and
/// replaces any seed with the same id.
#[derive(Clone, Debug, Deserialize)]
pub struct PromptCfg {
  pub id: String,
  pub title: String,
  pub text: String,
  #[serde(default)] pub instructions: String,
  pub grade: Grade,
  pub section: Section,
  #[serde(default)] pub background_image: Option<String>,
  #[serde(default)] pub example_image: Option<String>,
}

impl From<PromptCfg> for Prompt {
  fn from(c: PromptCfg) -> Self {
    Prompt {
      id: c.id,
      title: c.title,
      text: c.text,
      instructions: c.instructions,
      grade: c.grade,
      section: c.section,
      background_image: c.background_image.filter(|s| !s.is_empty()),
      example_image: c.example_image.filter(|s| !s.is_empty()),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub port: u16,
  pub progress_backend: BackendKind,
  pub remote: RemoteConfig,
  pub local_state_path: Option<PathBuf>,
  pub static_dir: PathBuf,
  pub access_password: String,
  pub wheel: WheelConfig,
  pub prompts: Vec<PromptCfg>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      port: 3000,
      progress_backend: BackendKind::Local,
      remote: RemoteConfig::default(),
      local_state_path: Some(PathBuf::from(DEFAULT_LOCAL_STATE_PATH)),
      static_dir: PathBuf::from("./static"),
      access_password: DEFAULT_ACCESS_PASSWORD.into(),
      wheel: WheelConfig::default(),
      prompts: Vec::new(),
    }
  }
}

impl AppConfig {
  /// Load from APP_CONFIG_PATH (if set) and apply env overrides.
  /// A missing or broken file falls back to defaults.
  pub fn load() -> Self {
    let mut cfg = load_file_from_env().unwrap_or_default();
    cfg.apply_overrides(|k| std::env::var(k).ok());
    cfg
  }

  /// Apply overrides from a variable lookup (normally the process env).
  pub fn apply_overrides<F>(&mut self, var: F)
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
      self.port = port;
    }
    match var("PROGRESS_BACKEND").as_deref().map(str::trim) {
      Some("local") => self.progress_backend = BackendKind::Local,
      Some("remote") => self.progress_backend = BackendKind::Remote,
      Some(other) => warn!(target: "prompt_wheel", value = %other, "Ignoring unknown PROGRESS_BACKEND"),
      None => {}
    }
    if let Some(url) = var("SUPABASE_URL") {
      self.remote.url = Some(url);
    }
    if let Some(key) = var("SUPABASE_ANON_KEY") {
      self.remote.api_key = Some(key);
    }
    if let Some(path) = var("LOCAL_STATE_PATH") {
      self.local_state_path = if path.is_empty() { None } else { Some(PathBuf::from(path)) };
    }
    if let Some(n) = var("WHEEL_MAX_SEGMENTS").and_then(|v| v.parse().ok()) {
      self.wheel.max_segments = n;
    }
    if let Some(ms) = var("SPIN_DURATION_MS").and_then(|v| v.parse().ok()) {
      self.wheel.spin_duration_ms = ms;
    }
    if let Some(pw) = var("ACCESS_PASSWORD") {
      self.access_password = pw;
    }
  }

  pub fn remote_configured(&self) -> bool {
    let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    set(&self.remote.url) && set(&self.remote.api_key)
  }
}

/// Attempt to load `AppConfig` from APP_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_file_from_env() -> Option<AppConfig> {
  let path = std::env::var("APP_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "prompt_wheel", %path, prompts = cfg.prompts.len(), "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "prompt_wheel", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "prompt_wheel", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn toml_fills_unset_fields_with_defaults() {
    let cfg: AppConfig = toml::from_str(
      r#"
        progress_backend = "remote"

        [remote]
        url = "https://example.supabase.co"

        [[prompts]]
        id = "7ho9"
        title = "Two Roads"
        text = "Write about a choice."
        grade = 7
        section = "Honors"
        example_image = ""
      "#,
    )
    .unwrap();

    assert_eq!(cfg.progress_backend, BackendKind::Remote);
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.wheel.max_segments, 5);
    assert_eq!(cfg.wheel.spin_duration_ms, 4000);
    assert_eq!(cfg.remote.timeout_ms, 10_000);
    assert!(!cfg.remote_configured());

    let p: Prompt = cfg.prompts[0].clone().into();
    assert_eq!(p.grade, Grade::Seventh);
    assert_eq!(p.example_image, None);
  }

  #[test]
  fn bad_grade_is_rejected() {
    let res = toml::from_str::<AppConfig>(
      r#"
        [[prompts]]
        id = "x"
        title = "t"
        text = "t"
        grade = 5
        section = "Humanity"
      "#,
    );
    assert!(res.is_err());
  }

  #[test]
  fn env_overrides_apply() {
    let vars: HashMap<&str, &str> = HashMap::from([
      ("PORT", "8080"),
      ("PROGRESS_BACKEND", "remote"),
      ("SUPABASE_URL", "https://x.supabase.co"),
      ("SUPABASE_ANON_KEY", "anon"),
      ("WHEEL_MAX_SEGMENTS", "3"),
      ("SPIN_DURATION_MS", "10"),
      ("LOCAL_STATE_PATH", ""),
    ]);
    let mut cfg = AppConfig::default();
    cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.progress_backend, BackendKind::Remote);
    assert!(cfg.remote_configured());
    assert_eq!(cfg.wheel.max_segments, 3);
    assert_eq!(cfg.wheel.spin_duration_ms, 10);
    assert_eq!(cfg.local_state_path, None);
    assert_eq!(cfg.access_password, DEFAULT_ACCESS_PASSWORD);
  }
}
