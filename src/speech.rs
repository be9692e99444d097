//! Read-aloud playback: one utterance at a time over a pluggable engine.
//!
//! `Narrator::speak` stops whatever is playing, picks a voice, and plays the
//! text on a background task; `on_done` runs when playback ends or fails.
//! `stop` aborts the task without running `on_done`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Voices tried first, in order, by substring match on the voice name.
pub const PREFERRED_VOICES: &[&str] = &[
  "Google US English",
  "Microsoft Aria Online (Natural) - English (United States)",
  "Microsoft Jenny Online (Natural) - English (United States)",
  "Samantha",
  "Alex",
  "Karen",
  "Daniel",
  "Fiona",
  "Moira",
  "Tessa",
  "Microsoft David",
  "Microsoft Zira",
  "Google UK English Female",
  "Google UK English Male",
];

const FEMALE_HINTS: &[&str] = &["female", "woman", "samantha", "karen", "victoria", "jenny", "aria"];
const NATURAL_HINTS: &[&str] = &["natural", "enhanced", "premium"];

pub const DEFAULT_RATE: f32 = 0.95;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Voice {
  pub name: String,
  pub lang: String,
}

impl Voice {
  pub fn new(name: &str, lang: &str) -> Self {
    Self { name: name.into(), lang: lang.into() }
  }

  fn is_english(&self) -> bool { self.lang.starts_with("en") }

  fn name_has_any(&self, hints: &[&str]) -> bool {
    let lower = self.name.to_lowercase();
    hints.iter().any(|h| lower.contains(h))
  }
}

/// Best available voice: preferred names, then English voices that sound
/// female, then "natural" English voices, then any English voice, then anything.
pub fn select_voice(voices: &[Voice]) -> Option<&Voice> {
  for preferred in PREFERRED_VOICES {
    if let Some(v) = voices.iter().find(|v| v.name.contains(preferred)) {
      return Some(v);
    }
  }
  let english: Vec<&Voice> = voices.iter().filter(|v| v.is_english()).collect();
  let chosen = english
    .iter()
    .find(|v| v.name_has_any(FEMALE_HINTS))
    .or_else(|| english.iter().find(|v| v.name_has_any(NATURAL_HINTS)))
    .or_else(|| english.first())
    .copied();
  chosen.or_else(|| voices.first())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Utterance {
  pub text: String,
  pub voice: Option<Voice>,
  pub rate: f32,
  pub pitch: f32,
  pub volume: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
  #[error("speech synthesis not supported")]
  Unsupported,
  #[error("speech synthesis failed: {0}")]
  Failed(String),
}

#[async_trait]
pub trait SpeechEngine: Send + Sync {
  fn voices(&self) -> Vec<Voice>;

  /// Play the utterance to completion.
  async fn play(&self, utterance: &Utterance) -> Result<(), SpeechError>;
}

/// Engine that "plays" for as long as reading the text would take.
pub struct SimulatedEngine {
  voices: Vec<Voice>,
  words_per_minute: f32,
}

impl SimulatedEngine {
  pub fn new(voices: Vec<Voice>, words_per_minute: f32) -> Self {
    Self { voices, words_per_minute }
  }

  pub fn playback_time(&self, utterance: &Utterance) -> Duration {
    let words = utterance.text.split_whitespace().count() as f32;
    let wpm = (self.words_per_minute * utterance.rate).max(1.0);
    Duration::from_secs_f32(words / wpm * 60.0)
  }
}

impl Default for SimulatedEngine {
  fn default() -> Self {
    Self::new(vec![Voice::new("Google US English", "en-US"), Voice::new("Daniel", "en-GB")], 160.0)
  }
}

#[async_trait]
impl SpeechEngine for SimulatedEngine {
  fn voices(&self) -> Vec<Voice> { self.voices.clone() }

  async fn play(&self, utterance: &Utterance) -> Result<(), SpeechError> {
    if utterance.voice.is_none() && !self.voices.is_empty() {
      return Err(SpeechError::Failed("no voice selected".into()));
    }
    tokio::time::sleep(self.playback_time(utterance)).await;
    Ok(())
  }
}

struct Playback {
  utterance: Utterance,
  handle: JoinHandle<()>,
}

/// Single-utterance playback controller.
pub struct Narrator {
  engine: Option<Arc<dyn SpeechEngine>>,
  current: Mutex<Option<Playback>>,
}

impl Narrator {
  pub fn new(engine: Option<Arc<dyn SpeechEngine>>) -> Self {
    Self { engine, current: Mutex::new(None) }
  }

  pub fn is_supported(&self) -> bool { self.engine.is_some() }

  /// Start reading `text`, replacing any utterance in flight. Returns what is
  /// being played, or None when no engine is available.
  #[instrument(level = "info", skip(self, text, on_done), fields(text_len = text.len()))]
  pub async fn speak<F>(&self, text: &str, on_done: F) -> Option<Utterance>
  where
    F: FnOnce() + Send + 'static,
  {
    let mut current = self.current.lock().await;
    if let Some(prev) = current.take() {
      prev.handle.abort();
    }

    let Some(engine) = self.engine.clone() else {
      error!(target: "speech", error = %SpeechError::Unsupported, "Cannot narrate");
      on_done();
      return None;
    };

    let voices = engine.voices();
    let utterance = Utterance {
      text: text.to_string(),
      voice: select_voice(&voices).cloned(),
      rate: DEFAULT_RATE,
      pitch: 1.0,
      volume: 1.0,
    };
    info!(target: "speech", voice = ?utterance.voice.as_ref().map(|v| &v.name), "Narration started");

    let playing = utterance.clone();
    let handle = tokio::spawn(async move {
      match engine.play(&playing).await {
        Ok(()) => debug!(target: "speech", "Narration finished"),
        Err(e) => error!(target: "speech", error = %e, "Speech synthesis error"),
      }
      on_done();
    });
    *current = Some(Playback { utterance: utterance.clone(), handle });
    Some(utterance)
  }

  /// Cancel playback in flight, if any.
  pub async fn stop(&self) {
    if let Some(prev) = self.current.lock().await.take() {
      prev.handle.abort();
      debug!(target: "speech", "Narration stopped");
    }
  }

  pub async fn is_playing(&self) -> bool {
    self.current.lock().await.as_ref().is_some_and(|p| !p.handle.is_finished())
  }

  /// The utterance currently playing.
  pub async fn now_playing(&self) -> Option<Utterance> {
    self
      .current
      .lock()
      .await
      .as_ref()
      .filter(|p| !p.handle.is_finished())
      .map(|p| p.utterance.clone())
  }
}
