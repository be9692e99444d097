//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::PromptRow;
use crate::domain::{Grade, Prompt, Section};
use crate::error::ApiError;
use crate::selection::{SpinPlan, WheelPhase};
use crate::speech::Utterance;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    LoadWheel {
        grade: Grade,
        section: Section,
    },
    Spin,
    MarkFinished {
        #[serde(rename = "promptId")]
        prompt_id: String,
    },
    UnmarkFinished {
        #[serde(rename = "promptId")]
        prompt_id: String,
    },
}

/// Messages the server sends back over WebSocket. A spin produces two:
/// `spinning` right away, `revealed` once the delay has elapsed.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Wheel {
        wheel: WheelOut,
    },
    Spinning {
        plan: SpinPlan,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    Revealed {
        winner: Prompt,
    },
    Progress {
        #[serde(rename = "promptId")]
        prompt_id: String,
        finished: bool,
    },
    Error {
        message: String,
    },
}

impl From<ApiError> for ServerWsMessage {
    fn from(e: ApiError) -> Self {
        ServerWsMessage::Error { message: e.to_string() }
    }
}

//
// HTTP request/response DTOs
//

/// `?grade=6&section=Humanity`; parsed into the closed enums by `scope()`.
#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub grade: String,
    pub section: String,
}

impl ScopeQuery {
    pub fn scope(&self) -> Result<(Grade, Section), ApiError> {
        let grade = self.grade.parse::<Grade>().map_err(ApiError::BadRequest)?;
        let section = self.section.parse::<Section>().map_err(ApiError::BadRequest)?;
        Ok((grade, section))
    }
}

/// A prompt plus the current user's finished flag.
#[derive(Debug, Serialize)]
pub struct PromptOut {
    #[serde(flatten)]
    pub prompt: Prompt,
    pub finished: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptListOut {
    pub grade: Grade,
    pub section: Section,
    pub prompts: Vec<PromptOut>,
    pub total: usize,
    pub finished_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelOut {
    pub grade: Grade,
    pub section: Section,
    pub prompts: Vec<Prompt>,
    /// Unfinished prompts in scope (the pool the wheel was sampled from).
    pub remaining: usize,
    pub total: usize,
    pub all_done: bool,
    pub phase: WheelPhase,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinOut {
    pub plan: SpinPlan,
    pub duration_ms: u64,
    pub winner: Prompt,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedOut {
    pub prompt_id: String,
    pub finished: bool,
}

#[derive(Debug, Serialize)]
pub struct SpeechOut {
    pub supported: bool,
    pub playing: bool,
    pub utterance: Option<Utterance>,
}

#[derive(Deserialize)]
pub struct LoginIn {
    pub password: String,
}
#[derive(Serialize)]
pub struct AuthOut {
    pub authenticated: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeOut {
    pub user_id: String,
    pub backend: &'static str,
    pub remote_catalog: bool,
}

/// Admin view of a remote `prompts` row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRecordOut {
    pub id: String,
    pub prompt_id: String,
    pub title: String,
    pub text: String,
    pub instructions: String,
    pub grade: Grade,
    pub section: Section,
    pub background_image: Option<String>,
    pub example_image: Option<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<PromptRow> for PromptRecordOut {
    fn from(r: PromptRow) -> Self {
        Self {
            id: r.id,
            prompt_id: r.prompt_id,
            title: r.title,
            text: r.text,
            instructions: r.instructions,
            grade: r.grade,
            section: r.section,
            background_image: r.background_image,
            example_image: r.example_image,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
