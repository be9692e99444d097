//! Domain models used by the backend: grades, sections, prompts, finished marks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// School grade a prompt is written for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Grade {
  Sixth,
  Seventh,
  Eighth,
}

impl Grade {
  pub const ALL: [Grade; 3] = [Grade::Sixth, Grade::Seventh, Grade::Eighth];

  pub fn as_u8(self) -> u8 {
    match self {
      Grade::Sixth => 6,
      Grade::Seventh => 7,
      Grade::Eighth => 8,
    }
  }
}

impl TryFrom<u8> for Grade {
  type Error = String;

  fn try_from(v: u8) -> Result<Self, Self::Error> {
    match v {
      6 => Ok(Grade::Sixth),
      7 => Ok(Grade::Seventh),
      8 => Ok(Grade::Eighth),
      other => Err(format!("unsupported grade {other} (expected 6, 7 or 8)")),
    }
  }
}

impl From<Grade> for u8 {
  fn from(g: Grade) -> u8 { g.as_u8() }
}

impl FromStr for Grade {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let n: u8 = s.trim().parse().map_err(|_| format!("invalid grade '{s}'"))?;
    Grade::try_from(n)
  }
}

impl fmt::Display for Grade {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_u8()) }
}

/// Prompt category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
  Humanity,
  Honors,
}

impl Section {
  pub fn as_str(self) -> &'static str {
    match self {
      Section::Humanity => "Humanity",
      Section::Honors => "Honors",
    }
  }
}

impl FromStr for Section {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "Humanity" => Ok(Section::Humanity),
      "Honors" => Ok(Section::Honors),
      other => Err(format!("unsupported section '{other}' (expected Humanity or Honors)")),
    }
  }
}

impl fmt::Display for Section {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A writing prompt as shown to students. Owned by the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
  pub id: String,
  pub title: String,
  pub text: String,
  pub instructions: String,
  pub grade: Grade,
  pub section: Section,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub background_image: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub example_image: Option<String>,
}

impl Prompt {
  pub fn in_scope(&self, grade: Grade, section: Section) -> bool {
    self.grade == grade && self.section == section
  }

  /// Text read aloud for this prompt.
  pub fn narration(&self) -> String {
    format!("{}. {}. {}", self.title, self.text, self.instructions)
  }
}

/// Association between a user and a finished prompt (a `user_progress` row).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedMark {
  pub user_id: String,
  pub prompt_id: String,
  pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn grade_parses_only_known_values() {
    assert_eq!("7".parse::<Grade>(), Ok(Grade::Seventh));
    assert!("9".parse::<Grade>().is_err());
    assert!("seven".parse::<Grade>().is_err());
  }

  #[test]
  fn grade_serializes_as_number() {
    assert_eq!(serde_json::to_string(&Grade::Eighth).unwrap(), "8");
    let g: Grade = serde_json::from_str("6").unwrap();
    assert_eq!(g, Grade::Sixth);
    assert!(serde_json::from_str::<Grade>("5").is_err());
  }

  #[test]
  fn section_is_case_sensitive() {
    assert_eq!("Honors".parse::<Section>(), Ok(Section::Honors));
    assert!("honors".parse::<Section>().is_err());
  }

  #[test]
  fn narration_joins_title_text_and_instructions() {
    let p = Prompt {
      id: "6h1".into(),
      title: "A Kind Act".into(),
      text: "Describe a time someone helped you".into(),
      instructions: "Write two paragraphs".into(),
      grade: Grade::Sixth,
      section: Section::Humanity,
      background_image: None,
      example_image: None,
    };
    assert_eq!(p.narration(), "A Kind Act. Describe a time someone helped you. Write two paragraphs");
  }
}
