//! The captured submission and its difficulty category.

use serde::{Deserialize, Serialize};

/// One accepted solution as captured from the problem page.
///
/// Field names follow the payload sent by the scraping layer (camelCase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub title: String,
    pub slug: String,
    /// Raw difficulty label as scraped; normalised at push time.
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "questionHtml")]
    pub question_content: Option<String>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
    /// Base64 PNG, optionally with a `data:image/...;base64,` prefix.
    #[serde(default)]
    pub screenshot: Option<String>,
}

/// Difficulty bucket used for paths and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty '{0}'")]
pub struct UnknownDifficulty(pub String);

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Upper-case the first character and lower-case the rest; absent or
    /// empty input means `Easy`.
    pub fn normalize(raw: Option<&str>) -> Result<Difficulty, UnknownDifficulty> {
        let raw = raw.unwrap_or_default();
        let mut chars = raw.chars();
        let normalized = match chars.next() {
            None => return Ok(Difficulty::Easy),
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect::<String>(),
        };
        match normalized.as_str() {
            "Easy" => Ok(Difficulty::Easy),
            "Medium" => Ok(Difficulty::Medium),
            "Hard" => Ok(Difficulty::Hard),
            _ => Err(UnknownDifficulty(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
