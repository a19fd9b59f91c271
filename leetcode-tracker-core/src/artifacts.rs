//! Artifact uploader: turns a [`Submission`] into the files stored under
//! `problems/<Difficulty>/<slug>/`.
//!
//! Optional inputs (question text, code, screenshot) only skip their own
//! file. A failing write stops the upload; files written before it stay.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::content_store::{ContentStore, ContentStoreError, FileContent};
use crate::contract::RemoteApi;
use crate::submission::{Difficulty, Submission};

/// Language label (lower-cased) to solution file extension.
pub const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("java", "java"),
    ("cpp", "cpp"),
    ("c", "c"),
    ("python", "py"),
    ("javascript", "js"),
    ("typescript", "ts"),
];

pub const FALLBACK_EXTENSION: &str = "txt";

pub fn solution_extension(language: &str) -> &'static str {
    let language = language.trim().to_lowercase();
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, ext)| *ext)
        .unwrap_or(FALLBACK_EXTENSION)
}

pub fn base_path(difficulty: Difficulty, slug: &str) -> String {
    format!("problems/{difficulty}/{slug}")
}

fn data_uri_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"^data:image/[A-Za-z0-9.+-]+;base64,").expect("static regex is valid")
    })
}

/// Drop a leading `data:image/...;base64,` so only the payload remains.
pub fn strip_data_uri(screenshot: &str) -> &str {
    match data_uri_prefix().find(screenshot) {
        Some(prefix) => &screenshot[prefix.end()..],
        None => screenshot,
    }
}

/// `question.html` for markup, `question.md` otherwise.
pub fn question_file_name(content: &str) -> &'static str {
    if content.trim_start().starts_with('<') {
        "question.html"
    } else {
        "question.md"
    }
}

#[derive(Debug, Serialize)]
struct ProblemMeta<'a> {
    title: &'a str,
    difficulty: Difficulty,
    topics: &'a [String],
    url: &'a str,
    date: String,
}

/// Pretty-printed `meta.json` body.
pub fn render_meta(submission: &Submission, difficulty: Difficulty, date: NaiveDate) -> String {
    let meta = ProblemMeta {
        title: &submission.title,
        difficulty,
        topics: &submission.topics,
        url: &submission.url,
        date: date.format("%Y-%m-%d").to_string(),
    };
    serde_json::to_string_pretty(&meta).unwrap_or_default()
}

/// One file to write: repository path plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub content: FileContent,
}

/// The ordered artifact set for a submission. Skipped files are absent.
pub fn plan_artifacts(
    submission: &Submission,
    difficulty: Difficulty,
    date: NaiveDate,
) -> Vec<Artifact> {
    let base = base_path(difficulty, &submission.slug);
    let mut artifacts = vec![Artifact {
        path: format!("{base}/meta.json"),
        content: FileContent::Text(render_meta(submission, difficulty, date)),
    }];

    match submission.question_content.as_deref() {
        Some(question) if !question.trim().is_empty() => artifacts.push(Artifact {
            path: format!("{base}/{}", question_file_name(question)),
            content: FileContent::Text(question.to_string()),
        }),
        _ => info!(slug = %submission.slug, "No question content, skipping question file"),
    }

    if submission.code.is_empty() {
        warn!(slug = %submission.slug, "No solution code captured, skipping solution file");
    } else {
        artifacts.push(Artifact {
            path: format!(
                "{base}/solution.{}",
                solution_extension(&submission.language)
            ),
            content: FileContent::Text(submission.code.clone()),
        });
    }

    match submission.screenshot.as_deref().map(strip_data_uri) {
        Some(encoded) if !encoded.is_empty() => artifacts.push(Artifact {
            path: format!("{base}/screenshot.png"),
            content: FileContent::Base64(encoded.to_string()),
        }),
        _ => info!(slug = %submission.slug, "No screenshot, skipping screenshot file"),
    }

    artifacts
}

/// Write every planned artifact in order. Returns the written paths.
pub async fn upload_artifacts<A: RemoteApi + ?Sized>(
    store: &ContentStore<'_, A>,
    submission: &Submission,
    difficulty: Difficulty,
    date: NaiveDate,
) -> Result<Vec<String>, ContentStoreError> {
    let mut written = Vec::new();
    for artifact in plan_artifacts(submission, difficulty, date) {
        store.write_file(&artifact.path, artifact.content).await?;
        written.push(artifact.path);
    }
    info!(slug = %submission.slug, files = written.len(), "Uploaded artifacts");
    Ok(written)
}
