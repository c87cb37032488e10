use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::core::error::GenerationError;

/// Title and lyrics as returned by the songwriting call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SongDraft {
    pub title: String,
    pub lyrics: String,
}

static CODE_FENCE: OnceLock<Regex> = OnceLock::new();

fn code_fence() -> &'static Regex {
    CODE_FENCE.get_or_init(|| Regex::new(r"```(json)?\s*([\s\S]*?)\s*```").expect("Invalid code fence regex"))
}

/// Free-text responses are only trimmed. Empty text is passed through.
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_string()
}

/// Content of the first fenced block (optionally labelled `json`), or the
/// trimmed input when there is none.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    match code_fence().captures(trimmed).and_then(|c| c.get(2)) {
        Some(inner) if !inner.as_str().is_empty() => inner.as_str().to_string(),
        _ => trimmed.to_string(),
    }
}

fn malformed(reason: impl Into<String>, raw: &str) -> GenerationError {
    let reason = reason.into();
    log::error!(target: "gemini", "Error parsing title and lyrics: {}. Raw response: {}", reason, raw);
    GenerationError::MalformedGeneration {
        reason,
        raw: raw.to_string(),
    }
}

/// Validates the songwriting response: a JSON object with string `title`
/// and `lyrics`, possibly wrapped in a code fence.
pub fn parse_title_and_lyrics(raw: &str) -> Result<SongDraft, GenerationError> {
    if raw.trim().is_empty() {
        log::error!(target: "gemini", "Gemini response is empty");
        return Err(GenerationError::EmptyResponse);
    }

    let cleaned = strip_code_fence(raw);
    let value: serde_json::Value =
        serde_json::from_str(&cleaned).map_err(|e| malformed(e.to_string(), raw))?;

    match (value.get("title"), value.get("lyrics")) {
        (Some(serde_json::Value::String(title)), Some(serde_json::Value::String(lyrics))) => Ok(SongDraft {
            title: title.clone(),
            lyrics: lyrics.clone(),
        }),
        _ => Err(malformed("missing title or lyrics", raw)),
    }
}

/// The suggestion if it names one of `styles` exactly, otherwise `None`.
pub fn match_style_suggestion(raw: &str, styles: &[String]) -> Option<String> {
    let suggested = raw.trim();
    if styles.iter().any(|s| s == suggested) {
        Some(suggested.to_string())
    } else {
        log::warn!(target: "gemini", "Suggested style not in list or invalid response: {:?}", suggested);
        None
    }
}
