//! Parsing of the model's reply into [`RawQuestion`]s.
//!
//! The prompt asks for a bare JSON array, but models often wrap it in a
//! ```` ```json ```` fence anyway. Fences are stripped first, then the text
//! must parse as a JSON array of question objects. Anything else is a
//! [`GenerationError::Parse`] and the cluster contributes no questions.
//!
//! Individual fields are parsed leniently (see [`crate::question`]), so a
//! question with three answers or a string index still comes through and is
//! handled by the degraded path of normalisation.

use crate::error::GenerationError;
use crate::question::RawQuestion;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n?(.*?)\r?\n?```\s*$").unwrap()
});

/// Remove an outer code fence (with or without a language tag).
pub fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim(),
        None => trimmed,
    }
}

/// Parse a completion reply into raw questions.
pub fn parse_questions(text: &str) -> Result<Vec<RawQuestion>, GenerationError> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(GenerationError::Parse {
            detail: "empty response".into(),
        });
    }
    serde_json::from_str::<Vec<RawQuestion>>(body).map_err(|e| GenerationError::Parse {
        detail: format!("{e} (first 80 chars: {:?})", preview(body, 80)),
    })
}

fn preview(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
