//! Question records: what the model emits and what gets persisted.
//!
//! [`RawQuestion`] mirrors the JSON objects the model is asked to produce:
//!
//! ```json
//! { "Question": "…", "answers": ["…", "…", "…", "…"], "correct_answer": 2 }
//! ```
//!
//! Model output is untrusted, so deserialisation is lenient. Odd shapes are
//! kept as-is and later routed through the degraded path of
//! [`crate::normalize::normalize`]. They are not rejected at parse time.

use crate::planner::ANSWER_SLOTS;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A question as generated by the model, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(rename = "Question", alias = "question", default, deserialize_with = "lenient_text")]
    pub text: String,

    #[serde(default, deserialize_with = "lenient_answers")]
    pub answers: Vec<String>,

    /// Index of the correct answer as reported by the model. `None` when the
    /// field was missing, null, empty or not a number.
    #[serde(rename = "correct_answer", default, deserialize_with = "lenient_index")]
    pub correct_index: Option<i64>,
}

impl RawQuestion {
    pub fn new(text: impl Into<String>, answers: Vec<String>, correct_index: i64) -> Self {
        Self {
            text: text.into(),
            answers,
            correct_index: Some(correct_index),
        }
    }

    /// Index of the correct answer when the question is well-formed:
    /// exactly four non-empty answers and an in-range correct index.
    pub fn well_formed_index(&self) -> Option<usize> {
        if self.answers.len() != ANSWER_SLOTS || self.answers.iter().any(|a| a.is_empty()) {
            return None;
        }
        let idx = usize::try_from(self.correct_index?).ok()?;
        (idx < self.answers.len()).then_some(idx)
    }

    pub fn is_well_formed(&self) -> bool {
        self.well_formed_index().is_some()
    }
}

/// A normalised question, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalQuestion {
    pub quiz_id: String,
    pub text: String,
    pub answers: Vec<String>,
    pub correct_index: Option<i64>,
    /// `true` when the raw question was malformed and passed through without
    /// rebalancing.
    pub degraded: bool,
}

impl FinalQuestion {
    /// Text of the correct answer, if `correct_index` points at one.
    pub fn correct_answer(&self) -> Option<&str> {
        let idx = usize::try_from(self.correct_index?).ok()?;
        self.answers.get(idx).map(String::as_str)
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_answers<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => String::new(),
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_index<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
