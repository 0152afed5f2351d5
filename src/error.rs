//! Error types for the pdf2quiz library.
//!
//! Two kinds of failure are kept apart:
//!
//! * [`QuizGenError`] is **fatal**: the batch cannot run at all (bad
//!   configuration, no LLM provider, the quiz listing itself failed).
//!   Returned as `Err(QuizGenError)` from [`crate::quiz::QuizPipeline::run`].
//!
//! * Stage errors ([`FetchError`], [`RenderError`], [`GenerationError`],
//!   [`WriteError`], [`CleanupError`]) are **non-fatal**: one cluster or one
//!   quiz is affected, the rest of the batch carries on. They are logged and
//!   recorded in [`crate::output::QuizOutcome`] as a serialisable
//!   [`FailureReason`] or [`ClusterError`], never propagated upward.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2quiz library.
#[derive(Debug, Error)]
pub enum QuizGenError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The quiz store could not list quizzes; nothing to process.
    #[error("Failed to list quizzes: {0}")]
    Store(#[from] StoreError),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Document download failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Document '{key}' not found")]
    NotFound { key: String },

    #[error("Failed to download '{key}': {reason}")]
    Transport { key: String, reason: String },
}

/// Page count or rasterisation failure.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The document bytes could not be opened as a PDF.
    #[error("Document could not be opened: {detail}")]
    Unreadable { detail: String },

    /// A single page failed to render or could not be written to disk.
    #[error("Rasterisation failed for page {page}: {detail}")]
    Page { page: usize, detail: String },
}

/// Failure of the completion call or of parsing its reply.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Completion call failed: {detail}")]
    Completion { detail: String },

    #[error("Model output is not a JSON question array: {detail}")]
    Parse { detail: String },
}

/// Failure listing quizzes.
#[derive(Debug, Error)]
#[error("{detail}")]
pub struct StoreError {
    pub detail: String,
}

/// Failure of the batch question insert.
#[derive(Debug, Error)]
#[error("Failed to insert {count} questions for quiz '{quiz_id}': {detail}")]
pub struct WriteError {
    pub quiz_id: String,
    pub count: usize,
    pub detail: String,
}

/// Failure removing a transient artifact. Logged, never escalated.
#[derive(Debug, Error)]
#[error("Failed to remove '{path}': {source}")]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Why a quiz ended in the `Failed` state.
///
/// Stored in [`crate::output::QuizOutcome`] so a batch report can be
/// serialised and inspected after the run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FailureReason {
    #[error("document fetch failed: {detail}")]
    FetchFailed { detail: String },

    #[error("document unreadable: {detail}")]
    DocumentUnreadable { detail: String },

    #[error("work directory unavailable: {detail}")]
    WorkDirUnavailable { detail: String },

    #[error("no questions generated across {clusters} clusters")]
    NoQuestions { clusters: usize },

    #[error("question insert failed: {detail}")]
    WriteFailed { detail: String },
}

/// Why a single cluster contributed no questions.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ClusterError {
    #[error("page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    #[error("completion failed: {detail}")]
    CompletionFailed { detail: String },

    #[error("unparseable model output: {detail}")]
    ParseFailed { detail: String },
}

impl From<RenderError> for ClusterError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Page { page, detail } => ClusterError::RenderFailed { page, detail },
            RenderError::Unreadable { detail } => ClusterError::RenderFailed { page: 0, detail },
        }
    }
}

impl From<GenerationError> for ClusterError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Completion { detail } => ClusterError::CompletionFailed { detail },
            GenerationError::Parse { detail } => ClusterError::ParseFailed { detail },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_display() {
        let e = WriteError {
            quiz_id: "q-7".into(),
            count: 10,
            detail: "disk full".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("10 questions"), "got: {msg}");
        assert!(msg.contains("q-7"));
    }

    #[test]
    fn no_questions_display() {
        let e = FailureReason::NoQuestions { clusters: 5 };
        assert!(e.to_string().contains("5 clusters"));
    }

    #[test]
    fn render_error_maps_to_cluster_error() {
        let e: ClusterError = RenderError::Page {
            page: 4,
            detail: "bitmap".into(),
        }
        .into();
        assert_eq!(
            e,
            ClusterError::RenderFailed {
                page: 4,
                detail: "bitmap".into()
            }
        );
    }

    #[test]
    fn parse_error_maps_to_cluster_error() {
        let e: ClusterError = GenerationError::Parse {
            detail: "expected `[`".into(),
        }
        .into();
        assert!(matches!(e, ClusterError::ParseFailed { .. }));
    }

    #[test]
    fn store_error_converts_to_fatal() {
        let e: QuizGenError = StoreError {
            detail: "manifest missing".into(),
        }
        .into();
        assert!(e.to_string().contains("manifest missing"));
    }
}
