//! Result types returned by the quiz pipeline.
//!
//! Everything here is `Serialize` so a whole batch can be dumped as JSON for
//! later inspection (`pdf2quiz --json`).

use crate::cost::{CostLedger, Pricing};
use crate::error::{ClusterError, FailureReason};
use crate::sampler::SampledCluster;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one quiz.
///
/// ```text
/// Fetching → Sampling → Rendering → Generating → Normalizing → Persisting → Cleanup → Done
///     └────────────┴──────────┴───────────┴─────────────┴────────────┴──▶ Failed(reason)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizState {
    Fetching,
    Sampling,
    Rendering,
    Generating,
    Normalizing,
    Persisting,
    Cleanup,
    Done,
    Failed(FailureReason),
}

impl QuizState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuizState::Done | QuizState::Failed(_))
    }
}

impl fmt::Display for QuizState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizState::Failed(reason) => write!(f, "Failed({reason})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// What one cluster contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub sampled: SampledCluster,
    /// Questions parsed from the model reply (0 on failure).
    pub questions: usize,
    pub error: Option<ClusterError>,
}

/// Result of processing one quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOutcome {
    pub quiz_id: String,
    /// `Done` or `Failed(reason)`.
    pub state: QuizState,
    pub page_count: usize,
    pub clusters: Vec<ClusterReport>,
    /// Rows actually written to the store.
    pub questions_inserted: usize,
    /// Questions stored without answer rebalancing.
    pub degraded_questions: usize,
    /// Usage of this quiz's completion calls.
    pub usage: CostLedger,
    /// Artifacts that could not be removed during cleanup.
    pub cleanup_errors: usize,
    pub duration_ms: u64,
}

impl QuizOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == QuizState::Done
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.state {
            QuizState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Result of a whole batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub quizzes: Vec<QuizOutcome>,
    pub usage: CostLedger,
    pub pricing: Pricing,
    /// Estimated spend in US dollars.
    pub estimated_cost_usd: f64,
    pub total_duration_ms: u64,
}

impl BatchReport {
    /// Fold quiz outcomes into a report, summing their usage.
    pub fn from_outcomes(quizzes: Vec<QuizOutcome>, pricing: Pricing, total_duration_ms: u64) -> Self {
        let usage = quizzes
            .iter()
            .fold(CostLedger::default(), |acc, q| acc.merge(q.usage));
        Self {
            estimated_cost_usd: usage.estimated_cost(&pricing),
            quizzes,
            usage,
            pricing,
            total_duration_ms,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.quizzes.iter().filter(|q| q.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.quizzes.len() - self.succeeded()
    }

    pub fn questions_inserted(&self) -> usize {
        self.quizzes.iter().map(|q| q.questions_inserted).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, state: QuizState, prompt_tokens: u64) -> QuizOutcome {
        QuizOutcome {
            quiz_id: id.into(),
            state,
            page_count: 12,
            clusters: Vec::new(),
            questions_inserted: 10,
            degraded_questions: 0,
            usage: CostLedger {
                calls: 5,
                prompt_tokens,
                completion_tokens: 1_000,
            },
            cleanup_errors: 0,
            duration_ms: 5,
        }
    }

    #[test]
    fn batch_report_folds_usage() {
        let report = BatchReport::from_outcomes(
            vec![
                outcome("a", QuizState::Done, 1_000_000),
                outcome("b", QuizState::Failed(FailureReason::NoQuestions { clusters: 5 }), 0),
            ],
            Pricing::new(1.0, 0.0),
            42,
        );
        assert_eq!(report.usage.calls, 10);
        assert_eq!(report.usage.prompt_tokens, 1_000_000);
        assert!((report.estimated_cost_usd - 1.0).abs() < 1e-9);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn state_display() {
        assert_eq!(QuizState::Done.to_string(), "Done");
        let failed = QuizState::Failed(FailureReason::NoQuestions { clusters: 5 });
        assert!(failed.to_string().starts_with("Failed("));
        assert!(failed.is_terminal());
        assert!(!QuizState::Rendering.is_terminal());
    }

    #[test]
    fn outcome_serialises() {
        let json = serde_json::to_string(&outcome("a", QuizState::Done, 1)).unwrap();
        assert!(json.contains("\"quiz_id\":\"a\""));
        assert!(json.contains("\"Done\""));
    }
}
