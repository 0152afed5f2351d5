//! Progress-callback trait for per-quiz and per-cluster events.
//!
//! Inject an [`Arc<dyn QuizProgressCallback>`] via
//! [`crate::config::QuizConfigBuilder::progress_callback`] to receive events
//! as the pipeline works through a batch. The CLI uses it to drive its
//! progress bar; a service could forward the events to a channel instead.
//!
//! # Example
//!
//! ```rust
//! use pdf2quiz::{QuizConfig, QuizProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl QuizProgressCallback for CountingCallback {
//!     fn on_quiz_complete(&self, quiz_id: &str, questions: usize) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{n}: quiz {quiz_id} → {questions} questions");
//!     }
//! }
//!
//! let config = QuizConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes quizzes.
///
/// All methods default to no-ops so implementors only override what they
/// need. Quizzes and clusters are processed one at a time, but the trait is
/// `Send + Sync` so the pipeline itself can be moved across tasks.
pub trait QuizProgressCallback: Send + Sync {
    /// Called once after the quiz list is loaded.
    fn on_batch_start(&self, total_quizzes: usize) {
        let _ = total_quizzes;
    }

    /// Called when processing of a quiz begins.
    fn on_quiz_start(&self, quiz_id: &str, index: usize, total: usize) {
        let _ = (quiz_id, index, total);
    }

    /// Called after each cluster with the number of questions it produced
    /// (0 when the cluster failed).
    fn on_cluster_complete(&self, quiz_id: &str, cluster: usize, total: usize, questions: usize) {
        let _ = (quiz_id, cluster, total, questions);
    }

    /// Called when a quiz's questions were persisted.
    fn on_quiz_complete(&self, quiz_id: &str, questions: usize) {
        let _ = (quiz_id, questions);
    }

    /// Called when a quiz ended in the failed state.
    fn on_quiz_failed(&self, quiz_id: &str, reason: &str) {
        let _ = (quiz_id, reason);
    }

    /// Called once after the last quiz.
    fn on_batch_complete(&self, succeeded: usize, failed: usize) {
        let _ = (succeeded, failed);
    }
}

/// Shared handle type used in [`crate::config::QuizConfig`].
pub type ProgressCallback = Arc<dyn QuizProgressCallback>;

/// Callback that ignores every event.
pub struct NoopProgressCallback;

impl QuizProgressCallback for NoopProgressCallback {}
