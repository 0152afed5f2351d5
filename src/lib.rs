//! # pdf2quiz
//!
//! Generate multiple-choice quiz questions from PDF documents using Vision
//! Language Models (VLMs).
//!
//! For every quiz in a store, the crate downloads the quiz's PDF, samples a
//! few clusters of consecutive pages, rasterises each cluster and asks a VLM
//! to write questions about what it sees. Before the questions are persisted,
//! the correct answers are spread evenly across the four answer slots, so a
//! quiz taker cannot win by always picking "A".
//!
//! ## Pipeline Overview
//!
//! ```text
//! Store ── list quizzes
//!  │
//!  ├─ 1. Fetch      download the PDF from the blob store
//!  ├─ 2. Sample     pick page clusters, disjoint when the document allows
//!  ├─ 3. Render     rasterise cluster pages via pdfium (spawn_blocking)
//!  ├─ 4. Generate   one VLM call per cluster → JSON questions
//!  ├─ 5. Normalize  balanced correct-answer slots, shuffled distractors
//!  ├─ 6. Persist    one batch insert per quiz
//!  └─ 7. Cleanup    delete rendered pages and the work directory
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2quiz::{JsonFileStore, LocalBlobStore, QuizConfig, QuizPipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = QuizConfig::builder().seed(7).build()?;
//!     let pipeline = QuizPipeline::from_config(
//!         config,
//!         Arc::new(LocalBlobStore::new("documents")),
//!         Arc::new(JsonFileStore::new("quizzes.json", "questions.jsonl")),
//!     )?;
//!     let report = pipeline.run().await?;
//!     eprintln!(
//!         "{} questions for {}/{} quizzes, ~${:.4}",
//!         report.questions_inserted(),
//!         report.succeeded(),
//!         report.quizzes.len(),
//!         report.estimated_cost_usd
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2quiz` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2quiz = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! | Model | $/1M tokens | Best for |
//! |-------|------------|----------|
//! | `gpt-4.1-nano` | $0.10/$0.40 | Default, fast and cheap |
//! | `gpt-4.1-mini` | $0.40/$1.60 | Better distractors |
//! | `claude-sonnet-4-20250514` | $3.00/$15.00 | Dense technical pages |
//! | `gemini-2.0-flash` | $0.10/$0.40 | Alternative cheap option |
//!
//! With the defaults (5 clusters of 3 pages, 2 questions each) a quiz costs
//! well under a cent with `gpt-4.1-nano`.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod cost;
pub mod error;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod prompts;
pub mod question;
pub mod quiz;
pub mod sampler;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{QuizConfig, QuizConfigBuilder};
pub use cost::{CostLedger, Pricing, Usage};
pub use error::{ClusterError, FailureReason, QuizGenError};
pub use output::{BatchReport, ClusterReport, QuizOutcome, QuizState};
pub use pipeline::fetch::{BlobStore, HttpBlobStore, LocalBlobStore};
pub use pipeline::generate::{Completion, CompletionOutput, LlmCompletion};
pub use pipeline::render::{ImageFormat, PageRenderer, PdfiumRenderer, RenderOptions, RenderedPage};
pub use progress::{NoopProgressCallback, ProgressCallback, QuizProgressCallback};
pub use question::{FinalQuestion, RawQuestion};
pub use quiz::QuizPipeline;
pub use sampler::{PageCluster, SampleExit, SampledCluster, UsedPages};
pub use store::{JsonFileStore, QuizRecord, QuizStore};
