//! Quiz pipeline: turn each stored quiz's PDF into a persisted question set.
//!
//! ```text
//! Store.list_quizzes
//!  │
//!  └─ for each quiz (one at a time)
//!      ├─ Fetching     download bytes, derive page count
//!      ├─ Sampling     cluster_count page windows (best-effort disjoint)
//!      ├─ for each cluster (one at a time)
//!      │   ├─ Rendering   rasterise pages into the quiz work dir
//!      │   └─ Generating  one VLM call, parse JSON questions
//!      ├─ Normalizing  plan balanced slots, move correct answers
//!      ├─ Persisting   one batch insert
//!      └─ Cleanup      delete rendered pages and the work dir
//! ```
//!
//! Failures are isolated at the smallest unit. A cluster that fails to
//! render, call or parse contributes zero questions. A quiz that cannot be
//! fetched, yields no questions or fails to persist ends in
//! [`QuizState::Failed`]. Neither ever aborts the batch, and nothing is
//! retried.

use crate::config::QuizConfig;
use crate::cost::CostLedger;
use crate::error::{CleanupError, ClusterError, FailureReason, QuizGenError};
use crate::normalize::normalize;
use crate::output::{BatchReport, ClusterReport, QuizOutcome, QuizState};
use crate::pipeline::fetch::{looks_like_pdf, BlobStore};
use crate::pipeline::generate::{Completion, LlmCompletion};
use crate::pipeline::render::{PageRenderer, PdfiumRenderer, RenderedPage};
use crate::pipeline::{encode, parse};
use crate::planner;
use crate::prompts::{user_instruction, DEFAULT_SYSTEM_PROMPT};
use crate::question::{FinalQuestion, RawQuestion};
use crate::sampler::{self, SampledCluster};
use crate::store::{QuizRecord, QuizStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

/// Drives quizzes through the pipeline using the injected collaborators.
pub struct QuizPipeline {
    config: QuizConfig,
    blobs: Arc<dyn BlobStore>,
    renderer: Arc<dyn PageRenderer>,
    completion: Arc<dyn Completion>,
    store: Arc<dyn QuizStore>,
}

impl QuizPipeline {
    pub fn new(
        config: QuizConfig,
        blobs: Arc<dyn BlobStore>,
        renderer: Arc<dyn PageRenderer>,
        completion: Arc<dyn Completion>,
        store: Arc<dyn QuizStore>,
    ) -> Self {
        Self {
            config,
            blobs,
            renderer,
            completion,
            store,
        }
    }

    /// Production wiring: pdfium rendering and the provider resolved from
    /// `config` and the environment.
    pub fn from_config(
        config: QuizConfig,
        blobs: Arc<dyn BlobStore>,
        store: Arc<dyn QuizStore>,
    ) -> Result<Self, QuizGenError> {
        let completion = LlmCompletion::from_config(&config)?;
        Ok(Self::new(
            config,
            blobs,
            Arc::new(PdfiumRenderer::new()),
            Arc::new(completion),
            store,
        ))
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    /// Process every quiz the store lists, strictly one after another.
    ///
    /// # Errors
    /// Only when the quiz list itself cannot be loaded. Per-quiz failures
    /// are reported in the returned [`BatchReport`].
    pub async fn run(&self) -> Result<BatchReport, QuizGenError> {
        let start = Instant::now();
        let quizzes = self.store.list_quizzes().await?;
        let total = quizzes.len();
        info!("Loaded {} quizzes", total);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut outcomes = Vec::with_capacity(total);
        for (i, quiz) in quizzes.iter().enumerate() {
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_quiz_start(&quiz.id, i + 1, total);
            }

            let outcome = self.process_quiz(quiz, &mut rng).await;

            if let Some(ref cb) = self.config.progress_callback {
                match outcome.failure() {
                    None => cb.on_quiz_complete(&quiz.id, outcome.questions_inserted),
                    Some(reason) => cb.on_quiz_failed(&quiz.id, &reason.to_string()),
                }
            }
            outcomes.push(outcome);
        }

        let report = BatchReport::from_outcomes(
            outcomes,
            self.config.effective_pricing(),
            start.elapsed().as_millis() as u64,
        );

        info!(
            "Batch complete: {}/{} quizzes, {} questions, {} calls, {} in / {} out tokens, ~${:.4}",
            report.succeeded(),
            total,
            report.questions_inserted(),
            report.usage.calls,
            report.usage.prompt_tokens,
            report.usage.completion_tokens,
            report.estimated_cost_usd
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(report.succeeded(), report.failed());
        }

        Ok(report)
    }

    /// Run one quiz through every state and always clean up afterwards.
    pub async fn process_quiz<R: Rng + Send>(&self, quiz: &QuizRecord, rng: &mut R) -> QuizOutcome {
        let start = Instant::now();
        info!("Quiz {}: processing '{}'", quiz.id, quiz.document_ref);

        let mut run = QuizRun::new(&quiz.id);
        let result = self.drive(quiz, &mut run, rng).await;

        run.enter(QuizState::Cleanup);
        let cleanup_errors = run.workspace.cleanup().await;

        let final_state = match result {
            Ok(inserted) => {
                run.questions_inserted = inserted;
                info!(
                    "Quiz {}: stored {} questions ({} degraded)",
                    quiz.id, inserted, run.degraded_questions
                );
                QuizState::Done
            }
            Err(reason) => {
                error!("Quiz {}: failed: {}", quiz.id, reason);
                QuizState::Failed(reason)
            }
        };
        run.enter(final_state);

        QuizOutcome {
            quiz_id: quiz.id.clone(),
            state: run.state,
            page_count: run.page_count,
            clusters: run.clusters,
            questions_inserted: run.questions_inserted,
            degraded_questions: run.degraded_questions,
            usage: run.usage,
            cleanup_errors,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn drive<R: Rng + Send>(
        &self,
        quiz: &QuizRecord,
        run: &mut QuizRun,
        rng: &mut R,
    ) -> Result<usize, FailureReason> {
        // ── Fetching ─────────────────────────────────────────────────────────
        run.enter(QuizState::Fetching);
        let bytes = self
            .blobs
            .download(&quiz.document_ref)
            .await
            .map_err(|e| FailureReason::FetchFailed {
                detail: e.to_string(),
            })?;
        if !looks_like_pdf(&bytes) {
            return Err(FailureReason::DocumentUnreadable {
                detail: format!("not a PDF (first bytes {:?})", &bytes[..bytes.len().min(4)]),
            });
        }
        let document: Arc<[u8]> = Arc::from(bytes);

        let page_count = self
            .renderer
            .page_count(Arc::clone(&document))
            .await
            .map_err(|e| FailureReason::DocumentUnreadable {
                detail: e.to_string(),
            })?;
        if page_count == 0 {
            return Err(FailureReason::DocumentUnreadable {
                detail: "document has no pages".into(),
            });
        }
        run.page_count = page_count;
        info!("Quiz {}: document has {} pages", quiz.id, page_count);

        run.workspace
            .create(&self.config, &quiz.id)
            .await
            .map_err(|e| FailureReason::WorkDirUnavailable {
                detail: e.to_string(),
            })?;

        // ── Sampling ─────────────────────────────────────────────────────────
        run.enter(QuizState::Sampling);
        let sampled = sampler::sample_clusters(
            page_count,
            self.config.cluster_size,
            self.config.cluster_count,
            rng,
        );
        for s in sampled.iter().filter(|s| s.exit.is_degraded()) {
            debug!(
                "Quiz {}: cluster {}-{} overlaps earlier clusters ({:?})",
                quiz.id,
                s.cluster.start_page,
                s.cluster.end_page(),
                s.exit
            );
        }

        // ── Rendering + Generating, one cluster at a time ────────────────────
        let system = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let user = self
            .config
            .user_prompt
            .clone()
            .unwrap_or_else(|| user_instruction(self.config.questions_per_cluster));

        let mut raw: Vec<RawQuestion> = Vec::new();
        let total_clusters = sampled.len();
        for (i, s) in sampled.into_iter().enumerate() {
            let report = match self
                .process_cluster(&quiz.id, &document, s, system, &user, run)
                .await
            {
                Ok(questions) => {
                    let report = ClusterReport {
                        sampled: s,
                        questions: questions.len(),
                        error: None,
                    };
                    raw.extend(questions);
                    report
                }
                Err(e) => {
                    warn!(
                        "Quiz {}: cluster {}-{} contributed no questions: {}",
                        quiz.id,
                        s.cluster.start_page,
                        s.cluster.end_page(),
                        e
                    );
                    ClusterReport {
                        sampled: s,
                        questions: 0,
                        error: Some(e),
                    }
                }
            };

            if let Some(ref cb) = self.config.progress_callback {
                cb.on_cluster_complete(&quiz.id, i + 1, total_clusters, report.questions);
            }
            run.clusters.push(report);
        }
        drop(document);

        if raw.is_empty() {
            return Err(FailureReason::NoQuestions {
                clusters: total_clusters,
            });
        }

        // ── Normalizing ──────────────────────────────────────────────────────
        run.enter(QuizState::Normalizing);
        let finals = normalize_all(&raw, &quiz.id, rng);
        run.degraded_questions = finals.iter().filter(|q| q.degraded).count();
        if run.degraded_questions > 0 {
            warn!(
                "Quiz {}: {}/{} questions malformed, stored without rebalancing",
                quiz.id,
                run.degraded_questions,
                finals.len()
            );
        }

        // ── Persisting ───────────────────────────────────────────────────────
        run.enter(QuizState::Persisting);
        self.store
            .insert_questions(&finals)
            .await
            .map_err(|e| FailureReason::WriteFailed {
                detail: e.to_string(),
            })?;

        Ok(finals.len())
    }

    /// Render the cluster's pages, call the model once, parse the reply.
    async fn process_cluster(
        &self,
        quiz_id: &str,
        document: &Arc<[u8]>,
        sampled: SampledCluster,
        system: &str,
        user: &str,
        run: &mut QuizRun,
    ) -> Result<Vec<RawQuestion>, ClusterError> {
        run.enter(QuizState::Rendering);
        let mut images = Vec::with_capacity(sampled.cluster.size);
        for page in sampled.cluster.pages() {
            let cached = run.workspace.rendered(page).cloned();
            let rendered = match cached {
                Some(existing) => existing,
                None => {
                    let dir = run.workspace.dir().ok_or_else(|| ClusterError::RenderFailed {
                        page,
                        detail: "work directory missing".into(),
                    })?;
                    let rendered = self
                        .renderer
                        .render_page(Arc::clone(document), page, &self.config.render, &dir)
                        .await?;
                    run.workspace.track(rendered.clone());
                    rendered
                }
            };

            let image = encode::encode_page(&rendered)
                .await
                .map_err(|e| ClusterError::RenderFailed {
                    page,
                    detail: format!("reading rendered image: {e}"),
                })?;
            images.push(image);
        }

        run.enter(QuizState::Generating);
        let output = self.completion.generate(images, system, user).await?;
        run.usage.record(output.usage);
        debug!(
            "Quiz {}: pages {}-{} → {} chars",
            quiz_id,
            sampled.cluster.start_page,
            sampled.cluster.end_page(),
            output.text.len()
        );

        Ok(parse::parse_questions(&output.text)?)
    }
}

/// Plan balanced target slots and normalise every question.
///
/// Each question gets its own seed drawn up front, so an item depends only
/// on its raw question, its planned slot and its seed.
pub fn normalize_all<R: Rng + ?Sized>(
    raw: &[RawQuestion],
    quiz_id: &str,
    rng: &mut R,
) -> Vec<FinalQuestion> {
    let targets = planner::plan(raw.len(), rng);
    let seeds: Vec<u64> = (0..raw.len()).map(|_| rng.gen()).collect();

    raw.iter()
        .zip(targets)
        .zip(seeds)
        .map(|((q, target), seed)| normalize(q, target, quiz_id, &mut StdRng::seed_from_u64(seed)))
        .collect()
}

/// Mutable bookkeeping for one quiz in flight.
struct QuizRun {
    quiz_id: String,
    state: QuizState,
    page_count: usize,
    clusters: Vec<ClusterReport>,
    questions_inserted: usize,
    degraded_questions: usize,
    usage: CostLedger,
    workspace: Workspace,
}

impl QuizRun {
    fn new(quiz_id: &str) -> Self {
        Self {
            quiz_id: quiz_id.to_string(),
            state: QuizState::Fetching,
            page_count: 0,
            clusters: Vec::new(),
            questions_inserted: 0,
            degraded_questions: 0,
            usage: CostLedger::default(),
            workspace: Workspace::default(),
        }
    }

    fn enter(&mut self, next: QuizState) {
        debug_assert!(
            !self.state.is_terminal(),
            "quiz {} left terminal state {}",
            self.quiz_id,
            self.state
        );
        if self.state != next {
            debug!("Quiz {}: {} → {}", self.quiz_id, self.state, next);
        }
        self.state = next;
    }
}

/// Scratch directory holding one quiz's rendered pages.
#[derive(Default)]
struct Workspace {
    dir: Option<TempDir>,
    /// Rendered pages by page number; overlapping clusters reuse them.
    pages: BTreeMap<usize, RenderedPage>,
}

impl Workspace {
    async fn create(&mut self, config: &QuizConfig, quiz_id: &str) -> std::io::Result<()> {
        let root = config.work_root();
        tokio::fs::create_dir_all(&root).await?;
        let prefix = format!("quiz-{}-", sanitize(quiz_id));
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new().prefix(&prefix).tempdir_in(&root)
        })
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))??;
        debug!("Work directory: {}", dir.path().display());
        self.dir = Some(dir);
        Ok(())
    }

    fn dir(&self) -> Option<std::path::PathBuf> {
        self.dir.as_ref().map(|d| d.path().to_path_buf())
    }

    fn rendered(&self, page: usize) -> Option<&RenderedPage> {
        self.pages.get(&page)
    }

    fn track(&mut self, page: RenderedPage) {
        self.pages.insert(page.page, page);
    }

    /// Delete every rendered page, then the directory. Returns how many
    /// removals failed; failures are logged, never escalated.
    async fn cleanup(&mut self) -> usize {
        let mut failures = 0;

        for page in std::mem::take(&mut self.pages).into_values() {
            if let Err(source) = tokio::fs::remove_file(&page.path).await {
                let e = CleanupError {
                    path: page.path,
                    source,
                };
                warn!("Cleanup: {}", e);
                failures += 1;
            }
        }

        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            let closed = tokio::task::spawn_blocking(move || dir.close()).await;
            let source = match closed {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(join) => Some(std::io::Error::other(join.to_string())),
            };
            if let Some(source) = source {
                warn!("Cleanup: {}", CleanupError { path, source });
                failures += 1;
            }
        }

        failures
    }
}

/// Keep quiz ids filesystem-safe for directory prefixes.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(40)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(n: usize) -> RawQuestion {
        RawQuestion::new(
            format!("Question {n}"),
            vec![
                format!("right {n}"),
                format!("wrong a {n}"),
                format!("wrong b {n}"),
                format!("wrong c {n}"),
            ],
            0,
        )
    }

    #[test]
    fn normalize_all_balances_slots() {
        let questions: Vec<RawQuestion> = (0..10).map(raw).collect();
        let mut rng = StdRng::seed_from_u64(12);
        let finals = normalize_all(&questions, "quiz", &mut rng);

        assert_eq!(finals.len(), 10);
        let mut counts = [0usize; 4];
        for (f, q) in finals.iter().zip(&questions) {
            assert_eq!(f.correct_answer(), Some(q.answers[0].as_str()));
            counts[f.correct_index.unwrap() as usize] += 1;
        }
        assert!(counts.iter().all(|&c| c == 2 || c == 3), "{counts:?}");
    }

    #[test]
    fn normalize_all_keeps_generation_order() {
        let questions: Vec<RawQuestion> = (0..5).map(raw).collect();
        let finals = normalize_all(&questions, "quiz", &mut StdRng::seed_from_u64(1));
        for (f, q) in finals.iter().zip(&questions) {
            assert_eq!(f.text, q.text);
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "left terminal state")]
    fn terminal_states_are_final() {
        let mut run = QuizRun::new("q");
        run.enter(QuizState::Done);
        run.enter(QuizState::Fetching);
    }

    #[test]
    fn cleanup_then_done_is_allowed() {
        let mut run = QuizRun::new("q");
        run.enter(QuizState::Cleanup);
        run.enter(QuizState::Done);
        assert!(run.state.is_terminal());
    }

    #[test]
    fn sanitize_ids() {
        assert_eq!(sanitize("bio-101"), "bio-101");
        assert_eq!(sanitize("a/b c"), "a_b_c");
    }

    #[tokio::test]
    async fn workspace_cleanup_removes_everything() {
        let root = tempfile::tempdir().unwrap();
        let config = QuizConfig::builder().work_dir(root.path()).build().unwrap();

        let mut ws = Workspace::default();
        ws.create(&config, "q/1").await.unwrap();
        let dir = ws.dir().unwrap();
        let path = dir.join("page-0001.png");
        std::fs::write(&path, b"png").unwrap();
        ws.track(RenderedPage {
            page: 1,
            path: path.clone(),
            format: crate::pipeline::render::ImageFormat::Png,
        });

        assert_eq!(ws.cleanup().await, 0);
        assert!(!path.exists());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn workspace_cleanup_counts_missing_files() {
        let root = tempfile::tempdir().unwrap();
        let config = QuizConfig::builder().work_dir(root.path()).build().unwrap();

        let mut ws = Workspace::default();
        ws.create(&config, "q2").await.unwrap();
        ws.track(RenderedPage {
            page: 3,
            path: ws.dir().unwrap().join("never-written.png"),
            format: crate::pipeline::render::ImageFormat::Png,
        });

        assert_eq!(ws.cleanup().await, 1);
    }
}
