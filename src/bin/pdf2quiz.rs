//! CLI binary for pdf2quiz.
//!
//! A thin shim over the library crate that maps CLI flags to `QuizConfig`,
//! wires a blob store and a JSON store, and prints the batch summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2quiz::{
    BlobStore, HttpBlobStore, ImageFormat, JsonFileStore, LocalBlobStore, ProgressCallback,
    QuizConfig, QuizPipeline, QuizProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar over the quizzes of the batch, one log line per quiz.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading quizzes…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl QuizProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_quizzes: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} quizzes  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_quizzes as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Generating");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating questions for {total_quizzes} quizzes…"))
        ));
    }

    fn on_quiz_start(&self, quiz_id: &str, _index: usize, _total: usize) {
        self.bar.set_message(quiz_id.to_string());
    }

    fn on_cluster_complete(&self, quiz_id: &str, cluster: usize, total: usize, _questions: usize) {
        self.bar.set_message(format!("{quiz_id} cluster {cluster}/{total}"));
    }

    fn on_quiz_complete(&self, quiz_id: &str, questions: usize) {
        self.bar.println(format!(
            "  {} {:<24}  {}",
            green("✓"),
            quiz_id,
            dim(&format!("{questions:>3} questions")),
        ));
        self.bar.inc(1);
    }

    fn on_quiz_failed(&self, quiz_id: &str, reason: &str) {
        let msg: String = if reason.chars().count() > 80 {
            format!("{}\u{2026}", reason.chars().take(79).collect::<String>())
        } else {
            reason.to_string()
        };
        self.bar
            .println(format!("  {} {:<24}  {}", red("✗"), quiz_id, red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize) {
        self.bar.finish_and_clear();
        let total = succeeded + failed;
        if failed == 0 {
            eprintln!("{} {} quizzes generated", green("✔"), bold(&succeeded.to_string()));
        } else {
            eprintln!(
                "{} {}/{} quizzes generated  ({} failed)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Documents on disk, questions appended to questions.jsonl
  pdf2quiz quizzes.json --blob-dir ./documents -o questions.jsonl

  # Documents behind an HTTP object store
  pdf2quiz quizzes.json --blob-url https://storage.example.com/quiz-pdfs/

  # Bigger clusters, more questions, reproducible sampling
  pdf2quiz quizzes.json --blob-dir docs --cluster-size 4 --clusters 6 --questions 3 --seed 42

  # Use a specific model
  pdf2quiz --model gpt-4.1-mini --provider openai quizzes.json --blob-dir docs

  # Machine-readable batch report
  pdf2quiz --json quizzes.json --blob-dir docs > report.json

MANIFEST FORMAT:
  [
    { "id": "bio-101", "document_ref": "courses/bio/chapter1.pdf" },
    { "id": "chem-7",  "document_ref": "courses/chem/acids.pdf" }
  ]

OUTPUT FORMAT (one JSON object per line):
  {"quiz_id":"bio-101","text":"...","answers":["..","..","..",".."],"correct_index":2,"degraded":false}

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_DYNAMIC_LIB_PATH Directory containing libpdfium
"#;

/// Generate multiple-choice quizzes from PDF documents using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2quiz",
    version,
    about = "Generate multiple-choice quizzes from PDF documents using Vision LLMs",
    long_about = "For every quiz in a manifest, sample clusters of consecutive pages from its \
PDF, ask a Vision Language Model for questions about each cluster, spread the correct answers \
evenly across the four answer slots and append the questions to a JSON-Lines file.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JSON manifest listing quizzes and their document keys.
    manifest: PathBuf,

    /// Append generated questions to this JSON-Lines file.
    #[arg(short, long, env = "PDF2QUIZ_OUTPUT", default_value = "questions.jsonl")]
    output: PathBuf,

    /// Resolve document keys against this directory.
    #[arg(long, env = "PDF2QUIZ_BLOB_DIR", conflicts_with = "blob_url")]
    blob_dir: Option<PathBuf>,

    /// Resolve document keys against this HTTP base URL.
    #[arg(long, env = "PDF2QUIZ_BLOB_URL")]
    blob_url: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Consecutive pages per cluster.
    #[arg(long, env = "PDF2QUIZ_CLUSTER_SIZE", default_value_t = 3)]
    cluster_size: usize,

    /// Clusters sampled per document.
    #[arg(long = "clusters", env = "PDF2QUIZ_CLUSTER_COUNT", default_value_t = 5)]
    cluster_count: usize,

    /// Questions requested per cluster.
    #[arg(long = "questions", env = "PDF2QUIZ_QUESTIONS_PER_CLUSTER", default_value_t = 2)]
    questions_per_cluster: usize,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PDF2QUIZ_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Encode rendered pages as JPEG instead of PNG.
    #[arg(long, env = "PDF2QUIZ_JPEG")]
    jpeg: bool,

    /// Seed for page sampling and answer shuffling.
    #[arg(long, env = "PDF2QUIZ_SEED")]
    seed: Option<u64>,

    /// Parent directory for per-quiz scratch directories.
    #[arg(long, env = "PDF2QUIZ_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2QUIZ_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per cluster.
    #[arg(long, env = "PDF2QUIZ_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2QUIZ_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2QUIZ_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "PDF2QUIZ_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2QUIZ_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2QUIZ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2QUIZ_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn QuizProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let blobs = build_blob_store(&cli, &config)?;
    let store = Arc::new(JsonFileStore::new(&cli.manifest, &cli.output));
    let pipeline = QuizPipeline::from_config(config, blobs, store)
        .context("Failed to set up the pipeline")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = pipeline.run().await.context("Batch failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        if !show_progress {
            eprintln!(
                "Generated {}/{} quizzes in {}ms",
                report.succeeded(),
                report.quizzes.len(),
                report.total_duration_ms
            );
            for q in &report.quizzes {
                if let Some(reason) = q.failure() {
                    eprintln!("  {}: {}", q.quiz_id, reason);
                }
            }
        }
        eprintln!(
            "   {} questions  →  {}",
            report.questions_inserted(),
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {} calls to {}  {} tokens in  /  {} tokens out  ~${:.4}",
            dim(&report.usage.calls.to_string()),
            pipeline.config().model_name(),
            dim(&report.usage.prompt_tokens.to_string()),
            dim(&report.usage.completion_tokens.to_string()),
            report.estimated_cost_usd,
        );
    }

    Ok(())
}

/// Map CLI args to `QuizConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<QuizConfig> {
    let mut builder = QuizConfig::builder()
        .cluster_size(cli.cluster_size)
        .cluster_count(cli.cluster_count)
        .questions_per_cluster(cli.questions_per_cluster)
        .density(cli.dpi)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout);

    if cli.jpeg {
        builder = builder.image_format(ImageFormat::Jpeg);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(seed) = cli.seed {
        builder = builder.seed(seed);
    }
    if let Some(ref dir) = cli.work_dir {
        builder = builder.work_dir(dir.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn build_blob_store(cli: &Cli, config: &QuizConfig) -> Result<Arc<dyn BlobStore>> {
    match (&cli.blob_dir, &cli.blob_url) {
        (_, Some(url)) => Ok(Arc::new(
            HttpBlobStore::from_config(url.clone(), config)
                .context("Failed to build HTTP client")?,
        )),
        (Some(dir), None) => Ok(Arc::new(LocalBlobStore::new(dir.clone()))),
        // Keys resolve relative to the manifest's directory by default.
        (None, None) => {
            let root = cli
                .manifest
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            Ok(Arc::new(LocalBlobStore::new(root)))
        }
    }
}
