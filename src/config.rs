//! Configuration types for quiz generation.
//!
//! All pipeline behaviour is controlled through [`QuizConfig`], built via its
//! [`QuizConfigBuilder`]. Every knob lives in one struct so a run can be
//! logged and two runs can be diffed to explain why their outputs differ.

use crate::cost::Pricing;
use crate::error::QuizGenError;
use crate::pipeline::render::{ImageFormat, RenderOptions};
use crate::progress::QuizProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Configuration for a quiz-generation batch.
///
/// # Example
/// ```rust
/// use pdf2quiz::QuizConfig;
///
/// let config = QuizConfig::builder()
///     .cluster_size(3)
///     .cluster_count(5)
///     .model("gpt-4.1-nano")
///     .seed(7)
///     .build()
///     .unwrap();
/// assert_eq!(config.cluster_count, 5);
/// ```
#[derive(Clone)]
pub struct QuizConfig {
    /// Consecutive pages per cluster. Default: 3.
    pub cluster_size: usize,

    /// Clusters sampled per document. Default: 5.
    ///
    /// With the default two questions per cluster this yields ten questions
    /// per quiz.
    pub cluster_count: usize,

    /// Questions requested from the model per cluster. Default: 2.
    pub questions_per_cluster: usize,

    /// Rasterisation settings for every page. Default: 150 DPI, at most
    /// 2000 × 2000 px, PNG.
    pub render: RenderOptions,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "gpt-4o".
    /// If None, uses [`DEFAULT_MODEL`] or the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the completion. Default: 0.7.
    ///
    /// Question writing benefits from some variety, unlike transcription.
    pub temperature: f32,

    /// Maximum tokens the model may generate per cluster. Default: 4096.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Custom user instruction. If None, built from `questions_per_cluster`.
    pub user_prompt: Option<String>,

    /// Seed for cluster sampling and answer shuffling. None = OS entropy.
    pub seed: Option<u64>,

    /// Parent directory for per-quiz scratch space holding rendered pages.
    /// None = the system temp directory.
    pub work_dir: Option<PathBuf>,

    /// Timeout for HTTP document downloads in seconds, applied by
    /// [`crate::pipeline::fetch::HttpBlobStore::from_config`]. Default: 120.
    pub download_timeout_secs: u64,

    /// Price table override for the cost estimate. None = derived from the
    /// model name.
    pub pricing: Option<Pricing>,

    /// Optional per-quiz / per-cluster progress events.
    pub progress_callback: Option<Arc<dyn QuizProgressCallback>>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            cluster_size: 3,
            cluster_count: 5,
            questions_per_cluster: 2,
            render: RenderOptions::default(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 4096,
            system_prompt: None,
            user_prompt: None,
            seed: None,
            work_dir: None,
            download_timeout_secs: 120,
            pricing: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for QuizConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizConfig")
            .field("cluster_size", &self.cluster_size)
            .field("cluster_count", &self.cluster_count)
            .field("questions_per_cluster", &self.questions_per_cluster)
            .field("render", &self.render)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("seed", &self.seed)
            .field("work_dir", &self.work_dir)
            .field("pricing", &self.pricing)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn QuizProgressCallback>"),
            )
            .finish()
    }
}

impl QuizConfig {
    /// Create a new builder for `QuizConfig`.
    pub fn builder() -> QuizConfigBuilder {
        QuizConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model name used for pricing and provider construction.
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Pricing used for the end-of-run estimate.
    pub fn effective_pricing(&self) -> Pricing {
        self.pricing
            .unwrap_or_else(|| Pricing::for_model(self.model_name()))
    }

    /// Scratch directory root.
    pub fn work_root(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pdf2quiz"))
    }
}

/// Builder for [`QuizConfig`].
#[derive(Debug)]
pub struct QuizConfigBuilder {
    config: QuizConfig,
}

impl QuizConfigBuilder {
    pub fn cluster_size(mut self, n: usize) -> Self {
        self.config.cluster_size = n;
        self
    }

    pub fn cluster_count(mut self, n: usize) -> Self {
        self.config.cluster_count = n;
        self
    }

    pub fn questions_per_cluster(mut self, n: usize) -> Self {
        self.config.questions_per_cluster = n.max(1);
        self
    }

    pub fn render(mut self, opts: RenderOptions) -> Self {
        self.config.render = opts;
        self
    }

    pub fn density(mut self, dpi: u32) -> Self {
        self.config.render.density = dpi.clamp(72, 400);
        self
    }

    pub fn max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.config.render.width = width.max(100);
        self.config.render.height = height.max(100);
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.render.format = format;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.user_prompt = Some(prompt.into());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn pricing(mut self, pricing: Pricing) -> Self {
        self.config.pricing = Some(pricing);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn QuizProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<QuizConfig, QuizGenError> {
        let c = &self.config;
        if c.cluster_size == 0 {
            return Err(QuizGenError::InvalidConfig(
                "Cluster size must be ≥ 1".into(),
            ));
        }
        if c.cluster_count == 0 {
            return Err(QuizGenError::InvalidConfig(
                "Cluster count must be ≥ 1".into(),
            ));
        }
        if c.render.density < 72 || c.render.density > 400 {
            return Err(QuizGenError::InvalidConfig(format!(
                "Density must be 72–400 DPI, got {}",
                c.render.density
            )));
        }
        if c.max_tokens == 0 {
            return Err(QuizGenError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
