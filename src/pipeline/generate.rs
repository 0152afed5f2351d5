//! VLM interaction: send one cluster's page images and get questions back.
//!
//! [`Completion`] is the seam to the language model. [`LlmCompletion`] is the
//! production implementation over any `edgequake_llm` provider. Prompt text
//! lives in [`crate::prompts`]; this module only builds the message list,
//! makes the call and reports token usage.
//!
//! Each cluster gets exactly one attempt. A failed call is reported to the
//! pipeline, which drops that cluster's contribution and moves on.

use crate::config::{QuizConfig, DEFAULT_MODEL};
use crate::cost::Usage;
use crate::error::{GenerationError, QuizGenError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Text and token usage of one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutput {
    pub text: String,
    pub usage: Usage,
}

/// A vision-capable completion backend.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn generate(
        &self,
        images: Vec<ImageData>,
        system: &str,
        user: &str,
    ) -> Result<CompletionOutput, GenerationError>;
}

/// [`Completion`] over an `edgequake_llm` provider.
pub struct LlmCompletion {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmCompletion {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &QuizConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    /// Resolve the provider from `config` and the environment.
    pub fn from_config(config: &QuizConfig) -> Result<Self, QuizGenError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }
}

#[async_trait]
impl Completion for LlmCompletion {
    /// Message layout: system prompt, then one user turn carrying the
    /// instruction text and every page image of the cluster.
    async fn generate(
        &self,
        images: Vec<ImageData>,
        system: &str,
        user: &str,
    ) -> Result<CompletionOutput, GenerationError> {
        let start = Instant::now();
        let image_count = images.len();
        let messages = vec![
            ChatMessage::system(system),
            ChatMessage::user_with_images(user, images),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| GenerationError::Completion {
                detail: e.to_string(),
            })?;

        debug!(
            "{} images: {} input tokens, {} output tokens, {:?}",
            image_count,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(CompletionOutput {
            text: response.content,
            usage: Usage {
                prompt_tokens: response.prompt_tokens as u64,
                completion_tokens: response.completion_tokens as u64,
            },
        })
    }
}

/// Build `CompletionOptions` from the quiz config.
fn build_options(config: &QuizConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, QuizGenError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        QuizGenError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`: a pre-built provider, used as-is.
/// 2. `config.provider_name` (+ `config.model`).
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 4. OpenAI when `OPENAI_API_KEY` is set.
/// 5. `ProviderFactory::from_env` auto-detection.
pub fn resolve_provider(config: &QuizConfig) -> Result<Arc<dyn LLMProvider>, QuizGenError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, config.model_name());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", config.model.as_deref().unwrap_or(DEFAULT_MODEL));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| QuizGenError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
