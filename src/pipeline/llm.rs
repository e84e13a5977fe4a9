//! Text-generation collaborator: system + user prompt → raw model text.
//!
//! [`TextGenerator`] is the seam the schema mapper calls through. The
//! production implementation, [`ProviderGenerator`], wraps any
//! `edgequake_llm` provider (OpenAI, Anthropic, Gemini, Ollama, …) and sends
//! one chat request with a system and a user message.
//!
//! There is deliberately no retry loop here: the pipeline issues exactly one
//! generation call per run, bounded by `api_timeout_secs`.

use crate::config::ExtractionConfig;
use crate::error::Pdf2JsonError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Raw model output plus token accounting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Generation {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Produces model text for a system instruction and a user message.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<Generation, Pdf2JsonError>;
}

/// [`TextGenerator`] backed by an `edgequake_llm` provider.
pub struct ProviderGenerator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout_secs: u64,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout_secs: config.api_timeout_secs,
        }
    }
}

#[async_trait]
impl TextGenerator for ProviderGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<Generation, Pdf2JsonError> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let start = Instant::now();

        let response = timeout(
            Duration::from_secs(self.timeout_secs),
            self.provider.chat(&messages, Some(&self.options)),
        )
        .await
        .map_err(|_| Pdf2JsonError::ApiTimeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        })?
        .map_err(|e| Pdf2JsonError::LlmApiError {
            message: format!("{}", e),
        })?;

        debug!(
            "LLM: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(Generation {
            content: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ExtractionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn generation_text_has_no_token_counts() {
        let g = Generation::text("{}");
        assert_eq!(g.content, "{}");
        assert_eq!(g.input_tokens + g.output_tokens, 0);
    }
}
