//! LLM code review over FIM-masked samples.
//!
//! ## Architecture
//!
//! ```text
//! ReviewPrompt ─▸ render (FIM begin/end) ─▸ Generator ─▸ strip special tokens ─▸ review
//! ```
//!
//! [`ReviewGenerator`] is the model handle: built once from config by the
//! driver and passed to every call. Calls are sequential; the backend is
//! never shared between concurrent requests.
//!
//! ## Extension
//!
//! Add new backends by implementing [`Generator`] and registering them in
//! [`ReviewGenerator::from_config`].

pub mod generators;
pub mod traits;

pub use generators::{strip_special_tokens, OllamaGenerator, TgiGenerator};
pub use traits::{GenerationError, Generator, ReviewPrompt};

use std::time::Instant;

use crate::config::GeneratorConfig;

/// Model handle used to produce reviews.
pub struct ReviewGenerator {
    backend: Box<dyn Generator>,
    max_new_tokens: u32,
    echo_prompt: bool,
}

impl ReviewGenerator {
    /// Build the backend named by `config.kind`.
    pub fn from_config(config: &GeneratorConfig) -> anyhow::Result<Self> {
        let backend: Box<dyn Generator> = match config.kind.as_str() {
            "tgi" => Box::new(TgiGenerator::new(&config.endpoint, config.model.clone())),
            "ollama" => Box::new(OllamaGenerator::new(&config.endpoint, config.model.clone())),
            other if other.trim().is_empty() => {
                anyhow::bail!("generator.kind cannot be empty. Supported values: tgi, ollama")
            }
            other => anyhow::bail!(
                "Unknown generator kind '{other}'. Supported values: tgi, ollama"
            ),
        };
        Ok(Self::with_backend(
            backend,
            config.max_new_tokens,
            config.echo_prompt,
        ))
    }

    /// Wrap a custom backend (for testing or extension).
    pub fn with_backend(backend: Box<dyn Generator>, max_new_tokens: u32, echo_prompt: bool) -> Self {
        Self {
            backend,
            max_new_tokens,
            echo_prompt,
        }
    }

    pub fn backend_id(&self) -> &str {
        self.backend.id()
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Generate a review for one masked sample.
    pub async fn review(&self, prompt: &ReviewPrompt) -> Result<String, GenerationError> {
        let start = Instant::now();
        let rendered = prompt.render();

        let continuation = self
            .backend
            .generate(&rendered, self.max_new_tokens)
            .await?;

        let decoded = if self.echo_prompt {
            format!("{rendered}{continuation}")
        } else {
            continuation
        };

        tracing::debug!(
            backend = self.backend.id(),
            model = self.backend.model_name(),
            chars = decoded.len(),
            duration_ms = start.elapsed().as_millis().min(u64::MAX as u128) as u64,
            "Review generated"
        );
        Ok(strip_special_tokens(&decoded))
    }
}
