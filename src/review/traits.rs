//! Trait definitions for review generation.
//!
//! Concrete backends (text-generation-inference, Ollama) implement
//! [`Generator`]; the [`ReviewGenerator`](super::ReviewGenerator) handle
//! owns one and turns a [`ReviewPrompt`] into review text.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::masking::{FIM_BEGIN, FIM_END};
use crate::scanner::ScanOutcome;

// ── Prompt ───────────────────────────────────────────────────────

/// Everything known about one sample at review time.
///
/// Only `code` is interpolated into the model prompt; the findings and
/// context ride along for the caller and the report.
#[derive(Debug, Clone)]
pub struct ReviewPrompt {
    /// Hole-inserted source.
    pub code: String,
    pub bandit: ScanOutcome,
    pub context: BTreeMap<String, String>,
}

impl ReviewPrompt {
    /// Render the FIM prompt sent to the model.
    pub fn render(&self) -> String {
        format!("{FIM_BEGIN}\n{}\n{FIM_END}", self.code)
    }
}

// ── Errors ───────────────────────────────────────────────────────

/// Failure talking to the generation service.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{backend} API error {status}: {body}")]
    Api {
        backend: String,
        status: u16,
        body: String,
    },
    #[error("{backend} response missing `{field}`")]
    MissingField {
        backend: String,
        field: &'static str,
    },
}

// ── Generator trait ──────────────────────────────────────────────

/// A text-generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend identifier (e.g. "tgi", "ollama").
    fn id(&self) -> &str;

    /// The model served by this backend.
    fn model_name(&self) -> &str;

    /// Generate a continuation of `prompt` of at most `max_new_tokens`
    /// tokens. Returns only the continuation.
    async fn generate(&self, prompt: &str, max_new_tokens: u32)
        -> Result<String, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_wraps_code_in_fim_delimiters() {
        let prompt = ReviewPrompt {
            code: "import os\n<｜fim▁hole｜>".into(),
            bandit: ScanOutcome::Findings(vec![]),
            context: BTreeMap::from([("label".to_string(), "command injection".to_string())]),
        };
        assert_eq!(
            prompt.render(),
            "<｜fim▁begin｜>\nimport os\n<｜fim▁hole｜>\n<｜fim▁end｜>"
        );
        assert!(!prompt.render().contains("command injection"));
    }

    #[test]
    fn api_error_message() {
        let err = GenerationError::Api {
            backend: "tgi".into(),
            status: 503,
            body: "model loading".into(),
        };
        assert_eq!(err.to_string(), "tgi API error 503: model loading");
    }
}
