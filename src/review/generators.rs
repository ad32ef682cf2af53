//! Concrete [`Generator`] backends.
//!
//! Both talk plain JSON over HTTP to a locally served model and return the
//! raw continuation; special-token stripping happens in the caller.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use super::traits::{GenerationError, Generator};

/// Full-width (`<｜…｜>`) and ASCII (`<|…|>`) control tokens.
static SPECIAL_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<｜[^｜\n]*｜>|<\|[^|\n]*\|>").unwrap());

/// Drop special control tokens from decoded model output.
pub fn strip_special_tokens(text: &str) -> String {
    SPECIAL_TOKENS.replace_all(text, "").into_owned()
}

fn trim_endpoint(endpoint: &str) -> String {
    endpoint.trim_end_matches('/').to_string()
}

async fn error_for_status(
    backend: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(GenerationError::Api {
        backend: backend.to_string(),
        status,
        body,
    })
}

// ── text-generation-inference ────────────────────────────────────

/// Hugging Face text-generation-inference server (`POST /generate`).
pub struct TgiGenerator {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl TgiGenerator {
    pub fn new(endpoint: &str, model: String) -> Self {
        Self {
            endpoint: trim_endpoint(endpoint),
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TgiResponse {
    generated_text: Option<String>,
}

#[async_trait]
impl Generator for TgiGenerator {
    fn id(&self) -> &str {
        "tgi"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        max_new_tokens: u32,
    ) -> Result<String, GenerationError> {
        let payload = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": max_new_tokens,
                "return_full_text": false,
            }
        });

        let resp = self
            .client
            .post(format!("{}/generate", self.endpoint))
            .json(&payload)
            .send()
            .await?;
        let body: TgiResponse = error_for_status(self.id(), resp).await?.json().await?;

        body.generated_text.ok_or_else(|| GenerationError::MissingField {
            backend: self.id().to_string(),
            field: "generated_text",
        })
    }
}

// ── Ollama ───────────────────────────────────────────────────────

/// Ollama server (`POST /api/generate`) in raw mode, so the FIM prompt
/// reaches the model without a chat template.
pub struct OllamaGenerator {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(endpoint: &str, model: String) -> Self {
        Self {
            endpoint: trim_endpoint(endpoint),
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: Option<String>,
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn id(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        max_new_tokens: u32,
    ) -> Result<String, GenerationError> {
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "raw": true,
            "stream": false,
            "options": { "num_predict": max_new_tokens },
        });

        let resp = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&payload)
            .send()
            .await?;
        let body: OllamaResponse = error_for_status(self.id(), resp).await?.json().await?;

        body.response.ok_or_else(|| GenerationError::MissingField {
            backend: self.id().to_string(),
            field: "response",
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
