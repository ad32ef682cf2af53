//! Labeled vulnerable-code samples.
//!
//! A [`SampleSource`] yields [`DatasetRecord`]s filtered to one language
//! and capped at a limit, in the source's iteration order. Records are
//! returned raw; normalization happens per sample in the pipeline.

pub mod huggingface;
pub mod jsonl;

pub use huggingface::HuggingFaceSource;
pub use jsonl::JsonlSource;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::DatasetConfig;

/// One dataset row. Missing or `null` optional fields read as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetRecord {
    #[serde(default)]
    pub lang: String,
    /// The vulnerable code sample.
    #[serde(default)]
    pub rejected: String,
    #[serde(default)]
    pub vulnerability: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

impl DatasetRecord {
    /// Vulnerability label, empty when absent.
    pub fn label(&self) -> &str {
        self.vulnerability.as_deref().unwrap_or_default()
    }

    /// Report context for this sample.
    pub fn context(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "vulnerability_description".to_string(),
                self.label().to_string(),
            ),
            (
                "prompt_question".to_string(),
                self.question.clone().unwrap_or_default(),
            ),
        ])
    }
}

/// Shared filter: keep records in `language`, stop once `limit` (if
/// non-zero) is reached. Returns `true` when the limit has been hit.
pub(crate) fn collect_matching(
    out: &mut Vec<DatasetRecord>,
    batch: impl IntoIterator<Item = DatasetRecord>,
    language: &str,
    limit: usize,
) -> bool {
    for record in batch {
        if limit > 0 && out.len() >= limit {
            return true;
        }
        if record.lang == language {
            out.push(record);
        }
    }
    limit > 0 && out.len() >= limit
}

/// A source of dataset records.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Load up to `limit` records (0 = all) whose `lang` equals `language`.
    async fn load(&self, language: &str, limit: usize) -> anyhow::Result<Vec<DatasetRecord>>;
}

/// Factory: create the right source from config.
pub fn create_source(config: &DatasetConfig) -> anyhow::Result<Box<dyn SampleSource>> {
    match config.kind.as_str() {
        "huggingface" => Ok(Box::new(HuggingFaceSource::from_config(config))),
        "jsonl" => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("dataset.kind='jsonl' requires dataset.path"))?;
            Ok(Box::new(JsonlSource::new(crate::config::expand_path(path)?)))
        }
        other if other.trim().is_empty() => {
            anyhow::bail!("dataset.kind cannot be empty. Supported values: huggingface, jsonl")
        }
        other => anyhow::bail!(
            "Unknown dataset kind '{other}'. Supported values: huggingface, jsonl"
        ),
    }
}
