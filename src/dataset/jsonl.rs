//! Local JSON-lines dataset: one [`DatasetRecord`] object per line.

use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;

use super::{collect_matching, DatasetRecord, SampleSource};

pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SampleSource for JsonlSource {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn load(&self, language: &str, limit: usize) -> anyhow::Result<Vec<DatasetRecord>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read dataset {}", self.path.display()))?;

        let mut records = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: DatasetRecord = serde_json::from_str(line).with_context(|| {
                format!("Invalid record at {}:{}", self.path.display(), idx + 1)
            })?;
            if collect_matching(&mut records, [record], language, limit) {
                break;
            }
        }

        tracing::info!(
            source = self.name(),
            path = %self.path.display(),
            records = records.len(),
            "Loaded samples"
        );
        Ok(records)
    }
}
