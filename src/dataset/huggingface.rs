//! Hugging Face datasets-server source.
//!
//! Pages through `GET {endpoint}/rows?dataset=&config=&split=&offset=&length=`
//! until enough matching records are collected or the split is exhausted.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{collect_matching, DatasetRecord, SampleSource};
use crate::config::DatasetConfig;

/// Server-side cap on `length` for the rows endpoint.
const MAX_PAGE_SIZE: usize = 100;

pub struct HuggingFaceSource {
    endpoint: String,
    dataset: String,
    subset: String,
    split: String,
    page_size: usize,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RowsPage {
    #[serde(default)]
    rows: Vec<RowEntry>,
    num_rows_total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: DatasetRecord,
}

impl HuggingFaceSource {
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            dataset: config.name.clone(),
            subset: config.subset.clone(),
            split: config.split.clone(),
            page_size: config.page_size.clamp(1, MAX_PAGE_SIZE),
            token: config.token.clone(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_page(&self, offset: usize) -> anyhow::Result<RowsPage> {
        let offset_param = offset.to_string();
        let length_param = self.page_size.to_string();
        let mut req = self
            .client
            .get(format!("{}/rows", self.endpoint))
            .query(&[
                ("dataset", self.dataset.as_str()),
                ("config", self.subset.as_str()),
                ("split", self.split.as_str()),
                ("offset", offset_param.as_str()),
                ("length", length_param.as_str()),
            ]);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("Failed querying datasets-server rows for {}", self.dataset))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("datasets-server error {} at offset {}: {}", status, offset, body);
        }

        resp.json()
            .await
            .with_context(|| format!("Failed parsing datasets-server rows at offset {offset}"))
    }
}

#[async_trait]
impl SampleSource for HuggingFaceSource {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn load(&self, language: &str, limit: usize) -> anyhow::Result<Vec<DatasetRecord>> {
        tracing::info!(
            dataset = %self.dataset,
            split = %self.split,
            language,
            limit,
            "Loading samples from datasets-server"
        );

        let mut records = Vec::new();
        let mut offset = 0usize;
        loop {
            let page = self.fetch_page(offset).await?;
            let fetched = page.rows.len();
            offset += fetched;

            let full = collect_matching(
                &mut records,
                page.rows.into_iter().map(|entry| entry.row),
                language,
                limit,
            );
            tracing::debug!(offset, fetched, matched = records.len(), "Fetched rows page");

            let exhausted = fetched == 0 || page.num_rows_total.is_some_and(|total| offset >= total);
            if full || exhausted {
                break;
            }
        }

        tracing::info!(records = records.len(), "Loaded samples");
        Ok(records)
    }
}
