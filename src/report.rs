//! Markdown report over all reviewed samples.

use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

use crate::scanner::ScanOutcome;

/// Everything recorded for one sample.
#[derive(Debug, Clone, Serialize)]
pub struct SampleResult {
    /// Normalized code as scanned.
    pub code: String,
    pub label: String,
    pub review: String,
    pub bandit: ScanOutcome,
    pub context: BTreeMap<String, String>,
}

/// Render results in order, one section per sample.
pub fn render_report(results: &[SampleResult]) -> String {
    let mut md = String::new();

    for (i, res) in results.iter().enumerate() {
        let _ = writeln!(md, "# Review {}\n", i + 1);
        let _ = writeln!(md, "```python\n{}\n```\n", res.code);

        md.push_str("## Bandit Report\n");
        let bandit = match &res.bandit {
            ScanOutcome::Findings(findings) => findings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n\n"),
            ScanOutcome::Failed(err) => err.to_string(),
        };
        let _ = writeln!(md, "{bandit}\n");

        md.push_str("## LLM Code Review\n");
        let _ = writeln!(md, "{}\n", res.review);

        md.push_str("## Context\n");
        for (key, value) in &res.context {
            let _ = writeln!(md, "- **{key}**: {value}");
        }
        md.push_str("\n---\n\n");
    }

    md
}

/// Render and write the report as UTF-8, creating parent directories.
pub fn write_report(results: &[SampleResult], path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }
    std::fs::write(path, render_report(results))
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    tracing::info!(path = %path.display(), samples = results.len(), "Report written");
    Ok(())
}
