//! Per-sample review pipeline.
//!
//! Runs every sample through the stages in order, one at a time:
//!
//! 1. **Normalize**: strip fences, non-ASCII and comments
//! 2. **Scan**: Bandit on a scratch file (removed afterwards)
//! 3. **Mask**: collapse flagged line runs into FIM holes
//! 4. **Review**: ask the model to fill in the masked code
//!
//! A scanner report that cannot be parsed is recorded and the sample goes
//! on to review. Any other failure aborts the whole run unless the
//! pipeline is built with `isolate_failures`, in which case the sample is
//! recorded as failed and the next one starts.

use anyhow::Context;

use crate::dataset::DatasetRecord;
use crate::masking::mask_findings;
use crate::normalize::normalize;
use crate::report::SampleResult;
use crate::review::{ReviewGenerator, ReviewPrompt};
use crate::scanner::{BanditScanner, ScanOutcome};

/// Sequential review pipeline over dataset records.
pub struct ReviewPipeline {
    scanner: BanditScanner,
    generator: ReviewGenerator,
    isolate_failures: bool,
}

impl ReviewPipeline {
    pub fn new(scanner: BanditScanner, generator: ReviewGenerator, isolate_failures: bool) -> Self {
        Self {
            scanner,
            generator,
            isolate_failures,
        }
    }

    /// Run one record through every stage.
    pub async fn process(&self, record: &DatasetRecord) -> anyhow::Result<SampleResult> {
        self.process_staged(record).await.map_err(|f| f.error)
    }

    async fn process_staged(&self, record: &DatasetRecord) -> Result<SampleResult, SampleFailure> {
        let code = normalize(&record.rejected)
            .context("Failed to normalize sample")
            .map_err(SampleFailure::before_scan)?;

        let bandit = self
            .scanner
            .scan_source(&code)
            .await
            .map_err(SampleFailure::before_scan)?;
        let masked = mask_findings(&code, bandit.findings());

        let prompt = ReviewPrompt {
            code: masked,
            bandit,
            context: record.context(),
        };
        let review = match self.generator.review(&prompt).await {
            Ok(review) => review,
            Err(e) => {
                return Err(SampleFailure {
                    error: anyhow::Error::new(e).context("Failed to generate review"),
                    bandit: Some(prompt.bandit),
                })
            }
        };

        Ok(SampleResult {
            code,
            label: record.label().to_string(),
            review,
            bandit: prompt.bandit,
            context: prompt.context,
        })
    }

    /// Process all records in order.
    pub async fn run(&self, records: &[DatasetRecord]) -> anyhow::Result<Vec<SampleResult>> {
        let mut results = Vec::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            tracing::info!(
                sample = i,
                label = record.label(),
                scanner = self.scanner.program(),
                model = self.generator.model_name(),
                "Analyzing sample"
            );

            match self.process_staged(record).await {
                Ok(result) => {
                    tracing::info!(
                        sample = i,
                        findings = result.bandit.findings().len(),
                        scan_failed = result.bandit.is_failed(),
                        "Sample reviewed"
                    );
                    results.push(result);
                }
                Err(failure) if self.isolate_failures => {
                    let error = format!("{:#}", failure.error);
                    tracing::warn!(
                        sample = i,
                        error = %error,
                        "Sample failed, continuing with next sample"
                    );
                    results.push(failed_result(record, failure));
                }
                Err(failure) => return Err(failure.error.context(format!("Sample {i} failed"))),
            }
        }

        Ok(results)
    }
}

/// A per-sample error plus the scan outcome, if the scan had completed.
struct SampleFailure {
    error: anyhow::Error,
    bandit: Option<ScanOutcome>,
}

impl SampleFailure {
    fn before_scan(error: anyhow::Error) -> Self {
        Self {
            error,
            bandit: None,
        }
    }
}

/// Placeholder result for a sample that could not be processed.
fn failed_result(record: &DatasetRecord, failure: SampleFailure) -> SampleResult {
    SampleResult {
        code: record.rejected.clone(),
        label: record.label().to_string(),
        review: format!("Review failed: {:#}", failure.error),
        bandit: failure
            .bandit
            .unwrap_or_else(|| ScanOutcome::Findings(vec![])),
        context: record.context(),
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::FIM_HOLE;
    use crate::scanner::Finding;
    use crate::review::{GenerationError, Generator};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records every prompt and answers with a fixed string.
    struct Recorder {
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Generator for Recorder {
        fn id(&self) -> &str {
            "recorder"
        }

        fn model_name(&self) -> &str {
            "recorder-model"
        }

        async fn generate(&self, prompt: &str, _max: u32) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("REVIEW".into())
        }
    }

    fn generator() -> (ReviewGenerator, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let gen = ReviewGenerator::with_backend(
            Box::new(Recorder {
                prompts: Arc::clone(&prompts),
            }),
            512,
            false,
        );
        (gen, prompts)
    }

    /// Always fails, as a generation server that is down would.
    struct Unavailable;

    #[async_trait]
    impl Generator for Unavailable {
        fn id(&self) -> &str {
            "unavailable"
        }

        fn model_name(&self) -> &str {
            "none"
        }

        async fn generate(&self, _prompt: &str, _max: u32) -> Result<String, GenerationError> {
            Err(GenerationError::Api {
                backend: "unavailable".into(),
                status: 503,
                body: "model loading".into(),
            })
        }
    }

    fn record(code: &str) -> DatasetRecord {
        DatasetRecord {
            lang: "python".into(),
            rejected: code.into(),
            vulnerability: Some("Use of eval".into()),
            question: Some("Write a calculator".into()),
        }
    }

    /// `sh -c <script> <scratch-path>` stands in for Bandit.
    fn fake_scanner(stdout: &str) -> BanditScanner {
        BanditScanner::new(
            "sh",
            vec!["-c".into(), format!("printf '%s' '{stdout}'")],
        )
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn masks_flagged_lines_before_review() {
        let code = (1..=10)
            .map(|i| format!("v{i} = {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let scanner = fake_scanner(
            r#"{"results": [{"line_number": 3, "issue_text": "a"}, {"line_number": 5, "line_range": [5, 6], "issue_text": "b"}]}"#,
        );
        let (gen, prompts) = generator();
        let pipeline = ReviewPipeline::new(scanner, gen, false);

        let result = pipeline.process(&record(&code)).await.unwrap();
        assert_eq!(result.review, "REVIEW");
        assert_eq!(result.code, code);
        assert_eq!(result.bandit.findings().len(), 2);
        assert_eq!(result.context["prompt_question"], "Write a calculator");

        let prompt = prompts.lock().unwrap()[0].clone();
        let body: Vec<&str> = prompt.lines().skip(1).take(8).collect();
        assert_eq!(
            body,
            vec!["v1 = 1", "v2 = 2", FIM_HOLE, "v4 = 4", FIM_HOLE, "v7 = 7", "v8 = 8", "v9 = 9"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn malformed_scanner_output_still_reviews() {
        let (gen, prompts) = generator();
        let pipeline = ReviewPipeline::new(fake_scanner("not json"), gen, false);

        let result = pipeline.process(&record("eval(input())")).await.unwrap();
        assert!(result.bandit.is_failed());
        assert_eq!(result.review, "REVIEW");
        assert_eq!(prompts.lock().unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn lex_error_aborts_run_by_default() {
        let (gen, prompts) = generator();
        let pipeline = ReviewPipeline::new(fake_scanner("{}"), gen, false);

        let records = vec![record("x = (1,"), record("y = 2")];
        let err = pipeline.run(&records).await.unwrap_err();
        assert!(format!("{err:#}").contains("Sample 0 failed"));
        assert!(prompts.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn isolated_failures_are_recorded_and_run_continues() {
        let (gen, _) = generator();
        let pipeline = ReviewPipeline::new(fake_scanner("{}"), gen, true);

        let records = vec![record("x = (1,"), record("y = 2")];
        let results = pipeline.run(&records).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].review.starts_with("Review failed"));
        assert_eq!(results[1].review, "REVIEW");
        assert_eq!(results[1].code, "y = 2");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn isolated_generation_failure_keeps_scan_findings() {
        let scanner = fake_scanner(r#"{"results": [{"line_number": 1, "issue_text": "eval"}]}"#);
        let gen = ReviewGenerator::with_backend(Box::new(Unavailable), 512, false);
        let pipeline = ReviewPipeline::new(scanner, gen, true);

        let results = pipeline.run(&[record("eval(input())")]).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].review.starts_with("Review failed: Failed to generate review"));
        assert!(results[0].review.contains("503"));
        assert_eq!(results[0].bandit.findings(), &[Finding::new(1, "eval")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn isolated_lex_failure_has_no_findings() {
        let scanner = fake_scanner(r#"{"results": [{"line_number": 1, "issue_text": "eval"}]}"#);
        let (gen, _) = generator();
        let pipeline = ReviewPipeline::new(scanner, gen, true);

        let results = pipeline.run(&[record("x = (1,")]).await.unwrap();
        assert_eq!(results[0].bandit, ScanOutcome::Findings(vec![]));
    }
}
