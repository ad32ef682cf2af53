//! Bandit integration: run the scanner on a file and reduce its JSON
//! report to [`Finding`]s.
//!
//! The scanner is an external process. Its exit status is not inspected
//! (Bandit exits non-zero whenever it finds something); only stdout
//! matters. Output that does not parse as a Bandit report becomes a
//! [`ScanOutcome::Failed`] record so the sample can still be reviewed.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::config::ScannerConfig;

// ── Findings ─────────────────────────────────────────────────────

/// A single scanner result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Line the issue is reported on (1-based).
    pub line_number: usize,
    /// Every line the offending statement spans, when the scanner reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<Vec<usize>>,
    /// Human-readable issue text.
    pub description: String,
    /// Scanner rule id (e.g. `B307`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

impl Finding {
    pub fn new(line_number: usize, description: impl Into<String>) -> Self {
        Self {
            line_number,
            line_range: None,
            description: description.into(),
            test_id: None,
            severity: None,
            confidence: None,
        }
    }

    pub fn with_range(mut self, range: Vec<usize>) -> Self {
        self.line_range = Some(range);
        self
    }

    /// Lines this finding flags: the full range if known, else its line.
    pub fn lines(&self) -> &[usize] {
        self.line_range
            .as_deref()
            .unwrap_or(std::slice::from_ref(&self.line_number))
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lines() {
            [first, .., last] if first != last => {
                write!(f, "Lines {}-{}: {}", first, last, self.description)?
            }
            _ => write!(f, "Line {}: {}", self.line_number, self.description)?,
        }
        if let Some(ref id) = self.test_id {
            write!(f, " ({}", id)?;
            if let Some(ref sev) = self.severity {
                write!(f, ", severity {}", sev)?;
            }
            if let Some(ref conf) = self.confidence {
                write!(f, ", confidence {}", conf)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Scanner stdout that is not a readable report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{error}")]
pub struct ScannerOutputError {
    pub error: String,
}

/// What the scanner produced for one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScanOutcome {
    /// Findings in emission order; duplicates preserved.
    Findings(Vec<Finding>),
    /// The report could not be parsed.
    Failed(ScannerOutputError),
}

impl ScanOutcome {
    /// Findings to mask; a failed scan masks nothing.
    pub fn findings(&self) -> &[Finding] {
        match self {
            Self::Findings(f) => f,
            Self::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

// ── Report parsing ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BanditReport {
    #[serde(default)]
    results: Vec<BanditIssue>,
}

#[derive(Debug, Deserialize)]
struct BanditIssue {
    line_number: usize,
    issue_text: String,
    #[serde(default)]
    line_range: Option<Vec<usize>>,
    #[serde(default)]
    test_id: Option<String>,
    #[serde(default)]
    issue_severity: Option<String>,
    #[serde(default)]
    issue_confidence: Option<String>,
}

impl BanditIssue {
    fn into_finding(self) -> Finding {
        Finding {
            line_number: self.line_number,
            line_range: self.line_range,
            description: self.issue_text,
            test_id: self.test_id,
            severity: self.issue_severity,
            confidence: self.issue_confidence,
        }
    }
}

/// Parse Bandit's `-f json` output.
pub fn parse_report(stdout: &str) -> ScanOutcome {
    match serde_json::from_str::<BanditReport>(stdout) {
        Ok(report) => ScanOutcome::Findings(
            report
                .results
                .into_iter()
                .map(BanditIssue::into_finding)
                .collect(),
        ),
        Err(e) => ScanOutcome::Failed(ScannerOutputError {
            error: format!("Failed to parse Bandit output: {e}"),
        }),
    }
}

// ── Scanner process ──────────────────────────────────────────────

/// Runs the configured scanner command against files.
#[derive(Debug, Clone)]
pub struct BanditScanner {
    program: String,
    args: Vec<String>,
    scratch_dir: Option<PathBuf>,
}

impl BanditScanner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            scratch_dir: None,
        }
    }

    pub fn from_config(config: &ScannerConfig) -> anyhow::Result<Self> {
        let scanner = Self::new(config.program.clone(), config.args.clone());
        Ok(match config.scratch_dir {
            Some(ref dir) => scanner.with_scratch_dir(crate::config::expand_path(dir)?),
            None => scanner,
        })
    }

    /// Create scratch files in `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Scan a file. The path is appended after the configured arguments.
    pub async fn scan_file(&self, path: &Path) -> anyhow::Result<ScanOutcome> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .await
            .with_context(|| format!("Failed to run scanner `{}`", self.program))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let outcome = parse_report(&stdout);
        match outcome {
            ScanOutcome::Findings(ref findings) => tracing::debug!(
                scanner = %self.program,
                findings = findings.len(),
                "Scan completed"
            ),
            ScanOutcome::Failed(ref e) => tracing::warn!(
                scanner = %self.program,
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                error = %e,
                "Scanner output was not a readable report"
            ),
        }
        Ok(outcome)
    }

    /// Write `code` to a scratch `.py` file, scan it, and remove the file.
    ///
    /// The file is removed on every exit path: explicitly after the scan,
    /// and by the temp-file guard if anything before that fails.
    pub async fn scan_source(&self, code: &str) -> anyhow::Result<ScanOutcome> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("vulnreview-").suffix(".py");
        let mut file = match self.scratch_dir {
            Some(ref dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .context("Failed to create scratch file for scanner")?;
        file.write_all(code.as_bytes())
            .and_then(|()| file.flush())
            .context("Failed to write scratch file for scanner")?;

        let outcome = self.scan_file(file.path()).await;

        if let Err(e) = file.close() {
            tracing::warn!(error = %e, "Failed to remove scanner scratch file");
        }
        outcome
    }
}

// ── Tests ────────────────────────────────────────────────────────
