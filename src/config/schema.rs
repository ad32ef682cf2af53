use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration, read from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub scanner: ScannerConfig,
    pub generator: GeneratorConfig,
    pub report: ReportConfig,
    pub pipeline: PipelineSettings,

    /// Where this config was loaded from (not serialized).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

// ── Dataset ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// `huggingface` or `jsonl`.
    pub kind: String,
    /// Hugging Face dataset id.
    pub name: String,
    /// Dataset config (subset) name.
    #[serde(rename = "config")]
    pub subset: String,
    pub split: String,
    /// datasets-server base URL.
    pub endpoint: String,
    /// Bearer token for gated datasets; falls back to `HF_TOKEN`.
    pub token: Option<String>,
    /// Local JSON-lines file for `kind = "jsonl"`.
    pub path: Option<PathBuf>,
    /// Only records whose `lang` equals this are used.
    pub language: String,
    /// Maximum number of samples; 0 means no limit.
    pub limit: usize,
    /// Rows requested per datasets-server page (server caps at 100).
    pub page_size: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            kind: "huggingface".into(),
            name: "CyberNative/Code_Vulnerability_Security_DPO".into(),
            subset: "default".into(),
            split: "train".into(),
            endpoint: "https://datasets-server.huggingface.co".into(),
            token: None,
            path: None,
            language: "python".into(),
            limit: 20,
            page_size: 100,
        }
    }
}

// ── Scanner ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub program: String,
    /// Arguments placed before the file path.
    pub args: Vec<String>,
    /// Directory for per-sample scratch files; system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            program: "bandit".into(),
            args: vec!["-f".into(), "json".into()],
            scratch_dir: None,
        }
    }
}

// ── Generator ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// `tgi` (text-generation-inference) or `ollama`.
    pub kind: String,
    pub endpoint: String,
    pub model: String,
    pub max_new_tokens: u32,
    /// Prepend the prompt to the generated text, as decoding the full
    /// output sequence of a causal model does.
    pub echo_prompt: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: "tgi".into(),
            endpoint: "http://127.0.0.1:8080".into(),
            model: "deepseek-ai/deepseek-coder-1.3b-base".into(),
            max_new_tokens: 512,
            echo_prompt: true,
        }
    }
}

// ── Report / pipeline ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("review_report.md"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Record a failed sample and keep going instead of aborting the run.
    pub isolate_failures: bool,
}
