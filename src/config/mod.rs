//! Configuration loading.
//!
//! Resolution order, later wins: built-in defaults, `config.toml`
//! (`--config <path>` or `~/.vulnreview/config.toml`), environment
//! variables, then CLI flags (applied by the caller).

pub mod schema;

pub use schema::{
    Config, DatasetConfig, GeneratorConfig, PipelineSettings, ReportConfig, ScannerConfig,
};

use anyhow::{Context, Result};
use directories::UserDirs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = ".vulnreview";
const CONFIG_FILE: &str = "config.toml";

/// `~/.vulnreview/config.toml`, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|u| u.home_dir().join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Expand a leading `~` and environment variables in a user-supplied path.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path {}", path.display()))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

impl Config {
    /// Load from an explicit path (which must exist) or the default
    /// location (which may be absent), then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(&expand_path(path)?)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Apply `VULNREVIEW_*` / `HF_TOKEN` overrides through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("VULNREVIEW_GENERATOR_ENDPOINT") {
            self.generator.endpoint = endpoint;
        }
        if let Some(model) = lookup("VULNREVIEW_GENERATOR_MODEL") {
            self.generator.model = model;
        }
        if self.dataset.token.is_none() {
            self.dataset.token = lookup("HF_TOKEN").filter(|t| !t.trim().is_empty());
        }
    }
}
