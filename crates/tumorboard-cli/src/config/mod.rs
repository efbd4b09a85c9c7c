//! Configuration loading for Tumorboard.
//! Reads tumorboard.toml from the current directory, the path in the
//! TUMORBOARD_CONFIG env var, or an explicit `--config` path.

use std::path::{Path, PathBuf};

use anyhow::Context;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tumorboard_common::RetryPolicy;
use tumorboard_engine::AssessConfig;
use tumorboard_llm::{BackendConfig, BackendKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub evidence: EvidenceConfig,
    #[serde(default)]
    pub assessment: AssessmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Prefer the environment; kept here for local setups.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_backend() -> BackendKind { BackendKind::OpenAi }
fn default_model()   -> String      { "gpt-4o-mini".to_string() }

impl Default for LlmConfig {
    fn default() -> Self {
        Self { backend: default_backend(), model: default_model(), base_url: None, api_key: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    #[serde(default = "default_evidence_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_evidence_url() -> String { "https://myvariant.info/v1".to_string() }
fn default_timeout_secs() -> u64    { 30 }

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self { base_url: default_evidence_url(), timeout_secs: default_timeout_secs() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_snippet_budget")]
    pub snippet_budget: usize,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_max_concurrency() -> usize { 4 }
fn default_snippet_budget()  -> usize { tumorboard_evidence::DEFAULT_SNIPPET_BUDGET }

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            snippet_budget: default_snippet_budget(),
            retry: RetryPolicy::default(),
        }
    }
}

mod tests;

impl Config {
    /// Load configuration. `explicit` wins over TUMORBOARD_CONFIG, which wins
    /// over ./tumorboard.toml. A missing default file yields defaults; a
    /// missing explicitly named file is an error.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let (path, named) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var("TUMORBOARD_CONFIG") {
                Ok(p) => (PathBuf::from(p), true),
                Err(_) => (PathBuf::from("tumorboard.toml"), false),
            },
        };

        if !path.exists() {
            if named {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            tracing::debug!("No tumorboard.toml found, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// API key for the selected backend: config first, then
    /// TUMORBOARD_<PROVIDER>_API_KEY, then the provider's usual variable.
    pub fn api_key(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<SecretString> {
        let kind = self.llm.backend;
        self.llm
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| lookup(&format!("TUMORBOARD_{}_API_KEY", kind.as_str().to_uppercase())))
            .or_else(|| lookup(kind.api_key_env()))
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            kind: self.llm.backend,
            model: self.llm.model.clone(),
            api_key: self.api_key(|name| std::env::var(name).ok()),
            base_url: self.llm.base_url.clone(),
        }
    }

    pub fn assess_config(&self) -> AssessConfig {
        AssessConfig::new(self.llm.model.clone())
            .with_retry(self.assessment.retry.clone())
            .with_snippet_budget(self.assessment.snippet_budget)
    }
}
