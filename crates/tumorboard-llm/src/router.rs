//! Backend selection.
//!
//! The concrete backend is chosen once, from configuration, before any
//! assessment runs. Core code only ever sees `Arc<dyn LlmBackend>`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::backend::{
    AnthropicBackend, GeminiBackend, LlmBackend, LlmError, OllamaBackend, OpenAiBackend,
    OpenAiCompatibleBackend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    Ollama,
    Anthropic,
    Gemini,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi           => "openai",
            BackendKind::OpenAiCompatible => "openai_compatible",
            BackendKind::Ollama           => "ollama",
            BackendKind::Anthropic        => "anthropic",
            BackendKind::Gemini           => "gemini",
        }
    }

    /// Whether this backend needs an API key to be usable.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, BackendKind::OpenAi | BackendKind::Anthropic | BackendKind::Gemini)
    }

    /// Conventional environment variable holding this provider's key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            BackendKind::OpenAi           => "OPENAI_API_KEY",
            BackendKind::OpenAiCompatible => "OPENAI_COMPATIBLE_API_KEY",
            BackendKind::Ollama           => "OLLAMA_API_KEY",
            BackendKind::Anthropic        => "ANTHROPIC_API_KEY",
            BackendKind::Gemini           => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "openai"                                 => Ok(BackendKind::OpenAi),
            "openai_compatible" | "compat"           => Ok(BackendKind::OpenAiCompatible),
            "ollama"                                 => Ok(BackendKind::Ollama),
            "anthropic" | "claude"                   => Ok(BackendKind::Anthropic),
            "gemini" | "google"                      => Ok(BackendKind::Gemini),
            other => Err(LlmError::Config(format!("unknown backend kind: {other}"))),
        }
    }
}

/// Everything needed to construct one backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
}

/// Build the configured backend. Fails fast when a remote backend has no key
/// or an endpoint-based backend has no base URL.
pub fn build_backend(cfg: BackendConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    if cfg.kind.requires_api_key() && cfg.api_key.is_none() {
        return Err(LlmError::Config(format!(
            "{} backend selected but no API key found (set {} or llm.api_key)",
            cfg.kind,
            cfg.kind.api_key_env()
        )));
    }

    let backend: Arc<dyn LlmBackend> = match cfg.kind {
        BackendKind::OpenAi => {
            let key = require_key(cfg.api_key, cfg.kind)?;
            Arc::new(OpenAiBackend::new(key, cfg.model))
        }
        BackendKind::Anthropic => {
            let key = require_key(cfg.api_key, cfg.kind)?;
            Arc::new(AnthropicBackend::new(key, cfg.model))
        }
        BackendKind::Gemini => {
            let key = require_key(cfg.api_key, cfg.kind)?;
            Arc::new(GeminiBackend::new(key, cfg.model))
        }
        BackendKind::Ollama => {
            let base_url = cfg.base_url.unwrap_or_else(|| "http://localhost:11434".to_string());
            Arc::new(OllamaBackend::new(base_url, cfg.model))
        }
        BackendKind::OpenAiCompatible => {
            let base_url = cfg.base_url.ok_or_else(|| LlmError::Config(
                "openai_compatible backend requires llm.base_url".to_string()
            ))?;
            Arc::new(OpenAiCompatibleBackend::new(base_url, cfg.model, cfg.api_key))
        }
    };

    tracing::info!(
        backend = backend.name(),
        model = backend.model_id(),
        is_local = backend.is_local(),
        "LLM backend selected"
    );

    Ok(backend)
}

fn require_key(key: Option<SecretString>, kind: BackendKind) -> Result<SecretString, LlmError> {
    key.ok_or_else(|| LlmError::Config(format!("missing API key for {kind}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(kind: BackendKind, key: Option<&str>, base_url: Option<&str>) -> BackendConfig {
        BackendConfig {
            kind,
            model: "some-model".to_string(),
            api_key: key.map(|k| SecretString::from(k.to_string())),
            base_url: base_url.map(str::to_string),
        }
    }

    #[test]
    fn test_remote_backend_without_key_fails_fast() {
        let err = build_backend(cfg(BackendKind::OpenAi, None, None)).err().unwrap();
        assert!(matches!(err, LlmError::Config(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let b = build_backend(cfg(BackendKind::Ollama, None, None)).unwrap();
        assert_eq!(b.name(), "ollama");
        assert!(b.is_local());
    }

    #[test]
    fn test_compatible_requires_base_url() {
        assert!(build_backend(cfg(BackendKind::OpenAiCompatible, None, None)).is_err());
        let b = build_backend(cfg(BackendKind::OpenAiCompatible, None, Some("http://localhost:8000"))).unwrap();
        assert_eq!(b.model_id(), "some-model");
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("OpenAI".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!("openai-compatible".parse::<BackendKind>().unwrap(), BackendKind::OpenAiCompatible);
        assert_eq!("claude".parse::<BackendKind>().unwrap(), BackendKind::Anthropic);
        assert!("watson".parse::<BackendKind>().is_err());
    }
}
