//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   OllamaBackend           — local Ollama (OpenAI-compatible endpoint)
//!   OpenAiBackend           — OpenAI API (gpt-4o, gpt-4o-mini, o1, …)
//!   OpenAiCompatibleBackend — any OpenAI-compatible endpoint (LMStudio,
//!                             TogetherAI, Groq, OpenRouter, vLLM, …)
//!   AnthropicBackend        — Anthropic Messages API (claude-*)
//!   GeminiBackend           — Google Gemini API (gemini-1.5-pro, flash, …)
//!
//! Every backend receives the model name inside the request; the name is
//! opaque here and is forwarded as-is.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Backend misconfigured: {0}")]
    Config(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

impl LlmError {
    /// Transient failures are worth retrying: timeouts, connection drops,
    /// throttling, server-side errors, and bodies we could not decode.
    /// Authentication and request errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(e) => {
                if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() || e.is_decode() {
                    return true;
                }
                e.status().map(|s| is_transient_status(s.as_u16())).unwrap_or(false)
            }
            LlmError::MalformedResponse(_) => true,
            LlmError::Unavailable(_)       => true,
            LlmError::RateLimitExceeded    => true,
            LlmError::ApiError { status, .. } => is_transient_status(*status),
            LlmError::Config(_)            => false,
        }
    }
}

fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 425 | 429) || (500..600).contains(&status)
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask for a JSON object response where the provider supports it.
    #[serde(default)]
    pub json_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    /// Short backend name used in logs and audit entries ("openai", …).
    fn name(&self) -> &str;
    /// Default model when the request does not name one.
    fn model_id(&self) -> &str;
    fn is_local(&self) -> bool;
}

// ── Helper: parse OpenAI-style response ──────────────────────────────────────

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> Result<LlmResponse, LlmError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| LlmError::MalformedResponse("missing choices[0].message.content".to_string()))?
        .to_string();

    Ok(LlmResponse {
        content,
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    })
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;

    if status == 429 {
        return Err(LlmError::RateLimitExceeded);
    }

    let body: serde_json::Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) if status < 400 => {
            return Err(LlmError::MalformedResponse(format!("undecodable body: {e}")));
        }
        Err(_) => serde_json::Value::Null,
    };

    if status >= 400 {
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| text.chars().take(200).collect());
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(body)
}

fn openai_body(req: &LlmRequest, default_model: &str) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model":       req.model.as_deref().unwrap_or(default_model),
        "messages":    req.messages,
        "max_tokens":  req.max_tokens.unwrap_or(4096),
        "temperature": req.temperature.unwrap_or(0.0),
    });
    if req.json_mode {
        body["response_format"] = serde_json::json!({ "type": "json_object" });
    }
    body
}

// ── 1. Ollama (local) ─────────────────────────────────────────────────────────

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), model: model.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = openai_body(&req, &self.model);
        let resp = self.client.post(&url)
            .timeout(DEFAULT_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        parse_openai_response(&json, &self.model)
    }

    fn name(&self) -> &str { "ollama" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
}

// ── 2. OpenAI ─────────────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    pub model: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self { model: model.into(), api_key, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = openai_body(&req, &self.model);
        let resp = self.client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(self.api_key.expose_secret())
            .timeout(DEFAULT_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        parse_openai_response(&json, &self.model)
    }

    fn name(&self) -> &str { "openai" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

// ── 3. OpenAI-Compatible (LMStudio, TogetherAI, Groq, OpenRouter, vLLM, …) ──

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k.expose_secret()),
            None    => req,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = openai_body(&req, &self.model);
        let resp = self.auth(self.client.post(&url))
            .timeout(DEFAULT_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        parse_openai_response(&json, &self.model)
    }

    fn name(&self) -> &str { "openai_compatible" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

// ── 4. Anthropic (claude-*) ───────────────────────────────────────────────────

pub struct AnthropicBackend {
    pub model: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self { api_key, model: model.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        // Anthropic Messages API — split system prompt from user messages
        let system = req.messages.iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let messages: Vec<serde_json::Value> = req.messages.iter()
            .filter(|m| m.role != "system")
            .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
            .collect();

        let model = req.model.as_deref().unwrap_or(&self.model);
        let max_tokens = req.max_tokens.unwrap_or(4096);

        let mut body = serde_json::json!({
            "model":       model,
            "messages":    messages,
            "max_tokens":  max_tokens,
            "temperature": req.temperature.unwrap_or(0.0),
        });
        if !system.is_empty() {
            body["system"] = serde_json::Value::String(system.to_string());
        }

        let resp = self.client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .timeout(DEFAULT_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let json = check_response_status(resp).await?;

        let content = json["content"]
            .as_array()
            .and_then(|blocks| blocks.iter().find_map(|b| b["text"].as_str()))
            .ok_or_else(|| LlmError::MalformedResponse("no text block in content".to_string()))?
            .to_string();

        Ok(LlmResponse {
            content,
            model: json["model"].as_str().unwrap_or(model).to_string(),
            prompt_tokens:     json["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: json["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        })
    }

    fn name(&self) -> &str { "anthropic" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

// ── 5. Google Gemini ──────────────────────────────────────────────────────────

pub struct GeminiBackend {
    pub model: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self { api_key, model: model.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = req.model.as_deref().unwrap_or(&self.model);
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model
        );

        // System message → systemInstruction
        let system_text = req.messages.iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.clone());

        let contents: Vec<serde_json::Value> = req.messages.iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": m.content }]
                })
            })
            .collect();

        let mut generation_config = serde_json::json!({
            "maxOutputTokens": req.max_tokens.unwrap_or(4096),
            "temperature":     req.temperature.unwrap_or(0.0),
        });
        if req.json_mode {
            generation_config["responseMimeType"] = serde_json::json!("application/json");
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": generation_config,
        });
        if let Some(sys) = system_text {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": sys }]
            });
        }

        let resp = self.client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .timeout(DEFAULT_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;

        let content = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::MalformedResponse("missing candidates[0] text".to_string()))?
            .to_string();

        let prompt_tokens = json["usageMetadata"]["promptTokenCount"]
            .as_u64().unwrap_or(0) as u32;
        let completion_tokens = json["usageMetadata"]["candidatesTokenCount"]
            .as_u64().unwrap_or(0) as u32;

        Ok(LlmResponse {
            content,
            model: model.to_string(),
            prompt_tokens,
            completion_tokens,
        })
    }

    fn name(&self) -> &str { "gemini" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
