//! Audit entries for LLM calls.
//! One entry per successful completion; the output itself is not stored,
//! only its SHA-256 so runs can be compared without retaining model text.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuditEntry {
    pub id: Uuid,
    pub model: String,
    pub backend: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub attempts: u32,
    pub output_hash: String,
    pub latency_ms: u64,
    pub called_at: chrono::DateTime<Utc>,
}

impl LlmAuditEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: String,
        backend: String,
        prompt_tokens: u32,
        completion_tokens: u32,
        attempts: u32,
        output: &str,
        latency_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model,
            backend,
            prompt_tokens,
            completion_tokens,
            attempts,
            output_hash: hash_output(output),
            latency_ms,
            called_at: Utc::now(),
        }
    }

    /// Emit the entry on the `tumorboard::audit` tracing target.
    pub fn log(&self) {
        tracing::info!(
            target: "tumorboard::audit",
            id = %self.id,
            model = %self.model,
            backend = %self.backend,
            prompt_tokens = self.prompt_tokens,
            completion_tokens = self.completion_tokens,
            attempts = self.attempts,
            latency_ms = self.latency_ms,
            output_hash = %self.output_hash,
            "LLM call"
        );
    }
}

pub fn hash_output(output: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(output.as_bytes());
    format!("{:x}", hasher.finalize())
}
