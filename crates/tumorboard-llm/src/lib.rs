//! tumorboard-llm — LLM backend abstraction layer.
//! The `LlmBackend` trait, its provider implementations, backend selection
//! from configuration, and per-call audit entries.

pub mod backend;
pub mod router;
pub mod audit;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use router::{build_backend, BackendConfig, BackendKind};
