//! tumorboard-engine — Variant actionability assessment.
//! - Prompt construction from normalised evidence
//! - Model invocation with retry and audit
//! - Verdict parsing (structured JSON, heuristic text recovery)
//! - Single and batch assessment under a concurrency cap

pub mod config;
pub mod prompt;
pub mod invoker;
pub mod parser;
pub mod engine;

pub use config::{AssessConfig, TierTaxonomy};
pub use engine::{AssessmentEngine, BatchItem, BatchOutcome, BatchSummary};
pub use invoker::{invoke, Invocation};
pub use parser::{parse_verdict, ParsedVerdict, VerdictFields, VerdictParseError};
pub use prompt::build_request;
