//! tumorboard-common — Shared types, errors, and helpers used across all Tumorboard crates.

pub mod error;
pub mod entities;
pub mod confidence;
pub mod retry;

// Re-export commonly used types
pub use entities::{
    Assessment, ConfidenceSource, CrossReferences, EvidenceItem, EvidenceSourceKind,
    EvidenceStrength, Notation, NotationLevel, Tier, VariantEvidence, VariantQuery, VerdictPath,
};
pub use error::{AssessmentError, Result, TumorboardError};
pub use retry::RetryPolicy;
