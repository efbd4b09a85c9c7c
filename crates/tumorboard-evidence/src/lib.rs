//! tumorboard-evidence — Variant evidence retrieval and normalisation.
//! - Evidence source clients (MyVariant.info aggregating CIViC, ClinVar, COSMIC)
//! - Tolerant parsing of per-source records
//! - Normalisation into the canonical `VariantEvidence`
//! - Snippet deduplication

pub mod sources;
pub mod models;
pub mod normalise;
pub mod dedup;

pub use normalise::{EvidenceNormaliser, DEFAULT_SNIPPET_BUDGET};
pub use sources::{EvidenceError, EvidenceSource};
