//! tumorboard-validation — Benchmarking model verdicts against a gold standard.
//! - Gold-standard loading
//! - Per-tier precision/recall/F1, confusion matrix, tier-distance statistics
//! - Validation runs with failure analysis

pub mod gold;
pub mod metrics;
pub mod orchestrator;

pub use gold::{GoldStandard, GoldStandardEntry, GoldStandardError};
pub use metrics::{compute_metrics, DistanceStats, MetricsAccumulator, MetricsReport, TierMetrics, ValidationResult};
pub use orchestrator::{validate, ItemError, Misclassification, ValidationError, ValidationReport};
