//! Validation runs: gold standard → batch assessment → metrics + failure analysis.

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tumorboard_common::{AssessmentError, Tier};
use tumorboard_engine::{AssessConfig, AssessmentEngine, BatchSummary};

use crate::gold::GoldStandard;
use crate::metrics::{compute_metrics, MetricsReport, ValidationResult};

#[derive(Error, Debug)]
pub enum ValidationError {
    /// A batch item could not be matched back to the gold entry it came from.
    #[error("batch item {index} ({gene} {variant}) does not match its gold entry")]
    Unpaired { index: usize, gene: String, variant: String },
}

/// A mispredicted entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Misclassification {
    pub gene: String,
    pub variant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
    pub expected: Tier,
    pub predicted: Tier,
    pub distance: u8,
    pub confidence: f64,
    /// The model's stated rationale.
    pub rationale: String,
}

/// An entry that produced no assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemError {
    pub index: usize,
    pub gene: String,
    pub variant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
    pub error: AssessmentError,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub gold_standard: String,
    pub model: String,
    pub summary: BatchSummary,
    /// Computed over successful assessments only.
    pub metrics: MetricsReport,
    /// Sorted by descending distance, then gene, variant, tumor type.
    pub failure_analysis: Vec<Misclassification>,
    pub errors: Vec<ItemError>,
    pub results: Vec<ValidationResult>,
}

/// Run every gold entry through the engine and score the verdicts.
pub async fn validate(
    engine: &AssessmentEngine,
    config: &AssessConfig,
    gold: &GoldStandard,
    max_concurrency: usize,
    cancel: &CancellationToken,
) -> Result<ValidationReport, ValidationError> {
    info!(gold_standard = %gold.name, entries = gold.entries.len(), model = %config.model, "Starting validation");

    let queries = gold.entries.iter().map(|e| e.query()).collect();
    let outcome = engine.assess_batch(config, queries, max_concurrency, cancel).await;

    let mut results = Vec::new();
    let mut errors = Vec::new();

    for item in outcome.items {
        let entry = gold
            .entries
            .get(item.index)
            .filter(|e| e.query().key() == item.query.key())
            .ok_or_else(|| {
                error!(index = item.index, "Batch item does not pair with a gold entry");
                ValidationError::Unpaired {
                    index: item.index,
                    gene: item.query.gene.clone(),
                    variant: item.query.variant.clone(),
                }
            })?;

        match item.result {
            Ok(assessment) => results.push(ValidationResult::new(entry.clone(), assessment)),
            Err(error) => errors.push(ItemError {
                index: item.index,
                gene: entry.gene.clone(),
                variant: entry.variant.clone(),
                tumor_type: entry.tumor_type.clone(),
                error,
            }),
        }
    }

    let metrics = compute_metrics(&results);
    let failure_analysis = failure_analysis(&results);

    info!(
        gold_standard = %gold.name,
        evaluated = metrics.total,
        accuracy = metrics.accuracy,
        misclassified = failure_analysis.len(),
        failed = outcome.summary.failed,
        cancelled = outcome.summary.cancelled,
        "Validation finished"
    );

    Ok(ValidationReport {
        gold_standard: gold.name.clone(),
        model: config.model.clone(),
        summary: outcome.summary,
        metrics,
        failure_analysis,
        errors,
        results,
    })
}

fn failure_analysis(results: &[ValidationResult]) -> Vec<Misclassification> {
    let mut out: Vec<Misclassification> = results
        .iter()
        .filter(|r| !r.correct)
        .map(|r| Misclassification {
            gene: r.entry.gene.clone(),
            variant: r.entry.variant.clone(),
            tumor_type: r.entry.tumor_type.clone(),
            expected: r.expected(),
            predicted: r.predicted(),
            distance: r.tier_distance,
            confidence: r.assessment.confidence,
            rationale: r.assessment.summary.clone(),
        })
        .collect();

    out.sort_by(|a, b| {
        b.distance
            .cmp(&a.distance)
            .then_with(|| a.gene.cmp(&b.gene))
            .then_with(|| a.variant.cmp(&b.variant))
            .then_with(|| a.tumor_type.cmp(&b.tumor_type))
    });
    out
}

impl ValidationReport {
    /// Plain-text console summary.
    pub fn render_text(&self) -> String {
        let m = &self.metrics;
        let mut report = String::new();

        report.push_str(&format!("\n=== Validation: {} ({}) ===\n\n", self.gold_standard, self.model));
        report.push_str(&format!(
            "Entries: {}  succeeded: {}  failed: {}  cancelled: {}\n",
            self.summary.total, self.summary.succeeded, self.summary.failed, self.summary.cancelled
        ));
        report.push_str(&format!("Accuracy: {:.1}% ({}/{})\n", m.accuracy * 100.0, m.correct, m.total));
        report.push_str(&format!("Mean confidence: {:.2}\n", m.mean_confidence));
        report.push_str(&format!("Macro F1: {:.3}\n\n", m.macro_f1()));

        report.push_str("Tier       Prec    Rec     F1      Support\n");
        for t in &m.per_tier {
            report.push_str(&format!(
                "{:<10} {:<7.3} {:<7.3} {:<7.3} {}\n",
                t.tier.as_str(), t.precision, t.recall, t.f1, t.support
            ));
        }

        report.push_str("\nConfusion (rows = expected, cols = predicted)\n");
        report.push_str("           I     II    III   IV\n");
        for tier in Tier::ALL {
            let row = &m.confusion[tier.index()];
            report.push_str(&format!(
                "{:<10} {:<5} {:<5} {:<5} {:<5}\n",
                tier.as_str(), row[0], row[1], row[2], row[3]
            ));
        }

        report.push_str(&format!(
            "\nTier distance: mean {:.2}, exact {}, close misses {}, severe {}\n",
            m.distance.mean, m.distance.histogram[0], m.distance.close_misses, m.distance.severe
        ));

        if !self.failure_analysis.is_empty() {
            report.push_str("\nMisclassifications:\n");
            for f in &self.failure_analysis {
                report.push_str(&format!(
                    "  [d={}] {} {}{}: expected {}, got {} ({:.2})\n",
                    f.distance,
                    f.gene,
                    f.variant,
                    f.tumor_type.as_deref().map(|t| format!(" ({t})")).unwrap_or_default(),
                    f.expected,
                    f.predicted,
                    f.confidence,
                ));
                if !f.rationale.is_empty() {
                    let short: String = f.rationale.chars().take(160).collect();
                    report.push_str(&format!("         {short}\n"));
                }
            }
        }

        if !self.errors.is_empty() {
            report.push_str("\nErrors:\n");
            for e in &self.errors {
                report.push_str(&format!("  #{} {} {}: {}\n", e.index, e.gene, e.variant, e.error));
            }
        }

        report.push('\n');
        report
    }
}
