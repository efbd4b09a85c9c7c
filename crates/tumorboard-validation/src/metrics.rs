//! Classification metrics over validation results.
//!
//! Everything is derived from a 4×4 confusion matrix (expected × predicted),
//! the confidence sum and the tier-distance histogram, so the streaming
//! `MetricsAccumulator` and the batch `compute_metrics` agree exactly when
//! fed the same results in the same order.

use serde::{Deserialize, Serialize};
use tumorboard_common::{Assessment, Tier};

use crate::gold::GoldStandardEntry;

/// One gold entry paired with the assessment produced for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub entry: GoldStandardEntry,
    pub assessment: Assessment,
    pub correct: bool,
    pub tier_distance: u8,
}

impl ValidationResult {
    pub fn new(entry: GoldStandardEntry, assessment: Assessment) -> Self {
        let tier_distance = entry.expected_tier.distance(assessment.tier);
        Self { correct: tier_distance == 0, tier_distance, entry, assessment }
    }

    pub fn expected(&self) -> Tier { self.entry.expected_tier }
    pub fn predicted(&self) -> Tier { self.assessment.tier }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierMetrics {
    pub tier: Tier,
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    /// Number of results whose expected tier is this one.
    pub support: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl TierMetrics {
    fn from_counts(tier: Tier, tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
        let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self { tier, tp, fp, fn_, support: tp + fn_, precision, recall, f1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceStats {
    pub mean: f64,
    /// Count of results at distance 0, 1, 2, 3.
    pub histogram: [usize; 4],
    /// Distance exactly 1.
    pub close_misses: usize,
    /// Distance 2 or more.
    pub severe: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub mean_confidence: f64,
    /// In tier order I..IV.
    pub per_tier: Vec<TierMetrics>,
    /// `confusion[expected][predicted]`, indexed I..IV.
    pub confusion: [[usize; 4]; 4],
    pub distance: DistanceStats,
}

impl MetricsReport {
    pub fn tier(&self, tier: Tier) -> &TierMetrics {
        &self.per_tier[tier.index()]
    }

    /// Unweighted mean of per-tier F1 over tiers that occur in the data
    /// (as expected or predicted).
    pub fn macro_f1(&self) -> f64 {
        let present: Vec<&TierMetrics> = self.per_tier.iter().filter(|m| m.support + m.fp > 0).collect();
        if present.is_empty() {
            return 0.0;
        }
        present.iter().map(|m| m.f1).sum::<f64>() / present.len() as f64
    }
}

/// Streaming accumulator. `finish` may be called at any point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsAccumulator {
    total: usize,
    confidence_sum: f64,
    confusion: [[usize; 4]; 4],
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, expected: Tier, predicted: Tier, confidence: f64) {
        self.total += 1;
        self.confidence_sum += confidence;
        self.confusion[expected.index()][predicted.index()] += 1;
    }

    pub fn push(&mut self, result: &ValidationResult) {
        self.record(result.expected(), result.predicted(), result.assessment.confidence);
    }

    pub fn len(&self) -> usize { self.total }
    pub fn is_empty(&self) -> bool { self.total == 0 }

    pub fn finish(&self) -> MetricsReport {
        let m = &self.confusion;

        let correct: usize = (0..4).map(|i| m[i][i]).sum();

        let per_tier = Tier::ALL
            .iter()
            .map(|&tier| {
                let t = tier.index();
                let tp = m[t][t];
                let row: usize = m[t].iter().sum();
                let col: usize = (0..4).map(|e| m[e][t]).sum();
                TierMetrics::from_counts(tier, tp, col - tp, row - tp)
            })
            .collect();

        // Distance histogram straight from the matrix: cell (e, p) sits at |e - p|.
        let mut histogram = [0usize; 4];
        let mut distance_sum = 0usize;
        for (e, row) in m.iter().enumerate() {
            for (p, &count) in row.iter().enumerate() {
                let d = e.abs_diff(p);
                histogram[d] += count;
                distance_sum += d * count;
            }
        }

        let ratio = |num: f64| if self.total > 0 { num / self.total as f64 } else { 0.0 };

        MetricsReport {
            total: self.total,
            correct,
            accuracy: ratio(correct as f64),
            mean_confidence: ratio(self.confidence_sum),
            per_tier,
            confusion: *m,
            distance: DistanceStats {
                mean: ratio(distance_sum as f64),
                histogram,
                close_misses: histogram[1],
                severe: histogram[2] + histogram[3],
            },
        }
    }
}

/// Batch computation over a full result set.
pub fn compute_metrics(results: &[ValidationResult]) -> MetricsReport {
    let mut acc = MetricsAccumulator::new();
    for r in results {
        acc.push(r);
    }
    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use tumorboard_common::{ConfidenceSource, EvidenceStrength, VerdictPath};

    fn result(gene: &str, expected: Tier, predicted: Tier, confidence: f64) -> ValidationResult {
        let entry = GoldStandardEntry {
            gene: gene.to_string(),
            variant: "V1A".to_string(),
            tumor_type: None,
            expected_tier: expected,
            notes: None,
            references: vec![],
        };
        let assessment = Assessment {
            gene: gene.to_string(),
            variant: "V1A".to_string(),
            tumor_type: None,
            tier: predicted,
            confidence,
            confidence_source: ConfidenceSource::Model,
            evidence_strength: EvidenceStrength::from(predicted),
            summary: String::new(),
            therapies: BTreeSet::new(),
            verdict_path: VerdictPath::Structured,
            model: "m".to_string(),
            identifiers: Default::default(),
            notations: vec![],
        };
        ValidationResult::new(entry, assessment)
    }

    #[test]
    fn test_two_entry_scenario() {
        let results = vec![
            result("BRAF", Tier::I, Tier::I, 0.75),
            result("KRAS", Tier::II, Tier::IV, 0.25),
        ];
        let m = compute_metrics(&results);
        assert_eq!(m.total, 2);
        assert_eq!(m.correct, 1);
        assert_eq!(m.accuracy, 0.5);
        assert_eq!(m.mean_confidence, 0.5);
        assert_eq!(m.distance.histogram, [1, 0, 1, 0]);
        assert_eq!(m.distance.mean, 1.0);
        assert_eq!(m.distance.close_misses, 0);
        assert_eq!(m.distance.severe, 1);

        let t1 = m.tier(Tier::I);
        assert_eq!((t1.tp, t1.fp, t1.fn_), (1, 0, 0));
        assert_eq!(t1.f1, 1.0);
        let t2 = m.tier(Tier::II);
        assert_eq!((t2.tp, t2.fp, t2.fn_, t2.support), (0, 0, 1, 1));
        assert_eq!((t2.precision, t2.recall, t2.f1), (0.0, 0.0, 0.0));
        let t4 = m.tier(Tier::IV);
        assert_eq!((t4.tp, t4.fp, t4.fn_), (0, 1, 0));
        assert_eq!(m.confusion[1][3], 1);
    }

    #[test]
    fn test_perfect_set() {
        let results: Vec<_> = Tier::ALL.iter().map(|&t| result("G", t, t, 1.0)).collect();
        let m = compute_metrics(&results);
        assert_eq!(m.accuracy, 1.0);
        for t in &m.per_tier {
            assert_eq!((t.precision, t.recall, t.f1), (1.0, 1.0, 1.0));
        }
        assert_eq!(m.macro_f1(), 1.0);
        assert_eq!(m.distance.histogram, [4, 0, 0, 0]);
    }

    #[test]
    fn test_absent_tier_has_zero_metrics() {
        let m = compute_metrics(&[result("G", Tier::I, Tier::II, 0.4)]);
        let t3 = m.tier(Tier::III);
        assert_eq!((t3.tp, t3.fp, t3.fn_, t3.support), (0, 0, 0, 0));
        assert_eq!((t3.precision, t3.recall, t3.f1), (0.0, 0.0, 0.0));
        assert_eq!(m.distance.close_misses, 1);
    }

    #[test]
    fn test_empty_set() {
        let m = compute_metrics(&[]);
        assert_eq!(m.total, 0);
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.mean_confidence, 0.0);
        assert_eq!(m.distance.mean, 0.0);
        assert_eq!(m.macro_f1(), 0.0);
    }

    #[test]
    fn test_bounds_and_accumulator_agreement() {
        let pairs = [
            (Tier::I, Tier::I), (Tier::I, Tier::II), (Tier::II, Tier::II), (Tier::III, Tier::I),
            (Tier::IV, Tier::IV), (Tier::IV, Tier::III), (Tier::II, Tier::IV), (Tier::III, Tier::III),
            (Tier::I, Tier::IV), (Tier::II, Tier::I),
        ];
        let results: Vec<_> = pairs
            .iter()
            .enumerate()
            .map(|(i, &(e, p))| result("G", e, p, (i as f64) / 10.0))
            .collect();

        let batch = compute_metrics(&results);
        let mut acc = MetricsAccumulator::new();
        let mut last = None;
        for r in &results {
            acc.push(r);
            last = Some(acc.finish());
        }
        assert_eq!(last.unwrap(), batch);
        assert_eq!(acc.len(), results.len());

        assert!((0.0..=1.0).contains(&batch.accuracy));
        assert!((0.0..=1.0).contains(&batch.mean_confidence));
        for t in &batch.per_tier {
            for v in [t.precision, t.recall, t.f1] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
        assert_eq!(batch.distance.histogram.iter().sum::<usize>(), batch.total);
        assert_eq!(batch.per_tier.iter().map(|t| t.support).sum::<usize>(), batch.total);
        assert_eq!(batch.distance.histogram[3], 1);
    }
}
