//! Validation runs against a scripted backend.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use tumorboard_common::{RetryPolicy, Tier};
use tumorboard_engine::{AssessConfig, AssessmentEngine};
use tumorboard_test_utils::fixtures::{braf_v600e_hit, kras_g12d_hit, verdict_json};
use tumorboard_test_utils::{prompt_gene_variant, MockBackend, MockReply, StaticEvidenceSource};
use tumorboard_validation::{validate, GoldStandard};

fn config() -> AssessConfig {
    AssessConfig::new("test-model").with_retry(RetryPolicy::immediate(2))
}

/// Answers by gene; unknown genes get an unparseable reply.
fn backend(answers: &'static [(&'static str, &'static str, f64)]) -> Arc<MockBackend> {
    Arc::new(MockBackend::from_fn(move |req| {
        let (gene, _) = prompt_gene_variant(req).unwrap_or_default();
        match answers.iter().find(|(g, _, _)| *g == gene) {
            Some((_, tier, conf)) => MockReply::text(verdict_json(tier, *conf, &format!("{gene} reasoning"))),
            None => MockReply::text("no opinion"),
        }
    }))
}

fn gold(text: &str) -> GoldStandard {
    GoldStandard::from_json_str("test", text).unwrap()
}

#[tokio::test]
async fn test_one_hit_one_miss() {
    let gold = gold(
        r#"{"name": "pair", "entries": [
            {"gene": "BRAF", "variant": "V600E", "tumor_type": "Melanoma", "expected_tier": "Tier I"},
            {"gene": "KRAS", "variant": "G12D", "tumor_type": "Pancreatic", "expected_tier": "Tier II"}
        ]}"#,
    );
    let evidence = StaticEvidenceSource::new()
        .with_hit("BRAF", "V600E", braf_v600e_hit())
        .with_hit("KRAS", "G12D", kras_g12d_hit());
    static ANSWERS: [(&str, &str, f64); 2] = [("BRAF", "Tier I", 0.75), ("KRAS", "Tier IV", 0.25)];
    let engine = AssessmentEngine::new(Arc::new(evidence), backend(&ANSWERS));

    let report = validate(&engine, &config(), &gold, 4, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.gold_standard, "pair");
    assert_eq!(report.model, "test-model");
    assert_eq!(report.metrics.total, 2);
    assert_eq!(report.metrics.accuracy, 0.5);
    assert_eq!(report.metrics.mean_confidence, 0.5);
    assert_eq!(report.metrics.distance.severe, 1);
    assert_eq!(report.results.len(), 2);
    assert!(report.errors.is_empty());

    assert_eq!(report.failure_analysis.len(), 1);
    let miss = &report.failure_analysis[0];
    assert_eq!((miss.gene.as_str(), miss.expected, miss.predicted, miss.distance), ("KRAS", Tier::II, Tier::IV, 2));
    assert_eq!(miss.tumor_type.as_deref(), Some("Pancreatic"));
    assert_eq!(miss.rationale, "KRAS reasoning");

    let text = report.render_text();
    assert!(text.contains("Accuracy: 50.0% (1/2)"));
    assert!(text.contains("KRAS G12D (Pancreatic): expected Tier II, got Tier IV"));
}

#[tokio::test]
async fn test_errors_are_reported_separately() {
    let gold = gold(
        r#"[
            {"gene": "BRAF", "variant": "V600E", "expected_tier": "Tier I"},
            {"gene": "EGFR", "variant": "L858R", "expected_tier": "Tier I"},
            {"gene": "TP53", "variant": "R175H", "expected_tier": "Tier III"}
        ]"#,
    );
    let evidence = StaticEvidenceSource::new().with_failure("EGFR", "L858R", "connection reset");
    static ANSWERS: [(&str, &str, f64); 2] = [("BRAF", "Tier I", 0.9), ("EGFR", "Tier I", 0.9)];
    let engine = AssessmentEngine::new(Arc::new(evidence), backend(&ANSWERS));

    let report = validate(&engine, &config(), &gold, 2, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.failed, 2);
    // Metrics only see the one successful assessment.
    assert_eq!(report.metrics.total, 1);
    assert_eq!(report.metrics.accuracy, 1.0);
    assert!(report.failure_analysis.is_empty());

    let kinds: Vec<_> = report.errors.iter().map(|e| (e.index, e.gene.as_str(), e.error.kind())).collect();
    assert_eq!(kinds, vec![(1, "EGFR", "evidence_fetch"), (2, "TP53", "model_invocation")]);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["errors"][0]["error"]["kind"], "evidence_fetch");
    assert_eq!(json["metrics"]["per_tier"][0]["fn"], 0);
}

#[tokio::test]
async fn test_failure_analysis_sorted_by_distance() {
    let gold = gold(
        r#"[
            {"gene": "NRAS", "variant": "Q61K", "expected_tier": "Tier II"},
            {"gene": "ALK", "variant": "F1174L", "expected_tier": "Tier I"},
            {"gene": "IDH1", "variant": "R132H", "expected_tier": "Tier I"},
            {"gene": "MET", "variant": "Y1003F", "expected_tier": "Tier II"}
        ]"#,
    );
    static ANSWERS: [(&str, &str, f64); 4] = [
        ("NRAS", "Tier III", 0.5),
        ("ALK", "Tier III", 0.5),
        ("IDH1", "Tier IV", 0.5),
        ("MET", "Tier II", 0.5),
    ];
    let engine = AssessmentEngine::new(Arc::new(StaticEvidenceSource::new()), backend(&ANSWERS));

    let report = validate(&engine, &config(), &gold, 3, &CancellationToken::new()).await.unwrap();

    let order: Vec<_> = report.failure_analysis.iter().map(|f| (f.gene.as_str(), f.distance)).collect();
    assert_eq!(order, vec![("IDH1", 3), ("ALK", 2), ("NRAS", 1)]);
    assert_eq!(report.metrics.correct, 1);
}

#[tokio::test]
async fn test_cancelled_run_still_reports() {
    let gold = gold(r#"[{"gene": "BRAF", "variant": "V600E", "expected_tier": "Tier I"}]"#);
    let engine = AssessmentEngine::new(
        Arc::new(StaticEvidenceSource::new()),
        Arc::new(MockBackend::always(verdict_json("Tier I", 0.9, "x"))),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = validate(&engine, &config(), &gold, 1, &cancel).await.unwrap();
    assert_eq!(report.summary.cancelled, 1);
    assert_eq!(report.metrics.total, 0);
    assert_eq!(report.errors[0].error.kind(), "cancelled");
}
