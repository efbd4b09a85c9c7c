//! Assessment engine: evidence → prompt → model → verdict.
//!
//! `assess_one` runs the pipeline for one query. `assess_batch` runs many
//! under a concurrency cap (`buffer_unordered`, FIFO admission) and writes
//! each result into a pre-sized buffer at its input index, so output order
//! never depends on completion order.
//!
//! Cancellation: items not yet started are reported `Cancelled` without
//! doing any work; in-flight items race the token and are abandoned.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use tumorboard_common::confidence::resolve_confidence;
use tumorboard_common::{
    Assessment, AssessmentError, EvidenceStrength, VariantEvidence, VariantQuery, VerdictPath,
};
use tumorboard_evidence::{EvidenceNormaliser, EvidenceSource};
use tumorboard_llm::LlmBackend;

use crate::config::AssessConfig;
use crate::invoker::invoke;
use crate::parser::ParsedVerdict;
use crate::prompt::build_request;

pub struct AssessmentEngine {
    evidence: Arc<dyn EvidenceSource>,
    backend: Arc<dyn LlmBackend>,
}

impl AssessmentEngine {
    pub fn new(evidence: Arc<dyn EvidenceSource>, backend: Arc<dyn LlmBackend>) -> Self {
        Self { evidence, backend }
    }

    pub fn backend(&self) -> &dyn LlmBackend {
        self.backend.as_ref()
    }

    /// Assess a single query. "Not found" at the evidence source is valid
    /// input; only a transport failure is an `EvidenceFetch` error.
    #[instrument(skip(self, config), fields(gene = %query.gene, variant = %query.variant))]
    pub async fn assess_one(
        &self,
        config: &AssessConfig,
        query: &VariantQuery,
    ) -> Result<Assessment, AssessmentError> {
        let raw = self
            .evidence
            .fetch_evidence(&query.gene, &query.variant, query.tumor_type.as_deref())
            .await
            .map_err(|e| AssessmentError::EvidenceFetch(e.to_string()))?;

        let evidence = EvidenceNormaliser::new(config.snippet_budget).normalise(query, raw.as_ref());
        let request = build_request(&evidence, &config.model, &config.taxonomy);

        let invocation = invoke(self.backend.as_ref(), &request, &config.retry).await?;

        let assessment = assemble(evidence, invocation.verdict, &config.model);
        debug!(
            tier = %assessment.tier,
            confidence = assessment.confidence,
            path = ?assessment.verdict_path,
            "Assessment complete"
        );
        Ok(assessment)
    }

    /// Assess `queries` with at most `max_concurrency` in flight (clamped to ≥ 1).
    pub async fn assess_batch(
        &self,
        config: &AssessConfig,
        queries: Vec<VariantQuery>,
        max_concurrency: usize,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let total = queries.len();
        let cap = max_concurrency.max(1);
        info!(total, max_concurrency = cap, model = %config.model, "Starting batch assessment");

        let mut slots: Vec<Option<Result<Assessment, AssessmentError>>> =
            (0..total).map(|_| None).collect();

        {
            let queries_ref = &queries;
            let mut results = stream::iter(0..total)
                .map(move |index| {
                    let query = &queries_ref[index];
                    async move {
                        if cancel.is_cancelled() {
                            return (index, Err(AssessmentError::Cancelled));
                        }
                        let result = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => Err(AssessmentError::Cancelled),
                            r = self.assess_one(config, query) => r,
                        };
                        (index, result)
                    }
                })
                .buffer_unordered(cap);

            while let Some((index, result)) = results.next().await {
                match &result {
                    Ok(_) => {}
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => warn!(index, query = %queries[index].label(), error = %e, "Item failed"),
                }
                slots[index] = Some(result);
            }
        }

        let items: Vec<BatchItem> = queries
            .into_iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (query, slot))| BatchItem {
                index,
                query,
                result: slot.unwrap_or(Err(AssessmentError::Cancelled)),
            })
            .collect();

        let summary = BatchSummary::from_items(&items);
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Batch assessment finished"
        );
        BatchOutcome { items, summary }
    }
}

/// Build the final assessment. Constructed once, never mutated afterwards.
fn assemble(evidence: VariantEvidence, verdict: ParsedVerdict, model: &str) -> Assessment {
    let verdict_path = match verdict {
        ParsedVerdict::Structured(_) => VerdictPath::Structured,
        ParsedVerdict::Heuristic(_) => VerdictPath::Heuristic,
    };
    let fields = verdict.into_fields();
    let (confidence, confidence_source) = resolve_confidence(fields.confidence);

    Assessment {
        gene: evidence.gene,
        variant: evidence.variant,
        tumor_type: evidence.tumor_type,
        tier: fields.tier,
        confidence,
        confidence_source,
        evidence_strength: EvidenceStrength::from(fields.tier),
        summary: fields.summary,
        therapies: fields.therapies,
        verdict_path,
        model: model.to_string(),
        identifiers: evidence.identifiers,
        notations: evidence.notations,
    }
}

// ── Batch results ─────────────────────────────────────────────────────────────

/// One batch item, at its input position.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub index: usize,
    pub query: VariantQuery,
    pub result: Result<Assessment, AssessmentError>,
}

/// `{"index", "query", "assessment"}` or `{"index", "query", "error"}`.
impl Serialize for BatchItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("index", &self.index)?;
        map.serialize_entry("query", &self.query)?;
        match &self.result {
            Ok(a) => map.serialize_entry("assessment", a)?,
            Err(e) => map.serialize_entry("error", e)?,
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    pub fn from_items(items: &[BatchItem]) -> Self {
        let mut s = BatchSummary { total: items.len(), ..Default::default() };
        for item in items {
            match &item.result {
                Ok(_) => s.succeeded += 1,
                Err(e) if e.is_cancelled() => s.cancelled += 1,
                Err(_) => s.failed += 1,
            }
        }
        s
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// In input order.
    pub items: Vec<BatchItem>,
    pub summary: BatchSummary,
}

impl BatchOutcome {
    pub fn assessments(&self) -> impl Iterator<Item = &Assessment> {
        self.items.iter().filter_map(|i| i.result.as_ref().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tumorboard_common::{ConfidenceSource, Tier};
    use crate::parser::VerdictFields;

    fn evidence() -> VariantEvidence {
        VariantEvidence {
            gene: "KRAS".to_string(),
            variant: "G12C".to_string(),
            tumor_type: None,
            identifiers: Default::default(),
            notations: vec![],
            items: vec![],
            found: false,
        }
    }

    #[test]
    fn test_assemble_applies_floor() {
        let verdict = ParsedVerdict::Heuristic(VerdictFields {
            tier: Tier::II,
            confidence: None,
            summary: "Tier II".to_string(),
            therapies: BTreeSet::new(),
        });
        let a = assemble(evidence(), verdict, "m");
        assert_eq!(a.confidence, 0.3);
        assert_eq!(a.confidence_source, ConfidenceSource::DefaultFloor);
        assert_eq!(a.verdict_path, VerdictPath::Heuristic);
        assert_eq!(a.evidence_strength, EvidenceStrength::Moderate);
    }

    #[test]
    fn test_assemble_clamps_confidence() {
        let verdict = ParsedVerdict::Structured(VerdictFields {
            tier: Tier::I,
            confidence: Some(250.0),
            summary: String::new(),
            therapies: BTreeSet::new(),
        });
        let a = assemble(evidence(), verdict, "m");
        assert_eq!(a.confidence, 1.0);
        assert_eq!(a.confidence_source, ConfidenceSource::Model);
    }

    #[test]
    fn test_summary_counts() {
        let q = VariantQuery::new("A", "B", None);
        let items = vec![
            BatchItem { index: 0, query: q.clone(), result: Err(AssessmentError::Cancelled) },
            BatchItem { index: 1, query: q.clone(), result: Err(AssessmentError::VerdictParse("x".into())) },
        ];
        assert_eq!(
            BatchSummary::from_items(&items),
            BatchSummary { total: 2, succeeded: 0, failed: 1, cancelled: 1 }
        );
    }

    #[test]
    fn test_item_serializes_error_inline() {
        let item = BatchItem {
            index: 3,
            query: VariantQuery::new("EGFR", "L858R", None),
            result: Err(AssessmentError::EvidenceFetch("timeout".into())),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["index"], 3);
        assert_eq!(json["error"]["kind"], "evidence_fetch");
        assert!(json.get("assessment").is_none());
    }
}
