//! Raw evidence → canonical `VariantEvidence`.
//!
//! Infallible by construction: every missing or malformed part of the raw
//! hit degrades to "absent". The only guarantees callers rely on are a
//! non-empty gene and variant, source-priority item order, no duplicate
//! `(source, content)` pairs, and a bounded total snippet length.

use serde_json::Value;
use tracing::debug;
use tumorboard_common::{
    EvidenceItem, EvidenceSourceKind, Notation, NotationLevel, VariantEvidence, VariantQuery,
};

use crate::dedup::dedup_items;
use crate::models::{entries, text, CivicRecord, ClinVarRecord, CosmicRecord};
use super::hgvs::{classify_notation, HgvsMutationNormaliser};
use super::identifiers::extract_identifiers;

/// Maximum combined snippet length, in characters.
pub const DEFAULT_SNIPPET_BUDGET: usize = 4000;

/// A truncated snippet shorter than this carries no useful signal; drop it instead.
const MIN_TRUNCATED_CHARS: usize = 40;

/// Placeholder for a blank gene or variant.
const UNKNOWN: &str = "UNKNOWN";

pub struct EvidenceNormaliser {
    snippet_budget: usize,
    hgvs: HgvsMutationNormaliser,
}

impl EvidenceNormaliser {
    pub fn new(snippet_budget: usize) -> Self {
        Self { snippet_budget, hgvs: HgvsMutationNormaliser::new() }
    }

    pub fn snippet_budget(&self) -> usize {
        self.snippet_budget
    }

    /// Normalise a raw hit (or its absence) for `query`.
    pub fn normalise(&self, query: &VariantQuery, raw: Option<&Value>) -> VariantEvidence {
        let gene = non_blank(&query.gene).unwrap_or_else(|| UNKNOWN.to_string());
        let variant = non_blank(&query.variant).unwrap_or_else(|| UNKNOWN.to_string());
        let tumor_type = query.tumor_type.as_deref().and_then(non_blank);

        let hit = raw.filter(|v| v.as_object().is_some_and(|o| !o.is_empty()));

        let (identifiers, mut notations, items) = match hit {
            Some(hit) => {
                let (items, removed) = dedup_items(collect_items(hit));
                let (items, truncated, dropped) = apply_budget(items, self.snippet_budget);
                debug!(
                    gene = %gene,
                    variant = %variant,
                    kept = items.len(),
                    duplicates = removed,
                    truncated,
                    dropped,
                    "Evidence normalised"
                );
                (extract_identifiers(hit), collect_notations(hit), items)
            }
            None => {
                debug!(gene = %gene, variant = %variant, "No evidence record; identity only");
                Default::default()
            }
        };

        if !notations.iter().any(|n| n.level == NotationLevel::Protein) {
            if let Some(m) = self.hgvs.normalise(&variant) {
                notations.push(Notation { level: NotationLevel::Protein, value: m.hgvs_p });
            }
        }
        notations.sort_by_key(|n| n.level);

        VariantEvidence {
            gene,
            variant,
            tumor_type,
            identifiers,
            notations,
            items,
            found: hit.is_some(),
        }
    }
}

impl Default for EvidenceNormaliser {
    fn default() -> Self { Self::new(DEFAULT_SNIPPET_BUDGET) }
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Flatten per-source records into items, CIViC → ClinVar → COSMIC.
fn collect_items(hit: &Value) -> Vec<EvidenceItem> {
    let mut items = Vec::new();

    for r in CivicRecord::parse_all(&hit["civic"]) {
        items.push(EvidenceItem {
            source: EvidenceSourceKind::Civic,
            content: r.snippet(),
            citation: r.source.clone(),
        });
    }
    for r in ClinVarRecord::parse_all(&hit["clinvar"]) {
        items.push(EvidenceItem {
            source: EvidenceSourceKind::ClinVar,
            content: r.snippet(),
            citation: r.variation_id.as_ref().map(|id| format!("ClinVar:{id}")),
        });
    }
    for r in CosmicRecord::parse_all(&hit["cosmic"]) {
        items.push(EvidenceItem {
            source: EvidenceSourceKind::Cosmic,
            content: r.snippet(),
            citation: r.cosmic_id.clone(),
        });
    }

    items.retain(|i| !i.content.trim().is_empty());
    items
}

/// HGVS notations from `_id`, `hgvs` and the CIViC variant name.
/// The first value seen for each level wins.
fn collect_notations(hit: &Value) -> Vec<Notation> {
    let mut candidates: Vec<String> = Vec::new();
    candidates.extend(text(&hit["_id"]));
    match &hit["hgvs"] {
        Value::Array(values) => candidates.extend(values.iter().filter_map(text)),
        other => candidates.extend(text(other)),
    }
    for civic in entries(&hit["civic"]) {
        if let Some(name) = text(&civic["name"]) {
            if name.contains(":p.") {
                candidates.push(name);
            }
        }
    }

    let mut out: Vec<Notation> = Vec::new();
    for value in candidates {
        if let Some(level) = classify_notation(&value) {
            if !out.iter().any(|n| n.level == level) {
                out.push(Notation { level, value });
            }
        }
    }
    out
}

/// Cap the combined snippet length. Items are in priority order, so the
/// tail (lowest priority) is truncated or dropped first.
/// Returns `(kept, truncated_count, dropped_count)`.
fn apply_budget(items: Vec<EvidenceItem>, budget: usize) -> (Vec<EvidenceItem>, usize, usize) {
    let mut remaining = budget;
    let mut kept = Vec::with_capacity(items.len());
    let mut truncated = 0;
    let mut dropped = 0;

    for mut item in items {
        let len = item.content.chars().count();
        if len <= remaining {
            remaining -= len;
            kept.push(item);
        } else if remaining >= MIN_TRUNCATED_CHARS {
            let mut cut: String = item.content.chars().take(remaining - 1).collect();
            cut.push('…');
            item.content = cut;
            remaining = 0;
            truncated += 1;
            kept.push(item);
        } else {
            remaining = 0;
            dropped += 1;
        }
    }

    (kept, truncated, dropped)
}
