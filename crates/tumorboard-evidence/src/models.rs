//! Per-source evidence records as returned inside a MyVariant.info hit.
//!
//! MyVariant returns each source either as a single object or as a list,
//! and field types drift between releases (strings vs lists, objects vs
//! names). Every parser here is tolerant: wrong-typed or missing fields
//! become `None`, unusable entries are skipped, nothing panics or errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single object or list → iterator over the object entries.
pub(crate) fn entries(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().filter(|v| v.is_object()).collect(),
        Value::Object(_)    => vec![value],
        _                   => Vec::new(),
    }
}

/// Non-empty trimmed string, or a number rendered as text.
pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A string field, or the `name` of an object field.
fn text_or_name(value: &Value) -> Option<String> {
    text(value).or_else(|| text(&value["name"]))
}

/// List of strings / named objects, or a single one.
fn names(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_or_name).collect(),
        other => text_or_name(other).into_iter().collect(),
    }
}

// ── CIViC ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CivicRecord {
    pub evidence_type: Option<String>,
    pub evidence_level: Option<String>,
    pub evidence_direction: Option<String>,
    pub clinical_significance: Option<String>,
    pub disease: Option<String>,
    pub therapies: Vec<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub rating: Option<String>,
}

impl CivicRecord {
    /// Parse the `civic` field of a hit. Handles nested `evidence_items`
    /// as well as direct evidence objects.
    pub fn parse_all(civic: &Value) -> Vec<CivicRecord> {
        let mut out = Vec::new();
        for item in entries(civic) {
            match item.get("evidence_items") {
                Some(nested) => out.extend(entries(nested).into_iter().map(Self::parse_one)),
                None => out.push(Self::parse_one(item)),
            }
        }
        out.retain(|r| !r.is_empty());
        out
    }

    fn parse_one(item: &Value) -> CivicRecord {
        let mut therapies = names(&item["drugs"]);
        if therapies.is_empty() {
            therapies = names(&item["therapies"]);
        }

        let source = text_or_name(&item["source"])
            .or_else(|| text(&item["source"]["citation"]))
            .or_else(|| text(&item["source"]["pubmed_id"]).map(|p| format!("PMID:{p}")));

        CivicRecord {
            evidence_type:         text(&item["evidence_type"]),
            evidence_level:        text(&item["evidence_level"]),
            evidence_direction:    text(&item["evidence_direction"]),
            clinical_significance: text(&item["clinical_significance"])
                .or_else(|| text(&item["significance"])),
            disease:               text_or_name(&item["disease"]),
            therapies,
            description:           text(&item["description"]),
            source,
            rating:                text(&item["rating"]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.evidence_type.is_none()
            && self.evidence_level.is_none()
            && self.clinical_significance.is_none()
            && self.disease.is_none()
            && self.therapies.is_empty()
            && self.description.is_none()
    }

    /// One-line rendering for the prompt.
    pub fn snippet(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(l) = &self.evidence_level { parts.push(format!("Level {l}")); }
        if let Some(t) = &self.evidence_type { parts.push(t.clone()); }
        if let Some(d) = &self.evidence_direction { parts.push(d.clone()); }
        if let Some(s) = &self.clinical_significance { parts.push(s.clone()); }
        if let Some(d) = &self.disease { parts.push(format!("Disease: {d}")); }
        if !self.therapies.is_empty() { parts.push(format!("Therapies: {}", self.therapies.join(", "))); }
        if let Some(r) = &self.rating { parts.push(format!("Rating: {r}")); }
        if let Some(d) = &self.description { parts.push(d.clone()); }
        parts.join(" | ")
    }
}

// ── ClinVar ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinVarRecord {
    pub clinical_significance: Option<String>,
    pub review_status: Option<String>,
    pub conditions: Vec<String>,
    pub last_evaluated: Option<String>,
    pub variation_id: Option<String>,
}

impl ClinVarRecord {
    pub fn parse_all(clinvar: &Value) -> Vec<ClinVarRecord> {
        entries(clinvar)
            .into_iter()
            .map(Self::parse_one)
            .filter(|r| !r.is_empty())
            .collect()
    }

    fn parse_one(item: &Value) -> ClinVarRecord {
        let clinical_significance = match &item["clinical_significance"] {
            Value::Array(values) => {
                let joined = values.iter().filter_map(text).collect::<Vec<_>>().join(", ");
                (!joined.is_empty()).then_some(joined)
            }
            other => text(other),
        };

        ClinVarRecord {
            clinical_significance,
            review_status:  text(&item["review_status"]),
            conditions:     names(&item["conditions"]),
            last_evaluated: text(&item["last_evaluated"]),
            variation_id:   text(&item["variant_id"]).or_else(|| text(&item["variation_id"])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clinical_significance.is_none() && self.review_status.is_none() && self.conditions.is_empty()
    }

    pub fn snippet(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(s) = &self.clinical_significance { parts.push(format!("Clinical significance: {s}")); }
        if let Some(r) = &self.review_status { parts.push(format!("Review status: {r}")); }
        if !self.conditions.is_empty() { parts.push(format!("Conditions: {}", self.conditions.join(", "))); }
        if let Some(d) = &self.last_evaluated { parts.push(format!("Last evaluated: {d}")); }
        parts.join(" | ")
    }
}

// ── COSMIC ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CosmicRecord {
    pub cosmic_id: Option<String>,
    pub primary_site: Option<String>,
    pub site_subtype: Option<String>,
    pub primary_histology: Option<String>,
    pub histology_subtype: Option<String>,
    pub sample_count: Option<u64>,
    pub somatic_status: Option<String>,
}

impl CosmicRecord {
    pub fn parse_all(cosmic: &Value) -> Vec<CosmicRecord> {
        entries(cosmic)
            .into_iter()
            .map(Self::parse_one)
            .filter(|r| !r.is_empty())
            .collect()
    }

    fn parse_one(item: &Value) -> CosmicRecord {
        CosmicRecord {
            cosmic_id:         text(&item["cosmic_id"]).or_else(|| text(&item["mutation_id"])),
            primary_site:      text(&item["primary_site"]),
            site_subtype:      text(&item["site_subtype"]),
            primary_histology: text(&item["primary_histology"]),
            histology_subtype: text(&item["histology_subtype"]),
            sample_count:      item["sample_count"].as_u64()
                .or_else(|| text(&item["sample_count"]).and_then(|s| s.parse().ok())),
            somatic_status:    text(&item["mutation_somatic_status"]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary_site.is_none()
            && self.primary_histology.is_none()
            && self.sample_count.is_none()
            && self.somatic_status.is_none()
    }

    pub fn snippet(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(site) = &self.primary_site {
            match &self.site_subtype {
                Some(sub) if sub != "NS" => parts.push(format!("Primary site: {site} ({sub})")),
                _ => parts.push(format!("Primary site: {site}")),
            }
        }
        if let Some(h) = &self.primary_histology {
            match &self.histology_subtype {
                Some(sub) if sub != "NS" => parts.push(format!("Histology: {h} ({sub})")),
                _ => parts.push(format!("Histology: {h}")),
            }
        }
        if let Some(n) = self.sample_count { parts.push(format!("Samples: {n}")); }
        if let Some(s) = &self.somatic_status { parts.push(format!("Somatic status: {s}")); }
        parts.join(" | ")
    }
}
