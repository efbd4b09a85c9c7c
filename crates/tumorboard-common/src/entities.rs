/// Core domain types shared by the evidence, engine and validation crates.
/// These are the canonical shapes that cross crate boundaries and reach the
/// output files unchanged.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Tier (AMP/ASCO/CAP)
// ---------------------------------------------------------------------------

/// Actionability tier. Declaration order is the ordinal order: `I` is the
/// strongest, `IV` is benign / likely benign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    I,
    II,
    III,
    IV,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::I, Tier::II, Tier::III, Tier::IV];

    /// Ordinal position, 1..=4.
    pub fn ordinal(self) -> u8 {
        match self {
            Tier::I   => 1,
            Tier::II  => 2,
            Tier::III => 3,
            Tier::IV  => 4,
        }
    }

    /// Zero-based index, handy for fixed-size tables.
    pub fn index(self) -> usize {
        (self.ordinal() - 1) as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::I   => "Tier I",
            Tier::II  => "Tier II",
            Tier::III => "Tier III",
            Tier::IV  => "Tier IV",
        }
    }

    /// Absolute ordinal difference: 0 for an exact match, 3 for I vs IV.
    pub fn distance(self, other: Tier) -> u8 {
        self.ordinal().abs_diff(other.ordinal())
    }

    /// Parse a tier label leniently.
    ///
    /// Accepts "Tier I", "tier ii", "TIER_III", "Tier-4", "IV", "2", …
    /// Returns `None` for anything that does not name exactly one of the
    /// four tiers.
    pub fn parse_label(raw: &str) -> Option<Tier> {
        let lowered = raw.trim().to_lowercase();
        let rest = lowered.strip_prefix("tier").unwrap_or(&lowered);
        let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == ':');
        match rest.trim() {
            "i"   | "1" => Some(Tier::I),
            "ii"  | "2" => Some(Tier::II),
            "iii" | "3" => Some(Tier::III),
            "iv"  | "4" => Some(Tier::IV),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Tier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Tier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Tier::parse_label(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown tier label: {raw:?}")))
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// One (gene, variant, tumor type) query. Batch input record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantQuery {
    pub gene: String,
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
}

impl VariantQuery {
    pub fn new(gene: impl Into<String>, variant: impl Into<String>, tumor_type: Option<String>) -> Self {
        Self { gene: gene.into(), variant: variant.into(), tumor_type }
    }

    /// Case-insensitive identity key used to pair outputs with inputs.
    pub fn key(&self) -> (String, String, Option<String>) {
        (
            self.gene.trim().to_uppercase(),
            self.variant.trim().to_uppercase(),
            self.tumor_type.as_ref().map(|t| t.trim().to_lowercase()),
        )
    }

    pub fn label(&self) -> String {
        match &self.tumor_type {
            Some(t) => format!("{} {} ({})", self.gene, self.variant, t),
            None    => format!("{} {}", self.gene, self.variant),
        }
    }
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

/// Evidence sources, in priority order (highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EvidenceSourceKind {
    #[serde(rename = "CIViC")]
    Civic,
    #[serde(rename = "ClinVar")]
    ClinVar,
    #[serde(rename = "COSMIC")]
    Cosmic,
}

impl EvidenceSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceSourceKind::Civic   => "CIViC",
            EvidenceSourceKind::ClinVar => "ClinVar",
            EvidenceSourceKind::Cosmic  => "COSMIC",
        }
    }
}

/// A single source-attributed snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub source: EvidenceSourceKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

/// Database cross-references. Each is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cosmic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbsnp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinvar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ncbi_gene_id: Option<String>,
}

impl CrossReferences {
    pub fn is_empty(&self) -> bool {
        self.cosmic_id.is_none()
            && self.dbsnp_id.is_none()
            && self.clinvar_id.is_none()
            && self.ncbi_gene_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotationLevel {
    Genomic,
    Transcript,
    Protein,
}

impl NotationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotationLevel::Genomic    => "genomic",
            NotationLevel::Transcript => "transcript",
            NotationLevel::Protein    => "protein",
        }
    }
}

/// HGVS-style molecular notation tagged with its level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notation {
    pub level: NotationLevel,
    pub value: String,
}

/// Canonical, source-agnostic evidence bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantEvidence {
    pub gene: String,
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
    #[serde(default)]
    pub identifiers: CrossReferences,
    #[serde(default)]
    pub notations: Vec<Notation>,
    #[serde(default)]
    pub items: Vec<EvidenceItem>,
    /// False when the evidence source had no record for this variant.
    #[serde(default)]
    pub found: bool,
}

impl VariantEvidence {
    pub fn notation(&self, level: NotationLevel) -> Option<&str> {
        self.notations.iter()
            .find(|n| n.level == level)
            .map(|n| n.value.as_str())
    }

    pub fn snippet_chars(&self) -> usize {
        self.items.iter().map(|i| i.content.chars().count()).sum()
    }
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// Coarse restatement of the tier. Derived, never independently authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStrength {
    Strong,
    Moderate,
    Weak,
    Minimal,
}

impl From<Tier> for EvidenceStrength {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::I   => EvidenceStrength::Strong,
            Tier::II  => EvidenceStrength::Moderate,
            Tier::III => EvidenceStrength::Weak,
            Tier::IV  => EvidenceStrength::Minimal,
        }
    }
}

/// Where the confidence value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// Stated by the model.
    Model,
    /// The model omitted it; the conservative floor was applied.
    DefaultFloor,
}

/// Which parser path produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictPath {
    Structured,
    Heuristic,
}

/// The verdict for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub gene: String,
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
    pub tier: Tier,
    pub confidence: f64,
    pub confidence_source: ConfidenceSource,
    pub evidence_strength: EvidenceStrength,
    pub summary: String,
    #[serde(default)]
    pub therapies: BTreeSet<String>,
    pub verdict_path: VerdictPath,
    pub model: String,
    #[serde(default)]
    pub identifiers: CrossReferences,
    #[serde(default)]
    pub notations: Vec<Notation>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_distance_values() {
        assert_eq!(Tier::I.distance(Tier::I), 0);
        assert_eq!(Tier::I.distance(Tier::II), 1);
        assert_eq!(Tier::II.distance(Tier::III), 1);
        assert_eq!(Tier::III.distance(Tier::IV), 1);
        assert_eq!(Tier::I.distance(Tier::IV), 3);
    }

    #[test]
    fn test_tier_distance_is_symmetric() {
        for a in Tier::ALL {
            for b in Tier::ALL {
                assert_eq!(a.distance(b), b.distance(a));
            }
        }
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::I < Tier::II && Tier::II < Tier::III && Tier::III < Tier::IV);
    }

    #[test]
    fn test_parse_label_variants() {
        assert_eq!(Tier::parse_label("Tier I"), Some(Tier::I));
        assert_eq!(Tier::parse_label("tier ii"), Some(Tier::II));
        assert_eq!(Tier::parse_label("TIER_III"), Some(Tier::III));
        assert_eq!(Tier::parse_label("Tier-4"), Some(Tier::IV));
        assert_eq!(Tier::parse_label("IV"), Some(Tier::IV));
        assert_eq!(Tier::parse_label("2"), Some(Tier::II));
        assert_eq!(Tier::parse_label("Tier V"), None);
        assert_eq!(Tier::parse_label("tiered"), None);
        assert_eq!(Tier::parse_label(""), None);
    }

    #[test]
    fn test_tier_serde_uses_display_label() {
        let json = serde_json::to_string(&Tier::III).unwrap();
        assert_eq!(json, "\"Tier III\"");
        let back: Tier = serde_json::from_str("\"Tier III\"").unwrap();
        assert_eq!(back, Tier::III);
        assert!(serde_json::from_str::<Tier>("\"Tier 7\"").is_err());
    }

    #[test]
    fn test_query_key_is_case_insensitive() {
        let a = VariantQuery::new("braf", "v600e", Some("Melanoma".into()));
        let b = VariantQuery::new("BRAF", "V600E", Some(" melanoma ".into()));
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_source_priority_order() {
        assert!(EvidenceSourceKind::Civic < EvidenceSourceKind::ClinVar);
        assert!(EvidenceSourceKind::ClinVar < EvidenceSourceKind::Cosmic);
    }
}
