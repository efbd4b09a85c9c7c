//! HGVS notation helpers.
//!
//! Two jobs:
//! - classify a notation string by level (genomic / transcript / protein);
//! - normalise a short protein change ("V600E", "p.V600E", "Val600Glu")
//!   into canonical three-letter HGVS p. notation.
//!
//! # Example
//! ```ignore
//! let norm = HgvsMutationNormaliser::new();
//! let m = norm.normalise("V600E").unwrap();
//! assert_eq!(m.hgvs_p, "p.Val600Glu");
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tumorboard_common::NotationLevel;

lazy_static! {
    // optional "p." prefix; single letter, '*', or 1–3 letter residue names
    static ref RE_HGVS_P: Regex =
        Regex::new(r"^(?:p\.)?([A-Z][a-z]{0,2}|\*)(\d+)([A-Z][a-z]{0,2}|\*)$").expect("static regex");
}

/// Single-letter → three-letter amino acid map.
fn aa1_to_aa3(aa: &str) -> Option<&'static str> {
    match aa.to_uppercase().as_str() {
        "A" => Some("Ala"), "C" => Some("Cys"), "D" => Some("Asp"),
        "E" => Some("Glu"), "F" => Some("Phe"), "G" => Some("Gly"),
        "H" => Some("His"), "I" => Some("Ile"), "K" => Some("Lys"),
        "L" => Some("Leu"), "M" => Some("Met"), "N" => Some("Asn"),
        "P" => Some("Pro"), "Q" => Some("Gln"), "R" => Some("Arg"),
        "S" => Some("Ser"), "T" => Some("Thr"), "V" => Some("Val"),
        "W" => Some("Trp"), "Y" => Some("Tyr"), "*" => Some("Ter"),
        "X" => Some("Ter"),
        _ => None,
    }
}

/// Three-letter amino acid name → three-letter (title-case) canonical form.
fn normalise_aa3(aa: &str) -> Option<&'static str> {
    match aa.to_lowercase().as_str() {
        "ala" => Some("Ala"), "cys" => Some("Cys"), "asp" => Some("Asp"),
        "glu" => Some("Glu"), "phe" => Some("Phe"), "gly" => Some("Gly"),
        "his" => Some("His"), "ile" => Some("Ile"), "lys" => Some("Lys"),
        "leu" => Some("Leu"), "met" => Some("Met"), "asn" => Some("Asn"),
        "pro" => Some("Pro"), "gln" => Some("Gln"), "arg" => Some("Arg"),
        "ser" => Some("Ser"), "thr" => Some("Thr"), "val" => Some("Val"),
        "trp" => Some("Trp"), "tyr" => Some("Tyr"), "ter" => Some("Ter"),
        "stop" | "*" => Some("Ter"),
        _ => None,
    }
}

/// Classify a notation string by HGVS level. `None` when it is none of them.
pub fn classify_notation(notation: &str) -> Option<NotationLevel> {
    let n = notation.trim();
    if n.is_empty() {
        return None;
    }
    if n.starts_with("chr") || n.starts_with("NC_") || n.contains(":g.") {
        Some(NotationLevel::Genomic)
    } else if n.contains(":p.") || n.starts_with("p.") {
        Some(NotationLevel::Protein)
    } else if n.contains(":c.") || n.starts_with("c.") {
        Some(NotationLevel::Transcript)
    } else {
        None
    }
}

/// Protein form used for evidence queries: "V600E" → "p.V600E".
pub fn protein_query_form(variant: &str) -> String {
    let v = variant.trim();
    if v.starts_with("p.") { v.to_string() } else { format!("p.{v}") }
}

/// Normalised protein change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalisedMutation {
    /// Input text as supplied.
    pub raw: String,
    /// Canonical HGVS protein notation, e.g. "p.Val600Glu"
    pub hgvs_p: String,
    /// Position number extracted.
    pub position: u32,
    /// Reference amino acid (3-letter), e.g. "Val"
    pub ref_aa: String,
    /// Alt amino acid (3-letter), e.g. "Glu"
    pub alt_aa: String,
}

pub struct HgvsMutationNormaliser {
    /// Regex: p.AA123AA notation (single or triple letter), e.g. p.V600E, p.Val600Glu
    re_hgvs: &'static Regex,
}

impl HgvsMutationNormaliser {
    pub fn new() -> Self {
        Self { re_hgvs: &*RE_HGVS_P }
    }

    fn resolve(aa: &str) -> Option<&'static str> {
        if aa.len() == 1 { aa1_to_aa3(aa) } else { normalise_aa3(aa) }
    }

    /// Normalise a protein change to HGVS p. notation.
    /// Returns `None` if the input can't be parsed as a substitution.
    pub fn normalise(&self, raw: &str) -> Option<NormalisedMutation> {
        let raw = raw.trim();
        let caps = self.re_hgvs.captures(raw)?;

        let ref_aa = Self::resolve(caps.get(1)?.as_str())?;
        let pos: u32 = caps.get(2)?.as_str().parse().ok()?;
        let alt_aa = Self::resolve(caps.get(3)?.as_str())?;

        Some(NormalisedMutation {
            raw: raw.to_string(),
            hgvs_p: format!("p.{}{}{}", ref_aa, pos, alt_aa),
            position: pos,
            ref_aa: ref_aa.to_string(),
            alt_aa: alt_aa.to_string(),
        })
    }
}

impl Default for HgvsMutationNormaliser {
    fn default() -> Self { Self::new() }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
