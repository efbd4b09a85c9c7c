//! Cross-reference identifier extraction and format checks.
//!
//! A value that does not match its expected format is dropped, never
//! propagated: a malformed accession in the prompt is worse than none.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tumorboard_common::CrossReferences;

use crate::models::{entries, text};

lazy_static! {
    static ref RE_COSMIC: Regex = Regex::new(r"^COS[MV]\d+$").expect("static regex");
    static ref RE_RSID:   Regex = Regex::new(r"^rs\d+$").expect("static regex");
    static ref RE_DIGITS: Regex = Regex::new(r"^\d+$").expect("static regex");
}

/// `COSM476` / `COSV56056643`. Case is normalised to upper.
pub fn check_cosmic_id(raw: &str) -> Option<String> {
    let id = raw.trim().to_uppercase();
    RE_COSMIC.is_match(&id).then_some(id)
}

/// `rs113488022`. A bare number gets the `rs` prefix.
pub fn check_rsid(raw: &str) -> Option<String> {
    let id = raw.trim().to_lowercase();
    let id = if RE_DIGITS.is_match(&id) { format!("rs{id}") } else { id };
    RE_RSID.is_match(&id).then_some(id)
}

/// Purely numeric identifiers (ClinVar variation id, NCBI gene id).
pub fn check_numeric_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    RE_DIGITS.is_match(id).then(|| id.to_string())
}

/// First value of `field` across the entries of a source object/list.
fn first_field(source: &Value, field: &str) -> Option<String> {
    entries(source).into_iter().find_map(|e| text(&e[field]))
}

/// Extract every cross-reference from a MyVariant hit.
pub fn extract_identifiers(hit: &Value) -> CrossReferences {
    let cosmic_id = first_field(&hit["cosmic"], "cosmic_id")
        .and_then(|id| check_cosmic_id(&id));

    let dbsnp_id = text(&hit["dbsnp"]["rsid"])
        .and_then(|id| check_rsid(&id));

    let clinvar_id = first_field(&hit["clinvar"], "variant_id")
        .or_else(|| first_field(&hit["clinvar"], "variation_id"))
        .and_then(|id| check_numeric_id(&id));

    let ncbi_gene_id = text(&hit["entrezgene"])
        .or_else(|| text(&hit["dbsnp"]["gene"]["geneid"]))
        .and_then(|id| check_numeric_id(&id));

    CrossReferences { cosmic_id, dbsnp_id, clinvar_id, ncbi_gene_id }
}
