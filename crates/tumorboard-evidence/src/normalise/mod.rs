//! Evidence normalisation.
//!
//! - `EvidenceNormaliser`: raw MyVariant hit → canonical `VariantEvidence`
//! - `identifiers`: cross-reference extraction and format checks
//! - `hgvs`: notation classification and protein-change normalisation

pub mod evidence;
pub mod hgvs;
pub mod identifiers;

pub use evidence::{EvidenceNormaliser, DEFAULT_SNIPPET_BUDGET};
pub use hgvs::{classify_notation, HgvsMutationNormaliser, NormalisedMutation};
