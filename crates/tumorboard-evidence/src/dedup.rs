//! Deduplication of evidence snippets.
//!
//! MyVariant frequently repeats the same CIViC or ClinVar record under
//! several accessions. Two items are duplicates when they come from the same
//! source and their content is equal after whitespace normalisation. The
//! first occurrence wins, so source-priority order is preserved.

use std::collections::HashSet;

use tumorboard_common::{EvidenceItem, EvidenceSourceKind};

/// Collapse runs of whitespace and trim. Used for comparison only.
fn comparison_key(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove duplicate `(source, content)` pairs, keeping first occurrences.
/// Returns the kept items and the number removed.
pub fn dedup_items(items: Vec<EvidenceItem>) -> (Vec<EvidenceItem>, usize) {
    let before = items.len();
    let mut seen: HashSet<(EvidenceSourceKind, String)> = HashSet::with_capacity(before);

    let kept: Vec<EvidenceItem> = items
        .into_iter()
        .filter(|item| seen.insert((item.source, comparison_key(&item.content))))
        .collect();

    let removed = before - kept.len();
    (kept, removed)
}
