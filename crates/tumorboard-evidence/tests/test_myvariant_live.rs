//! Live MyVariant.info lookups.
//!
//! Requires network access. Run with:
//! ```bash
//! cargo test --package tumorboard-evidence --test test_myvariant_live -- --ignored --nocapture
//! ```

use tumorboard_common::{NotationLevel, VariantQuery};
use tumorboard_evidence::sources::MyVariantClient;
use tumorboard_evidence::{EvidenceNormaliser, EvidenceSource};

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires network access
async fn test_braf_v600e_live() {
    let client = MyVariantClient::new();
    let raw = client
        .fetch_evidence("BRAF", "V600E", Some("Melanoma"))
        .await
        .expect("MyVariant request failed");
    assert!(raw.is_some(), "BRAF V600E should be known to MyVariant");

    let query = VariantQuery::new("BRAF", "V600E", Some("Melanoma".to_string()));
    let evidence = EvidenceNormaliser::default().normalise(&query, raw.as_ref());
    println!("{} items, {} chars", evidence.items.len(), evidence.snippet_chars());
    assert!(evidence.found);
    assert!(evidence.notation(NotationLevel::Genomic).is_some());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires network access
async fn test_unknown_variant_live() {
    let client = MyVariantClient::new();
    let raw = client
        .fetch_evidence("NOTAGENE", "Z9999Q", None)
        .await
        .expect("MyVariant request failed");
    assert!(raw.is_none());
}
