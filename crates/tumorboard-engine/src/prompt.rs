//! Prompt construction.
//!
//! Output is byte-identical for identical input: no timestamps, no hash-map
//! iteration, fixed temperature.

use tumorboard_common::{NotationLevel, Tier, VariantEvidence};
use tumorboard_llm::{LlmRequest, Message};

use crate::config::TierTaxonomy;

const MAX_RESPONSE_TOKENS: u32 = 1024;

/// Build the model request for one normalised evidence bundle.
pub fn build_request(evidence: &VariantEvidence, model: &str, taxonomy: &TierTaxonomy) -> LlmRequest {
    LlmRequest {
        messages: vec![
            Message::system(system_prompt(taxonomy)),
            Message::user(user_prompt(evidence)),
        ],
        model: Some(model.to_string()),
        max_tokens: Some(MAX_RESPONSE_TOKENS),
        temperature: Some(0.0),
        json_mode: true,
    }
}

fn system_prompt(taxonomy: &TierTaxonomy) -> String {
    let mut s = String::new();
    s.push_str(
        "You are a molecular tumor board expert. Classify the clinical actionability of a \
         somatic cancer variant using the evidence provided.\n\n",
    );
    s.push_str(&format!("Tier taxonomy ({}):\n", taxonomy.name));
    for tier in Tier::ALL {
        s.push_str(&format!("- {}: {}\n", tier, taxonomy.definition(tier)));
    }
    s.push_str(
        "\nRespond with a single JSON object and nothing else:\n\
         {\n  \
           \"tier\": one of \"Tier I\", \"Tier II\", \"Tier III\", \"Tier IV\",\n  \
           \"confidence\": a number between 0 and 1,\n  \
           \"summary\": a short rationale citing the evidence,\n  \
           \"therapies\": a list of relevant therapy names (may be empty)\n\
         }\n\
         Use only the four tier labels above. If the evidence is thin, say so and lower the confidence.\n",
    );
    s
}

fn user_prompt(ev: &VariantEvidence) -> String {
    let mut s = String::new();
    s.push_str(&format!("Gene: {}\nVariant: {}\n", ev.gene, ev.variant));
    match &ev.tumor_type {
        Some(t) => s.push_str(&format!("Tumor type: {t}\n")),
        None => s.push_str("Tumor type: not specified (consider all tumor types)\n"),
    }

    let ids = &ev.identifiers;
    let id_lines: Vec<String> = [
        ("COSMIC", &ids.cosmic_id),
        ("dbSNP", &ids.dbsnp_id),
        ("ClinVar", &ids.clinvar_id),
        ("NCBI Gene", &ids.ncbi_gene_id),
    ]
    .into_iter()
    .filter_map(|(label, v)| v.as_ref().map(|v| format!("- {label}: {v}")))
    .collect();
    if !id_lines.is_empty() {
        s.push_str("\nIdentifiers:\n");
        s.push_str(&id_lines.join("\n"));
        s.push('\n');
    }

    let notation_lines: Vec<String> = [NotationLevel::Genomic, NotationLevel::Transcript, NotationLevel::Protein]
        .into_iter()
        .filter_map(|level| ev.notation(level).map(|v| format!("- {}: {v}", level.as_str())))
        .collect();
    if !notation_lines.is_empty() {
        s.push_str("\nHGVS notations:\n");
        s.push_str(&notation_lines.join("\n"));
        s.push('\n');
    }

    s.push_str("\nEvidence:\n");
    if ev.items.is_empty() {
        s.push_str("No database evidence was found for this variant. Assess from general knowledge of the gene and variant.\n");
    } else {
        for (i, item) in ev.items.iter().enumerate() {
            s.push_str(&format!("{}. [{}] {}", i + 1, item.source.as_str(), item.content));
            if let Some(c) = &item.citation {
                s.push_str(&format!(" (source: {c})"));
            }
            s.push('\n');
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tumorboard_common::{CrossReferences, EvidenceItem, EvidenceSourceKind, Notation};

    fn evidence() -> VariantEvidence {
        VariantEvidence {
            gene: "BRAF".to_string(),
            variant: "V600E".to_string(),
            tumor_type: Some("Melanoma".to_string()),
            identifiers: CrossReferences {
                cosmic_id: Some("COSM476".to_string()),
                ..Default::default()
            },
            notations: vec![Notation { level: NotationLevel::Protein, value: "p.Val600Glu".to_string() }],
            items: vec![EvidenceItem {
                source: EvidenceSourceKind::Civic,
                content: "Level A | Predictive | Therapies: Vemurafenib".to_string(),
                citation: Some("FDA".to_string()),
            }],
            found: true,
        }
    }

    #[test]
    fn test_deterministic() {
        let tax = TierTaxonomy::default();
        let a = build_request(&evidence(), "gpt-4o", &tax);
        let b = build_request(&evidence(), "gpt-4o", &tax);
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_request_shape() {
        let req = build_request(&evidence(), "gpt-4o", &TierTaxonomy::default());
        assert_eq!(req.model.as_deref(), Some("gpt-4o"));
        assert_eq!(req.temperature, Some(0.0));
        assert!(req.json_mode);
        assert_eq!(req.messages.len(), 2);

        let system = &req.messages[0].content;
        for label in ["Tier I", "Tier II", "Tier III", "Tier IV"] {
            assert!(system.contains(label));
        }
        assert!(system.contains("between 0 and 1"));

        let user = &req.messages[1].content;
        assert!(user.contains("Gene: BRAF"));
        assert!(user.contains("- COSMIC: COSM476"));
        assert!(user.contains("1. [CIViC] Level A | Predictive"));
        assert!(user.contains("(source: FDA)"));
    }

    #[test]
    fn test_no_evidence_line() {
        let mut ev = evidence();
        ev.items.clear();
        ev.tumor_type = None;
        let user = build_request(&ev, "m", &TierTaxonomy::default()).messages[1].content.clone();
        assert!(user.contains("No database evidence was found"));
        assert!(user.contains("not specified"));
    }
}
