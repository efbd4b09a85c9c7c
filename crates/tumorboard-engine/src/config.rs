//! Per-run assessment configuration.
//!
//! Passed explicitly into every engine call so that concurrent runs against
//! different models or taxonomies never share state.

use serde::{Deserialize, Serialize};
use tumorboard_common::{RetryPolicy, Tier};
use tumorboard_evidence::DEFAULT_SNIPPET_BUDGET;

/// Human-readable definition of each tier, rendered into the system prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTaxonomy {
    pub name: String,
    /// Definitions in tier order I..IV.
    pub definitions: [String; 4],
}

impl TierTaxonomy {
    /// AMP/ASCO/CAP 2017 somatic variant classification.
    pub fn amp_asco_cap() -> Self {
        Self {
            name: "AMP/ASCO/CAP 2017".to_string(),
            definitions: [
                "Variants of strong clinical significance: FDA-approved therapy or professional \
                 guideline for this tumor type (level A), or well-powered studies with expert \
                 consensus (level B)."
                    .to_string(),
                "Variants of potential clinical significance: FDA-approved therapy for a different \
                 tumor type, investigational therapies, or multiple small published studies \
                 (levels C and D)."
                    .to_string(),
                "Variants of unknown clinical significance: not observed at significant allele \
                 frequency in population databases, no convincing published evidence of cancer \
                 association."
                    .to_string(),
                "Variants deemed benign or likely benign: observed at significant allele \
                 frequency in population databases, no existing evidence of cancer association."
                    .to_string(),
            ],
        }
    }

    pub fn definition(&self, tier: Tier) -> &str {
        &self.definitions[tier.index()]
    }
}

impl Default for TierTaxonomy {
    fn default() -> Self { Self::amp_asco_cap() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessConfig {
    /// Opaque model name forwarded to the backend.
    pub model: String,
    #[serde(default)]
    pub taxonomy: TierTaxonomy,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Maximum combined evidence snippet length, in characters.
    #[serde(default = "default_snippet_budget")]
    pub snippet_budget: usize,
}

fn default_snippet_budget() -> usize { DEFAULT_SNIPPET_BUDGET }

impl AssessConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            taxonomy: TierTaxonomy::default(),
            retry: RetryPolicy::default(),
            snippet_budget: default_snippet_budget(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_snippet_budget(mut self, budget: usize) -> Self {
        self.snippet_budget = budget;
        self
    }
}
