//! Shared test doubles and fixtures.
//!
//! - [`MockBackend`]: scripted or function-driven `LlmBackend`
//! - [`StaticEvidenceSource`]: in-memory `EvidenceSource`
//! - [`fixtures`]: recorded MyVariant hits and canned model outputs

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tumorboard_evidence::{EvidenceError, EvidenceSource};
use tumorboard_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};

// ── Mock LLM backend ──────────────────────────────────────────────────────────

/// One scripted backend reply.
#[derive(Debug)]
pub enum MockReply {
    Text(String),
    Error(LlmError),
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        MockReply::Text(content.into())
    }

    pub fn error(err: LlmError) -> Self {
        MockReply::Error(err)
    }

    pub fn delayed(ms: u64, reply: MockReply) -> Self {
        MockReply::Delayed(Duration::from_millis(ms), Box::new(reply))
    }

    /// `reply` after a random delay in `0..max_ms`.
    pub fn jittered(max_ms: u64, reply: MockReply) -> Self {
        let ms = rand::thread_rng().gen_range(0..max_ms.max(1));
        Self::delayed(ms, reply)
    }
}

type Responder = dyn Fn(&LlmRequest) -> MockReply + Send + Sync;

/// `LlmBackend` that replays a script, or answers through a closure.
pub struct MockBackend {
    model: String,
    script: Mutex<VecDeque<MockReply>>,
    responder: Option<Box<Responder>>,
    calls: AtomicU32,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockBackend {
    /// Replies are consumed in order; once exhausted every call fails
    /// with a (transient) malformed-response error.
    pub fn new(script: Vec<MockReply>) -> Self {
        Self {
            model: "mock-model".to_string(),
            script: Mutex::new(script.into()),
            responder: None,
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request through `f`. Useful under concurrency, where
    /// call order is not deterministic.
    pub fn from_fn(f: impl Fn(&LlmRequest) -> MockReply + Send + Sync + 'static) -> Self {
        Self { responder: Some(Box::new(f)), ..Self::new(Vec::new()) }
    }

    /// Same text for every call.
    pub fn always(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::from_fn(move |_| MockReply::text(content.clone()))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, req: &LlmRequest) -> MockReply {
        match &self.responder {
            Some(f) => f(req),
            None => self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| MockReply::error(LlmError::MalformedResponse("mock script exhausted".into()))),
        }
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(req.clone());

        let mut reply = self.next_reply(&req);
        loop {
            match reply {
                MockReply::Delayed(d, inner) => {
                    tokio::time::sleep(d).await;
                    reply = *inner;
                }
                MockReply::Error(e) => return Err(e),
                MockReply::Text(content) => {
                    let prompt_tokens = req.messages.iter().map(|m| m.content.split_whitespace().count()).sum::<usize>() as u32;
                    let completion_tokens = content.split_whitespace().count() as u32;
                    return Ok(LlmResponse {
                        content,
                        model: req.model.clone().unwrap_or_else(|| self.model.clone()),
                        prompt_tokens,
                        completion_tokens,
                    });
                }
            }
        }
    }

    fn name(&self) -> &str { "mock" }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
}

/// `(gene, variant)` as rendered in the user prompt, for routing replies.
pub fn prompt_gene_variant(req: &LlmRequest) -> Option<(String, String)> {
    let user = req.messages.iter().rev().find(|m| m.role == "user")?;
    let field = |name: &str| {
        user.content
            .lines()
            .find_map(|l| l.strip_prefix(name))
            .map(|v| v.trim().to_string())
    };
    Some((field("Gene:")?, field("Variant:")?))
}

// ── Static evidence source ────────────────────────────────────────────────────

enum StaticEntry {
    Hit(Value),
    Failure(String),
}

/// In-memory `EvidenceSource`. Unknown variants are "not found".
#[derive(Default)]
pub struct StaticEvidenceSource {
    entries: HashMap<(String, String), StaticEntry>,
    lookups: AtomicU32,
}

impl StaticEvidenceSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(gene: &str, variant: &str) -> (String, String) {
        (gene.trim().to_uppercase(), variant.trim().to_uppercase())
    }

    pub fn with_hit(mut self, gene: &str, variant: &str, hit: Value) -> Self {
        self.entries.insert(Self::key(gene, variant), StaticEntry::Hit(hit));
        self
    }

    /// Lookups for this variant fail with a transport-level error.
    pub fn with_failure(mut self, gene: &str, variant: &str, message: &str) -> Self {
        self.entries.insert(Self::key(gene, variant), StaticEntry::Failure(message.to_string()));
        self
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvidenceSource for StaticEvidenceSource {
    async fn fetch_evidence(
        &self,
        gene: &str,
        variant: &str,
        _tumor_type: Option<&str>,
    ) -> Result<Option<Value>, EvidenceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.entries.get(&Self::key(gene, variant)) {
            Some(StaticEntry::Hit(v)) => Ok(Some(v.clone())),
            Some(StaticEntry::Failure(m)) => Err(EvidenceError::Api { status: 503, message: m.clone() }),
            None => Ok(None),
        }
    }

    fn name(&self) -> &str { "static" }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

pub mod fixtures {
    use serde_json::{json, Value};

    /// BRAF V600E as MyVariant returns it (trimmed).
    pub fn braf_v600e_hit() -> Value {
        json!({
            "_id": "chr7:g.140453136A>T",
            "hgvs": ["NM_004333.4:c.1799T>A", "NP_004324.2:p.Val600Glu"],
            "entrezgene": 673,
            "dbsnp": {"rsid": "rs113488022"},
            "cosmic": {"cosmic_id": "COSM476", "primary_site": "skin", "primary_histology": "malignant_melanoma"},
            "clinvar": {"variant_id": 13961, "clinical_significance": ["Pathogenic"], "conditions": [{"name": "Melanoma"}]},
            "civic": {
                "name": "V600E",
                "evidence_items": [
                    {
                        "evidence_level": "A",
                        "evidence_type": "Predictive",
                        "evidence_direction": "Supports",
                        "clinical_significance": "Sensitivity/Response",
                        "disease": {"name": "Melanoma"},
                        "drugs": [{"name": "Vemurafenib"}],
                        "source": {"name": "FDA label"}
                    },
                    {
                        "evidence_level": "A",
                        "evidence_type": "Predictive",
                        "clinical_significance": "Sensitivity/Response",
                        "disease": {"name": "Melanoma"},
                        "drugs": [{"name": "Dabrafenib"}, {"name": "Trametinib"}],
                        "source": {"name": "NCCN"}
                    }
                ]
            }
        })
    }

    /// BRAF V600E with only a COSMIC id and one FDA-level CIViC item.
    pub fn braf_v600e_cosmic_civic_only() -> Value {
        json!({
            "cosmic": {"cosmic_id": "COSM476"},
            "civic": {
                "evidence_items": [
                    {
                        "evidence_level": "A",
                        "evidence_type": "Predictive",
                        "clinical_significance": "Sensitivity/Response",
                        "description": "FDA-approved vemurafenib for BRAF V600E melanoma",
                        "disease": {"name": "Melanoma"},
                        "drugs": [{"name": "Vemurafenib"}],
                        "source": {"name": "FDA label"}
                    }
                ]
            }
        })
    }

    /// KRAS G12D, ClinVar and COSMIC only.
    pub fn kras_g12d_hit() -> Value {
        json!({
            "_id": "chr12:g.25398284C>T",
            "entrezgene": 3845,
            "cosmic": [{"cosmic_id": "COSM521", "primary_site": "pancreas", "sample_count": 4200}],
            "clinvar": {"variant_id": 12582, "clinical_significance": "Pathogenic"}
        })
    }

    /// Structured verdict as a model would return it.
    pub fn verdict_json(tier: &str, confidence: f64, summary: &str) -> String {
        json!({
            "tier": tier,
            "confidence": confidence,
            "summary": summary,
            "therapies": []
        })
        .to_string()
    }
}
