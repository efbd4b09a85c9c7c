//! MyVariant.info client.
//!
//! MyVariant aggregates variant annotations from CIViC, ClinVar, COSMIC,
//! dbSNP and others behind a single query endpoint.
//!
//! API docs: https://docs.myvariant.info/en/latest/doc/variant_query_service.html
//! Endpoint: https://myvariant.info/v1/query
//!
//! The free-text query is tried in three forms, most specific first:
//!   1. `BRAF p.V600E`
//!   2. `BRAF:V600E`
//!   3. `BRAF V600E`
//! The first form that returns hits wins and its first hit is returned as-is;
//! parsing happens later in the normaliser.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};
use tumorboard_common::retry::retry_transient;
use tumorboard_common::RetryPolicy;

use super::{EvidenceError, EvidenceSource};
use crate::normalise::hgvs::protein_query_form;

const MYVARIANT_API_URL: &str = "https://myvariant.info/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const QUERY_FIELDS: &str = "civic,clinvar,cosmic,dbsnp,cadd,entrezgene,hgvs";

pub struct MyVariantClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl MyVariantClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: MYVARIANT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Query strings in the order they are tried.
    pub fn query_strategies(gene: &str, variant: &str) -> [String; 3] {
        let gene = gene.trim();
        let variant = variant.trim();
        [
            format!("{gene} {}", protein_query_form(variant)),
            format!("{gene}:{variant}"),
            format!("{gene} {variant}"),
        ]
    }

    /// One GET against `/query`, retried on transient failures.
    async fn query(&self, q: &str) -> Result<Value, EvidenceError> {
        let url = format!("{}/query", self.base_url.trim_end_matches('/'));
        let url = url.as_str();

        let result = retry_transient(
            "myvariant_query",
            &self.retry,
            EvidenceError::is_transient,
            || async move {
                let resp = self.client
                    .get(url)
                    .query(&[("q", q), ("fields", QUERY_FIELDS)])
                    .timeout(self.timeout)
                    .send()
                    .await?;
                let status = resp.status().as_u16();
                let text = resp.text().await?;
                parse_response(status, &text)
            },
        )
        .await;

        result.map(|(body, _attempts)| body).map_err(|failure| failure.error)
    }
}

impl Default for MyVariantClient {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl EvidenceSource for MyVariantClient {
    #[instrument(skip(self), fields(source = "myvariant"))]
    async fn fetch_evidence(
        &self,
        gene: &str,
        variant: &str,
        _tumor_type: Option<&str>,
    ) -> Result<Option<Value>, EvidenceError> {
        // MyVariant has no tumour-type filter; relevance is left to the model.
        for q in Self::query_strategies(gene, variant) {
            let body = self.query(&q).await?;
            if let Some(hit) = first_hit(&body) {
                debug!(query = %q, "MyVariant hit");
                return Ok(Some(hit.clone()));
            }
            debug!(query = %q, "No MyVariant hits");
        }
        Ok(None)
    }

    fn name(&self) -> &str { "myvariant" }
}

/// Status + body → JSON, mapping HTTP errors and in-body `error` fields.
fn parse_response(status: u16, text: &str) -> Result<Value, EvidenceError> {
    if status >= 400 {
        let message = serde_json::from_str::<Value>(text)
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string))
            .unwrap_or_else(|| text.chars().take(200).collect());
        return Err(EvidenceError::Api { status, message });
    }

    let body: Value = serde_json::from_str(text)
        .map_err(|e| EvidenceError::Malformed(e.to_string()))?;

    if let Some(err) = body.get("error") {
        let message = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        return Err(EvidenceError::Api { status, message });
    }
    Ok(body)
}

/// First object in `hits`, if `total` is non-zero.
fn first_hit(body: &Value) -> Option<&Value> {
    if body["total"].as_u64() == Some(0) {
        return None;
    }
    body["hits"].as_array()?.iter().find(|h| h.is_object())
}
