//! Model invocation with retry and audit.
//!
//! An attempt only counts as successful once its output parses into a
//! verdict, so garbled completions consume retry budget like a dropped
//! connection would.

use std::time::Instant;

use tracing::{debug, instrument};
use tumorboard_common::retry::retry_transient;
use tumorboard_common::{AssessmentError, RetryPolicy};
use tumorboard_llm::audit::LlmAuditEntry;
use tumorboard_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};

use crate::parser::{parse_verdict, ParsedVerdict};

/// A successful model call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub response: LlmResponse,
    pub verdict: ParsedVerdict,
    pub audit: LlmAuditEntry,
}

/// Send `request` to `backend`, retrying transient failures under `policy`.
///
/// Empty or unparseable completions are treated like an undecodable body:
/// transient. The final error is mapped to `AssessmentError::ModelInvocation`.
#[instrument(skip_all, fields(backend = backend.name(), model = request.model.as_deref().unwrap_or(backend.model_id())))]
pub async fn invoke(
    backend: &dyn LlmBackend,
    request: &LlmRequest,
    policy: &RetryPolicy,
) -> Result<Invocation, AssessmentError> {
    let started = Instant::now();

    let outcome = retry_transient("llm_complete", policy, LlmError::is_transient, || async move {
        let response = backend.complete(request.clone()).await?;
        if response.content.trim().is_empty() {
            return Err(LlmError::MalformedResponse("empty completion".to_string()));
        }
        let verdict = parse_verdict(&response.content)
            .map_err(|e| LlmError::MalformedResponse(format!("unparseable verdict: {e}")))?;
        Ok((response, verdict))
    })
    .await;

    match outcome {
        Ok(((response, verdict), attempts)) => {
            let model = request.model.clone().unwrap_or_else(|| response.model.clone());
            let audit = LlmAuditEntry::new(
                model,
                backend.name().to_string(),
                response.prompt_tokens,
                response.completion_tokens,
                attempts,
                &response.content,
                started.elapsed().as_millis() as u64,
            );
            audit.log();
            debug!(attempts, chars = response.content.len(), "Model responded");
            Ok(Invocation { response, verdict, audit })
        }
        Err(failure) => Err(AssessmentError::ModelInvocation {
            attempts: failure.attempts,
            transient: failure.transient,
            message: failure.error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumorboard_common::Tier;
    use tumorboard_llm::Message;
    use tumorboard_test_utils::{MockBackend, MockReply};

    fn request() -> LlmRequest {
        LlmRequest {
            messages: vec![Message::user("classify")],
            model: Some("test-model".to_string()),
            max_tokens: None,
            temperature: Some(0.0),
            json_mode: true,
        }
    }

    #[tokio::test]
    async fn test_success_records_audit() {
        let backend = MockBackend::new(vec![MockReply::text(r#"{"tier": "Tier I"}"#)]);
        let inv = invoke(&backend, &request(), &RetryPolicy::immediate(3)).await.unwrap();
        assert_eq!(inv.audit.attempts, 1);
        assert_eq!(inv.audit.model, "test-model");
        assert_eq!(inv.audit.output_hash.len(), 64);
        assert_eq!(inv.verdict.fields().tier, Tier::I);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let backend = MockBackend::new(vec![
            MockReply::error(LlmError::RateLimitExceeded),
            MockReply::text("Tier II"),
        ]);
        let inv = invoke(&backend, &request(), &RetryPolicy::immediate(3)).await.unwrap();
        assert_eq!(inv.audit.attempts, 2);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_responses_exhaust_budget() {
        let backend = MockBackend::new(vec![MockReply::text(""), MockReply::text("  "), MockReply::text("\n")]);
        let err = invoke(&backend, &request(), &RetryPolicy::immediate(3)).await.unwrap_err();
        assert_eq!(
            err,
            AssessmentError::ModelInvocation {
                attempts: 3,
                transient: true,
                message: "Malformed response: empty completion".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_garbled_output_is_retried_until_it_parses() {
        let backend = MockBackend::new(vec![
            MockReply::text(r#"{"tier": ??? garbled"#),
            MockReply::text(r#"{"tier": "Tier III", "confidence": 0.55}"#),
        ]);
        let inv = invoke(&backend, &request(), &RetryPolicy::immediate(3)).await.unwrap();
        assert_eq!(backend.calls(), 2);
        assert_eq!(inv.audit.attempts, 2);
        assert_eq!(inv.verdict.fields().tier, Tier::III);
    }

    #[tokio::test]
    async fn test_garbled_output_exhausts_budget() {
        let backend = MockBackend::always(r#"{"tier": ??? garbled"#);
        let err = invoke(&backend, &request(), &RetryPolicy::immediate(3)).await.unwrap_err();
        assert_eq!(backend.calls(), 3);
        match err {
            AssessmentError::ModelInvocation { attempts, transient, message } => {
                assert_eq!(attempts, 3);
                assert!(transient);
                assert!(message.starts_with("Malformed response: unparseable verdict"), "{message}");
            }
            other => panic!("expected ModelInvocation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let backend = MockBackend::new(vec![
            MockReply::error(LlmError::ApiError { status: 401, message: "bad key".into() }),
            MockReply::text("Tier I"),
        ]);
        let err = invoke(&backend, &request(), &RetryPolicy::immediate(3)).await.unwrap_err();
        assert!(matches!(err, AssessmentError::ModelInvocation { attempts: 1, transient: false, .. }));
        assert_eq!(backend.calls(), 1);
    }
}
