//! Evidence source clients.

pub mod myvariant;

pub use myvariant::MyVariantClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Evidence API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed evidence response: {0}")]
    Malformed(String),
}

impl EvidenceError {
    /// Timeouts, connection failures and 408/429/5xx are worth retrying.
    /// An error reported inside a 200 body is not.
    pub fn is_transient(&self) -> bool {
        match self {
            EvidenceError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.as_u16() == 408 || s.as_u16() == 429 || s.is_server_error())
            }
            EvidenceError::Api { status, .. } => matches!(*status, 408 | 429) || (500..600).contains(status),
            EvidenceError::Malformed(_) => false,
        }
    }
}

/// Common interface for variant evidence providers.
///
/// `Ok(None)` means the source answered and knows nothing about the
/// variant; that is a normal outcome, not an error.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn fetch_evidence(
        &self,
        gene: &str,
        variant: &str,
        tumor_type: Option<&str>,
    ) -> Result<Option<Value>, EvidenceError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_classification() {
        let busy = EvidenceError::Api { status: 503, message: "down".into() };
        let limited = EvidenceError::Api { status: 429, message: "slow down".into() };
        let bad = EvidenceError::Api { status: 400, message: "bad query".into() };
        assert!(busy.is_transient());
        assert!(limited.is_transient());
        assert!(!bad.is_transient());
        assert!(!EvidenceError::Malformed("x".into()).is_transient());
    }
}
