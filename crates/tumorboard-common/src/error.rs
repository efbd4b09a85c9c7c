use serde::{Serialize, Serializer};
use thiserror::Error;

/// Run-level errors. Any of these aborts the whole invocation.
#[derive(Debug, Error)]
pub enum TumorboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TumorboardError>;

/// Per-item failure of one assessment. Captured next to the item in batch
/// and validation runs; never aborts sibling items.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AssessmentError {
    #[error("Evidence fetch failed: {0}")]
    EvidenceFetch(String),

    #[error("Model invocation failed after {attempts} attempt(s): {message}")]
    ModelInvocation {
        attempts: u32,
        /// Whether the last failure was transient (retries exhausted)
        /// rather than fatal on first sight.
        transient: bool,
        message: String,
    },

    #[error("Could not parse a verdict from model output: {0}")]
    VerdictParse(String),

    #[error("Cancelled before completion")]
    Cancelled,
}

impl AssessmentError {
    /// Short machine-readable kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AssessmentError::EvidenceFetch(_)       => "evidence_fetch",
            AssessmentError::ModelInvocation { .. } => "model_invocation",
            AssessmentError::VerdictParse(_)        => "verdict_parse",
            AssessmentError::Cancelled              => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AssessmentError::Cancelled)
    }
}

impl Serialize for AssessmentError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("AssessmentError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let errs = [
            AssessmentError::EvidenceFetch("down".into()),
            AssessmentError::ModelInvocation { attempts: 3, transient: true, message: "503".into() },
            AssessmentError::VerdictParse("no tier".into()),
            AssessmentError::Cancelled,
        ];
        let mut kinds: Vec<_> = errs.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), 4);
    }

    #[test]
    fn test_serializes_kind_and_message() {
        let err = AssessmentError::ModelInvocation { attempts: 3, transient: true, message: "HTTP 503".into() };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "model_invocation");
        assert!(json["message"].as_str().unwrap().contains("3 attempt(s)"));
    }
}
