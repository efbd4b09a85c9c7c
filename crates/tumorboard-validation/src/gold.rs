//! Gold-standard datasets.
//!
//! Accepted on-disk shapes:
//!   `{"name": "...", "entries": [ {...}, ... ]}`
//!   `[ {...}, ... ]`  (named after the file stem)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use tumorboard_common::{Tier, VariantQuery};

#[derive(Error, Debug)]
pub enum GoldStandardError {
    #[error("cannot read gold standard {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("gold standard is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("gold standard must be an object with \"entries\" or an array of entries")]
    Shape,

    #[error("gold standard entry {index}: {message}")]
    Entry { index: usize, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldStandardEntry {
    pub gene: String,
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
    pub expected_tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl GoldStandardEntry {
    pub fn query(&self) -> VariantQuery {
        VariantQuery::new(self.gene.clone(), self.variant.clone(), self.tumor_type.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldStandard {
    pub name: String,
    pub entries: Vec<GoldStandardEntry>,
}

impl GoldStandard {
    pub fn new(name: impl Into<String>, entries: Vec<GoldStandardEntry>) -> Self {
        Self { name: name.into(), entries }
    }

    /// Load from a JSON file. A bare array takes the file stem as its name.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GoldStandardError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| GoldStandardError::Io { path: path.to_path_buf(), source })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "gold_standard".to_string());

        let gold = Self::from_json_str(&stem, &text)?;
        info!(name = %gold.name, entries = gold.entries.len(), path = %path.display(), "Loaded gold standard");
        Ok(gold)
    }

    /// Parse JSON text; `default_name` is used when the document has none.
    pub fn from_json_str(default_name: &str, text: &str) -> Result<Self, GoldStandardError> {
        let doc: Value = serde_json::from_str(text)?;

        let (name, raw_entries) = match &doc {
            Value::Array(items) => (default_name.to_string(), items),
            Value::Object(obj) => {
                let items = obj.get("entries").and_then(Value::as_array).ok_or(GoldStandardError::Shape)?;
                let name = obj
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(default_name);
                (name.to_string(), items)
            }
            _ => return Err(GoldStandardError::Shape),
        };

        let mut entries = Vec::with_capacity(raw_entries.len());
        for (index, raw) in raw_entries.iter().enumerate() {
            let entry: GoldStandardEntry = serde_json::from_value(raw.clone())
                .map_err(|e| GoldStandardError::Entry { index, message: e.to_string() })?;
            if entry.gene.trim().is_empty() || entry.variant.trim().is_empty() {
                return Err(GoldStandardError::Entry { index, message: "gene and variant are required".to_string() });
            }
            entries.push(entry);
        }

        Ok(Self { name, entries })
    }
}
