//! Verdict parsing.
//!
//! Two paths, tried in order:
//!   1. Structured: strip code fences, locate the outermost JSON object,
//!      read `tier` / `confidence` / `summary` / `therapies`.
//!   2. Heuristic: regex recovery of `Tier <I-IV|1-4>` and an optional
//!      `confidence` figure from free text.
//!
//! A tier is never guessed. If neither path finds one, parsing fails.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tumorboard_common::Tier;

/// Heuristic summaries are the raw text, bounded.
const MAX_SUMMARY_CHARS: usize = 2000;

lazy_static! {
    static ref RE_FENCE: Regex =
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("static regex");
    static ref RE_TIER: Regex =
        Regex::new(r"(?i)\btier\s*[-:_]?\s*(IV|III|II|I|4|3|2|1)\b").expect("static regex");
    static ref RE_CONFIDENCE: Regex =
        Regex::new(r#"(?i)\bconfidence\b"?\s*(?:score|level)?\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(%)?"#)
            .expect("static regex");
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerdictFields {
    pub tier: Tier,
    /// As stated by the model (percent signs already applied). Range
    /// normalisation and the default floor happen in the engine.
    pub confidence: Option<f64>,
    pub summary: String,
    pub therapies: BTreeSet<String>,
}

/// Parsed verdict, tagged with the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedVerdict {
    Structured(VerdictFields),
    Heuristic(VerdictFields),
}

impl ParsedVerdict {
    pub fn fields(&self) -> &VerdictFields {
        match self {
            ParsedVerdict::Structured(f) | ParsedVerdict::Heuristic(f) => f,
        }
    }

    pub fn into_fields(self) -> VerdictFields {
        match self {
            ParsedVerdict::Structured(f) | ParsedVerdict::Heuristic(f) => f,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ParsedVerdict::Structured(_))
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum VerdictParseError {
    #[error("empty model output")]
    Empty,
    #[error("no tier label found in model output: {0:?}")]
    NoTier(String),
}

/// Parse raw model output into a verdict.
pub fn parse_verdict(raw: &str) -> Result<ParsedVerdict, VerdictParseError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(VerdictParseError::Empty);
    }

    if let Some(fields) = extract_json(text).as_ref().and_then(structured_fields) {
        return Ok(ParsedVerdict::Structured(fields));
    }

    heuristic_fields(text)
        .map(ParsedVerdict::Heuristic)
        .ok_or_else(|| VerdictParseError::NoTier(text.chars().take(120).collect()))
}

/// The outermost `{...}` in the fenced block (if any) or the whole text.
fn extract_json(text: &str) -> Option<Value> {
    let body = RE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&body[start..=end])
        .ok()
        .filter(Value::is_object)
}

fn structured_fields(obj: &Value) -> Option<VerdictFields> {
    let tier = match &obj["tier"] {
        Value::String(s) => Tier::parse_label(s),
        Value::Number(n) => Tier::parse_label(&n.to_string()),
        _ => None,
    }?;

    let confidence = match &obj["confidence"] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_confidence_str(s),
        _ => None,
    };

    let summary = ["summary", "rationale", "reasoning", "explanation"]
        .iter()
        .find_map(|k| obj[*k].as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let mut therapies = BTreeSet::new();
    for key in ["therapies", "recommended_therapies"] {
        if let Some(list) = obj[key].as_array() {
            for t in list {
                let name = t.as_str().or_else(|| t["name"].as_str()).map(str::trim);
                if let Some(name) = name.filter(|n| !n.is_empty()) {
                    therapies.insert(name.to_string());
                }
            }
        }
    }

    Some(VerdictFields { tier, confidence, summary, therapies })
}

/// "0.85", "85%", "85 %".
fn parse_confidence_str(s: &str) -> Option<f64> {
    let s = s.trim();
    match s.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok().map(|v| v / 100.0),
        None => s.parse().ok(),
    }
}

fn heuristic_fields(text: &str) -> Option<VerdictFields> {
    let caps = RE_TIER.captures(text)?;
    let tier = Tier::parse_label(caps.get(1)?.as_str())?;

    let confidence = RE_CONFIDENCE.captures(text).and_then(|c| {
        let value: f64 = c.get(1)?.as_str().parse().ok()?;
        Some(if c.get(2).is_some() { value / 100.0 } else { value })
    });

    Some(VerdictFields {
        tier,
        confidence,
        summary: text.chars().take(MAX_SUMMARY_CHARS).collect(),
        therapies: BTreeSet::new(),
    })
}
