//! Confidence handling for model verdicts.
//!
//! Models report confidence inconsistently (0.85, "85%", 85, or not at all).
//! Everything is funnelled through here so the stored value is always in
//! [0.0, 1.0] and an omitted value is visibly marked as a default.

use crate::entities::ConfidenceSource;

/// Confidence applied when the model states none. Conservative: not zero
/// (the model did commit to a tier), not high.
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.3;

/// Normalise a raw confidence figure into [0.0, 1.0].
///
/// Values in (1, 100] are read as percentages. Non-finite values are
/// dropped. Anything else out of range is clamped.
pub fn normalise_confidence(raw: f64) -> Option<f64> {
    if !raw.is_finite() {
        return None;
    }
    let value = if raw > 1.0 && raw <= 100.0 { raw / 100.0 } else { raw };
    Some(value.clamp(0.0, 1.0))
}

/// Resolve the final confidence and record where it came from.
pub fn resolve_confidence(stated: Option<f64>) -> (f64, ConfidenceSource) {
    match stated.and_then(normalise_confidence) {
        Some(c) => (c, ConfidenceSource::Model),
        None    => (DEFAULT_CONFIDENCE_FLOOR, ConfidenceSource::DefaultFloor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_is_scaled() {
        assert_eq!(normalise_confidence(85.0), Some(0.85));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(normalise_confidence(-0.2), Some(0.0));
        assert_eq!(normalise_confidence(250.0), Some(1.0));
        assert_eq!(normalise_confidence(f64::NAN), None);
    }

    #[test]
    fn test_missing_confidence_uses_floor() {
        let (c, src) = resolve_confidence(None);
        assert_eq!(c, DEFAULT_CONFIDENCE_FLOOR);
        assert_eq!(src, ConfidenceSource::DefaultFloor);
        assert!(c > 0.0 && c < 0.5);
    }

    #[test]
    fn test_stated_confidence_is_kept() {
        let (c, src) = resolve_confidence(Some(0.92));
        assert!((c - 0.92).abs() < 1e-9);
        assert_eq!(src, ConfidenceSource::Model);
    }
}
