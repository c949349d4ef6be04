use serde::{Deserialize, Serialize};

use crate::domain::Scores;

/// Composite score of one rating: the arithmetic mean of the criteria the
/// rating actually scored. Criteria absent from the map do not count as zero,
/// and values are not clamped to `0..=10`.
pub fn composite(scores: &Scores) -> Result<f64, ScoreError> {
    if scores.is_empty() {
        return Err(ScoreError::EmptyScores);
    }

    let total: f64 = scores.values().sum();
    Ok(total / scores.len() as f64)
}

/// Rejects score maps that cannot produce a composite.
pub fn ensure_scored(scores: &Scores) -> Result<(), ScoreError> {
    composite(scores).map(|_| ())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("a rating must score at least one criterion")]
    EmptyScores,
}

/// Precision applied when a full-precision value is shown to people.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayPrecision {
    #[default]
    Tenths,
    Whole,
}

impl DisplayPrecision {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Tenths => round_half_away(value, 1),
            Self::Whole => round_half_away(value, 0),
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tenths" | "one_decimal" | "1" => Some(Self::Tenths),
            "whole" | "integer" | "0" => Some(Self::Whole),
            _ => None,
        }
    }
}

/// Round to `decimals` places with ties going away from zero.
pub fn round_half_away(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CriterionId;

    fn scores(pairs: &[(&str, f64)]) -> Scores {
        pairs
            .iter()
            .map(|(id, value)| (CriterionId::new(*id), *value))
            .collect()
    }

    #[test]
    fn composite_is_mean_of_present_criteria() {
        let value = composite(&scores(&[("food", 8.0), ("service", 6.0)])).expect("scored");
        assert!((value - 7.0).abs() < f64::EPSILON);

        let single = composite(&scores(&[("food", 10.0)])).expect("scored");
        assert!((single - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn composite_ignores_insertion_order() {
        let forward = composite(&scores(&[("a", 1.3), ("b", 7.7), ("c", 4.1)])).expect("scored");
        let backward = composite(&scores(&[("c", 4.1), ("b", 7.7), ("a", 1.3)])).expect("scored");
        assert_eq!(forward, backward);
    }

    #[test]
    fn composite_does_not_clamp_out_of_range_values() {
        let value = composite(&scores(&[("food", 14.0), ("service", 10.0)])).expect("scored");
        assert!((value - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_scores_are_rejected() {
        assert_eq!(composite(&Scores::new()), Err(ScoreError::EmptyScores));
        assert!(ensure_scored(&Scores::new()).is_err());
    }

    #[test]
    fn display_precision_rounds_half_away_from_zero() {
        assert_eq!(DisplayPrecision::Tenths.apply(7.25), 7.3);
        assert_eq!(DisplayPrecision::Tenths.apply(6.666_666), 6.7);
        assert_eq!(DisplayPrecision::Whole.apply(7.5), 8.0);
        assert_eq!(DisplayPrecision::Whole.apply(-2.5), -3.0);
        assert_eq!(DisplayPrecision::Whole.apply(7.49), 7.0);
    }

    #[test]
    fn parses_configured_precision_names() {
        assert_eq!(DisplayPrecision::parse("Whole"), Some(DisplayPrecision::Whole));
        assert_eq!(DisplayPrecision::parse("tenths"), Some(DisplayPrecision::Tenths));
        assert_eq!(DisplayPrecision::parse("hundredths"), None);
    }
}
