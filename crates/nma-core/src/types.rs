//! Common data types for nma

use serde::{Deserialize, Serialize};

/// Scale on which pairwise treatment effects are estimated.
///
/// All estimation happens on an additive scale; [`EffectMeasure::back_transform`]
/// maps a value on that scale to the one reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMeasure {
    /// Odds ratio, estimated as a log odds ratio.
    OddsRatio,
    /// Difference of means, estimated directly.
    MeanDifference,
}

impl EffectMeasure {
    /// Map an additive-scale value to the reporting scale (`exp` for odds ratios).
    #[inline]
    pub fn back_transform(self, x: f64) -> f64 {
        match self {
            EffectMeasure::OddsRatio => x.exp(),
            EffectMeasure::MeanDifference => x,
        }
    }

    /// Value on the reporting scale that means "no difference".
    pub fn null_value(self) -> f64 {
        self.back_transform(0.0)
    }

    /// Short label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            EffectMeasure::OddsRatio => "OR",
            EffectMeasure::MeanDifference => "MD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_transform() {
        assert_eq!(EffectMeasure::MeanDifference.back_transform(-1.5), -1.5);
        assert!((EffectMeasure::OddsRatio.back_transform(2.0_f64.ln()) - 2.0).abs() < 1e-12);
        assert_eq!(EffectMeasure::OddsRatio.null_value(), 1.0);
        assert_eq!(EffectMeasure::MeanDifference.null_value(), 0.0);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&EffectMeasure::OddsRatio).unwrap();
        assert_eq!(json, "\"odds_ratio\"");
        let m: EffectMeasure = serde_json::from_str("\"mean_difference\"").unwrap();
        assert_eq!(m, EffectMeasure::MeanDifference);
    }
}
