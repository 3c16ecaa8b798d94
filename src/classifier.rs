use crate::models::Severity;

pub const MIN_REQUIRED_LEVEL: i32 = 1;
pub const MAX_REQUIRED_LEVEL: i32 = 4;

/// Shortfall (in proficiency tiers) at which a gap becomes critical.
pub const CRITICAL_SHORTFALL: i32 = 2;

/// Normalizes a (required, achieved) pair: an unanswered skill counts as 0, the required level
/// is clamped into `1..=4` and the achieved score to be non-negative.
pub fn clamp_inputs(required_level: i32, achieved_score: Option<i32>) -> (i32, i32) {
    (
        required_level.clamp(MIN_REQUIRED_LEVEL, MAX_REQUIRED_LEVEL),
        achieved_score.unwrap_or(0).max(0),
    )
}

/// Classifies the gap between a required level and an achieved score.
///
/// Out-of-range inputs are clamped by [`clamp_inputs`] instead of rejected.
pub fn classify(required_level: i32, achieved_score: Option<i32>) -> Severity {
    let (required, achieved) = clamp_inputs(required_level, achieved_score);

    match required - achieved {
        shortfall if shortfall >= CRITICAL_SHORTFALL => Severity::Critical,
        1 => Severity::Moderate,
        _ => Severity::NoGap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_follow_shortfall() {
        assert_eq!(classify(3, Some(4)), Severity::NoGap);
        assert_eq!(classify(3, Some(3)), Severity::NoGap);
        assert_eq!(classify(3, Some(2)), Severity::Moderate);
        assert_eq!(classify(3, Some(1)), Severity::Critical);
    }

    #[test]
    fn unanswered_is_worst_case() {
        assert_eq!(classify(4, None), Severity::Critical);
        assert_eq!(classify(1, None), Severity::Moderate);
    }

    #[test]
    fn met_or_exceeded_is_always_no_gap() {
        for required in 1..=4 {
            for achieved in 0..=5 {
                let severity = classify(required, Some(achieved));
                if achieved >= required {
                    assert_eq!(severity, Severity::NoGap, "{required}/{achieved}");
                } else if required - achieved == 1 {
                    assert_eq!(severity, Severity::Moderate, "{required}/{achieved}");
                } else {
                    assert_eq!(severity, Severity::Critical, "{required}/{achieved}");
                }
            }
        }
    }

    #[test]
    fn clamp_inputs_bounds_both_values() {
        assert_eq!(clamp_inputs(9, Some(-7)), (4, 0));
        assert_eq!(clamp_inputs(0, None), (1, 0));
        assert_eq!(clamp_inputs(3, Some(5)), (3, 5));
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        // required 9 behaves like 4, required -3 like 1
        assert_eq!(classify(9, Some(3)), Severity::Moderate);
        assert_eq!(classify(-3, Some(1)), Severity::NoGap);
        // negative scores behave like 0
        assert_eq!(classify(1, Some(-7)), Severity::Moderate);
        assert_eq!(classify(2, Some(-1)), Severity::Critical);
    }
}
