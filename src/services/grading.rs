/// Every result is normalized to this scale before weighting.
pub(crate) const GRADE_SCALE: f64 = 20.0;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ScoreInput {
    pub(crate) score: Option<f64>,
    pub(crate) max_score: i32,
    pub(crate) coefficient: i32,
}

/// Coefficient-weighted average of a student's results on the 0-20 scale.
///
/// Results without a numeric score yet are skipped, as are rows whose
/// max_score or coefficient would make the term meaningless. A student with
/// no qualifying results averages 0 rather than NaN.
pub(crate) fn weighted_average(results: &[ScoreInput]) -> f64 {
    let mut weighted_total = 0.0;
    let mut coefficient_total: i64 = 0;

    for result in results {
        let Some(score) = result.score else {
            continue;
        };
        if result.max_score < 1 || result.coefficient < 1 {
            continue;
        }

        let normalized = score / f64::from(result.max_score) * GRADE_SCALE;
        weighted_total += normalized * f64::from(result.coefficient);
        coefficient_total += i64::from(result.coefficient);
    }

    if coefficient_total == 0 {
        return 0.0;
    }

    weighted_total / coefficient_total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded(score: f64, max_score: i32, coefficient: i32) -> ScoreInput {
        ScoreInput { score: Some(score), max_score, coefficient }
    }

    #[test]
    fn no_results_average_zero() {
        assert_eq!(weighted_average(&[]), 0.0);
    }

    #[test]
    fn ungraded_results_average_zero() {
        let results = [ScoreInput { score: None, max_score: 20, coefficient: 3 }];
        assert_eq!(weighted_average(&results), 0.0);
    }

    #[test]
    fn equal_coefficients_average_plainly() {
        let results = [graded(8.0, 20, 1), graded(16.0, 20, 1)];
        assert_eq!(weighted_average(&results), 12.0);
    }

    #[test]
    fn coefficients_weight_the_average() {
        // (10/20*20*2 + 18/20*20*3) / 5 = (20 + 54) / 5
        let results = [graded(10.0, 20, 2), graded(18.0, 20, 3)];
        assert_eq!(weighted_average(&results), 14.8);
    }

    #[test]
    fn insertion_order_is_irrelevant() {
        let forward = [graded(10.0, 20, 2), graded(18.0, 20, 3), graded(7.5, 10, 1)];
        let reverse = [graded(7.5, 10, 1), graded(18.0, 20, 3), graded(10.0, 20, 2)];
        assert_eq!(weighted_average(&forward), weighted_average(&reverse));
    }

    #[test]
    fn zero_max_score_rows_are_excluded() {
        let results = [graded(10.0, 0, 2), graded(16.0, 20, 1)];
        assert_eq!(weighted_average(&results), 16.0);
    }

    #[test]
    fn other_scales_normalize_to_twenty() {
        let results = [graded(50.0, 100, 1)];
        assert_eq!(weighted_average(&results), 10.0);
    }
}
