/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Coefficient of determination `1 - SS_res / SS_tot` of `predicted`
/// against `observed`.
///
/// When the observations have no variance the score is `1.0` for a perfect
/// fit and `0.0` otherwise. Returns NaN for empty or mismatched inputs.
pub fn r2_score(observed: &[f64], predicted: &[f64]) -> f64 {
    if observed.is_empty() || observed.len() != predicted.len() {
        return f64::NAN;
    }
    let m = mean(observed);
    let ss_tot: f64 = observed.iter().map(|y| (y - m).powi(2)).sum();
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_prediction_scores_one() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(r2_score(&y, &y), 1.0);
    }

    #[test]
    fn predicting_the_mean_scores_zero() {
        let y = [1.0, 2.0, 3.0];
        assert!(r2_score(&y, &[2.0, 2.0, 2.0]).abs() < 1e-12);
    }

    #[test]
    fn known_value_matches_hand_computation() {
        // SS_tot = 2, SS_res = 0.25 + 0 + 0.25
        let r2 = r2_score(&[1.0, 2.0, 3.0], &[1.5, 2.0, 2.5]);
        assert!((r2 - 0.75).abs() < 1e-12);
    }

    #[test]
    fn constant_observations_use_the_degenerate_convention() {
        assert_eq!(r2_score(&[4.0], &[4.0]), 1.0);
        assert_eq!(r2_score(&[4.0, 4.0], &[4.0, 5.0]), 0.0);
    }

    #[test]
    fn empty_input_is_nan() {
        assert!(r2_score(&[], &[]).is_nan());
        assert!(mean(&[]).is_nan());
        assert_eq!(mean(&[1.0, 3.0]), 2.0);
    }
}
