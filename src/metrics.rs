use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("cannot score an empty series")]
    Empty,
    #[error("length mismatch: {y_true} true values vs {y_pred} predictions")]
    LengthMismatch { y_true: usize, y_pred: usize },
}

fn check(y_true: &[f64], y_pred: &[f64]) -> Result<(), MetricsError> {
    if y_true.len() != y_pred.len() {
        return Err(MetricsError::LengthMismatch {
            y_true: y_true.len(),
            y_pred: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(MetricsError::Empty);
    }
    Ok(())
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// A constant `y_true` scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64, MetricsError> {
    check(y_true, y_pred)?;
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot = y_true
        .iter()
        .map(|y| {
            let d = y - mean;
            d * d
        })
        .sum::<f64>();
    let ss_res = y_true
        .iter()
        .zip(y_pred)
        .map(|(y, p)| {
            let d = y - p;
            d * d
        })
        .sum::<f64>();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64, MetricsError> {
    check(y_true, y_pred)?;
    let total = y_true
        .iter()
        .zip(y_pred)
        .map(|(y, p)| (y - p).abs())
        .sum::<f64>();
    Ok(total / y_true.len() as f64)
}

/// Mean of `|v - target|` over `values`; NaN for an empty series.
pub fn mean_absolute_target_deviation(values: &[f64], target: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().map(|v| (v - target).abs()).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn r2_of_perfect_fit_is_one() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(r2_score(&y, &y).unwrap(), 1.0);
    }

    #[test]
    fn r2_of_mean_predictor_is_zero() {
        assert_eq!(r2_score(&[15.0, 25.0], &[20.0, 20.0]).unwrap(), 0.0);
    }

    #[test]
    fn r2_matches_hand_computation() {
        // mean 2, SS_tot = 2, SS_res = 0.25 + 0 + 0.25
        let r2 = r2_score(&[1.0, 2.0, 3.0], &[1.5, 2.0, 2.5]).unwrap();
        assert_abs_diff_eq!(r2, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn r2_with_constant_truth() {
        assert_eq!(r2_score(&[4.0, 4.0], &[4.0, 4.0]).unwrap(), 1.0);
        assert_eq!(r2_score(&[4.0, 4.0], &[3.0, 4.0]).unwrap(), 0.0);
    }

    #[test]
    fn mae_is_mean_of_absolute_errors() {
        assert_eq!(mean_absolute_error(&[15.0, 25.0], &[20.0, 20.0]).unwrap(), 5.0);
        assert_eq!(mean_absolute_error(&[1.0, -1.0, 0.0], &[0.0, 0.0, 3.0]).unwrap(), 5.0 / 3.0);
    }

    #[test]
    fn metrics_reject_bad_shapes() {
        assert_eq!(r2_score(&[], &[]), Err(MetricsError::Empty));
        assert_eq!(
            mean_absolute_error(&[1.0], &[1.0, 2.0]),
            Err(MetricsError::LengthMismatch { y_true: 1, y_pred: 2 })
        );
    }

    #[test]
    fn target_deviation_guards_empty_input() {
        assert!(mean_absolute_target_deviation(&[], 40.0).is_nan());
        assert_eq!(mean_absolute_target_deviation(&[38.0, 44.0], 40.0), 3.0);
    }
}
