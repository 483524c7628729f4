use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{check_training_data, ModelError, Regressor};
use crate::data::model::{FeatureRow, N_FEATURES};

// ---------------------------------------------------------------------------
// StandardScaler
// ---------------------------------------------------------------------------

/// Per-column standardization, `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: FeatureRow,
    /// Population standard deviation; constant columns get 1.0.
    pub scale: FeatureRow,
}

impl StandardScaler {
    pub fn fit(x: &[FeatureRow]) -> Self {
        let n = x.len() as f64;
        let mut mean = [0.0; N_FEATURES];
        for row in x {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut scale = [0.0; N_FEATURES];
        for row in x {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m) * (v - m);
            }
        }
        for s in scale.iter_mut() {
            let sd = (*s / n).sqrt();
            *s = if sd > 0.0 && sd.is_finite() { sd } else { 1.0 };
        }
        Self { mean, scale }
    }

    pub fn transform(&self, row: &FeatureRow) -> FeatureRow {
        let mut out = *row;
        for ((v, m), s) in out.iter_mut().zip(&self.mean).zip(&self.scale) {
            *v = (*v - m) / s;
        }
        out
    }
}

// ---------------------------------------------------------------------------
// LinearPipeline: scaler + (ridge) least squares
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedLinear {
    pub scaler: StandardScaler,
    pub intercept: f64,
    /// Coefficients on the standardized features.
    pub coefficients: FeatureRow,
}

/// Standardize, then fit `y = b0 + Σ b_j z_j` by least squares.
///
/// `alpha > 0` adds a ridge penalty on every coefficient except the intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPipeline {
    pub alpha: f64,
    pub fitted: Option<FittedLinear>,
}

impl LinearPipeline {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            fitted: None,
        }
    }

    fn predict_row(fitted: &FittedLinear, row: &FeatureRow) -> f64 {
        let z = fitted.scaler.transform(row);
        fitted.intercept
            + z.iter()
                .zip(&fitted.coefficients)
                .map(|(zj, bj)| zj * bj)
                .sum::<f64>()
    }
}

/// Solve a least squares problem using SVD, loosening the tolerance if needed.
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }
    None
}

impl Regressor for LinearPipeline {
    fn fit(&mut self, x: &[FeatureRow], y: &[f64]) -> Result<(), ModelError> {
        check_training_data(x, y)?;
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "ridge alpha must be non-negative, got {}",
                self.alpha
            )));
        }

        let scaler = StandardScaler::fit(x);
        let n = x.len();
        let penalty_rows = if self.alpha > 0.0 { N_FEATURES } else { 0 };
        let cols = N_FEATURES + 1;

        let mut design = DMatrix::<f64>::zeros(n + penalty_rows, cols);
        let mut target = DVector::<f64>::zeros(n + penalty_rows);
        for (i, (row, yi)) in x.iter().zip(y).enumerate() {
            design[(i, 0)] = 1.0;
            for (j, zj) in scaler.transform(row).iter().enumerate() {
                design[(i, j + 1)] = *zj;
            }
            target[i] = *yi;
        }
        let root_alpha = self.alpha.sqrt();
        for j in 0..penalty_rows {
            design[(n + j, j + 1)] = root_alpha;
        }

        let beta = solve_least_squares(&design, &target).ok_or(ModelError::Singular)?;
        let mut coefficients = [0.0; N_FEATURES];
        for (j, c) in coefficients.iter_mut().enumerate() {
            *c = beta[j + 1];
        }
        log::debug!("linear fit: intercept {:.4}, coefficients {coefficients:?}", beta[0]);

        self.fitted = Some(FittedLinear {
            scaler,
            intercept: beta[0],
            coefficients,
        });
        Ok(())
    }

    fn predict(&self, x: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(x.iter().map(|row| Self::predict_row(fitted, row)).collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn synthetic(n: usize) -> (Vec<FeatureRow>, Vec<f64>) {
        let x: Vec<FeatureRow> = (0..n)
            .map(|i| {
                let t = i as f64;
                [
                    200.0 + 7.0 * t,
                    (t * 13.0) % 50.0,
                    (t * 29.0) % 40.0,
                    150.0 + (t * 17.0) % 60.0,
                    (t * 3.0) % 10.0,
                    900.0 + (t * 11.0) % 100.0,
                    700.0 + (t * 19.0) % 90.0,
                ]
            })
            .collect();
        let y = x
            .iter()
            .map(|r| 5.0 + 0.1 * r[0] + 0.05 * r[1] - 0.2 * r[3] + 0.8 * r[4])
            .collect();
        (x, y)
    }

    #[test]
    fn scaler_standardizes_columns() {
        let x = vec![[1.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0], [3.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0]];
        let scaler = StandardScaler::fit(&x);
        assert_eq!(scaler.mean[0], 2.0);
        assert_eq!(scaler.scale[0], 1.0);
        assert_eq!(scaler.scale[1], 1.0);
        assert_eq!(scaler.transform(&x[0])[0], -1.0);
        assert_eq!(scaler.transform(&x[1])[1], 0.0);
    }

    #[test]
    fn recovers_exact_linear_relationship() {
        let (x, y) = synthetic(40);
        let mut model = LinearPipeline::new(0.0);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(&y) {
            assert_abs_diff_eq!(p, t, epsilon = 1e-8);
        }
        assert_abs_diff_eq!(model.score(&x, &y).unwrap(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn ridge_shrinks_coefficients() {
        let (x, y) = synthetic(40);
        let mut plain = LinearPipeline::new(0.0);
        let mut ridge = LinearPipeline::new(50.0);
        plain.fit(&x, &y).unwrap();
        ridge.fit(&x, &y).unwrap();
        let norm = |m: &LinearPipeline| {
            m.fitted
                .as_ref()
                .unwrap()
                .coefficients
                .iter()
                .map(|c| c * c)
                .sum::<f64>()
        };
        assert!(norm(&ridge) < norm(&plain));
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = LinearPipeline::new(0.0);
        assert!(matches!(model.predict(&[[0.0; N_FEATURES]]), Err(ModelError::NotFitted)));
        assert!(matches!(model.score(&[[0.0; N_FEATURES]], &[1.0]), Err(ModelError::NotFitted)));
    }

    #[test]
    fn negative_alpha_is_rejected() {
        let (x, y) = synthetic(10);
        let mut model = LinearPipeline::new(-1.0);
        assert!(matches!(model.fit(&x, &y), Err(ModelError::InvalidParameter(_))));
    }
}
