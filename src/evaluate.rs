use std::fmt;

use thiserror::Error;

use crate::data::model::FeatureRow;
use crate::metrics::{mean_absolute_error, MetricsError};
use crate::regression::{ModelError, Regressor};

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("{partition} partition is empty")]
    EmptyPartition { partition: &'static str },
    #[error("{partition} partition has {rows} feature rows but {targets} targets")]
    ShapeMismatch {
        partition: &'static str,
        rows: usize,
        targets: usize,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// Goodness of fit on both partitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationReport {
    pub r2_train: f64,
    pub r2_test: f64,
    pub mae_train: f64,
    pub mae_test: f64,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "R² train:  {:.3}", self.r2_train)?;
        writeln!(f, "R² test:   {:.3}", self.r2_test)?;
        writeln!(f, "MAE train: {:.3}", self.mae_train)?;
        write!(f, "MAE test:  {:.3}", self.mae_test)
    }
}

fn check_partition(
    partition: &'static str,
    x: &[FeatureRow],
    y: &[f64],
) -> Result<(), EvaluationError> {
    if x.len() != y.len() {
        return Err(EvaluationError::ShapeMismatch {
            partition,
            rows: x.len(),
            targets: y.len(),
        });
    }
    if x.is_empty() {
        return Err(EvaluationError::EmptyPartition { partition });
    }
    Ok(())
}

/// Score a fitted model on its training and held-out partitions.
pub fn evaluate<M: Regressor + ?Sized>(
    model: &M,
    x_train: &[FeatureRow],
    y_train: &[f64],
    x_test: &[FeatureRow],
    y_test: &[f64],
) -> Result<EvaluationReport, EvaluationError> {
    check_partition("train", x_train, y_train)?;
    check_partition("test", x_test, y_test)?;

    let r2_train = model.score(x_train, y_train)?;
    let r2_test = model.score(x_test, y_test)?;
    let mae_train = mean_absolute_error(y_train, &model.predict(x_train)?)?;
    let mae_test = mean_absolute_error(y_test, &model.predict(x_test)?)?;

    Ok(EvaluationReport {
        r2_train,
        r2_test,
        mae_train,
        mae_test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::{Estimator, MeanRegressor, ModelKind};

    fn rows(n: usize) -> Vec<FeatureRow> {
        (0..n).map(|i| [i as f64; 7]).collect()
    }

    #[test]
    fn constant_model_scores_by_the_standard_formula() {
        let y_train = [10.0, 20.0, 30.0];
        let y_test = [15.0, 25.0];
        let mut model = MeanRegressor::default();
        model.fit(&rows(3), &y_train).unwrap();

        let report = evaluate(&model, &rows(3), &y_train, &rows(2), &y_test).unwrap();
        // SS_res = 25 + 25, SS_tot = 25 + 25 around the test mean of 20
        assert_eq!(report.r2_test, 1.0 - 50.0 / 50.0);
        assert_eq!(report.mae_test, 5.0);
        assert_eq!(report.r2_train, 0.0);
        assert_eq!(report.mae_train, 20.0 / 3.0);
    }

    #[test]
    fn report_prints_three_decimals() {
        let report = EvaluationReport {
            r2_train: 0.81234,
            r2_test: 0.7,
            mae_train: 4.0006,
            mae_test: 5.0,
        };
        assert_eq!(
            report.to_string(),
            "R² train:  0.812\nR² test:   0.700\nMAE train: 4.001\nMAE test:  5.000"
        );
    }

    #[test]
    fn unfit_model_error_is_propagated() {
        let model = Estimator::new(ModelKind::Linear, 0.0);
        let err = evaluate(&model, &rows(2), &[1.0, 2.0], &rows(1), &[1.0]).unwrap_err();
        assert!(matches!(err, EvaluationError::Model(ModelError::NotFitted)));
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let mut model = MeanRegressor::default();
        model.fit(&rows(2), &[1.0, 2.0]).unwrap();
        let err = evaluate(&model, &rows(2), &[1.0, 2.0], &rows(3), &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::ShapeMismatch { partition: "test", rows: 3, targets: 1 }
        ));
        let err = evaluate(&model, &[], &[], &rows(1), &[1.0]).unwrap_err();
        assert!(matches!(err, EvaluationError::EmptyPartition { partition: "train" }));
    }
}
