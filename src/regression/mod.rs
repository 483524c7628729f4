/// Regression estimators behind one `fit` / `predict` / `score` contract,
/// plus JSON persistence of fitted models.
pub mod linear;

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::model::{FeatureRow, FEATURE_NAMES};
use crate::metrics::{r2_score, MetricsError};
pub use linear::LinearPipeline;

/// Bumped whenever the saved model layout changes.
const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model has not been fit")]
    NotFitted,
    #[error("cannot fit a model on zero rows")]
    Empty,
    #[error("{rows} feature rows but {targets} targets")]
    ShapeMismatch { rows: usize, targets: usize },
    #[error("training data contains a non-finite value")]
    NonFinite,
    #[error("least squares system could not be solved")]
    Singular,
    #[error("invalid model parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("failed to read or write model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse JSON model file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model file version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("model was trained on features {found:?}, expected {expected:?}")]
    FeatureMismatch {
        found: Vec<String>,
        expected: Vec<String>,
    },
}

/// A trainable regressor over mix-feature rows.
pub trait Regressor {
    fn fit(&mut self, x: &[FeatureRow], y: &[f64]) -> Result<(), ModelError>;

    fn predict(&self, x: &[FeatureRow]) -> Result<Vec<f64>, ModelError>;

    fn is_fitted(&self) -> bool;

    /// Coefficient of determination of `predict(x)` against `y`.
    fn score(&self, x: &[FeatureRow], y: &[f64]) -> Result<f64, ModelError> {
        if x.len() != y.len() {
            return Err(ModelError::ShapeMismatch {
                rows: x.len(),
                targets: y.len(),
            });
        }
        let pred = self.predict(x)?;
        Ok(r2_score(y, &pred)?)
    }
}

pub(crate) fn check_training_data(x: &[FeatureRow], y: &[f64]) -> Result<(), ModelError> {
    if x.len() != y.len() {
        return Err(ModelError::ShapeMismatch {
            rows: x.len(),
            targets: y.len(),
        });
    }
    if x.is_empty() {
        return Err(ModelError::Empty);
    }
    let finite = x.iter().flatten().chain(y).all(|v| v.is_finite());
    if !finite {
        return Err(ModelError::NonFinite);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// MeanRegressor – predicts the training mean
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanRegressor {
    pub mean: Option<f64>,
}

impl Regressor for MeanRegressor {
    fn fit(&mut self, x: &[FeatureRow], y: &[f64]) -> Result<(), ModelError> {
        check_training_data(x, y)?;
        self.mean = Some(y.iter().sum::<f64>() / y.len() as f64);
        Ok(())
    }

    fn predict(&self, x: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        let mean = self.mean.ok_or(ModelError::NotFitted)?;
        Ok(vec![mean; x.len()])
    }

    fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }
}

// ---------------------------------------------------------------------------
// Estimator – the model kinds the application can train and persist
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Linear,
    Mean,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Linear, ModelKind::Mean];

    pub fn label(self) -> &'static str {
        match self {
            ModelKind::Linear => "Linear (standardized)",
            ModelKind::Mean => "Mean baseline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearPipeline),
    Mean(MeanRegressor),
}

/// On-disk envelope around a fitted estimator.
#[derive(Debug, Serialize, Deserialize)]
struct SavedModel {
    format_version: u32,
    features: Vec<String>,
    estimator: Estimator,
}

impl Estimator {
    pub fn new(kind: ModelKind, ridge_alpha: f64) -> Self {
        match kind {
            ModelKind::Linear => Estimator::Linear(LinearPipeline::new(ridge_alpha)),
            ModelKind::Mean => Estimator::Mean(MeanRegressor::default()),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Estimator::Linear(_) => ModelKind::Linear,
            Estimator::Mean(_) => ModelKind::Mean,
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            Estimator::Linear(m) => m,
            Estimator::Mean(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Estimator::Linear(m) => m,
            Estimator::Mean(m) => m,
        }
    }

    /// Save the fitted estimator, scaler included, as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        let saved = SavedModel {
            format_version: MODEL_FORMAT_VERSION,
            features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            estimator: self.clone(),
        };
        let mut file = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut file, &saved)?;
        file.flush()?;
        Ok(())
    }

    /// Load an estimator written by [`Estimator::save`].
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = fs::read_to_string(path)?;
        let saved: SavedModel = serde_json::from_str(&text)?;
        if saved.format_version != MODEL_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: saved.format_version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        if saved.features != FEATURE_NAMES {
            return Err(ModelError::FeatureMismatch {
                found: saved.features,
                expected: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            });
        }
        Ok(saved.estimator)
    }
}

impl Regressor for Estimator {
    fn fit(&mut self, x: &[FeatureRow], y: &[f64]) -> Result<(), ModelError> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        self.inner().predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::N_FEATURES;

    fn rows(n: usize) -> Vec<FeatureRow> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                [
                    250.0 + 9.0 * t,
                    (t * 37.0) % 120.0,
                    (t * 23.0) % 90.0,
                    140.0 + (t * 7.0) % 70.0,
                    (t * 1.7) % 12.0,
                    850.0 + (t * 31.0) % 150.0,
                    600.0 + (t * 43.0) % 180.0,
                ]
            })
            .collect()
    }

    fn noisy_targets(x: &[FeatureRow]) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, r)| 0.12 * r[0] + 0.07 * r[1] - 0.25 * r[3] + 1.3 * r[4] + ((i % 5) as f64 - 2.0))
            .collect()
    }

    #[test]
    fn mean_regressor_predicts_training_mean() {
        let mut model = MeanRegressor::default();
        model.fit(&rows(3), &[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(model.predict(&rows(2)).unwrap(), vec![20.0, 20.0]);
    }

    #[test]
    fn fit_rejects_bad_training_data() {
        let mut model = Estimator::new(ModelKind::Linear, 0.0);
        assert!(matches!(model.fit(&[], &[]), Err(ModelError::Empty)));
        assert!(matches!(
            model.fit(&rows(3), &[1.0]),
            Err(ModelError::ShapeMismatch { rows: 3, targets: 1 })
        ));
        assert!(matches!(
            model.fit(&rows(2), &[1.0, f64::NAN]),
            Err(ModelError::NonFinite)
        ));
    }

    #[test]
    fn saved_model_predicts_identically_after_reload() {
        let x = rows(60);
        let y = noisy_targets(&x);
        let mut model = Estimator::new(ModelKind::Linear, 0.3);
        model.fit(&x, &y).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        model.save(&path).unwrap();
        let loaded = Estimator::load(&path).unwrap();

        assert_eq!(loaded.kind(), ModelKind::Linear);
        let before = model.predict(&x).unwrap();
        let after = loaded.predict(&x).unwrap();
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() <= 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn mean_model_round_trips() {
        let mut model = Estimator::new(ModelKind::Mean, 0.0);
        model.fit(&rows(4), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mean.json");
        model.save(&path).unwrap();
        assert_eq!(Estimator::load(&path).unwrap(), model);
    }

    #[test]
    fn unfit_model_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let model = Estimator::new(ModelKind::Linear, 0.0);
        assert!(matches!(
            model.save(&dir.path().join("m.json")),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn load_rejects_foreign_feature_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.json");
        let body = serde_json::json!({
            "format_version": 1,
            "features": ["a", "b"],
            "estimator": { "kind": "mean", "mean": 3.0 }
        });
        fs::write(&path, body.to_string()).unwrap();
        assert!(matches!(
            Estimator::load(&path),
            Err(ModelError::FeatureMismatch { .. })
        ));
        assert_eq!(FEATURE_NAMES.len(), N_FEATURES);
    }

    #[test]
    fn missing_model_file_error_reads_lowercase() {
        let dir = tempfile::tempdir().unwrap();
        let err = Estimator::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
        assert!(
            err.to_string().starts_with("failed to read or write model file"),
            "{err}"
        );
    }
}
