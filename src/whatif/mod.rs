/// What-if analysis: query the backend once per sample, keep the four
/// returned series aligned with the observed strengths, and summarize how far
/// each series lands from the target strength.
pub mod export;
pub mod plots;

use thiserror::Error;

use crate::backend::{BackendError, PredictAndOptimize, PredictionQuery, PredictionResult};
use crate::data::model::MixFeatures;
use crate::metrics::mean_absolute_target_deviation;

/// Progress is reported on rows 0, 10, 20, ...
pub const PROGRESS_EVERY: usize = 10;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{features} feature rows but {targets} observed strengths")]
    ShapeMismatch { features: usize, targets: usize },
    #[error("target strength must be a positive number of MPa, got {0}")]
    InvalidTarget(f64),
    #[error("backend call for row {row} failed: {source}")]
    Backend {
        row: usize,
        #[source]
        source: BackendError,
    },
    #[error("analysis worker stopped without reporting a result")]
    WorkerLost,
}

/// Backend outputs and observed strengths, index-aligned with the input rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSeries {
    pub water_org: Vec<f64>,
    pub water_new: Vec<f64>,
    pub pred_org: Vec<f64>,
    pub pred_new: Vec<f64>,
    pub true_strength: Vec<f64>,
}

impl ResultSeries {
    fn with_capacity(n: usize) -> Self {
        Self {
            water_org: Vec::with_capacity(n),
            water_new: Vec::with_capacity(n),
            pred_org: Vec::with_capacity(n),
            pred_new: Vec::with_capacity(n),
            true_strength: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, result: PredictionResult, true_strength: f64) {
        self.water_org.push(result.water_org);
        self.water_new.push(result.water_new);
        self.pred_org.push(result.pred_org);
        self.pred_new.push(result.pred_new);
        self.true_strength.push(true_strength);
    }

    pub fn len(&self) -> usize {
        self.true_strength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.true_strength.is_empty()
    }

    /// Optimized prediction shifted by the model's error on the original mix:
    /// `pred_new + (true - pred_org)`.
    pub fn corrected_optimized(&self) -> Vec<f64> {
        self.pred_new
            .iter()
            .zip(&self.true_strength)
            .zip(&self.pred_org)
            .map(|((new, truth), org)| new + (truth - org))
            .collect()
    }

    /// Signed predicted strength change, `pred_new - pred_org`.
    pub fn strength_change(&self) -> Vec<f64> {
        self.pred_new
            .iter()
            .zip(&self.pred_org)
            .map(|(new, org)| new - org)
            .collect()
    }
}

/// Mean absolute target deviation of each series. NaN when there are no rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatdSummary {
    pub true_strength: f64,
    pub original: f64,
    pub optimized: f64,
    pub corrected: f64,
}

impl MatdSummary {
    pub fn from_series(series: &ResultSeries, target_strength: f64) -> Self {
        Self {
            true_strength: mean_absolute_target_deviation(&series.true_strength, target_strength),
            original: mean_absolute_target_deviation(&series.pred_org, target_strength),
            optimized: mean_absolute_target_deviation(&series.pred_new, target_strength),
            corrected: mean_absolute_target_deviation(
                &series.corrected_optimized(),
                target_strength,
            ),
        }
    }
}

/// A completed analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct WhatIfAnalysis {
    pub target_strength: f64,
    pub series: ResultSeries,
    pub summary: MatdSummary,
}

/// Progress notification passed to the optional observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Index of the row about to be queried.
    pub row: usize,
    pub total: usize,
}

/// Query `backend` for every row in order and summarize the results.
///
/// Any backend failure aborts the whole analysis; no partial series escape.
pub fn analyze<B: PredictAndOptimize + ?Sized>(
    mixes: &[MixFeatures],
    true_strength: &[f64],
    backend: &mut B,
    target_strength: f64,
    mut progress: Option<&mut dyn FnMut(Progress)>,
) -> Result<WhatIfAnalysis, AnalysisError> {
    if mixes.len() != true_strength.len() {
        return Err(AnalysisError::ShapeMismatch {
            features: mixes.len(),
            targets: true_strength.len(),
        });
    }
    if !(target_strength.is_finite() && target_strength > 0.0) {
        return Err(AnalysisError::InvalidTarget(target_strength));
    }

    let total = mixes.len();
    let mut series = ResultSeries::with_capacity(total);

    for (row, (features, truth)) in mixes.iter().zip(true_strength).enumerate() {
        if row % PROGRESS_EVERY == 0 {
            if let Some(observer) = progress.as_deref_mut() {
                observer(Progress { row, total });
            }
        }

        let query = PredictionQuery {
            features: *features,
            target_strength: Some(target_strength),
        };
        let result = backend
            .predict_and_optimize(&query)
            .and_then(|r| r.validate().map(|()| r))
            .map_err(|source| AnalysisError::Backend { row, source })?;
        series.push(result, *truth);
    }

    if series.is_empty() {
        log::warn!("what-if analysis ran over zero rows; MATD values are undefined");
    }
    let summary = MatdSummary::from_series(&series, target_strength);
    log::info!(
        "what-if analysis over {total} rows: MATD true {:.2}, original {:.2}, optimized {:.2}, corrected {:.2}",
        summary.true_strength,
        summary.original,
        summary.optimized,
        summary.corrected
    );

    Ok(WhatIfAnalysis {
        target_strength,
        series,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixes(n: usize) -> Vec<MixFeatures> {
        (0..n)
            .map(|i| MixFeatures::from_row([300.0, 0.0, 0.0, 150.0 + i as f64, 0.0, 1000.0, 800.0]))
            .collect()
    }

    /// Predicts `0.2 * water` and trims 10 kg of water, gaining 3 MPa.
    fn linear_backend(q: &PredictionQuery) -> Result<PredictionResult, BackendError> {
        let water = q.features.water;
        Ok(PredictionResult {
            water_org: water,
            water_new: water - 10.0,
            pred_org: 0.2 * water,
            pred_new: 0.2 * water + 3.0,
        })
    }

    #[test]
    fn series_are_aligned_with_input_rows() {
        let x = mixes(25);
        let y: Vec<f64> = (0..25).map(|i| 30.0 + i as f64).collect();
        let mut backend = linear_backend;
        let analysis = analyze(&x, &y, &mut backend, 40.0, None).unwrap();

        let s = &analysis.series;
        assert_eq!(s.len(), 25);
        for len in [s.water_org.len(), s.water_new.len(), s.pred_org.len(), s.pred_new.len()] {
            assert_eq!(len, 25);
        }
        assert_eq!(s.true_strength, y);
        for (i, water) in s.water_org.iter().enumerate() {
            assert_eq!(*water, 150.0 + i as f64);
        }
    }

    #[test]
    fn perfect_backend_has_zero_deviation_everywhere() {
        let target = 42.0;
        let x = mixes(7);
        let y = vec![target; 7];
        let mut backend = |q: &PredictionQuery| -> Result<PredictionResult, BackendError> {
            Ok(PredictionResult {
                water_org: q.features.water,
                water_new: q.features.water,
                pred_org: target,
                pred_new: target,
            })
        };
        let analysis = analyze(&x, &y, &mut backend, target, None).unwrap();
        assert_eq!(
            analysis.summary,
            MatdSummary {
                true_strength: 0.0,
                original: 0.0,
                optimized: 0.0,
                corrected: 0.0,
            }
        );
    }

    #[test]
    fn corrected_series_adds_original_error_exactly() {
        let x = mixes(12);
        let y: Vec<f64> = (0..12).map(|i| 25.0 + 1.37 * i as f64).collect();
        let mut backend = linear_backend;
        let analysis = analyze(&x, &y, &mut backend, 40.0, None).unwrap();
        let s = &analysis.series;
        let corrected = s.corrected_optimized();
        for i in 0..s.len() {
            assert_eq!(corrected[i], s.pred_new[i] + (s.true_strength[i] - s.pred_org[i]));
        }
        assert_eq!(
            analysis.summary.corrected,
            mean_absolute_target_deviation(&corrected, 40.0)
        );
    }

    #[test]
    fn empty_input_yields_nan_summary() {
        let mut backend = linear_backend;
        let analysis = analyze(&[], &[], &mut backend, 40.0, None).unwrap();
        assert!(analysis.series.is_empty());
        assert!(analysis.series.corrected_optimized().is_empty());
        let m = analysis.summary;
        assert!(m.true_strength.is_nan());
        assert!(m.original.is_nan());
        assert!(m.optimized.is_nan());
        assert!(m.corrected.is_nan());
    }

    #[test]
    fn backend_failure_aborts_without_partial_series() {
        let x = mixes(20);
        let y = vec![35.0; 20];
        let mut calls = 0;
        let mut backend = |q: &PredictionQuery| -> Result<PredictionResult, BackendError> {
            calls += 1;
            if calls == 14 {
                return Err(BackendError::Status {
                    status: 500,
                    body: "optimizer diverged".to_string(),
                });
            }
            linear_backend(q)
        };
        let err = analyze(&x, &y, &mut backend, 40.0, None).unwrap_err();
        assert!(matches!(err, AnalysisError::Backend { row: 13, .. }));
        assert_eq!(calls, 14);
    }

    #[test]
    fn invalid_backend_values_abort() {
        let x = mixes(3);
        let y = vec![35.0; 3];
        let mut backend = |q: &PredictionQuery| -> Result<PredictionResult, BackendError> {
            let mut r = linear_backend(q)?;
            r.pred_new = f64::NAN;
            Ok(r)
        };
        let err = analyze(&x, &y, &mut backend, 40.0, None).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Backend { row: 0, source: BackendError::NonFinite { field: "pred_new", .. } }
        ));
    }

    #[test]
    fn shape_and_target_are_checked_before_any_call() {
        let mut calls = 0;
        let mut backend = |q: &PredictionQuery| -> Result<PredictionResult, BackendError> {
            calls += 1;
            linear_backend(q)
        };
        assert!(matches!(
            analyze(&mixes(3), &[1.0], &mut backend, 40.0, None),
            Err(AnalysisError::ShapeMismatch { features: 3, targets: 1 })
        ));
        assert!(matches!(
            analyze(&mixes(3), &[1.0; 3], &mut backend, f64::NAN, None),
            Err(AnalysisError::InvalidTarget(_))
        ));
        assert!(matches!(
            analyze(&mixes(3), &[1.0; 3], &mut backend, 0.0, None),
            Err(AnalysisError::InvalidTarget(_))
        ));
        assert_eq!(calls, 0);
    }

    #[test]
    fn progress_fires_every_tenth_row() {
        let x = mixes(23);
        let y = vec![30.0; 23];
        let mut seen = Vec::new();
        let mut observer = |p: Progress| seen.push(p.row);
        let mut backend = linear_backend;
        analyze(&x, &y, &mut backend, 40.0, Some(&mut observer)).unwrap();
        assert_eq!(seen, vec![0, 10, 20]);
    }
}
