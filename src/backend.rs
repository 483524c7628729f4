use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::model::MixFeatures;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request to prediction backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("prediction backend answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed backend response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("backend response field '{field}' is {value}, expected a finite number")]
    NonFinite { field: &'static str, value: f64 },
    #[error("backend proposed negative water content {0} kg/m³")]
    NegativeWater(f64),
}

/// Body of one predict-and-optimize call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionQuery {
    #[serde(flatten)]
    pub features: MixFeatures,
    /// Absent means "predict only, do not optimize".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_strength: Option<f64>,
}

/// The four numbers the backend returns per query.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PredictionResult {
    /// Water content of the submitted mix (kg/m³).
    pub water_org: f64,
    /// Water content after optimization (kg/m³).
    pub water_new: f64,
    /// Predicted strength with the original water (MPa).
    pub pred_org: f64,
    /// Predicted strength with the optimized water (MPa).
    pub pred_new: f64,
}

impl PredictionResult {
    /// Parse and validate a response body.
    pub fn from_json(body: &str) -> Result<Self, BackendError> {
        let result: PredictionResult = serde_json::from_str(body)?;
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), BackendError> {
        let fields = [
            ("water_org", self.water_org),
            ("water_new", self.water_new),
            ("pred_org", self.pred_org),
            ("pred_new", self.pred_new),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(BackendError::NonFinite { field, value });
            }
        }
        if self.water_new < 0.0 {
            return Err(BackendError::NegativeWater(self.water_new));
        }
        Ok(())
    }
}

/// The external predict-and-optimize capability, one blocking call per query.
pub trait PredictAndOptimize {
    fn predict_and_optimize(&mut self, query: &PredictionQuery)
        -> Result<PredictionResult, BackendError>;
}

impl<F> PredictAndOptimize for F
where
    F: FnMut(&PredictionQuery) -> Result<PredictionResult, BackendError>,
{
    fn predict_and_optimize(
        &mut self,
        query: &PredictionQuery,
    ) -> Result<PredictionResult, BackendError> {
        self(query)
    }
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// JSON-over-HTTP client for a local prediction backend.
pub struct HttpBackend {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PredictAndOptimize for HttpBackend {
    fn predict_and_optimize(
        &mut self,
        query: &PredictionQuery,
    ) -> Result<PredictionResult, BackendError> {
        let response = self.client.post(&self.url).json(query).send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        PredictionResult::from_json(&body)
    }
}
