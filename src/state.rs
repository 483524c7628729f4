use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::backend::{HttpBackend, PredictAndOptimize};
use crate::config::WhatIfConfig;
use crate::data::model::MixRecord;
use crate::data::{loader, prepare, PreparedData};
use crate::evaluate::{evaluate, EvaluationReport};
use crate::regression::{Estimator, ModelKind, Regressor};
use crate::whatif::{analyze, AnalysisError, Progress, WhatIfAnalysis};

// ---------------------------------------------------------------------------
// Background analysis job
// ---------------------------------------------------------------------------

/// Messages from the analysis worker to the UI thread.
pub enum JobMessage {
    Progress(Progress),
    Finished(Result<WhatIfAnalysis, AnalysisError>),
}

/// A what-if analysis running on its worker thread.
pub struct AnalysisJob {
    rx: Receiver<JobMessage>,
    pub progress: Option<Progress>,
}

/// Which diagnostic plot the central panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotView {
    Target,
    Water,
    Table,
}

impl PlotView {
    pub const ALL: [PlotView; 3] = [PlotView::Target, PlotView::Water, PlotView::Table];

    pub fn label(self) -> &'static str {
        match self {
            PlotView::Target => "Strength vs target",
            PlotView::Water => "Water change",
            PlotView::Table => "Results table",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: WhatIfConfig,

    /// Rows of the last loaded file, before filtering.
    pub records: Vec<MixRecord>,
    pub source_path: Option<PathBuf>,

    /// Filtered, deduplicated and split data (None until a file is loaded).
    pub prepared: Option<PreparedData>,

    /// Model kind used by the next fit.
    pub model_kind: ModelKind,
    pub model: Option<Estimator>,
    pub report: Option<EvaluationReport>,

    pub analysis: Option<WhatIfAnalysis>,
    pub job: Option<AnalysisJob>,

    pub view: PlotView,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(WhatIfConfig::default())
    }
}

impl AppState {
    pub fn new(config: WhatIfConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
            source_path: None,
            prepared: None,
            model_kind: ModelKind::Linear,
            model: None,
            report: None,
            analysis: None,
            job: None,
            view: PlotView::Target,
            status_message: None,
        }
    }

    /// Load the dataset and model named in the config, if any.
    pub fn load_configured_files(&mut self) {
        if let Some(path) = self.config.dataset_path.clone() {
            self.load_dataset(&path);
        }
        if let Some(path) = self.config.model_path.clone() {
            if path.is_file() {
                self.load_model(&path);
            }
        }
    }

    /// Report an error in the status line and the log.
    pub fn fail(&mut self, context: &str, err: &anyhow::Error) {
        log::error!("{context}: {err:#}");
        self.status_message = Some(format!("{context}: {err:#}"));
    }

    // -- data --

    pub fn load_dataset(&mut self, path: &Path) {
        match loader::load_file(path) {
            Ok(records) => {
                log::info!("Loaded {} rows from {}", records.len(), path.display());
                self.source_path = Some(path.to_path_buf());
                if let Err(e) = self.set_records(records) {
                    self.fail("Failed to prepare dataset", &e);
                }
            }
            Err(e) => self.fail("Failed to load file", &e),
        }
    }

    /// Ingest newly loaded rows; drops results derived from the previous data.
    ///
    /// A running analysis is detached: its worker finishes on its own and its
    /// results are discarded.
    pub fn set_records(&mut self, records: Vec<MixRecord>) -> Result<()> {
        if self.job.take().is_some() {
            log::info!("Discarding running analysis for the previous dataset");
        }
        self.records = records;
        self.analysis = None;
        self.report = None;
        self.prepared = None;
        self.prepared = Some(prepare(&self.records, &self.config)?);
        self.status_message = None;
        if self.model.as_ref().is_some_and(|m| m.is_fitted()) {
            self.evaluate_model()?;
        }
        Ok(())
    }

    /// Re-run filtering and splitting after a config change.
    pub fn reprepare(&mut self) -> Result<()> {
        let records = std::mem::take(&mut self.records);
        self.set_records(records)
    }

    // -- model --

    pub fn fit_model(&mut self) -> Result<()> {
        let Some(prepared) = &self.prepared else {
            bail!("Load a dataset before fitting");
        };
        let train = &prepared.split.train;
        let mut model = Estimator::new(self.model_kind, self.config.ridge_alpha);
        model
            .fit(&train.feature_rows(), &train.targets())
            .context("fitting model")?;
        log::info!("Fitted {} on {} rows", self.model_kind.label(), train.len());
        self.model = Some(model);
        self.evaluate_model()
    }

    pub fn evaluate_model(&mut self) -> Result<()> {
        let (Some(prepared), Some(model)) = (&self.prepared, &self.model) else {
            bail!("Both a dataset and a model are needed for evaluation");
        };
        let (train, test) = (&prepared.split.train, &prepared.split.test);
        let report = evaluate(
            model,
            &train.feature_rows(),
            &train.targets(),
            &test.feature_rows(),
            &test.targets(),
        )?;
        log::info!("Evaluation:\n{report}");
        self.report = Some(report);
        Ok(())
    }

    pub fn save_model(&mut self, path: &Path) {
        let result = match &self.model {
            Some(model) => model.save(path).map_err(anyhow::Error::from),
            None => Err(anyhow::anyhow!("No model to save")),
        };
        match result {
            Ok(()) => {
                log::info!("Saved model to {}", path.display());
                self.status_message = Some(format!("Saved model to {}", path.display()));
            }
            Err(e) => self.fail("Failed to save model", &e),
        }
    }

    pub fn load_model(&mut self, path: &Path) {
        match Estimator::load(path) {
            Ok(model) => {
                log::info!("Loaded {} from {}", model.kind().label(), path.display());
                self.model_kind = model.kind();
                self.model = Some(model);
                self.report = None;
                if self.prepared.is_some() {
                    if let Err(e) = self.evaluate_model() {
                        self.fail("Failed to evaluate loaded model", &e);
                    }
                }
            }
            Err(e) => self.fail("Failed to load model", &e.into()),
        }
    }

    // -- what-if analysis --

    pub fn is_running(&self) -> bool {
        self.job.is_some()
    }

    /// Start an analysis against the configured HTTP backend.
    pub fn start_analysis(&mut self) -> Result<()> {
        let backend = HttpBackend::new(
            self.config.backend_url.clone(),
            Duration::from_secs(self.config.request_timeout_secs),
        )?;
        log::info!("Starting what-if analysis against {}", backend.url());
        self.start_analysis_with(backend)
    }

    /// Run the analysis over every prepared sample on a worker thread.
    pub fn start_analysis_with<B>(&mut self, mut backend: B) -> Result<()>
    where
        B: PredictAndOptimize + Send + 'static,
    {
        if self.job.is_some() {
            bail!("An analysis is already running");
        }
        let Some(prepared) = &self.prepared else {
            bail!("Load a dataset before running the analysis");
        };
        let mixes = prepared.dataset.mixes();
        let strengths = prepared.dataset.targets();
        let target = self.config.target_strength;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let progress_tx = tx.clone();
            let mut observer = |p: Progress| {
                log::info!("what-if row {}/{}", p.row, p.total);
                // the UI may already be gone
                let _ = progress_tx.send(JobMessage::Progress(p));
            };
            let result = analyze(&mixes, &strengths, &mut backend, target, Some(&mut observer));
            let _ = tx.send(JobMessage::Finished(result));
        });

        self.analysis = None;
        self.job = Some(AnalysisJob { rx, progress: None });
        self.status_message = None;
        Ok(())
    }

    /// Drain worker messages. Returns true once the job has finished.
    pub fn poll_job(&mut self) -> bool {
        let Some(job) = &mut self.job else {
            return false;
        };
        let finished = loop {
            match job.rx.try_recv() {
                Ok(JobMessage::Progress(p)) => job.progress = Some(p),
                Ok(JobMessage::Finished(result)) => break Some(result),
                Err(TryRecvError::Empty) => break None,
                Err(TryRecvError::Disconnected) => {
                    break Some(Err(AnalysisError::WorkerLost));
                }
            }
        };
        let Some(result) = finished else {
            return false;
        };
        self.job = None;
        match result {
            Ok(analysis) => {
                self.status_message = None;
                self.analysis = Some(analysis);
            }
            Err(e) => self.fail("What-if analysis failed", &e.into()),
        }
        true
    }

    pub fn export_results(&mut self, path: &Path) {
        let Some(analysis) = &self.analysis else {
            self.status_message = Some("No analysis results to export".to_string());
            return;
        };
        match crate::whatif::export::export_csv(analysis, path) {
            Ok(()) => {
                log::info!("Exported results to {}", path.display());
                self.status_message = Some(format!("Exported results to {}", path.display()));
            }
            Err(e) => self.fail("Failed to export results", &e),
        }
    }
}
