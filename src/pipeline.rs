#![forbid(unsafe_code)]

//! Ordered stage runner for the acquisition pipeline.
//!
//! Each stage receives a read-only snapshot of the accumulated parameters and
//! returns a delta. A failing stage is logged and skipped: the mapping stays
//! as it was and the next stage still runs.

use anyhow::Result;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::params::{self, Parameters};

pub trait Stage {
    fn name(&self) -> &str;

    /// Returns the keys to merge into the mapping. An empty delta means
    /// "nothing to update".
    fn run(&self, params: &Parameters) -> Result<Parameters>;
}

/// Adapts a closure into a [`Stage`].
pub struct FnStage<F> {
    name: String,
    func: F,
}

impl<F> FnStage<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Parameters) -> Result<Parameters>,
    {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&Parameters) -> Result<Parameters>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, params: &Parameters) -> Result<Parameters> {
        (self.func)(params)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("the URL is missing; provide a valid URL as a command-line argument")]
    MissingUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Merged { keys: Vec<String> },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: String,
    pub outcome: StageOutcome,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub params: Parameters,
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// The synthesized output path, if any stage produced one.
    pub fn original_filename(&self) -> Option<PathBuf> {
        self.params
            .get_non_empty_str(params::ORIGINAL_FILENAME)
            .map(PathBuf::from)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageReport> {
        self.stages
            .iter()
            .filter(|report| matches!(report.outcome, StageOutcome::Failed { .. }))
    }
}

pub struct Pipeline<'a> {
    initial: Parameters,
    stages: Vec<Box<dyn Stage + 'a>>,
}

impl<'a> Pipeline<'a> {
    /// Fails fast when `url` is absent or blank.
    pub fn new(initial: Parameters) -> Result<Self, PipelineError> {
        if initial.get_non_empty_str(params::URL).is_none() {
            return Err(PipelineError::MissingUrl);
        }
        Ok(Self {
            initial,
            stages: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_stage(mut self, stage: impl Stage + 'a) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn run(self) -> PipelineReport {
        let mut params = self.initial;
        let mut stages = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            info!("Entering stage: {}", stage.name());
            let outcome = match stage.run(&params) {
                Ok(delta) => {
                    let keys: Vec<String> = delta.keys().map(str::to_string).collect();
                    debug!(stage = stage.name(), ?keys, "merging stage result");
                    params = params.merged(delta);
                    StageOutcome::Merged { keys }
                }
                Err(err) => {
                    error!("Error executing {}: {err}", stage.name());
                    debug!("{err:?}");
                    StageOutcome::Failed {
                        reason: format!("{err:#}"),
                    }
                }
            };
            stages.push(StageReport {
                stage: stage.name().to_string(),
                outcome,
            });
        }

        let report = PipelineReport { params, stages };
        match report.original_filename() {
            Some(path) => info!("Returning original filename: {}", path.display()),
            None => warn!("No original filename to return."),
        }
        report
    }
}
