//! Typed per-stage pipeline errors.
//!
//! The batch driver never aborts on a single recording: each (subject, run)
//! body returns `Result<_, PipelineError>`, the driver logs the error with
//! its identifiers and moves on. Tagging errors by [`Stage`] keeps the
//! best-effort continuation policy while making failure kinds inspectable in
//! the batch summary.

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Reference,
    Filter,
    Resample,
    Epoch,
    Reject,
    Decompose,
    Classify,
    Reconstruct,
    Export,
    Plot,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Reference => "reference",
            Stage::Filter => "filter",
            Stage::Resample => "resample",
            Stage::Epoch => "epoch",
            Stage::Reject => "reject",
            Stage::Decompose => "decompose",
            Stage::Classify => "classify",
            Stage::Reconstruct => "reconstruct",
            Stage::Export => "export",
            Stage::Plot => "plot",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A per-run input file is absent. Distinct from [`PipelineError::Stage`]
    /// so the batch report can count skips separately from failures.
    #[error("missing input file {0}")]
    MissingInput(PathBuf),

    /// Any other failure, tagged with the stage it came from.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub fn stage(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        Self::Stage { stage, source: source.into() }
    }
}

/// Extension to tag an `anyhow`-ish result with the stage it belongs to.
pub trait StageResultExt<T> {
    fn at_stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T, E: Into<anyhow::Error>> StageResultExt<T> for Result<T, E> {
    fn at_stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::stage(stage, e))
    }
}
