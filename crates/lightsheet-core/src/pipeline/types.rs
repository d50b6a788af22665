use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};

use super::config::PipelineConfig;

/// Pipeline stage, used for dispatch, progress and the job summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    DefineDataset,
    StageArtifacts,
    Resave,
    ComputePairwiseShifts,
    FilterShifts,
    GlobalOptimize,
    DetectInterestPoints,
    RegisterInterestPoints,
    SelectIllumination,
    RestageForFusion,
    Fuse,
    ConvertFormat,
    Cleanup,
    Finalize,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DefineDataset => write!(f, "Define dataset"),
            Self::StageArtifacts => write!(f, "Stage artifacts"),
            Self::Resave => write!(f, "Resave as HDF5"),
            Self::ComputePairwiseShifts => write!(f, "Compute pairwise shifts"),
            Self::FilterShifts => write!(f, "Filter shifts"),
            Self::GlobalOptimize => write!(f, "Global optimization"),
            Self::DetectInterestPoints => write!(f, "Detect interest points"),
            Self::RegisterInterestPoints => write!(f, "Register interest points"),
            Self::SelectIllumination => write!(f, "Select illumination"),
            Self::RestageForFusion => write!(f, "Resave as TIFF"),
            Self::Fuse => write!(f, "Fuse"),
            Self::ConvertFormat => write!(f, "Convert format"),
            Self::Cleanup => write!(f, "Cleanup"),
            Self::Finalize => write!(f, "Finalize"),
        }
    }
}

/// How a stage ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageStatus {
    Succeeded,
    /// Not run, on purpose. Never a failure.
    Skipped(String),
    /// Finished, but a best-effort part of it did not work out.
    Warning(String),
    Failed(String),
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Warning(message) => write!(f, "succeeded with warning ({message})"),
            Self::Failed(message) => write!(f, "failed ({message})"),
        }
    }
}

/// Outcome of one stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageResult {
    pub stage: Stage,
    pub status: StageStatus,
    pub elapsed: Duration,
}

impl StageResult {
    pub fn succeeded(stage: Stage, elapsed: Duration) -> Self {
        Self {
            stage,
            status: StageStatus::Succeeded,
            elapsed,
        }
    }

    pub fn skipped(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped(reason.into()),
            elapsed: Duration::ZERO,
        }
    }

    pub fn warning(stage: Stage, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            stage,
            status: StageStatus::Warning(message.into()),
            elapsed,
        }
    }

    pub fn failed(stage: Stage, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            stage,
            status: StageStatus::Failed(message.into()),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, StageStatus::Succeeded | StageStatus::Warning(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, StageStatus::Failed(_))
    }
}

/// One processing run.
#[derive(Clone, Debug)]
pub struct Job {
    pub input: PathBuf,
    pub config: PipelineConfig,
    pub created_at: DateTime<Local>,
}

impl Job {
    pub fn new(input: impl Into<PathBuf>, config: PipelineConfig) -> Self {
        Self {
            input: input.into(),
            config,
            created_at: Local::now(),
        }
    }

    /// File name of the first acquisition file.
    pub fn display_name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }
}

/// Receives a callback when each stage starts and one when it ends,
/// skipped stages included. Both default to doing nothing.
pub trait ProgressReporter: Send + Sync {
    /// A stage is about to run.
    fn begin_stage(&self, _stage: Stage) {}

    /// A stage has ended (including skips).
    fn finish_stage(&self, _result: &StageResult) {}
}

/// No-op progress reporter.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
