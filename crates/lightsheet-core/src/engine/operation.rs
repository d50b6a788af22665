use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::pipeline::config::{InterestPointConfig, ReaderVariant};
use crate::pipeline::Stage;
use crate::resources::{FusionOutput, FusionStrategy};

/// One delegated operation with its typed parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum StageOperation {
    DefineDataset {
        reader: ReaderVariant,
        /// File name (no directory) of the project description to write.
        project_filename: String,
        first_file: PathBuf,
    },
    Resave {
        project: PathBuf,
        export: PathBuf,
        deflate: bool,
    },
    PairwiseShifts {
        project: PathBuf,
    },
    FilterShifts {
        project: PathBuf,
        min_correlation: f64,
        max_correlation: f64,
    },
    GlobalOptimize {
        project: PathBuf,
        relative_threshold: f64,
        absolute_threshold: f64,
    },
    DetectInterestPoints {
        project: PathBuf,
        params: InterestPointConfig,
    },
    RegisterInterestPoints {
        project: PathBuf,
    },
    SelectIllumination {
        project: PathBuf,
    },
    /// Resave as one TIFF per view; fusing from the container is slow.
    RestageTiff {
        project: PathBuf,
        export: PathBuf,
    },
    Fuse {
        project: PathBuf,
        export: PathBuf,
        downsampling: u32,
        strategy: FusionStrategy,
        output: FusionOutput,
    },
    Convert {
        executable: PathBuf,
        working_dir: PathBuf,
        input: PathBuf,
        output: PathBuf,
        format: String,
    },
}

impl StageOperation {
    pub fn stage(&self) -> Stage {
        match self {
            Self::DefineDataset { .. } => Stage::DefineDataset,
            Self::Resave { .. } => Stage::Resave,
            Self::PairwiseShifts { .. } => Stage::ComputePairwiseShifts,
            Self::FilterShifts { .. } => Stage::FilterShifts,
            Self::GlobalOptimize { .. } => Stage::GlobalOptimize,
            Self::DetectInterestPoints { .. } => Stage::DetectInterestPoints,
            Self::RegisterInterestPoints { .. } => Stage::RegisterInterestPoints,
            Self::SelectIllumination { .. } => Stage::SelectIllumination,
            Self::RestageTiff { .. } => Stage::RestageForFusion,
            Self::Fuse { .. } => Stage::Fuse,
            Self::Convert { .. } => Stage::ConvertFormat,
        }
    }

    /// Check parameters before anything is marshaled or dispatched.
    pub fn validate(&self) -> Result<()> {
        let stage = self.stage();
        let invalid = |reason: String| PipelineError::InvalidOperation { stage, reason };

        match self {
            Self::DefineDataset {
                project_filename,
                first_file,
                ..
            } => {
                if project_filename.is_empty() || project_filename.contains(['/', '\\']) {
                    return Err(invalid(format!(
                        "project file name {project_filename:?} must be a bare file name"
                    )));
                }
                check_path(first_file).map_err(invalid)?;
            }
            Self::Resave {
                project, export, ..
            }
            | Self::RestageTiff { project, export } => {
                check_path(project).map_err(invalid)?;
                check_path(export).map_err(invalid)?;
            }
            Self::PairwiseShifts { project }
            | Self::RegisterInterestPoints { project }
            | Self::SelectIllumination { project } => {
                check_path(project).map_err(invalid)?;
            }
            Self::FilterShifts {
                project,
                min_correlation,
                max_correlation,
            } => {
                check_path(project).map_err(invalid)?;
                let in_range = |r: f64| (0.0..=1.0).contains(&r);
                if !in_range(*min_correlation)
                    || !in_range(*max_correlation)
                    || min_correlation > max_correlation
                {
                    return Err(invalid(format!(
                        "correlation window [{min_correlation}, {max_correlation}] is not within [0, 1]"
                    )));
                }
            }
            Self::GlobalOptimize {
                project,
                relative_threshold,
                absolute_threshold,
            } => {
                check_path(project).map_err(invalid)?;
                if *relative_threshold <= 0.0 || *absolute_threshold <= 0.0 {
                    return Err(invalid("optimization thresholds must be positive".into()));
                }
            }
            Self::DetectInterestPoints { project, params } => {
                check_path(project).map_err(invalid)?;
                params
                    .validate()
                    .map_err(|e| invalid(e.to_string()))?;
            }
            Self::Fuse {
                project,
                export,
                downsampling,
                ..
            } => {
                check_path(project).map_err(invalid)?;
                check_path(export).map_err(invalid)?;
                if *downsampling == 0 {
                    return Err(invalid("downsampling must be at least 1".into()));
                }
            }
            Self::Convert {
                executable,
                working_dir,
                input,
                output,
                format,
            } => {
                for path in [executable, working_dir, input, output] {
                    check_path(path).map_err(invalid)?;
                }
                if format.trim().is_empty() {
                    return Err(invalid("output format must not be empty".into()));
                }
            }
        }
        Ok(())
    }
}

/// Paths end up inside `key=[value]` option groups, so a closing bracket
/// would cut the value short.
fn check_path(path: &Path) -> std::result::Result<(), String> {
    let rendered = path.to_string_lossy();
    if rendered.is_empty() {
        return Err("path must not be empty".into());
    }
    if rendered.contains(']') {
        return Err(format!("path {rendered} contains ']'"));
    }
    Ok(())
}
