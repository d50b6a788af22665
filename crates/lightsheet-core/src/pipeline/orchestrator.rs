use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::artifacts::{cleanup_temp, promote_project, stage_project, CleanupOutcome};
use crate::consts::{
    MAX_LINK_CORRELATION, MIN_LINK_CORRELATION, OPTIMIZATION_ABSOLUTE_THRESHOLD,
    OPTIMIZATION_RELATIVE_THRESHOLD,
};
use crate::convert::locate_converter;
use crate::engine::{Backend, StageExecutor, StageOperation};
use crate::error::Result;
use crate::metadata::{read_project_metadata, DatasetMetadata};
use crate::paths::{plan_artifacts, ArtifactSet};
use crate::report::{FusionSummary, JobReporter, Notifier, Report};
use crate::resources::{format_bytes, FusionOutput, ResourcePlanner};

use super::config::RegistrationMethod;
use super::confirm::{decide_fusion, FusionConfirmation, FusionPlan};
use super::types::{Job, NoOpReporter, ProgressReporter, Stage, StageResult};

/// A fatal stage failure; the failed result is already recorded.
struct Aborted;

type Flow<T = ()> = std::result::Result<T, Aborted>;

/// Sequences the stages of one job strictly forward.
///
/// Only configuration errors are returned as `Err`. Stage failures end the
/// run early and show up in the returned [`Report`].
pub struct PipelineController<'a> {
    executor: StageExecutor<'a>,
    notifier: &'a dyn Notifier,
    confirmation: &'a dyn FusionConfirmation,
    progress: Arc<dyn ProgressReporter>,
}

impl<'a> PipelineController<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        notifier: &'a dyn Notifier,
        confirmation: &'a dyn FusionConfirmation,
    ) -> Self {
        Self {
            executor: StageExecutor::new(backend),
            notifier,
            confirmation,
            progress: Arc::new(NoOpReporter),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Run every stage of `job`, then summarize, persist and notify.
    pub fn run(&self, job: &Job) -> Result<Report> {
        job.config.validate()?;
        let artifacts = plan_artifacts(&job.input, &job.config)?;
        info!(
            name = %artifacts.name,
            project = %artifacts.project.display(),
            temp = %artifacts.temp_dir.display(),
            "Starting job"
        );

        let mut reporter = JobReporter::new(job);
        if self.run_stages(job, &artifacts, &mut reporter).is_err() {
            warn!("Pipeline aborted");
        }
        Ok(self.finalize(job, &artifacts, &reporter))
    }

    fn run_stages(&self, job: &Job, a: &ArtifactSet, reporter: &mut JobReporter) -> Flow {
        let config = &job.config;

        let project_filename = a
            .project
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.execute(
            reporter,
            StageOperation::DefineDataset {
                reader: config.reader,
                project_filename,
                first_file: a.input.clone(),
            },
        )?;

        let metadata = match read_project_metadata(&a.project) {
            Ok(metadata) => {
                info!("Found {metadata}");
                metadata
            }
            Err(e) => {
                warn!(error = %e, "Could not read dataset metadata, assuming single views");
                DatasetMetadata::default()
            }
        };

        self.stage_artifacts(reporter, a)?;

        self.execute(
            reporter,
            StageOperation::Resave {
                project: a.staged_project.clone(),
                export: a.staged_project.clone(),
                deflate: config.resave.deflate_compression,
            },
        )?;

        self.register(reporter, &config.registration, a)?;

        if config.autoselect_illumination {
            if metadata.illuminations < 2 {
                info!("Single illumination side, selection keeps it");
            }
            self.execute(
                reporter,
                StageOperation::SelectIllumination {
                    project: a.staged_project.clone(),
                },
            )?;
        } else {
            self.skip(reporter, Stage::SelectIllumination, "not requested");
        }

        let fused = if config.fuse {
            self.fuse(reporter, job, a, &metadata)?
        } else {
            self.skip(reporter, Stage::Fuse, "not requested");
            None
        };

        let converted = self.convert(reporter, job, a, fused)?;
        self.cleanup(reporter, job, a, fused, converted);
        Ok(())
    }

    fn register(
        &self,
        reporter: &mut JobReporter,
        method: &RegistrationMethod,
        a: &ArtifactSet,
    ) -> Flow {
        let project = a.staged_project.clone();
        match method {
            RegistrationMethod::PhaseCorrelation => {
                self.execute(
                    reporter,
                    StageOperation::PairwiseShifts {
                        project: project.clone(),
                    },
                )?;
                self.execute(
                    reporter,
                    StageOperation::FilterShifts {
                        project: project.clone(),
                        min_correlation: MIN_LINK_CORRELATION,
                        max_correlation: MAX_LINK_CORRELATION,
                    },
                )?;
                self.execute(
                    reporter,
                    StageOperation::GlobalOptimize {
                        project,
                        relative_threshold: OPTIMIZATION_RELATIVE_THRESHOLD,
                        absolute_threshold: OPTIMIZATION_ABSOLUTE_THRESHOLD,
                    },
                )
            }
            RegistrationMethod::InterestPoints(params) => {
                self.execute(
                    reporter,
                    StageOperation::DetectInterestPoints {
                        project: project.clone(),
                        params: params.clone(),
                    },
                )?;
                self.execute(reporter, StageOperation::RegisterInterestPoints { project })
            }
        }
    }

    /// Returns the written output format, or `None` when fusion was skipped.
    fn fuse(
        &self,
        reporter: &mut JobReporter,
        job: &Job,
        a: &ArtifactSet,
        metadata: &DatasetMetadata,
    ) -> Flow<Option<FusionOutput>> {
        let config = &job.config;
        let planner = ResourcePlanner::new(config.resources.clone());

        let artifact_bytes = planner
            .artifact_bytes(&a.resaved_container, &a.input)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Could not size the dataset, treating it as unbounded");
                u64::MAX
            });
        let free = config.resources.free_memory();
        info!(
            dataset = %format_bytes(artifact_bytes),
            free = %format_bytes(free),
            "Checking fusion memory"
        );

        let estimate = planner.estimate(artifact_bytes, metadata, config.downsampling, free);
        info!(tier = %estimate.tier, strategy = %estimate.strategy, "Fusion mode");

        match decide_fusion(&estimate, self.confirmation) {
            FusionPlan::Skip => {
                reporter.record_fusion(FusionSummary {
                    estimate,
                    mode: None,
                });
                self.skip(reporter, Stage::Fuse, "insufficient resources");
                Ok(None)
            }
            FusionPlan::Fuse { strategy, output } => {
                reporter.record_fusion(FusionSummary {
                    estimate,
                    mode: Some((strategy, output)),
                });
                if output == FusionOutput::Tiff {
                    self.execute(
                        reporter,
                        StageOperation::RestageTiff {
                            project: a.staged_project.clone(),
                            export: a.staged_project.clone(),
                        },
                    )?;
                }
                self.execute(
                    reporter,
                    StageOperation::Fuse {
                        project: a.staged_project.clone(),
                        export: a.fused_project.clone(),
                        downsampling: config.downsampling,
                        strategy,
                        output,
                    },
                )?;
                self.executor.reclaim(
                    config.reclaim.passes,
                    Duration::from_secs(config.reclaim.pause_secs),
                );
                Ok(Some(output))
            }
        }
    }

    /// Returns whether the final-format output was written.
    fn convert(
        &self,
        reporter: &mut JobReporter,
        job: &Job,
        a: &ArtifactSet,
        fused: Option<FusionOutput>,
    ) -> Flow<bool> {
        let config = &job.config;
        if !config.convert_to_final_format {
            self.skip(reporter, Stage::ConvertFormat, "not requested");
            return Ok(false);
        }
        let Some(output) = fused else {
            self.skip(reporter, Stage::ConvertFormat, "fusion did not run");
            return Ok(false);
        };
        let Some(install) = locate_converter(&config.converter) else {
            warn!("Can't find a converter installation, conversion will be skipped");
            self.skip(reporter, Stage::ConvertFormat, "no installation found");
            return Ok(false);
        };

        let input = match output {
            FusionOutput::Tiff => a.first_fused_tiff(),
            FusionOutput::Container => a.fused_project.clone(),
        };
        self.execute(
            reporter,
            StageOperation::Convert {
                executable: install.executable(&config.converter),
                working_dir: install.dir.clone(),
                input,
                output: a.final_output.clone(),
                format: config.converter.output_format.clone(),
            },
        )?;
        Ok(true)
    }

    /// Best effort: never aborts the job.
    fn cleanup(
        &self,
        reporter: &mut JobReporter,
        job: &Job,
        a: &ArtifactSet,
        fused: Option<FusionOutput>,
        converted: bool,
    ) {
        let config = &job.config;
        let reason = if !config.delete_intermediate {
            Some("not requested")
        } else if !config.fuse {
            Some("fusion not requested, intermediate files kept")
        } else if fused.is_none() {
            Some("fusion did not run, intermediate files kept")
        } else if a.fused_in_temp() && !converted {
            Some("fused output only exists in the temp directory")
        } else {
            None
        };
        if let Some(reason) = reason {
            self.skip(reporter, Stage::Cleanup, reason);
            return;
        }

        self.progress.begin_stage(Stage::Cleanup);
        let start = Instant::now();
        let result = match cleanup_temp(&a.temp_dir) {
            CleanupOutcome::Removed | CleanupOutcome::AlreadyAbsent => {
                StageResult::succeeded(Stage::Cleanup, start.elapsed())
            }
            CleanupOutcome::Failed(e) => StageResult::warning(
                Stage::Cleanup,
                format!("temp directory not removed: {e}"),
                start.elapsed(),
            ),
        };
        self.progress.finish_stage(&result);
        reporter.record(result);
    }

    fn stage_artifacts(&self, reporter: &mut JobReporter, a: &ArtifactSet) -> Flow {
        self.progress.begin_stage(Stage::StageArtifacts);
        let start = Instant::now();
        let result = match prepare_working_area(a) {
            Ok(()) => StageResult::succeeded(Stage::StageArtifacts, start.elapsed()),
            Err(e) => {
                warn!(error = %e, "Could not stage artifacts");
                StageResult::failed(Stage::StageArtifacts, e.to_string(), start.elapsed())
            }
        };
        self.finish(reporter, result)
    }

    fn execute(&self, reporter: &mut JobReporter, op: StageOperation) -> Flow {
        self.progress.begin_stage(op.stage());
        let result = self.executor.run(&op);
        self.finish(reporter, result)
    }

    fn finish(&self, reporter: &mut JobReporter, result: StageResult) -> Flow {
        self.progress.finish_stage(&result);
        let failed = result.is_failure();
        reporter.record(result);
        if failed {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    fn skip(&self, reporter: &mut JobReporter, stage: Stage, reason: &str) {
        info!(%stage, reason, "Skipping stage");
        let result = StageResult::skipped(stage, reason);
        self.progress.finish_stage(&result);
        reporter.record(result);
    }

    fn finalize(&self, job: &Job, a: &ArtifactSet, reporter: &JobReporter) -> Report {
        self.progress.begin_stage(Stage::Finalize);
        let start = Instant::now();

        let mut report = reporter.summarize();
        report.notification =
            reporter.notify(&report, job.config.notification_recipient(), self.notifier);

        for line in report.render().lines() {
            info!("{line}");
        }
        if let Err(e) = report.write_to(&a.summary) {
            warn!(path = %a.summary.display(), error = %e, "Could not write job summary");
        }

        self.progress
            .finish_stage(&StageResult::succeeded(Stage::Finalize, start.elapsed()));
        report
    }
}

/// Copy the canonical project into the temp directory and the fused-output
/// location; the engine only ever rewrites the copies.
fn prepare_working_area(a: &ArtifactSet) -> Result<()> {
    let staged = stage_project(&a.project, &a.temp_dir)?;
    info!(staged = %staged.display(), "Working area ready");
    promote_project(&a.project, &a.fused_project)?;
    Ok(())
}
