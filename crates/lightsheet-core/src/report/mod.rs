mod notify;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::error::Result;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::{Job, Stage, StageResult, StageStatus};
use crate::resources::{FusionOutput, FusionStrategy, ResourceEstimate};

pub use notify::{Notification, Notifier, SmtpNotifier};

/// Overall result of a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed { stage: Stage, message: String },
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed { stage, message } => write!(f, "failed at {stage}: {message}"),
        }
    }
}

/// What happened to the end-of-job notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationStatus {
    NotRequested,
    Sent { recipient: String },
    Failed { recipient: String, error: String },
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotRequested => write!(f, "not requested"),
            Self::Sent { recipient } => write!(f, "sent to {recipient}"),
            Self::Failed { recipient, error } => {
                write!(f, "could not be sent to {recipient} ({error})")
            }
        }
    }
}

/// Fusion decision as shown in the summary.
#[derive(Clone, Debug, PartialEq)]
pub struct FusionSummary {
    pub estimate: ResourceEstimate,
    /// `None` when fusion was not run.
    pub mode: Option<(FusionStrategy, FusionOutput)>,
}

/// End-of-job summary.
#[derive(Clone, Debug)]
pub struct Report {
    pub name: String,
    pub input: PathBuf,
    pub created_at: DateTime<Local>,
    pub config: PipelineConfig,
    pub stages: Vec<StageResult>,
    pub fusion: Option<FusionSummary>,
    pub outcome: JobOutcome,
    pub total_elapsed: Duration,
    pub notification: NotificationStatus,
}

impl Report {
    pub fn succeeded(&self) -> bool {
        self.outcome == JobOutcome::Succeeded
    }

    /// Total run time rounded to whole minutes.
    pub fn total_minutes(&self) -> u64 {
        (self.total_elapsed.as_secs_f64() / 60.0).round() as u64
    }

    pub fn status_of(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.status)
    }

    /// Stages in the order they were dispatched, skips excluded.
    pub fn executed_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|r| !matches!(r.status, StageStatus::Skipped(_)))
            .map(|r| r.stage)
            .collect()
    }

    /// Human-readable summary: configuration echo, fusion mode, per-stage
    /// status and total time.
    pub fn render(&self) -> String {
        let c = &self.config;
        let mut out = String::new();
        let _ = writeln!(out, "~~~ Job summary ~~~");
        let _ = writeln!(out, "Filename: {}", self.name);
        let _ = writeln!(out, "Started: {}", self.created_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Reader: {}", c.reader);
        let _ = writeln!(out, "Registration: {}", c.registration);
        let _ = writeln!(
            out,
            "Automatically select best illumination side: {}",
            c.autoselect_illumination
        );
        let _ = writeln!(out, "Fuse image: {}", c.fuse);
        if c.fuse {
            let mode = match &self.fusion {
                Some(FusionSummary {
                    mode: Some((strategy, output)),
                    ..
                }) => format!("{strategy} ({output})"),
                Some(FusionSummary { mode: None, .. }) => "skipped".to_string(),
                None => "not reached".to_string(),
            };
            let _ = writeln!(out, "Fusion mode: {mode}");
        }
        let _ = writeln!(out, "Downsample fused image: {}", c.downsampling);
        let _ = writeln!(
            out,
            "Convert fused image to {}: {}",
            c.converter.output_format, c.convert_to_final_format
        );
        let _ = writeln!(out, "Delete intermediate files: {}", c.delete_intermediate);
        let _ = writeln!(
            out,
            "Send info email to: {}",
            c.notification_recipient().unwrap_or("(none)")
        );
        let _ = writeln!(out, "Stages:");
        for result in &self.stages {
            let _ = writeln!(
                out,
                "  {:<26}{:>8.1} min  {}",
                result.stage.to_string(),
                result.elapsed.as_secs_f64() / 60.0,
                result.status
            );
        }
        let _ = writeln!(out, "Notification: {}", self.notification);
        let _ = writeln!(out, "Outcome: {}", self.outcome);
        let _ = writeln!(out, "Total time in minutes: {}", self.total_minutes());
        out
    }

    /// Persist the rendered summary.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

/// Collects stage results at stage boundaries.
pub struct JobReporter {
    name: String,
    input: PathBuf,
    created_at: DateTime<Local>,
    config: PipelineConfig,
    started: Instant,
    stages: Vec<StageResult>,
    fusion: Option<FusionSummary>,
}

impl JobReporter {
    pub fn new(job: &Job) -> Self {
        Self {
            name: job.display_name(),
            input: job.input.clone(),
            created_at: job.created_at,
            config: job.config.clone(),
            started: Instant::now(),
            stages: Vec::new(),
            fusion: None,
        }
    }

    pub fn record(&mut self, result: StageResult) {
        self.stages.push(result);
    }

    pub fn record_fusion(&mut self, summary: FusionSummary) {
        self.fusion = Some(summary);
    }

    /// Build the report. The first failed stage decides the outcome.
    pub fn summarize(&self) -> Report {
        let outcome = self
            .stages
            .iter()
            .find_map(|r| match &r.status {
                StageStatus::Failed(message) => Some(JobOutcome::Failed {
                    stage: r.stage,
                    message: message.clone(),
                }),
                _ => None,
            })
            .unwrap_or(JobOutcome::Succeeded);

        Report {
            name: self.name.clone(),
            input: self.input.clone(),
            created_at: self.created_at,
            config: self.config.clone(),
            stages: self.stages.clone(),
            fusion: self.fusion.clone(),
            outcome,
            total_elapsed: self.started.elapsed(),
            notification: NotificationStatus::NotRequested,
        }
    }

    /// Send the end-of-job message. Fire-and-forget: failures are logged and
    /// returned as a status, never as an error.
    pub fn notify(
        &self,
        report: &Report,
        target: Option<&str>,
        notifier: &dyn Notifier,
    ) -> NotificationStatus {
        let Some(recipient) = target else {
            info!("No notification target, no email was sent");
            return NotificationStatus::NotRequested;
        };
        let message =
            Notification::for_report(report, &self.config.notification.sender, recipient);
        match notifier.send(&message) {
            Ok(()) => {
                info!(recipient, "Sent notification");
                NotificationStatus::Sent {
                    recipient: recipient.to_string(),
                }
            }
            Err(e) => {
                warn!(recipient, error = %e, "Could not send notification");
                NotificationStatus::Failed {
                    recipient: recipient.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }
}
