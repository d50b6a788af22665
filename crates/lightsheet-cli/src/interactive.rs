use std::sync::Mutex;
use std::time::Duration;

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use lightsheet_core::pipeline::{
    FusionConfirmation, ProgressReporter, Stage, StageResult, StageStatus,
};
use lightsheet_core::resources::{format_bytes, ResourceEstimate};

/// Asks the operator on the attached terminal before slow fusion.
pub struct TerminalPrompt {
    term: Term,
}

impl TerminalPrompt {
    /// `None` when stdout is not a terminal, e.g. in batch runs.
    pub fn detect() -> Option<Self> {
        let term = Term::stdout();
        term.is_term().then_some(Self { term })
    }
}

impl FusionConfirmation for TerminalPrompt {
    fn confirm_slow_fusion(&self, estimate: &ResourceEstimate) -> bool {
        let warning = format!(
            "Not enough memory for fast fusion: {} dataset, {} free, {} per fused volume.",
            format_bytes(estimate.artifact_bytes),
            format_bytes(estimate.free_memory_bytes),
            format_bytes(estimate.working_set_bytes),
        );
        let _ = self.term.write_line(&style(warning).yellow().to_string());
        let _ = self.term.write_str(&format!(
            "Fuse anyway with the {} strategy to HDF5? This can take a very long time. [y/N] ",
            estimate.strategy
        ));
        match self.term.read_line() {
            Ok(answer) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// One spinner per running stage, cleared when the stage ends.
#[derive(Default)]
pub struct StageSpinner {
    current: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter for StageSpinner {
    fn begin_stage(&self, stage: Stage) {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) =
            ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]")
        {
            pb.set_style(spinner_style);
        }
        pb.set_message(stage.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut current) = self.current.lock() {
            if let Some(previous) = current.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn finish_stage(&self, result: &StageResult) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(pb) = current.take() {
                pb.finish_and_clear();
            }
        }
        let marker = match &result.status {
            StageStatus::Succeeded => style("done").green(),
            StageStatus::Skipped(_) => style("skip").dim(),
            StageStatus::Warning(_) => style("warn").yellow(),
            StageStatus::Failed(_) => style("FAIL").red().bold(),
        };
        println!("  [{marker}] {:<26} {}", result.stage.to_string(), result.status);
    }
}
