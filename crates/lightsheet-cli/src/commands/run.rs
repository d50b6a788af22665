use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use lightsheet_core::engine::FijiBackend;
use lightsheet_core::pipeline::config::{
    InterestPointConfig, PipelineConfig, ReaderVariant, RegistrationMethod,
};
use lightsheet_core::pipeline::{Job, PipelineController, PolicyConfirmation};
use lightsheet_core::report::SmtpNotifier;
use lightsheet_core::resources::SlowFusionPolicy;

use crate::interactive::{StageSpinner, TerminalPrompt};
use crate::summary::{print_job_summary, print_report};

#[derive(Clone, Copy, ValueEnum)]
pub enum ReaderArg {
    /// Tiles from the acquisition software's tiling mode
    Zen,
    /// Tiles from the tile-scan macro
    Macro,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RegistrationArg {
    PhaseCorrelation,
    InterestPoints,
}

/// Job options shared by `run` and `plan`.
#[derive(Args)]
pub struct JobArgs {
    /// First acquisition file (.czi)
    pub file: PathBuf,

    /// Job config file (TOML); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Acquisition layout
    #[arg(long, value_enum)]
    pub reader: Option<ReaderArg>,

    /// Tile registration method
    #[arg(long, value_enum)]
    pub registration: Option<RegistrationArg>,

    /// Keep only the brightest illumination side
    #[arg(long)]
    pub autoselect_illumination: bool,

    /// Stop after registration
    #[arg(long)]
    pub no_fuse: bool,

    /// Keep the fused project instead of converting it
    #[arg(long)]
    pub no_convert: bool,

    /// Keep the temp working directory
    #[arg(long)]
    pub keep_intermediate: bool,

    /// Downsampling of the fused image (1 = full resolution)
    #[arg(long)]
    pub downsampling: Option<u32>,

    /// Email address notified when the job ends
    #[arg(long)]
    pub notify: Option<String>,

    /// Root for the temp working directory
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Path to the Fiji executable
    #[arg(long)]
    pub fiji: Option<PathBuf>,

    /// Plan with this much free memory (GB) instead of probing the host
    #[arg(long)]
    pub free_memory_gb: Option<f64>,

    /// Run slow disk-backed fusion without asking
    #[arg(short, long, conflicts_with = "refuse_slow_fusion")]
    pub yes: bool,

    /// Skip fusion instead of running it slowly
    #[arg(long)]
    pub refuse_slow_fusion: bool,
}

impl JobArgs {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn build_config(&self) -> Result<PipelineConfig> {
        let mut config = if let Some(ref config_path) = self.config {
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            toml::from_str(&contents).context("Invalid job config")?
        } else {
            PipelineConfig::default()
        };

        if let Some(reader) = self.reader {
            config.reader = match reader {
                ReaderArg::Zen => ReaderVariant::ZenTiling,
                ReaderArg::Macro => ReaderVariant::TileScanMacro,
            };
        }
        match self.registration {
            Some(RegistrationArg::PhaseCorrelation) => {
                config.registration = RegistrationMethod::PhaseCorrelation;
            }
            Some(RegistrationArg::InterestPoints)
                if !matches!(config.registration, RegistrationMethod::InterestPoints(_)) =>
            {
                config.registration =
                    RegistrationMethod::InterestPoints(InterestPointConfig::default());
            }
            _ => {}
        }
        if self.autoselect_illumination {
            config.autoselect_illumination = true;
        }
        if self.no_fuse {
            config.fuse = false;
        }
        if self.no_convert {
            config.convert_to_final_format = false;
        }
        if self.keep_intermediate {
            config.delete_intermediate = false;
        }
        if let Some(downsampling) = self.downsampling {
            config.downsampling = downsampling;
        }
        if let Some(ref target) = self.notify {
            config.notification_target = Some(target.clone());
        }
        if let Some(ref dir) = self.temp_dir {
            config.temp_directory = Some(dir.clone());
        }
        if let Some(ref fiji) = self.fiji {
            config.engine.executable = fiji.clone();
        }
        if let Some(gb) = self.free_memory_gb {
            if !(gb.is_finite() && gb >= 0.0) {
                bail!("--free-memory-gb must be a non-negative number");
            }
            config.resources.free_memory_override = Some((gb * 1024.0 * 1024.0 * 1024.0) as u64);
        }
        if self.yes {
            config.resources.slow_fusion = SlowFusionPolicy::Accept;
        } else if self.refuse_slow_fusion {
            config.resources.slow_fusion = SlowFusionPolicy::Refuse;
        }

        Ok(config)
    }
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub job: JobArgs,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = args.job.build_config()?;
    let job = Job::new(&args.job.file, config);
    print_job_summary(&job);

    let backend = FijiBackend::new(&job.config.engine);
    let notifier = SmtpNotifier::new(job.config.notification.relay.clone());
    let prompt = TerminalPrompt::detect();
    let mut confirmation = PolicyConfirmation::new(job.config.resources.slow_fusion);
    if let Some(ref prompt) = prompt {
        confirmation = confirmation.with_prompt(prompt);
    }
    let spinner = Arc::new(StageSpinner::default());

    let report = PipelineController::new(&backend, &notifier, &confirmation)
        .with_progress(spinner)
        .run(&job)
        .context("Job rejected")?;

    print_report(&report);
    if !report.succeeded() {
        bail!("{}: {}", report.name, report.outcome);
    }
    Ok(())
}
