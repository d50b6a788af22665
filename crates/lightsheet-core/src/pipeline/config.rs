use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_DOG_SIGMA, DEFAULT_DOG_THRESHOLD, DEFAULT_MAX_DETECTIONS, DEFAULT_RECLAIM_PASSES,
    DEFAULT_RECLAIM_PAUSE_SECS, DEFAULT_SMTP_RELAY, DEFAULT_SMTP_SENDER,
};
use crate::convert::ConverterConfig;
use crate::error::{PipelineError, Result};
use crate::resources::ResourcePolicy;

/// Recognized options for one job. Read once by the controller, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub reader: ReaderVariant,
    pub registration: RegistrationMethod,
    pub autoselect_illumination: bool,
    pub fuse: bool,
    pub convert_to_final_format: bool,
    pub delete_intermediate: bool,
    /// Downsampling of the fused image, 1 = full resolution.
    pub downsampling: u32,
    pub notification_target: Option<String>,
    /// Root for the temp working directory instead of the input's folder.
    pub temp_directory: Option<PathBuf>,
    pub resave: ResaveConfig,
    pub resources: ResourcePolicy,
    pub engine: EngineConfig,
    pub converter: ConverterConfig,
    pub notification: NotificationConfig,
    pub reclaim: ReclaimConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reader: ReaderVariant::default(),
            registration: RegistrationMethod::default(),
            autoselect_illumination: false,
            fuse: true,
            convert_to_final_format: true,
            delete_intermediate: true,
            downsampling: 1,
            notification_target: None,
            temp_directory: None,
            resave: ResaveConfig::default(),
            resources: ResourcePolicy::default(),
            engine: EngineConfig::default(),
            converter: ConverterConfig::default(),
            notification: NotificationConfig::default(),
            reclaim: ReclaimConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject invalid values before any stage runs.
    pub fn validate(&self) -> Result<()> {
        if self.downsampling == 0 {
            return Err(PipelineError::Configuration(
                "downsampling must be at least 1".into(),
            ));
        }
        if let Some(target) = self.notification_recipient() {
            if !is_plausible_address(target) {
                return Err(PipelineError::Configuration(format!(
                    "notification target {target:?} is not an email address"
                )));
            }
        }
        if !is_plausible_address(&self.notification.sender) {
            return Err(PipelineError::Configuration(format!(
                "notification sender {:?} is not an email address",
                self.notification.sender
            )));
        }
        if let Some(dir) = &self.temp_directory {
            if dir.as_os_str().is_empty() {
                return Err(PipelineError::Configuration(
                    "temp_directory must not be empty".into(),
                ));
            }
        }
        if let RegistrationMethod::InterestPoints(params) = &self.registration {
            params.validate()?;
        }
        self.resources.validate()?;
        self.converter.validate()?;
        Ok(())
    }

    /// Notification target with blank values treated as absent.
    pub fn notification_recipient(&self) -> Option<&str> {
        self.notification_target
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

fn is_plausible_address(address: &str) -> bool {
    let address = address.trim();
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !address.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Acquisition layout, selects the dataset loader.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReaderVariant {
    /// Tiles written by the acquisition software's own tiling mode.
    #[default]
    ZenTiling,
    /// Tiles written by the tile-scan macro.
    TileScanMacro,
}

impl ReaderVariant {
    /// Loader name understood by the engine.
    pub fn loader(&self) -> &'static str {
        match self {
            Self::ZenTiling => "Zeiss Lightsheet 7 Dataset Loader (Bioformats)",
            Self::TileScanMacro => "Zeiss Lightsheet Z.1 Dataset Loader (Bioformats)",
        }
    }
}

impl std::fmt::Display for ReaderVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZenTiling => write!(f, "LightSheet 7 (Zen tiling)"),
            Self::TileScanMacro => write!(f, "LightSheet Z.1 / 7 (Tile scan macro)"),
        }
    }
}

/// How tiles are registered against each other.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum RegistrationMethod {
    /// Pairwise phase correlation, link filtering and global optimization.
    #[default]
    PhaseCorrelation,
    /// Bead-based interest points with descriptor matching.
    InterestPoints(InterestPointConfig),
}

impl std::fmt::Display for RegistrationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PhaseCorrelation => write!(f, "Phase Correlation"),
            Self::InterestPoints(p) => write!(
                f,
                "Interest Points (sigma {}, threshold {})",
                p.sigma, p.threshold
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestPointConfig {
    /// Difference-of-Gaussian sigma.
    pub sigma: f64,
    /// Difference-of-Gaussian detection threshold.
    pub threshold: f64,
    pub max_detections: u32,
}

impl Default for InterestPointConfig {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_DOG_SIGMA,
            threshold: DEFAULT_DOG_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
        }
    }
}

impl InterestPointConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(PipelineError::Configuration(format!(
                "interest point sigma must be positive, got {}",
                self.sigma
            )));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(PipelineError::Configuration(format!(
                "interest point threshold must be positive, got {}",
                self.threshold
            )));
        }
        if self.max_detections == 0 {
            return Err(PipelineError::Configuration(
                "interest point max_detections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResaveConfig {
    /// Deflate-compress the container written by the resave stage.
    pub deflate_compression: bool,
}

/// Location and arguments of the registration/fusion engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub executable: PathBuf,
    /// Arguments placed before the macro expression.
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let executable = if cfg!(windows) {
            "ImageJ-win64.exe"
        } else if cfg!(target_os = "macos") {
            "ImageJ-macosx"
        } else {
            "ImageJ-linux64"
        };
        Self {
            executable: PathBuf::from(executable),
            args: vec!["--headless".into(), "--console".into()],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// SMTP relay as `host:port`.
    pub relay: String,
    pub sender: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            relay: DEFAULT_SMTP_RELAY.into(),
            sender: DEFAULT_SMTP_SENDER.into(),
        }
    }
}

/// Memory reclamation between heavy stages.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReclaimConfig {
    pub passes: u32,
    pub pause_secs: u64,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            passes: DEFAULT_RECLAIM_PASSES,
            pause_secs: DEFAULT_RECLAIM_PAUSE_SECS,
        }
    }
}
