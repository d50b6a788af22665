use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::{debug, info};

use crate::consts::{
    DEFAULT_IN_MEMORY_MULTIPLIER, DEFAULT_MARGIN_DIVISOR, DEFAULT_SOURCE_SIZE_DIVISOR,
    DEFAULT_WORKING_SET_MULTIPLIER,
};
use crate::error::{PipelineError, Result};
use crate::metadata::DatasetMetadata;

/// How the fusion engine holds the fused volume while blending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FusionStrategy {
    /// Precompute the whole fused image in memory.
    #[default]
    InMemory,
    /// Compute blocks on demand, backed by disk.
    Virtual,
    /// Compute blocks on demand and keep a partial cache.
    Cached,
}

impl FusionStrategy {
    /// Selector understood by the fusion engine.
    pub fn engine_selector(&self) -> &'static str {
        match self {
            Self::InMemory => "[Precompute Image]",
            Self::Virtual => "Virtual",
            Self::Cached => "Cached",
        }
    }
}

impl fmt::Display for FusionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => write!(f, "In Memory"),
            Self::Virtual => write!(f, "Virtual"),
            Self::Cached => write!(f, "Cached"),
        }
    }
}

/// Format the fused volume is written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FusionOutput {
    /// New project backed by one TIFF per timepoint and channel.
    Tiff,
    /// New project backed by the multiresolution container.
    Container,
}

impl FusionOutput {
    /// Selector understood by the fusion engine.
    pub fn engine_selector(&self) -> &'static str {
        match self {
            Self::Tiff => "[Save as new XML Project (TIFF)]",
            Self::Container => "[Save as new XML Project (HDF5)]",
        }
    }
}

impl fmt::Display for FusionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tiff => write!(f, "TIFF"),
            Self::Container => write!(f, "HDF5"),
        }
    }
}

/// Memory pressure tiers, ordered from least to most permissive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResourceTier {
    Insufficient,
    DiskBacked,
    InMemory,
}

impl fmt::Display for ResourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insufficient => write!(f, "Insufficient"),
            Self::DiskBacked => write!(f, "Disk Backed"),
            Self::InMemory => write!(f, "In Memory"),
        }
    }
}

/// What to do when fusion would need more memory than the policy allows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlowFusionPolicy {
    /// Ask the operator when a terminal is attached, refuse otherwise.
    #[default]
    Ask,
    /// Run the slow disk-backed fusion without asking.
    Accept,
    /// Never run the slow disk-backed fusion.
    Refuse,
}

impl fmt::Display for SlowFusionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ask => write!(f, "Ask"),
            Self::Accept => write!(f, "Accept"),
            Self::Refuse => write!(f, "Refuse"),
        }
    }
}

/// Tunable safety margins for the fusion memory estimate.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePolicy {
    /// Free memory must exceed this multiple of the downsampled artifact size
    /// to fuse fully in memory.
    pub in_memory_multiplier: f64,
    /// Decoded size of one timepoint/channel relative to its compressed share.
    pub working_set_multiplier: f64,
    /// Fraction of free memory (1 / divisor) the working set may occupy.
    pub margin_divisor: f64,
    /// Raw acquisition size / this = estimated container size.
    pub source_size_divisor: f64,
    /// Strategy used below the in-memory tier.
    pub disk_backed_strategy: FusionStrategy,
    pub slow_fusion: SlowFusionPolicy,
    /// Use this instead of probing the host's available memory.
    pub free_memory_override: Option<u64>,
}

impl Default for ResourcePolicy {
    fn default() -> Self {
        Self {
            in_memory_multiplier: DEFAULT_IN_MEMORY_MULTIPLIER,
            working_set_multiplier: DEFAULT_WORKING_SET_MULTIPLIER,
            margin_divisor: DEFAULT_MARGIN_DIVISOR,
            source_size_divisor: DEFAULT_SOURCE_SIZE_DIVISOR,
            disk_backed_strategy: FusionStrategy::Virtual,
            slow_fusion: SlowFusionPolicy::default(),
            free_memory_override: None,
        }
    }
}

impl ResourcePolicy {
    pub fn validate(&self) -> Result<()> {
        let factors = [
            ("in_memory_multiplier", self.in_memory_multiplier),
            ("working_set_multiplier", self.working_set_multiplier),
            ("margin_divisor", self.margin_divisor),
            ("source_size_divisor", self.source_size_divisor),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::Configuration(format!(
                    "resources.{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.disk_backed_strategy == FusionStrategy::InMemory {
            return Err(PipelineError::Configuration(
                "resources.disk_backed_strategy cannot be InMemory".into(),
            ));
        }
        Ok(())
    }

    /// Free memory to plan with: the override if set, otherwise a host probe.
    pub fn free_memory(&self) -> u64 {
        self.free_memory_override.unwrap_or_else(available_memory)
    }
}

/// Outcome of one memory estimate.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceEstimate {
    pub artifact_bytes: u64,
    pub free_memory_bytes: u64,
    pub downsampling: u32,
    /// Predicted peak memory for one timepoint/channel of the fused output.
    pub working_set_bytes: u64,
    pub tier: ResourceTier,
    pub strategy: FusionStrategy,
    pub fusion_permitted: bool,
}

/// Picks a fusion strategy from dataset size and free memory.
#[derive(Clone, Debug, Default)]
pub struct ResourcePlanner {
    policy: ResourcePolicy,
}

impl ResourcePlanner {
    pub fn new(policy: ResourcePolicy) -> Self {
        Self { policy }
    }

    /// Estimate the fusion working set and choose a tier.
    ///
    /// The estimate depends only on its arguments, so a changed downsampling
    /// factor always yields a fresh value.
    pub fn estimate(
        &self,
        artifact_bytes: u64,
        metadata: &DatasetMetadata,
        downsampling: u32,
        free_memory_bytes: u64,
    ) -> ResourceEstimate {
        let downsampling = downsampling.max(1);
        let factor = f64::from(downsampling);
        let size = artifact_bytes as f64;
        let free = free_memory_bytes as f64;

        let per_volume = size / (metadata.fused_volumes().max(1) as f64 * factor);
        let working_set = per_volume * self.policy.working_set_multiplier;
        let in_memory_threshold = self.policy.in_memory_multiplier * size / factor;

        let tier = if free > in_memory_threshold {
            ResourceTier::InMemory
        } else if working_set < free / self.policy.margin_divisor {
            ResourceTier::DiskBacked
        } else {
            ResourceTier::Insufficient
        };
        let strategy = match tier {
            ResourceTier::InMemory => FusionStrategy::InMemory,
            _ => self.policy.disk_backed_strategy,
        };

        debug!(
            artifact = %format_bytes(artifact_bytes),
            free = %format_bytes(free_memory_bytes),
            working_set = %format_bytes(working_set as u64),
            %tier,
            "Estimated fusion memory"
        );

        ResourceEstimate {
            artifact_bytes,
            free_memory_bytes,
            downsampling,
            working_set_bytes: working_set.round() as u64,
            tier,
            strategy,
            fusion_permitted: tier != ResourceTier::Insufficient,
        }
    }

    /// Size of the artifact fusion will read: the resaved container when it
    /// exists, otherwise a fraction of the raw acquisition.
    pub fn artifact_bytes(&self, container: &Path, acquisition: &Path) -> Result<u64> {
        if let Ok(meta) = std::fs::metadata(container) {
            if meta.is_file() {
                return Ok(meta.len());
            }
        }
        let raw = std::fs::metadata(acquisition)?.len();
        let estimated = (raw as f64 / self.policy.source_size_divisor) as u64;
        info!(
            raw = %format_bytes(raw),
            estimated = %format_bytes(estimated),
            "No resaved container found, estimating from acquisition size"
        );
        Ok(estimated)
    }
}

/// Memory currently available to new allocations on this host, in bytes.
pub fn available_memory() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory()
}

/// Render a byte count with a binary unit, e.g. `1.5 GB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    for unit in &UNITS[..UNITS.len() - 1] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} {}", UNITS[UNITS.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(512), "512.0 bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_bytes(u64::MAX), "16777216.0 TB");
    }
}
