use tracing::{info, warn};

use crate::resources::{FusionOutput, FusionStrategy, ResourceEstimate, SlowFusionPolicy};

/// Decides whether fusion may take the slow disk-backed path when the
/// memory estimate does not permit it.
pub trait FusionConfirmation {
    fn confirm_slow_fusion(&self, estimate: &ResourceEstimate) -> bool;
}

/// Applies a [`SlowFusionPolicy`], delegating `Ask` to an interactive prompt
/// when one is available. Without a prompt, `Ask` refuses.
pub struct PolicyConfirmation<'a> {
    policy: SlowFusionPolicy,
    prompt: Option<&'a dyn FusionConfirmation>,
}

impl<'a> PolicyConfirmation<'a> {
    pub fn new(policy: SlowFusionPolicy) -> Self {
        Self {
            policy,
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: &'a dyn FusionConfirmation) -> Self {
        self.prompt = Some(prompt);
        self
    }
}

impl FusionConfirmation for PolicyConfirmation<'_> {
    fn confirm_slow_fusion(&self, estimate: &ResourceEstimate) -> bool {
        match self.policy {
            SlowFusionPolicy::Accept => true,
            SlowFusionPolicy::Refuse => false,
            SlowFusionPolicy::Ask => match self.prompt {
                Some(prompt) => prompt.confirm_slow_fusion(estimate),
                None => {
                    warn!("No interactive channel to confirm slow fusion, refusing");
                    false
                }
            },
        }
    }
}

/// Fusion step chosen for a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FusionPlan {
    Skip,
    Fuse {
        strategy: FusionStrategy,
        output: FusionOutput,
    },
}

/// Permitted estimates fuse to TIFF with the estimated strategy. Otherwise
/// fusion only runs, writing the container format, when confirmed.
pub fn decide_fusion(
    estimate: &ResourceEstimate,
    confirmation: &dyn FusionConfirmation,
) -> FusionPlan {
    if estimate.fusion_permitted {
        return FusionPlan::Fuse {
            strategy: estimate.strategy,
            output: FusionOutput::Tiff,
        };
    }
    if confirmation.confirm_slow_fusion(estimate) {
        info!(strategy = %estimate.strategy, "Slow fusion confirmed, writing HDF5");
        FusionPlan::Fuse {
            strategy: estimate.strategy,
            output: FusionOutput::Container,
        }
    } else {
        info!("Fusion skipped: insufficient memory");
        FusionPlan::Skip
    }
}
