use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::pipeline::{Stage, StageResult};

use super::invocation::{marshal, Invocation};
use super::operation::StageOperation;

/// Executes marshaled invocations against the delegated tools.
///
/// Calls block until the tool finishes. An `Err` means the stage failed.
pub trait Backend {
    fn invoke(&self, stage: Stage, invocation: &Invocation) -> Result<()>;

    /// Whether [`Backend::reclaim_memory`] does anything. Backends that run
    /// each command in a fresh process leave this `false`.
    fn can_reclaim_memory(&self) -> bool {
        false
    }

    /// Ask the engine to release memory between heavy stages.
    fn reclaim_memory(&self) -> Result<()> {
        Ok(())
    }
}

/// Validates, marshals and dispatches one stage at a time.
///
/// Failures are captured in the returned [`StageResult`]; nothing is retried.
pub struct StageExecutor<'a> {
    backend: &'a dyn Backend,
}

impl<'a> StageExecutor<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    pub fn run(&self, op: &StageOperation) -> StageResult {
        let stage = op.stage();
        let start = Instant::now();

        if let Err(e) = op.validate() {
            error!(%stage, error = %e, "Rejected stage before dispatch");
            return StageResult::failed(stage, e.to_string(), start.elapsed());
        }

        let invocation = marshal(op);
        info!(%stage, "Running stage");
        debug!(%stage, invocation = %invocation, "Dispatching");

        match self.backend.invoke(stage, &invocation) {
            Ok(()) => {
                let elapsed = start.elapsed();
                info!(%stage, elapsed_s = elapsed.as_secs(), "Stage finished");
                StageResult::succeeded(stage, elapsed)
            }
            Err(e) => {
                error!(%stage, error = %e, "Stage failed");
                StageResult::failed(stage, e.to_string(), start.elapsed())
            }
        }
    }

    /// Fixed-backoff memory reclamation: `passes` requests, each followed by
    /// `pause`. Failures only log. Skipped entirely when the backend has
    /// nothing to reclaim.
    pub fn reclaim(&self, passes: u32, pause: Duration) {
        if passes == 0 {
            return;
        }
        if !self.backend.can_reclaim_memory() {
            debug!("Backend holds no memory between stages, skipping reclamation");
            return;
        }
        info!(passes, pause_s = pause.as_secs(), "Reclaiming engine memory");
        for pass in 1..=passes {
            if let Err(e) = self.backend.reclaim_memory() {
                warn!(pass, error = %e, "Memory reclamation failed");
            }
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
        }
    }
}
