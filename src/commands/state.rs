//! State shared between the control surface and the worker thread.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use crate::network::processing::{LoopOptions, PhaseCell, SharedLimiterState, WorkerContext};
use crate::network::shaping::{ShapingPolicy, ShapingStatistics};

/// Shared state of one limiter.
///
/// Every field is a cloneable handle; the worker receives clones through a
/// [`WorkerContext`].
#[derive(Debug, Clone)]
pub struct LimiterState {
    /// Cleared to ask the capture loop to exit
    pub running: Arc<AtomicBool>,
    /// Current lifecycle phase
    pub phase: PhaseCell,
    /// Rates and token buckets
    pub shared: SharedLimiterState,
    /// Statistics collected during shaping
    pub statistics: Arc<RwLock<ShapingStatistics>>,
}

impl Default for LimiterState {
    fn default() -> Self {
        Self::new(ShapingPolicy::default(), true)
    }
}

impl LimiterState {
    pub fn new(policy: ShapingPolicy, reset_on_reconfigure: bool) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            phase: PhaseCell::default(),
            shared: SharedLimiterState::new(policy, reset_on_reconfigure),
            statistics: Arc::new(RwLock::new(ShapingStatistics::default())),
        }
    }

    pub fn worker_context(&self, options: &LoopOptions) -> WorkerContext {
        WorkerContext {
            shared: self.shared.clone(),
            running: self.running.clone(),
            phase: self.phase.clone(),
            statistics: self.statistics.clone(),
            options: options.clone(),
        }
    }
}
