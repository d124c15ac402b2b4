use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of the shaping loop.
///
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LimiterPhase {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl LimiterPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LimiterPhase::Starting,
            2 => LimiterPhase::Running,
            3 => LimiterPhase::Stopping,
            _ => LimiterPhase::Stopped,
        }
    }
}

impl fmt::Display for LimiterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LimiterPhase::Stopped => "stopped",
            LimiterPhase::Starting => "starting",
            LimiterPhase::Running => "running",
            LimiterPhase::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Shared, lock-free holder of the current [`LimiterPhase`].
#[derive(Debug, Clone)]
pub struct PhaseCell(Arc<AtomicU8>);

impl Default for PhaseCell {
    fn default() -> Self {
        Self(Arc::new(AtomicU8::new(LimiterPhase::Stopped as u8)))
    }
}

impl PhaseCell {
    pub fn get(&self) -> LimiterPhase {
        LimiterPhase::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, phase: LimiterPhase) {
        self.0.store(phase as u8, Ordering::SeqCst);
    }

    /// Moves from `from` to `to` only if the phase is still `from`.
    pub fn transition(&self, from: LimiterPhase, to: LimiterPhase) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
