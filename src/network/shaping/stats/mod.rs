use crate::network::core::Direction;
use serde::Serialize;

pub mod direction_stats;
pub mod util;

pub use direction_stats::{DirectionSnapshot, DirectionStats};

/// Smoothing factor for the per-direction throughput averages
const THROUGHPUT_ALPHA: f64 = 0.2;

/// Statistics collected by the shaping loop, one tracker per direction.
#[derive(Debug, Clone)]
pub struct ShapingStatistics {
    /// Download traffic
    pub inbound: DirectionStats,
    /// Upload traffic
    pub outbound: DirectionStats,
}

/// Point-in-time copy of [`ShapingStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub inbound: DirectionSnapshot,
    pub outbound: DirectionSnapshot,
}

impl Default for ShapingStatistics {
    fn default() -> Self {
        Self {
            inbound: DirectionStats::new(THROUGHPUT_ALPHA),
            outbound: DirectionStats::new(THROUGHPUT_ALPHA),
        }
    }
}

impl ShapingStatistics {
    pub fn direction_mut(&mut self, direction: Direction) -> &mut DirectionStats {
        match direction {
            Direction::Inbound => &mut self.inbound,
            Direction::Outbound => &mut self.outbound,
        }
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            inbound: self.inbound.snapshot(),
            outbound: self.outbound.snapshot(),
        }
    }

    pub fn reset(&mut self) {
        self.inbound.reset();
        self.outbound.reset();
    }
}
