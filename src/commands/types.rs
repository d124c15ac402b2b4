//! Type definitions for command responses.

use serde::Serialize;
use std::fmt;

use crate::network::processing::LimiterPhase;
use crate::utils::format_limit;

/// Point-in-time view of a limiter, as shown by the console.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimiterStatus {
    /// Current lifecycle phase
    pub phase: LimiterPhase,
    /// Download limit in Mbps (0 = unlimited)
    pub download_mbps: f64,
    /// Upload limit in Mbps (0 = unlimited)
    pub upload_mbps: f64,
    /// Download bucket balance in bytes, `None` when unlimited
    pub inbound_tokens: Option<f64>,
    /// Upload bucket balance in bytes, `None` when unlimited
    pub outbound_tokens: Option<f64>,
}

impl fmt::Display for LimiterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            LimiterPhase::Running => write!(
                f,
                "Running (DL: {}, UL: {})",
                format_limit(self.download_mbps),
                format_limit(self.upload_mbps)
            ),
            LimiterPhase::Starting => f.write_str("Starting"),
            LimiterPhase::Stopping => f.write_str("Stopping"),
            LimiterPhase::Stopped => f.write_str("Stopped"),
        }
    }
}
