use crate::error::{LimiterError, Result};
use crate::network::processing::processor::{LoopOptions, DEFAULT_STATS_INTERVAL};
use crate::network::shaping::token_bucket::{ShapingPolicy, DEFAULT_DEBT_DELAY, DEFAULT_MAX_WAIT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_true() -> bool {
    true
}

fn default_max_wait_ms() -> u64 {
    DEFAULT_MAX_WAIT.as_millis() as u64
}

fn default_debt_delay_ms() -> u64 {
    DEFAULT_DEBT_DELAY.as_millis() as u64
}

fn default_stats_interval_ms() -> u64 {
    DEFAULT_STATS_INTERVAL.as_millis() as u64
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ShapingOptions {
    /// Longest shortage wait honoured exactly, in milliseconds
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Pause applied to packets admitted into debt, in milliseconds
    #[serde(default = "default_debt_delay_ms")]
    pub debt_delay_ms: u64,

    /// Refill both buckets to capacity whenever limits change
    #[serde(default = "default_true")]
    pub reset_on_reconfigure: bool,

    /// Interval between statistics log lines, in milliseconds
    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,
}

impl Default for ShapingOptions {
    fn default() -> Self {
        ShapingOptions {
            max_wait_ms: default_max_wait_ms(),
            debt_delay_ms: default_debt_delay_ms(),
            reset_on_reconfigure: true,
            stats_interval_ms: default_stats_interval_ms(),
        }
    }
}

impl ShapingOptions {
    pub fn validate(&self) -> Result<()> {
        if self.debt_delay_ms > self.max_wait_ms {
            return Err(LimiterError::Config(
                "debt_delay_ms cannot exceed max_wait_ms".to_string(),
            ));
        }
        if self.stats_interval_ms == 0 {
            return Err(LimiterError::Config(
                "stats_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn policy(&self) -> ShapingPolicy {
        ShapingPolicy {
            max_wait: Duration::from_millis(self.max_wait_ms),
            debt_delay: Duration::from_millis(self.debt_delay_ms),
        }
    }

    /// Loop options, with the receive buffer taken from the capture settings.
    pub fn loop_options(&self, buffer_size: usize) -> LoopOptions {
        LoopOptions {
            buffer_size,
            stats_interval: Duration::from_millis(self.stats_interval_ms),
        }
    }
}
