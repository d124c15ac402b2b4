use crate::network::shaping::stats::util::ewma::Ewma;
use crate::network::shaping::token_bucket::Decision;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Statistics for one shaped direction
///
/// Tracks how many packets went through, how they were admitted, how much
/// delay the shaper applied and the recent throughput, smoothed with an
/// exponential weighted moving average (EWMA).
#[derive(Debug, Clone)]
pub struct DirectionStats {
    /// Packets reinjected
    pub(crate) packet_count: u64,

    /// Bytes reinjected
    pub(crate) total_byte_count: u64,

    /// Packets forwarded without delay
    pub(crate) immediate_count: u64,

    /// Packets forwarded after waiting out their exact shortage
    pub(crate) delayed_count: u64,

    /// Packets forwarded into debt after the capped pause
    pub(crate) debt_count: u64,

    /// Sum of all delays applied
    pub(crate) total_delay: Duration,

    /// EWMA calculator for smoothing throughput measurements
    ewma: Ewma,

    /// Bytes sent since the last EWMA update
    recent_byte_sent: u64,

    /// Timer used to determine when to update the EWMA
    recent_timer: Instant,

    /// Interval at which to update the EWMA
    update_interval: Duration,
}

/// Point-in-time copy of [`DirectionStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectionSnapshot {
    pub packets: u64,
    pub bytes: u64,
    pub immediate: u64,
    pub delayed: u64,
    pub debt: u64,
    pub total_delay_ms: u128,
    /// Smoothed throughput in KB/s, if enough time has passed to measure it
    pub throughput_kbps: Option<f64>,
}

impl DirectionStats {
    /// Creates a new tracker. `alpha` weighs the newest throughput sample
    /// in the EWMA (between 0.0 exclusive and 1.0).
    pub fn new(alpha: f64) -> Self {
        DirectionStats {
            packet_count: 0,
            total_byte_count: 0,
            immediate_count: 0,
            delayed_count: 0,
            debt_count: 0,
            total_delay: Duration::ZERO,
            ewma: Ewma::new(alpha),
            recent_byte_sent: 0,
            recent_timer: Instant::now(),
            update_interval: Duration::from_millis(100),
        }
    }

    /// Records one reinjected packet and the decision that admitted it.
    pub fn record(&mut self, bytes: u32, decision: &Decision) {
        self.packet_count += 1;
        self.total_byte_count += u64::from(bytes);
        self.recent_byte_sent += u64::from(bytes);

        match decision {
            Decision::PassImmediate => self.immediate_count += 1,
            Decision::PassAfterDelay(delay) => {
                self.delayed_count += 1;
                self.total_delay += *delay;
            }
            Decision::PassWithDebt(delay) => {
                self.debt_count += 1;
                self.total_delay += *delay;
            }
        }

        let elapsed = self.recent_timer.elapsed();
        if elapsed >= self.update_interval {
            self.ewma
                .update((self.recent_byte_sent as f64 / 1024f64) / elapsed.as_secs_f64());
            self.recent_byte_sent = 0;
            self.recent_timer = Instant::now();
        }
    }

    pub fn snapshot(&self) -> DirectionSnapshot {
        DirectionSnapshot {
            packets: self.packet_count,
            bytes: self.total_byte_count,
            immediate: self.immediate_count,
            delayed: self.delayed_count,
            debt: self.debt_count,
            total_delay_ms: self.total_delay.as_millis(),
            throughput_kbps: self.ewma.get(),
        }
    }

    /// Resets all counters and the throughput average.
    pub fn reset(&mut self) {
        self.packet_count = 0;
        self.total_byte_count = 0;
        self.immediate_count = 0;
        self.delayed_count = 0;
        self.debt_count = 0;
        self.total_delay = Duration::ZERO;
        self.recent_byte_sent = 0;
        self.ewma.reset();
        self.recent_timer = Instant::now();
    }
}
