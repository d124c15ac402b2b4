//! Token bucket admission for one traffic direction.
//!
//! Every captured packet is admitted: right away when the bucket covers it,
//! after a delay proportional to the shortage otherwise. When that delay
//! would be too long the packet goes out after a short fixed pause and the
//! bucket is driven into debt, which later packets have to pay back.

use std::time::{Duration, Instant};

/// Burst capacity expressed as seconds of the configured rate.
pub const BURST_SECONDS: f64 = 1.0;

/// Longest shortage wait the shaper will honour exactly.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(500);

/// Fixed pause applied instead of a wait longer than [`DEFAULT_MAX_WAIT`].
pub const DEFAULT_DEBT_DELAY: Duration = Duration::from_millis(100);

/// Outcome of admitting one packet. No outcome discards the packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Enough tokens, forward now
    PassImmediate,
    /// Forward after waiting out the exact shortage
    PassAfterDelay(Duration),
    /// The shortage was too large to wait out; forward after a capped pause
    /// and leave the bucket in debt
    PassWithDebt(Duration),
}

impl Decision {
    /// Delay to apply before reinjecting, if any.
    pub fn delay(&self) -> Option<Duration> {
        match *self {
            Decision::PassImmediate => None,
            Decision::PassAfterDelay(delay) | Decision::PassWithDebt(delay) => Some(delay),
        }
    }
}

/// Thresholds of the bounded-delay policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapingPolicy {
    /// Shortage waits longer than this are replaced by `debt_delay`
    pub max_wait: Duration,
    /// Pause applied to a packet admitted into debt
    pub debt_delay: Duration,
}

impl Default for ShapingPolicy {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            debt_delay: DEFAULT_DEBT_DELAY,
        }
    }
}

/// Burst capacity for a rate, infinite when the rate is unlimited.
pub fn capacity_for(rate_bps: f64) -> f64 {
    if rate_bps > 0.0 {
        rate_bps * BURST_SECONDS
    } else {
        f64::INFINITY
    }
}

/// Token balance of one direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketState {
    /// Bytes currently available. Negative means debt.
    pub tokens: f64,
    /// Maximum tokens the bucket holds
    pub capacity: f64,
    /// When tokens were last credited
    pub last_refill: Instant,
}

impl BucketState {
    /// A full bucket for `rate_bps`.
    pub fn full(rate_bps: f64, now: Instant) -> Self {
        let capacity = capacity_for(rate_bps);
        Self {
            tokens: capacity,
            capacity,
            last_refill: now,
        }
    }

    /// Refills the bucket back to capacity for a (possibly new) rate.
    pub fn reset(&mut self, rate_bps: f64, now: Instant) {
        *self = Self::full(rate_bps, now);
    }

    pub fn is_in_debt(&self) -> bool {
        self.tokens < 0.0
    }
}

/// Credits the tokens earned since the last refill.
///
/// An unlimited rate fills the bucket to infinity. Otherwise the balance
/// grows by `elapsed * rate_bps` and is clamped at one second's worth of
/// rate, however deep the debt was.
pub fn refill(state: &mut BucketState, rate_bps: f64, now: Instant) {
    if rate_bps <= 0.0 {
        state.tokens = f64::INFINITY;
        state.capacity = f64::INFINITY;
    } else {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.capacity = capacity_for(rate_bps);
        state.tokens = (state.tokens + elapsed * rate_bps).min(state.capacity);
    }
    state.last_refill = now;
}

/// Decides how a packet of `length` bytes is forwarded and charges the bucket.
pub fn admit(
    state: &mut BucketState,
    length: u32,
    rate_bps: f64,
    now: Instant,
    policy: &ShapingPolicy,
) -> Decision {
    refill(state, rate_bps, now);

    if rate_bps <= 0.0 {
        return Decision::PassImmediate;
    }

    let length = f64::from(length);
    if state.tokens >= length {
        state.tokens -= length;
        return Decision::PassImmediate;
    }

    let shortage = length - state.tokens;
    let wait = shortage / rate_bps;
    state.tokens -= length;

    if wait > policy.max_wait.as_secs_f64() {
        Decision::PassWithDebt(policy.debt_delay)
    } else {
        Decision::PassAfterDelay(Duration::from_secs_f64(wait))
    }
}
