//! Rate configuration and bucket state shared between the control surface
//! and the shaping loop.

use crate::error::{LimiterError, Result};
use crate::network::core::Direction;
use crate::network::shaping::token_bucket::{admit, BucketState, Decision, ShapingPolicy};
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Configured rates in bytes per second. 0 means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LimiterConfig {
    pub download_rate_bps: f64,
    pub upload_rate_bps: f64,
}

impl LimiterConfig {
    pub fn rate_for(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Inbound => self.download_rate_bps,
            Direction::Outbound => self.upload_rate_bps,
        }
    }
}

/// Everything the shaper mutates per packet, guarded as one unit so rates
/// and buckets are never observed half-updated.
#[derive(Debug, Clone)]
pub struct ShapingState {
    pub config: LimiterConfig,
    pub inbound: BucketState,
    pub outbound: BucketState,
    pub policy: ShapingPolicy,
    /// Refill both buckets to capacity whenever rates are set
    pub reset_on_reconfigure: bool,
}

impl ShapingState {
    pub fn new(policy: ShapingPolicy, reset_on_reconfigure: bool) -> Self {
        let now = Instant::now();
        Self {
            config: LimiterConfig::default(),
            inbound: BucketState::full(0.0, now),
            outbound: BucketState::full(0.0, now),
            policy,
            reset_on_reconfigure,
        }
    }

    pub fn bucket(&self, direction: Direction) -> &BucketState {
        match direction {
            Direction::Inbound => &self.inbound,
            Direction::Outbound => &self.outbound,
        }
    }

    pub fn bucket_mut(&mut self, direction: Direction) -> &mut BucketState {
        match direction {
            Direction::Inbound => &mut self.inbound,
            Direction::Outbound => &mut self.outbound,
        }
    }
}

/// Negative, NaN and infinite rates all mean "no limit".
pub fn sanitize_rate(rate_bps: f64) -> f64 {
    if rate_bps.is_finite() && rate_bps >= 0.0 {
        rate_bps
    } else {
        if !(rate_bps.is_infinite() && rate_bps > 0.0) {
            warn!("Invalid rate {} treated as unlimited", rate_bps);
        }
        0.0
    }
}

/// Cloneable handle to the shared [`ShapingState`].
#[derive(Debug, Clone)]
pub struct SharedLimiterState {
    inner: Arc<Mutex<ShapingState>>,
}

impl Default for SharedLimiterState {
    fn default() -> Self {
        Self::new(ShapingPolicy::default(), true)
    }
}

impl SharedLimiterState {
    pub fn new(policy: ShapingPolicy, reset_on_reconfigure: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ShapingState::new(policy, reset_on_reconfigure))),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ShapingState>> {
        self.inner
            .lock()
            .map_err(|_| LimiterError::lock_poisoned("shaping state"))
    }

    /// Replaces both rates. Buckets are refilled to the new capacity unless
    /// reset on reconfigure was turned off.
    pub fn set_rates(&self, download_rate_bps: f64, upload_rate_bps: f64) -> Result<()> {
        let download_rate_bps = sanitize_rate(download_rate_bps);
        let upload_rate_bps = sanitize_rate(upload_rate_bps);
        let now = Instant::now();

        let mut state = self.lock()?;
        state.config = LimiterConfig {
            download_rate_bps,
            upload_rate_bps,
        };
        if state.reset_on_reconfigure {
            state.inbound.reset(download_rate_bps, now);
            state.outbound.reset(upload_rate_bps, now);
        }

        debug!(
            "Rates set: download {} B/s, upload {} B/s",
            download_rate_bps, upload_rate_bps
        );
        Ok(())
    }

    /// Runs the admission decision for one packet against the current rate
    /// of its direction and charges that direction's bucket.
    pub fn admit(&self, direction: Direction, length: u32, now: Instant) -> Result<Decision> {
        let mut state = self.lock()?;
        let rate = state.config.rate_for(direction);
        let policy = state.policy;
        Ok(admit(state.bucket_mut(direction), length, rate, now, &policy))
    }

    pub fn config(&self) -> Result<LimiterConfig> {
        Ok(self.lock()?.config)
    }

    pub fn bucket(&self, direction: Direction) -> Result<BucketState> {
        Ok(*self.lock()?.bucket(direction))
    }

    pub fn set_policy(&self, policy: ShapingPolicy, reset_on_reconfigure: bool) -> Result<()> {
        let mut state = self.lock()?;
        state.policy = policy;
        state.reset_on_reconfigure = reset_on_reconfigure;
        Ok(())
    }

    /// Copy of the whole state.
    pub fn snapshot(&self) -> Result<ShapingState> {
        Ok(self.lock()?.clone())
    }
}

#[cfg(test)]
impl SharedLimiterState {
    /// Poisons the lock by panicking on another thread while holding it.
    pub(crate) fn poison(&self) {
        let inner = self.inner.clone();
        let _ = std::thread::spawn(move || {
            let _state = inner.lock().unwrap();
            panic!("shaping state poisoned");
        })
        .join();
    }
}
