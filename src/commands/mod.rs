//! Control surface of the limiter.
//!
//! [`BandwidthLimiter`] owns the shared shaping state and the worker thread.
//! Its operations are split by concern across the submodules, one `impl`
//! block each.

pub mod start;
pub mod state;
pub mod status;
pub mod stop;
pub mod types;
pub mod update;

pub use state::LimiterState;
pub use types::LimiterStatus;

use crate::error::{CaptureError, Result};
use crate::network::core::{DefaultOpener, HandleConfig, SourceOpener};
use crate::network::processing::LoopOptions;
use crate::settings::Settings;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

type WorkerHandle = JoinHandle<std::result::Result<(), CaptureError>>;

/// Host-wide download and upload limiter.
///
/// Starts unlimited and stopped. Limits can be changed at any time and are
/// picked up by the next packet. Dropping the limiter requests a stop but
/// does not wait for the worker.
pub struct BandwidthLimiter<O: SourceOpener = DefaultOpener> {
    opener: Arc<O>,
    handle_config: HandleConfig,
    loop_options: LoopOptions,
    state: LimiterState,
    worker: Mutex<Option<WorkerHandle>>,
}

impl BandwidthLimiter<DefaultOpener> {
    /// A limiter on the platform's capture backend, with default settings.
    pub fn new() -> Self {
        Self::with_opener(DefaultOpener::default())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::with_settings(DefaultOpener::default(), settings)
    }
}

impl Default for BandwidthLimiter<DefaultOpener> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: SourceOpener> BandwidthLimiter<O> {
    pub fn with_opener(opener: O) -> Self {
        Self {
            opener: Arc::new(opener),
            handle_config: HandleConfig::default(),
            loop_options: LoopOptions::default(),
            state: LimiterState::default(),
            worker: Mutex::new(None),
        }
    }

    /// Builds a limiter from validated settings, limits included.
    pub fn with_settings(opener: O, settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let limiter = Self {
            opener: Arc::new(opener),
            handle_config: settings.capture.handle_config(),
            loop_options: settings
                .shaping
                .loop_options(settings.capture.buffer_size),
            state: LimiterState::new(
                settings.shaping.policy(),
                settings.shaping.reset_on_reconfigure,
            ),
            worker: Mutex::new(None),
        };
        limiter.set_limits(settings.limits.download_mbps, settings.limits.upload_mbps)?;
        Ok(limiter)
    }

    /// Capture parameters used by the next `start()`.
    pub fn handle_config(&self) -> &HandleConfig {
        &self.handle_config
    }
}

impl<O: SourceOpener> Drop for BandwidthLimiter<O> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::core::mock::MockOpener;
    use crate::network::processing::LimiterPhase;
    use crate::settings::SettingsBuilder;
    use std::time::Duration;

    #[test]
    fn test_new_limiter_is_stopped_and_unlimited() {
        let (opener, _feed) = MockOpener::new();
        let limiter = BandwidthLimiter::with_opener(opener);

        let status = limiter.status().unwrap();
        assert_eq!(status.phase, LimiterPhase::Stopped);
        assert_eq!(status.download_mbps, 0.0);
        assert_eq!(status.upload_mbps, 0.0);
        assert!(!limiter.is_running());
    }

    #[test]
    fn test_with_settings_applies_everything() {
        let (opener, _feed) = MockOpener::new();
        let settings = SettingsBuilder::new()
            .download_mbps(8.0)
            .upload_mbps(2.0)
            .filter("tcp")
            .stats_interval_ms(100)
            .max_wait_ms(300)
            .build();

        let limiter = BandwidthLimiter::with_settings(opener, &settings).unwrap();

        assert_eq!(limiter.handle_config().filter, "tcp");
        assert_eq!(limiter.loop_options.stats_interval, Duration::from_millis(100));
        let shaping = limiter.state.shared.snapshot().unwrap();
        assert_eq!(shaping.config.download_rate_bps, 1_000_000.0);
        assert_eq!(shaping.config.upload_rate_bps, 250_000.0);
        assert_eq!(shaping.policy.max_wait, Duration::from_millis(300));
    }

    #[test]
    fn test_with_settings_rejects_invalid() {
        let (opener, _feed) = MockOpener::new();
        let settings = SettingsBuilder::new().filter("").build();

        assert!(BandwidthLimiter::with_settings(opener, &settings).is_err());
    }

    #[test]
    fn test_drop_requests_stop() {
        let (opener, feed) = MockOpener::new();
        let recorder = opener.recorder();
        let limiter = BandwidthLimiter::with_opener(opener);
        limiter.start().unwrap();
        let running = limiter.state.running.clone();

        drop(limiter);
        assert!(!running.load(std::sync::atomic::Ordering::SeqCst));

        // The worker leaves on the next packet and releases the capture
        feed.packet(10, crate::network::core::Direction::Inbound);
        while !recorder.is_closed() {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(recorder.close_calls(), 1);
    }
}
