//! Start command.
//!
//! Opens the capture on a fresh worker thread and launches the shaping loop.

use std::sync::atomic::Ordering;

use log::{error, info, warn};

use crate::commands::{BandwidthLimiter, WorkerHandle};
use crate::error::StartupError;
use crate::network::core::SourceOpener;
use crate::network::processing::{spawn_worker, LimiterPhase};
use crate::settings::limits::BYTES_PER_SEC_PER_MBPS;
use crate::utils::format_limit;

impl<O: SourceOpener> BandwidthLimiter<O> {
    /// Starts intercepting and shaping packets.
    ///
    /// Returns once the capture is open. Any failure to open it is returned
    /// here and leaves the limiter stopped.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The shaping loop is running
    /// * `Err(StartupError::AlreadyRunning)` - A previous loop has not stopped yet
    /// * `Err(StartupError)` - The capture could not be opened
    pub fn start(&self) -> Result<(), StartupError> {
        let mut worker = self
            .worker
            .lock()
            .map_err(|_| StartupError::Unavailable("worker handle lock poisoned".to_string()))?;

        let phase = &self.state.phase;
        if !phase.transition(LimiterPhase::Stopped, LimiterPhase::Starting) {
            return Err(StartupError::AlreadyRunning(phase.get().to_string()));
        }

        if let Some(previous) = worker.take() {
            reap_worker(previous);
        }

        match self.state.statistics.write() {
            Ok(mut statistics) => statistics.reset(),
            Err(e) => warn!("Failed to reset statistics: {}", e),
        }

        self.state.running.store(true, Ordering::SeqCst);

        let context = self.state.worker_context(&self.loop_options);
        match spawn_worker(self.opener.clone(), self.handle_config.clone(), context) {
            Ok(handle) => {
                *worker = Some(handle);
                match self.state.shared.config() {
                    Ok(config) => info!(
                        "Started bandwidth limiter (DL: {}, UL: {}, filter: {})",
                        format_limit(config.download_rate_bps / BYTES_PER_SEC_PER_MBPS),
                        format_limit(config.upload_rate_bps / BYTES_PER_SEC_PER_MBPS),
                        self.handle_config.effective_filter()
                    ),
                    Err(_) => info!("Started bandwidth limiter"),
                }
                Ok(())
            }
            Err(e) => {
                self.state.running.store(false, Ordering::SeqCst);
                phase.set(LimiterPhase::Stopped);
                error!("Failed to start bandwidth limiter: {}", e);
                Err(e)
            }
        }
    }
}

/// Collects a finished worker nobody joined.
fn reap_worker(handle: WorkerHandle) {
    match handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Previous capture loop ended with an error: {}", e),
        Err(_) => warn!("Previous capture worker panicked"),
    }
}


#[cfg(test)]
mod tests {
    use crate::commands::BandwidthLimiter;
    use crate::error::StartupError;
    use crate::network::core::mock::MockOpener;
    use crate::network::core::Direction;
    use crate::network::processing::LimiterPhase;

    #[test]
    fn test_start_reports_open_failure() {
        let (opener, _feed) = MockOpener::new();
        let opener = opener.fail_open(StartupError::Unavailable("driver missing".to_string()));
        let limiter = BandwidthLimiter::with_opener(opener);

        let result = limiter.start();

        assert_eq!(
            result,
            Err(StartupError::Unavailable("driver missing".to_string()))
        );
        assert_eq!(limiter.phase(), LimiterPhase::Stopped);
        assert!(!limiter.is_running());
    }

    #[test]
    fn test_start_reports_missing_privilege() {
        let (opener, _feed) = MockOpener::new();
        let limiter = BandwidthLimiter::with_opener(opener.fail_open(StartupError::PrivilegeRequired));

        assert_eq!(limiter.start(), Err(StartupError::PrivilegeRequired));
        assert_eq!(limiter.phase(), LimiterPhase::Stopped);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let (opener, _feed) = MockOpener::new();
        let recorder = opener.recorder();
        let limiter = BandwidthLimiter::with_opener(opener);

        limiter.start().unwrap();
        let second = limiter.start();

        assert_eq!(
            second,
            Err(StartupError::AlreadyRunning("running".to_string()))
        );
        assert_eq!(recorder.opens(), 1);
        limiter.stop();
    }

    #[test]
    fn test_restart_after_stop() {
        let (opener, feed) = MockOpener::new();
        let recorder = opener.recorder();
        let limiter = BandwidthLimiter::with_opener(opener);

        limiter.start().unwrap();
        limiter.stop();
        feed.packet(10, Direction::Inbound);
        limiter.join().unwrap();
        assert_eq!(limiter.phase(), LimiterPhase::Stopped);

        limiter.start().unwrap();
        assert!(limiter.is_running());
        assert_eq!(recorder.opens(), 2);
        assert!(!recorder.is_closed());

        limiter.stop();
        feed.packet(10, Direction::Outbound);
        limiter.join().unwrap();
        assert!(recorder.is_closed());
    }

    #[test]
    fn test_start_resets_statistics() {
        let (opener, feed) = MockOpener::new();
        let recorder = opener.recorder();
        let limiter = BandwidthLimiter::with_opener(opener);

        limiter.start().unwrap();
        feed.packet(100, Direction::Inbound);
        while recorder.reinjected().is_empty() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        limiter.stop();
        feed.packet(10, Direction::Inbound);
        limiter.join().unwrap();
        assert!(limiter.statistics().unwrap().inbound.packets >= 1);

        limiter.start().unwrap();
        assert_eq!(limiter.statistics().unwrap().inbound.packets, 0);
        limiter.stop();
    }
}
