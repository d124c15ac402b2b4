//! Status queries.

use std::time::Instant;

use crate::commands::{BandwidthLimiter, LimiterStatus};
use crate::error::{LimiterError, Result};
use crate::network::core::{Direction, SourceOpener};
use crate::network::processing::LimiterPhase;
use crate::network::shaping::stats::StatisticsSnapshot;
use crate::network::shaping::token_bucket::refill;
use crate::settings::limits::BYTES_PER_SEC_PER_MBPS;

impl<O: SourceOpener> BandwidthLimiter<O> {
    /// Whether the shaping loop is up and has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.phase() == LimiterPhase::Running
    }

    pub fn phase(&self) -> LimiterPhase {
        self.state.phase.get()
    }

    /// Current phase, limits and bucket balances.
    ///
    /// Balances include the tokens earned since the last packet.
    pub fn status(&self) -> Result<LimiterStatus> {
        let state = self.state.shared.snapshot()?;
        let now = Instant::now();

        let balance = |direction: Direction| {
            let mut bucket = *state.bucket(direction);
            refill(&mut bucket, state.config.rate_for(direction), now);
            Some(bucket.tokens).filter(|tokens| tokens.is_finite())
        };

        Ok(LimiterStatus {
            phase: self.phase(),
            download_mbps: state.config.download_rate_bps / BYTES_PER_SEC_PER_MBPS,
            upload_mbps: state.config.upload_rate_bps / BYTES_PER_SEC_PER_MBPS,
            inbound_tokens: balance(Direction::Inbound),
            outbound_tokens: balance(Direction::Outbound),
        })
    }

    /// Snapshot of the per-direction statistics of the current (or last) run.
    pub fn statistics(&self) -> Result<StatisticsSnapshot> {
        self.state
            .statistics
            .read()
            .map(|statistics| statistics.snapshot())
            .map_err(|_| LimiterError::lock_poisoned("statistics"))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::BandwidthLimiter;
    use crate::network::core::mock::MockOpener;
    use crate::network::core::Direction;
    use crate::network::processing::LimiterPhase;

    #[test]
    fn test_status_reports_limits_and_balances() {
        let (opener, _feed) = MockOpener::new();
        let limiter = BandwidthLimiter::with_opener(opener);
        limiter.set_limits(10.0, 0.0).unwrap();

        let status = limiter.status().unwrap();

        assert_eq!(status.phase, LimiterPhase::Stopped);
        assert_eq!(status.download_mbps, 10.0);
        assert_eq!(status.upload_mbps, 0.0);
        assert_eq!(status.inbound_tokens, Some(1_250_000.0));
        assert_eq!(status.outbound_tokens, None);
        assert_eq!(status.to_string(), "Stopped");
    }

    #[test]
    fn test_status_while_running() {
        let (opener, _feed) = MockOpener::new();
        let limiter = BandwidthLimiter::with_opener(opener);
        limiter.set_limits(10.0, 5.0).unwrap();
        limiter.start().unwrap();

        let status = limiter.status().unwrap();

        assert!(limiter.is_running());
        assert_eq!(status.to_string(), "Running (DL: 10 Mbps, UL: 5 Mbps)");
        limiter.stop();
        assert!(!limiter.is_running());
    }

    #[test]
    fn test_statistics_count_shaped_packets() {
        let (opener, feed) = MockOpener::new();
        let recorder = opener.recorder();
        let limiter = BandwidthLimiter::with_opener(opener);
        limiter.start().unwrap();

        feed.packet(1_000, Direction::Inbound);
        feed.packet(500, Direction::Outbound);
        while recorder.reinjected().len() < 2 {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        limiter.stop();
        feed.packet(1, Direction::Inbound);
        limiter.join().unwrap();

        let statistics = limiter.statistics().unwrap();
        assert_eq!(statistics.inbound.bytes, 1_000);
        assert_eq!(statistics.outbound.packets, 1);
        assert_eq!(statistics.outbound.immediate, 1);
    }
}
