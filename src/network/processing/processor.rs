use crate::error::{CaptureError, RecvError};
use crate::network::core::{PacketSource, MAX_PACKET_SIZE};
use crate::network::processing::shared_state::SharedLimiterState;
use crate::network::shaping::stats::ShapingStatistics;
use crate::network::shaping::token_bucket::Decision;
use crate::utils::log_statistics;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::thread;
use std::time::{Duration, Instant};

/// Default interval between statistics summaries
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(2);

/// Knobs of the shaping loop itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOptions {
    /// Receive buffer bound passed to every `recv`
    pub buffer_size: usize,
    /// How often to log a statistics summary
    pub stats_interval: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            buffer_size: MAX_PACKET_SIZE,
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }
}

/// Runs the capture → classify → shape → reinject loop until `running` is
/// cleared or the source fails.
///
/// Every packet received is reinjected exactly once, including one that
/// arrives after a stop was requested. A delay blocks the whole loop, so a
/// held-back packet also holds back every packet behind it in either
/// direction.
///
/// # Arguments
///
/// * `source` - Open packet capture
/// * `shared` - Rates and bucket state, possibly updated concurrently
/// * `running` - Cleared to request a stop; checked once per iteration
/// * `statistics` - Per-direction counters updated for every packet
/// * `options` - Buffer bound and logging interval
///
/// # Returns
///
/// `Ok(())` after a requested stop, or the fatal `CaptureError` that ended
/// the loop.
pub fn run_shaping_loop<S: PacketSource>(
    source: &mut S,
    shared: &SharedLimiterState,
    running: &AtomicBool,
    statistics: &RwLock<ShapingStatistics>,
    options: &LoopOptions,
) -> Result<(), CaptureError> {
    let mut last_log_time = Instant::now();
    let mut received_packet_count = 0;
    let mut sent_packet_count = 0;

    info!("Starting packet shaping.");

    while running.load(Ordering::SeqCst) {
        let packet = match source.recv(options.buffer_size) {
            Ok(packet) => packet,
            Err(RecvError::BufferTooSmall) => {
                debug!("Captured packet larger than the receive buffer, retrying");
                continue;
            }
            Err(e) => {
                error!("Failed to receive packet: {}", e);
                return Err(e.into());
            }
        };
        received_packet_count += 1;

        if !running.load(Ordering::SeqCst) {
            debug!("Stop requested, forwarding in-flight packet before exiting");
            source.reinject(packet)?;
            break;
        }

        let (length, direction) = (packet.length, packet.direction);

        let decision = match shared.admit(direction, length, Instant::now()) {
            Ok(decision) => decision,
            Err(e) => {
                // Rates are unknown from here on, so this packet is the last
                error!("Failed to shape {} packet: {}", direction, e);
                source.reinject(packet)?;
                return Err(CaptureError::State(e.to_string()));
            }
        };

        if let Some(delay) = decision.delay() {
            if let Decision::PassWithDebt(_) = decision {
                debug!(
                    "{} packet of {} bytes admitted into debt after {:?} (held {:?})",
                    direction,
                    length,
                    delay,
                    packet.age()
                );
            }
            thread::sleep(delay);
        }

        if let Err(e) = source.reinject(packet) {
            error!("Failed to reinject {} packet: {}", direction, e);
            return Err(e);
        }
        sent_packet_count += 1;

        match statistics.write() {
            Ok(mut stats) => stats.direction_mut(direction).record(length, &decision),
            Err(e) => warn!("Failed to acquire statistics lock: {}", e),
        }

        if last_log_time.elapsed() >= options.stats_interval {
            if let Ok(stats) = statistics.read() {
                log_statistics(received_packet_count, sent_packet_count, &stats.snapshot());
            }
            received_packet_count = 0;
            sent_packet_count = 0;
            last_log_time = Instant::now();
        }
    }

    debug!("Packet shaping loop exiting");
    Ok(())
}
