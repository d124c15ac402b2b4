//! Stop command.
//!
//! Stopping is a request: the worker notices it on its next iteration,
//! forwards any packet it is holding, then releases the capture.

use std::any::Any;
use std::sync::atomic::Ordering;

use log::{debug, info};

use crate::commands::BandwidthLimiter;
use crate::error::{CaptureError, LimiterError, Result};
use crate::network::core::SourceOpener;
use crate::network::processing::LimiterPhase;

impl<O: SourceOpener> BandwidthLimiter<O> {
    /// Asks the shaping loop to exit. Never blocks; calling it on a stopped
    /// limiter does nothing.
    pub fn stop(&self) {
        self.state.running.store(false, Ordering::SeqCst);

        let phase = &self.state.phase;
        if phase.transition(LimiterPhase::Running, LimiterPhase::Stopping)
            || phase.transition(LimiterPhase::Starting, LimiterPhase::Stopping)
        {
            info!("Stop requested, capture loop exits on its next packet");
        } else {
            debug!("Stop requested while {}", phase.get());
        }
    }

    /// Waits for the worker thread to finish and returns how the loop ended.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The loop stopped on request, or no loop was started
    /// * `Err(LimiterError::Capture)` - The loop ended on a fatal capture error
    pub fn join(&self) -> Result<()> {
        let handle = self
            .worker
            .lock()
            .map_err(|_| LimiterError::lock_poisoned("worker handle"))?
            .take();

        let Some(handle) = handle else {
            return Ok(());
        };

        match handle.join() {
            Ok(result) => result.map_err(LimiterError::from),
            Err(panic) => Err(CaptureError::Worker(panic_message(panic.as_ref())).into()),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
