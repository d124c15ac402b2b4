//! Background thread that owns the packet capture.
//!
//! The capture is opened on the worker thread itself and the outcome is
//! reported back before `spawn_worker` returns, so startup failures reach
//! the caller synchronously.

use crate::error::{CaptureError, StartupError};
use crate::network::core::{
    CaptureGuard, HandleConfig, PacketSource, SourceOpener, TimerResolution,
};
use crate::network::processing::phase::{LimiterPhase, PhaseCell};
use crate::network::processing::processor::{run_shaping_loop, LoopOptions};
use crate::network::processing::shared_state::SharedLimiterState;
use crate::network::shaping::stats::ShapingStatistics;
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

/// Name given to the shaping thread
const WORKER_THREAD_NAME: &str = "hostcap-shaper";

/// Handles the worker needs, all shared with the control surface.
#[derive(Clone)]
pub struct WorkerContext {
    pub shared: SharedLimiterState,
    pub running: Arc<AtomicBool>,
    pub phase: PhaseCell,
    pub statistics: Arc<RwLock<ShapingStatistics>>,
    pub options: LoopOptions,
}

/// Marks the limiter stopped when the worker exits, however it exits.
struct StopOnExit<'a> {
    ctx: &'a WorkerContext,
}

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        self.ctx.running.store(false, Ordering::SeqCst);
        self.ctx.phase.set(LimiterPhase::Stopped);
    }
}

/// Spawns the shaping thread and waits until its capture is open.
///
/// The caller must have set the phase to `Starting`. On success the phase is
/// `Running` (or `Stopping` if a stop raced with startup) and the returned
/// handle yields the loop's final result.
pub fn spawn_worker<O: SourceOpener>(
    opener: Arc<O>,
    handle_config: HandleConfig,
    ctx: WorkerContext,
) -> Result<JoinHandle<Result<(), CaptureError>>, StartupError> {
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), StartupError>>(1);

    let handle = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            let source = match opener.open(&handle_config) {
                Ok(source) => source,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return Ok(());
                }
            };

            ctx.phase
                .transition(LimiterPhase::Starting, LimiterPhase::Running);
            let _ = ready_tx.send(Ok(()));

            run_worker(source, &ctx)
        })
        .map_err(|e| StartupError::Unavailable(format!("failed to spawn shaping thread: {}", e)))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(StartupError::Unavailable(
                "shaping thread exited during startup".to_string(),
            ))
        }
    }
}

fn run_worker<S: PacketSource>(source: S, ctx: &WorkerContext) -> Result<(), CaptureError> {
    let _stop_on_exit = StopOnExit { ctx };
    let _timer = TimerResolution::raise();

    let mut capture = CaptureGuard::new(source);
    let result = run_shaping_loop(
        capture.source_mut(),
        &ctx.shared,
        &ctx.running,
        &ctx.statistics,
        &ctx.options,
    );

    ctx.phase.set(LimiterPhase::Stopping);
    let close_result = capture.close();

    match (&result, &close_result) {
        (Err(e), _) => error!("Shaping loop terminated: {}", e),
        (Ok(()), Err(e)) => error!("Shaping loop stopped but the capture failed to close: {}", e),
        (Ok(()), Ok(())) => info!("Shaping loop stopped and capture released"),
    }

    result.and(close_result)
}
