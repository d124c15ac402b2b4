//! The shaping control loop and the state it shares with the control
//! surface.

pub mod phase;
pub mod processor;
pub mod shared_state;
pub mod worker;

pub use phase::{LimiterPhase, PhaseCell};
pub use processor::{run_shaping_loop, LoopOptions};
pub use shared_state::{LimiterConfig, SharedLimiterState};
pub use worker::{spawn_worker, WorkerContext};
