//! # hostcap - host-wide bandwidth limiter
//!
//! hostcap caps the download and upload throughput of a whole machine by
//! intercepting every IP packet with WinDivert and shaping it through a
//! token bucket per direction.
//!
//! ## Features
//!
//! * Independent download and upload limits, changeable while running
//! * One second of burst at the configured rate
//! * Bounded delays: a shortage too long to wait out is turned into debt
//!   instead of dropping the packet
//! * Per-direction statistics and a status summary
//!
//! ## Architecture
//!
//! A single worker thread owns the capture handle and runs
//! capture → classify → shape → reinject. The control surface
//! ([`commands::BandwidthLimiter`]) shares the rates and buckets with it
//! through a mutex and stops it with an atomic flag.
//!
//! Packet interception is only available on Windows. Elsewhere `start()`
//! fails with [`error::StartupError::Unsupported`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hostcap::prelude::*;
//!
//! let limiter = BandwidthLimiter::new();
//! limiter.set_limits(10.0, 5.0)?;  // 10 Mbps down, 5 Mbps up
//! limiter.start()?;
//! // ...
//! limiter.stop();
//! limiter.join()?;
//! ```

/// Control surface: start, stop, reconfigure, query
pub mod commands;
/// Centralized error handling
pub mod error;
/// Packet capture and shaping
pub mod network;
/// Prelude for convenient imports
pub mod prelude;
/// Limiter configuration
pub mod settings;
/// Shared utility functions
pub mod utils;

// Re-export commonly used types
pub use error::{LimiterError, Result};
