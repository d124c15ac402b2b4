//! Core network functionality.
//!
//! This module contains the packet source abstraction, the WinDivert backed
//! handle and the packet data structure passed through the shaper.

pub mod handle;
#[cfg(test)]
pub(crate) mod mock;
pub mod packet_data;
pub mod source;

// Re-export commonly used types
pub use handle::{flush_wfp_cache, HandleConfig, TimerResolution};
#[cfg(windows)]
pub use handle::{WinDivertOpener, WinDivertSource};
pub use packet_data::{Direction, PacketData};
pub use source::{
    CaptureGuard, DefaultOpener, PacketSource, SourceOpener, UnsupportedOpener, MAX_PACKET_SIZE,
};
