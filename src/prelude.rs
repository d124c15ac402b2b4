//! Prelude module for convenient imports.
//!
//! ```rust
//! use hostcap::prelude::*;
//! ```

// Error handling
pub use crate::error::{CaptureError, LimiterError, RecvError, Result, StartupError};

// Control surface
pub use crate::commands::{BandwidthLimiter, LimiterStatus};

// Network core
pub use crate::network::core::{
    flush_wfp_cache, Direction, HandleConfig, PacketData, PacketSource, SourceOpener,
};

// Shaping
pub use crate::network::processing::LimiterPhase;
pub use crate::network::shaping::{Decision, ShapingPolicy, StatisticsSnapshot};

// Settings
pub use crate::settings::{
    CaptureOptions, LimitOptions, Settings, SettingsBuilder, ShapingOptions,
};
