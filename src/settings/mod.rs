//! Limiter configuration.
//!
//! Settings come from an optional TOML file and are then overridden from
//! the command line. Every field has a default, so an empty file is valid.
//!
//! # Example
//!
//! ```rust
//! use hostcap::settings::SettingsBuilder;
//!
//! let settings = SettingsBuilder::new()
//!     .download_mbps(10.0)
//!     .upload_mbps(5.0)
//!     .build();
//! ```
//!
//! The equivalent configuration file:
//!
//! ```toml
//! [limits]
//! download_mbps = 10.0
//! upload_mbps = 5.0
//! ```

pub mod builder;
pub mod capture;
pub mod limits;
pub mod shaping;

pub use builder::SettingsBuilder;
pub use capture::CaptureOptions;
pub use limits::LimitOptions;
pub use shaping::ShapingOptions;

use crate::error::{LimiterError, Result};
use crate::network::core::MAX_PACKET_SIZE;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete limiter configuration.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Settings {
    /// Download and upload caps
    #[serde(default)]
    pub limits: LimitOptions,

    /// Which packets are captured and how
    #[serde(default)]
    pub capture: CaptureOptions,

    /// Delay and debt thresholds of the shaper
    #[serde(default)]
    pub shaping: ShapingOptions,
}

impl Settings {
    /// Parses settings from TOML text and validates them.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(settings)
    }

    /// Rejects values no limiter could run with.
    pub fn validate(&self) -> Result<()> {
        if self.capture.filter.trim().is_empty() {
            return Err(LimiterError::Config(
                "capture filter cannot be empty".to_string(),
            ));
        }
        if self.capture.buffer_size < MAX_PACKET_SIZE {
            return Err(LimiterError::Config(format!(
                "buffer_size must be at least {} bytes",
                MAX_PACKET_SIZE
            )));
        }
        self.shaping.validate()
    }
}
