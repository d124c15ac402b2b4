//! Fluent construction of [`Settings`].
//!
//! Used by the binary to layer command-line overrides on top of a loaded
//! configuration file.
//!
//! # Example
//!
//! ```rust
//! use hostcap::settings::SettingsBuilder;
//!
//! let settings = SettingsBuilder::new()
//!     .download_mbps(20.0)  // 20 Mbps download
//!     .filter("tcp")  // only shape TCP
//!     .max_wait_ms(250)
//!     .build();
//! ```

use crate::settings::Settings;

/// Builder for constructing `Settings`.
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from existing settings, e.g. ones loaded from a file.
    pub fn from_settings(settings: Settings) -> Self {
        Self { settings }
    }

    /// Sets the download limit.
    ///
    /// # Arguments
    ///
    /// * `mbps` - Limit in megabits per second (0 = unlimited)
    pub fn download_mbps(mut self, mbps: f64) -> Self {
        self.settings.limits.download_mbps = mbps;
        self
    }

    /// Sets the upload limit.
    ///
    /// # Arguments
    ///
    /// * `mbps` - Limit in megabits per second (0 = unlimited)
    pub fn upload_mbps(mut self, mbps: f64) -> Self {
        self.settings.limits.upload_mbps = mbps;
        self
    }

    /// Sets the WinDivert filter expression.
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.settings.capture.filter = filter.into();
        self
    }

    pub fn priority(mut self, priority: i16) -> Self {
        self.settings.capture.priority = priority;
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.settings.capture.buffer_size = buffer_size;
        self
    }

    pub fn max_wait_ms(mut self, max_wait_ms: u64) -> Self {
        self.settings.shaping.max_wait_ms = max_wait_ms;
        self
    }

    pub fn debt_delay_ms(mut self, debt_delay_ms: u64) -> Self {
        self.settings.shaping.debt_delay_ms = debt_delay_ms;
        self
    }

    /// Whether buckets refill to capacity when limits change.
    pub fn reset_on_reconfigure(mut self, reset: bool) -> Self {
        self.settings.shaping.reset_on_reconfigure = reset;
        self
    }

    pub fn stats_interval_ms(mut self, interval_ms: u64) -> Self {
        self.settings.shaping.stats_interval_ms = interval_ms;
        self
    }

    /// Builds and returns the final `Settings`.
    pub fn build(self) -> Settings {
        self.settings
    }
}
