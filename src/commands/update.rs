//! Reconfiguration commands.

use log::info;

use crate::commands::BandwidthLimiter;
use crate::error::Result;
use crate::network::core::SourceOpener;
use crate::settings::limits::{mbps_to_bytes_per_sec, BYTES_PER_SEC_PER_MBPS};
use crate::settings::ShapingOptions;
use crate::utils::format_limit;

impl<O: SourceOpener> BandwidthLimiter<O> {
    /// Sets the download and upload limits in Mbps, 0 meaning unlimited.
    ///
    /// Works whether or not the limiter is running; the next packet is
    /// shaped against the new rates. Negative or non-finite values are
    /// treated as unlimited.
    pub fn set_limits(&self, download_mbps: f64, upload_mbps: f64) -> Result<()> {
        let download_bps = mbps_to_bytes_per_sec(download_mbps);
        let upload_bps = mbps_to_bytes_per_sec(upload_mbps);

        self.state.shared.set_rates(download_bps, upload_bps)?;

        info!(
            "Limits updated: DL {}, UL {}",
            format_limit(download_bps / BYTES_PER_SEC_PER_MBPS),
            format_limit(upload_bps / BYTES_PER_SEC_PER_MBPS)
        );
        Ok(())
    }

    /// Replaces the delay and debt thresholds. Options that fail validation
    /// leave the current policy in place.
    pub fn set_shaping(&self, options: &ShapingOptions) -> Result<()> {
        options.validate()?;
        self.state
            .shared
            .set_policy(options.policy(), options.reset_on_reconfigure)
    }
}
