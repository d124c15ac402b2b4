//! Capture configuration and the WinDivert packet source.
//!
//! On Windows this opens an exclusive network layer handle that both
//! receives and reinjects. Other platforms only get the configuration type.

use crate::network::core::source::MAX_PACKET_SIZE;

#[cfg(windows)]
use crate::error::{CaptureError, RecvError, StartupError};
#[cfg(windows)]
use crate::network::core::packet_data::{Direction, PacketData};
#[cfg(windows)]
use crate::network::core::source::{PacketSource, SourceOpener};
#[cfg(windows)]
use log::{debug, error, info, warn};
#[cfg(windows)]
use windivert::layer::NetworkLayer;
#[cfg(windows)]
use windivert::packet::WinDivertPacket;
#[cfg(windows)]
use windivert::{CloseAction, WinDivert};
#[cfg(windows)]
use windivert_sys::WinDivertFlags;

#[cfg(windows)]
#[link(name = "winmm")]
extern "system" {
    fn timeBeginPeriod(uPeriod: u32) -> u32;
    fn timeEndPeriod(uPeriod: u32) -> u32;
}

/// Timer period requested while shaping, in milliseconds
#[cfg(windows)]
const TIMER_PERIOD_MS: u32 = 4;

/// Raises the system timer resolution for as long as it is alive, so the
/// short shaping delays are slept accurately. Does nothing off Windows.
#[derive(Debug)]
pub struct TimerResolution {
    #[cfg(windows)]
    raised: bool,
}

impl TimerResolution {
    #[cfg(windows)]
    pub fn raise() -> Self {
        let raised = unsafe { timeBeginPeriod(TIMER_PERIOD_MS) } == 0;
        if raised {
            debug!("Timer resolution raised to {}ms", TIMER_PERIOD_MS);
        } else {
            warn!("Could not raise timer resolution, shaping delays may overshoot");
        }
        Self { raised }
    }

    #[cfg(not(windows))]
    pub fn raise() -> Self {
        Self {}
    }
}

#[cfg(windows)]
impl Drop for TimerResolution {
    fn drop(&mut self) {
        if self.raised {
            unsafe {
                timeEndPeriod(TIMER_PERIOD_MS);
            }
            debug!("Timer resolution restored");
        }
    }
}

/// Default handle priority.
pub const DEFAULT_PRIORITY: i16 = 0;

/// Filter matching every packet the network layer sees, i.e. all IP traffic.
pub const CAPTURE_ALL_FILTER: &str = "true";

/// Configuration for creating a capture handle.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleConfig {
    /// WinDivert filter selecting the captured packets
    pub filter: String,
    /// Handle priority, higher values see packets first
    pub priority: i16,
    /// Receive buffer size in bytes
    pub buffer_size: usize,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            filter: CAPTURE_ALL_FILTER.to_string(),
            priority: DEFAULT_PRIORITY,
            buffer_size: MAX_PACKET_SIZE,
        }
    }
}

impl HandleConfig {
    /// Default settings with a custom filter.
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Default::default()
        }
    }

    pub fn priority(mut self, priority: i16) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the receive buffer size. Never below [`MAX_PACKET_SIZE`].
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(MAX_PACKET_SIZE);
        self
    }

    /// Returns the filter to install, falling back to capture-all when empty.
    pub fn effective_filter(&self) -> &str {
        let filter = self.filter.trim();
        if filter.is_empty() {
            CAPTURE_ALL_FILTER
        } else {
            filter
        }
    }
}

/// Opens WinDivert network layer handles.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct WinDivertOpener;

#[cfg(windows)]
impl SourceOpener for WinDivertOpener {
    type Source = WinDivertSource;

    fn open(&self, config: &HandleConfig) -> Result<Self::Source, StartupError> {
        if !crate::utils::is_elevated() {
            return Err(StartupError::PrivilegeRequired);
        }
        WinDivertSource::open(config)
    }
}

/// An exclusive WinDivert handle that both receives and reinjects.
#[cfg(windows)]
pub struct WinDivertSource {
    handle: Option<WinDivert<NetworkLayer>>,
    buffer: Vec<u8>,
}

#[cfg(windows)]
impl WinDivertSource {
    /// Opens a divert (not sniff) handle so captured packets are withheld
    /// from the stack until reinjected.
    pub fn open(config: &HandleConfig) -> Result<Self, StartupError> {
        flush_wfp_cache();

        let filter = config.effective_filter();
        info!("Opening WinDivert handle with filter: {}", filter);

        match WinDivert::<NetworkLayer>::network(filter, config.priority, WinDivertFlags::new()) {
            Ok(mut handle) => {
                debug!("WinDivert handle opened successfully");

                // Deep queue so packets held back by shaping delays are not
                // dropped by the driver
                use windivert_sys::WinDivertParam;
                if let Err(e) = handle.set_param(WinDivertParam::QueueLength, 2048) {
                    warn!("Failed to set WinDivert queue length: {}", e);
                }
                if let Err(e) = handle.set_param(WinDivertParam::QueueTime, 1024) {
                    warn!("Failed to set WinDivert queue time: {}", e);
                }

                Ok(Self {
                    handle: Some(handle),
                    buffer: vec![0u8; config.buffer_size.max(MAX_PACKET_SIZE)],
                })
            }
            Err(e) => {
                error!("Failed to open WinDivert handle: {}", e);
                flush_wfp_cache();
                Err(e.into())
            }
        }
    }
}

#[cfg(windows)]
impl PacketSource for WinDivertSource {
    type Payload = WinDivertPacket<'static, NetworkLayer>;

    fn recv(&mut self, max_buffer_bytes: usize) -> Result<PacketData<Self::Payload>, RecvError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| RecvError::Fatal("capture handle is closed".to_string()))?;

        if self.buffer.len() < max_buffer_bytes {
            self.buffer.resize(max_buffer_bytes, 0);
        }

        let packet = handle.recv(Some(&mut self.buffer[..]))?.into_owned();
        let length = u32::try_from(packet.data.len()).unwrap_or(u32::MAX);
        let direction = Direction::from_outbound(packet.address.outbound());

        Ok(PacketData::new(packet, length, direction))
    }

    fn reinject(&mut self, packet: PacketData<Self::Payload>) -> Result<(), CaptureError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| CaptureError::Reinject("capture handle is closed".to_string()))?;

        handle.send(&packet.payload)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        if let Some(mut handle) = self.handle.take() {
            debug!("Closing WinDivert handle");
            handle
                .close(CloseAction::Nothing)
                .map_err(|e| CaptureError::Close(e.to_string()))?;
            flush_wfp_cache();
        }
        Ok(())
    }
}

#[cfg(windows)]
impl Drop for WinDivertSource {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Error closing WinDivert handle on drop: {}", e);
        }
    }
}

/// Flushes the Windows Filtering Platform (WFP) cache.
///
/// Workaround for WinDivert caching issues. It opens and immediately closes
/// a handle with a no-match filter to clear stale state.
#[cfg(windows)]
pub fn flush_wfp_cache() {
    for priority in [0, 1000, -1000] {
        if let Ok(mut handle) =
            WinDivert::<NetworkLayer>::network("false", priority, WinDivertFlags::new())
        {
            let _ = handle.close(CloseAction::Nothing);
            debug!("Flushed WFP cache with priority {}", priority);
        }
    }
}

#[cfg(not(windows))]
pub fn flush_wfp_cache() {}
