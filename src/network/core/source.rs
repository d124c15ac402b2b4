//! Packet source abstraction.
//!
//! The shaping loop only talks to the capture facility through these traits,
//! so the OS backend (WinDivert on Windows) can be swapped for a scripted
//! source in tests.

use crate::error::{CaptureError, RecvError, StartupError};
use crate::network::core::handle::HandleConfig;
use crate::network::core::packet_data::PacketData;
use log::{debug, error};

/// Largest IP packet the receive buffer must hold.
pub const MAX_PACKET_SIZE: usize = 65535;

/// An open, exclusive packet capture.
///
/// Every packet returned by [`recv`](PacketSource::recv) must be handed back
/// to [`reinject`](PacketSource::reinject) exactly once, otherwise it never
/// reaches its destination.
pub trait PacketSource {
    /// Backend specific packet representation
    type Payload;

    /// Blocks until a packet arrives.
    ///
    /// `max_buffer_bytes` bounds the receive buffer. A packet that does not
    /// fit is reported as [`RecvError::BufferTooSmall`].
    fn recv(&mut self, max_buffer_bytes: usize) -> Result<PacketData<Self::Payload>, RecvError>;

    /// Forwards the packet's original bytes back into the network stack,
    /// preserving its direction.
    fn reinject(&mut self, packet: PacketData<Self::Payload>) -> Result<(), CaptureError>;

    /// Releases the capture. Calling it twice is a no-op.
    fn close(&mut self) -> Result<(), CaptureError>;
}

/// Opens packet sources.
///
/// Sources are opened on the worker thread that drives them, so a source
/// itself does not need to be `Send`; only the opener crosses threads.
pub trait SourceOpener: Send + Sync + 'static {
    type Source: PacketSource;

    /// Installs the capture filter described by `config`.
    fn open(&self, config: &HandleConfig) -> Result<Self::Source, StartupError>;
}

/// Opener used on platforms without an interception backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedOpener;

/// Source type of [`UnsupportedOpener`]. Never constructed.
#[derive(Debug)]
pub enum UnsupportedSource {}

impl PacketSource for UnsupportedSource {
    type Payload = Vec<u8>;

    fn recv(&mut self, _max_buffer_bytes: usize) -> Result<PacketData<Vec<u8>>, RecvError> {
        match *self {}
    }

    fn reinject(&mut self, _packet: PacketData<Vec<u8>>) -> Result<(), CaptureError> {
        match *self {}
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        match *self {}
    }
}

impl SourceOpener for UnsupportedOpener {
    type Source = UnsupportedSource;

    fn open(&self, _config: &HandleConfig) -> Result<Self::Source, StartupError> {
        Err(StartupError::Unsupported)
    }
}

/// Opener used by [`BandwidthLimiter::new`](crate::commands::BandwidthLimiter::new).
#[cfg(windows)]
pub type DefaultOpener = crate::network::core::handle::WinDivertOpener;

/// Opener used by [`BandwidthLimiter::new`](crate::commands::BandwidthLimiter::new).
#[cfg(not(windows))]
pub type DefaultOpener = UnsupportedOpener;

/// Owns an open source and closes it when dropped.
///
/// Covers every way out of the capture loop: clean stop, error return and
/// panic unwinding.
pub struct CaptureGuard<S: PacketSource> {
    source: S,
    closed: bool,
}

impl<S: PacketSource> CaptureGuard<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            closed: false,
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Closes the source explicitly so the caller sees the result.
    pub fn close(&mut self) -> Result<(), CaptureError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("Closing packet capture");
        self.source.close()
    }
}

impl<S: PacketSource> Drop for CaptureGuard<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Error closing packet capture on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::core::mock::{MockOpener, MockSource};

    #[test]
    fn test_unsupported_opener_fails() {
        let result = UnsupportedOpener.open(&HandleConfig::default());
        assert!(matches!(result, Err(StartupError::Unsupported)));
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let (opener, _feed) = MockOpener::new();
        let source: MockSource = opener.open(&HandleConfig::default()).unwrap();
        let recorder = opener.recorder();

        {
            let _guard = CaptureGuard::new(source);
            assert!(!recorder.is_closed());
        }

        assert!(recorder.is_closed());
        assert_eq!(recorder.close_calls(), 1);
    }

    #[test]
    fn test_guard_closes_once() {
        let (opener, _feed) = MockOpener::new();
        let recorder = opener.recorder();
        let mut guard = CaptureGuard::new(opener.open(&HandleConfig::default()).unwrap());

        guard.close().unwrap();
        drop(guard);

        assert_eq!(recorder.close_calls(), 1);
    }
}
