use thiserror::Error;

/// Errors raised while bringing the capture up. `start()` returns these
/// synchronously and the limiter stays stopped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// The process lacks the privilege needed to install a capture filter
    #[error("administrator privileges are required to intercept packets")]
    PrivilegeRequired,

    /// The capture facility could not be opened (driver missing, blocked, bad filter...)
    #[error("packet capture unavailable: {0}")]
    Unavailable(String),

    /// The current platform has no packet interception backend
    #[error("packet interception is not supported on this platform")]
    Unsupported,

    /// `start()` was called while a capture loop is still alive
    #[error("limiter is already {0}")]
    AlreadyRunning(String),
}

/// Errors returned by a single receive call on a packet source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecvError {
    /// The captured packet did not fit the receive buffer. Transient, the
    /// caller retries.
    #[error("receive buffer too small for captured packet")]
    BufferTooSmall,

    /// Any other capture failure
    #[error("receive failed: {0}")]
    Fatal(String),
}

/// Fatal failures of a running capture loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("failed to receive packet: {0}")]
    Recv(String),

    #[error("failed to reinject packet: {0}")]
    Reinject(String),

    #[error("failed to close capture handle: {0}")]
    Close(String),

    /// The shared rates and buckets can no longer be read
    #[error("shaping state unavailable: {0}")]
    State(String),

    /// The worker thread panicked
    #[error("capture worker terminated abnormally: {0}")]
    Worker(String),
}

impl From<RecvError> for CaptureError {
    fn from(error: RecvError) -> Self {
        match error {
            RecvError::BufferTooSmall => Self::Recv(error.to_string()),
            RecvError::Fatal(message) => Self::Recv(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum LimiterError {
    /// The capture could not be started
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// The running capture loop failed
    #[error("capture loop failed: {0}")]
    Capture(#[from] CaptureError),

    /// Error when a mutex/rwlock is poisoned
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors from file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed settings file
    #[error("Failed to parse settings: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A convenient Result type alias using `LimiterError`.
pub type Result<T> = std::result::Result<T, LimiterError>;

impl LimiterError {
    /// Creates a new lock poisoned error with a descriptive message.
    pub fn lock_poisoned(resource: &str) -> Self {
        Self::LockPoisoned(format!("Failed to acquire lock on {}", resource))
    }

    /// Returns true if this error happened while starting, as opposed to a
    /// failure of an already running loop.
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::Startup(_))
    }
}

#[cfg(windows)]
mod windivert_conversions {
    use super::{CaptureError, RecvError, StartupError};
    use windivert::error::{WinDivertError, WinDivertOpenError, WinDivertRecvError};

    /// `ERROR_INVALID_PARAMETER`, reported by the driver for oversized packets
    /// on some builds.
    const ERROR_INVALID_PARAMETER: i32 = 87;
    /// `ERROR_INSUFFICIENT_BUFFER`
    const ERROR_INSUFFICIENT_BUFFER: i32 = 122;

    /// Receive codes other than 122 and 232 reach us as plain IO errors, so
    /// 87 has to be picked out of those by its raw code.
    impl From<WinDivertError> for RecvError {
        fn from(error: WinDivertError) -> Self {
            match &error {
                WinDivertError::Recv(WinDivertRecvError::InsufficientBuffer) => {
                    RecvError::BufferTooSmall
                }
                WinDivertError::IOError(e)
                    if matches!(
                        e.raw_os_error(),
                        Some(ERROR_INVALID_PARAMETER) | Some(ERROR_INSUFFICIENT_BUFFER)
                    ) =>
                {
                    RecvError::BufferTooSmall
                }
                _ => RecvError::Fatal(error.to_string()),
            }
        }
    }

    impl From<WinDivertError> for StartupError {
        fn from(error: WinDivertError) -> Self {
            match &error {
                WinDivertError::Open(WinDivertOpenError::AccessDenied) => {
                    StartupError::PrivilegeRequired
                }
                _ => StartupError::Unavailable(error.to_string()),
            }
        }
    }

    impl From<WinDivertError> for CaptureError {
        fn from(error: WinDivertError) -> Self {
            CaptureError::Reinject(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recv_error_into_capture_error() {
        let error: CaptureError = RecvError::Fatal("handle closed".to_string()).into();
        assert_eq!(error, CaptureError::Recv("handle closed".to_string()));
    }

    #[test]
    fn test_startup_and_runtime_errors_are_distinct() {
        let startup: LimiterError = StartupError::Unsupported.into();
        let runtime: LimiterError = CaptureError::Reinject("gone".to_string()).into();

        assert!(startup.is_startup());
        assert!(!runtime.is_startup());
    }

    #[test]
    fn test_lock_poisoned_message() {
        let error = LimiterError::lock_poisoned("shaping state");
        assert_eq!(
            error.to_string(),
            "Lock poisoned: Failed to acquire lock on shaping state"
        );
    }

    #[cfg(windows)]
    mod windivert_mapping {
        use super::super::*;
        use std::io;
        use windivert::error::{WinDivertError, WinDivertOpenError, WinDivertRecvError};

        #[test]
        fn test_oversized_packet_is_retryable() {
            let insufficient: RecvError =
                WinDivertError::Recv(WinDivertRecvError::InsufficientBuffer).into();
            let invalid_parameter: RecvError =
                WinDivertError::IOError(io::Error::from_raw_os_error(87)).into();
            let raw_insufficient: RecvError =
                WinDivertError::IOError(io::Error::from_raw_os_error(122)).into();

            assert_eq!(insufficient, RecvError::BufferTooSmall);
            assert_eq!(invalid_parameter, RecvError::BufferTooSmall);
            assert_eq!(raw_insufficient, RecvError::BufferTooSmall);
        }

        #[test]
        fn test_other_recv_failures_are_fatal() {
            let no_data: RecvError = WinDivertError::Recv(WinDivertRecvError::NoData).into();
            let closed: RecvError =
                WinDivertError::IOError(io::Error::from_raw_os_error(6)).into();

            assert!(matches!(no_data, RecvError::Fatal(_)));
            assert!(matches!(closed, RecvError::Fatal(_)));
        }

        #[test]
        fn test_access_denied_needs_privilege() {
            let denied: StartupError = WinDivertError::Open(WinDivertOpenError::AccessDenied).into();
            let blocked: StartupError =
                WinDivertError::Open(WinDivertOpenError::DriverBlocked).into();

            assert_eq!(denied, StartupError::PrivilegeRequired);
            assert!(matches!(blocked, StartupError::Unavailable(_)));
        }
    }
}
