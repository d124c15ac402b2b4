use crate::network::core::handle::{HandleConfig, CAPTURE_ALL_FILTER, DEFAULT_PRIORITY};
use crate::network::core::MAX_PACKET_SIZE;
use serde::{Deserialize, Serialize};

fn default_filter() -> String {
    CAPTURE_ALL_FILTER.to_string()
}

fn default_buffer_size() -> usize {
    MAX_PACKET_SIZE
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CaptureOptions {
    /// WinDivert filter selecting the packets to shape
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Handle priority (higher = earlier interception)
    #[serde(default)]
    pub priority: i16,

    /// Receive buffer size in bytes, at least one full-size IP packet
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        CaptureOptions {
            filter: default_filter(),
            priority: DEFAULT_PRIORITY,
            buffer_size: default_buffer_size(),
        }
    }
}

impl CaptureOptions {
    pub fn handle_config(&self) -> HandleConfig {
        HandleConfig::with_filter(self.filter.clone())
            .priority(self.priority)
            .buffer_size(self.buffer_size)
    }
}
