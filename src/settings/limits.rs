use log::warn;
use serde::{Deserialize, Serialize};

/// Bytes per second in one megabit per second
pub const BYTES_PER_SEC_PER_MBPS: f64 = 125_000.0;

/// Global download and upload caps.
#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq)]
pub struct LimitOptions {
    /// Download limit in Mbps (0 = unlimited)
    #[serde(default)]
    pub download_mbps: f64,

    /// Upload limit in Mbps (0 = unlimited)
    #[serde(default)]
    pub upload_mbps: f64,
}

/// Negative or non-numeric limits mean unlimited.
pub fn sanitize_mbps(mbps: f64) -> f64 {
    if mbps.is_finite() && mbps >= 0.0 {
        mbps
    } else {
        0.0
    }
}

/// Converts a limit in Mbps to bytes per second.
///
/// Invalid values (negative, NaN, infinite) are treated as unlimited and
/// reported with a warning.
pub fn mbps_to_bytes_per_sec(mbps: f64) -> f64 {
    let sanitized = sanitize_mbps(mbps);
    if sanitized != mbps {
        warn!("Invalid limit {} Mbps treated as unlimited", mbps);
    }
    sanitized * BYTES_PER_SEC_PER_MBPS
}

/// Parses a command-line limit, rejecting negative and non-numeric input.
pub fn parse_mbps(value: &str) -> Result<f64, String> {
    let mbps: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;

    if !mbps.is_finite() {
        return Err(format!("'{}' is not a finite number", value));
    }
    if mbps < 0.0 {
        return Err("limits cannot be negative".to_string());
    }
    Ok(mbps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mbps_conversion() {
        assert_eq!(mbps_to_bytes_per_sec(1.0), 125_000.0);
        assert_eq!(mbps_to_bytes_per_sec(8.0), 1_000_000.0);
        assert_eq!(mbps_to_bytes_per_sec(0.0), 0.0);
    }

    #[test]
    fn test_invalid_limits_are_unlimited() {
        assert_eq!(mbps_to_bytes_per_sec(-3.0), 0.0);
        assert_eq!(mbps_to_bytes_per_sec(f64::NAN), 0.0);
        assert_eq!(mbps_to_bytes_per_sec(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_parse_mbps() {
        assert_eq!(parse_mbps("10"), Ok(10.0));
        assert_eq!(parse_mbps(" 0.5 "), Ok(0.5));
        assert!(parse_mbps("-1").is_err());
        assert!(parse_mbps("fast").is_err());
        assert!(parse_mbps("inf").is_err());
    }
}
