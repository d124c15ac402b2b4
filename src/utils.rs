//! Utility functions shared by the shaping loop and the binary.

use crate::network::shaping::stats::{DirectionSnapshot, StatisticsSnapshot};
use log::info;

/// Logs a periodic summary of the shaping loop.
///
/// # Arguments
///
/// * `received` - Packets received since the last summary
/// * `sent` - Packets reinjected since the last summary
/// * `totals` - Cumulative per-direction statistics
pub fn log_statistics(received: usize, sent: usize, totals: &StatisticsSnapshot) {
    info!(
        "Received Packets: {}, Sent Packets: {} | DL {} | UL {}",
        received,
        sent,
        describe_direction(&totals.inbound),
        describe_direction(&totals.outbound)
    );
}

fn describe_direction(stats: &DirectionSnapshot) -> String {
    let throughput = stats
        .throughput_kbps
        .map(|kbps| format!("{:.1} KB/s", kbps))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "{} pkts, {} delayed, {} in debt, {} ms delay, {}",
        stats.packets, stats.delayed, stats.debt, stats.total_delay_ms, throughput
    )
}

/// Formats a limit in Mbps for display, 0 meaning unlimited.
pub fn format_limit(mbps: f64) -> String {
    if mbps > 0.0 {
        format!("{} Mbps", mbps)
    } else {
        "Unlimited".to_string()
    }
}

/// Check if the current process is running with administrator privileges
///
/// Uses Windows API to determine if the current process has admin rights,
/// which are required for packet interception.
#[cfg(windows)]
pub fn is_elevated() -> bool {
    use winapi::um::securitybaseapi::{AllocateAndInitializeSid, CheckTokenMembership, FreeSid};
    use winapi::um::winnt::{
        DOMAIN_ALIAS_RID_ADMINS, SECURITY_BUILTIN_DOMAIN_RID, SECURITY_NT_AUTHORITY,
    };

    unsafe {
        let mut sid = std::ptr::null_mut();

        if AllocateAndInitializeSid(
            &SECURITY_NT_AUTHORITY as *const _ as *mut _,
            2,
            SECURITY_BUILTIN_DOMAIN_RID,
            DOMAIN_ALIAS_RID_ADMINS,
            0,
            0,
            0,
            0,
            0,
            0,
            &mut sid,
        ) == 0
        {
            return false;
        }

        let mut is_member = 0;
        let is_admin =
            CheckTokenMembership(std::ptr::null_mut(), sid, &mut is_member) != 0 && is_member != 0;

        FreeSid(sid);
        is_admin
    }
}

/// Interception is Windows only; other platforms never hold the privilege.
#[cfg(not(windows))]
pub fn is_elevated() -> bool {
    false
}
