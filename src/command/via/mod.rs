//! ### VIA CBP7 vendor commands

pub mod responses;

use embassy_time::Duration;

/// Service, roaming and system mode of the CDMA radio
pub const SYSINFO: &str = "^SYSINFO";
pub const SYSINFO_TIMEOUT: Duration = Duration::from_secs(3);
