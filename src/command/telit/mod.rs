//! ### Telit vendor commands
//!
//! SIM status notifications (`#QSS`), SIM access locking through `+CSIM`,
//! band (`#BND`) and network mode (`+WS46`) selection, and the software
//! package version used to identify the firmware.

pub mod responses;
pub mod types;

use embassy_time::Duration;

pub const QSS_TIMEOUT: Duration = Duration::from_secs(3);

/// Query SIM status #QSS
pub const QSS_QUERY: &str = "#QSS?";

/// Enable the `#QSS: <status>` unsolicited notification.
pub const QSS_ENABLE: &str = "#QSS=1";

/// Generic SIM access +CSIM, reserve the SIM for exclusive APDU access.
pub const CSIM_LOCK: &str = "+CSIM=1";

/// Generic SIM access +CSIM, release the SIM.
pub const CSIM_UNLOCK: &str = "+CSIM=0";

pub const BND_TIMEOUT: Duration = Duration::from_secs(3);
pub const BND_SET_TIMEOUT: Duration = Duration::from_secs(20);

/// Select band #BND, supported values
pub const BND_SUPPORTED: &str = "#BND=?";

/// Select band #BND, current values
pub const BND_CURRENT: &str = "#BND?";

pub const WS46_QUERY_TIMEOUT: Duration = Duration::from_secs(3);
pub const WS46_TIMEOUT: Duration = Duration::from_secs(10);

/// Select wireless network +WS46, current value
pub const WS46_QUERY: &str = "+WS46?";

/// Select wireless network +WS46
pub fn set_ws46(mode: u8) -> String {
    format!("AT+WS46={}", mode)
}

pub const REVISION_TIMEOUT: Duration = Duration::from_secs(3);

/// Software package version #SWPKGV
pub const SOFTWARE_PACKAGE_VERSION: &str = "#SWPKGV";
