//! ### 8 - SIM access
//!
//! Elementary file reads through restricted SIM access, the IMSI query and
//! generic UICC access used to read PIN/PUK retry counters.

pub mod responses;
pub mod types;

use embassy_time::Duration;

/// 8.18 Restricted SIM access +CRSM, READ BINARY of EF_ICCID (ETSI TS 102.221 13.2)
pub const READ_ICCID: &str = "+CRSM=176,12258,0,0,10";
pub const READ_ICCID_TIMEOUT: Duration = Duration::from_secs(20);

/// 8.18 Restricted SIM access +CRSM, READ BINARY of EF_IMSI (3GPP TS 31.102 4.2.2)
pub const READ_IMSI: &str = "+CRSM=176,28423,0,0,9";
pub const READ_IMSI_TIMEOUT: Duration = Duration::from_secs(3);

/// 5.6 Request international mobile subscriber identity +CIMI
pub const GET_IMSI: &str = "+CIMI";
pub const GET_IMSI_TIMEOUT: Duration = Duration::from_secs(3);

pub const CSIM_TIMEOUT: Duration = Duration::from_secs(3);
