//! ### 5 - Mobile equipment control

pub mod responses;

use embassy_time::Duration;

pub const FUNCTIONALITY_TIMEOUT: Duration = Duration::from_secs(3);

/// 5.9 Set phone functionality +CFUN
pub const GET_FUNCTIONALITY: &str = "+CFUN?";

/// 5.9 Set phone functionality +CFUN, full functionality without reset
pub const SET_FULL_FUNCTIONALITY: &str = "+CFUN=1,0";

pub const POWER_DOWN_TIMEOUT: Duration = Duration::from_secs(20);

/// 5.9 Set phone functionality +CFUN, transmit and receive RF circuits off
pub const SET_FLIGHT_MODE: &str = "+CFUN=4";
