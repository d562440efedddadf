//! ### 9 - Device lock

pub mod impl_;
pub mod responses;
pub mod types;

use embassy_time::Duration;

use super::quote_string;

pub const PIN_TIMEOUT: Duration = Duration::from_secs(3);

/// 9.1 Enter PIN +CPIN
pub const GET_PIN_STATUS: &str = "+CPIN?";

/// 9.1 Enter PIN +CPIN
///
/// Enter PIN. If no PIN request is pending, the corresponding error code is returned.
pub fn set_pin(pin: &str) -> String {
    format!("+CPIN={}", quote_string(pin))
}

/// 9.1 Enter PIN +CPIN
///
/// If a wrong PIN is given three times, the PUK must be inserted in place of the PIN,
/// followed by the <newpin> which replaces the old pin in the SIM.
pub fn set_pin_with_puk(puk: &str, newpin: &str) -> String {
    format!("+CPIN={},{}", quote_string(puk), quote_string(newpin))
}
