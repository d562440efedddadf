//! ### 3GPP TS 27.005 - Short message service

pub mod responses;
pub mod types;

use embassy_time::Duration;

use super::quote_string;

/// Timeout of `+CMGW`, `+CMGS` and the message data written after either prompt
pub const STORE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DELETE_TIMEOUT: Duration = Duration::from_secs(10);

/// Terminates the message data written after the `>` prompt.
pub const CTRL_Z: char = '\x1a';

/// 3.5.3 Write Message to Memory +CMGW, text mode
pub fn write_text(number: &str) -> String {
    format!("+CMGW={}", quote_string(number))
}

/// 3.5.3 Write Message to Memory +CMGW, PDU mode
pub fn write_pdu(tpdu_len: usize) -> String {
    format!("+CMGW={}", tpdu_len)
}

/// 3.5.1 Send Message +CMGS, text mode
pub fn send_text(number: &str) -> String {
    format!("+CMGS={}", quote_string(number))
}

/// 3.5.1 Send Message +CMGS, PDU mode
pub fn send_pdu(tpdu_len: usize) -> String {
    format!("+CMGS={}", tpdu_len)
}

/// 3.5.2 Send Message from Storage +CMSS
pub fn send_from_storage(index: u32) -> String {
    format!("+CMSS={}", index)
}

/// 3.5.4 Delete Message +CMGD
pub fn delete(index: u32) -> String {
    format!("+CMGD={}", index)
}
