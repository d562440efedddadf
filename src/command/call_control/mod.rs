//! ### 6 - Call control

use embassy_time::Duration;

pub const DIAL_TIMEOUT: Duration = Duration::from_secs(90);
pub const ANSWER_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFLECT_TIMEOUT: Duration = Duration::from_secs(20);
pub const HANGUP_TIMEOUT: Duration = Duration::from_secs(2);
pub const DTMF_TIMEOUT: Duration = Duration::from_secs(3);

/// 6.1 Dial command D, voice call
pub fn dial_voice(number: &str) -> String {
    format!("D{};", number)
}

/// 6.3 Call answer A
pub const ANSWER: &str = "A";

/// 7.14 Call deflection +CTFR
pub fn deflect(number: &str) -> String {
    format!("+CTFR={}", number)
}

/// 7.13 Call related supplementary services +CHLD, release call `<index>`
pub fn release_call(index: u32) -> String {
    format!("+CHLD=1{}", index)
}

/// 7.13 Hangup call +CHUP
pub const HANGUP: &str = "+CHUP";

/// C.2.10 Tone duration +VTD, in tenths of a second
pub fn tone_duration(duration: u32) -> String {
    format!("AT+VTD={}", duration)
}

/// C.2.11 DTMF and tone generation +VTS
pub fn send_tone(digit: char) -> String {
    format!("AT+VTS={}", digit)
}
