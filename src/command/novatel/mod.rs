//! ### Novatel LTE vendor commands
//!
//! Data sessions run through the device's embedded QMI stack: `$NWQMICONNECT`
//! starts one, `$NWQMISTATUS` reports the QMI state and `$NWQMIDISCONNECT`
//! stops it.

pub mod responses;

use embassy_time::Duration;

use super::quote_string;

pub const QMI_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const QMI_STATUS_TIMEOUT: Duration = Duration::from_secs(3);

pub const QMI_STATUS: &str = "$NWQMISTATUS";
pub const QMI_DISCONNECT: &str = "$NWQMIDISCONNECT";

/// `$NWQMICONNECT=,,,,,,"<apn>",,,"<user>","<password>"`
pub fn qmi_connect(apn: &str, user: &str, password: &str) -> String {
    format!(
        "$NWQMICONNECT=,,,,,,{},,,{},{}",
        quote_string(apn),
        quote_string(user),
        quote_string(password)
    )
}

/// Remaining attempts of the PIN currently asked for
pub const PIN_RETRIES_QUERY: &str = "$NWPINR?";
pub const PIN_RETRIES_TIMEOUT: Duration = Duration::from_secs(20);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn qmi_connect_command() {
        assert_eq!(
            qmi_connect("vzwinternet", "", ""),
            "$NWQMICONNECT=,,,,,,\"vzwinternet\",,,\"\",\"\""
        );
    }
}
