//! ### Huawei vendor commands
//!
//! Besides SIM and voice helpers, Huawei devices with a network interface
//! run their data sessions over NDIS: `^NDISDUP` brings the session up or
//! down, `^NDISSTATQRY?` reports its state and `^DHCP?` the addresses the
//! device negotiated.

pub mod responses;

use embassy_time::Duration;

use super::quote_string;

pub const ICCID_TIMEOUT: Duration = Duration::from_secs(3);

/// Read the ICCID straight from the SIM
pub const ICCID_QUERY: &str = "^ICCID?";

/// Route voice call audio to the USB audio port
pub const DDSETEX: &str = "AT^DDSETEX=2";
pub const DDSETEX_TIMEOUT: Duration = Duration::from_secs(5);

pub const NDIS_TIMEOUT: Duration = Duration::from_secs(3);

pub const NDISSTATQRY: &str = "^NDISSTATQRY?";

pub const DHCP_QUERY: &str = "^DHCP?";

/// `^NDISDUP` authentication values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdisAuth {
    None = 0,
    Pap = 1,
    Chap = 2,
    MsChapV2 = 3,
}

/// `^NDISDUP=<cid>,1,"<apn>"`
pub fn ndisdup_connect(cid: u8, apn: &str) -> String {
    format!("^NDISDUP={},1,{}", cid, quote_string(apn))
}

/// `^NDISDUP=<cid>,1,"<apn>","<user>","<password>",<auth>`
pub fn ndisdup_connect_auth(
    cid: u8,
    apn: &str,
    user: &str,
    password: &str,
    auth: NdisAuth,
) -> String {
    format!(
        "^NDISDUP={},1,{},{},{},{}",
        cid,
        quote_string(apn),
        quote_string(user),
        quote_string(password),
        auth as u8
    )
}

pub fn ndisdup_disconnect(cid: u8) -> String {
    format!("^NDISDUP={},0", cid)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ndisdup() {
        assert_eq!(ndisdup_connect(1, "internet"), "^NDISDUP=1,1,\"internet\"");
        assert_eq!(
            ndisdup_connect_auth(1, "", "user", "pass", NdisAuth::Chap),
            "^NDISDUP=1,1,\"\",\"user\",\"pass\",2"
        );
        assert_eq!(ndisdup_disconnect(2), "^NDISDUP=2,0");
    }
}
