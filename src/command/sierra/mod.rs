//! ### Sierra Wireless vendor commands
//!
//! Data call control through `!SCACT`, PDP authentication through
//! `$QCPDPP` (Qualcomm based devices) or `%IPDPCFG` (Icera based devices).

pub mod responses;

use embassy_time::Duration;

use super::quote_string;

pub const AUTH_TIMEOUT: Duration = Duration::from_secs(3);
pub const SCACT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEACTIVATE_TIMEOUT: Duration = Duration::from_secs(10);
pub const ICCID_TIMEOUT: Duration = Duration::from_secs(3);
pub const PCSTATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Activate or deactivate the data session of a PDP context
pub fn scact(activate: bool, cid: u8) -> String {
    format!("!SCACT={},{}", u8::from(activate), cid)
}

pub const SCACT_QUERY: &str = "!SCACT?";

/// Read the ICCID straight from the SIM
pub const ICCID_QUERY: &str = "!ICCID?";

/// Power up the CDMA radio
pub const PCSTATE_ON: &str = "!pcstate=1";

/// `$QCPDPP=<cid>,0`, no authentication
pub fn qcpdpp_none(cid: u8) -> String {
    format!("$QCPDPP={},0", cid)
}

/// `$QCPDPP=<cid>,<auth>,"<password>","<user>"`. The password goes first.
pub fn qcpdpp(cid: u8, auth: u8, user: &str, password: &str) -> String {
    format!(
        "$QCPDPP={},{},{},{}",
        cid,
        auth,
        quote_string(password),
        quote_string(user)
    )
}

/// `%IPDPCFG=<cid>,0,0,"",""`, no authentication
pub fn ipdpcfg_none(cid: u8) -> String {
    format!("%IPDPCFG={},0,0,\"\",\"\"", cid)
}

pub fn ipdpcfg(cid: u8, auth: u8, user: &str, password: &str) -> String {
    format!(
        "%IPDPCFG={},0,{},{},{}",
        cid,
        auth,
        quote_string(user),
        quote_string(password)
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn auth_commands() {
        assert_eq!(ipdpcfg_none(3), "%IPDPCFG=3,0,0,\"\",\"\"");
        assert_eq!(qcpdpp(1, 2, "user", "pass"), "$QCPDPP=1,2,\"pass\",\"user\"");
        assert_eq!(ipdpcfg(1, 1, "user", "pass"), "%IPDPCFG=1,0,1,\"user\",\"pass\"");
        assert_eq!(scact(false, 2), "!SCACT=0,2");
    }

    #[test]
    fn credentials_are_escaped() {
        assert_eq!(
            qcpdpp(1, 2, "user", "pa\"ss"),
            "$QCPDPP=1,2,\"pa\\22ss\",\"user\""
        );
        assert_eq!(
            ipdpcfg(1, 1, "dom\\user", "pass"),
            "%IPDPCFG=1,0,1,\"dom\\5Cuser\",\"pass\""
        );
    }
}
