//! Responses and unsolicited results for VIA Commands
use std::sync::LazyLock;

use regex::Regex;

use super::super::strip_tag;
use crate::error::Error;

/// EVDO signal strength: `^HRSSILVL: <level>`
pub static HRSSILVL_URC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n\^HRSSILVL:(.*)\r\n").unwrap());

/// Reports the device sends on its own that carry nothing the plugin uses:
/// access technology changes, EVDO dormancy, SIM state, roaming indicator
/// and the like.
pub static IGNORED_URCS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\r\n\^MODE:(.*)\r\n",
        r"\r\n\+DOSESSION:(.*)\r\n",
        r"\r\n\^SIMST:(.*)\r\n",
        r"\r\n\+VPON:(.*)\r\n",
        r"\r\n\+CREG:(.*)\r\n",
        r"\r\n\+VROM:(.*)\r\n",
        r"\r\n\+VSER:(.*)\r\n",
        r"\r\n\+CIEV:(.*)\r\n",
        r"\r\n\+VPUP:(.*)\r\n",
    ]
    .into_iter()
    .map(|re| Regex::new(re).unwrap())
    .collect()
});

static SYSINFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)").unwrap()
});

/// `^SYSINFO: <srv_status>,<srv_domain>,<roam_status>,<sys_mode>,<sim_state>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysInfo {
    pub srv_status: u32,
    pub srv_domain: u32,
    pub roam_status: u32,
    pub sys_mode: u32,
    pub sim_state: u32,
}

impl SysInfo {
    pub const SERVICE_AVAILABLE: u32 = 2;
    pub const MODE_CDMA: u32 = 2;
    pub const MODE_HDR: u32 = 4;
    pub const MODE_HYBRID: u32 = 8;
}

pub fn parse_sysinfo(response: &str) -> Result<SysInfo, Error> {
    let payload = strip_tag(response, "^SYSINFO:");
    let invalid = || Error::Parse(format!("Couldn't parse ^SYSINFO response '{}'", payload));

    let caps = SYSINFO.captures(payload).ok_or_else(invalid)?;
    let field = |i: usize| caps[i].parse::<u32>().map_err(|_| invalid());
    Ok(SysInfo {
        srv_status: field(1)?,
        srv_domain: field(2)?,
        roam_status: field(3)?,
        sys_mode: field(4)?,
        sim_state: field(5)?,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sysinfo() {
        assert_eq!(
            parse_sysinfo("^SYSINFO: 2,3,1,8,1"),
            Ok(SysInfo {
                srv_status: 2,
                srv_domain: 3,
                roam_status: 1,
                sys_mode: 8,
                sim_state: 1,
            })
        );
        assert!(parse_sysinfo("^SYSINFO: 2,3,1").is_err());
    }

    #[test]
    fn unsolicited() {
        let caps = HRSSILVL_URC.captures("\r\n^HRSSILVL:60\r\n").unwrap();
        assert_eq!(caps[1].trim(), "60");
        assert!(IGNORED_URCS.iter().any(|re| re.is_match("\r\n^MODE:2,4\r\n")));
        assert!(!IGNORED_URCS.iter().any(|re| re.is_match("\r\n^HRSSILVL:60\r\n")));
    }
}
