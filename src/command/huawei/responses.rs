//! Responses and unsolicited results for Huawei Commands
use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use super::super::{strip_quotes, strip_tag};
use crate::error::Error;

/// Outgoing call is ringing at the remote end: `^CONF: <call_x>`
pub static CONF_URC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n\^CONF:\s*(\d+)\r\n").unwrap());

/// Call connected: `^CONN: <call_x>,<call_type>`
pub static CONN_URC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^CONN:\s*(\d+),(\d+)").unwrap());

/// Call ended: `^CEND: <call_x>,<duration>,<end_status>[,<cc_cause>]`
pub static CEND_URC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^CEND:\s*(\d+),\s*(\d+),\s*(\d+),?\s*(\d*)").unwrap());

/// DTMF received from the remote end: `^DDTMF: <key>`
pub static DDTMF_URC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^DDTMF:\s*([0-9A-D\*\#])").unwrap());

/// Raw BCD payload of `^ICCID: "<iccid>"`, still nibble swapped.
pub fn parse_iccid(response: &str) -> Result<&str, Error> {
    let payload = strip_quotes(strip_tag(response, "^ICCID:"));
    if payload.is_empty() {
        return Err(Error::Parse(format!(
            "Couldn't parse ^ICCID response '{}'",
            response
        )));
    }
    Ok(payload)
}

/// State of one IP family in a `^NDISSTATQRY` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdisContext {
    pub connected: bool,
}

/// `^NDISSTATQRY: <stat>,<err>,<wx_state>,"IPV4"[,<stat>,<err>,<wx_state>,"IPV6"]`
///
/// Families the device did not report are `None`. Old firmware drops the
/// family name, which then means IPv4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NdisStatus {
    pub ipv4: Option<NdisContext>,
    pub ipv6: Option<NdisContext>,
}

pub fn parse_ndisstatqry(response: &str) -> Result<NdisStatus, Error> {
    let invalid = || {
        Error::Parse(format!(
            "Couldn't parse ^NDISSTATQRY response '{}'",
            response
        ))
    };

    let payload = strip_tag(response, "^NDISSTATQRY:");
    let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
    let mut status = NdisStatus::default();

    for group in fields.chunks(4) {
        let stat: u8 = group[0].parse().map_err(|_| invalid())?;
        let family = group.get(3).map(|f| strip_quotes(f)).unwrap_or_default();
        let context = Some(NdisContext {
            connected: stat == 1,
        });
        if family.is_empty() || family.eq_ignore_ascii_case("IPV4") {
            status.ipv4 = context;
        } else if family.eq_ignore_ascii_case("IPV6") {
            status.ipv6 = context;
        } else {
            return Err(invalid());
        }
    }

    Ok(status)
}

/// Addresses reported by `^DHCP?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpInfo {
    pub address: Ipv4Addr,
    pub prefix: u8,
    pub gateway: Ipv4Addr,
    pub dns1: Option<Ipv4Addr>,
    pub dns2: Option<Ipv4Addr>,
}

/// `^DHCP: <clip>,<netmask>,<gate>,<dhcp>,<pDNS>,<sDNS>,<max_rx>,<max_tx>`
///
/// Addresses are hex dumps of the little endian in-memory value, so
/// `0100a8c0` is `192.168.0.1`. A zero DNS server is not set.
pub fn parse_dhcp(response: &str) -> Result<DhcpInfo, Error> {
    let invalid = || Error::Parse(format!("Couldn't parse ^DHCP response '{}'", response));

    let values = strip_tag(response, "^DHCP:")
        .split(',')
        .take(6)
        .map(|v| u32::from_str_radix(v.trim(), 16).map_err(|_| invalid()))
        .collect::<Result<Vec<u32>, Error>>()?;
    let [address, netmask, gateway, _dhcp, dns1, dns2] = values[..] else {
        return Err(invalid());
    };

    let addr = |v: u32| Ipv4Addr::from(v.to_le_bytes());
    let dns = |v: u32| (v != 0).then(|| addr(v));
    Ok(DhcpInfo {
        address: addr(address),
        prefix: netmask.count_ones() as u8,
        gateway: addr(gateway),
        dns1: dns(dns1),
        dns2: dns(dns2),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn iccid_payload() {
        assert_eq!(
            parse_iccid("^ICCID: \"98681031098209032642\"\r\n"),
            Ok("98681031098209032642")
        );
        assert!(parse_iccid("^ICCID: ").is_err());
    }

    #[test]
    fn call_urcs() {
        assert!(CONF_URC.is_match("\r\n^CONF: 1\r\n"));
        let caps = CEND_URC.captures("^CEND: 1, 12, 104, 16").unwrap();
        assert_eq!(&caps[3], "104");
        let caps = CEND_URC.captures("^CEND:1,0,29").unwrap();
        assert_eq!(&caps[4], "");
        let caps = DDTMF_URC.captures("^DDTMF: #").unwrap();
        assert_eq!(&caps[1], "#");
        assert!(CONN_URC.is_match("^CONN: 1,0"));
    }

    #[test]
    fn ndisstatqry() {
        assert_eq!(
            parse_ndisstatqry("^NDISSTATQRY: 1,,,\"IPV4\",0,33,,\"IPV6\""),
            Ok(NdisStatus {
                ipv4: Some(NdisContext { connected: true }),
                ipv6: Some(NdisContext { connected: false }),
            })
        );
        assert_eq!(
            parse_ndisstatqry("^NDISSTATQRY: 0,33,,"),
            Ok(NdisStatus {
                ipv4: Some(NdisContext { connected: false }),
                ipv6: None,
            })
        );
        assert!(parse_ndisstatqry("^NDISSTATQRY: 1,,,\"IPX\"").is_err());
        assert!(parse_ndisstatqry("^NDISSTATQRY: ,,,").is_err());
    }

    #[test]
    fn dhcp() {
        let info = parse_dhcp(
            "^DHCP: a8e1a50a,fcffffff,a9e1a50a,a9e1a50a,0200200a,00000000,7200000,7200000",
        )
        .unwrap();
        assert_eq!(info.address, Ipv4Addr::new(10, 165, 225, 168));
        assert_eq!(info.prefix, 30);
        assert_eq!(info.gateway, Ipv4Addr::new(10, 165, 225, 169));
        assert_eq!(info.dns1, Some(Ipv4Addr::new(10, 32, 0, 2)));
        assert_eq!(info.dns2, None);

        assert!(parse_dhcp("^DHCP: a8e1a50a,fcffffff").is_err());
        assert!(parse_dhcp("^DHCP: zz,fcffffff,0,0,0,0").is_err());
    }
}
