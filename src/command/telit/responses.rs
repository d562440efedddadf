//! Responses for Telit Commands
use std::sync::LazyLock;

use atat::atat_derive::AtatResp;
use regex::Regex;

use super::types::QssStatus;
use crate::error::Error;

/// SIM status change: `#QSS: <status>`
pub static QSS_URC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#QSS:\s*([0-3])\r\n").unwrap());

static QSS_QUERY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#QSS:\s*(\d+)\s*,\s*(\d+)").unwrap());

static SWPKGV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}\.\d{2}\.\d{3})(-\d{4})?").unwrap());

/// Select wireless network +WS46
#[derive(Clone, Debug, PartialEq, AtatResp)]
pub struct Ws46Mode {
    #[at_arg(position = 0)]
    pub mode: u8,
}

/// `#QSS: <mode>,<status>`
pub fn parse_qss_query(response: &str) -> Result<QssStatus, Error> {
    let invalid = || Error::Parse(format!("Could not parse \"#QSS?\" response: {}", response));
    let caps = QSS_QUERY_RE.captures(response).ok_or_else(invalid)?;
    caps[2]
        .parse::<u8>()
        .ok()
        .and_then(|s| QssStatus::try_from(s).ok())
        .ok_or_else(invalid)
}

/// Build number of the software package, e.g. `25.20.676` out of
/// `25.20.676-P0F.670000`. Replies not carrying one yield `None`.
pub fn parse_swpkgv(response: &str) -> Option<String> {
    let first = response.trim().lines().next()?;
    SWPKGV_RE
        .captures(first)
        .map(|caps| caps[1].to_string())
}
