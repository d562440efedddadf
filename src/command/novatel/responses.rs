//! Responses for Novatel LTE Commands
use std::sync::LazyLock;

use regex::Regex;

use super::super::strip_tag;
use crate::error::Error;

/// Interesting bits of a multi-line `$NWQMISTATUS` report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QmiStatus {
    pub connected: bool,
    pub disconnected: bool,
    /// The network rejected the call; polling further won't help
    pub call_failed: bool,
    /// The report flattened to one line, for error messages
    pub text: String,
}

pub fn parse_qmi_status(response: &str) -> QmiStatus {
    let status = strip_tag(response, "$NWQMISTATUS:");
    QmiStatus {
        connected: status.contains("QMI State: CONNECTED")
            || status.contains("QMI State: QMI_WDS_PKT_DATA_CONNECTED"),
        disconnected: status.contains("QMI State: DISCONNECTED")
            || status.contains("QMI State: QMI_WDS_PKT_DATA_DISCONNECTED"),
        call_failed: status.contains("QMI_RESULT_FAILURE:QMI_ERR_CALL_FAILED"),
        text: status.replace(char::is_whitespace, " "),
    }
}

static PINR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PIN(\d+),\s*(\d+)").unwrap());

/// Which PIN a `$NWPINR` report is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Pin,
    Pin2,
}

/// `$NWPINR: PIN<n>, <retries>`
pub fn parse_pin_retries(response: &str) -> Result<(PinKind, u32), Error> {
    let payload = strip_tag(response, "$NWPINR:");
    let invalid = || Error::Failed(format!("Invalid unlock retries response: '{}'", payload));

    let caps = PINR.captures(payload).ok_or_else(invalid)?;
    let kind = match &caps[1] {
        "1" => PinKind::Pin,
        "2" => PinKind::Pin2,
        _ => return Err(invalid()),
    };
    let retries = caps[2].parse().map_err(|_| invalid())?;
    Ok((kind, retries))
}
