//! Responses for Sierra Commands
use std::sync::LazyLock;

use regex::Regex;

use super::super::strip_tag;
use crate::error::Error;

static SCACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!SCACT:\s*(\d+)\s*,\s*(\d+)").unwrap());

/// `(cid, active)` pairs of a `!SCACT?` reply.
pub fn parse_scact_status(response: &str) -> Vec<(u8, bool)> {
    SCACT_RE
        .captures_iter(response)
        .filter_map(|caps| {
            let cid = caps[1].parse().ok()?;
            let state: u8 = caps[2].parse().ok()?;
            Some((cid, state == 1))
        })
        .collect()
}

/// `!ICCID: <iccid>`; digits up to the first `F` padding, 19 or 20 of them.
pub fn parse_iccid(response: &str) -> Result<String, Error> {
    let payload = strip_tag(response, "!ICCID:");
    let mut iccid = String::with_capacity(20);
    for c in payload.chars().take(20) {
        match c {
            'F' | 'f' => break,
            '0'..='9' => iccid.push(c),
            _ => {
                return Err(Error::Parse(format!(
                    "ICCID response contained invalid character '{}'",
                    c
                )))
            }
        }
    }
    if !(19..=20).contains(&iccid.len()) {
        return Err(Error::Parse(format!(
            "Invalid !ICCID response size (was {}, expected 19 or 20)",
            iccid.len()
        )));
    }
    Ok(iccid)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scact_status() {
        assert_eq!(
            parse_scact_status("!SCACT: 1,1\r\n!SCACT: 2,0\r\n"),
            vec![(1, true), (2, false)]
        );
        assert!(parse_scact_status("").is_empty());
    }

    #[test]
    fn iccid() {
        assert_eq!(
            parse_iccid("!ICCID: 8901260881206794346F\r\n"),
            Ok("8901260881206794346".to_string())
        );
        assert_eq!(
            parse_iccid("!ICCID: 89012608812067943461"),
            Ok("89012608812067943461".to_string())
        );
        assert!(parse_iccid("!ICCID: 8901F").is_err());
        assert!(parse_iccid("!ICCID: 89X1260881206794346").is_err());
    }
}
