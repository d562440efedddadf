//! AT command text and response types.
//!
//! Grouped after the 3GPP TS 27.007 / 27.005 chapters, plus one module per
//! vendor command set. Commands are plain strings handed to
//! [`crate::traits::AtPort::send`]. `+`-prefixed information responses are
//! deserialized through `atat::serde_at`; vendor responses using other
//! prefixes are matched by hand or with a regex.

pub mod call_control;
pub mod device_lock;
pub mod general;
pub mod huawei;
pub mod mobile_control;
pub mod novatel;
pub mod packet_domain;
pub mod sierra;
pub mod sim;
pub mod sms;
pub mod telit;
pub mod via;

use serde::de::DeserializeOwned;

use crate::error::Error;

/// Deserialize a `+`-prefixed information response into `T`.
pub(crate) fn parse_response<T: DeserializeOwned>(response: &str, what: &str) -> Result<T, Error> {
    atat::serde_at::from_str(response.trim())
        .map_err(|_| Error::Parse(format!("Couldn't parse {} response '{}'", what, response)))
}

/// Drop an information tag such as `+CIMI:` and the whitespace around the
/// payload. Responses without the tag are returned trimmed.
pub(crate) fn strip_tag<'a>(response: &'a str, tag: &str) -> &'a str {
    let response = response.trim();
    response.strip_prefix(tag).unwrap_or(response).trim()
}

/// Quote a string argument. Control characters, `"` and `\` are written as
/// `\XX` hex escapes (V.250 5.4.2.2).
pub fn quote_string(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' | '\u{0}'..='\u{1f}' => {
                quoted.push_str(&format!("\\{:02X}", u32::from(c)));
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

pub(crate) fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tags_and_quotes() {
        assert_eq!(strip_tag("+CIMI: 001010123456789\r\n", "+CIMI:"), "001010123456789");
        assert_eq!(strip_tag("001010123456789", "+CIMI:"), "001010123456789");
        assert_eq!(strip_quotes("\"8944\""), "8944");
        assert_eq!(strip_quotes("\"8944"), "\"8944");
    }

    #[test]
    fn quoted_arguments() {
        assert_eq!(quote_string("internet"), "\"internet\"");
        assert_eq!(quote_string(""), "\"\"");
        assert_eq!(quote_string("pa\"ss"), "\"pa\\22ss\"");
        assert_eq!(quote_string("a\\b\r"), "\"a\\5Cb\\0D\"");
    }
}
