//! Responses for SIM access Commands
use atat::atat_derive::AtatResp;
use heapless::String;

use super::types::status_ok;
use crate::error::Error;

/// 8.18 Restricted SIM access +CRSM
#[derive(Clone, Debug, PartialEq, AtatResp)]
pub struct RestrictedSimAccess {
    #[at_arg(position = 0)]
    pub sw1: u8,
    #[at_arg(position = 1)]
    pub sw2: u8,
    #[at_arg(position = 2)]
    pub response: Option<String<64>>,
}

impl RestrictedSimAccess {
    /// Payload of a completed read, or the status words as an error.
    pub fn payload(&self) -> Result<&str, Error> {
        if !status_ok(self.sw1, self.sw2) {
            return Err(Error::Failed(format!(
                "SIM failed to handle CRSM request (sw1 {} sw2 {})",
                self.sw1, self.sw2
            )));
        }
        Ok(self.response.as_deref().unwrap_or_default())
    }
}

/// 8.17 Generic SIM access +CSIM
#[derive(Clone, Debug, PartialEq, AtatResp)]
pub struct GenericSimAccess {
    #[at_arg(position = 0)]
    pub length: u16,
    #[at_arg(position = 1)]
    pub response: String<256>,
}

impl GenericSimAccess {
    /// Remaining attempts from a `63Cx` status word.
    pub fn retries(&self) -> Option<u32> {
        let response = self.response.as_str();
        let sw = response.get(response.len().checked_sub(4)?..)?;
        let count = sw.strip_prefix("63C").or_else(|| sw.strip_prefix("63c"))?;
        u32::from_str_radix(count, 16).ok()
    }
}

/// ICCID out of the nibble swapped BCD payload of EF_ICCID. Trailing `F`
/// padding is dropped.
pub fn iccid_from_bcd(raw: &str) -> Result<std::string::String, Error> {
    let raw = raw.trim();
    if let Some(c) = raw.chars().find(|c| !c.is_ascii_digit() && !matches!(c, 'F' | 'f')) {
        return Err(Error::Parse(format!(
            "ICCID response contained invalid character '{}'",
            c
        )));
    }
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(Error::Parse(format!(
            "Invalid ICCID response size (was {}, expected an even number of digits)",
            raw.len()
        )));
    }

    let swapped: std::string::String = raw
        .as_bytes()
        .chunks(2)
        .flat_map(|pair| [pair[1], pair[0]])
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();

    let iccid = swapped.trim_end_matches('F');
    if iccid.contains('F') {
        return Err(Error::Parse(format!(
            "Invalid ICCID response '{}' (unexpected F)",
            raw
        )));
    }
    Ok(iccid.to_string())
}

/// `+CIMI` reply, with or without its tag: up to 15 digits.
pub fn parse_imsi(response: &str) -> Result<std::string::String, Error> {
    let imsi = super::super::strip_tag(response, "+CIMI:");
    if imsi.is_empty() || imsi.len() > 15 || !imsi.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Parse(format!(
            "Invalid +CIMI response '{}'",
            response.trim()
        )));
    }
    Ok(imsi.to_string())
}

/// IMSI out of the EF_IMSI payload (3GPP TS 31.102 4.2.2): a length byte,
/// then the digits nibble swapped with the parity nibble in front.
pub fn imsi_from_ef(payload: &str) -> Result<std::string::String, Error> {
    if let Some(c) = payload.chars().find(|c| !c.is_ascii_digit() && *c != 'F') {
        return Err(Error::Parse(format!(
            "CRSM IMSI response contained invalid character '{}'",
            c
        )));
    }
    if payload.len() != 18 {
        return Err(Error::Parse(format!(
            "Invalid +CRSM IMSI response size (was {}, expected 18)",
            payload.len()
        )));
    }

    let buf = payload.as_bytes();
    let mut imsi = [0u8; 15];
    imsi[0] = buf[2];
    for i in 1..8 {
        imsi[2 * i - 1] = buf[2 * i + 3];
        imsi[2 * i] = buf[2 * i + 2];
    }

    let end = imsi.iter().position(|&b| b == b'F').unwrap_or(imsi.len());
    if imsi[end..].iter().any(|&b| b != b'F') {
        return Err(Error::Parse(
            "Invalid +CRSM IMSI length (unexpected F)".to_string(),
        ));
    }
    Ok(imsi[..end].iter().copied().map(char::from).collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use atat::serde_at::de::from_str;

    #[test]
    fn restricted_sim_access() {
        let resp: RestrictedSimAccess =
            from_str("+CRSM: 144,0,\"986712345678901234\"\r\n").unwrap();
        assert_eq!(resp.sw1, 144);
        assert_eq!(resp.payload(), Ok("986712345678901234"));

        let resp: RestrictedSimAccess = from_str("+CRSM: 106,130,\"\"").unwrap();
        assert_eq!(
            resp.payload(),
            Err(Error::Failed(
                "SIM failed to handle CRSM request (sw1 106 sw2 130)".into()
            ))
        );
    }

    #[test]
    fn generic_sim_access_retries() {
        let resp: GenericSimAccess = from_str("+CSIM: 4,\"63C3\"").unwrap();
        assert_eq!(resp.retries(), Some(3));

        let resp: GenericSimAccess = from_str("+CSIM: 4,\"63CA\"").unwrap();
        assert_eq!(resp.retries(), Some(10));

        let resp: GenericSimAccess = from_str("+CSIM: 4,\"6982\"").unwrap();
        assert_eq!(resp.retries(), None);
    }

    #[test]
    fn iccid_nibble_swap() {
        assert_eq!(
            iccid_from_bcd("986712345678901234"),
            Ok("897621436587092143".to_string())
        );
        assert_eq!(
            iccid_from_bcd("98101430121181157002"),
            Ok("89014103211118510720".to_string())
        );
        assert_eq!(
            iccid_from_bcd("981014301211811570F2"),
            Ok("8901410321111851072".to_string())
        );
        assert!(iccid_from_bcd("98101").is_err());
        assert!(iccid_from_bcd("98F014301211811570F2").is_err());
        assert!(iccid_from_bcd("98X0").is_err());
    }

    #[test]
    fn cimi() {
        assert_eq!(parse_imsi("310410123456789\r\n"), Ok("310410123456789".to_string()));
        assert_eq!(parse_imsi("+CIMI: 21401123"), Ok("21401123".to_string()));
        assert_eq!(
            parse_imsi("3104101234567890"),
            Err(Error::Parse("Invalid +CIMI response '3104101234567890'".into()))
        );
        assert!(parse_imsi("ERROR").is_err());
    }

    #[test]
    fn imsi_from_ef_imsi() {
        assert_eq!(
            imsi_from_ef("083901141032547698"),
            Ok("310410123456789".to_string())
        );
        assert_eq!(
            imsi_from_ef("0839011410325476F8"),
            Ok("31041012345678".to_string())
        );
        assert_eq!(
            imsi_from_ef("08390114103254F698"),
            Err(Error::Parse("Invalid +CRSM IMSI length (unexpected F)".into()))
        );
        assert_eq!(
            imsi_from_ef("0839011410325476"),
            Err(Error::Parse(
                "Invalid +CRSM IMSI response size (was 16, expected 18)".into()
            ))
        );
        assert!(imsi_from_ef("08390114103254769Z").is_err());
    }
}
