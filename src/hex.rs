const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Upper-case hex, as PDU mode expects it.
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .flat_map(|&b| [HEX_DIGITS[(b >> 4) as usize], HEX_DIGITS[(b & 0x0f) as usize]])
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode() {
        assert_eq!(encode_hex(&[0x00, 0x11, 0xab, 0xff]), "0011ABFF");
        assert_eq!(encode_hex(&[]), "");
    }
}
