//! Responses for SMS Commands
use atat::atat_derive::AtatResp;

/// 3.5.3 Write Message to Memory +CMGW
#[derive(Clone, Debug, PartialEq, AtatResp)]
pub struct StoredMessage {
    #[at_arg(position = 0)]
    pub index: u32,
}

/// 3.5.1 Send Message +CMGS / 3.5.2 Send Message from Storage +CMSS
#[derive(Clone, Debug, PartialEq, AtatResp)]
pub struct MessageReference {
    #[at_arg(position = 0)]
    pub reference: u32,
}

#[cfg(test)]
mod test {
    use super::*;
    use atat::serde_at::de::from_str;

    #[test]
    fn stored_message() {
        assert_eq!(from_str("+CMGW: 7\r\n"), Ok(StoredMessage { index: 7 }));
    }

    #[test]
    fn message_reference() {
        assert_eq!(from_str("+CMGS: 42"), Ok(MessageReference { reference: 42 }));
        assert_eq!(from_str("+CMSS: 3\r\n"), Ok(MessageReference { reference: 3 }));
    }
}
