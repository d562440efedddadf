//! Responses for Mobile equipment control Commands
use atat::atat_derive::AtatResp;

/// 5.9 Set phone functionality +CFUN
#[derive(Clone, Debug, PartialEq, AtatResp)]
pub struct PhoneFunctionality {
    #[at_arg(position = 0)]
    pub fun: u8,
}

impl PhoneFunctionality {
    pub fn is_full(&self) -> bool {
        self.fun == 1
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use atat::serde_at::de::from_str;

    #[test]
    fn functionality() {
        let resp: PhoneFunctionality = from_str("+CFUN: 1\r\n").unwrap();
        assert!(resp.is_full());
        let resp: PhoneFunctionality = from_str("+CFUN: 4").unwrap();
        assert!(!resp.is_full());
    }
}
