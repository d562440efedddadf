//! Argument and parameter types used by SIM access Commands and Responses

/// UICC VERIFY / UNBLOCK PIN queries (no data) whose status word reports the
/// remaining attempts as `63Cx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCounter {
    Pin,
    Puk,
    Pin2,
    Puk2,
}

impl RetryCounter {
    pub const ALL: [Self; 4] = [Self::Pin, Self::Puk, Self::Pin2, Self::Puk2];

    /// 8.17 Generic SIM access +CSIM
    pub const fn command(self) -> &'static str {
        match self {
            Self::Pin => "+CSIM=10,0020000100",
            Self::Puk => "+CSIM=10,002C000100",
            Self::Pin2 => "+CSIM=10,0020008100",
            Self::Puk2 => "+CSIM=10,002C008100",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Pin => "PIN",
            Self::Puk => "PUK",
            Self::Pin2 => "PIN2",
            Self::Puk2 => "PUK2",
        }
    }
}

/// Status words of a READ BINARY the SIM completed.
pub(crate) fn status_ok(sw1: u8, sw2: u8) -> bool {
    (sw1 == 0x90 && sw2 == 0x00) || matches!(sw1, 0x91 | 0x92 | 0x9f)
}
