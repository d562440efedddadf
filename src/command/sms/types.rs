//! Argument and parameter types used by SMS Commands and Responses

use core::fmt;

/// Preferred message storage, `<mem1>`/`<mem2>` of +CPMS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmsStorage {
    /// Not stored anywhere
    #[default]
    Unknown,
    /// SIM message storage
    Sm,
    /// ME message storage
    Me,
    /// Any of the storages associated with the ME
    Mt,
    /// Status report storage
    Sr,
    /// Broadcast message storage
    Bm,
    /// Terminal adaptor message storage
    Ta,
}

impl fmt::Display for SmsStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Sm => "SM",
            Self::Me => "ME",
            Self::Mt => "MT",
            Self::Sr => "SR",
            Self::Bm => "BM",
            Self::Ta => "TA",
        })
    }
}
