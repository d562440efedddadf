//! Argument and parameter types used by Telit Commands and Responses

use core::fmt;

/// `<status>` of #QSS
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QssStatus {
    SimRemoved = 0,
    SimInserted = 1,
    SimInsertedAndUnlocked = 2,
    SimInsertedAndReady = 3,
}

impl TryFrom<u8> for QssStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::SimRemoved,
            1 => Self::SimInserted,
            2 => Self::SimInsertedAndUnlocked,
            3 => Self::SimInsertedAndReady,
            other => return Err(other),
        })
    }
}

impl fmt::Display for QssStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SimRemoved => "SIM removed",
            Self::SimInserted => "SIM inserted",
            Self::SimInsertedAndUnlocked => "SIM inserted and PIN unlocked",
            Self::SimInsertedAndReady => "SIM inserted and ready",
        })
    }
}
