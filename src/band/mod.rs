//! Canonical radio bands and access technologies.
//!
//! Vendor band and mode encodings are translated to and from these types by
//! the per-vendor codecs, e.g. [`telit`].

pub mod telit;

use core::fmt;

/// A radio band as exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    /// Every band the device supports
    Any,
    /// GSM 900 (extended)
    Egsm,
    /// GSM 1800
    Dcs,
    /// GSM 1900
    Pcs,
    /// GSM 850
    G850,
    /// UTRAN operating band n
    Utran(u8),
    /// E-UTRAN operating band n, 1..=256
    Eutran(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Technology {
    Gsm,
    Umts,
    Lte,
}

impl Band {
    pub const fn technology(self) -> Option<Technology> {
        match self {
            Self::Any => None,
            Self::Egsm | Self::Dcs | Self::Pcs | Self::G850 => Some(Technology::Gsm),
            Self::Utran(_) => Some(Technology::Umts),
            Self::Eutran(_) => Some(Technology::Lte),
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Egsm => f.write_str("egsm"),
            Self::Dcs => f.write_str("dcs"),
            Self::Pcs => f.write_str("pcs"),
            Self::G850 => f.write_str("g850"),
            Self::Utran(n) => write!(f, "utran-{}", n),
            Self::Eutran(n) => write!(f, "eutran-{}", n),
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gsm => "2G",
            Self::Umts => "3G",
            Self::Lte => "4G",
        })
    }
}

/// Set of access technologies, as allowed or preferred by the host.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Modes(u8);

impl Modes {
    pub const NONE: Self = Self(0);
    pub const G2: Self = Self(1 << 1);
    pub const G3: Self = Self(1 << 2);
    pub const G4: Self = Self(1 << 3);
    /// Whatever the device supports; resolved before encoding.
    pub const ANY: Self = Self(0xff);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for Modes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for Modes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modes({})", self)
    }
}

impl fmt::Display for Modes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => return f.write_str("none"),
            Self::ANY => return f.write_str("any"),
            _ => {}
        }
        let mut first = true;
        for (flag, name) in [(Self::G2, "2g"), (Self::G3, "3g"), (Self::G4, "4g")] {
            if self.contains(flag) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
