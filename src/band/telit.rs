//! Telit `#BND` band flags and `+WS46` network modes.
//!
//! 2G and 3G bands are selected through table codes, each code standing for
//! a fixed band combination. 4G bands are plain bitmasks (bit n is E-UTRAN
//! band n+1), written in decimal or in hexadecimal depending on the firmware,
//! optionally followed by a second mask for bands 65 to 128.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{Band, Modes, Technology};
use crate::error::Error;

/// `#BND` layout of a given device, derived from its revision and
/// capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BndConfig {
    pub modem_is_2g: bool,
    pub modem_is_3g: bool,
    pub modem_is_4g: bool,
    /// 3G flags use the table of the FN980/LM9x0/LN920 families
    pub alternate_3g: bool,
    /// 4G masks are hexadecimal
    pub hex_4g: bool,
    /// A second 4G mask covers bands 65..=128
    pub ext_4g: bool,
}

/// Shape of a `#BND` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BndResponse {
    /// `#BND?`: `#BND: <2g>,<3g>[,<4g>[,<4g-ext>]]`
    Current,
    /// `#BND=?`: `#BND: (<2g list>),(<3g list>)[,(<4g range>)[,(<4g-ext range>)]]`
    Supported,
}

const EGSM: u8 = 1 << 0;
const DCS: u8 = 1 << 1;
const PCS: u8 = 1 << 2;
const G850: u8 = 1 << 3;

const fn utran(bands: &[u8]) -> u32 {
    let mut mask = 0;
    let mut i = 0;
    while i < bands.len() {
        mask |= 1 << (bands[i] - 1);
        i += 1;
    }
    mask
}

const GSM_FLAGS: [(u8, u8); 4] = [
    (0, EGSM | DCS),
    (1, EGSM | PCS),
    (2, DCS | G850),
    (3, PCS | G850),
];

const UTRAN_FLAGS: [(u8, u32); 21] = [
    (0, utran(&[1])),
    (1, utran(&[2])),
    (2, utran(&[5])),
    (3, utran(&[1, 2, 5])),
    (4, utran(&[2, 5])),
    (5, utran(&[8])),
    (6, utran(&[1, 8])),
    (7, utran(&[4])),
    (8, utran(&[1, 5])),
    (9, utran(&[1, 8, 5])),
    (10, utran(&[2, 4, 5])),
    (12, utran(&[6])),
    (13, utran(&[3])),
    (14, utran(&[1, 8, 4, 5, 6])),
    (15, utran(&[1, 8, 3])),
    (16, utran(&[8, 5])),
    (17, utran(&[2, 4, 5, 6])),
    (18, utran(&[1, 2, 5, 6])),
    (19, utran(&[2, 6])),
    (20, utran(&[5, 6])),
    (21, utran(&[2, 5, 6])),
];

const UTRAN_FLAGS_ALTERNATE: [(u8, u32); 21] = [
    (0, utran(&[1])),
    (1, utran(&[2])),
    (2, utran(&[5])),
    (3, utran(&[1, 2, 5])),
    (4, utran(&[2, 5])),
    (5, utran(&[8])),
    (6, utran(&[1, 8])),
    (7, utran(&[4])),
    (8, utran(&[1, 5])),
    (9, utran(&[1, 8, 5])),
    (10, utran(&[2, 4, 5])),
    (12, utran(&[1, 2, 4, 5, 8])),
    (13, utran(&[3])),
    (14, utran(&[1, 8, 4, 5])),
    (15, utran(&[1, 8, 3])),
    (16, utran(&[8, 5])),
    (17, utran(&[2, 4, 5, 8])),
    (18, utran(&[1, 2, 5, 8])),
    (19, utran(&[1, 2, 4, 5])),
    (20, utran(&[1, 3, 5, 8])),
    (21, utran(&[1, 2, 3, 4, 5, 8])),
];

static CURRENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"#BND[:=]\s*(\d+)(?:\s*,\s*(\d+))?(?:\s*,\s*([0-9A-Fa-f]+))?(?:\s*,\s*([0-9A-Fa-f]+))?",
    )
    .unwrap()
});

static SUPPORTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"#BND:\s*\(([^)]*)\)(?:\s*,\s*\(([^)]*)\))?(?:\s*,\s*\(([^)]*)\))?(?:\s*,\s*\(([^)]*)\))?",
    )
    .unwrap()
});

fn utran_flags(cfg: &BndConfig) -> &'static [(u8, u32)] {
    if cfg.alternate_3g {
        &UTRAN_FLAGS_ALTERNATE
    } else {
        &UTRAN_FLAGS
    }
}

/// Band masks per technology. `*_invalid` is set when a band can't be
/// expressed at all.
#[derive(Default)]
struct Masks {
    gsm: u8,
    utran: u32,
    utran_invalid: bool,
    eutran: u64,
    eutran_ext: u64,
    eutran_invalid: bool,
}

impl Masks {
    fn new(bands: &[Band]) -> Self {
        let mut masks = Self::default();
        for band in bands {
            match *band {
                Band::Egsm => masks.gsm |= EGSM,
                Band::Dcs => masks.gsm |= DCS,
                Band::Pcs => masks.gsm |= PCS,
                Band::G850 => masks.gsm |= G850,
                Band::Utran(n @ 1..=32) => masks.utran |= 1 << (n - 1),
                Band::Utran(_) => masks.utran_invalid = true,
                Band::Eutran(n @ 1..=64) => masks.eutran |= 1 << (n - 1),
                Band::Eutran(n @ 65..=128) => masks.eutran_ext |= 1 << (n - 65),
                Band::Eutran(_) => masks.eutran_invalid = true,
                Band::Any => {}
            }
        }
        masks
    }
}

fn invalid_combination(technology: Technology) -> Error {
    Error::Failed(format!(
        "None or invalid {} bands combination in the provided list",
        technology
    ))
}

fn write_mask(cmd: &mut String, mask: u64, cfg: &BndConfig) {
    if cfg.hex_4g {
        cmd.push_str(&format!(",{:X}", mask));
    } else {
        cmd.push_str(&format!(",{}", mask));
    }
}

/// Build the `#BND=` command selecting exactly `bands`.
///
/// For every technology the device supports, the requested bands of that
/// technology must match one table entry exactly.
pub fn encode(bands: &[Band], cfg: &BndConfig) -> Result<String, Error> {
    if bands.contains(&Band::Any) {
        return Err(Error::InvalidArgs(
            "ANY band must be resolved to the supported bands first".to_string(),
        ));
    }

    let masks = Masks::new(bands);

    let gsm = if cfg.modem_is_2g {
        GSM_FLAGS
            .iter()
            .find(|(_, mask)| *mask == masks.gsm)
            .map(|(flag, _)| *flag)
            .ok_or_else(|| invalid_combination(Technology::Gsm))?
    } else {
        0
    };

    let umts = if cfg.modem_is_3g {
        utran_flags(cfg)
            .iter()
            .find(|(_, mask)| !masks.utran_invalid && *mask == masks.utran)
            .map(|(flag, _)| *flag)
            .ok_or_else(|| invalid_combination(Technology::Umts))?
    } else {
        0
    };

    let mut cmd = format!("#BND={}", gsm);
    if !cfg.modem_is_3g && !cfg.modem_is_4g {
        return Ok(cmd);
    }
    cmd.push_str(&format!(",{}", umts));

    if cfg.modem_is_4g {
        if masks.eutran_invalid
            || (masks.eutran == 0 && masks.eutran_ext == 0)
            || (!cfg.ext_4g && masks.eutran_ext != 0)
        {
            return Err(invalid_combination(Technology::Lte));
        }
        write_mask(&mut cmd, masks.eutran, cfg);
        if cfg.ext_4g {
            write_mask(&mut cmd, masks.eutran_ext, cfg);
        }
    }

    Ok(cmd)
}

fn gsm_bands(flag: u32, out: &mut BTreeSet<Band>) -> bool {
    let Some((_, mask)) = GSM_FLAGS.iter().find(|(f, _)| u32::from(*f) == flag) else {
        return false;
    };
    for (bit, band) in [
        (EGSM, Band::Egsm),
        (DCS, Band::Dcs),
        (PCS, Band::Pcs),
        (G850, Band::G850),
    ] {
        if mask & bit != 0 {
            out.insert(band);
        }
    }
    true
}

fn utran_bands(flag: u32, cfg: &BndConfig, out: &mut BTreeSet<Band>) -> bool {
    let Some((_, mask)) = utran_flags(cfg).iter().find(|(f, _)| u32::from(*f) == flag) else {
        return false;
    };
    out.extend((0..32u8).filter(|i| mask & (1 << i) != 0).map(|i| Band::Utran(i + 1)));
    true
}

fn eutran_bands(mask: u64, first: u16, out: &mut BTreeSet<Band>) {
    out.extend(
        (0..64u16)
            .filter(|i| mask & (1 << i) != 0)
            .map(|i| Band::Eutran(first + i)),
    );
}

fn parse_number(value: &str, hex: bool, response: &str) -> Result<u64, Error> {
    let value = value.trim();
    let parsed = if hex {
        u64::from_str_radix(value, 16)
    } else {
        value.parse()
    };
    parsed.map_err(|_| Error::Parse(format!("Couldn't parse #BND response: '{}'", response)))
}

/// A 2G/3G code. Codes too large for any table are skipped.
fn parse_flag(value: &str, response: &str) -> Result<Option<u32>, Error> {
    let flag = parse_number(value, false, response)?;
    match u32::try_from(flag) {
        Ok(flag) => Ok(Some(flag)),
        Err(_) => {
            warn!("unknown #BND flag '{}'", flag);
            Ok(None)
        }
    }
}

/// Codes listed in `0-3` or `0,2,5` or a mix of both.
fn parse_flag_list(list: &str, response: &str) -> Result<Vec<u32>, Error> {
    let mut flags = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((from, to)) => {
                let from = parse_number(from, false, response)?;
                let to = parse_number(to, false, response)?;
                let to = to.min(u64::from(u8::MAX));
                flags.extend((from..=to).filter_map(|f| u32::try_from(f).ok()));
            }
            None => flags.extend(parse_flag(item, response)?),
        }
    }
    Ok(flags)
}

/// Mask of a 4G range `(1-<mask>)`.
fn parse_mask_range(range: &str, hex: bool, response: &str) -> Result<u64, Error> {
    let top = range.rsplit('-').next().unwrap_or(range);
    parse_number(top, hex, response)
}

/// Translate a `#BND` reply into canonical bands.
pub fn decode(response: &str, cfg: &BndConfig, kind: BndResponse) -> Result<BTreeSet<Band>, Error> {
    let unparseable = || Error::Parse(format!("Couldn't parse #BND response: '{}'", response));
    let mut bands = BTreeSet::new();
    let mut gsm_flags = Vec::new();
    let mut utran_flag_list = Vec::new();

    match kind {
        BndResponse::Current => {
            let caps = CURRENT_RE.captures(response).ok_or_else(unparseable)?;
            gsm_flags.extend(parse_flag(&caps[1], response)?);
            if let Some(m) = caps.get(2) {
                utran_flag_list.extend(parse_flag(m.as_str(), response)?);
            }
            if cfg.modem_is_4g {
                if let Some(m) = caps.get(3) {
                    eutran_bands(parse_number(m.as_str(), cfg.hex_4g, response)?, 1, &mut bands);
                }
                if let (true, Some(m)) = (cfg.ext_4g, caps.get(4)) {
                    eutran_bands(parse_number(m.as_str(), cfg.hex_4g, response)?, 65, &mut bands);
                }
            }
        }
        BndResponse::Supported => {
            let caps = SUPPORTED_RE.captures(response).ok_or_else(unparseable)?;
            gsm_flags = parse_flag_list(&caps[1], response)?;
            if let Some(m) = caps.get(2) {
                utran_flag_list = parse_flag_list(m.as_str(), response)?;
            }
            if cfg.modem_is_4g {
                if let Some(m) = caps.get(3) {
                    let mask = parse_mask_range(m.as_str(), cfg.hex_4g, response)?;
                    eutran_bands(mask, 1, &mut bands);
                }
                if let (true, Some(m)) = (cfg.ext_4g, caps.get(4)) {
                    let mask = parse_mask_range(m.as_str(), cfg.hex_4g, response)?;
                    eutran_bands(mask, 65, &mut bands);
                }
            }
        }
    }

    if cfg.modem_is_2g {
        for flag in gsm_flags {
            if !gsm_bands(flag, &mut bands) {
                warn!("unknown #BND 2G flag '{}'", flag);
            }
        }
    }
    if cfg.modem_is_3g {
        for flag in utran_flag_list {
            if !utran_bands(flag, cfg, &mut bands) {
                warn!("unknown #BND 3G flag '{}'", flag);
            }
        }
    }

    Ok(bands)
}

const MODES_2G_3G_4G: Modes = Modes(Modes::G2.0 | Modes::G3.0 | Modes::G4.0);

/// `+WS46` mode selecting `allowed`. `supported` resolves [`Modes::ANY`].
pub fn ws46_mode_from_modes(
    allowed: Modes,
    preferred: Modes,
    supported: Modes,
    cfg: &BndConfig,
) -> Result<u8, Error> {
    let allowed = if allowed == Modes::ANY && supported != Modes::NONE {
        Modes(supported.0 & MODES_2G_3G_4G.0)
    } else {
        allowed
    };

    let mode = match allowed {
        _ if preferred != Modes::NONE => None,
        Modes::G2 => Some(12),
        Modes::G3 => Some(22),
        Modes::G4 => Some(28),
        m if m == Modes::G2 | Modes::G3 => Some(if cfg.modem_is_4g { 29 } else { 25 }),
        m if m == Modes::G2 | Modes::G4 => Some(30),
        m if m == Modes::G3 | Modes::G4 => Some(31),
        MODES_2G_3G_4G => Some(25),
        _ => None,
    };

    mode.ok_or_else(|| {
        Error::Unsupported(format!(
            "Requested mode (allowed: '{}', preferred: '{}') not supported by the modem.",
            allowed, preferred
        ))
    })
}

/// Modes selected by `+WS46: <mode>`.
pub fn modes_from_ws46(mode: u8, cfg: &BndConfig) -> Option<Modes> {
    Some(match mode {
        12 => Modes::G2,
        22 => Modes::G3,
        25 if cfg.modem_is_4g => MODES_2G_3G_4G,
        25 | 29 => Modes::G2 | Modes::G3,
        28 => Modes::G4,
        30 => Modes::G2 | Modes::G4,
        31 => Modes::G3 | Modes::G4,
        _ => return None,
    })
}
