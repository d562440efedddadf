use super::ModuleParams;
use crate::band::telit::BndConfig;
use crate::band::Modes;

#[derive(Debug, Clone, Copy)]
pub struct Telit;

impl ModuleParams for Telit {}

/// Telit product family, identified by the leading digits of the firmware
/// revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelitModel {
    Default,
    Fn980,
    Fn990,
    Le910c1,
    Lm940,
    Lm960,
    Ln920,
}

impl TelitModel {
    pub fn from_revision(revision: &str) -> Self {
        const PREFIXES: [(&str, TelitModel); 6] = [
            ("24.01", TelitModel::Lm940),
            ("25.", TelitModel::Le910c1),
            ("32.", TelitModel::Lm960),
            ("38.", TelitModel::Fn980),
            ("40.", TelitModel::Ln920),
            ("45.00", TelitModel::Fn990),
        ];
        let revision = revision.trim();
        PREFIXES
            .iter()
            .find(|(prefix, _)| revision.starts_with(prefix))
            .map(|(_, model)| *model)
            .unwrap_or(Self::Default)
    }
}

/// `major.minor.micro` of a Telit revision such as `24.01.516-B001`.
fn version(revision: &str) -> Option<(u32, u32, u32)> {
    let mut parts = revision
        .trim()
        .split(|c: char| c == '.' || c == '-')
        .map(|p| p.parse::<u32>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(major)), Some(Ok(minor)), Some(Ok(micro))) => Some((major, minor, micro)),
        _ => None,
    }
}

/// `#BND` layout of a device given its firmware revision and the access
/// technologies it supports.
pub fn bnd_config(revision: &str, caps: Modes) -> BndConfig {
    use TelitModel::*;

    let model = TelitModel::from_revision(revision);
    let lm940_ext = version(revision).is_some_and(|v| v >= (24, 1, 516));

    BndConfig {
        modem_is_2g: caps.contains(Modes::G2),
        modem_is_3g: caps.contains(Modes::G3),
        modem_is_4g: caps.contains(Modes::G4),
        alternate_3g: matches!(model, Fn980 | Fn990 | Lm940 | Lm960 | Ln920),
        hex_4g: matches!(model, Fn980 | Le910c1 | Lm940 | Lm960 | Ln920),
        ext_4g: matches!(model, Fn980 | Fn990 | Lm960 | Ln920) || (model == Lm940 && lm940_ext),
    }
}
