pub mod huawei;
pub mod linktop;
pub mod novatel;
pub mod sierra;
pub mod telit;
pub mod via;

use embassy_time::Duration;

/// Voice audio stream format a Huawei device streams over its audio port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSettings {
    pub hz: u32,
    pub bits: u32,
}

pub trait ModuleParams: Copy {
    /// How long to wait between the end of one AT command and the start of the
    /// next within a sequence
    fn command_delay_default(&self) -> Option<Duration> {
        None
    }

    /// How long to wait after `+CFUN=1` before the module is usable. Devices
    /// bound to the `sierra` kernel driver come up faster.
    fn power_up_wait(&self, drivers: &[String]) -> Duration {
        let _ = drivers;
        Duration::MIN
    }

    /// Whether PDP authentication goes through `%IPDPCFG` rather than
    /// `$QCPDPP`
    fn is_icera(&self) -> bool {
        false
    }

    /// Outgoing calls report the remote end ringing with a URC
    fn call_supports_dialing_to_ringing(&self) -> bool {
        false
    }

    /// Outgoing calls report the remote end answering with a URC
    fn call_supports_ringing_to_active(&self) -> bool {
        false
    }

    fn audio_settings(&self) -> Option<AudioSettings> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Module {
    Huawei(huawei::Huawei),
    Linktop(linktop::Linktop),
    Novatel(novatel::Novatel),
    Sierra(sierra::Sierra),
    Telit(telit::Telit),
    Via(via::Via),
    Generic(Generic),
}

impl Module {
    /// Pick the parameter set from the `+CGMI` manufacturer string.
    pub fn from_manufacturer(manufacturer: &str) -> Self {
        let lower = manufacturer.trim().to_ascii_lowercase();
        match lower.as_str() {
            m if m.contains("huawei") => Self::Huawei(huawei::Huawei::default()),
            m if m.contains("linktop") => Self::Linktop(linktop::Linktop),
            m if m.contains("novatel") => Self::Novatel(novatel::Novatel),
            m if m.contains("sierra") => Self::Sierra(sierra::Sierra::default()),
            m if m.contains("telit") => Self::Telit(telit::Telit),
            m if m.contains("via") => Self::Via(via::Via),
            _ => {
                warn!(
                    "Attempting to run {:?} using generic module parameters! This may or may not work.",
                    manufacturer
                );
                Self::Generic(Generic)
            }
        }
    }
}

macro_rules! inner {
    ($self: ident, $fn: ident $(, $arg: expr)*) => {
        match $self {
            Self::Huawei(inner) => inner.$fn($($arg),*),
            Self::Linktop(inner) => inner.$fn($($arg),*),
            Self::Novatel(inner) => inner.$fn($($arg),*),
            Self::Sierra(inner) => inner.$fn($($arg),*),
            Self::Telit(inner) => inner.$fn($($arg),*),
            Self::Via(inner) => inner.$fn($($arg),*),
            Self::Generic(inner) => inner.$fn($($arg),*),
        }
    };
}

impl ModuleParams for Module {
    fn command_delay_default(&self) -> Option<Duration> {
        inner!(self, command_delay_default)
    }

    fn power_up_wait(&self, drivers: &[String]) -> Duration {
        inner!(self, power_up_wait, drivers)
    }

    fn is_icera(&self) -> bool {
        inner!(self, is_icera)
    }

    fn call_supports_dialing_to_ringing(&self) -> bool {
        inner!(self, call_supports_dialing_to_ringing)
    }

    fn call_supports_ringing_to_active(&self) -> bool {
        inner!(self, call_supports_ringing_to_active)
    }

    fn audio_settings(&self) -> Option<AudioSettings> {
        inner!(self, audio_settings)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Generic;

impl ModuleParams for Generic {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn module_from_manufacturer() {
        assert!(matches!(
            Module::from_manufacturer("Sierra Wireless, Incorporated"),
            Module::Sierra(_)
        ));
        assert!(matches!(Module::from_manufacturer("Telit\r\n"), Module::Telit(_)));
        assert!(matches!(Module::from_manufacturer("Acme"), Module::Generic(_)));
    }

    #[test]
    fn dispatch() {
        let sierra = Module::Sierra(sierra::Sierra { icera: true });
        assert!(sierra.is_icera());
        assert_eq!(
            sierra.power_up_wait(&["sierra".to_string()]),
            Duration::from_secs(5)
        );
        assert_eq!(sierra.power_up_wait(&[]), Duration::from_secs(10));

        let huawei = Module::from_manufacturer("huawei");
        assert!(huawei.call_supports_dialing_to_ringing());
        assert_eq!(Module::Generic(Generic).power_up_wait(&[]), Duration::MIN);
    }
}
