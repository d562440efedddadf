//! VIA CBP7 plugin.
//!
//! SIM and 3GPP bearer handling are the generic ones. On the CDMA side the
//! device has `^SYSINFO` for detailed registration state and reports EVDO
//! signal strength with `^HRSSILVL`.

use std::rc::Rc;

use regex::Captures;

use crate::asynch::at;
use crate::asynch::bearer::Bearer3gpp;
use crate::asynch::sim::SimOps;
use crate::asynch::ModemPlugin;
use crate::command::via::responses::{parse_sysinfo, SysInfo, HRSSILVL_URC, IGNORED_URCS};
use crate::command::via::{SYSINFO, SYSINFO_TIMEOUT};
use crate::config::PluginConfig;
use crate::error::Error;
use crate::traits::{AtPort, Modem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdmaRegistrationState {
    Unknown,
    /// Registered, home or roaming not known
    Registered,
    Home,
    Roaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdmaRegistration {
    pub cdma1x: CdmaRegistrationState,
    pub evdo: CdmaRegistrationState,
}

/// Steps the host runs to find out the CDMA registration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistrationChecks {
    pub qcdm_call_manager: bool,
    pub qcdm_hdr: bool,
    /// `+CAD?`
    pub at_cdma_service_status: bool,
    /// `+CSS?`
    pub at_cdma1x_serving_system: bool,
    pub detailed_registration_state: bool,
}

pub struct ViaPlugin<M> {
    modem: Rc<M>,
    config: PluginConfig,
}

impl<M: Modem> ViaPlugin<M> {
    pub fn new(modem: Rc<M>, config: PluginConfig) -> Self {
        Self { modem, config }
    }

    /// `+CSS` and `+CAD` are replaced by `^SYSINFO`.
    pub fn registration_checks(&self, generic: RegistrationChecks) -> RegistrationChecks {
        RegistrationChecks {
            at_cdma_service_status: false,
            at_cdma1x_serving_system: false,
            detailed_registration_state: true,
            ..generic
        }
    }

    /// Refine `current`, the state the generic checks found while the device
    /// is registered, with `^SYSINFO`. Devices without it keep `current`.
    pub async fn detailed_registration_state(
        &self,
        current: CdmaRegistration,
    ) -> Result<CdmaRegistration, Error> {
        let response = match at::command(self.modem(), SYSINFO, SYSINFO_TIMEOUT, false).await {
            Ok(response) => response,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                debug!("^SYSINFO failed: {}", e);
                return Ok(current);
            }
        };
        let info = match parse_sysinfo(&response) {
            Ok(info) => info,
            Err(e) => {
                warn!("{}", e);
                return Ok(current);
            }
        };

        let state = match (info.srv_status, info.roam_status) {
            (SysInfo::SERVICE_AVAILABLE, 0) => CdmaRegistrationState::Home,
            (SysInfo::SERVICE_AVAILABLE, 1) => CdmaRegistrationState::Roaming,
            _ => CdmaRegistrationState::Registered,
        };

        let mut detailed = current;
        match info.sys_mode {
            SysInfo::MODE_CDMA => detailed.cdma1x = state,
            SysInfo::MODE_HDR => detailed.evdo = state,
            SysInfo::MODE_HYBRID => {
                detailed.cdma1x = state;
                detailed.evdo = state;
            }
            _ => {}
        }
        Ok(detailed)
    }
}

impl<M: Modem + 'static> ViaPlugin<M> {
    /// Forward `^HRSSILVL` reports on every AT port to the modem.
    pub fn setup_unsolicited_events(&self) {
        for port in self.modem.at_ports() {
            let modem = Rc::downgrade(&self.modem);
            port.add_unsolicited_handler(
                HRSSILVL_URC.clone(),
                Rc::new(move |caps: &Captures<'_>| {
                    let Some(modem) = modem.upgrade() else {
                        return;
                    };
                    if let Ok(level) = caps[1].trim().parse::<u32>() {
                        let quality = u8::try_from(level.min(100)).unwrap_or(100);
                        debug!("EVDO signal quality: {}", quality);
                        modem.signal_quality_changed(quality);
                    }
                }),
            );
        }
    }

    pub fn cleanup_unsolicited_events(&self) {
        for port in self.modem.at_ports() {
            port.remove_unsolicited_handler(HRSSILVL_URC.as_str());
        }
    }

    /// Swallow the reports listed in [`IGNORED_URCS`].
    pub fn set_ignored_unsolicited_events(&self) {
        for port in self.modem.at_ports() {
            for pattern in IGNORED_URCS.iter() {
                port.add_unsolicited_handler(pattern.clone(), Rc::new(|_: &Captures<'_>| {}));
            }
        }
    }
}

impl<M: Modem> ModemPlugin for ViaPlugin<M> {
    type Modem = M;

    fn modem(&self) -> &M {
        &self.modem
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }
}

impl<M: Modem> SimOps for ViaPlugin<M> {}

impl<M: Modem> Bearer3gpp for ViaPlugin<M> {}
