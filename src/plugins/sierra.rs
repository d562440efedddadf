use std::rc::Rc;

use crate::asynch::at;
use crate::asynch::bearer::default as generic_bearer;
use crate::asynch::bearer::{Bearer3gpp, ConnectionStatus};
use crate::asynch::sim::{self, SimOps};
use crate::asynch::ModemPlugin;
use crate::command::mobile_control::responses::PhoneFunctionality;
use crate::command::mobile_control::{
    FUNCTIONALITY_TIMEOUT, GET_FUNCTIONALITY, SET_FULL_FUNCTIONALITY,
};
use crate::command::packet_domain::{ATTACH_TIMEOUT, PS_ATTACH};
use crate::command::parse_response;
use crate::command::sierra::responses::{parse_iccid, parse_scact_status};
use crate::command::sierra::{
    self, AUTH_TIMEOUT, DEACTIVATE_TIMEOUT, ICCID_QUERY, ICCID_TIMEOUT, PCSTATE_ON, PCSTATE_TIMEOUT,
    SCACT_QUERY, SCACT_QUERY_TIMEOUT,
};
use crate::config::{AllowedAuth, BearerConfig, PluginConfig};
use crate::error::Error;
use crate::modules::ModuleParams;
use crate::traits::{DataPort, Modem};

pub struct SierraPlugin<M> {
    modem: Rc<M>,
    config: PluginConfig,
}

impl<M: Modem> SierraPlugin<M> {
    pub fn new(modem: Rc<M>, config: PluginConfig) -> Self {
        Self { modem, config }
    }

    /// Bring the radio up. Devices already at full functionality are left
    /// alone.
    pub async fn power_up(&self) -> Result<(), Error> {
        let modem = self.modem();

        if modem.is_cdma_only() {
            if let Err(e) = at::command(modem, PCSTATE_ON, PCSTATE_TIMEOUT, false).await {
                debug!("!pcstate=1 failed: {}", e);
            }
            return Ok(());
        }

        match at::command(modem, GET_FUNCTIONALITY, FUNCTIONALITY_TIMEOUT, false).await {
            Ok(response) => {
                let full = parse_response::<PhoneFunctionality>(&response, "+CFUN")
                    .is_ok_and(|f| f.is_full());
                if full {
                    debug!("Already in full functionality mode");
                    return Ok(());
                }
            }
            Err(e) => {
                warn!("Couldn't query power state, assuming power up not needed: {}", e);
                return Ok(());
            }
        }

        at::command(modem, SET_FULL_FUNCTIONALITY, FUNCTIONALITY_TIMEOUT, false).await?;

        // CFUN=1 returns OK before the radio is usable
        let wait = modem.module().power_up_wait(modem.drivers());
        at::delay(wait, modem.cancellation()).await
    }
}

impl<M: Modem> ModemPlugin for SierraPlugin<M> {
    type Modem = M;

    fn modem(&self) -> &M {
        &self.modem
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }
}

impl<M: Modem> SimOps for SierraPlugin<M> {
    async fn load_sim_identifier(&self) -> Result<String, Error> {
        let iccid = match at::command(self.modem(), ICCID_QUERY, ICCID_TIMEOUT, false).await {
            Ok(response) => parse_iccid(&response),
            Err(e) => Err(e),
        };
        match iccid {
            Ok(iccid) => Ok(iccid),
            Err(e) => {
                warn!("Couldn't load ICCID with !ICCID, using generic loader: {}", e);
                sim::default::load_sim_identifier(self.modem()).await
            }
        }
    }
}

enum DialStep {
    First,
    PsAttach,
    Authenticate,
    Connect,
    Last(DataPort),
}

impl<M: Modem> Bearer3gpp for SierraPlugin<M> {
    async fn dial_3gpp(&self, bearer: &BearerConfig) -> Result<DataPort, Error> {
        let modem = self.modem();
        let cancel = modem.cancellation().child();
        let net_port = match modem.data_port() {
            Some(port @ DataPort::Net(_)) => Some(port),
            _ => None,
        };

        let mut step = DialStep::First;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            step = match step {
                DialStep::First => DialStep::PsAttach,
                DialStep::PsAttach => {
                    debug!("Attaching to packet service");
                    at::command(modem, PS_ATTACH, ATTACH_TIMEOUT, false).await?;
                    DialStep::Authenticate
                }
                DialStep::Authenticate => {
                    if net_port.is_some() {
                        let command = auth_command(modem.module().is_icera(), bearer)?;
                        at::command(modem, &command, AUTH_TIMEOUT, false).await?;
                    } else {
                        debug!("Not using a net port, skipping authentication");
                    }
                    DialStep::Connect
                }
                DialStep::Connect => match &net_port {
                    Some(port) => {
                        at::command(
                            modem,
                            &sierra::scact(true, bearer.cid),
                            self.config.connection_timeout,
                            false,
                        )
                        .await?;
                        DialStep::Last(port.clone())
                    }
                    None => DialStep::Last(generic_bearer::dial_3gpp(modem, bearer).await?),
                },
                DialStep::Last(port) => return Ok(port),
            };
        }
    }

    async fn disconnect_3gpp(&self, bearer: &BearerConfig) -> Result<(), Error> {
        let modem = self.modem();

        match at::command(modem, &sierra::scact(false, bearer.cid), DEACTIVATE_TIMEOUT, false).await
        {
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => debug!("Couldn't deactivate context {} with !SCACT: {}", bearer.cid, e),
            Ok(_) => {}
        }

        match generic_bearer::disconnect_3gpp(modem, bearer).await {
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => warn!("Generic disconnection failed: {}", e),
            Ok(()) => {}
        }
        Ok(())
    }

    async fn load_connection_status(&self, cid: u8) -> Result<ConnectionStatus, Error> {
        let response = at::command(self.modem(), SCACT_QUERY, SCACT_QUERY_TIMEOUT, false).await?;
        parse_scact_status(&response)
            .into_iter()
            .find(|(c, _)| *c == cid)
            .map(|(_, active)| {
                if active {
                    ConnectionStatus::Connected
                } else {
                    ConnectionStatus::Disconnected
                }
            })
            .ok_or_else(|| {
                Error::Failed(format!(
                    "Couldn't find PDP context {} in !SCACT? response '{}'",
                    cid, response
                ))
            })
    }
}

/// PDP context authentication command for `bearer`.
fn auth_command(icera: bool, bearer: &BearerConfig) -> Result<String, Error> {
    let cid = bearer.cid;

    if !bearer.has_credentials() || bearer.allowed_auth == AllowedAuth::NONE {
        return Ok(if icera {
            sierra::ipdpcfg_none(cid)
        } else {
            sierra::qcpdpp_none(cid)
        });
    }

    let auth = bearer.allowed_auth;
    let value = if auth.is_unknown() || auth.contains(AllowedAuth::CHAP) {
        2
    } else if auth.contains(AllowedAuth::PAP) {
        1
    } else {
        return Err(Error::Unsupported(format!(
            "Cannot use any of the specified authentication methods ({})",
            auth
        )));
    };

    let user = bearer.user.as_deref().unwrap_or_default();
    let password = bearer.password.as_deref().unwrap_or_default();
    Ok(if icera {
        sierra::ipdpcfg(cid, value, user, password)
    } else {
        sierra::qcpdpp(cid, value, user, password)
    })
}
