//! SIM operations shared by every vendor, overridable per plugin.

use super::ModemPlugin;
use crate::command::device_lock::types::PinStatusCode;
use crate::error::Error;

/// Remaining PIN/PUK attempts. Counters the SIM did not report are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnlockRetries {
    pub pin: Option<u32>,
    pub puk: Option<u32>,
    pub pin2: Option<u32>,
    pub puk2: Option<u32>,
}

impl UnlockRetries {
    pub fn is_empty(&self) -> bool {
        self.pin.is_none() && self.puk.is_none() && self.pin2.is_none() && self.puk2.is_none()
    }
}

#[allow(async_fn_in_trait)]
pub trait SimOps: ModemPlugin {
    /// ICCID of the inserted SIM.
    async fn load_sim_identifier(&self) -> Result<String, Error> {
        default::load_sim_identifier(self.modem()).await
    }

    async fn load_imsi(&self) -> Result<String, Error> {
        default::load_imsi(self.modem()).await
    }

    async fn send_pin(&self, pin: &str) -> Result<(), Error> {
        default::send_pin(self.modem(), pin).await
    }

    /// Unblock with `puk` and set `pin` as the new PIN.
    async fn send_puk(&self, puk: &str, pin: &str) -> Result<(), Error> {
        default::send_puk(self.modem(), puk, pin).await
    }

    async fn load_unlock_required(&self) -> Result<PinStatusCode, Error> {
        default::load_unlock_required(self.modem()).await
    }
}

pub mod default {
    use crate::asynch::at;
    use crate::command::device_lock::responses::PinStatus;
    use crate::command::device_lock::types::PinStatusCode;
    use crate::command::device_lock::{self, GET_PIN_STATUS, PIN_TIMEOUT};
    use crate::command::parse_response;
    use crate::command::sim::responses::{iccid_from_bcd, parse_imsi, RestrictedSimAccess};
    use crate::command::sim::{GET_IMSI, GET_IMSI_TIMEOUT, READ_ICCID, READ_ICCID_TIMEOUT};
    use crate::error::{CmeError, Error};
    use crate::traits::Modem;

    /// Read EF_ICCID through restricted SIM access.
    pub async fn load_sim_identifier<M: Modem>(modem: &M) -> Result<String, Error> {
        let response = at::command(modem, READ_ICCID, READ_ICCID_TIMEOUT, false).await?;
        let access: RestrictedSimAccess = parse_response(&response, "+CRSM")?;
        iccid_from_bcd(access.payload()?)
    }

    pub async fn load_imsi<M: Modem>(modem: &M) -> Result<String, Error> {
        let response = at::command(modem, GET_IMSI, GET_IMSI_TIMEOUT, true).await?;
        parse_imsi(&response)
    }

    pub async fn send_pin<M: Modem>(modem: &M, pin: &str) -> Result<(), Error> {
        if modem.unlock_required() != PinStatusCode::SimPin {
            return Err(Error::WrongState(
                "Cannot send PIN: device is not SIM-PIN locked".to_string(),
            ));
        }

        match at::command(modem, &device_lock::set_pin(pin), PIN_TIMEOUT, false).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.cme() == Some(CmeError::SimPukRequired) {
                    modem.process_sim_event();
                }
                Err(e)
            }
        }
    }

    pub async fn send_puk<M: Modem>(modem: &M, puk: &str, pin: &str) -> Result<(), Error> {
        if modem.unlock_required() != PinStatusCode::SimPuk {
            return Err(Error::WrongState(
                "Cannot send PUK: device is not SIM-PUK locked".to_string(),
            ));
        }

        let command = device_lock::set_pin_with_puk(puk, pin);
        match at::command(modem, &command, PIN_TIMEOUT, false).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if matches!(
                    e.cme(),
                    Some(CmeError::SimNotInserted | CmeError::SimFailure | CmeError::SimWrong)
                ) {
                    modem.process_sim_event();
                }
                Err(e)
            }
        }
    }

    pub async fn load_unlock_required<M: Modem>(modem: &M) -> Result<PinStatusCode, Error> {
        let response = at::command(modem, GET_PIN_STATUS, PIN_TIMEOUT, false).await?;
        let status: PinStatus = parse_response(&response, "+CPIN")?;
        Ok(status.code)
    }
}
