//! Novatel LTE plugin.
//!
//! Data sessions go through the device's QMI stack, driven with AT commands.
//! The device sends nothing once a session is up, so the plugin polls
//! `$NWQMISTATUS`.

use std::rc::Rc;

use embassy_time::{Duration, Timer};

use crate::asynch::at;
use crate::asynch::bearer::{Bearer3gpp, ConnectionStatus};
use crate::asynch::sim::{SimOps, UnlockRetries};
use crate::asynch::ModemPlugin;
use crate::command::novatel::responses::{parse_pin_retries, parse_qmi_status, PinKind};
use crate::command::novatel::{
    self, PIN_RETRIES_QUERY, PIN_RETRIES_TIMEOUT, QMI_CONNECT_TIMEOUT, QMI_DISCONNECT, QMI_STATUS,
    QMI_STATUS_TIMEOUT,
};
use crate::command::parse_response;
use crate::command::sim::responses::{imsi_from_ef, RestrictedSimAccess};
use crate::command::sim::{READ_IMSI, READ_IMSI_TIMEOUT};
use crate::config::{BearerConfig, PluginConfig};
use crate::error::{CmeError, Error};
use crate::traits::{DataPort, Modem};

/// Novatel LTE devices. `+CIMI` is unreliable on them, so the IMSI is read
/// straight from EF_IMSI.
pub struct NovatelPlugin<M> {
    modem: Rc<M>,
    config: PluginConfig,
}

impl<M: Modem> NovatelPlugin<M> {
    pub fn new(modem: Rc<M>, config: PluginConfig) -> Self {
        Self { modem, config }
    }

    /// Remaining attempts of the PIN the SIM currently asks for.
    pub async fn load_unlock_retries(&self) -> Result<UnlockRetries, Error> {
        let response =
            at::command(self.modem(), PIN_RETRIES_QUERY, PIN_RETRIES_TIMEOUT, false).await?;
        let (kind, count) = parse_pin_retries(&response)?;

        let mut retries = UnlockRetries::default();
        match kind {
            PinKind::Pin => retries.pin = Some(count),
            PinKind::Pin2 => retries.pin2 = Some(count),
        }
        Ok(retries)
    }

    fn dial_port(&self) -> Result<&M::Port, Error> {
        self.modem
            .primary_port()
            .ok_or_else(|| Error::NoPort("No primary AT port to dial with".to_string()))
    }

    /// Status checks that fit in `timeout`.
    fn status_retries(&self, timeout: Duration) -> u64 {
        timeout.as_ticks() / self.config.connection_check_interval.as_ticks().max(1)
    }
}

impl<M: Modem> ModemPlugin for NovatelPlugin<M> {
    type Modem = M;

    fn modem(&self) -> &M {
        &self.modem
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }
}

impl<M: Modem> SimOps for NovatelPlugin<M> {
    async fn load_imsi(&self) -> Result<String, Error> {
        let response = at::command(self.modem(), READ_IMSI, READ_IMSI_TIMEOUT, false).await?;
        let access: RestrictedSimAccess = parse_response(&response, "+CRSM")?;
        imsi_from_ef(access.payload()?)
    }
}

impl<M: Modem> Bearer3gpp for NovatelPlugin<M> {
    async fn dial_3gpp(&self, bearer: &BearerConfig) -> Result<DataPort, Error> {
        let modem = self.modem();
        let Some(net_port @ DataPort::Net(_)) = modem.data_port() else {
            return Err(Error::NoPort(
                "Couldn't connect: no available net port available".to_string(),
            ));
        };
        let port = self.dial_port()?;
        let cancel = modem.cancellation().child();

        let command = novatel::qmi_connect(
            bearer.apn.as_deref().unwrap_or_default(),
            bearer.user.as_deref().unwrap_or_default(),
            bearer.password.as_deref().unwrap_or_default(),
        );
        at::command_full(port, &command, QMI_CONNECT_TIMEOUT, false, false, Some(&cancel)).await?;

        let interval = self.config.connection_check_interval;
        let mut retries = self.status_retries(self.config.connection_timeout);
        loop {
            at::delay(interval, &cancel).await?;

            let status =
                at::command_full(port, QMI_STATUS, QMI_STATUS_TIMEOUT, false, false, Some(&cancel))
                    .await;
            let last = match status {
                Ok(response) => {
                    let status = parse_qmi_status(&response);
                    if status.connected {
                        debug!("QMI session connected");
                        return Ok(net_port);
                    }
                    if status.call_failed {
                        debug!("not retrying: call failed");
                        retries = 0;
                    }
                    status.text
                }
                Err(e) if e.cme() == Some(CmeError::Unknown) => {
                    debug!("connection status failed: {}; will retry", e);
                    e.to_string()
                }
                Err(e) => return Err(e),
            };

            if retries == 0 {
                return Err(Error::Failed(format!("QMI connect failed: {}", last)));
            }
            retries -= 1;
            trace!("retrying status check: {} retries left", retries);
        }
    }

    /// `$NWQMIDISCONNECT`, then wait for the QMI state to settle. Only a
    /// session still reported as connected at the end is an error.
    async fn disconnect_3gpp(&self, _bearer: &BearerConfig) -> Result<(), Error> {
        let port = self.dial_port()?;

        if let Err(e) =
            at::command_full(port, QMI_DISCONNECT, QMI_CONNECT_TIMEOUT, false, false, None).await
        {
            debug!("disconnection error: {}", e);
        }

        let mut retries = self.status_retries(self.config.disconnection_timeout);
        loop {
            let still_connected =
                match at::command_full(port, QMI_STATUS, QMI_STATUS_TIMEOUT, false, false, None)
                    .await
                {
                    Ok(response) => {
                        let status = parse_qmi_status(&response);
                        debug!("QMI connection status: {}", status.text);
                        if status.disconnected {
                            return Ok(());
                        }
                        status.connected.then_some(status.text)
                    }
                    Err(e) => {
                        debug!("QMI connection status failed: {}", e);
                        None
                    }
                };

            if retries == 0 {
                return match still_connected {
                    Some(text) => Err(Error::Failed(format!("QMI disconnect failed: {}", text))),
                    None => Ok(()),
                };
            }
            retries -= 1;
            Timer::after(self.config.connection_check_interval).await;
        }
    }

    async fn load_connection_status(&self, _cid: u8) -> Result<ConnectionStatus, Error> {
        let response = at::command(self.modem(), QMI_STATUS, QMI_STATUS_TIMEOUT, false).await?;
        Ok(if parse_qmi_status(&response).disconnected {
            ConnectionStatus::Disconnected
        } else {
            ConnectionStatus::Connected
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::DeviceError;
    use crate::test_helpers::MockModem;
    use embassy_futures::block_on;

    fn plugin() -> NovatelPlugin<MockModem> {
        NovatelPlugin::new(Rc::new(MockModem::new()), PluginConfig::default())
    }

    fn qmi_plugin(config: PluginConfig) -> NovatelPlugin<MockModem> {
        let mut modem = MockModem::new();
        modem.data = Some(DataPort::Net("wwan0".to_string()));
        NovatelPlugin::new(
            Rc::new(modem),
            PluginConfig {
                connection_check_interval: Duration::from_millis(1),
                ..config
            },
        )
    }

    fn bearer() -> BearerConfig {
        BearerConfig {
            apn: Some("internet".to_string()),
            cid: 1,
            ..Default::default()
        }
    }

    const CONNECT: &str = "$NWQMICONNECT=,,,,,,\"internet\",,,\"\",\"\"";

    #[test]
    fn imsi_from_crsm() {
        let novatel = plugin();
        novatel
            .modem
            .primary
            .expect("+CRSM=176,28423,0,0,9", Ok("+CRSM: 144,0,\"083901141032547698\""));
        assert_eq!(
            block_on(novatel.load_imsi()),
            Ok("310410123456789".to_string())
        );
    }

    #[test]
    fn imsi_sim_error() {
        let novatel = plugin();
        novatel
            .modem
            .primary
            .expect("+CRSM=176,28423,0,0,9", Ok("+CRSM: 148,4,\"\""));
        assert_eq!(
            block_on(novatel.load_imsi()),
            Err(Error::Failed(
                "SIM failed to handle CRSM request (sw1 148 sw2 4)".to_string()
            ))
        );
    }

    #[test]
    fn imsi_bad_payload() {
        let novatel = plugin();
        novatel
            .modem
            .primary
            .expect("+CRSM=176,28423,0,0,9", Ok("+CRSM: 144,0,\"0839011410\""));
        assert!(matches!(block_on(novatel.load_imsi()), Err(Error::Parse(_))));
    }

    #[test]
    fn qmi_dial_polls_status() {
        let novatel = qmi_plugin(PluginConfig::default());
        let port = &novatel.modem.primary;
        port.expect(CONNECT, Ok(""));
        port.expect(QMI_STATUS, Ok("$NWQMISTATUS: QMI State: DISCONNECTED"));
        port.expect(
            QMI_STATUS,
            Err(Error::Device(DeviceError::Cme(CmeError::Unknown))),
        );
        port.expect(QMI_STATUS, Ok("$NWQMISTATUS: QMI State: CONNECTED"));

        assert_eq!(
            block_on(novatel.dial_3gpp(&bearer())),
            Ok(DataPort::Net("wwan0".to_string()))
        );
        assert_eq!(port.remaining(), 0);
    }

    #[test]
    fn qmi_dial_stops_on_call_failure() {
        let novatel = qmi_plugin(PluginConfig::default());
        let port = &novatel.modem.primary;
        port.expect(CONNECT, Ok(""));
        port.expect(
            QMI_STATUS,
            Ok("QMI State: DISCONNECTED\r\nQMI_RESULT_FAILURE:QMI_ERR_CALL_FAILED"),
        );

        assert_eq!(
            block_on(novatel.dial_3gpp(&bearer())),
            Err(Error::Failed(
                "QMI connect failed: QMI State: DISCONNECTED  QMI_RESULT_FAILURE:QMI_ERR_CALL_FAILED"
                    .to_string()
            ))
        );
    }

    #[test]
    fn qmi_dial_errors() {
        let novatel = qmi_plugin(PluginConfig::default());
        let port = &novatel.modem.primary;
        port.expect(CONNECT, Ok(""));
        port.expect(QMI_STATUS, Err(Error::Device(DeviceError::Generic)));
        assert_eq!(
            block_on(novatel.dial_3gpp(&bearer())),
            Err(Error::Device(DeviceError::Generic))
        );

        let novatel = plugin();
        assert!(matches!(
            block_on(novatel.dial_3gpp(&bearer())),
            Err(Error::NoPort(_))
        ));
        assert!(novatel.modem.primary.sent().is_empty());
    }

    #[test]
    fn qmi_disconnect() {
        let novatel = qmi_plugin(PluginConfig::default());
        let port = &novatel.modem.primary;
        port.expect(QMI_DISCONNECT, Err(Error::Device(DeviceError::Generic)));
        port.expect(QMI_STATUS, Ok("QMI State: CONNECTED"));
        port.expect(QMI_STATUS, Ok("QMI State: DISCONNECTED"));

        assert_eq!(block_on(novatel.disconnect_3gpp(&bearer())), Ok(()));
        assert_eq!(port.remaining(), 0);
    }

    #[test]
    fn qmi_disconnect_still_connected() {
        let novatel = qmi_plugin(PluginConfig {
            disconnection_timeout: Duration::from_millis(1),
            ..Default::default()
        });
        let port = &novatel.modem.primary;
        port.expect(QMI_DISCONNECT, Ok(""));
        port.expect(QMI_STATUS, Ok("QMI State: CONNECTED"));
        port.expect(QMI_STATUS, Ok("QMI State: CONNECTED"));

        assert_eq!(
            block_on(novatel.disconnect_3gpp(&bearer())),
            Err(Error::Failed("QMI disconnect failed: QMI State: CONNECTED".to_string()))
        );
        assert_eq!(port.remaining(), 0);
    }

    #[test]
    fn qmi_connection_status() {
        let novatel = plugin();
        novatel
            .modem
            .primary
            .expect(QMI_STATUS, Ok("QMI State: QMI_WDS_PKT_DATA_DISCONNECTED"));
        assert_eq!(
            block_on(novatel.load_connection_status(1)),
            Ok(ConnectionStatus::Disconnected)
        );
        novatel
            .modem
            .primary
            .expect(QMI_STATUS, Ok("QMI State: CONNECTED"));
        assert_eq!(
            block_on(novatel.load_connection_status(1)),
            Ok(ConnectionStatus::Connected)
        );
    }

    #[test]
    fn unlock_retries() {
        let novatel = plugin();
        novatel
            .modem
            .primary
            .expect(PIN_RETRIES_QUERY, Ok("$NWPINR: PIN1, 3"));
        assert_eq!(
            block_on(novatel.load_unlock_retries()),
            Ok(UnlockRetries {
                pin: Some(3),
                ..Default::default()
            })
        );

        novatel
            .modem
            .primary
            .expect(PIN_RETRIES_QUERY, Ok("$NWPINR: PUK1, 10"));
        assert!(matches!(
            block_on(novatel.load_unlock_retries()),
            Err(Error::Failed(_))
        ));
    }
}
