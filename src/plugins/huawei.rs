use std::rc::Rc;

use regex::Captures;

use embassy_time::Duration;

use crate::asynch::at;
use crate::asynch::bearer::{Bearer3gpp, IpConfig, StaticIpv4};
use crate::asynch::call::{AudioFormat, Call, CallEvent, CallStateReason, CallUrc, CallVendor};
use crate::asynch::sim::{self, SimOps};
use crate::asynch::ModemPlugin;
use crate::cancel::CancellationToken;
use crate::command::huawei::responses::{
    parse_dhcp, parse_iccid, parse_ndisstatqry, CEND_URC, CONF_URC, CONN_URC, DDTMF_URC,
};
use crate::command::huawei::{
    self, NdisAuth, DDSETEX, DDSETEX_TIMEOUT, DHCP_QUERY, ICCID_QUERY, ICCID_TIMEOUT,
    NDISSTATQRY, NDIS_TIMEOUT,
};
use crate::command::sim::responses::iccid_from_bcd;
use crate::config::{AllowedAuth, BearerConfig, IpFamily, PluginConfig};
use crate::error::{CmeError, DeviceError, Error};
use crate::modules::ModuleParams;
use crate::traits::{AtPort, DataPort, Modem};

/// Unparseable `^NDISSTATQRY?` replies tolerated before giving up.
const MAX_FAILED_NDISSTATQRY: u32 = 10;

pub struct HuaweiPlugin<M> {
    modem: Rc<M>,
    config: PluginConfig,
}

impl<M: Modem> HuaweiPlugin<M> {
    pub fn new(modem: Rc<M>, config: PluginConfig) -> Self {
        Self { modem, config }
    }
}

impl<M: Modem + 'static> HuaweiPlugin<M> {
    pub fn create_call(&self, number: &str) -> Rc<Call<M, HuaweiCall>> {
        Call::new_outgoing(self.modem.clone(), self.config.clone(), HuaweiCall, number)
    }

    pub fn create_incoming_call(
        &self,
        number: Option<&str>,
        index: u32,
    ) -> Rc<Call<M, HuaweiCall>> {
        Call::new_incoming(
            self.modem.clone(),
            self.config.clone(),
            HuaweiCall,
            number,
            index,
        )
    }
}

impl<M: Modem> ModemPlugin for HuaweiPlugin<M> {
    type Modem = M;

    fn modem(&self) -> &M {
        &self.modem
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }
}

impl<M: Modem> SimOps for HuaweiPlugin<M> {
    async fn load_sim_identifier(&self) -> Result<String, Error> {
        match load_iccid(self.modem()).await {
            Ok(iccid) => Ok(iccid),
            Err(e) => {
                warn!("Couldn't load ICCID with ^ICCID, using generic loader: {}", e);
                sim::default::load_sim_identifier(self.modem()).await
            }
        }
    }
}

enum DialStep {
    First,
    Ndisdup,
    Ndisstatqry,
    Last(DataPort),
}

impl<M: Modem> HuaweiPlugin<M> {
    fn dial_port(&self) -> Result<&M::Port, Error> {
        self.modem
            .primary_port()
            .ok_or_else(|| Error::NoPort("No primary AT port to dial with".to_string()))
    }

    /// Query `^NDISSTATQRY?` until the IPv4 context reports `connected`.
    async fn wait_ndis_state(
        &self,
        port: &M::Port,
        connected: bool,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let interval = self.config.connection_check_interval;
        let max_checks = timeout.as_ticks() / interval.as_ticks().max(1);
        let mut checks = 0;
        let mut failed = 0;

        loop {
            if checks >= max_checks {
                return Err(Error::Device(DeviceError::Cme(CmeError::NetworkTimeout)));
            }
            if failed > MAX_FAILED_NDISSTATQRY {
                return Err(Error::Unsupported(
                    "Too many unexpected ^NDISSTATQRY responses".to_string(),
                ));
            }
            checks += 1;

            let status = match ndis_command(port, NDISSTATQRY, Some(cancel)).await {
                Ok(response) => parse_ndisstatqry(&response),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => Err(e),
            };
            match status {
                Ok(status) if status.ipv4.is_some_and(|c| c.connected == connected) => {
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => {
                    failed += 1;
                    debug!(
                        "unexpected response to ^NDISSTATQRY command: {} ({} attempts so far)",
                        e, failed
                    );
                }
            }

            at::delay(interval, cancel).await?;
        }
    }

    /// Tear down a half-made session after a cancelled dial.
    async fn abort_dial(&self, port: &M::Port, bearer: &BearerConfig, step: &DialStep) -> Error {
        if matches!(step, DialStep::Ndisstatqry | DialStep::Last(_)) {
            let command = huawei::ndisdup_disconnect(bearer.cid);
            if let Err(e) = ndis_command(port, &command, None).await {
                debug!("^NDISDUP disconnection after cancel failed: {}", e);
            }
        }
        Error::Cancelled
    }
}

async fn ndis_command<P: AtPort>(
    port: &P,
    command: &str,
    cancel: Option<&CancellationToken>,
) -> Result<String, Error> {
    at::command_full(port, command, NDIS_TIMEOUT, false, false, cancel).await
}

impl<M: Modem> Bearer3gpp for HuaweiPlugin<M> {
    /// NDIS data session on the modem's network interface, IPv4 only.
    async fn dial_3gpp(&self, bearer: &BearerConfig) -> Result<DataPort, Error> {
        let modem = self.modem();
        let cancel = modem.cancellation().child();
        let Some(net_port @ DataPort::Net(_)) = modem.data_port() else {
            return Err(Error::NoPort(
                "No valid data port found to launch connection".to_string(),
            ));
        };
        let port = self.dial_port()?;

        let mut step = DialStep::First;
        loop {
            if cancel.is_cancelled() {
                return Err(self.abort_dial(port, bearer, &step).await);
            }

            let next = match &step {
                DialStep::First => match bearer.ip_type {
                    None | Some(IpFamily::Ipv4) => Ok(DialStep::Ndisdup),
                    Some(_) => {
                        return Err(Error::Unsupported(
                            "Only IPv4 is supported by this modem".to_string(),
                        ))
                    }
                },
                DialStep::Ndisdup => ndis_command(port, &ndisdup_command(bearer), Some(&cancel))
                    .await
                    .map(|_| DialStep::Ndisstatqry),
                DialStep::Ndisstatqry => self
                    .wait_ndis_state(port, true, self.config.connection_timeout, &cancel)
                    .await
                    .map(|()| DialStep::Last(net_port.clone())),
                DialStep::Last(data) => return Ok(data.clone()),
            };

            step = match next {
                Ok(next) => next,
                Err(Error::Cancelled) => return Err(self.abort_dial(port, bearer, &step).await),
                Err(e) => return Err(e),
            };
        }
    }

    async fn disconnect_3gpp(&self, bearer: &BearerConfig) -> Result<(), Error> {
        let port = self.dial_port()?;

        // ERROR on an already disconnected context; the status check decides
        let command = huawei::ndisdup_disconnect(bearer.cid);
        if let Err(e) = ndis_command(port, &command, None).await {
            debug!("^NDISDUP disconnection failed: {}", e);
        }

        let timeout = self.config.disconnection_timeout;
        self.wait_ndis_state(port, false, timeout, &CancellationToken::new())
            .await
    }

    /// Static settings from `^DHCP?`, DHCP when the device won't tell.
    async fn load_ip_config(&self, _bearer: &BearerConfig) -> Result<IpConfig, Error> {
        let port = self.dial_port()?;
        let cancel = self.modem.cancellation().child();
        let response = match ndis_command(port, DHCP_QUERY, Some(&cancel)).await {
            Ok(response) => response,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                debug!("^DHCP query failed: {}", e);
                return Ok(IpConfig::Dhcp);
            }
        };

        match parse_dhcp(&response) {
            Ok(info) => Ok(IpConfig::Static(StaticIpv4 {
                address: info.address,
                prefix: info.prefix,
                gateway: Some(info.gateway),
                dns: info.dns1.into_iter().chain(info.dns2).collect(),
            })),
            Err(e) => {
                debug!("unexpected response to ^DHCP command: {}", e);
                Ok(IpConfig::Dhcp)
            }
        }
    }
}

/// `^NDISDUP` connect command. Credentials without an explicit method use
/// CHAP.
fn ndisdup_command(bearer: &BearerConfig) -> String {
    let apn = bearer.apn.as_deref().unwrap_or_default();
    if bearer.user.is_none() && bearer.password.is_none() {
        return huawei::ndisdup_connect(bearer.cid, apn);
    }

    let auth = match bearer.allowed_auth {
        a if a == AllowedAuth::PAP => NdisAuth::Pap,
        a if a == AllowedAuth::CHAP => NdisAuth::Chap,
        a if a == AllowedAuth::MSCHAPV2 => NdisAuth::MsChapV2,
        _ => {
            debug!("using default (CHAP) authentication method");
            NdisAuth::Chap
        }
    };
    huawei::ndisdup_connect_auth(
        bearer.cid,
        apn,
        bearer.user.as_deref().unwrap_or_default(),
        bearer.password.as_deref().unwrap_or_default(),
        auth,
    )
}

async fn load_iccid<M: Modem>(modem: &M) -> Result<String, Error> {
    let response = at::command(modem, ICCID_QUERY, ICCID_TIMEOUT, false).await?;
    iccid_from_bcd(parse_iccid(&response)?)
}

static HUAWEI_URCS: [CallUrc; 4] = [
    CallUrc {
        pattern: &CONF_URC,
        event: |_| Some(CallEvent::RemoteRinging),
    },
    CallUrc {
        pattern: &CONN_URC,
        event: |_| Some(CallEvent::RemoteAnswered),
    },
    CallUrc {
        pattern: &CEND_URC,
        event: |_| Some(CallEvent::Ended(CallStateReason::Terminated)),
    },
    CallUrc {
        pattern: &DDTMF_URC,
        event: |caps: &Captures<'_>| caps.get(1).map(|m| CallEvent::Dtmf(m.as_str().to_string())),
    },
];

/// Huawei voice calls: `^CONF`/`^CONN`/`^CEND` progress reports, `^DDTMF`
/// and audio over the USB audio port.
#[derive(Debug, Clone, Copy, Default)]
pub struct HuaweiCall;

impl CallVendor for HuaweiCall {
    fn in_call_urcs(&self) -> &'static [CallUrc] {
        &HUAWEI_URCS
    }

    async fn setup_audio_channel<M: Modem>(&self, modem: &M) -> Result<Option<AudioFormat>, Error> {
        let Some(audio) = modem.module().audio_settings() else {
            return Ok(None);
        };

        at::command(modem, DDSETEX, DDSETEX_TIMEOUT, false).await?;
        Ok(Some(AudioFormat {
            encoding: "pcm".to_string(),
            resolution: format!("s{}le", audio.bits),
            rate: audio.hz,
        }))
    }
}

#[cfg(test)]
mod test {
    use core::cell::RefCell;

    use super::*;
    use crate::asynch::call::{CallListener, CallState};
    use crate::error::DeviceError;
    use crate::modules::{huawei::Huawei, AudioSettings, Module};
    use crate::test_helpers::MockModem;
    use embassy_futures::join::join;
    use embassy_futures::{block_on, yield_now};
    use std::net::Ipv4Addr;

    fn plugin(module: Huawei) -> HuaweiPlugin<MockModem> {
        let module = Module::Huawei(module);
        HuaweiPlugin::new(
            Rc::new(MockModem::with_module(module)),
            PluginConfig::for_module(&module),
        )
    }

    fn ndis_plugin(config: PluginConfig) -> HuaweiPlugin<MockModem> {
        let mut modem = MockModem::with_module(Module::Huawei(Huawei::default()));
        modem.data = Some(DataPort::Net("wwan0".to_string()));
        HuaweiPlugin::new(Rc::new(modem), config)
    }

    fn fast_polling() -> PluginConfig {
        PluginConfig {
            connection_check_interval: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn bearer() -> BearerConfig {
        BearerConfig {
            apn: Some("internet".to_string()),
            cid: 1,
            ..Default::default()
        }
    }

    const DISCONNECTED: &str = "^NDISSTATQRY: 0,,,\"IPV4\"";
    const CONNECTED: &str = "^NDISSTATQRY: 1,,,\"IPV4\"";

    #[test]
    fn iccid() {
        let huawei = plugin(Huawei::default());
        huawei
            .modem
            .primary
            .expect("^ICCID?", Ok("^ICCID: \"98681031098209032642\""));
        assert_eq!(
            block_on(huawei.load_sim_identifier()),
            Ok("89860113902890306224".to_string())
        );
    }

    #[test]
    fn iccid_falls_back_to_crsm() {
        let huawei = plugin(Huawei::default());
        huawei
            .modem
            .primary
            .expect("^ICCID?", Err(Error::Device(DeviceError::Generic)));
        huawei
            .modem
            .primary
            .expect("+CRSM=176,12258,0,0,10", Ok("+CRSM: 144,0,\"986712345678901234\""));
        assert_eq!(
            block_on(huawei.load_sim_identifier()),
            Ok("897621436587092143".to_string())
        );
    }

    #[derive(Default)]
    struct Dtmf(RefCell<Vec<String>>);

    impl CallListener for Dtmf {
        fn dtmf_received(&self, dtmf: &str) {
            self.0.borrow_mut().push(dtmf.to_string());
        }
    }

    #[test]
    fn call_progress_urcs() {
        let huawei = plugin(Huawei {
            audio: Some(AudioSettings { hz: 8000, bits: 16 }),
        });
        let modem = huawei.modem.clone();
        let call = huawei.create_call("600000000");
        let listener = Rc::new(Dtmf::default());
        call.set_listener(listener.clone());

        modem.primary.expect("D600000000;", Ok(""));
        modem.primary.expect("AT^DDSETEX=2", Ok(""));
        block_on(call.start()).unwrap();

        assert_eq!(call.state(), CallState::Dialing);
        assert_eq!(modem.primary.handler_count(), 6);
        assert_eq!(
            call.audio_format(),
            Some(AudioFormat {
                encoding: "pcm".to_string(),
                resolution: "s16le".to_string(),
                rate: 8000,
            })
        );

        modem.primary.emit("\r\n^CONF: 1\r\n");
        assert_eq!(call.state(), CallState::RingingOut);

        modem.primary.emit("^CONN: 1,0");
        assert_eq!(call.state(), CallState::Active);
        assert_eq!(call.state_reason(), CallStateReason::Accepted);

        modem.primary.emit("^DDTMF: 5");
        assert_eq!(*listener.0.borrow(), vec!["5".to_string()]);

        modem.primary.emit("^CEND: 1,0,29");
        assert_eq!(call.state(), CallState::Terminated);
        assert_eq!(call.state_reason(), CallStateReason::Terminated);
        assert_eq!(modem.primary.handler_count(), 0);
    }

    #[test]
    fn audio_setup_failure_ends_call() {
        let huawei = plugin(Huawei {
            audio: Some(AudioSettings { hz: 16000, bits: 16 }),
        });
        let modem = huawei.modem.clone();
        let call = huawei.create_call("600000000");

        modem.primary.expect("D600000000;", Ok(""));
        modem
            .primary
            .expect("AT^DDSETEX=2", Err(Error::Device(DeviceError::Generic)));
        assert!(block_on(call.start()).is_err());
        assert_eq!(call.state_reason(), CallStateReason::AudioSetupFailed);
    }

    #[test]
    fn no_audio_settings_no_ddsetex() {
        let huawei = plugin(Huawei::default());
        let call = huawei.create_call("600000000");
        huawei.modem.primary.expect("D600000000;", Ok(""));
        block_on(call.start()).unwrap();
        assert_eq!(call.audio_format(), None);
        assert_eq!(huawei.modem.primary.remaining(), 0);
    }

    #[test]
    fn ndis_dial_polls_until_connected() {
        let huawei = ndis_plugin(fast_polling());
        let port = &huawei.modem.primary;
        port.expect("^NDISDUP=1,1,\"internet\"", Ok(""));
        port.expect("^NDISSTATQRY?", Err(Error::Device(DeviceError::Generic)));
        port.expect("^NDISSTATQRY?", Ok(DISCONNECTED));
        port.expect("^NDISSTATQRY?", Ok(CONNECTED));

        assert_eq!(
            block_on(huawei.dial_3gpp(&bearer())),
            Ok(DataPort::Net("wwan0".to_string()))
        );
        assert_eq!(port.remaining(), 0);

        port.expect(
            "^DHCP?",
            Ok("^DHCP: a8e1a50a,fcffffff,a9e1a50a,a9e1a50a,0200200a,0300200a,7200000,7200000"),
        );
        assert_eq!(
            block_on(huawei.load_ip_config(&bearer())),
            Ok(IpConfig::Static(StaticIpv4 {
                address: Ipv4Addr::new(10, 165, 225, 168),
                prefix: 30,
                gateway: Some(Ipv4Addr::new(10, 165, 225, 169)),
                dns: vec![Ipv4Addr::new(10, 32, 0, 2), Ipv4Addr::new(10, 32, 0, 3)],
            }))
        );
    }

    #[test]
    fn ip_config_falls_back_to_dhcp() {
        let huawei = ndis_plugin(fast_polling());
        huawei.modem.primary.expect("^DHCP?", Ok("^DHCP: garbage"));
        assert_eq!(block_on(huawei.load_ip_config(&bearer())), Ok(IpConfig::Dhcp));
        huawei
            .modem
            .primary
            .expect("^DHCP?", Err(Error::Device(DeviceError::Generic)));
        assert_eq!(block_on(huawei.load_ip_config(&bearer())), Ok(IpConfig::Dhcp));
    }

    #[test]
    fn ndis_dial_times_out() {
        let huawei = ndis_plugin(PluginConfig {
            connection_timeout: Duration::from_millis(3),
            ..fast_polling()
        });
        let port = &huawei.modem.primary;
        port.expect("^NDISDUP=1,1,\"internet\"", Ok(""));
        for _ in 0..3 {
            port.expect("^NDISSTATQRY?", Ok(DISCONNECTED));
        }

        assert_eq!(
            block_on(huawei.dial_3gpp(&bearer())),
            Err(Error::Device(DeviceError::Cme(CmeError::NetworkTimeout)))
        );
        assert_eq!(port.remaining(), 0);
    }

    #[test]
    fn ndis_dial_gives_up_on_unparseable_status() {
        let huawei = ndis_plugin(fast_polling());
        let port = &huawei.modem.primary;
        port.expect("^NDISDUP=1,1,\"internet\"", Ok(""));
        for _ in 0..=MAX_FAILED_NDISSTATQRY {
            port.expect("^NDISSTATQRY?", Ok("^NDISSTATQRY: x"));
        }

        assert!(matches!(
            block_on(huawei.dial_3gpp(&bearer())),
            Err(Error::Unsupported(_))
        ));
        assert_eq!(port.remaining(), 0);
    }

    #[test]
    fn ndis_dial_preconditions() {
        let huawei = ndis_plugin(fast_polling());
        let ipv6 = BearerConfig {
            ip_type: Some(IpFamily::Ipv6),
            ..bearer()
        };
        assert!(matches!(
            block_on(huawei.dial_3gpp(&ipv6)),
            Err(Error::Unsupported(_))
        ));
        assert!(huawei.modem.primary.sent().is_empty());

        let huawei = plugin(Huawei::default());
        assert!(matches!(
            block_on(huawei.dial_3gpp(&bearer())),
            Err(Error::NoPort(_))
        ));
    }

    #[test]
    fn ndis_dial_cancelled_while_polling() {
        let huawei = ndis_plugin(PluginConfig {
            connection_check_interval: Duration::from_secs(60),
            ..Default::default()
        });
        let port = &huawei.modem.primary;
        port.expect("^NDISDUP=1,1,\"internet\"", Ok(""));
        port.expect("^NDISSTATQRY?", Ok(DISCONNECTED));

        let (result, ()) = block_on(join(huawei.dial_3gpp(&bearer()), async {
            while port.remaining() > 0 {
                yield_now().await;
            }
            yield_now().await;
            port.expect("^NDISDUP=1,0", Ok(""));
            huawei.modem.cancellation().cancel();
        }));
        assert_eq!(result, Err(Error::Cancelled));
        assert_eq!(
            port.sent(),
            vec!["^NDISDUP=1,1,\"internet\"", "^NDISSTATQRY?", "^NDISDUP=1,0"]
        );
    }

    #[test]
    fn ndis_disconnect_ignores_ndisdup_error() {
        let huawei = ndis_plugin(fast_polling());
        let port = &huawei.modem.primary;
        port.expect("^NDISDUP=1,0", Err(Error::Device(DeviceError::Generic)));
        port.expect("^NDISSTATQRY?", Ok(CONNECTED));
        port.expect("^NDISSTATQRY?", Ok(DISCONNECTED));

        assert_eq!(block_on(huawei.disconnect_3gpp(&bearer())), Ok(()));
        assert_eq!(port.remaining(), 0);
    }

    #[test]
    fn ndisdup_authentication() {
        let mut config = BearerConfig {
            user: Some("user".to_string()),
            password: Some("pass".to_string()),
            ..bearer()
        };
        assert_eq!(
            ndisdup_command(&config),
            "^NDISDUP=1,1,\"internet\",\"user\",\"pass\",2"
        );
        config.allowed_auth = AllowedAuth::PAP;
        assert_eq!(
            ndisdup_command(&config),
            "^NDISDUP=1,1,\"internet\",\"user\",\"pass\",1"
        );
        config.allowed_auth = AllowedAuth::MSCHAPV2;
        assert!(ndisdup_command(&config).ends_with(",3"));
    }
}
