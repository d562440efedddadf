//! 3GPP data bearer connect/disconnect, overridable per plugin.

use std::net::Ipv4Addr;

use super::ModemPlugin;
use crate::config::BearerConfig;
use crate::error::Error;
use crate::traits::DataPort;

/// State of a PDP context's data session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Static IPv4 settings a device handed out for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIpv4 {
    pub address: Ipv4Addr,
    pub prefix: u8,
    pub gateway: Option<Ipv4Addr>,
    pub dns: Vec<Ipv4Addr>,
}

/// How the host should configure the data interface once connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpConfig {
    /// Run a DHCP client on the interface
    Dhcp,
    Static(StaticIpv4),
}

#[allow(async_fn_in_trait)]
pub trait Bearer3gpp: ModemPlugin {
    /// Bring up the data session of `bearer.cid`, returning the port the
    /// session runs over.
    async fn dial_3gpp(&self, bearer: &BearerConfig) -> Result<DataPort, Error> {
        default::dial_3gpp(self.modem(), bearer).await
    }

    async fn disconnect_3gpp(&self, bearer: &BearerConfig) -> Result<(), Error> {
        default::disconnect_3gpp(self.modem(), bearer).await
    }

    /// IPv4 settings of a session brought up with [`Bearer3gpp::dial_3gpp`].
    async fn load_ip_config(&self, bearer: &BearerConfig) -> Result<IpConfig, Error> {
        let _ = bearer;
        Ok(IpConfig::Dhcp)
    }

    async fn load_connection_status(&self, cid: u8) -> Result<ConnectionStatus, Error> {
        let _ = cid;
        Err(Error::Unsupported(
            "Loading connection status is not supported".to_string(),
        ))
    }
}

pub mod default {
    use crate::asynch::at;
    use crate::command::packet_domain::{self, DEACTIVATE_TIMEOUT, DIAL_TIMEOUT};
    use crate::config::BearerConfig;
    use crate::error::Error;
    use crate::traits::{AtPort, DataPort, Modem};

    /// `ATD*99***<cid>#` on the modem's serial data port, falling back to
    /// the primary port. The port is left in PPP mode.
    pub async fn dial_3gpp<M: Modem>(
        modem: &M,
        bearer: &BearerConfig,
    ) -> Result<DataPort, Error> {
        let data_port = match modem.data_port() {
            Some(DataPort::Serial(name)) => modem.at_ports().into_iter().find(|p| p.name() == name),
            _ => None,
        };
        let port = data_port
            .or_else(|| modem.primary_port())
            .ok_or_else(|| Error::NoPort("No AT port available to dial".to_string()))?;

        debug!("({}) dialing PDP context {}", port.name(), bearer.cid);
        let cancel = modem.cancellation().child();
        at::command_full(
            port,
            &packet_domain::dial_packet_service(bearer.cid),
            DIAL_TIMEOUT,
            false,
            false,
            Some(&cancel),
        )
        .await?;

        Ok(DataPort::Serial(port.name().to_string()))
    }

    pub async fn disconnect_3gpp<M: Modem>(modem: &M, bearer: &BearerConfig) -> Result<(), Error> {
        at::command(
            modem,
            &packet_domain::deactivate_context(bearer.cid),
            DEACTIVATE_TIMEOUT,
            false,
        )
        .await?;
        Ok(())
    }
}
