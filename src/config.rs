use core::fmt;
use embassy_time::Duration;

use crate::modules::{Module, ModuleParams};

/// Per-object tunables handed to the plugins by the host.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Whether SMS are stored/sent in PDU mode (text mode otherwise)
    pub sms_pdu_mode: bool,
    /// Timeout for the network facing part of an SMS send
    pub sms_send_timeout: Duration,
    /// Timeout for the vendor data-call activation command, or for the
    /// whole status polling loop on devices that report the session state
    /// only when asked
    pub connection_timeout: Duration,
    pub disconnection_timeout: Duration,
    /// Delay between two data session status queries
    pub connection_check_interval: Duration,
    /// How long an incoming call may go without a RING before it is dropped
    pub incoming_call_timeout: Duration,
    /// How long to wait for the `#QSS` confirmation after `+CSIM=0`
    pub csim_unlock_timeout: Duration,
    /// DTMF tone duration set with `+VTD`, in tenths of a second
    pub dtmf_tone_duration: Option<u32>,
    pub skip_incoming_timeout: bool,
    /// Outgoing calls move DIALING -> RINGING_OUT on a vendor URC
    pub call_supports_dialing_to_ringing: bool,
    /// Outgoing calls move RINGING_OUT -> ACTIVE on a vendor URC
    pub call_supports_ringing_to_active: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            sms_pdu_mode: true,
            sms_send_timeout: Duration::from_secs(5 * 60),
            connection_timeout: Duration::from_secs(180),
            disconnection_timeout: Duration::from_secs(120),
            connection_check_interval: Duration::from_secs(1),
            incoming_call_timeout: Duration::from_secs(10),
            csim_unlock_timeout: Duration::from_secs(3),
            dtmf_tone_duration: None,
            skip_incoming_timeout: false,
            call_supports_dialing_to_ringing: false,
            call_supports_ringing_to_active: false,
        }
    }
}

impl PluginConfig {
    /// Defaults with the call capabilities of the vendor family.
    pub fn for_module(module: &Module) -> Self {
        Self {
            call_supports_dialing_to_ringing: module.call_supports_dialing_to_ringing(),
            call_supports_ringing_to_active: module.call_supports_ringing_to_active(),
            ..Default::default()
        }
    }
}

/// Set of authentication methods a bearer may use.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct AllowedAuth(u8);

impl AllowedAuth {
    /// Let the modem pick.
    pub const UNKNOWN: Self = Self(0);
    pub const NONE: Self = Self(1 << 0);
    pub const PAP: Self = Self(1 << 1);
    pub const CHAP: Self = Self(1 << 2);
    pub const MSCHAP: Self = Self(1 << 3);
    pub const MSCHAPV2: Self = Self(1 << 4);
    pub const EAP: Self = Self(1 << 5);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::NONE, "none"),
        (Self::PAP, "pap"),
        (Self::CHAP, "chap"),
        (Self::MSCHAP, "mschap"),
        (Self::MSCHAPV2, "mschapv2"),
        (Self::EAP, "eap"),
    ];

    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl core::ops::BitOr for AllowedAuth {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for AllowedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return f.write_str("unknown");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
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

impl fmt::Debug for AllowedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AllowedAuth({})", self)
    }
}

/// IP family requested for a data session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    Ipv4,
    Ipv6,
    Ipv4v6,
}

/// Bearer properties the daemon resolved for a connection attempt.
#[derive(Debug, Clone, Default)]
pub struct BearerConfig {
    pub apn: Option<String>,
    /// `None` lets the plugin pick, which is IPv4 everywhere
    pub ip_type: Option<IpFamily>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub allowed_auth: AllowedAuth,
    /// PDP context id to dial
    pub cid: u8,
}

impl BearerConfig {
    pub fn has_credentials(&self) -> bool {
        self.user.as_deref().is_some_and(|u| !u.is_empty())
            || self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}
