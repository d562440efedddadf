//! Interfaces the host daemon provides to the plugins.

use std::rc::Rc;

use embassy_time::Duration;
use regex::{Captures, Regex};

use crate::cancel::CancellationToken;
use crate::command::device_lock::types::PinStatusCode;
use crate::error::Error;
use crate::modules::{Generic, Module};

/// Callback invoked by a port for every unsolicited line matching its pattern.
pub type UrcHandler = Rc<dyn Fn(&Captures<'_>)>;

/// A serial AT port.
///
/// Framing is owned by the implementor: `send` gets a bare command (`+CGATT=1`,
/// `#QSS?`, ...) and returns the response text with the final `OK` stripped.
/// Error result codes must come back as [`Error::Device`], transport failures
/// as [`Error::Atat`]. Commands not starting with `AT` get the prefix added
/// unless `raw` is set, in which case the text is written untouched.
#[allow(async_fn_in_trait)]
pub trait AtPort {
    fn name(&self) -> &str;

    /// Whether the port is currently in data (PPP) mode.
    fn is_connected(&self) -> bool;

    fn open(&self) -> Result<(), Error>;

    fn close(&self);

    fn init_sequence_enabled(&self) -> bool;

    fn set_init_sequence_enabled(&self, enabled: bool);

    async fn send(
        &self,
        command: &str,
        timeout: Duration,
        raw: bool,
        allow_cached: bool,
    ) -> Result<String, Error>;

    fn add_unsolicited_handler(&self, pattern: Regex, handler: UrcHandler);

    /// Drop the handler registered with the same pattern source, if any.
    fn remove_unsolicited_handler(&self, pattern: &str);
}

/// Port a data session runs over once connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataPort {
    /// A serial port switched to PPP mode, e.g. after `ATD*99#`
    Serial(String),
    /// A network interface, e.g. `wwan0`
    Net(String),
}

/// The broadband modem object the plugins act on.
pub trait Modem {
    type Port: AtPort;

    /// The port AT commands should go to right now.
    fn best_at_port(&self) -> Result<&Self::Port, Error>;

    fn primary_port(&self) -> Option<&Self::Port>;

    fn secondary_port(&self) -> Option<&Self::Port>;

    /// Best network interface for data sessions, if the modem has one.
    fn data_port(&self) -> Option<DataPort>;

    /// Every AT port of the modem, primary first.
    fn at_ports(&self) -> Vec<&Self::Port> {
        self.primary_port()
            .into_iter()
            .chain(self.secondary_port())
            .collect()
    }

    /// Vendor family parameters.
    fn module(&self) -> Module {
        Module::Generic(Generic)
    }

    /// Modem-wide token; every workflow links its own token to it.
    fn cancellation(&self) -> &CancellationToken;

    /// Kernel drivers bound to the modem's ports.
    fn drivers(&self) -> &[String];

    fn unlock_required(&self) -> PinStatusCode;

    fn is_cdma_only(&self) -> bool {
        false
    }

    /// Re-read the SIM, e.g. after a PUK lock or a fatal SIM error.
    fn process_sim_event(&self);

    /// The SIM was inserted or removed while the modem was running.
    fn sim_hot_swap_detected(&self);

    /// New signal quality, in percent, reported unsolicited by the device.
    fn signal_quality_changed(&self, quality: u8) {
        let _ = quality;
    }
}
