//! Telit plugin.
//!
//! Telit devices report SIM presence with `#QSS`. Reading the PIN/PUK retry
//! counters needs exclusive SIM access (`+CSIM=1`), during which the device
//! reports the SIM as removed and, once released, as present again. The
//! plugin tells those reports apart from real SIM swaps with the CSIM lock
//! state.

use core::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::with_timeout;
use regex::Captures;

use crate::asynch::at::{self, AtCommand};
use crate::asynch::bearer::Bearer3gpp;
use crate::asynch::processors::{self, ProcessorResult, Step};
use crate::asynch::sim::{SimOps, UnlockRetries};
use crate::asynch::{FeatureSupport, ModemPlugin};
use crate::band::telit::{self as bnd, BndConfig, BndResponse};
use crate::band::{Band, Modes};
use crate::command::general::{GET_REVISION, GET_REVISION_V25, REVISION_TIMEOUT};
use crate::command::mobile_control::{POWER_DOWN_TIMEOUT, SET_FLIGHT_MODE};
use crate::command::parse_response;
use crate::command::sim::responses::GenericSimAccess;
use crate::command::sim::types::RetryCounter;
use crate::command::sim::CSIM_TIMEOUT;
use crate::command::telit::responses::{parse_qss_query, parse_swpkgv, Ws46Mode, QSS_URC};
use crate::command::telit::types::QssStatus;
use crate::command::telit::{
    self, BND_CURRENT, BND_SET_TIMEOUT, BND_SUPPORTED, BND_TIMEOUT, CSIM_LOCK, CSIM_UNLOCK,
    QSS_ENABLE, QSS_QUERY, QSS_TIMEOUT, SOFTWARE_PACKAGE_VERSION, WS46_QUERY, WS46_QUERY_TIMEOUT,
    WS46_TIMEOUT,
};
use crate::config::PluginConfig;
use crate::error::{CmeError, Error};
use crate::modules;
use crate::traits::{AtPort, Modem};

/// Who holds the SIM while the retry counters are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimLockState {
    Unknown,
    Unlocked,
    /// `+CSIM=1` succeeded, waiting for `#QSS: 0`
    LockRequested,
    Locked,
}

fn retry_slot(retries: &mut UnlockRetries, counter: RetryCounter) -> &mut Option<u32> {
    match counter {
        RetryCounter::Pin => &mut retries.pin,
        RetryCounter::Puk => &mut retries.puk,
        RetryCounter::Pin2 => &mut retries.pin2,
        RetryCounter::Puk2 => &mut retries.puk2,
    }
}

struct Shared {
    qss_status: Option<QssStatus>,
    csim_lock_state: SimLockState,
    csim_lock_support: FeatureSupport,
    /// `#QSS` reports are ignored while the radio is powered down
    parse_qss: bool,
    revision: Option<String>,
    bnd_config: Option<BndConfig>,
    supported_bands: Option<BTreeSet<Band>>,
    supported_modes: Modes,
}

/// State shared with the `#QSS` handlers.
struct TelitState {
    shared: Mutex<NoopRawMutex, RefCell<Shared>>,
    csim_unlocked: Signal<NoopRawMutex, ()>,
}

impl TelitState {
    fn with<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        self.shared.lock(|s| f(&mut s.borrow_mut()))
    }

    fn qss_received<M: Modem>(&self, modem: &M, current: QssStatus) {
        let (previous, lock_state, parse_qss) = self.with(|s| {
            let previous = s.qss_status.replace(current);
            (previous, s.csim_lock_state, s.parse_qss)
        });

        let removed = current == QssStatus::SimRemoved;
        let was_removed = previous == Some(QssStatus::SimRemoved);
        let was_present = previous.is_some_and(|p| p > QssStatus::SimRemoved);

        if lock_state >= SimLockState::LockRequested {
            if was_present && removed {
                info!("QSS handler: #QSS=0 after +CSIM=1: CSIM locked");
                self.with(|s| s.csim_lock_state = SimLockState::Locked);
            }
            if was_removed && !removed {
                info!("QSS handler: #QSS>=1 after +CSIM=0: CSIM unlocked");
                self.with(|s| s.csim_lock_state = SimLockState::Unlocked);
                self.csim_unlocked.signal(());
            }
            return;
        }

        if previous != Some(current) {
            debug!("QSS handler: status changed {:?} -> {}", previous, current);
        }

        if !parse_qss {
            debug!("QSS handler: message ignored");
            return;
        }

        if (was_removed && !removed) || (was_present && removed) {
            info!("QSS handler: SIM swap detected");
            modem.sim_hot_swap_detected();
        }
    }
}

pub struct TelitPlugin<M> {
    modem: Rc<M>,
    config: PluginConfig,
    /// Access technologies the device supports
    capabilities: Modes,
    state: Rc<TelitState>,
}

impl<M: Modem> ModemPlugin for TelitPlugin<M> {
    type Modem = M;

    fn modem(&self) -> &M {
        &self.modem
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }
}

impl<M: Modem> SimOps for TelitPlugin<M> {}

impl<M: Modem> Bearer3gpp for TelitPlugin<M> {}

impl<M: Modem + 'static> TelitPlugin<M> {
    pub fn new(modem: Rc<M>, config: PluginConfig, capabilities: Modes) -> Self {
        Self {
            modem,
            config,
            capabilities,
            state: Rc::new(TelitState {
                shared: Mutex::new(RefCell::new(Shared {
                    qss_status: None,
                    csim_lock_state: SimLockState::Unknown,
                    csim_lock_support: FeatureSupport::Unknown,
                    parse_qss: true,
                    revision: None,
                    bnd_config: None,
                    supported_bands: None,
                    supported_modes: Modes::NONE,
                })),
                csim_unlocked: Signal::new(),
            }),
        }
    }

    pub fn qss_status(&self) -> Option<QssStatus> {
        self.state.with(|s| s.qss_status)
    }

    pub fn csim_lock_state(&self) -> SimLockState {
        self.state.with(|s| s.csim_lock_state)
    }

    pub fn csim_lock_support(&self) -> FeatureSupport {
        self.state.with(|s| s.csim_lock_support)
    }

    /// Modes the device supports, used to resolve [`Modes::ANY`].
    pub fn store_supported_modes(&self, modes: Modes) {
        self.state.with(|s| s.supported_modes = modes);
    }

    /// Start reporting SIM hot swaps through `#QSS`.
    pub async fn setup_sim_hot_swap(&self) -> Result<(), Error> {
        let modem = self.modem();

        match at::command(modem, QSS_QUERY, QSS_TIMEOUT, false).await {
            Ok(response) => match parse_qss_query(&response) {
                Ok(status) => {
                    debug!("QSS: current status is '{}'", status);
                    self.state.with(|s| s.qss_status = Some(status));
                }
                Err(e) => warn!("QSS query parse error: {}", e),
            },
            Err(e) => warn!("Could not get \"#QSS?\" reply: {}", e),
        }

        let mut attempted = 0;
        let mut failed = 0;
        for port in [modem.primary_port(), modem.secondary_port()].into_iter().flatten() {
            attempted += 1;
            let cancel = modem.cancellation().child();
            match at::command_full(port, QSS_ENABLE, QSS_TIMEOUT, false, false, Some(&cancel)).await
            {
                Ok(_) => self.add_qss_handler(port),
                Err(e) => {
                    warn!("QSS: error enabling unsolicited on port {}: {}", port.name(), e);
                    failed += 1;
                }
            }
        }

        if failed == attempted {
            return Err(Error::Failed("QSS: couldn't enable unsolicited".to_string()));
        }
        Ok(())
    }

    fn add_qss_handler(&self, port: &M::Port) {
        let state = self.state.clone();
        let modem = Rc::downgrade(&self.modem);
        port.add_unsolicited_handler(
            QSS_URC.clone(),
            Rc::new(move |caps: &Captures<'_>| {
                let status = caps[1].parse::<u8>().ok().and_then(|s| QssStatus::try_from(s).ok());
                if let (Some(modem), Some(status)) = (modem.upgrade(), status) {
                    state.qss_received(&*modem, status);
                }
            }),
        );
    }

    /// Read the PIN/PUK retry counters, holding the SIM with `+CSIM=1` while
    /// doing so.
    pub async fn load_unlock_retries(&self) -> Result<UnlockRetries, Error> {
        let modem = self.modem();
        self.state.csim_unlocked.reset();

        // Lock
        if self.csim_lock_support() == FeatureSupport::NotSupported {
            debug!("CSIM lock not supported by this modem; skipping lock command");
        } else {
            match at::command(modem, CSIM_LOCK, CSIM_TIMEOUT, false).await {
                Ok(_) => self.state.with(|s| s.csim_lock_state = SimLockState::LockRequested),
                Err(e) if e.cme() == Some(CmeError::OperationNotSupported) => {
                    warn!("Couldn't lock SIM card: {}; continuing without CSIM lock", e);
                    self.state.with(|s| s.csim_lock_support = FeatureSupport::NotSupported);
                }
                Err(e) => return Err(Error::Failed(format!("Couldn't lock SIM card: {}", e))),
            }
            self.mark_csim_lock_supported();
        }

        let mut retries = UnlockRetries::default();
        for counter in RetryCounter::ALL {
            match self.load_retry_counter(counter).await {
                Ok(count) => *retry_slot(&mut retries, counter) = Some(count),
                Err(e) => debug!("Couldn't load {} retries: {}", counter.name(), e),
            }
        }

        // Unlock
        if self.csim_lock_support() == FeatureSupport::NotSupported {
            debug!("CSIM lock not supported by this modem; skipping unlock command");
        } else {
            if let Err(e) = at::command(modem, CSIM_UNLOCK, CSIM_TIMEOUT, false).await {
                if e.cme() == Some(CmeError::OperationNotSupported) {
                    self.state.with(|s| s.csim_lock_support = FeatureSupport::NotSupported);
                }
                warn!("Couldn't unlock SIM card: {}", e);
            }
            self.mark_csim_lock_supported();
        }

        if self.csim_lock_state() == SimLockState::Locked {
            debug!("CSIM is locked, waiting for #QSS=1");
            if with_timeout(self.config.csim_unlock_timeout, self.state.csim_unlocked.wait())
                .await
                .is_err()
            {
                warn!(
                    "CSIM is still locked after {} ms; trying to continue anyway",
                    self.config.csim_unlock_timeout.as_millis()
                );
            }
        } else {
            self.state.with(|s| s.csim_lock_state = SimLockState::Unlocked);
        }

        if retries.is_empty() {
            return Err(Error::Failed(
                "Could not get any of the SIM unlock retries values".to_string(),
            ));
        }
        Ok(retries)
    }

    fn mark_csim_lock_supported(&self) {
        self.state.with(|s| {
            if s.csim_lock_support != FeatureSupport::NotSupported {
                s.csim_lock_support = FeatureSupport::Supported;
            }
        });
    }

    async fn load_retry_counter(&self, counter: RetryCounter) -> Result<u32, Error> {
        let response = at::command(self.modem(), counter.command(), CSIM_TIMEOUT, false).await?;
        let access: GenericSimAccess = parse_response(&response, "+CSIM")?;
        access.retries().ok_or_else(|| {
            Error::Parse(format!(
                "Couldn't parse {} retries from '{}'",
                counter.name(),
                response
            ))
        })
    }

    /// Take `#QSS` reports into account again once the radio is up.
    pub fn after_power_up(&self) {
        debug!("Stop ignoring #QSS");
        self.state.with(|s| s.parse_qss = true);
    }

    /// Switch the RF off. Failures are logged and otherwise ignored.
    pub async fn power_down(&self) -> Result<(), Error> {
        match at::command(self.modem(), SET_FLIGHT_MODE, POWER_DOWN_TIMEOUT, false).await {
            Ok(_) => {
                debug!("Ignore #QSS unsolicited during power down/low");
                self.state.with(|s| s.parse_qss = false);
            }
            Err(e) => warn!("Failed modem power down: {}", e),
        }
        Ok(())
    }

    /// Firmware revision, preferring the software package version.
    pub async fn load_revision(&self) -> Result<String, Error> {
        if let Some(revision) = self.state.with(|s| s.revision.clone()) {
            return Ok(revision);
        }

        debug!("Loading revision...");
        let commands = [
            AtCommand::new(
                SOFTWARE_PACKAGE_VERSION,
                telit::REVISION_TIMEOUT,
                true,
                software_package_version,
            ),
            AtCommand::new(
                GET_REVISION,
                REVISION_TIMEOUT,
                true,
                processors::string_ignore_at_errors,
            ),
            AtCommand::new(
                GET_REVISION_V25,
                REVISION_TIMEOUT,
                true,
                processors::string_ignore_at_errors,
            ),
        ];
        let revision = at::sequence_on_modem(self.modem(), &commands, &mut ())
            .await?
            .map(|r| r.trim().to_string())
            .ok_or_else(|| Error::Failed("Couldn't load revision".to_string()))?;

        self.state.with(|s| s.revision = Some(revision.clone()));
        Ok(revision)
    }

    async fn bnd_config(&self) -> Result<BndConfig, Error> {
        if let Some(cfg) = self.state.with(|s| s.bnd_config) {
            return Ok(cfg);
        }
        let revision = self.load_revision().await?;
        let cfg = modules::telit::bnd_config(&revision, self.capabilities);
        self.state.with(|s| s.bnd_config = Some(cfg));
        Ok(cfg)
    }

    pub async fn load_supported_bands(&self) -> Result<BTreeSet<Band>, Error> {
        let cfg = self.bnd_config().await?;
        let response = at::command(self.modem(), BND_SUPPORTED, BND_TIMEOUT, true).await?;
        let bands = bnd::decode(&response, &cfg, BndResponse::Supported)?;
        self.state.with(|s| s.supported_bands = Some(bands.clone()));
        Ok(bands)
    }

    pub async fn load_current_bands(&self) -> Result<BTreeSet<Band>, Error> {
        let cfg = self.bnd_config().await?;
        let response = at::command(self.modem(), BND_CURRENT, BND_TIMEOUT, false).await?;
        bnd::decode(&response, &cfg, BndResponse::Current)
    }

    /// Select `bands`. A lone [`Band::Any`] selects every supported band.
    pub async fn set_current_bands(&self, bands: &[Band]) -> Result<(), Error> {
        let cfg = self.bnd_config().await?;

        let resolved: Vec<Band> = if bands == [Band::Any] {
            self.state
                .with(|s| s.supported_bands.clone())
                .ok_or_else(|| {
                    Error::Failed(
                        "Couldn't build ANY band settings: unknown supported bands".to_string(),
                    )
                })?
                .into_iter()
                .collect()
        } else {
            bands.to_vec()
        };

        let command = bnd::encode(&resolved, &cfg)?;
        at::command(self.modem(), &command, BND_SET_TIMEOUT, false).await?;
        Ok(())
    }

    /// Allowed and preferred modes. Telit devices have no preferred mode.
    pub async fn load_current_modes(&self) -> Result<(Modes, Modes), Error> {
        let cfg = self.bnd_config().await?;
        let response = at::command(self.modem(), WS46_QUERY, WS46_QUERY_TIMEOUT, false).await?;
        let ws46: Ws46Mode = parse_response(&response, "+WS46")?;
        let allowed = bnd::modes_from_ws46(ws46.mode, &cfg).ok_or_else(|| {
            Error::Parse(format!(
                "Couldn't parse unexpected +WS46 response: '{}'",
                response
            ))
        })?;
        Ok((allowed, Modes::NONE))
    }

    pub async fn set_current_modes(&self, allowed: Modes, preferred: Modes) -> Result<(), Error> {
        let cfg = self.bnd_config().await?;
        let supported = self.state.with(|s| s.supported_modes);
        let mode = bnd::ws46_mode_from_modes(allowed, preferred, supported, &cfg)?;
        at::command(self.modem(), &telit::set_ws46(mode), WS46_TIMEOUT, false).await?;
        Ok(())
    }
}

/// `#SWPKGV` replies without a version fall through to `+CGMR`.
fn software_package_version(
    ctx: &mut (),
    step: Step<'_>,
    response: Result<String, Error>,
) -> ProcessorResult {
    match response {
        Ok(response) => match parse_swpkgv(&response) {
            Some(version) => ProcessorResult::Success(Some(version)),
            None => ProcessorResult::Continue,
        },
        Err(e) => processors::string_ignore_at_errors(ctx, step, Err(e)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::DeviceError;
    use crate::test_helpers::{MockModem, MockPort};
    use embassy_futures::join::join;
    use embassy_futures::{block_on, yield_now};
    use embassy_time::Duration;

    fn plugin(modem: MockModem, capabilities: Modes) -> TelitPlugin<MockModem> {
        TelitPlugin::new(Rc::new(modem), PluginConfig::default(), capabilities)
    }

    fn cme(e: CmeError) -> Error {
        Error::Device(DeviceError::Cme(e))
    }

    fn expect_retries(port: &MockPort) {
        port.expect("+CSIM=10,0020000100", Ok("+CSIM: 4,\"63C3\""));
        port.expect("+CSIM=10,002C000100", Ok("+CSIM: 4,\"63CA\""));
        port.expect("+CSIM=10,0020008100", Err(cme(CmeError::SimPin2Required)));
        port.expect("+CSIM=10,002C008100", Ok("+CSIM: 4,\"6982\""));
    }

    fn with_qss(telit: &TelitPlugin<MockModem>, status: &str) {
        telit.modem.primary.expect("#QSS?", Ok(status));
        telit.modem.primary.expect("#QSS=1", Ok(""));
        block_on(telit.setup_sim_hot_swap()).unwrap();
    }

    async fn sent_at_least(port: &MockPort, count: usize) {
        while port.sent().len() < count {
            yield_now().await;
        }
    }

    #[test]
    fn qss_setup_on_both_ports() {
        let mut modem = MockModem::new();
        let secondary = MockPort::new("ttyUSB3");
        secondary.expect("#QSS=1", Err(Error::Device(DeviceError::Generic)));
        modem.secondary = Some(secondary);

        let telit = plugin(modem, Modes::G2 | Modes::G3);
        with_qss(&telit, "#QSS: 1,3");

        assert_eq!(telit.qss_status(), Some(QssStatus::SimInsertedAndReady));
        assert_eq!(telit.modem.primary.handler_count(), 1);
        assert_eq!(telit.modem.secondary.as_ref().unwrap().handler_count(), 0);
    }

    #[test]
    fn qss_setup_fails_when_no_port_enabled() {
        let telit = plugin(MockModem::new(), Modes::G2);
        telit
            .modem
            .primary
            .expect("#QSS?", Err(Error::Device(DeviceError::Generic)));
        telit
            .modem
            .primary
            .expect("#QSS=1", Err(Error::Device(DeviceError::Generic)));

        assert_eq!(
            block_on(telit.setup_sim_hot_swap()),
            Err(Error::Failed("QSS: couldn't enable unsolicited".to_string()))
        );
        assert_eq!(telit.qss_status(), None);
    }

    #[test]
    fn hot_swap_detection() {
        let telit = plugin(MockModem::new(), Modes::G2);
        with_qss(&telit, "#QSS: 1,3");

        telit.modem.primary.emit("#QSS: 0\r\n");
        assert_eq!(telit.modem.hot_swaps.get(), 1);
        telit.modem.primary.emit("#QSS: 1\r\n");
        assert_eq!(telit.modem.hot_swaps.get(), 2);
        telit.modem.primary.emit("#QSS: 3\r\n");
        assert_eq!(telit.modem.hot_swaps.get(), 2);

        telit.modem.primary.expect("+CFUN=4", Ok(""));
        block_on(telit.power_down()).unwrap();
        telit.modem.primary.emit("#QSS: 0\r\n");
        assert_eq!(telit.modem.hot_swaps.get(), 2);

        telit.after_power_up();
        telit.modem.primary.emit("#QSS: 3\r\n");
        assert_eq!(telit.modem.hot_swaps.get(), 3);
    }

    #[test]
    fn csim_lock_waits_for_qss() {
        let telit = plugin(MockModem::new(), Modes::G2);
        with_qss(&telit, "#QSS: 1,3");

        let port = &telit.modem.primary;
        port.expect("+CSIM=1", Ok(""));
        expect_retries(port);
        port.expect("+CSIM=0", Ok(""));

        let (retries, _) = block_on(join(telit.load_unlock_retries(), async {
            // lock done, first counter query in flight
            sent_at_least(port, 4).await;
            port.emit("#QSS: 0\r\n");
            // unlock in flight
            sent_at_least(port, 8).await;
            yield_now().await;
            yield_now().await;
            port.emit("#QSS: 3\r\n");
        }));

        assert_eq!(
            retries,
            Ok(UnlockRetries {
                pin: Some(3),
                puk: Some(10),
                pin2: None,
                puk2: None,
            })
        );
        assert_eq!(telit.csim_lock_state(), SimLockState::Unlocked);
        assert_eq!(telit.csim_lock_support(), FeatureSupport::Supported);
        assert_eq!(telit.modem.hot_swaps.get(), 0);
    }

    #[test]
    fn csim_still_locked_after_timeout() {
        let modem = Rc::new(MockModem::new());
        let config = PluginConfig {
            csim_unlock_timeout: Duration::from_millis(10),
            ..Default::default()
        };
        let telit = TelitPlugin::new(modem, config, Modes::G2);
        with_qss(&telit, "#QSS: 1,3");

        let port = &telit.modem.primary;
        port.expect("+CSIM=1", Ok(""));
        expect_retries(port);
        port.expect("+CSIM=0", Ok(""));

        let (retries, _) = block_on(join(telit.load_unlock_retries(), async {
            sent_at_least(port, 4).await;
            port.emit("#QSS: 0\r\n");
        }));

        assert!(retries.is_ok());
        assert_eq!(telit.csim_lock_state(), SimLockState::Locked);
    }

    #[test]
    fn csim_lock_not_supported() {
        let telit = plugin(MockModem::new(), Modes::G2);
        let port = &telit.modem.primary;
        port.expect("+CSIM=1", Err(cme(CmeError::OperationNotSupported)));
        expect_retries(port);

        assert!(block_on(telit.load_unlock_retries()).is_ok());
        assert_eq!(telit.csim_lock_support(), FeatureSupport::NotSupported);
        assert_eq!(telit.csim_lock_state(), SimLockState::Unlocked);
        assert_eq!(port.remaining(), 0);

        // Neither lock nor unlock is tried again
        expect_retries(port);
        assert!(block_on(telit.load_unlock_retries()).is_ok());
        assert!(!port.sent().iter().skip(5).any(|c| c == "+CSIM=1" || c == "+CSIM=0"));
    }

    #[test]
    fn csim_unlock_result_sets_support() {
        let telit = plugin(MockModem::new(), Modes::G2);
        let port = &telit.modem.primary;
        port.expect("+CSIM=1", Ok(""));
        expect_retries(port);
        port.expect("+CSIM=0", Ok(""));

        assert!(block_on(telit.load_unlock_retries()).is_ok());
        assert_eq!(telit.csim_lock_support(), FeatureSupport::Supported);

        port.expect("+CSIM=1", Ok(""));
        expect_retries(port);
        port.expect("+CSIM=0", Err(cme(CmeError::OperationNotSupported)));

        assert!(block_on(telit.load_unlock_retries()).is_ok());
        assert_eq!(telit.csim_lock_support(), FeatureSupport::NotSupported);
        assert_eq!(telit.csim_lock_state(), SimLockState::Unlocked);
        assert_eq!(port.remaining(), 0);
    }

    #[test]
    fn csim_lock_failure_aborts() {
        let telit = plugin(MockModem::new(), Modes::G2);
        telit
            .modem
            .primary
            .expect("+CSIM=1", Err(cme(CmeError::SimBusy)));

        assert!(matches!(
            block_on(telit.load_unlock_retries()),
            Err(Error::Failed(msg)) if msg.starts_with("Couldn't lock SIM card: ")
        ));
    }

    #[test]
    fn no_retries_is_an_error() {
        let telit = plugin(MockModem::new(), Modes::G2);
        let port = &telit.modem.primary;
        port.expect("+CSIM=1", Ok(""));
        for counter in RetryCounter::ALL {
            port.expect(counter.command(), Err(Error::Device(DeviceError::Generic)));
        }
        port.expect("+CSIM=0", Err(Error::Device(DeviceError::Generic)));

        assert_eq!(
            block_on(telit.load_unlock_retries()),
            Err(Error::Failed(
                "Could not get any of the SIM unlock retries values".to_string()
            ))
        );
    }

    #[test]
    fn revision_falls_back_to_cgmr() {
        let telit = plugin(MockModem::new(), Modes::G2);
        telit
            .modem
            .primary
            .expect("#SWPKGV", Err(Error::Device(DeviceError::Generic)));
        telit.modem.primary.expect("+CGMR", Ok("12.00.004\r\n"));

        assert_eq!(block_on(telit.load_revision()), Ok("12.00.004".to_string()));
        // cached
        assert_eq!(block_on(telit.load_revision()), Ok("12.00.004".to_string()));
        assert_eq!(telit.modem.primary.sent().len(), 2);
    }

    #[test]
    fn revision_from_software_package_version() {
        let telit = plugin(MockModem::new(), Modes::G2);
        telit.modem.primary.expect(
            "#SWPKGV",
            Ok("25.20.676-P0F.670000\r\nM0F.670006\r\nP0F.670000\r\nA0F.670006"),
        );
        assert_eq!(block_on(telit.load_revision()), Ok("25.20.676".to_string()));
    }

    #[test]
    fn any_band_resolves_to_supported() {
        let telit = plugin(MockModem::new(), Modes::G4);
        let port = &telit.modem.primary;
        port.expect("#SWPKGV", Ok("12.00.004"));

        assert_eq!(
            block_on(telit.set_current_bands(&[Band::Any])),
            Err(Error::Failed(
                "Couldn't build ANY band settings: unknown supported bands".to_string()
            ))
        );

        port.expect("#BND=?", Ok("#BND: (0-3),(0-5),(1-524357)"));
        let supported = block_on(telit.load_supported_bands()).unwrap();
        assert_eq!(
            supported.into_iter().collect::<Vec<_>>(),
            vec![Band::Eutran(1), Band::Eutran(3), Band::Eutran(7), Band::Eutran(20)]
        );

        port.expect("#BND=0,0,524357", Ok(""));
        assert_eq!(block_on(telit.set_current_bands(&[Band::Any])), Ok(()));

        port.expect("#BND?", Ok("#BND: 0,0,5"));
        assert_eq!(
            block_on(telit.load_current_bands()),
            Ok([Band::Eutran(1), Band::Eutran(3)].into_iter().collect())
        );
    }

    #[test]
    fn set_bands_2g_3g() {
        let telit = plugin(MockModem::new(), Modes::G2 | Modes::G3);
        let port = &telit.modem.primary;
        port.expect("#SWPKGV", Ok("12.00.004"));
        port.expect("#BND=0,3", Ok(""));

        let bands = [Band::Egsm, Band::Dcs, Band::Utran(1), Band::Utran(2), Band::Utran(5)];
        assert_eq!(block_on(telit.set_current_bands(&bands)), Ok(()));
    }

    #[test]
    fn modes() {
        let telit = plugin(MockModem::new(), Modes::G2 | Modes::G3 | Modes::G4);
        let port = &telit.modem.primary;
        port.expect("#SWPKGV", Ok("12.00.004"));
        port.expect("+WS46?", Ok("+WS46: 25"));
        assert_eq!(
            block_on(telit.load_current_modes()),
            Ok((Modes::G2 | Modes::G3 | Modes::G4, Modes::NONE))
        );

        port.expect("AT+WS46=29", Ok(""));
        assert_eq!(
            block_on(telit.set_current_modes(Modes::G2 | Modes::G3, Modes::NONE)),
            Ok(())
        );

        telit.store_supported_modes(Modes::G3 | Modes::G4);
        port.expect("AT+WS46=31", Ok(""));
        assert_eq!(block_on(telit.set_current_modes(Modes::ANY, Modes::NONE)), Ok(()));

        assert!(matches!(
            block_on(telit.set_current_modes(Modes::G2 | Modes::G3, Modes::G3)),
            Err(Error::Unsupported(_))
        ));
        assert_eq!(port.remaining(), 0);
    }
}
