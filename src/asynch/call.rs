//! Voice call state machine.
//!
//! A [`Call`] is shared between the host and the unsolicited result handlers
//! it registers on the modem's AT ports while the call is in progress, so it
//! lives in an [`Rc`] and keeps its state behind a blocking mutex.

use core::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::LazyLock;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use regex::{Captures, Regex};

use super::{at, FeatureSupport};
use crate::cancel::CancellationToken;
use crate::command::call_control::{
    self, ANSWER, ANSWER_TIMEOUT, DEFLECT_TIMEOUT, DIAL_TIMEOUT, DTMF_TIMEOUT, HANGUP,
    HANGUP_TIMEOUT,
};
use crate::config::PluginConfig;
use crate::error::{ConnectionError, Error};
use crate::traits::{AtPort, Modem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Unknown,
    Dialing,
    RingingOut,
    RingingIn,
    Waiting,
    Active,
    Terminated,
}

impl CallState {
    /// States during which the in-call unsolicited handlers are registered.
    fn in_call(self) -> bool {
        matches!(
            self,
            Self::Dialing | Self::RingingIn | Self::RingingOut | Self::Active
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStateReason {
    Unknown,
    OutgoingStarted,
    IncomingNew,
    Accepted,
    Terminated,
    RefusedOrBusy,
    Error,
    AudioSetupFailed,
    Transferred,
    Deflected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    Incoming,
    Outgoing,
}

/// Format of the call audio a device streams to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub encoding: String,
    pub resolution: String,
    pub rate: u32,
}

/// What an in-call unsolicited result means for the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// The remote end is ringing
    RemoteRinging,
    /// The remote end picked up
    RemoteAnswered,
    Ended(CallStateReason),
    Dtmf(String),
}

/// An unsolicited result to watch for while a call is in progress.
pub struct CallUrc {
    pub pattern: &'static LazyLock<Regex>,
    pub event: fn(&Captures<'_>) -> Option<CallEvent>,
}

static NO_CARRIER_URC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*NO CARRIER\s*$").unwrap());

static BUSY_URC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*BUSY\s*$").unwrap());

static GENERIC_URCS: [CallUrc; 2] = [
    CallUrc {
        pattern: &NO_CARRIER_URC,
        event: |_| Some(CallEvent::Ended(CallStateReason::Terminated)),
    },
    CallUrc {
        pattern: &BUSY_URC,
        event: |_| Some(CallEvent::Ended(CallStateReason::RefusedOrBusy)),
    },
];

/// Vendor specific call behaviour.
#[allow(async_fn_in_trait)]
pub trait CallVendor {
    /// Unsolicited results reporting call progress, on top of `NO CARRIER`
    /// and `BUSY`.
    fn in_call_urcs(&self) -> &'static [CallUrc] {
        &[]
    }

    /// Route the call audio once the call is up. Returns the audio format
    /// when the device streams audio to the host.
    async fn setup_audio_channel<M: Modem>(&self, modem: &M) -> Result<Option<AudioFormat>, Error> {
        let _ = modem;
        Ok(None)
    }
}

/// No vendor specifics.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericCall;

impl CallVendor for GenericCall {}

/// Receives call notifications.
pub trait CallListener {
    fn state_changed(&self, old: CallState, new: CallState, reason: CallStateReason) {
        let _ = (old, new, reason);
    }

    fn dtmf_received(&self, dtmf: &str) {
        let _ = dtmf;
    }
}

#[derive(Clone, Copy)]
enum Watchdog {
    Arm,
    Disarm,
}

struct Shared {
    state: CallState,
    reason: CallStateReason,
    /// Index in the `+CLCC` list, 0 if unknown
    index: u32,
    audio_format: Option<AudioFormat>,
    vtd: FeatureSupport,
    /// Fired to abort an in-flight dial
    start_cancel: Option<CancellationToken>,
}

pub struct Call<M: Modem, V: CallVendor> {
    this: Weak<Self>,
    modem: Rc<M>,
    config: PluginConfig,
    vendor: V,
    direction: CallDirection,
    number: Option<String>,
    shared: Mutex<NoopRawMutex, RefCell<Shared>>,
    watchdog: Signal<NoopRawMutex, Watchdog>,
    listener: RefCell<Option<Rc<dyn CallListener>>>,
}

impl<M: Modem + 'static, V: CallVendor + 'static> Call<M, V> {
    fn create(
        modem: Rc<M>,
        config: PluginConfig,
        vendor: V,
        direction: CallDirection,
        number: Option<String>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            modem,
            config,
            vendor,
            direction,
            number,
            shared: Mutex::new(RefCell::new(Shared {
                state: CallState::Unknown,
                reason: CallStateReason::Unknown,
                index: 0,
                audio_format: None,
                vtd: FeatureSupport::Unknown,
                start_cancel: None,
            })),
            watchdog: Signal::new(),
            listener: RefCell::new(None),
        })
    }

    /// A call to `number`, not started yet.
    pub fn new_outgoing(modem: Rc<M>, config: PluginConfig, vendor: V, number: &str) -> Rc<Self> {
        Self::create(
            modem,
            config,
            vendor,
            CallDirection::Outgoing,
            Some(number.to_string()),
        )
    }

    /// A call that just started ringing. The incoming call watchdog is armed.
    pub fn new_incoming(
        modem: Rc<M>,
        config: PluginConfig,
        vendor: V,
        number: Option<&str>,
        index: u32,
    ) -> Rc<Self> {
        let call = Self::create(
            modem,
            config,
            vendor,
            CallDirection::Incoming,
            number.map(str::to_string),
        );
        call.set_index(index);
        call.change_state(CallState::RingingIn, CallStateReason::IncomingNew);
        call.incoming_refresh();
        call
    }

    fn with<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        self.shared.lock(|s| f(&mut s.borrow_mut()))
    }

    pub fn state(&self) -> CallState {
        self.with(|s| s.state)
    }

    pub fn state_reason(&self) -> CallStateReason {
        self.with(|s| s.reason)
    }

    pub fn index(&self) -> u32 {
        self.with(|s| s.index)
    }

    pub fn set_index(&self, index: u32) {
        self.with(|s| s.index = index);
    }

    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn audio_format(&self) -> Option<AudioFormat> {
        self.with(|s| s.audio_format.clone())
    }

    pub fn set_listener(&self, listener: Rc<dyn CallListener>) {
        *self.listener.borrow_mut() = Some(listener);
    }

    fn listener(&self) -> Option<Rc<dyn CallListener>> {
        self.listener.borrow().clone()
    }

    pub fn change_state(&self, new: CallState, reason: CallStateReason) {
        let changed = self.with(|s| {
            if s.state == new {
                return None;
            }
            let old = s.state;
            s.state = new;
            s.reason = reason;
            let start_cancel = if new == CallState::Terminated {
                s.index = 0;
                s.start_cancel.take()
            } else {
                None
            };
            Some((old, start_cancel))
        });
        let Some((old, start_cancel)) = changed else {
            return;
        };

        info!("Call state changed: {:?} -> {:?} ({:?})", old, new, reason);

        if new == CallState::Terminated {
            self.watchdog.signal(Watchdog::Disarm);
            if let Some(cancel) = start_cancel {
                cancel.cancel();
            }
        }

        match (old.in_call(), new.in_call()) {
            (false, true) => self.register_in_call_urcs(),
            (true, false) => self.deregister_in_call_urcs(),
            _ => {}
        }

        if let Some(listener) = self.listener() {
            listener.state_changed(old, new, reason);
        }
    }

    fn in_call_urcs(&self) -> impl Iterator<Item = &'static CallUrc> + Clone {
        GENERIC_URCS.iter().chain(self.vendor.in_call_urcs())
    }

    fn register_in_call_urcs(&self) {
        for port in self.modem.at_ports() {
            for urc in self.in_call_urcs() {
                let call = self.this.clone();
                let event = urc.event;
                port.add_unsolicited_handler(
                    LazyLock::force(urc.pattern).clone(),
                    Rc::new(move |caps: &Captures<'_>| {
                        if let (Some(call), Some(event)) = (call.upgrade(), event(caps)) {
                            call.handle_event(event);
                        }
                    }),
                );
            }
        }
    }

    fn deregister_in_call_urcs(&self) {
        for port in self.modem.at_ports() {
            for urc in self.in_call_urcs() {
                port.remove_unsolicited_handler(urc.pattern.as_str());
            }
        }
    }

    fn handle_event(&self, event: CallEvent) {
        match event {
            CallEvent::RemoteRinging => {
                if self.state() == CallState::Dialing {
                    self.change_state(CallState::RingingOut, CallStateReason::OutgoingStarted);
                }
            }
            CallEvent::RemoteAnswered => {
                if self.state() == CallState::RingingOut {
                    self.change_state(CallState::Active, CallStateReason::Accepted);
                }
            }
            CallEvent::Ended(reason) => self.change_state(CallState::Terminated, reason),
            CallEvent::Dtmf(dtmf) => {
                debug!("Received DTMF: {}", dtmf);
                if let Some(listener) = self.listener() {
                    listener.dtmf_received(&dtmf);
                }
            }
        }
    }

    /// Restart the incoming call watchdog, e.g. on every `RING`.
    pub fn incoming_refresh(&self) {
        if !self.config.skip_incoming_timeout {
            self.watchdog.signal(Watchdog::Arm);
        }
    }

    /// Terminate an incoming call nobody answered in time. Returns once the
    /// call is terminated.
    pub async fn run_watchdog(&self) {
        let mut armed = false;
        while self.state() != CallState::Terminated {
            if !armed {
                armed = matches!(self.watchdog.wait().await, Watchdog::Arm);
                continue;
            }
            match select(
                Timer::after(self.config.incoming_call_timeout),
                self.watchdog.wait(),
            )
            .await
            {
                Either::First(()) => {
                    info!("Incoming call timed out: no response");
                    self.change_state(CallState::Terminated, CallStateReason::Terminated);
                }
                Either::Second(cmd) => armed = matches!(cmd, Watchdog::Arm),
            }
        }
    }

    async fn setup_audio_channel(&self) -> Result<(), Error> {
        let format = self.vendor.setup_audio_channel(&*self.modem).await?;
        self.with(|s| s.audio_format = format);
        Ok(())
    }

    /// Dial the number.
    pub async fn start(&self) -> Result<(), Error> {
        if self.state() != CallState::Unknown {
            return Err(Error::WrongState(
                "This call was not in unknown state, cannot start it".to_string(),
            ));
        }
        let number = self
            .number
            .as_deref()
            .ok_or_else(|| Error::InvalidArgs("Cannot start a call without a number".to_string()))?;
        let port = self.modem.best_at_port()?;

        let cancel = self.modem.cancellation().child();
        self.with(|s| s.start_cancel = Some(cancel.clone()));
        self.change_state(CallState::Dialing, CallStateReason::OutgoingStarted);

        let result = at::command_full(
            port,
            &call_control::dial_voice(number),
            DIAL_TIMEOUT,
            false,
            false,
            Some(&cancel),
        )
        .await;
        self.with(|s| s.start_cancel = None);

        if let Err(e) = result {
            let reason = match e.connection() {
                _ if e.is_cancelled() => CallStateReason::Error,
                Some(ConnectionError::NoDialtone) => CallStateReason::Error,
                Some(
                    ConnectionError::Busy | ConnectionError::NoAnswer | ConnectionError::NoCarrier,
                ) => CallStateReason::RefusedOrBusy,
                None => CallStateReason::Unknown,
            };
            debug!("Couldn't start call: {}", e);
            self.change_state(CallState::Terminated, reason);
            return Err(e);
        }

        if self.state() == CallState::Dialing && !self.config.call_supports_dialing_to_ringing {
            if self.config.call_supports_ringing_to_active {
                self.change_state(CallState::RingingOut, CallStateReason::OutgoingStarted);
            } else {
                self.change_state(CallState::Active, CallStateReason::Accepted);
            }
        }

        if let Err(e) = self.setup_audio_channel().await {
            self.change_state(CallState::Terminated, CallStateReason::AudioSetupFailed);
            return Err(e);
        }
        Ok(())
    }

    pub async fn accept(&self) -> Result<(), Error> {
        if self.state() != CallState::RingingIn {
            return Err(Error::WrongState(
                "This call was not ringing, cannot accept".to_string(),
            ));
        }

        let result = match at::command(&*self.modem, ANSWER, ANSWER_TIMEOUT, false).await {
            Ok(response) if !response.trim().is_empty() => Err(Error::Failed(format!(
                "Couldn't accept the call: Unhandled response '{}'",
                response.trim()
            ))),
            other => other.map(drop),
        };
        if let Err(e) = result {
            self.change_state(CallState::Terminated, CallStateReason::Error);
            return Err(e);
        }

        self.watchdog.signal(Watchdog::Disarm);
        if let Err(e) = self.setup_audio_channel().await {
            self.change_state(CallState::Terminated, CallStateReason::AudioSetupFailed);
            return Err(e);
        }
        self.change_state(CallState::Active, CallStateReason::Accepted);
        Ok(())
    }

    /// Divert a ringing or waiting call to `number`.
    pub async fn deflect(&self, number: &str) -> Result<(), Error> {
        if !matches!(self.state(), CallState::RingingIn | CallState::Waiting) {
            return Err(Error::WrongState(
                "This call was not ringing or waiting, cannot deflect".to_string(),
            ));
        }

        match at::command(
            &*self.modem,
            &call_control::deflect(number),
            DEFLECT_TIMEOUT,
            false,
        )
        .await
        {
            Ok(_) => {
                self.change_state(CallState::Terminated, CallStateReason::Deflected);
                Ok(())
            }
            Err(e) => {
                self.change_state(CallState::Terminated, CallStateReason::Error);
                Err(e)
            }
        }
    }

    /// Release this call, or every call when its index is unknown. The call
    /// counts as terminated whatever the modem answers.
    pub async fn hangup(&self) -> Result<(), Error> {
        if matches!(self.state(), CallState::Unknown | CallState::Terminated) {
            return Err(Error::WrongState(
                "This call was not active, cannot hangup".to_string(),
            ));
        }

        let index = self.index();
        self.change_state(CallState::Terminated, CallStateReason::Terminated);

        if index != 0 {
            match at::command(
                &*self.modem,
                &call_control::release_call(index),
                HANGUP_TIMEOUT,
                false,
            )
            .await
            {
                Ok(_) => return Ok(()),
                Err(e) => debug!("Couldn't release call {}: {}; hanging up", index, e),
            }
        }

        at::command(&*self.modem, HANGUP, HANGUP_TIMEOUT, false)
            .await
            .map(drop)
    }

    pub async fn send_dtmf(&self, dtmf: &str) -> Result<(), Error> {
        if self.state() != CallState::Active {
            return Err(Error::WrongState(
                "This call was not active, cannot send dtmf".to_string(),
            ));
        }

        if let Some(duration) = self.config.dtmf_tone_duration {
            if self.with(|s| s.vtd) != FeatureSupport::NotSupported {
                let support = match at::command(
                    &*self.modem,
                    &call_control::tone_duration(duration),
                    DTMF_TIMEOUT,
                    false,
                )
                .await
                {
                    Ok(_) => FeatureSupport::Supported,
                    Err(e) => {
                        debug!("Couldn't set DTMF tone duration: {}", e);
                        FeatureSupport::NotSupported
                    }
                };
                self.with(|s| s.vtd = support);
            }
        }

        for digit in dtmf.chars() {
            at::command(
                &*self.modem,
                &call_control::send_tone(digit),
                DTMF_TIMEOUT,
                false,
            )
            .await?;
        }
        Ok(())
    }
}
