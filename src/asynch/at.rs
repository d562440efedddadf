//! AT command sequence engine.
//!
//! Runs an ordered list of commands through one port, handing every reply to
//! the command's [`Processor`]. The port is opened for the duration of the
//! call and closed again whatever the outcome.

use std::borrow::Cow;

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};

use super::processors::{Processor, ProcessorResult, Step};
use crate::cancel::CancellationToken;
use crate::error::Error;
use crate::modules::ModuleParams;
use crate::traits::{AtPort, Modem};

/// One step of a sequence.
pub struct AtCommand<C> {
    pub command: Cow<'static, str>,
    pub timeout: Duration,
    pub allow_cached: bool,
    pub processor: Processor<C>,
}

impl<C> AtCommand<C> {
    pub const fn new(
        command: &'static str,
        timeout: Duration,
        allow_cached: bool,
        processor: Processor<C>,
    ) -> Self {
        Self {
            command: Cow::Borrowed(command),
            timeout,
            allow_cached,
            processor,
        }
    }

    /// A step whose command text is built at runtime.
    pub fn owned(
        command: String,
        timeout: Duration,
        allow_cached: bool,
        processor: Processor<C>,
    ) -> Self {
        Self {
            command: Cow::Owned(command),
            timeout,
            allow_cached,
            processor,
        }
    }
}

/// Keeps a port open; closes it when dropped.
pub(crate) struct PortSession<'a, P: AtPort> {
    port: &'a P,
}

impl<'a, P: AtPort> PortSession<'a, P> {
    /// Open `port` without running its init sequence.
    pub(crate) fn open(port: &'a P) -> Result<Self, Error> {
        if port.is_connected() {
            return Err(Error::Connected);
        }

        let init_sequence = port.init_sequence_enabled();
        port.set_init_sequence_enabled(false);
        let opened = port.open();
        port.set_init_sequence_enabled(init_sequence);
        opened?;

        Ok(Self { port })
    }
}

impl<P: AtPort> Drop for PortSession<'_, P> {
    fn drop(&mut self) {
        self.port.close();
    }
}

/// Run `commands` in order on `port`.
///
/// Returns the value of the first processor that succeeds, `Ok(None)` when
/// every processor asked to continue, or the error of the first one that
/// fails. `cancel` is checked before each command and again when its reply
/// arrives, and aborts the delay between commands.
pub async fn sequence<P: AtPort, C>(
    port: &P,
    commands: &[AtCommand<C>],
    ctx: &mut C,
    cancel: &CancellationToken,
    wait_between: Option<Duration>,
) -> Result<Option<String>, Error> {
    let _session = PortSession::open(port)?;

    for (i, cmd) in commands.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if i > 0 {
            if let Some(wait) = wait_between {
                delay(wait, cancel).await?;
            }
        }

        trace!("({}) sequence step {}: '{}'", port.name(), i, cmd.command);
        let response = port
            .send(&cmd.command, cmd.timeout, false, cmd.allow_cached)
            .await;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let step = Step {
            command: &cmd.command,
            last_command: i + 1 == commands.len(),
        };
        match (cmd.processor)(ctx, step, response) {
            ProcessorResult::Continue => {}
            ProcessorResult::Success(value) => return Ok(value),
            ProcessorResult::Failure(e) => return Err(e),
        }
    }

    Ok(None)
}

/// Run a sequence on the modem's best AT port, cancelled along with the
/// modem.
pub async fn sequence_on_modem<M: Modem, C>(
    modem: &M,
    commands: &[AtCommand<C>],
    ctx: &mut C,
) -> Result<Option<String>, Error> {
    let port = modem.best_at_port()?;
    let cancel = modem.cancellation().child();
    let wait_between = modem.module().command_delay_default();
    sequence(port, commands, ctx, &cancel, wait_between).await
}

/// Sleep for `duration`, or until `cancel` fires.
pub async fn delay(duration: Duration, cancel: &CancellationToken) -> Result<(), Error> {
    match select(Timer::after(duration), cancel.cancelled()).await {
        Either::First(()) => Ok(()),
        Either::Second(()) => Err(Error::Cancelled),
    }
}

/// Send a single command on `port`.
pub async fn command_full<P: AtPort>(
    port: &P,
    command: &str,
    timeout: Duration,
    allow_cached: bool,
    raw: bool,
    cancel: Option<&CancellationToken>,
) -> Result<String, Error> {
    let _session = PortSession::open(port)?;

    let cancelled = || cancel.is_some_and(|c| c.is_cancelled());
    if cancelled() {
        return Err(Error::Cancelled);
    }

    debug!("({}) --> '{}'", port.name(), command);
    let response = port.send(command, timeout, raw, allow_cached).await;

    if cancelled() {
        return Err(Error::Cancelled);
    }
    response
}

/// Send a single command on the modem's best AT port.
pub async fn command<M: Modem>(
    modem: &M,
    command: &str,
    timeout: Duration,
    allow_cached: bool,
) -> Result<String, Error> {
    let port = modem.best_at_port()?;
    let cancel = modem.cancellation().child();
    command_full(port, command, timeout, allow_cached, false, Some(&cancel)).await
}
