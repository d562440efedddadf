//! Scripted collaborators for unit tests.

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;

use embassy_time::Duration;
use regex::Regex;

use crate::asynch::sms::SmsStorageLock;
use crate::cancel::CancellationToken;
use crate::command::device_lock::types::PinStatusCode;
use crate::command::sms::types::SmsStorage;
use crate::error::Error;
use crate::modules::{Generic, Module};
use crate::traits::{AtPort, DataPort, Modem, UrcHandler};

/// AT port replaying scripted replies in order.
///
/// Every `send` is checked against the next expected command. Commands sent
/// with nothing left to replay time out.
pub struct MockPort {
    name: String,
    script: RefCell<VecDeque<(String, Result<String, Error>)>>,
    sent: RefCell<Vec<String>>,
    handlers: RefCell<Vec<(Regex, UrcHandler)>>,
    connected: Cell<bool>,
    open: Cell<bool>,
    open_count: Cell<u32>,
    init_sequence: Cell<bool>,
    init_sequence_on_open: RefCell<Vec<bool>>,
    fail_open: Cell<bool>,
}

impl MockPort {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: RefCell::new(VecDeque::new()),
            sent: RefCell::new(Vec::new()),
            handlers: RefCell::new(Vec::new()),
            connected: Cell::new(false),
            open: Cell::new(false),
            open_count: Cell::new(0),
            init_sequence: Cell::new(true),
            init_sequence_on_open: RefCell::new(Vec::new()),
            fail_open: Cell::new(false),
        }
    }

    pub fn expect(&self, command: &str, response: Result<&str, Error>) {
        self.script
            .borrow_mut()
            .push_back((command.to_string(), response.map(str::to_string)));
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.borrow().len()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.set(fail);
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub fn open_count(&self) -> u32 {
        self.open_count.get()
    }

    pub fn init_sequence_on_open(&self) -> Vec<bool> {
        self.init_sequence_on_open.borrow().clone()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Deliver an unsolicited line to every matching handler.
    pub fn emit(&self, line: &str) {
        let handlers: Vec<(Regex, UrcHandler)> = self.handlers.borrow().clone();
        for (re, handler) in handlers {
            if let Some(caps) = re.captures(line) {
                handler(&caps);
            }
        }
    }
}

impl AtPort for MockPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn open(&self) -> Result<(), Error> {
        if self.fail_open.get() {
            return Err(Error::Failed(format!("couldn't open {}", self.name)));
        }
        self.init_sequence_on_open
            .borrow_mut()
            .push(self.init_sequence.get());
        self.open.set(true);
        self.open_count.set(self.open_count.get() + 1);
        Ok(())
    }

    fn close(&self) {
        self.open.set(false);
    }

    fn init_sequence_enabled(&self) -> bool {
        self.init_sequence.get()
    }

    fn set_init_sequence_enabled(&self, enabled: bool) {
        self.init_sequence.set(enabled);
    }

    async fn send(
        &self,
        command: &str,
        _timeout: Duration,
        _raw: bool,
        _allow_cached: bool,
    ) -> Result<String, Error> {
        assert!(self.open.get(), "{}: send on a closed port", self.name);
        self.sent.borrow_mut().push(command.to_string());
        let next = self.script.borrow_mut().pop_front();
        embassy_futures::yield_now().await;
        match next {
            Some((expected, response)) => {
                assert_eq!(command, expected, "{}: unexpected command", self.name);
                response
            }
            None => Err(Error::Atat(atat::Error::Timeout)),
        }
    }

    fn add_unsolicited_handler(&self, pattern: Regex, handler: UrcHandler) {
        let mut handlers = self.handlers.borrow_mut();
        handlers.retain(|(re, _)| re.as_str() != pattern.as_str());
        handlers.push((pattern, handler));
    }

    fn remove_unsolicited_handler(&self, pattern: &str) {
        self.handlers
            .borrow_mut()
            .retain(|(re, _)| re.as_str() != pattern);
    }
}

pub struct MockModem {
    pub primary: MockPort,
    pub secondary: Option<MockPort>,
    pub data: Option<DataPort>,
    pub module: Module,
    pub cancel: CancellationToken,
    pub drivers: Vec<String>,
    pub lock: Cell<PinStatusCode>,
    pub cdma_only: bool,
    pub sim_events: Cell<u32>,
    pub hot_swaps: Cell<u32>,
    pub signal_quality: Cell<Option<u8>>,
}

impl MockModem {
    pub fn new() -> Self {
        Self {
            primary: MockPort::new("ttyUSB2"),
            secondary: None,
            data: None,
            module: Module::Generic(Generic),
            cancel: CancellationToken::new(),
            drivers: Vec::new(),
            lock: Cell::new(PinStatusCode::Ready),
            cdma_only: false,
            sim_events: Cell::new(0),
            hot_swaps: Cell::new(0),
            signal_quality: Cell::new(None),
        }
    }

    pub fn with_module(module: Module) -> Self {
        Self {
            module,
            ..Self::new()
        }
    }
}

impl Modem for MockModem {
    type Port = MockPort;

    fn best_at_port(&self) -> Result<&MockPort, Error> {
        Ok(&self.primary)
    }

    fn primary_port(&self) -> Option<&MockPort> {
        Some(&self.primary)
    }

    fn secondary_port(&self) -> Option<&MockPort> {
        self.secondary.as_ref()
    }

    fn data_port(&self) -> Option<DataPort> {
        self.data.clone()
    }

    fn module(&self) -> Module {
        self.module
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn drivers(&self) -> &[String] {
        &self.drivers
    }

    fn unlock_required(&self) -> PinStatusCode {
        self.lock.get()
    }

    fn is_cdma_only(&self) -> bool {
        self.cdma_only
    }

    fn process_sim_event(&self) {
        self.sim_events.set(self.sim_events.get() + 1);
    }

    fn sim_hot_swap_detected(&self) {
        self.hot_swaps.set(self.hot_swaps.get() + 1);
    }

    fn signal_quality_changed(&self, quality: u8) {
        self.signal_quality.set(Some(quality));
    }
}

/// Storage lock recording every lock/unlock call.
#[derive(Default)]
pub struct MockStorage {
    pub calls: RefCell<Vec<String>>,
    pub refuse: Cell<bool>,
}

impl SmsStorageLock for MockStorage {
    async fn lock_storages(&self, mem1: SmsStorage, mem2: SmsStorage) -> Result<(), Error> {
        if self.refuse.get() {
            return Err(Error::Failed("storages are locked".to_string()));
        }
        self.calls
            .borrow_mut()
            .push(format!("lock {} {}", mem1, mem2));
        Ok(())
    }

    fn unlock_storages(&self, mem1: SmsStorage, mem2: SmsStorage) {
        self.calls
            .borrow_mut()
            .push(format!("unlock {} {}", mem1, mem2));
    }
}
