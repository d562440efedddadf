//! SMS pipeline: splitting outgoing text, assembling received multipart
//! messages, and the store/send/delete AT flows.
//!
//! PDU encoding is left to the host through [`PduEncoder`]. Messaging
//! storages are shared with the rest of the daemon, so every flow touching
//! them holds a [`SmsStorageLock`] for its whole duration.

use crate::asynch::at;
use crate::cancel::CancellationToken;
use crate::command::parse_response;
use crate::command::sms::responses::{MessageReference, StoredMessage};
use crate::command::sms::types::SmsStorage;
use crate::command::sms::{self, CTRL_Z, DELETE_TIMEOUT, STORE_TIMEOUT};
use crate::config::PluginConfig;
use crate::error::Error;
use crate::hex::encode_hex;
use crate::traits::{AtPort, Modem};

/// Concatenation sequence numbers are a single octet.
pub const MAX_PARTS: usize = 255;

const GSM7_SINGLE: usize = 160;
const GSM7_CONCAT: usize = 153;
const UCS2_SINGLE: usize = 70;
const UCS2_CONCAT: usize = 67;
const DATA_SINGLE: usize = 140;
const DATA_CONCAT: usize = 134;

/// GSM 03.38 default alphabet.
const GSM7_BASIC: &str = "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?\
     ¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà";

/// GSM 03.38 extension table, each character takes an escape plus itself.
const GSM7_EXTENSION: &str = "\x0c^{}\\[~]|€";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmsEncoding {
    #[default]
    Unknown,
    Gsm7,
    Ucs2,
    EightBit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PduType {
    #[default]
    Deliver,
    Submit,
    StatusReport,
}

/// What a part carries. A part never holds both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Data(Vec<u8>),
}

/// One PDU worth of a message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SmsPart {
    /// Storage slot, `None` while not stored
    pub index: Option<u32>,
    pub pdu_type: PduType,
    pub concat_reference: u16,
    /// 1-based position within a concatenated message, 0 if not concatenated
    pub concat_sequence: u8,
    pub concat_max: u8,
    pub encoding: SmsEncoding,
    pub number: Option<String>,
    pub smsc: Option<String>,
    pub timestamp: Option<String>,
    pub payload: Option<Payload>,
    pub validity_relative: Option<u32>,
    pub class: Option<u8>,
    pub delivery_report_request: bool,
    pub message_reference: u32,
}

impl SmsPart {
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Some(Payload::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&[u8]> {
        match &self.payload {
            Some(Payload::Data(data)) => Some(data),
            _ => None,
        }
    }
}

/// User supplied properties of a message to send.
#[derive(Debug, Clone, Default)]
pub struct SmsProperties {
    pub number: String,
    pub text: Option<String>,
    pub data: Option<Vec<u8>>,
    pub smsc: Option<String>,
    pub validity_relative: Option<u32>,
    pub class: Option<u8>,
    pub delivery_report_request: bool,
}

/// Whole-message view built once every part is present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SmsContent {
    pub number: Option<String>,
    pub smsc: Option<String>,
    pub timestamp: Option<String>,
    pub encoding: SmsEncoding,
    pub text: Option<String>,
    pub data: Option<Vec<u8>>,
    pub class: Option<u8>,
    pub validity_relative: Option<u32>,
    pub delivery_report_request: bool,
    pub message_reference: u32,
}

/// Splits outgoing text into per-part chunks and picks their encoding.
pub trait SmsSplitter {
    fn split_text(&self, text: &str) -> (Vec<String>, SmsEncoding);
}

/// Builds SUBMIT PDUs.
pub trait PduEncoder {
    /// PDU bytes for `part`, SMSC address included, and the offset at which
    /// the TPDU starts.
    fn submit_pdu(&self, part: &SmsPart) -> Result<(Vec<u8>, usize), Error>;
}

/// Daemon-wide messaging storage lock.
#[allow(async_fn_in_trait)]
pub trait SmsStorageLock {
    /// Select `mem1` (read/delete) and `mem2` (write/send) and keep them
    /// selected until [`SmsStorageLock::unlock_storages`].
    async fn lock_storages(&self, mem1: SmsStorage, mem2: SmsStorage) -> Result<(), Error>;

    fn unlock_storages(&self, mem1: SmsStorage, mem2: SmsStorage);
}

/// Holds the storage lock; releases it when dropped.
struct StorageGuard<'a, S: SmsStorageLock> {
    storages: &'a S,
    mem1: SmsStorage,
    mem2: SmsStorage,
}

impl<'a, S: SmsStorageLock> StorageGuard<'a, S> {
    async fn lock(storages: &'a S, mem1: SmsStorage, mem2: SmsStorage) -> Result<Self, Error> {
        storages.lock_storages(mem1, mem2).await?;
        Ok(Self {
            storages,
            mem1,
            mem2,
        })
    }
}

impl<S: SmsStorageLock> Drop for StorageGuard<'_, S> {
    fn drop(&mut self) {
        self.storages.unlock_storages(self.mem1, self.mem2);
    }
}

/// Default splitter: GSM-7 when the text fits the default alphabet, UCS-2
/// otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharsetSplitter;

fn gsm7_septets(c: char) -> Option<usize> {
    if GSM7_BASIC.contains(c) {
        Some(1)
    } else if GSM7_EXTENSION.contains(c) {
        Some(2)
    } else {
        None
    }
}

/// Cut `text` so that no chunk weighs more than `concat`, or keep it whole if
/// it fits in `single`. A character is never split across chunks.
fn split_weighted(text: &str, weights: &[usize], single: usize, concat: usize) -> Vec<String> {
    if weights.iter().sum::<usize>() <= single {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    for (c, &weight) in text.chars().zip(weights) {
        if used + weight > concat {
            chunks.push(core::mem::take(&mut current));
            used = 0;
        }
        current.push(c);
        used += weight;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

impl SmsSplitter for CharsetSplitter {
    fn split_text(&self, text: &str) -> (Vec<String>, SmsEncoding) {
        match text.chars().map(gsm7_septets).collect::<Option<Vec<_>>>() {
            Some(septets) => (
                split_weighted(text, &septets, GSM7_SINGLE, GSM7_CONCAT),
                SmsEncoding::Gsm7,
            ),
            None => {
                let units: Vec<usize> = text.chars().map(char::len_utf16).collect();
                (
                    split_weighted(text, &units, UCS2_SINGLE, UCS2_CONCAT),
                    SmsEncoding::Ucs2,
                )
            }
        }
    }
}

fn split_data(data: &[u8]) -> Vec<Vec<u8>> {
    if data.len() <= DATA_SINGLE {
        return vec![data.to_vec()];
    }
    data.chunks(DATA_CONCAT).map(<[u8]>::to_vec).collect()
}

/// Collaborators and settings the AT flows need.
pub struct SmsContext<'a, M, S, E> {
    pub modem: &'a M,
    pub storages: &'a S,
    pub encoder: &'a E,
    pub config: &'a PluginConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Sms {
    storage: SmsStorage,
    multipart: bool,
    max_parts: u8,
    multipart_reference: u16,
    /// Sorted by concatenation sequence
    parts: Vec<SmsPart>,
    content: Option<SmsContent>,
}

impl Sms {
    /// Build a message to send, split into as many parts as needed.
    pub fn new_outgoing(props: &SmsProperties, splitter: &impl SmsSplitter) -> Result<Self, Error> {
        let (payloads, encoding): (Vec<Payload>, _) = match (&props.text, &props.data) {
            (Some(text), None) => {
                let (chunks, encoding) = splitter.split_text(text);
                (chunks.into_iter().map(Payload::Text).collect(), encoding)
            }
            (None, Some(data)) => (
                split_data(data).into_iter().map(Payload::Data).collect(),
                SmsEncoding::EightBit,
            ),
            (Some(_), Some(_)) => {
                return Err(Error::InvalidArgs(
                    "Cannot create SMS: both 'text' and 'data' given".to_string(),
                ))
            }
            (None, None) => {
                return Err(Error::InvalidArgs(
                    "Cannot create SMS: mandatory parameter 'text' or 'data' is missing"
                        .to_string(),
                ))
            }
        };

        if payloads.is_empty() {
            return Err(Error::InvalidArgs(
                "Cannot generate PDUs: Error processing input text".to_string(),
            ));
        }
        if payloads.len() > MAX_PARTS {
            return Err(Error::TooMany(
                "Cannot generate PDUs: Text or Data too long".to_string(),
            ));
        }

        let n = payloads.len() as u8;
        let multipart = n > 1;
        let parts = payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| SmsPart {
                pdu_type: PduType::Submit,
                concat_sequence: if multipart { i as u8 + 1 } else { 0 },
                concat_max: if multipart { n } else { 0 },
                encoding,
                number: Some(props.number.clone()),
                smsc: props.smsc.clone(),
                payload: Some(payload),
                validity_relative: props.validity_relative,
                class: props.class,
                delivery_report_request: props.delivery_report_request,
                ..Default::default()
            })
            .collect();

        let mut sms = Self {
            multipart,
            max_parts: n,
            parts,
            ..Default::default()
        };
        sms.assemble()?;
        Ok(sms)
    }

    /// A received message made of a single part.
    pub fn new_singlepart(storage: SmsStorage, part: SmsPart) -> Result<Self, Error> {
        let mut sms = Self {
            storage,
            max_parts: 1,
            parts: vec![part],
            ..Default::default()
        };
        sms.assemble()?;
        Ok(sms)
    }

    /// A received concatenated message, starting from whichever part came
    /// first.
    pub fn new_multipart(
        storage: SmsStorage,
        reference: u16,
        max_parts: u8,
        first_part: SmsPart,
    ) -> Result<Self, Error> {
        let mut sms = Self {
            storage,
            multipart: true,
            max_parts,
            multipart_reference: reference,
            ..Default::default()
        };
        sms.take_part(first_part)?;
        Ok(sms)
    }

    pub fn storage(&self) -> SmsStorage {
        self.storage
    }

    pub fn is_multipart(&self) -> bool {
        self.multipart
    }

    pub fn multipart_reference(&self) -> u16 {
        self.multipart_reference
    }

    pub fn parts(&self) -> &[SmsPart] {
        &self.parts
    }

    pub fn content(&self) -> Option<&SmsContent> {
        self.content.as_ref()
    }

    pub fn is_assembled(&self) -> bool {
        self.content.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.parts.len() == self.max_parts as usize
    }

    fn is_stored(&self) -> bool {
        self.storage != SmsStorage::Unknown && self.parts.iter().any(|p| p.index.is_some())
    }

    /// Add a received part. Once the last missing part is taken the message
    /// is assembled; an assembly failure leaves it unassembled but the part
    /// is kept.
    pub fn take_part(&mut self, part: SmsPart) -> Result<(), Error> {
        if !self.multipart {
            return Err(Error::Failed("This SMS is not a multipart message".to_string()));
        }
        if self.parts.len() >= self.max_parts as usize {
            return Err(Error::Failed(format!(
                "Already took {} parts, cannot take more",
                self.parts.len()
            )));
        }

        let sequence = part.concat_sequence;
        let pos = match self
            .parts
            .binary_search_by_key(&sequence, |p| p.concat_sequence)
        {
            Ok(_) => {
                return Err(Error::Failed(format!(
                    "Cannot take part, sequence {} already taken",
                    sequence
                )))
            }
            Err(pos) => pos,
        };
        if sequence > self.max_parts {
            return Err(Error::Failed(format!(
                "Cannot take part with sequence {}, maximum is {}",
                sequence, self.max_parts
            )));
        }

        self.parts.insert(pos, part);

        if self.is_complete() {
            if let Err(e) = self.assemble() {
                warn!("Couldn't assemble SMS: {}", e);
            }
        }
        Ok(())
    }

    /// Concatenate the parts into [`SmsContent`]. On error nothing is kept.
    pub fn assemble(&mut self) -> Result<(), Error> {
        let ordered: Vec<&SmsPart> = if self.multipart {
            (1..=self.max_parts)
                .map(|sequence| {
                    self.parts
                        .iter()
                        .find(|p| p.concat_sequence == sequence)
                        .ok_or_else(|| {
                            Error::Failed(format!(
                                "Cannot assemble SMS, missing part at index ({})",
                                sequence
                            ))
                        })
                })
                .collect::<Result<_, _>>()?
        } else {
            if self.parts.len() != 1 {
                return Err(Error::Failed(format!(
                    "Single part message with multiple parts ({}) found",
                    self.parts.len()
                )));
            }
            self.parts.iter().collect()
        };

        let (Some(first), Some(last)) = (ordered.first(), ordered.last()) else {
            return Err(Error::Failed("Cannot assemble SMS without parts".to_string()));
        };

        let mut text: Option<String> = None;
        let mut data: Option<Vec<u8>> = None;
        for part in &ordered {
            match &part.payload {
                Some(Payload::Text(t)) => text.get_or_insert_with(String::new).push_str(t),
                Some(Payload::Data(d)) => data.get_or_insert_with(Vec::new).extend_from_slice(d),
                None if part.pdu_type == PduType::StatusReport => {}
                None => {
                    return Err(Error::Failed(format!(
                        "Cannot assemble SMS, part at index ({}) has neither text nor data",
                        part.concat_sequence
                    )))
                }
            }
        }

        self.content = Some(SmsContent {
            number: first.number.clone(),
            smsc: first.smsc.clone(),
            timestamp: first.timestamp.clone(),
            encoding: first.encoding,
            text,
            data,
            class: first.class,
            validity_relative: first.validity_relative,
            delivery_report_request: last.delivery_report_request,
            message_reference: last.message_reference,
        });
        Ok(())
    }

    /// Write every part to `storage`.
    ///
    /// Parts written before a failure keep their index and the message
    /// records `storage`, so a later `store` to the same storage only writes
    /// the remaining parts and `delete` removes the written ones.
    pub async fn store<M: Modem, S: SmsStorageLock, E: PduEncoder>(
        &mut self,
        ctx: &SmsContext<'_, M, S, E>,
        storage: SmsStorage,
    ) -> Result<(), Error> {
        if self.is_stored() && self.storage != storage {
            return Err(Error::Failed(format!(
                "SMS is already stored in {}",
                self.storage
            )));
        }
        if self.is_stored() && self.parts.iter().all(|p| p.index.is_some()) {
            return Ok(());
        }

        let _guard = StorageGuard::lock(ctx.storages, SmsStorage::Unknown, storage).await?;
        let port = ctx.modem.best_at_port()?;
        let cancel = ctx.modem.cancellation().child();

        for part in self.parts.iter_mut().filter(|p| p.index.is_none()) {
            let index = store_part(port, part, ctx, &cancel).await?;
            debug!("Stored SMS part at index {} in {}", index, storage);
            part.index = Some(index);
            self.storage = storage;
        }

        Ok(())
    }

    /// Send every part, from storage when the message is stored.
    ///
    /// A stored part that fails to go out with `+CMSS` is retried with a
    /// generic send, and so are all the parts after it. Timeouts are not
    /// retried.
    pub async fn send<M: Modem, S: SmsStorageLock, E: PduEncoder>(
        &mut self,
        ctx: &SmsContext<'_, M, S, E>,
    ) -> Result<(), Error> {
        let mut from_storage = self.is_stored();
        let _guard = if from_storage {
            Some(StorageGuard::lock(ctx.storages, SmsStorage::Unknown, self.storage).await?)
        } else {
            None
        };

        for part in self.parts.iter_mut() {
            let reference = match part.index.filter(|_| from_storage) {
                Some(index) => match send_stored_part(ctx, index).await {
                    Ok(reference) => reference,
                    Err(e) if e.is_timeout() || e.is_cancelled() => return Err(e),
                    Err(e) => {
                        debug!(
                            "Couldn't send SMS part {} from storage: {}; trying generic send",
                            index, e
                        );
                        from_storage = false;
                        send_generic_part(ctx, part).await?
                    }
                },
                None => send_generic_part(ctx, part).await?,
            };
            part.message_reference = reference;
        }

        if let (Some(content), Some(last)) = (self.content.as_mut(), self.parts.last()) {
            content.message_reference = last.message_reference;
        }
        Ok(())
    }

    /// Remove every stored part. Parts are forgotten even when their delete
    /// fails.
    pub async fn delete<M: Modem, S: SmsStorageLock, E: PduEncoder>(
        &mut self,
        ctx: &SmsContext<'_, M, S, E>,
    ) -> Result<(), Error> {
        if !self.is_stored() {
            return Ok(());
        }

        let _guard = StorageGuard::lock(ctx.storages, self.storage, SmsStorage::Unknown).await?;

        let mut failed = 0;
        for part in self.parts.iter_mut() {
            let Some(index) = part.index.take() else {
                continue;
            };
            if let Err(e) = at::command(ctx.modem, &sms::delete(index), DELETE_TIMEOUT, false).await
            {
                debug!("Couldn't delete SMS part with index {}: {}", index, e);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(Error::Failed(format!(
                "Couldn't delete {} parts from this SMS",
                failed
            )));
        }
        Ok(())
    }
}

/// Command and message data for storing or sending `part`.
fn part_commands<M, S, E: PduEncoder>(
    part: &SmsPart,
    ctx: &SmsContext<'_, M, S, E>,
    send: bool,
) -> Result<(String, String), Error> {
    if ctx.config.sms_pdu_mode {
        let (pdu, msg_start) = ctx.encoder.submit_pdu(part)?;
        let tpdu_len = pdu.len().saturating_sub(msg_start);
        let command = if send {
            sms::send_pdu(tpdu_len)
        } else {
            sms::write_pdu(tpdu_len)
        };
        return Ok((command, format!("{}{}", encode_hex(&pdu), CTRL_Z)));
    }

    let number = part
        .number
        .as_deref()
        .ok_or_else(|| Error::InvalidArgs("Cannot use SMS without a number".to_string()))?;
    let text = part
        .text()
        .ok_or_else(|| Error::InvalidArgs("Text mode requires a text payload".to_string()))?;
    let command = if send {
        sms::send_text(number)
    } else {
        sms::write_text(number)
    };
    Ok((command, format!("{}{}", text, CTRL_Z)))
}

async fn store_part<P: AtPort, M, S, E: PduEncoder>(
    port: &P,
    part: &SmsPart,
    ctx: &SmsContext<'_, M, S, E>,
    cancel: &CancellationToken,
) -> Result<u32, Error> {
    let (command, data) = part_commands(part, ctx, false)?;
    at::command_full(port, &command, STORE_TIMEOUT, false, false, Some(cancel)).await?;
    let response = at::command_full(port, &data, STORE_TIMEOUT, false, true, Some(cancel)).await?;

    parse_response::<StoredMessage>(&response, "+CMGW")
        .map(|stored| stored.index)
        .map_err(|_| {
            Error::Parse(format!(
                "Couldn't read index of already stored part: '{}'",
                response.trim()
            ))
        })
}

fn message_reference(response: &str) -> Result<u32, Error> {
    parse_response::<MessageReference>(response, "message reference")
        .map(|r| r.reference)
        .map_err(|_| {
            Error::Parse(format!(
                "Couldn't read message reference: '{}'",
                response.trim()
            ))
        })
}

async fn send_stored_part<M: Modem, S, E>(
    ctx: &SmsContext<'_, M, S, E>,
    index: u32,
) -> Result<u32, Error> {
    let response = at::command(
        ctx.modem,
        &sms::send_from_storage(index),
        ctx.config.sms_send_timeout,
        false,
    )
    .await?;
    message_reference(&response)
}

async fn send_generic_part<M: Modem, S, E: PduEncoder>(
    ctx: &SmsContext<'_, M, S, E>,
    part: &SmsPart,
) -> Result<u32, Error> {
    let (command, data) = part_commands(part, ctx, true)?;
    let port = ctx.modem.best_at_port()?;
    let cancel = ctx.modem.cancellation().child();

    at::command_full(port, &command, STORE_TIMEOUT, false, false, Some(&cancel)).await?;
    let response = at::command_full(
        port,
        &data,
        ctx.config.sms_send_timeout,
        false,
        true,
        Some(&cancel),
    )
    .await?;
    message_reference(&response)
}
