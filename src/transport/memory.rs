//! In-process transport backed by queues.

use super::Transport;
use crate::error::TransportError;
use crate::protocol::{Directive, RecordBuilder, SimObjectDataBuilder};
use crate::types::{DataType, DefinitionId, Period};
use std::collections::{HashMap, VecDeque};

/// Transport that queues records in memory and records every directive.
///
/// With echo enabled it behaves like a minimal engine: it remembers data
/// definitions and the last data set on each, and answers data requests
/// with that data as a `SimObjectData` record.
pub struct MemoryTransport {
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    open: bool,
    client_name: Option<String>,
    /// Record queued when the connection opens.
    handshake: Option<Vec<u8>>,
    echo: bool,
    definitions: HashMap<DefinitionId, Vec<DataType>>,
    stored: HashMap<DefinitionId, Vec<u8>>,
    send_failure: Option<String>,
    /// Sends still allowed before a single send fails.
    one_shot_failure: Option<(usize, String)>,
    open_failure: Option<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            sent: Vec::new(),
            open: false,
            client_name: None,
            handshake: Some(RecordBuilder::open("MemoryTransport", (1, 0), (0, 0))),
            echo: false,
            definitions: HashMap::new(),
            stored: HashMap::new(),
            send_failure: None,
            one_shot_failure: None,
            open_failure: None,
        }
    }

    /// Answer data requests with previously set data.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Don't queue an `Open` record on open.
    pub fn without_handshake(mut self) -> Self {
        self.handshake = None;
        self
    }

    /// Fail every subsequent open with `reason`.
    pub fn fail_open(mut self, reason: impl Into<String>) -> Self {
        self.open_failure = Some(reason.into());
        self
    }

    /// Fail every subsequent send with `reason`.
    pub fn fail_sends(&mut self, reason: impl Into<String>) {
        self.send_failure = Some(reason.into());
    }

    /// Fail only the send made after `successes` more successful ones.
    pub fn fail_nth_send(&mut self, successes: usize, reason: impl Into<String>) {
        self.one_shot_failure = Some((successes, reason.into()));
    }

    /// Queue a raw record for the client to receive.
    pub fn push(&mut self, record: Vec<u8>) {
        self.inbound.push_back(record);
    }

    /// Number of records not yet received.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn client_name(&self) -> Option<&str> {
        self.client_name.as_deref()
    }

    /// Every directive sent so far, as raw bytes.
    pub fn sent_raw(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Every directive sent so far, decoded. Undecodable bytes are skipped.
    pub fn sent(&self) -> Vec<Directive> {
        self.sent
            .iter()
            .filter_map(|raw| Directive::decode(raw).ok())
            .collect()
    }

    /// Forget recorded directives.
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    fn echo_directive(&mut self, directive: Directive) {
        match directive {
            Directive::AddToDataDefinition {
                define_id,
                data_type,
                ..
            } => {
                self.definitions.entry(define_id).or_default().push(data_type);
            }
            Directive::ClearDataDefinition { define_id } => {
                self.definitions.remove(&define_id);
                self.stored.remove(&define_id);
            }
            Directive::SetDataOnSimObject {
                define_id, data, ..
            } => {
                self.stored.insert(define_id, data);
            }
            Directive::RequestDataOnSimObject {
                request_id,
                define_id,
                object_id,
                period,
                flags,
                ..
            } => {
                if period == Period::Never {
                    return;
                }
                let (Some(types), Some(data)) =
                    (self.definitions.get(&define_id), self.stored.get(&define_id))
                else {
                    return;
                };

                let mut builder = SimObjectDataBuilder::new(request_id, define_id)
                    .object_id(object_id)
                    .flags(flags);
                let mut offset = 0;
                for (index, data_type) in types.iter().enumerate() {
                    let Some(width) = data_type.width() else {
                        return;
                    };
                    let Some(item) = data.get(offset..offset + width) else {
                        return;
                    };
                    let tag = flags.is_tagged().then_some(index as u32);
                    builder = builder.raw_item(tag, item);
                    offset += width;
                }
                self.inbound.push_back(builder.build());
            }
            _ => {}
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, client_name: &str) -> Result<(), TransportError> {
        if let Some(reason) = &self.open_failure {
            return Err(TransportError::Open(reason.clone()));
        }
        self.open = true;
        self.client_name = Some(client_name.to_string());
        if let Some(handshake) = self.handshake.clone() {
            self.inbound.push_back(handshake);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }

    fn poll_next(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        Ok(self.inbound.pop_front())
    }

    fn send(&mut self, directive: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        if let Some(reason) = &self.send_failure {
            return Err(TransportError::Send(reason.clone()));
        }
        match &mut self.one_shot_failure {
            Some((0, reason)) => {
                let reason = std::mem::take(reason);
                self.one_shot_failure = None;
                return Err(TransportError::Send(reason));
            }
            Some((remaining, _)) => *remaining -= 1,
            None => {}
        }
        self.sent.push(directive.to_vec());
        if self.echo {
            if let Ok(decoded) = Directive::decode(directive) {
                self.echo_directive(decoded);
            }
        }
        Ok(())
    }
}
