//! Poll loop fanning received records out to receivers.
//!
//! Receivers are registered for a record kind and called in registration
//! order for every matching record. A receiver reports whether it consumed
//! the record; one that finds the record malformed returns a
//! [`DecodeError`], which drops that record for everyone after it.

mod defaults;

pub use defaults::{install_default_receivers, ServerInfo, SessionState};

use crate::error::{DecodeError, Result, TransportError};
use crate::protocol::{Message, RecvId};
use crate::transport::Transport;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Identifies a registered receiver.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(pub u64);

impl fmt::Debug for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReceiverId({})", self.0)
    }
}

/// Which records a receiver is called for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecvFilter {
    Any,
    /// Records of this kind or of its subtypes.
    Kind(RecvId),
}

impl RecvFilter {
    pub fn matches(&self, message: &Message<'_>) -> bool {
        match self {
            RecvFilter::Any => true,
            RecvFilter::Kind(kind) => message.is_a(*kind),
        }
    }
}

impl From<RecvId> for RecvFilter {
    fn from(kind: RecvId) -> Self {
        RecvFilter::Kind(kind)
    }
}

/// Receiver callback: `Ok(true)` if it consumed the record.
pub type Handler = Box<dyn FnMut(&Message<'_>) -> std::result::Result<bool, DecodeError> + Send>;

struct Receiver {
    id: ReceiverId,
    filter: RecvFilter,
    handler: Handler,
}

/// Routes records from a transport to registered receivers.
pub struct Dispatcher {
    receivers: Vec<Receiver>,
    next_id: u64,
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            receivers: Vec::new(),
            next_id: 1,
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn add_receiver<F>(&mut self, filter: impl Into<RecvFilter>, handler: F) -> ReceiverId
    where
        F: FnMut(&Message<'_>) -> std::result::Result<bool, DecodeError> + Send + 'static,
    {
        let id = ReceiverId(self.next_id);
        self.next_id += 1;
        self.receivers.push(Receiver {
            id,
            filter: filter.into(),
            handler: Box::new(handler),
        });
        id
    }

    /// Returns false if no receiver had this id.
    pub fn remove_receiver(&mut self, id: ReceiverId) -> bool {
        let before = self.receivers.len();
        self.receivers.retain(|r| r.id != id);
        self.receivers.len() < before
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    /// Decode one raw record and hand it to every matching receiver.
    ///
    /// Returns whether any receiver consumed it. Undecodable records are
    /// logged and dropped.
    pub fn dispatch(&mut self, raw: &[u8]) -> bool {
        let message = match Message::decode(raw) {
            Ok(message) => message,
            Err(err) => {
                warn!("dropping undecodable record of {} bytes: {}", raw.len(), err);
                return false;
            }
        };
        debug!(
            kind = %message.kind_name(),
            size = raw.len(),
            "received record"
        );

        let mut consumed = false;
        for receiver in self.receivers.iter_mut() {
            if !receiver.filter.matches(&message) {
                continue;
            }
            match (receiver.handler)(&message) {
                Ok(true) => consumed = true,
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        receiver = ?receiver.id,
                        "dropping malformed {} record: {}",
                        message.kind_name(),
                        err
                    );
                    return consumed;
                }
            }
        }

        if !consumed {
            warn!("no receiver found for {}", message.kind_name());
        }
        consumed
    }

    /// Dispatch every record the transport has queued right now.
    pub fn poll_once<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<bool> {
        let mut consumed = false;
        loop {
            match transport.poll_next() {
                Ok(Some(raw)) => consumed |= self.dispatch(&raw),
                Ok(None) | Err(TransportError::WouldBlock) => return Ok(consumed),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Poll at least once, then keep polling until a record is consumed or
    /// `timeout` has passed. Without a timeout, polls exactly once.
    ///
    /// Returns whether any record was consumed.
    pub fn receive<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timeout: Option<Duration>,
    ) -> Result<bool> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if self.poll_once(transport)? {
                return Ok(true);
            }
            let Some(deadline) = deadline else {
                return Ok(false);
            };
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}
