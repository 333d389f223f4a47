//! Boundary to the native engine connection.
//!
//! The engine is reached through a [`Transport`]: it accepts encoded
//! directives and hands back raw received records on demand. This crate
//! only distinguishes "nothing queued" from hard failures.

mod memory;

pub use memory::MemoryTransport;

use crate::error::TransportError;

/// Raw byte-level connection to the engine.
pub trait Transport {
    /// Open the connection under `client_name`.
    fn open(&mut self, client_name: &str) -> Result<(), TransportError>;

    /// Close the connection. Closing twice is not an error.
    fn close(&mut self) -> Result<(), TransportError>;

    /// Next queued record, or `None` when nothing is queued.
    ///
    /// Implementations may also report an empty queue as
    /// [`TransportError::WouldBlock`].
    fn poll_next(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Send one encoded directive.
    fn send(&mut self, directive: &[u8]) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, client_name: &str) -> Result<(), TransportError> {
        (**self).open(client_name)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn poll_next(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        (**self).poll_next()
    }

    fn send(&mut self, directive: &[u8]) -> Result<(), TransportError> {
        (**self).send(directive)
    }
}
