//! Wire format of the engine protocol.
//!
//! - [`recv`]: received records, decoded as borrowed views of the buffer
//! - [`data`]: schema-driven items inside `SimObjectData` records
//! - [`directive`]: typed outgoing calls and their encoding
//! - [`builder`]: encoders for received records (in-memory transports, tests)
//!
//! All integers are little-endian.

pub mod builder;
pub mod data;
pub mod directive;
mod exception;
pub mod reader;
pub mod recv;

/// Version tag written into every envelope this client produces.
pub const PROTOCOL_VERSION: u32 = 4;

pub use builder::{RecordBuilder, SimObjectDataBuilder};
pub use data::{decode_items, decode_value, encode_value};
pub use directive::{Directive, DirectiveId};
pub use exception::{exception_code, exception_name};
pub use reader::ByteReader;
pub use recv::{
    Envelope, EventRecord, ExceptionRecord, FacilitiesList, Message, OpenRecord, Recv, RecvId,
    SimObjectData, SystemStateRecord, ENVELOPE_SIZE, SIMOBJECT_DATA_OFFSET,
};
