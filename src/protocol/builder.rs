//! Encoders producing received-record layouts.
//!
//! The engine is the normal producer of these buffers; the builders exist
//! for in-memory transports, replay and tests.

use super::recv::{RecvId, APPLICATION_NAME_WIDTH, ENVELOPE_SIZE};
use super::PROTOCOL_VERSION;
use crate::types::{DefinitionId, RequestFlags, RequestId, OBJECT_ID_USER};

/// Appends little-endian fields after an envelope and patches the size on `build`.
pub struct RecordBuilder {
    buf: Vec<u8>,
}

impl RecordBuilder {
    pub fn new(kind: u32) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        buf.extend_from_slice(&kind.to_le_bytes());
        debug_assert_eq!(buf.len(), ENVELOPE_SIZE);
        Self { buf }
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i32(mut self, v: i32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i64(mut self, v: i64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(mut self, v: f32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f64(mut self, v: f64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn bytes(mut self, raw: &[u8]) -> Self {
        self.buf.extend_from_slice(raw);
        self
    }

    /// NUL-padded character field, truncated to `width`.
    pub fn fixed_str(mut self, s: &str, width: usize) -> Self {
        put_fixed_str(&mut self.buf, s, width);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let size = self.buf.len() as u32;
        self.buf[0..4].copy_from_slice(&size.to_le_bytes());
        self.buf
    }

    /// Handshake record answering an open.
    pub fn open(application_name: &str, version: (u32, u32), build: (u32, u32)) -> Vec<u8> {
        Self::new(RecvId::Open.code())
            .fixed_str(application_name, APPLICATION_NAME_WIDTH)
            .u32(version.0)
            .u32(version.1)
            .u32(build.0)
            .u32(build.1)
            .u32(PROTOCOL_VERSION)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(0)
            .build()
    }

    pub fn exception(exception: u32, send_id: u32, index: u32) -> Vec<u8> {
        Self::new(RecvId::Exception.code())
            .u32(exception)
            .u32(send_id)
            .u32(index)
            .build()
    }

    pub fn quit() -> Vec<u8> {
        Self::new(RecvId::Quit.code()).build()
    }

    pub fn event(group_id: u32, event_id: u32, data: u32) -> Vec<u8> {
        Self::new(RecvId::Event.code())
            .u32(group_id)
            .u32(event_id)
            .u32(data)
            .build()
    }
}

/// Builds a `SimObjectData` record item by item.
pub struct SimObjectDataBuilder {
    kind: RecvId,
    request_id: RequestId,
    object_id: u32,
    define_id: DefinitionId,
    flags: RequestFlags,
    entry_number: u32,
    out_of: u32,
    define_count: Option<u32>,
    items: Vec<u8>,
    count: u32,
}

impl SimObjectDataBuilder {
    pub fn new(request_id: RequestId, define_id: DefinitionId) -> Self {
        Self {
            kind: RecvId::SimObjectData,
            request_id,
            object_id: OBJECT_ID_USER,
            define_id,
            flags: RequestFlags::DEFAULT,
            entry_number: 1,
            out_of: 1,
            define_count: None,
            items: Vec::new(),
            count: 0,
        }
    }

    /// Use the `ByType` or `ClientData` discriminant instead.
    pub fn kind(mut self, kind: RecvId) -> Self {
        self.kind = kind;
        self
    }

    pub fn flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn tagged(self) -> Self {
        let flags = self.flags | RequestFlags::TAGGED;
        self.flags(flags)
    }

    pub fn object_id(mut self, object_id: u32) -> Self {
        self.object_id = object_id;
        self
    }

    /// Override the item count written in the header.
    pub fn define_count(mut self, count: u32) -> Self {
        self.define_count = Some(count);
        self
    }

    /// Append one already-encoded item, prefixed with `index` when tagged.
    pub fn raw_item(mut self, index: Option<u32>, value: &[u8]) -> Self {
        if let Some(index) = index {
            self.items.extend_from_slice(&index.to_le_bytes());
        }
        self.items.extend_from_slice(value);
        self.count += 1;
        self
    }

    pub fn f64(self, v: f64) -> Self {
        self.raw_item(None, &v.to_le_bytes())
    }

    pub fn i32(self, v: i32) -> Self {
        self.raw_item(None, &v.to_le_bytes())
    }

    pub fn string(self, s: &str, width: usize) -> Self {
        let mut raw = Vec::with_capacity(width);
        put_fixed_str(&mut raw, s, width);
        self.raw_item(None, &raw)
    }

    pub fn tagged_f64(self, index: u32, v: f64) -> Self {
        self.raw_item(Some(index), &v.to_le_bytes())
    }

    pub fn tagged_i32(self, index: u32, v: i32) -> Self {
        self.raw_item(Some(index), &v.to_le_bytes())
    }

    pub fn build(self) -> Vec<u8> {
        RecordBuilder::new(self.kind.code())
            .u32(self.request_id.0)
            .u32(self.object_id)
            .u32(self.define_id.0)
            .u32(self.flags.0)
            .u32(self.entry_number)
            .u32(self.out_of)
            .u32(self.define_count.unwrap_or(self.count))
            .bytes(&self.items)
            .build()
    }
}

pub(crate) fn put_fixed_str(buf: &mut Vec<u8>, s: &str, width: usize) {
    let raw = s.as_bytes();
    let len = raw.len().min(width);
    buf.extend_from_slice(&raw[..len]);
    buf.resize(buf.len() + (width - len), 0);
}
