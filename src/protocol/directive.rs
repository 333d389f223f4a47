//! Outgoing directives.
//!
//! Every call into the engine is one typed [`Directive`], encoded as
//! `[size u32][version u32][directive id u32]` followed by its fields.
//! Names travel as NUL-padded 256-byte fields.

use super::reader::ByteReader;
use super::recv::ENVELOPE_SIZE;
use super::PROTOCOL_VERSION;
use crate::error::{DecodeError, Result, SimError};
use crate::types::{ClientEventId, DataType, DefinitionId, Period, RequestFlags, RequestId};

/// Width of name fields in directives.
pub const NAME_WIDTH: usize = 256;

/// Directive discriminants.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirectiveId {
    MapClientEventToSimEvent = 0x04,
    TransmitClientEvent = 0x05,
    AddToDataDefinition = 0x0C,
    ClearDataDefinition = 0x0D,
    RequestDataOnSimObject = 0x0E,
    SetDataOnSimObject = 0x10,
}

impl DirectiveId {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0x04 => Some(DirectiveId::MapClientEventToSimEvent),
            0x05 => Some(DirectiveId::TransmitClientEvent),
            0x0C => Some(DirectiveId::AddToDataDefinition),
            0x0D => Some(DirectiveId::ClearDataDefinition),
            0x0E => Some(DirectiveId::RequestDataOnSimObject),
            0x10 => Some(DirectiveId::SetDataOnSimObject),
            _ => None,
        }
    }
}

/// A typed call into the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    /// Append one datum to a data definition; `datum_id` ties tagged items back to it.
    AddToDataDefinition {
        define_id: DefinitionId,
        datum_name: String,
        units_name: String,
        data_type: DataType,
        epsilon: f32,
        datum_id: u32,
    },
    ClearDataDefinition {
        define_id: DefinitionId,
    },
    RequestDataOnSimObject {
        request_id: RequestId,
        define_id: DefinitionId,
        object_id: u32,
        period: Period,
        flags: RequestFlags,
        /// Periods to skip before the first send.
        origin: u32,
        /// Periods between sends.
        interval: u32,
        /// Number of sends before stopping, 0 = forever.
        limit: u32,
    },
    SetDataOnSimObject {
        define_id: DefinitionId,
        object_id: u32,
        flags: u32,
        /// 0 is read as 1 by the engine.
        array_count: u32,
        unit_size: u32,
        data: Vec<u8>,
    },
    MapClientEventToSimEvent {
        event_id: ClientEventId,
        event_name: String,
    },
    TransmitClientEvent {
        object_id: u32,
        event_id: ClientEventId,
        data: u32,
        group_id: u32,
        flags: u32,
    },
}

impl Directive {
    pub fn id(&self) -> DirectiveId {
        match self {
            Directive::AddToDataDefinition { .. } => DirectiveId::AddToDataDefinition,
            Directive::ClearDataDefinition { .. } => DirectiveId::ClearDataDefinition,
            Directive::RequestDataOnSimObject { .. } => DirectiveId::RequestDataOnSimObject,
            Directive::SetDataOnSimObject { .. } => DirectiveId::SetDataOnSimObject,
            Directive::MapClientEventToSimEvent { .. } => DirectiveId::MapClientEventToSimEvent,
            Directive::TransmitClientEvent { .. } => DirectiveId::TransmitClientEvent,
        }
    }

    /// Encode to the wire form handed to the transport.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        put_u32(&mut buf, 0);
        put_u32(&mut buf, PROTOCOL_VERSION);
        put_u32(&mut buf, self.id() as u32);

        match self {
            Directive::AddToDataDefinition {
                define_id,
                datum_name,
                units_name,
                data_type,
                epsilon,
                datum_id,
            } => {
                put_u32(&mut buf, define_id.0);
                put_name(&mut buf, datum_name)?;
                put_name(&mut buf, units_name)?;
                put_u32(&mut buf, data_type.code());
                buf.extend_from_slice(&epsilon.to_le_bytes());
                put_u32(&mut buf, *datum_id);
            }
            Directive::ClearDataDefinition { define_id } => {
                put_u32(&mut buf, define_id.0);
            }
            Directive::RequestDataOnSimObject {
                request_id,
                define_id,
                object_id,
                period,
                flags,
                origin,
                interval,
                limit,
            } => {
                put_u32(&mut buf, request_id.0);
                put_u32(&mut buf, define_id.0);
                put_u32(&mut buf, *object_id);
                put_u32(&mut buf, period.code());
                put_u32(&mut buf, flags.0);
                put_u32(&mut buf, *origin);
                put_u32(&mut buf, *interval);
                put_u32(&mut buf, *limit);
            }
            Directive::SetDataOnSimObject {
                define_id,
                object_id,
                flags,
                array_count,
                unit_size,
                data,
            } => {
                put_u32(&mut buf, define_id.0);
                put_u32(&mut buf, *object_id);
                put_u32(&mut buf, *flags);
                put_u32(&mut buf, *array_count);
                put_u32(&mut buf, *unit_size);
                buf.extend_from_slice(data);
            }
            Directive::MapClientEventToSimEvent {
                event_id,
                event_name,
            } => {
                put_u32(&mut buf, event_id.0);
                put_name(&mut buf, event_name)?;
            }
            Directive::TransmitClientEvent {
                object_id,
                event_id,
                data,
                group_id,
                flags,
            } => {
                put_u32(&mut buf, *object_id);
                put_u32(&mut buf, event_id.0);
                put_u32(&mut buf, *data);
                put_u32(&mut buf, *group_id);
                put_u32(&mut buf, *flags);
            }
        }

        let size = buf.len() as u32;
        buf[0..4].copy_from_slice(&size.to_le_bytes());
        Ok(buf)
    }

    /// Decode a directive previously produced by [`Directive::encode`].
    pub fn decode(buf: &[u8]) -> std::result::Result<Self, DecodeError> {
        let mut r = ByteReader::new(buf);
        let _size = r.u32()?;
        let _version = r.u32()?;
        let raw_id = r.u32()?;
        debug_assert_eq!(r.position(), ENVELOPE_SIZE);
        let id = DirectiveId::from_u32(raw_id).ok_or(DecodeError::InvalidDirective(raw_id))?;

        let directive = match id {
            DirectiveId::AddToDataDefinition => Directive::AddToDataDefinition {
                define_id: DefinitionId(r.u32()?),
                datum_name: r.fixed_str(NAME_WIDTH)?,
                units_name: r.fixed_str(NAME_WIDTH)?,
                data_type: DataType::from_code(r.u32()?),
                epsilon: r.f32()?,
                datum_id: r.u32()?,
            },
            DirectiveId::ClearDataDefinition => Directive::ClearDataDefinition {
                define_id: DefinitionId(r.u32()?),
            },
            DirectiveId::RequestDataOnSimObject => {
                let request_id = RequestId(r.u32()?);
                let define_id = DefinitionId(r.u32()?);
                let object_id = r.u32()?;
                let raw_period = r.u32()?;
                let period = Period::from_code(raw_period).ok_or_else(|| {
                    DecodeError::InvalidField(format!("period {}", raw_period))
                })?;
                Directive::RequestDataOnSimObject {
                    request_id,
                    define_id,
                    object_id,
                    period,
                    flags: RequestFlags(r.u32()?),
                    origin: r.u32()?,
                    interval: r.u32()?,
                    limit: r.u32()?,
                }
            }
            DirectiveId::SetDataOnSimObject => Directive::SetDataOnSimObject {
                define_id: DefinitionId(r.u32()?),
                object_id: r.u32()?,
                flags: r.u32()?,
                array_count: r.u32()?,
                unit_size: r.u32()?,
                data: r.rest().to_vec(),
            },
            DirectiveId::MapClientEventToSimEvent => Directive::MapClientEventToSimEvent {
                event_id: ClientEventId(r.u32()?),
                event_name: r.fixed_str(NAME_WIDTH)?,
            },
            DirectiveId::TransmitClientEvent => Directive::TransmitClientEvent {
                object_id: r.u32()?,
                event_id: ClientEventId(r.u32()?),
                data: r.u32()?,
                group_id: r.u32()?,
                flags: r.u32()?,
            },
        };
        Ok(directive)
    }
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_name(buf: &mut Vec<u8>, name: &str) -> Result<()> {
    // One byte is kept for the terminating NUL.
    if name.len() >= NAME_WIDTH {
        return Err(SimError::InvalidArgument(format!(
            "name longer than {} bytes: {}",
            NAME_WIDTH - 1,
            name
        )));
    }
    super::builder::put_fixed_str(buf, name, NAME_WIDTH);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_definition_wire_form() {
        let directive = Directive::AddToDataDefinition {
            define_id: DefinitionId(3),
            datum_name: "INDICATED ALTITUDE".into(),
            units_name: "feet".into(),
            data_type: DataType::Float64,
            epsilon: 0.5,
            datum_id: 0,
        };
        let buf = directive.encode().unwrap();
        assert_eq!(buf.len(), 12 + 4 + 2 * NAME_WIDTH + 12);
        assert_eq!(u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize, buf.len());
        assert_eq!(
            u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            DirectiveId::AddToDataDefinition as u32
        );
        assert_eq!(Directive::decode(&buf).unwrap(), directive);
    }

    #[test]
    fn test_request_decode() {
        let directive = Directive::RequestDataOnSimObject {
            request_id: RequestId(1),
            define_id: DefinitionId(0),
            object_id: 0,
            period: Period::SimFrame,
            flags: RequestFlags::CHANGED | RequestFlags::TAGGED,
            origin: 0,
            interval: 10,
            limit: 0,
        };
        let buf = directive.encode().unwrap();
        assert_eq!(Directive::decode(&buf).unwrap(), directive);
    }

    #[test]
    fn test_overlong_name_is_rejected() {
        let directive = Directive::MapClientEventToSimEvent {
            event_id: ClientEventId(0),
            event_name: "X".repeat(NAME_WIDTH),
        };
        assert!(matches!(
            directive.encode(),
            Err(SimError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_directive_id() {
        let mut buf = Vec::new();
        put_u32(&mut buf, 12);
        put_u32(&mut buf, PROTOCOL_VERSION);
        put_u32(&mut buf, 0xFF);
        assert_eq!(
            Directive::decode(&buf),
            Err(DecodeError::InvalidDirective(0xFF))
        );
    }
}
