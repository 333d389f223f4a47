//! Received record layouts.
//!
//! Layout:
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬────────────────────────┐
//! │ size (u32)   │ version (u32)│ kind (u32)   │ variant fields ...     │
//! └──────────────┴──────────────┴──────────────┴────────────────────────┘
//!   offset 0       offset 4       offset 8       offset 12
//! ```
//!
//! The kind discriminant selects one fixed layout from [`RecvId`]. Record
//! kinds this client doesn't know decode to [`Recv::Base`]: only the
//! envelope is available for them.

use super::reader::ByteReader;
use crate::error::DecodeError;
use crate::types::{DefinitionId, RequestFlags, RequestId};

/// Envelope size in bytes.
pub const ENVELOPE_SIZE: usize = 12;

/// Offset of the first data item in a `SimObjectData` record.
pub const SIMOBJECT_DATA_OFFSET: usize = ENVELOPE_SIZE + 7 * 4;

/// Width of the application name in an `Open` record.
pub const APPLICATION_NAME_WIDTH: usize = 256;

/// Width of file names and system state strings.
pub const MAX_PATH: usize = 260;

/// Leading fields of every record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub size: u32,
    pub version: u32,
    pub kind: u32,
}

impl Envelope {
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::new(buf);
        Ok(Self {
            size: reader.u32()?,
            version: reader.u32()?,
            kind: reader.u32()?,
        })
    }
}

/// Record kinds, keyed by envelope discriminant.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecvId {
    Null = 0,
    Exception = 1,
    Open = 2,
    Quit = 3,
    Event = 4,
    EventObjectAddRemove = 5,
    EventFilename = 6,
    EventFrame = 7,
    SimObjectData = 8,
    SimObjectDataByType = 9,
    WeatherObservation = 10,
    CloudState = 11,
    AssignedObjectId = 12,
    ReservedKey = 13,
    CustomAction = 14,
    SystemState = 15,
    ClientData = 16,
    EventWeatherMode = 17,
    AirportList = 18,
    VorList = 19,
    NdbList = 20,
    WaypointList = 21,
    EventMultiplayerServerStarted = 22,
    EventMultiplayerClientStarted = 23,
    EventMultiplayerSessionEnded = 24,
    EventRaceEnd = 25,
    EventRaceLap = 26,
}

impl RecvId {
    const TABLE: [RecvId; 27] = [
        RecvId::Null,
        RecvId::Exception,
        RecvId::Open,
        RecvId::Quit,
        RecvId::Event,
        RecvId::EventObjectAddRemove,
        RecvId::EventFilename,
        RecvId::EventFrame,
        RecvId::SimObjectData,
        RecvId::SimObjectDataByType,
        RecvId::WeatherObservation,
        RecvId::CloudState,
        RecvId::AssignedObjectId,
        RecvId::ReservedKey,
        RecvId::CustomAction,
        RecvId::SystemState,
        RecvId::ClientData,
        RecvId::EventWeatherMode,
        RecvId::AirportList,
        RecvId::VorList,
        RecvId::NdbList,
        RecvId::WaypointList,
        RecvId::EventMultiplayerServerStarted,
        RecvId::EventMultiplayerClientStarted,
        RecvId::EventMultiplayerSessionEnded,
        RecvId::EventRaceEnd,
        RecvId::EventRaceLap,
    ];

    pub fn from_u32(v: u32) -> Option<Self> {
        Self::TABLE.get(v as usize).copied()
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// The record family this kind belongs to, e.g. every event subtype
    /// belongs to `Event`.
    pub fn family(self) -> RecvId {
        match self {
            RecvId::EventObjectAddRemove
            | RecvId::EventFilename
            | RecvId::EventFrame
            | RecvId::CustomAction
            | RecvId::EventWeatherMode
            | RecvId::EventMultiplayerServerStarted
            | RecvId::EventMultiplayerClientStarted
            | RecvId::EventMultiplayerSessionEnded
            | RecvId::EventRaceEnd
            | RecvId::EventRaceLap => RecvId::Event,
            RecvId::SimObjectDataByType | RecvId::ClientData => RecvId::SimObjectData,
            other => other,
        }
    }

    /// Whether a record of this kind can be viewed as `other`.
    pub fn is_a(self, other: RecvId) -> bool {
        self == other || self.family() == other
    }
}

/// Engine-reported failure of an earlier directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionRecord {
    pub exception: u32,
    /// Packet id of the directive that failed.
    pub send_id: u32,
    /// Index of the offending parameter.
    pub index: u32,
}

/// Handshake record sent once after opening.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenRecord {
    pub application_name: String,
    pub application_version: (u32, u32),
    pub application_build: (u32, u32),
    pub protocol_version: (u32, u32),
    pub protocol_build: (u32, u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub group_id: u32,
    pub event_id: u32,
    pub data: u32,
}

/// Header and data region of a `SimObjectData` record (also `ByType` and
/// `ClientData`, which share the layout).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimObjectData<'a> {
    pub request_id: RequestId,
    pub object_id: u32,
    pub define_id: DefinitionId,
    pub flags: RequestFlags,
    /// 1-based position when several objects answer one request.
    pub entry_number: u32,
    pub out_of: u32,
    /// Number of data items, not bytes.
    pub define_count: u32,
    /// Everything from the first data item to the end of the buffer.
    pub data: &'a [u8],
}

#[derive(Clone, Debug, PartialEq)]
pub struct SystemStateRecord {
    pub request_id: RequestId,
    pub integer: u32,
    pub float: f32,
    pub string: String,
}

/// Facility list header; entries are left as raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FacilitiesList<'a> {
    pub request_id: RequestId,
    pub array_size: u32,
    pub entry_number: u32,
    pub out_of: u32,
    pub entries: &'a [u8],
}

/// Decoded variant payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Recv<'a> {
    /// Unknown discriminant: envelope only.
    Base,
    Null,
    Exception(ExceptionRecord),
    Open(OpenRecord),
    Quit,
    /// Plain events and the field-less event subtypes.
    Event(EventRecord),
    EventObjectAddRemove {
        event: EventRecord,
        object_type: u32,
    },
    EventFilename {
        event: EventRecord,
        file_name: String,
        flags: u32,
    },
    EventFrame {
        event: EventRecord,
        frame_rate: f32,
        sim_speed: f32,
    },
    /// Race end (index = racer number) or lap (index = lap index).
    EventRace {
        event: EventRecord,
        index: u32,
        result: &'a [u8],
    },
    CustomAction {
        event: EventRecord,
        instance_id: [u8; 16],
        wait_for_completion: u32,
        payload: &'a [u8],
    },
    SimObjectData(SimObjectData<'a>),
    WeatherObservation {
        request_id: RequestId,
        metar: String,
    },
    CloudState {
        request_id: RequestId,
        array_size: u32,
        data: &'a [u8],
    },
    AssignedObjectId {
        request_id: RequestId,
        object_id: u32,
    },
    ReservedKey {
        choice_reserved: String,
        reserved_key: String,
    },
    SystemState(SystemStateRecord),
    FacilitiesList(FacilitiesList<'a>),
}

/// A received record: envelope plus its variant view of the buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Message<'a> {
    pub envelope: Envelope,
    /// `None` when the discriminant is unknown.
    pub kind: Option<RecvId>,
    pub body: Recv<'a>,
}

impl<'a> Message<'a> {
    /// Decode a raw buffer without copying its variable-length regions.
    pub fn decode(buf: &'a [u8]) -> Result<Self, DecodeError> {
        let envelope = Envelope::decode(buf)?;
        let kind = RecvId::from_u32(envelope.kind);
        let body = match kind {
            Some(kind) => decode_body(kind, &mut ByteReader::at(buf, ENVELOPE_SIZE)?)?,
            None => Recv::Base,
        };
        Ok(Self {
            envelope,
            kind,
            body,
        })
    }

    /// Whether this message can be handled as a record of `kind`.
    pub fn is_a(&self, kind: RecvId) -> bool {
        self.kind.map_or(false, |k| k.is_a(kind))
    }

    pub fn kind_name(&self) -> String {
        match self.kind {
            Some(kind) => format!("{:?}", kind),
            None => format!("Unknown({})", self.envelope.kind),
        }
    }
}

fn decode_event(r: &mut ByteReader<'_>) -> Result<EventRecord, DecodeError> {
    Ok(EventRecord {
        group_id: r.u32()?,
        event_id: r.u32()?,
        data: r.u32()?,
    })
}

fn decode_body<'a>(kind: RecvId, r: &mut ByteReader<'a>) -> Result<Recv<'a>, DecodeError> {
    let body = match kind {
        RecvId::Null => Recv::Null,
        RecvId::Quit => Recv::Quit,
        RecvId::Exception => Recv::Exception(ExceptionRecord {
            exception: r.u32()?,
            send_id: r.u32()?,
            index: r.u32()?,
        }),
        RecvId::Open => {
            let application_name = r.fixed_str(APPLICATION_NAME_WIDTH)?;
            let record = OpenRecord {
                application_name,
                application_version: (r.u32()?, r.u32()?),
                application_build: (r.u32()?, r.u32()?),
                protocol_version: (r.u32()?, r.u32()?),
                protocol_build: (r.u32()?, r.u32()?),
            };
            // Two reserved fields.
            r.bytes(8)?;
            Recv::Open(record)
        }
        RecvId::Event
        | RecvId::EventWeatherMode
        | RecvId::EventMultiplayerServerStarted
        | RecvId::EventMultiplayerClientStarted
        | RecvId::EventMultiplayerSessionEnded => Recv::Event(decode_event(r)?),
        RecvId::EventObjectAddRemove => Recv::EventObjectAddRemove {
            event: decode_event(r)?,
            object_type: r.u32()?,
        },
        RecvId::EventFilename => Recv::EventFilename {
            event: decode_event(r)?,
            file_name: r.fixed_str(MAX_PATH)?,
            flags: r.u32()?,
        },
        RecvId::EventFrame => Recv::EventFrame {
            event: decode_event(r)?,
            frame_rate: r.f32()?,
            sim_speed: r.f32()?,
        },
        RecvId::EventRaceEnd | RecvId::EventRaceLap => Recv::EventRace {
            event: decode_event(r)?,
            index: r.u32()?,
            result: r.rest(),
        },
        RecvId::CustomAction => {
            let event = decode_event(r)?;
            let mut instance_id = [0u8; 16];
            instance_id.copy_from_slice(r.bytes(16)?);
            Recv::CustomAction {
                event,
                instance_id,
                wait_for_completion: r.u32()?,
                payload: r.rest(),
            }
        }
        RecvId::SimObjectData | RecvId::SimObjectDataByType | RecvId::ClientData => {
            Recv::SimObjectData(SimObjectData {
                request_id: RequestId(r.u32()?),
                object_id: r.u32()?,
                define_id: DefinitionId(r.u32()?),
                flags: RequestFlags(r.u32()?),
                entry_number: r.u32()?,
                out_of: r.u32()?,
                define_count: r.u32()?,
                data: r.rest(),
            })
        }
        RecvId::WeatherObservation => {
            let request_id = RequestId(r.u32()?);
            let metar = super::reader::trim_nul(r.rest());
            Recv::WeatherObservation { request_id, metar }
        }
        RecvId::CloudState => Recv::CloudState {
            request_id: RequestId(r.u32()?),
            array_size: r.u32()?,
            data: r.rest(),
        },
        RecvId::AssignedObjectId => Recv::AssignedObjectId {
            request_id: RequestId(r.u32()?),
            object_id: r.u32()?,
        },
        RecvId::ReservedKey => Recv::ReservedKey {
            choice_reserved: r.fixed_str(30)?,
            reserved_key: r.fixed_str(50)?,
        },
        RecvId::SystemState => Recv::SystemState(SystemStateRecord {
            request_id: RequestId(r.u32()?),
            integer: r.u32()?,
            float: r.f32()?,
            string: r.fixed_str(MAX_PATH)?,
        }),
        RecvId::AirportList | RecvId::VorList | RecvId::NdbList | RecvId::WaypointList => {
            Recv::FacilitiesList(FacilitiesList {
                request_id: RequestId(r.u32()?),
                array_size: r.u32()?,
                entry_number: r.u32()?,
                out_of: r.u32()?,
                entries: r.rest(),
            })
        }
    };
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::builder::RecordBuilder;

    #[test]
    fn test_unknown_discriminant_is_base_only() {
        let buf = RecordBuilder::new(999).u32(1).u32(2).build();
        let msg = Message::decode(&buf).unwrap();
        assert_eq!(msg.kind, None);
        assert_eq!(msg.body, Recv::Base);
        assert_eq!(msg.envelope.kind, 999);
        assert_eq!(msg.envelope.size as usize, buf.len());
    }

    #[test]
    fn test_short_envelope_is_error() {
        let err = Message::decode(&[0u8; 8]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn test_truncated_variant_is_error() {
        // Exception needs three fields, only one supplied.
        let buf = RecordBuilder::new(RecvId::Exception.code()).u32(29).build();
        assert!(matches!(
            Message::decode(&buf),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_exception() {
        let buf = RecordBuilder::exception(29, 4, 1);
        let msg = Message::decode(&buf).unwrap();
        assert_eq!(
            msg.body,
            Recv::Exception(ExceptionRecord {
                exception: 29,
                send_id: 4,
                index: 1
            })
        );
    }

    #[test]
    fn test_decode_open() {
        let buf = RecordBuilder::open("Flight Simulator", (11, 0), (282174, 999));
        let msg = Message::decode(&buf).unwrap();
        match msg.body {
            Recv::Open(open) => {
                assert_eq!(open.application_name, "Flight Simulator");
                assert_eq!(open.application_version, (11, 0));
                assert_eq!(open.application_build, (282174, 999));
            }
            other => panic!("Expected Open, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_event_frame() {
        let buf = RecordBuilder::new(RecvId::EventFrame.code())
            .u32(1)
            .u32(7)
            .u32(0)
            .f32(59.5)
            .f32(1.0)
            .build();
        let msg = Message::decode(&buf).unwrap();
        assert!(msg.is_a(RecvId::Event));
        assert!(msg.is_a(RecvId::EventFrame));
        assert!(!msg.is_a(RecvId::SimObjectData));
        match msg.body {
            Recv::EventFrame {
                event, frame_rate, ..
            } => {
                assert_eq!(event.event_id, 7);
                assert_eq!(frame_rate, 59.5);
            }
            other => panic!("Expected EventFrame, got {:?}", other),
        }
    }

    #[test]
    fn test_simobject_data_header_and_region() {
        let buf = RecordBuilder::new(RecvId::SimObjectDataByType.code())
            .u32(3) // request
            .u32(0) // object
            .u32(1) // define
            .u32(2) // flags: tagged
            .u32(1)
            .u32(1)
            .u32(1)
            .u32(0)
            .f64(12.0)
            .build();
        let msg = Message::decode(&buf).unwrap();
        assert!(msg.is_a(RecvId::SimObjectData));
        match msg.body {
            Recv::SimObjectData(data) => {
                assert_eq!(data.request_id, RequestId(3));
                assert_eq!(data.define_id, DefinitionId(1));
                assert!(data.flags.is_tagged());
                assert_eq!(data.define_count, 1);
                assert_eq!(data.data.len(), 12);
            }
            other => panic!("Expected SimObjectData, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_system_state() {
        let buf = RecordBuilder::new(RecvId::SystemState.code())
            .u32(5)
            .u32(1)
            .f32(0.0)
            .fixed_str("flights/demo.flt", MAX_PATH)
            .build();
        let msg = Message::decode(&buf).unwrap();
        match msg.body {
            Recv::SystemState(state) => {
                assert_eq!(state.request_id, RequestId(5));
                assert_eq!(state.string, "flights/demo.flt");
            }
            other => panic!("Expected SystemState, got {:?}", other),
        }
    }

    #[test]
    fn test_family_matching() {
        assert!(RecvId::ClientData.is_a(RecvId::SimObjectData));
        assert!(RecvId::EventRaceLap.is_a(RecvId::Event));
        assert!(!RecvId::Open.is_a(RecvId::Event));
        assert!(!RecvId::SimObjectData.is_a(RecvId::ClientData));
    }
}
