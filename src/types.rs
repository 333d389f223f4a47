//! Core types shared across the client.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Object id the engine uses for the user's own vehicle.
pub const OBJECT_ID_USER: u32 = 0;

/// Group priority used when transmitting client events.
pub const GROUP_PRIORITY_HIGHEST: u32 = 1;

/// Interpret the group id of a transmitted event as a priority.
pub const EVENT_FLAG_GROUPID_IS_PRIORITY: u32 = 0x10;

/// Position of a write in a [`ChangeDict`](crate::ChangeDict).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Revision(pub u64);

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rev({})", self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Revision {
    pub fn next(self) -> Self {
        Revision(self.0 + 1)
    }
}

/// Identifier of a data definition mirrored to the engine.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefinitionId(pub u32);

impl fmt::Debug for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefinitionId({})", self.0)
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation id linking a data request to its responses.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u32);

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-side id of a mapped engine event.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientEventId(pub u32);

impl fmt::Debug for ClientEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientEventId({})", self.0)
    }
}

/// Content hash identifying an ordered list of normalized datum specs (SHA-256).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefinitionKey(pub [u8; 32]);

impl DefinitionKey {
    /// Compute the key from canonical bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        DefinitionKey(hasher.finalize().into())
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(DefinitionKey(arr))
    }
}

impl fmt::Debug for DefinitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefinitionKey({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for DefinitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Wire type of a single datum.
///
/// Codes follow the engine's `DATATYPE` enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int32,
    Int64,
    Float32,
    Float64,
    /// NUL-padded character field of the given byte width.
    FixedString(u32),
    /// An engine type with no fixed width (variable strings, structures).
    Unsupported(u32),
}

impl DataType {
    /// Widths the engine accepts for fixed strings.
    pub const STRING_WIDTHS: [u32; 6] = [8, 32, 64, 128, 256, 260];

    /// Width used for string datums unless another is requested.
    pub const DEFAULT_STRING_WIDTH: u32 = 256;

    /// Decode an engine type code.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => DataType::Int32,
            2 => DataType::Int64,
            3 => DataType::Float32,
            4 => DataType::Float64,
            5..=10 => DataType::FixedString(Self::STRING_WIDTHS[(code - 5) as usize]),
            other => DataType::Unsupported(other),
        }
    }

    /// Engine type code.
    pub fn code(&self) -> u32 {
        match self {
            DataType::Int32 => 1,
            DataType::Int64 => 2,
            DataType::Float32 => 3,
            DataType::Float64 => 4,
            DataType::FixedString(width) => Self::STRING_WIDTHS
                .iter()
                .position(|w| w == width)
                .map(|i| 5 + i as u32)
                // Widths outside the engine table travel as variable strings.
                .unwrap_or(11),
            DataType::Unsupported(code) => *code,
        }
    }

    /// Byte width on the wire, if fixed.
    pub fn width(&self) -> Option<usize> {
        match self {
            DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::Float64 => Some(8),
            DataType::FixedString(width) => Some(*width as usize),
            DataType::Unsupported(_) => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataType::FixedString(_))
    }
}

/// A decoded datum value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SimValue {
    // Untagged deserialization takes the first variant that fits, so the
    // wide types are listed first.
    Int64(i64),
    Int32(i32),
    Float64(f64),
    Float32(f32),
    String(String),
}

impl SimValue {
    /// Numeric view of the value; strings yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SimValue::Int32(v) => Some(*v as f64),
            SimValue::Int64(v) => Some(*v as f64),
            SimValue::Float32(v) => Some(*v as f64),
            SimValue::Float64(v) => Some(*v),
            SimValue::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SimValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimValue::Int32(v) => write!(f, "{}", v),
            SimValue::Int64(v) => write!(f, "{}", v),
            SimValue::Float32(v) => write!(f, "{}", v),
            SimValue::Float64(v) => write!(f, "{}", v),
            SimValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for SimValue {
    fn from(v: f64) -> Self {
        SimValue::Float64(v)
    }
}

impl From<f32> for SimValue {
    fn from(v: f32) -> Self {
        SimValue::Float32(v)
    }
}

impl From<i32> for SimValue {
    fn from(v: i32) -> Self {
        SimValue::Int32(v)
    }
}

impl From<i64> for SimValue {
    fn from(v: i64) -> Self {
        SimValue::Int64(v)
    }
}

impl From<&str> for SimValue {
    fn from(v: &str) -> Self {
        SimValue::String(v.to_string())
    }
}

/// How often the engine sends data for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Period {
    Never,
    Once,
    VisualFrame,
    SimFrame,
    #[default]
    Second,
}

impl Period {
    pub fn code(&self) -> u32 {
        match self {
            Period::Never => 0,
            Period::Once => 1,
            Period::VisualFrame => 2,
            Period::SimFrame => 3,
            Period::Second => 4,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Period::Never),
            1 => Some(Period::Once),
            2 => Some(Period::VisualFrame),
            3 => Some(Period::SimFrame),
            4 => Some(Period::Second),
            _ => None,
        }
    }
}

/// Flags attached to a data request, mirrored in `SimObjectData` records.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct RequestFlags(pub u32);

impl RequestFlags {
    pub const DEFAULT: RequestFlags = RequestFlags(0);
    /// Only send values that changed by more than their epsilon.
    pub const CHANGED: RequestFlags = RequestFlags(0x1);
    /// Send items prefixed with their datum index.
    pub const TAGGED: RequestFlags = RequestFlags(0x2);

    pub fn contains(&self, other: RequestFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_tagged(&self) -> bool {
        self.contains(Self::TAGGED)
    }

    pub fn is_changed_only(&self) -> bool {
        self.contains(Self::CHANGED)
    }
}

impl std::ops::BitOr for RequestFlags {
    type Output = RequestFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        RequestFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for RequestFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RequestFlags(changed={}, tagged={})",
            self.is_changed_only(),
            self.is_tagged()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_key_roundtrip() {
        let key = DefinitionKey::from_bytes(b"[\"ALT\"]");
        let parsed = DefinitionKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn test_data_type_codes() {
        assert_eq!(DataType::from_code(4), DataType::Float64);
        assert_eq!(DataType::from_code(9), DataType::FixedString(256));
        assert_eq!(DataType::FixedString(260).code(), 10);
        assert_eq!(DataType::from_code(11), DataType::Unsupported(11));
        assert_eq!(DataType::Unsupported(15).width(), None);
        assert_eq!(DataType::Int64.width(), Some(8));

        for width in DataType::STRING_WIDTHS {
            let data_type = DataType::FixedString(width);
            assert_eq!(DataType::from_code(data_type.code()), data_type);
        }
    }

    #[test]
    fn test_sim_value_from_json_keeps_precision() {
        let value: SimValue = serde_json::from_str("29.92").unwrap();
        assert_eq!(value, SimValue::Float64(29.92));

        let value: SimValue = serde_json::from_str("5000000000").unwrap();
        assert_eq!(value, SimValue::Int64(5_000_000_000));

        let value: SimValue = serde_json::from_str("\"N172SP\"").unwrap();
        assert_eq!(value, SimValue::String("N172SP".into()));
    }

    #[test]
    fn test_request_flags() {
        let flags = RequestFlags::CHANGED | RequestFlags::TAGGED;
        assert!(flags.is_tagged());
        assert!(flags.is_changed_only());
        assert!(!RequestFlags::DEFAULT.is_tagged());
    }

    #[test]
    fn test_revision_next() {
        assert_eq!(Revision(5).next(), Revision(6));
    }
}
