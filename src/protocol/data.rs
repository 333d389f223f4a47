//! Schema-driven data items carried by `SimObjectData` records.
//!
//! Items are either untagged (positional, back to back) or tagged (each
//! prefixed with a `u32` index into the definition). The definition's datum
//! types decide every item's width, so a buffer can only be interpreted
//! together with the definition it was requested for.

use super::builder::put_fixed_str;
use super::reader::ByteReader;
use crate::error::{DecodeError, Result, SimError};
use crate::types::{DataType, SimValue};

/// Width of an item tag.
const TAG_SIZE: usize = 4;

/// Read a single value of `data_type`.
pub fn decode_value(reader: &mut ByteReader<'_>, data_type: DataType) -> std::result::Result<SimValue, DecodeError> {
    let value = match data_type {
        DataType::Int32 => SimValue::Int32(reader.i32()?),
        DataType::Int64 => SimValue::Int64(reader.i64()?),
        DataType::Float32 => SimValue::Float32(reader.f32()?),
        DataType::Float64 => SimValue::Float64(reader.f64()?),
        DataType::FixedString(width) => SimValue::String(reader.fixed_str(width as usize)?),
        DataType::Unsupported(code) => return Err(DecodeError::UnsizedDataType(code)),
    };
    Ok(value)
}

/// Decode `define_count` items from a data region.
///
/// Returns `(datum index, value)` pairs in arrival order. Tagged indices may
/// repeat or arrive out of order. Nothing is returned unless every item
/// decodes; bytes after the last item are ignored.
pub fn decode_items(
    data: &[u8],
    define_count: u32,
    tagged: bool,
    types: &[DataType],
) -> std::result::Result<Vec<(usize, SimValue)>, DecodeError> {
    let count = define_count as usize;

    // Reject impossible counts before allocating for them.
    if tagged {
        let needed = count.saturating_mul(TAG_SIZE);
        if needed > data.len() {
            return Err(DecodeError::Truncated {
                needed,
                available: data.len(),
            });
        }
    } else if count > types.len() {
        return Err(DecodeError::UnknownDatumIndex {
            index: types.len() as u32,
            count: types.len(),
        });
    }

    let mut reader = ByteReader::new(data);
    let mut items = Vec::with_capacity(count);
    for position in 0..count {
        let index = if tagged {
            let tag = reader.u32()?;
            if tag as usize >= types.len() {
                return Err(DecodeError::UnknownDatumIndex {
                    index: tag,
                    count: types.len(),
                });
            }
            tag as usize
        } else {
            position
        };

        let data_type = types[index];
        let width = data_type
            .width()
            .ok_or(DecodeError::UnsizedDataType(data_type.code()))?;
        reader.require(width)?;
        items.push((index, decode_value(&mut reader, data_type)?));
    }

    Ok(items)
}

/// Append `value` encoded as `data_type`.
///
/// Numeric values convert between numeric types and must fit the target's
/// range; strings only fit string fields and are truncated to the field width.
pub fn encode_value(value: &SimValue, data_type: DataType, out: &mut Vec<u8>) -> Result<()> {
    match (data_type, value) {
        (DataType::FixedString(width), SimValue::String(s)) => {
            put_fixed_str(out, s, width as usize);
        }
        (DataType::FixedString(width), other) => {
            put_fixed_str(out, &other.to_string(), width as usize);
        }
        (DataType::Unsupported(code), _) => {
            return Err(SimError::Decode(DecodeError::UnsizedDataType(code)));
        }
        (numeric, value) => {
            let v = value.as_f64().ok_or_else(|| {
                SimError::InvalidArgument(format!(
                    "cannot encode {:?} as {:?}",
                    value, numeric
                ))
            })?;
            let out_of_range = || {
                SimError::InvalidArgument(format!("{} is out of range for {:?}", value, numeric))
            };
            match (numeric, value) {
                (DataType::Int32, SimValue::Int32(i)) => out.extend_from_slice(&i.to_le_bytes()),
                (DataType::Int32, SimValue::Int64(i)) => {
                    let i = i32::try_from(*i).map_err(|_| out_of_range())?;
                    out.extend_from_slice(&i.to_le_bytes());
                }
                (DataType::Int32, _) => {
                    if !(i32::MIN as f64..=i32::MAX as f64).contains(&v) {
                        return Err(out_of_range());
                    }
                    out.extend_from_slice(&(v as i32).to_le_bytes());
                }
                (DataType::Int64, SimValue::Int64(i)) => out.extend_from_slice(&i.to_le_bytes()),
                (DataType::Int64, SimValue::Int32(i)) => {
                    out.extend_from_slice(&i64::from(*i).to_le_bytes())
                }
                (DataType::Int64, _) => {
                    // i64::MAX as f64 rounds up to 2^63, which does not fit.
                    if !(i64::MIN as f64..i64::MAX as f64).contains(&v) {
                        return Err(out_of_range());
                    }
                    out.extend_from_slice(&(v as i64).to_le_bytes());
                }
                (DataType::Float32, _) => {
                    if v.is_finite() && v.abs() > f32::MAX as f64 {
                        return Err(out_of_range());
                    }
                    out.extend_from_slice(&(v as f32).to_le_bytes());
                }
                _ => out.extend_from_slice(&v.to_le_bytes()),
            }
        }
    }
    Ok(())
}
