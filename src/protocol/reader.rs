//! Bounds-checked little-endian cursor over a received buffer.

use crate::error::DecodeError;

/// Forward-only reader; every read checks the remaining length first.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Reader positioned at `offset`.
    pub fn at(buf: &'a [u8], offset: usize) -> Result<Self, DecodeError> {
        if offset > buf.len() {
            return Err(DecodeError::Truncated {
                needed: offset,
                available: buf.len(),
            });
        }
        Ok(Self { buf, pos: offset })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fail unless `len` more bytes are available.
    pub fn require(&self, len: usize) -> Result<(), DecodeError> {
        let needed = self.pos.saturating_add(len);
        if needed > self.buf.len() {
            return Err(DecodeError::Truncated {
                needed,
                available: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.require(len)?;
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    /// Fixed-width character field, cut at the first NUL.
    pub fn fixed_str(&mut self, width: usize) -> Result<String, DecodeError> {
        Ok(trim_nul(self.bytes(width)?))
    }

    /// Everything after the cursor.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }
}

/// Decode a NUL-padded character field.
pub fn trim_nul(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.extend_from_slice(&(-2i64).to_le_bytes());
        buf.extend_from_slice(&1.5f64.to_le_bytes());

        let mut reader = ByteReader::new(&buf);
        assert_eq!(reader.u32().unwrap(), 7);
        assert_eq!(reader.i64().unwrap(), -2);
        assert_eq!(reader.f64().unwrap(), 1.5);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_read_past_end_is_error() {
        let buf = [1u8, 2, 3];
        let mut reader = ByteReader::new(&buf);
        assert_eq!(
            reader.u32(),
            Err(DecodeError::Truncated {
                needed: 4,
                available: 3
            })
        );
        // Failed read does not advance.
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_fixed_str_trims_padding() {
        let mut raw = b"Cessna".to_vec();
        raw.resize(32, 0);
        let mut reader = ByteReader::new(&raw);
        assert_eq!(reader.fixed_str(32).unwrap(), "Cessna");
    }
}
