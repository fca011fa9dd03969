//! Binary codec primitives: cursor-tracked byte reader/writer and 4-byte
//! little-endian length framing.

use crate::utils::error::{FabricError, Result};

/// Reader over a borrowed byte slice. Every read advances the cursor and
/// fails with `BufferOverrun` past the end.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_raw(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(FabricError::BufferOverrun(format!(
                "requested {} bytes at offset {} with {} remaining",
                n,
                self.pos,
                self.buf.len() - self.pos
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_raw(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let b = self.read_raw(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let b = self.read_raw(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let b = self.read_raw(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let b = self.read_raw(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        let b = self.read_raw(8)?;
        Ok(u64::from_le_bytes(b.try_into().expect("8-byte slice")))
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        let b = self.read_raw(8)?;
        Ok(u64::from_be_bytes(b.try_into().expect("8-byte slice")))
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16_le(&mut self) -> Result<i16> {
        Ok(self.read_u16_le()? as i16)
    }

    pub fn read_i16_be(&mut self) -> Result<i16> {
        Ok(self.read_u16_be()? as i16)
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(self.read_u32_le()? as i32)
    }

    pub fn read_i32_be(&mut self) -> Result<i32> {
        Ok(self.read_u32_be()? as i32)
    }

    pub fn read_i64_le(&mut self) -> Result<i64> {
        Ok(self.read_u64_le()? as i64)
    }

    pub fn read_i64_be(&mut self) -> Result<i64> {
        Ok(self.read_u64_be()? as i64)
    }

    /// LEB128 unsigned varint, 1-10 bytes, MSB continuation.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            if shift >= 64 {
                return Err(FabricError::BufferOverrun(
                    "varint too long: exceeds 64 bits".into(),
                ));
            }
            let byte = self.read_u8()?;
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.read_raw(n)
    }

    /// UTF-8 string slice of known length (length is out of band).
    pub fn read_string(&mut self, n: usize) -> Result<&'a str> {
        let bytes = self.read_raw(n)?;
        std::str::from_utf8(bytes)
            .map_err(|e| FabricError::Internal(format!("invalid utf-8 string: {}", e)))
    }
}

/// Writer appending to an internal byte vector.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(reserve: usize) -> Self {
        Self {
            buf: Vec::with_capacity(reserve),
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16_le(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u16_be(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32_le(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32_be(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64_le(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64_be(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i8(&mut self, v: i8) {
        self.write_u8(v as u8);
    }

    pub fn write_i16_le(&mut self, v: i16) {
        self.write_u16_le(v as u16);
    }

    pub fn write_i16_be(&mut self, v: i16) {
        self.write_u16_be(v as u16);
    }

    pub fn write_i32_le(&mut self, v: i32) {
        self.write_u32_le(v as u32);
    }

    pub fn write_i32_be(&mut self, v: i32) {
        self.write_u32_be(v as u32);
    }

    pub fn write_i64_le(&mut self, v: i64) {
        self.write_u64_le(v as u64);
    }

    pub fn write_i64_be(&mut self, v: i64) {
        self.write_u64_be(v as u64);
    }

    /// LEB128 unsigned varint.
    pub fn write_varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8 & 0x7f) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_string(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// 4-byte little-endian length prefix framing.
/// Encode: `[len_u32_le][payload]`.
pub struct LengthDelimitedFrame;

impl LengthDelimitedFrame {
    pub fn encode(payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    /// Incremental decode: returns `(payload, consumed)` when a full frame is
    /// present, `None` with zero consumed when more data is needed.
    pub fn try_decode(buffer: &[u8]) -> (Option<&[u8]>, usize) {
        if buffer.len() < 4 {
            return (None, 0);
        }
        let len = u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
        if buffer.len() < 4 + len {
            return (None, 0);
        }
        (Some(&buffer[4..4 + len]), 4 + len)
    }
}
