// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Binary encoding primitives: varints, length-prefixed strings, string
//! tables, and a bounds-checked cursor to read them back.
//!
//! # References
//!
//! - **Varint (LEB128)**: little-endian base-128 variable-length integers.
//!   See Google Protocol Buffers encoding:
//!   <https://protobuf.dev/programming-guides/encoding/>

use crate::error::FormatError;

use super::header::{MAX_STRING_LEN, MAX_VARINT_BYTES};

// ============================================================================
// WRITING
// ============================================================================

/// Encode a varint to bytes
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        } else {
            buf.push(byte | 0x80);
        }
    }
}

/// Length-prefixed UTF-8 string
pub fn encode_str(value: &str, buf: &mut Vec<u8>) {
    encode_varint(value.len() as u64, buf);
    buf.extend_from_slice(value.as_bytes());
}

/// Deduplicated string table: count, then length-prefixed entries
pub fn encode_string_table(entries: &[String], buf: &mut Vec<u8>) {
    encode_varint(entries.len() as u64, buf);
    for entry in entries {
        encode_str(entry, buf);
    }
}

// ============================================================================
// READING
// ============================================================================

/// Cursor over a byte slice. Every read is bounds-checked and fails with
/// `FormatError::Corrupt` instead of panicking.
#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn u8(&mut self) -> Result<u8, FormatError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| corrupt(format!("unexpected end of data at byte {}", self.pos)))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn varint(&mut self) -> Result<u64, FormatError> {
        let (value, consumed) = decode_varint(&self.bytes[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    /// A varint used as a count of items that each take at least one byte.
    ///
    /// Rejecting counts larger than the remaining input stops a corrupt
    /// length from triggering a huge allocation.
    pub fn count(&mut self, what: &str) -> Result<usize, FormatError> {
        let count = self.varint()?;
        let count = usize::try_from(count).map_err(|_| corrupt(format!("{} count overflows", what)))?;
        if count > self.remaining() {
            return Err(corrupt(format!(
                "{} count {} exceeds available bytes {}",
                what,
                count,
                self.remaining()
            )));
        }
        Ok(count)
    }

    pub fn u32(&mut self, what: &str) -> Result<u32, FormatError> {
        let value = self.varint()?;
        u32::try_from(value).map_err(|_| corrupt(format!("{} value {} exceeds u32", what, value)))
    }

    pub fn string(&mut self) -> Result<String, FormatError> {
        let len = self.varint()?;
        let len = usize::try_from(len).map_err(|_| corrupt("string length overflows".into()))?;
        if len > MAX_STRING_LEN {
            return Err(corrupt(format!("string length {} exceeds limit", len)));
        }
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| corrupt(format!("truncated string at byte {}", self.pos)))?;
        let value = std::str::from_utf8(&self.bytes[self.pos..end])
            .map_err(|e| corrupt(format!("invalid UTF-8 at byte {}: {}", self.pos, e)))?
            .to_string();
        self.pos = end;
        Ok(value)
    }

    pub fn string_table(&mut self) -> Result<Vec<String>, FormatError> {
        let count = self.count("string table")?;
        let mut table = Vec::with_capacity(count);
        for _ in 0..count {
            table.push(self.string()?);
        }
        Ok(table)
    }
}

/// Decode a varint from bytes, returning (value, bytes_consumed)
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize), FormatError> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, byte) in bytes.iter().take(MAX_VARINT_BYTES).enumerate() {
        let low = (byte & 0x7F) as u64;
        if shift == 63 && low > 1 {
            return Err(corrupt("varint overflows u64".into()));
        }
        result |= low << shift;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
        shift += 7;
    }

    if bytes.len() >= MAX_VARINT_BYTES {
        Err(corrupt("varint exceeds maximum length".into()))
    } else {
        Err(corrupt("incomplete varint".into()))
    }
}

fn corrupt(reason: String) -> FormatError {
    FormatError::Corrupt(reason)
}
