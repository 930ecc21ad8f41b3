// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Index file header and footer.
//!
//! The header is 24 bytes of fixed-size fields, parsed before anything else.
//! The footer is 8 bytes: a CRC32 over everything before it, plus the header
//! magic reversed. A wrong footer means truncation or corruption; nothing
//! after that check is trusted.

use std::io::{self, Write};

use crc32fast::Hasher as Crc32Hasher;

use crate::error::FormatError;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Magic bytes: "FCDX" in ASCII (header)
pub const MAGIC: [u8; 4] = [0x46, 0x43, 0x44, 0x58];

/// Footer magic: "XDCF" (reversed, marks valid file end)
pub const FOOTER_MAGIC: [u8; 4] = [0x58, 0x44, 0x43, 0x46];

pub const VERSION: u8 = 1;

// ============================================================================
// SECURITY LIMITS (prevent resource exhaustion from malicious input)
// ============================================================================

/// Maximum file size: 1 GiB
pub const MAX_FILE_SIZE: usize = 1024 * 1024 * 1024;

/// Maximum number of documents
pub const MAX_DOC_COUNT: u32 = 50_000_000;

/// Maximum length of a single string (ids, paths, tokens)
pub const MAX_STRING_LEN: usize = 1024 * 1024;

/// Maximum varint bytes (u64 needs at most 10 bytes)
pub const MAX_VARINT_BYTES: usize = 10;

// ============================================================================
// FLAGS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatFlags(pub(crate) u8);

impl FormatFlags {
    /// Records carry full-text terms.
    pub const HAS_TERMS: u8 = 0b0000_0001;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn with_terms(mut self) -> Self {
        self.0 |= Self::HAS_TERMS;
        self
    }

    pub fn has_terms(self) -> bool {
        self.0 & Self::HAS_TERMS != 0
    }
}

// ============================================================================
// HEADER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: u8,
    pub flags: FormatFlags,
    pub doc_count: u32,
    /// Generation of the snapshot that was saved.
    pub generation: u64,
    /// Byte length of the docs section that follows the header.
    pub docs_len: u32,
}

impl IndexHeader {
    // 4 (magic) + 1 (version) + 1 (flags) + 2 (reserved) + 4 + 8 + 4 = 24
    pub const SIZE: usize = 24;

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&MAGIC)?;
        w.write_all(&[self.version, self.flags.0])?;
        w.write_all(&[0u8; 2])?; // reserved
        w.write_all(&self.doc_count.to_le_bytes())?;
        w.write_all(&self.generation.to_le_bytes())?;
        w.write_all(&self.docs_len.to_le_bytes())?;
        Ok(())
    }

    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        let Some(buf) = bytes.get(..Self::SIZE) else {
            return Err(FormatError::Corrupt("file too short for header".into()));
        };
        if buf[..4] != MAGIC {
            return Err(FormatError::BadMagic);
        }
        let version = buf[4];
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                expected: VERSION,
            });
        }
        let doc_count = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        if doc_count > MAX_DOC_COUNT {
            return Err(FormatError::Corrupt(format!(
                "document count {} exceeds limit {}",
                doc_count, MAX_DOC_COUNT
            )));
        }
        let mut generation = [0u8; 8];
        generation.copy_from_slice(&buf[12..20]);

        Ok(Self {
            version,
            flags: FormatFlags(buf[5]),
            doc_count,
            generation: u64::from_le_bytes(generation),
            docs_len: u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
        })
    }
}

// ============================================================================
// FOOTER (8 bytes)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexFooter {
    /// CRC32 of header + docs section (everything before the footer)
    pub crc32: u32,
}

impl IndexFooter {
    pub const SIZE: usize = 8; // 4 bytes CRC32 + 4 bytes magic

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.crc32.to_le_bytes())?;
        w.write_all(&FOOTER_MAGIC)?;
        Ok(())
    }

    /// Read the footer from the last 8 bytes of `bytes`.
    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        let Some(footer_start) = bytes.len().checked_sub(Self::SIZE) else {
            return Err(FormatError::Corrupt("file too short for footer".into()));
        };
        let footer = &bytes[footer_start..];
        if footer[4..] != FOOTER_MAGIC {
            return Err(FormatError::BadMagic);
        }
        Ok(Self {
            crc32: u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]),
        })
    }

    pub fn compute_crc32(data: &[u8]) -> u32 {
        let mut hasher = Crc32Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }
}
