// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! On-disk index file.
//!
//! Only live documents are written. Postings are not stored: they are a pure
//! function of the documents and are rebuilt on load, which keeps the file
//! small and the format trivially consistent.
//!
//! # Format (v1)
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ HEADER (24 bytes)                                          │
//! │   magic "FCDX", version, flags, reserved                   │
//! │   doc_count, generation, docs_len                          │
//! ├────────────────────────────────────────────────────────────┤
//! │ DOCS (docs_len bytes)                                      │
//! │   field name table: count, [len, utf8]*                    │
//! │   per document, in insertion order:                        │
//! │     node_id, path, primary_type         (len, utf8)        │
//! │     revision, config_generation         (varint)           │
//! │     position: count, [varint]*                             │
//! │     facets: count, [name_idx, value, kind u8, tv u8]*      │
//! │     terms: count, [len, utf8]*          (if HAS_TERMS)     │
//! ├────────────────────────────────────────────────────────────┤
//! │ FOOTER (8 bytes): crc32 + magic "XDCF"                     │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! crash mid-save leaves the previous file intact.

pub mod encoding;
pub mod header;

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::FormatError;
use crate::index::{IndexOutcome, IndexSnapshot};
use crate::types::{FacetField, FacetKind, IndexedDocument, NodeId};

use encoding::{encode_str, encode_string_table, encode_varint, ByteReader};
use header::{FormatFlags, IndexFooter, IndexHeader, MAX_FILE_SIZE, VERSION};

/// Serialize the live documents of `snapshot`.
pub fn encode_snapshot(snapshot: &IndexSnapshot) -> Result<Vec<u8>, FormatError> {
    let mut field_names: Vec<String> = Vec::new();
    let mut field_index: HashMap<&str, u64> = HashMap::new();
    for (_, doc) in snapshot.documents() {
        for field in &doc.facets {
            if !field_index.contains_key(field.name.as_str()) {
                field_index.insert(field.name.as_str(), field_names.len() as u64);
                field_names.push(field.name.clone());
            }
        }
    }

    let mut docs = Vec::new();
    encode_string_table(&field_names, &mut docs);
    let mut doc_count: u32 = 0;
    for (_, doc) in snapshot.documents() {
        encode_str(doc.node_id.as_str(), &mut docs);
        encode_str(&doc.path, &mut docs);
        encode_str(&doc.primary_type, &mut docs);
        encode_varint(doc.revision, &mut docs);
        encode_varint(doc.config_generation, &mut docs);

        encode_varint(doc.position.len() as u64, &mut docs);
        for step in &doc.position {
            encode_varint(*step as u64, &mut docs);
        }

        encode_varint(doc.facets.len() as u64, &mut docs);
        for field in &doc.facets {
            let idx = field_index.get(field.name.as_str()).copied().unwrap_or_default();
            encode_varint(idx, &mut docs);
            encode_str(&field.value, &mut docs);
            docs.push(field.kind.to_byte());
            docs.push(field.term_vector as u8);
        }

        encode_varint(doc.terms.len() as u64, &mut docs);
        for term in &doc.terms {
            encode_str(term, &mut docs);
        }
        doc_count += 1;
    }

    let docs_len = u32::try_from(docs.len())
        .map_err(|_| FormatError::Corrupt(format!("docs section too large: {} bytes", docs.len())))?;
    let header = IndexHeader {
        version: VERSION,
        flags: FormatFlags::new().with_terms(),
        doc_count,
        generation: snapshot.generation(),
        docs_len,
    };

    let mut buf = Vec::with_capacity(IndexHeader::SIZE + docs.len() + IndexFooter::SIZE);
    header.write(&mut buf)?;
    buf.extend_from_slice(&docs);
    let crc32 = IndexFooter::compute_crc32(&buf);
    IndexFooter { crc32 }.write(&mut buf)?;
    Ok(buf)
}

/// Deserialize and rebuild a snapshot.
///
/// # Validation
///
/// 1. File size is within `MAX_FILE_SIZE`
/// 2. Footer magic and CRC32 match
/// 3. Header magic and version are valid
/// 4. The docs section length matches the file size
/// 5. Every record decodes exactly, with no trailing bytes
pub fn decode_snapshot(bytes: &[u8]) -> Result<IndexSnapshot, FormatError> {
    if bytes.len() > MAX_FILE_SIZE {
        return Err(FormatError::Corrupt(format!(
            "file too large: {} bytes (max {})",
            bytes.len(),
            MAX_FILE_SIZE
        )));
    }
    let min_size = IndexHeader::SIZE + IndexFooter::SIZE;
    if bytes.len() < min_size {
        return Err(FormatError::Corrupt(format!(
            "file too small: {} bytes (minimum {})",
            bytes.len(),
            min_size
        )));
    }
    let header = IndexHeader::read(bytes)?;

    let footer = IndexFooter::read(bytes)?;
    let content = &bytes[..bytes.len() - IndexFooter::SIZE];
    let computed = IndexFooter::compute_crc32(content);
    if footer.crc32 != computed {
        return Err(FormatError::ChecksumMismatch {
            stored: footer.crc32,
            computed,
        });
    }

    let docs = &content[IndexHeader::SIZE..];
    if docs.len() != header.docs_len as usize {
        return Err(FormatError::Corrupt(format!(
            "docs section is {} bytes, header says {}",
            docs.len(),
            header.docs_len
        )));
    }

    let mut reader = ByteReader::new(docs);
    let field_names = reader.string_table()?;
    let mut snapshot = IndexSnapshot::default();
    for _ in 0..header.doc_count {
        let doc = decode_document(&mut reader, &field_names, header.flags)?;
        let id = doc.node_id.clone();
        let outcome = snapshot
            .upsert(doc)
            .map_err(|e| FormatError::Corrupt(e.to_string()))?;
        if outcome != IndexOutcome::Inserted {
            return Err(FormatError::Corrupt(format!("duplicate document for node {}", id)));
        }
    }
    if !reader.is_empty() {
        return Err(FormatError::Corrupt(format!(
            "{} trailing bytes after last document",
            reader.remaining()
        )));
    }
    snapshot.generation = header.generation;
    Ok(snapshot)
}

fn decode_document(
    reader: &mut ByteReader<'_>,
    field_names: &[String],
    flags: FormatFlags,
) -> Result<IndexedDocument, FormatError> {
    let node_id = NodeId::new(reader.string()?);
    let path = reader.string()?;
    let primary_type = reader.string()?;
    let revision = reader.varint()?;
    let config_generation = reader.varint()?;

    let steps = reader.count("position")?;
    let mut position = Vec::with_capacity(steps);
    for _ in 0..steps {
        position.push(reader.u32("position step")?);
    }

    let field_count = reader.count("facet")?;
    let mut facets = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        let idx = reader.varint()?;
        let name = usize::try_from(idx)
            .ok()
            .and_then(|i| field_names.get(i))
            .ok_or_else(|| FormatError::Corrupt(format!("field name index {} out of range", idx)))?
            .clone();
        let value = reader.string()?;
        let kind_byte = reader.u8()?;
        let kind = FacetKind::from_byte(kind_byte)
            .ok_or_else(|| FormatError::Corrupt(format!("unknown facet kind {}", kind_byte)))?;
        let term_vector = match reader.u8()? {
            0 => false,
            1 => true,
            other => return Err(FormatError::Corrupt(format!("bad term vector flag {}", other))),
        };
        facets.push(FacetField {
            name,
            value,
            kind,
            term_vector,
        });
    }

    let mut terms = Vec::new();
    if flags.has_terms() {
        let term_count = reader.count("term")?;
        terms.reserve(term_count);
        for _ in 0..term_count {
            terms.push(reader.string()?);
        }
    }

    Ok(IndexedDocument {
        node_id,
        path,
        position,
        primary_type,
        revision,
        config_generation,
        facets,
        terms,
    })
}

/// Atomically replace `path` with the encoded snapshot.
pub fn write_file(path: &Path, snapshot: &IndexSnapshot) -> Result<(), FormatError> {
    let bytes = encode_snapshot(snapshot)?;
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);
    {
        let mut file = fs::File::create(tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(tmp, path)?;
    Ok(())
}

pub fn read_file(path: &Path) -> Result<IndexSnapshot, FormatError> {
    let bytes = fs::read(path)?;
    decode_snapshot(&bytes)
}
