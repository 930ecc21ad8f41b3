// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Sortable fixed-width string encodings for facet values.
//!
//! Facet fields are compared as plain strings, so every non-string value is
//! turned into a token whose byte order matches the value's natural order.
//! All numeric encodings are exactly 16 lowercase hex digits.
//!
//! | Type    | Encoding                                                     |
//! |---------|--------------------------------------------------------------|
//! | LONG    | two's complement with the sign bit flipped                   |
//! | DOUBLE  | IEEE-754 bits; negatives fully inverted, others sign-flipped |
//! | DATE    | epoch milliseconds (UTC), then LONG                          |
//! | BOOLEAN | `"true"` / `"false"`                                         |
//!
//! Flipping the sign bit maps `i64::MIN..=i64::MAX` monotonically onto
//! `0..=u64::MAX`. For doubles, inverting negatives reverses their magnitude
//! order, which is what puts `-100.0` below `-1.0`.

use chrono::{DateTime, TimeZone, Utc};

use crate::types::FacetKind;

/// Width of every numeric token.
pub const ENCODED_WIDTH: usize = 16;

const SIGN_BIT: u64 = 0x8000_0000_0000_0000;

/// Encode a LONG so that string order equals numeric order.
pub fn encode_long(value: i64) -> String {
    format!("{:016x}", (value as u64) ^ SIGN_BIT)
}

pub fn decode_long(token: &str) -> Option<i64> {
    let bits = parse_hex(token)?;
    Some((bits ^ SIGN_BIT) as i64)
}

/// Encode a DOUBLE so that string order equals numeric order.
///
/// `-0.0` encodes like `0.0`; every NaN encodes to the canonical NaN, which
/// sorts above positive infinity.
pub fn encode_double(value: f64) -> String {
    let value = if value == 0.0 {
        0.0
    } else if value.is_nan() {
        f64::NAN
    } else {
        value
    };
    let bits = value.to_bits();
    let sortable = if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits ^ SIGN_BIT
    };
    format!("{:016x}", sortable)
}

pub fn decode_double(token: &str) -> Option<f64> {
    let sortable = parse_hex(token)?;
    let bits = if sortable & SIGN_BIT != 0 {
        sortable ^ SIGN_BIT
    } else {
        !sortable
    };
    Some(f64::from_bits(bits))
}

/// Encode a DATE as its epoch milliseconds.
pub fn encode_date(value: &DateTime<Utc>) -> String {
    encode_long(value.timestamp_millis())
}

pub fn decode_date(token: &str) -> Option<DateTime<Utc>> {
    let millis = decode_long(token)?;
    Utc.timestamp_millis_opt(millis).single()
}

pub fn encode_boolean(value: bool) -> String {
    value.to_string()
}

/// Human readable label for an encoded token.
///
/// Falls back to the raw token when it does not decode, which only happens
/// for hand-crafted paths.
pub fn label(kind: FacetKind, token: &str) -> String {
    let decoded = match kind {
        FacetKind::Boolean | FacetKind::String => None,
        FacetKind::Long => decode_long(token).map(|v| v.to_string()),
        FacetKind::Double => decode_double(token).map(|v| v.to_string()),
        FacetKind::Date => decode_date(token).map(|d| d.to_rfc3339()),
    };
    decoded.unwrap_or_else(|| token.to_string())
}

/// Marks an already-encoded token in `token_for` input, e.g.
/// `0x8000000000000007` for LONG 7.
pub const TOKEN_PREFIX: &str = "0x";

/// Inverse of `label`: the token for a human readable value.
///
/// Text is always read as a value first, so `1234567890123456` is the LONG
/// 1234567890123456. An encoded token is accepted only with `TOKEN_PREFIX`.
/// Returns `None` when `text` is neither a marked token nor a parseable value.
pub fn token_for(kind: FacetKind, text: &str) -> Option<String> {
    if kind == FacetKind::String {
        return Some(text.to_string());
    }
    let text = text.trim();
    if let Some(raw) = text.strip_prefix(TOKEN_PREFIX) {
        return match kind {
            FacetKind::Boolean => None,
            _ => parse_hex(raw).map(|_| raw.to_ascii_lowercase()),
        };
    }
    match kind {
        FacetKind::String => Some(text.to_string()),
        FacetKind::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" => Some(encode_boolean(true)),
            "false" => Some(encode_boolean(false)),
            _ => None,
        },
        FacetKind::Long => text.parse().ok().map(encode_long),
        FacetKind::Double => text.parse().ok().map(encode_double),
        FacetKind::Date => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|d| encode_date(&d.with_timezone(&Utc))),
    }
}

fn parse_hex(token: &str) -> Option<u64> {
    // from_str_radix alone would take a leading sign.
    if token.len() != ENCODED_WIDTH || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(token, 16).ok()
}
