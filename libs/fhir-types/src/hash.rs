//! Structural hashing
//!
//! Elements write a deterministic byte stream into a [`HashSink`]; [`hash`]
//! feeds that stream into SHA-256. The stream only depends on the logical
//! content of an element: absent fields, explicit nulls and empty lists all
//! write nothing, generic maps are written in key order, and metadata is never
//! written.
//!
//! # Frozen registry
//!
//! Every concrete type has a one-byte type marker and every field a one-byte
//! field marker (`id` = 0, `extension` = 1, type fields from 2). Markers are
//! part of the digest contract and must never be renumbered or reused.
//!
//! | scalar               | encoding                                    |
//! |----------------------|---------------------------------------------|
//! | boolean              | `0x00`, one byte 0/1                        |
//! | string               | `0x01`, u32 LE byte length, UTF-8 bytes     |
//! | int32 / int64        | `0x02` i32 LE / `0x03` i64 LE               |
//! | decimal              | `0x04`, plain text with scale, as a string  |
//! | local date-time      | `0x06`, y m d h min s nano as i32 LE        |
//! | year / year-month    | `0x07` y / `0x08` y m                       |
//! | date                 | `0x09` y m d                                |
//! | offset date-time     | `0x0B`, local fields then offset seconds    |

use crate::element::Element;
use crate::error::{Error, Result};
use crate::value::{FieldValue, GenericMap};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

pub const SCALAR_BOOLEAN: u8 = 0x00;
pub const SCALAR_STRING: u8 = 0x01;
pub const SCALAR_INT: u8 = 0x02;
pub const SCALAR_LONG: u8 = 0x03;
pub const SCALAR_DECIMAL: u8 = 0x04;
pub const SCALAR_LOCAL_DATE_TIME: u8 = 0x06;
pub const SCALAR_YEAR: u8 = 0x07;
pub const SCALAR_YEAR_MONTH: u8 = 0x08;
pub const SCALAR_DATE: u8 = 0x09;
pub const SCALAR_OFFSET_DATE_TIME: u8 = 0x0B;

/// Marker written before the items of an ordered list.
pub const LIST_MARKER: u8 = 36;
/// Marker written before the sorted entries of a generic map.
pub const MAP_MARKER: u8 = 37;

pub const FIELD_ID: u8 = 0;
pub const FIELD_EXTENSION: u8 = 1;
/// Field marker of the single `value` field of primitives.
pub const FIELD_VALUE: u8 = 2;

/// Type markers of the concrete element types.
pub mod markers {
    pub const BOOLEAN: u8 = 0;
    pub const INTEGER: u8 = 1;
    pub const INTEGER64: u8 = 2;
    pub const STRING: u8 = 3;
    pub const DECIMAL: u8 = 4;
    pub const URI: u8 = 5;
    pub const CANONICAL: u8 = 7;
    pub const DATE: u8 = 10;
    pub const DATE_TIME: u8 = 11;
    pub const CODE: u8 = 13;
    pub const ID: u8 = 15;
    pub const MARKDOWN: u8 = 16;
    pub const UNSIGNED_INT: u8 = 17;
    pub const POSITIVE_INT: u8 = 18;
    pub const CODING: u8 = 38;
    pub const CODEABLE_CONCEPT: u8 = 39;
    pub const QUANTITY: u8 = 40;
    pub const PERIOD: u8 = 41;
    pub const IDENTIFIER: u8 = 42;
    pub const REFERENCE: u8 = 43;
    pub const BUNDLE_ENTRY_SEARCH: u8 = 45;
    pub const ANNOTATION: u8 = 49;
    pub const EXTENSION: u8 = 56;
}

/// Append-only byte sink fed by the structural encoders.
pub trait HashSink {
    fn put_bytes(&mut self, bytes: &[u8]);

    fn put_byte(&mut self, byte: u8) {
        self.put_bytes(&[byte]);
    }

    fn put_i32(&mut self, value: i32) {
        self.put_bytes(&value.to_le_bytes());
    }

    fn put_i64(&mut self, value: i64) {
        self.put_bytes(&value.to_le_bytes());
    }
}

impl HashSink for Vec<u8> {
    fn put_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Streams the encoding straight into SHA-256.
#[derive(Default)]
pub struct Sha256Sink(Sha256);

impl Sha256Sink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Hash {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&self.0.finalize());
        Hash(bytes)
    }
}

impl HashSink for Sha256Sink {
    fn put_bytes(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
}

/// A 32-byte content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Sentinel digest of deleted content.
    pub const DELETED: Hash = Hash([0; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The first four bytes as a big-endian integer, used as an index prefix.
    pub fn prefix(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn from_hex(input: &str) -> Result<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(input, &mut bytes)
            .map_err(|e| Error::validation("Hash", format!("`{input}`: {e}")))?;
        Ok(Hash(bytes))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Hash::from_hex(s)
    }
}

pub fn write_bool(sink: &mut dyn HashSink, value: bool) {
    sink.put_byte(SCALAR_BOOLEAN);
    sink.put_byte(value as u8);
}

pub fn write_string(sink: &mut dyn HashSink, value: &str) {
    sink.put_byte(SCALAR_STRING);
    write_str_body(sink, value);
}

fn write_str_body(sink: &mut dyn HashSink, value: &str) {
    // FHIR strings are bounded far below u32::MAX bytes
    sink.put_bytes(&(value.len() as u32).to_le_bytes());
    sink.put_bytes(value.as_bytes());
}

pub fn write_int(sink: &mut dyn HashSink, value: i32) {
    sink.put_byte(SCALAR_INT);
    sink.put_i32(value);
}

pub fn write_long(sink: &mut dyn HashSink, value: i64) {
    sink.put_byte(SCALAR_LONG);
    sink.put_i64(value);
}

pub fn write_decimal(sink: &mut dyn HashSink, value: &Decimal) {
    let mut value = *value;
    if value.is_zero() {
        value.set_sign_positive(true);
    }
    sink.put_byte(SCALAR_DECIMAL);
    write_str_body(sink, &value.to_string());
}

/// Write a generic field value.
///
/// Raw scalars are written exactly like the primitive element wrapping them
/// without id or extensions, so both representations hash the same.
pub fn write_value(sink: &mut dyn HashSink, value: &FieldValue) {
    match value {
        FieldValue::Boolean(b) => {
            bare_primitive(sink, markers::BOOLEAN);
            write_bool(sink, *b);
        }
        FieldValue::Integer(n) => match i32::try_from(*n) {
            Ok(n) => {
                bare_primitive(sink, markers::INTEGER);
                write_int(sink, n);
            }
            Err(_) => {
                bare_primitive(sink, markers::INTEGER64);
                write_long(sink, *n);
            }
        },
        FieldValue::Decimal(d) => {
            bare_primitive(sink, markers::DECIMAL);
            write_decimal(sink, d);
        }
        FieldValue::String(s) => {
            bare_primitive(sink, markers::STRING);
            write_string(sink, s);
        }
        FieldValue::Code(s) => {
            bare_primitive(sink, markers::CODE);
            write_string(sink, s);
        }
        FieldValue::Date(d) => {
            bare_primitive(sink, markers::DATE);
            d.hash_into(sink);
        }
        FieldValue::DateTime(dt) => {
            bare_primitive(sink, markers::DATE_TIME);
            dt.hash_into(sink);
        }
        FieldValue::Element(e) => e.hash_into(sink),
        FieldValue::List(items) => {
            sink.put_byte(LIST_MARKER);
            for item in items.iter() {
                write_value(sink, item);
            }
        }
        FieldValue::Map(map) => write_map(sink, map),
    }
}

fn bare_primitive(sink: &mut dyn HashSink, type_marker: u8) {
    sink.put_byte(type_marker);
    sink.put_byte(FIELD_VALUE);
}

pub fn write_map(sink: &mut dyn HashSink, map: &GenericMap) {
    sink.put_byte(MAP_MARKER);
    for (key, value) in map.sorted_entries() {
        write_string(sink, key);
        write_value(sink, value);
    }
}

/// SHA-256 digest of an element's structural encoding.
pub fn hash(element: &Element) -> Hash {
    let mut sink = Sha256Sink::new();
    element.hash_into(&mut sink);
    sink.finish()
}

/// SHA-256 digest of a generic field value.
pub fn hash_value(value: &FieldValue) -> Hash {
    let mut sink = Sha256Sink::new();
    write_value(&mut sink, value);
    sink.finish()
}

/// The raw encoding of a generic field value, mostly useful for tests.
pub fn encode_value(value: &FieldValue) -> Vec<u8> {
    let mut bytes = Vec::new();
    write_value(&mut bytes, value);
    bytes
}
