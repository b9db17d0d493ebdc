//! Typed scalar extraction from foreign memory.
//!
//! Every recognized source width is widened into one of four payload
//! shapes. A failed read never leaves sourced garbage behind: the result
//! collapses to `Null` and any partially staged buffer is discarded.

use std::borrow::Cow;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::layout::MAX_STRING_SIZE;
use crate::memory::ForeignMemory;

/// Field type tags as declared by the monitored runtime's descriptors.
///
/// Raw values follow the runtime's own numbering; anything outside the
/// recognized scalar set decodes to `Unsupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Char,
    UChar,
    Short,
    UShort,
    Long,
    ULong,
    Int64,
    UInt64,
    Float,
    Double,
    Enum,
    Unsupported,
}

impl FieldType {
    pub fn from_raw(raw: i16) -> Self {
        match raw {
            0 => FieldType::Text,
            1 => FieldType::Char,
            2 => FieldType::UChar,
            3 => FieldType::Short,
            4 => FieldType::UShort,
            5 => FieldType::Long,
            6 => FieldType::ULong,
            7 => FieldType::Int64,
            8 => FieldType::UInt64,
            9 => FieldType::Float,
            10 => FieldType::Double,
            11 => FieldType::Enum,
            _ => FieldType::Unsupported,
        }
    }
}

/// Bounded text payload: a truncated copy of up to `MAX_STRING_SIZE` bytes,
/// not necessarily NUL-terminated if the source lacked a terminator.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BoundedText(pub [u8; MAX_STRING_SIZE]);

impl BoundedText {
    pub fn zeroed() -> Self {
        Self([0u8; MAX_STRING_SIZE])
    }

    pub fn from_raw(src: &[u8]) -> Self {
        let mut buf = [0u8; MAX_STRING_SIZE];
        let take = src.len().min(MAX_STRING_SIZE);
        buf[..take].copy_from_slice(&src[..take]);
        Self(buf)
    }

    /// The text up to its terminator (or full width if unterminated).
    pub fn as_str(&self) -> Cow<'_, str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(MAX_STRING_SIZE);
        String::from_utf8_lossy(&self.0[..end])
    }
}

impl fmt::Debug for BoundedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl Serialize for BoundedText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = BoundedText;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a string of at most {MAX_STRING_SIZE} bytes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(BoundedText::from_raw(v.as_bytes()))
    }
}

impl<'de> Deserialize<'de> for BoundedText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(TextVisitor)
    }
}

/// A value read out of the monitored process, widened to 64 bits.
///
/// The active variant always matches the type tag that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExtractedValue {
    Int(i64),
    UInt(u64),
    Double(f64),
    Text(BoundedText),
    Null,
}

/// Read one scalar of the tagged type from `addr`.
///
/// Signed widths sign-extend, unsigned widths and enums zero-extend,
/// floats widen to f64, text is a bounded copy. An unrecognized tag reads
/// nothing; any read failure yields `Null`.
pub fn extract<M: ForeignMemory + ?Sized>(mem: &M, tag: FieldType, addr: u64) -> ExtractedValue {
    let result = match tag {
        FieldType::Text => {
            let mut buf = [0u8; MAX_STRING_SIZE];
            mem.read(addr, &mut buf).map(|_| ExtractedValue::Text(BoundedText(buf)))
        }
        FieldType::Char => read_array(mem, addr).map(|b: [u8; 1]| ExtractedValue::Int(i8::from_le_bytes(b) as i64)),
        FieldType::Short => read_array(mem, addr).map(|b: [u8; 2]| ExtractedValue::Int(i16::from_le_bytes(b) as i64)),
        FieldType::Long => read_array(mem, addr).map(|b: [u8; 4]| ExtractedValue::Int(i32::from_le_bytes(b) as i64)),
        FieldType::Int64 => read_array(mem, addr).map(|b: [u8; 8]| ExtractedValue::Int(i64::from_le_bytes(b))),
        FieldType::UChar => read_array(mem, addr).map(|b: [u8; 1]| ExtractedValue::UInt(b[0] as u64)),
        FieldType::UShort | FieldType::Enum => {
            read_array(mem, addr).map(|b: [u8; 2]| ExtractedValue::UInt(u16::from_le_bytes(b) as u64))
        }
        FieldType::ULong => read_array(mem, addr).map(|b: [u8; 4]| ExtractedValue::UInt(u32::from_le_bytes(b) as u64)),
        FieldType::UInt64 => read_array(mem, addr).map(|b: [u8; 8]| ExtractedValue::UInt(u64::from_le_bytes(b))),
        FieldType::Float => read_array(mem, addr).map(|b: [u8; 4]| ExtractedValue::Double(f32::from_le_bytes(b) as f64)),
        FieldType::Double => read_array(mem, addr).map(|b: [u8; 8]| ExtractedValue::Double(f64::from_le_bytes(b))),
        FieldType::Unsupported => return ExtractedValue::Null,
    };
    result.unwrap_or(ExtractedValue::Null)
}

fn read_array<M: ForeignMemory + ?Sized, const N: usize>(
    mem: &M,
    addr: u64,
) -> Result<[u8; N], crate::memory::ReadError> {
    let mut buf = [0u8; N];
    mem.read(addr, &mut buf)?;
    Ok(buf)
}
