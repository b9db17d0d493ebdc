//! Bounded name buffers copied out of foreign memory.
//!
//! Source buffers in the monitored process are frequently reused, so a raw
//! copy can carry a stale suffix past the terminator. Every name stored or
//! emitted by the tracer goes through the same scrub: truncate at the first
//! NUL and clear every byte after it.

use std::borrow::Cow;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::layout::{ENTITY_NAME_LEN, FIELD_NAME_LEN, LINK_NAME_LEN};
use crate::memory::{ForeignMemory, ReadError};

pub type EntityName = BoundedName<ENTITY_NAME_LEN>;
pub type FieldName = BoundedName<FIELD_NAME_LEN>;
pub type LinkName = BoundedName<LINK_NAME_LEN>;

/// Fixed-width, NUL-scrubbed name buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundedName<const N: usize>([u8; N]);

impl<const N: usize> BoundedName<N> {
    /// Copy from a raw source slice, applying the scrub. A source longer
    /// than `N` is truncated; a source without a terminator is stored
    /// unterminated, full width.
    pub fn from_raw(src: &[u8]) -> Self {
        let mut buf = [0u8; N];
        let take = src.len().min(N);
        buf[..take].copy_from_slice(&src[..take]);
        scrub(&mut buf);
        Self(buf)
    }

    /// Read `N` bytes from foreign memory and scrub them.
    pub fn from_foreign<M: ForeignMemory + ?Sized>(mem: &M, addr: u64) -> Result<Self, ReadError> {
        let mut buf = [0u8; N];
        mem.read(addr, &mut buf)?;
        scrub(&mut buf);
        Ok(Self(buf))
    }

    /// The stored bytes, scrub applied.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// The name up to its terminator (or full width if unterminated).
    pub fn as_str(&self) -> Cow<'_, str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        String::from_utf8_lossy(&self.0[..end])
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

/// Zero every byte after the first terminator, if any.
fn scrub(buf: &mut [u8]) {
    if let Some(pos) = buf.iter().position(|&b| b == 0) {
        buf[pos..].fill(0);
    }
}

impl<const N: usize> Default for BoundedName<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> fmt::Debug for BoundedName<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl<const N: usize> fmt::Display for BoundedName<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl<const N: usize> Serialize for BoundedName<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

struct NameVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for NameVisitor<N> {
    type Value = BoundedName<N>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a name of at most {N} bytes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(BoundedName::from_raw(v.as_bytes()))
    }
}

impl<'de, const N: usize> Deserialize<'de> for BoundedName<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(NameVisitor::<N>)
    }
}
