//! Read-only access to the monitored process's address space.
//!
//! The tracer never writes through this seam. A failed read is an
//! observation failure, not a fault: callers abort the current probe's
//! work and emit nothing.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("unreadable foreign address {addr:#x} ({len} bytes)")]
    Unreadable { addr: u64, len: usize },
}

/// A readable view of foreign memory.
///
/// The production implementation sits on whatever remote-read primitive the
/// attachment layer provides; [`BufferMemory`] serves replay and tests.
pub trait ForeignMemory: Send + Sync {
    /// Fill `dst` from `addr`. Either the whole range is readable and `dst`
    /// is fully written, or `Err` is returned and `dst` must be treated as
    /// unspecified by the caller.
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<(), ReadError>;

    fn read_u16(&self, addr: u64) -> Result<u16, ReadError> {
        let mut buf = [0u8; 2];
        self.read(addr, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_i16(&self, addr: u64) -> Result<i16, ReadError> {
        let mut buf = [0u8; 2];
        self.read(addr, &mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }

    fn read_u32(&self, addr: u64) -> Result<u32, ReadError> {
        let mut buf = [0u8; 4];
        self.read(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&self, addr: u64) -> Result<u64, ReadError> {
        let mut buf = [0u8; 8];
        self.read(addr, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

impl<M: ForeignMemory + ?Sized> ForeignMemory for &M {
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<(), ReadError> {
        (**self).read(addr, dst)
    }
}

/// A sparse in-memory address space.
///
/// Regions are mapped at explicit addresses; reads crossing an unmapped
/// byte fail wholesale. Address 0 is never mapped so null pointers read as
/// unreadable, matching the real target.
#[derive(Debug, Default)]
pub struct BufferMemory {
    regions: BTreeMap<u64, Vec<u8>>,
}

impl BufferMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `bytes` at `addr`. A later overlapping mapping shadows only if
    /// it starts at the same address; keep test images disjoint.
    pub fn map(&mut self, addr: u64, bytes: impl Into<Vec<u8>>) {
        assert!(addr != 0, "address 0 is reserved for null");
        self.regions.insert(addr, bytes.into());
    }
}

impl ForeignMemory for BufferMemory {
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<(), ReadError> {
        let len = dst.len();
        let fail = ReadError::Unreadable { addr, len };
        if addr == 0 {
            return Err(fail);
        }
        let (start, region) = self
            .regions
            .range(..=addr)
            .next_back()
            .ok_or(fail)?;
        let offset = (addr - start) as usize;
        let end = offset.checked_add(len).ok_or(fail)?;
        if end > region.len() {
            return Err(fail);
        }
        dst.copy_from_slice(&region[offset..end]);
        Ok(())
    }
}
