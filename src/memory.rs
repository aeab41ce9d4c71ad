//! Flat data memory for the simulated 8086.
//!
//! The machine gets the full 1 MiB address space as one contiguous block,
//! with no segmentation applied; effective addresses index it directly.
//! Code lives in its own image outside this space, so a program cannot
//! overwrite its own instructions.

use memmap::MmapMut;

use std::error::Error;
use std::fmt;

/// Size of the data address space: 2^20 bytes.
pub const MEMORY_SIZE: usize = 1 << 20;

/// The machine's zero-initialized data memory.
#[derive(Debug)]
pub struct Memory {
    mapping: MmapMut,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            mapping: MmapMut::map_anon(MEMORY_SIZE).expect("could not map memory"),
        }
    }

    /// The full memory image, for dumping to disk.
    pub fn as_slice(&self) -> &[u8] {
        &self.mapping[..]
    }

    pub fn load(&self, addr: u32) -> Result<u8, MemoryError> {
        self.mapping
            .get(addr as usize)
            .cloned()
            .ok_or(MemoryError::AddressOutOfRange { addr })
    }

    pub fn store(&mut self, addr: u32, value: u8) -> Result<(), MemoryError> {
        match self.mapping.get_mut(addr as usize) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(MemoryError::AddressOutOfRange { addr }),
        }
    }

    /// Loads a little-endian word. A word access one byte below the top of
    /// memory fails rather than wrapping.
    pub fn load_u16(&self, addr: u32) -> Result<u16, MemoryError> {
        let (b0, b1) = (self.load(addr)? as u16, self.load(addr + 1)? as u16);

        Ok(b1 << 8 | b0)
    }

    /// Stores a little-endian word.
    pub fn store_u16(&mut self, addr: u32, value: u16) -> Result<(), MemoryError> {
        self.store(addr, value as u8)?;
        self.store(addr + 1, (value >> 8) as u8)
    }
}

/// An error that can occur when reading or writing memory.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The accessed address lies outside the 1 MiB address space.
    AddressOutOfRange { addr: u32 },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::AddressOutOfRange { addr } => {
                write!(f, "memory address out of range: {:#x}", addr)
            }
        }
    }
}

impl Error for MemoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_accesses() {
        let mut mem = Memory::new();
        assert_eq!(mem.load(0), Ok(0));
        mem.store(0, 0x42).unwrap();
        assert_eq!(mem.load(0), Ok(0x42));

        let top = (MEMORY_SIZE - 1) as u32;
        mem.store(top, 0xFF).unwrap();
        assert_eq!(mem.load(top), Ok(0xFF));
        assert_eq!(
            mem.load(top + 1),
            Err(MemoryError::AddressOutOfRange { addr: top + 1 })
        );
    }

    #[test]
    fn words_are_little_endian() {
        let mut mem = Memory::new();
        mem.store_u16(0x10, 0xABCD).unwrap();
        assert_eq!(mem.load(0x10), Ok(0xCD));
        assert_eq!(mem.load(0x11), Ok(0xAB));
        assert_eq!(mem.load_u16(0x10), Ok(0xABCD));
    }

    #[test]
    fn word_access_does_not_wrap() {
        let mut mem = Memory::new();
        let top = (MEMORY_SIZE - 1) as u32;
        assert!(mem.store_u16(top, 0x1234).is_err());
        assert!(mem.load_u16(top).is_err());
    }
}
