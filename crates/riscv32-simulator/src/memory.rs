//! Memory model for the RISC-V 32 simulator.
//!
//! Memory is sparse and byte addressed. A byte is readable only after it has
//! been written, either by [`Memory::load_image`] or by a store. Multi-byte
//! accesses are little-endian and need no alignment.

use core::fmt;
use std::collections::HashMap;

use riscv32_assembler::MemoryImage;

use crate::error::MemoryError;

/// Size of one lazily allocated page.
pub const PAGE_SIZE: usize = 4096;
const PAGE_SHIFT: u32 = 12;
const OFFSET_MASK: u32 = (PAGE_SIZE as u32) - 1;

/// Byte-level access to simulated memory.
///
/// Only the byte methods are required; wider accesses are composed from
/// them, so an access fails if any of its bytes is unmapped.
pub trait Bus {
    fn read_byte(&self, address: u32) -> Result<u8, MemoryError>;

    fn write_byte(&mut self, address: u32, value: u8);

    fn read_half(&self, address: u32) -> Result<u16, MemoryError> {
        Ok(u16::from_le_bytes([
            self.read_byte(address)?,
            self.read_byte(address.wrapping_add(1))?,
        ]))
    }

    fn read_word(&self, address: u32) -> Result<u32, MemoryError> {
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.read_byte(address.wrapping_add(i as u32))?;
        }
        Ok(u32::from_le_bytes(bytes))
    }

    fn write_half(&mut self, address: u32, value: u16) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_byte(address.wrapping_add(i as u32), byte);
        }
    }

    fn write_word(&mut self, address: u32, value: u32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_byte(address.wrapping_add(i as u32), byte);
        }
    }
}

struct Page {
    data: Box<[u8; PAGE_SIZE]>,
    /// One bit per byte of `data`.
    mapped: [u64; PAGE_SIZE / 64],
}

impl Page {
    fn new() -> Self {
        Self {
            data: Box::new([0; PAGE_SIZE]),
            mapped: [0; PAGE_SIZE / 64],
        }
    }

    fn is_mapped(&self, offset: usize) -> bool {
        self.mapped[offset / 64] & (1 << (offset % 64)) != 0
    }

    fn get(&self, offset: usize) -> Option<u8> {
        self.is_mapped(offset).then(|| self.data[offset])
    }

    fn set(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
        self.mapped[offset / 64] |= 1 << (offset % 64);
    }

    fn mapped_len(&self) -> usize {
        self.mapped.iter().map(|bits| bits.count_ones() as usize).sum()
    }
}

/// Sparse paged memory covering the full 32-bit address space.
#[derive(Default)]
pub struct Memory {
    pages: HashMap<u32, Page>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create memory holding an assembled image.
    pub fn from_image(image: &MemoryImage) -> Self {
        let mut memory = Self::new();
        memory.load_image(image);
        memory
    }

    /// Copy every byte of `image` into memory, mapping it.
    pub fn load_image(&mut self, image: &MemoryImage) {
        for (address, byte) in image.iter() {
            self.write_byte(address, byte);
        }
    }

    /// Unmap everything.
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn is_mapped(&self, address: u32) -> bool {
        self.peek(address).is_some()
    }

    /// Read a byte without failing; `None` if unmapped.
    pub fn peek(&self, address: u32) -> Option<u8> {
        self.pages
            .get(&(address >> PAGE_SHIFT))
            .and_then(|page| page.get((address & OFFSET_MASK) as usize))
    }

    /// Read `len` bytes from `start` for inspection; unmapped bytes are `None`.
    pub fn read_range(&self, start: u32, len: u32) -> Vec<Option<u8>> {
        (0..len).map(|i| self.peek(start.wrapping_add(i))).collect()
    }

    /// Number of mapped bytes.
    pub fn mapped_len(&self) -> usize {
        self.pages.values().map(Page::mapped_len).sum()
    }
}

impl Bus for Memory {
    fn read_byte(&self, address: u32) -> Result<u8, MemoryError> {
        self.peek(address).ok_or(MemoryError::Unmapped { address })
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        self.pages
            .entry(address >> PAGE_SHIFT)
            .or_insert_with(Page::new)
            .set((address & OFFSET_MASK) as usize, value);
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("pages", &self.pages.len())
            .field("mapped_bytes", &self.mapped_len())
            .finish()
    }
}
