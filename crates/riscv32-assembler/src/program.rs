//! The assembled program: a sparse memory image plus the instruction list.

use std::collections::BTreeMap;
use std::fmt;

/// Sparse little-endian byte image. Absent addresses are unmapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    bytes: BTreeMap<u32, u8>,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_byte(&mut self, address: u32, value: u8) {
        self.bytes.insert(address, value);
    }

    pub fn write_half(&mut self, address: u32, value: u16) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_word(&mut self, address: u32, value: u32) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, address: u32, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.bytes.insert(address.wrapping_add(i as u32), *b);
        }
    }

    pub fn read_byte(&self, address: u32) -> Option<u8> {
        self.bytes.get(&address).copied()
    }

    /// Read a little-endian word; `None` if any byte is unmapped.
    pub fn read_word(&self, address: u32) -> Option<u32> {
        let mut bytes = [0u8; 4];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = self.read_byte(address.wrapping_add(i as u32))?;
        }
        Some(u32::from_le_bytes(bytes))
    }

    /// Mapped bytes in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.bytes.iter().map(|(a, b)| (*a, *b))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One encoded instruction with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledInstruction {
    pub address: u32,
    pub word: u32,
    pub source: String,
    pub line: usize,
}

impl AssembledInstruction {
    pub fn hex(&self) -> String {
        format!("0x{:08x}", self.word)
    }

    /// The word as 32 binary digits, most significant first.
    pub fn binary(&self) -> String {
        format!("{:032b}", self.word)
    }
}

impl fmt::Display for AssembledInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}: {} {}", self.address, self.hex(), self.source)
    }
}

/// Output of a successful assembly. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    memory: MemoryImage,
    instructions: Vec<AssembledInstruction>,
    entry_address: u32,
    symbols: BTreeMap<String, u32>,
}

impl Program {
    pub(crate) fn new(
        memory: MemoryImage,
        instructions: Vec<AssembledInstruction>,
        entry_address: u32,
        symbols: BTreeMap<String, u32>,
    ) -> Self {
        Self {
            memory,
            instructions,
            entry_address,
            symbols,
        }
    }

    /// Data bytes and encoded instruction words.
    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    /// Instructions in program order.
    pub fn instructions(&self) -> &[AssembledInstruction] {
        &self.instructions
    }

    pub fn entry_address(&self) -> u32 {
        self.entry_address
    }

    pub fn symbol(&self, name: &str) -> Option<u32> {
        self.symbols.get(name).copied()
    }

    pub fn symbols(&self) -> &BTreeMap<String, u32> {
        &self.symbols
    }

    /// Address-ordered listing, one instruction per line.
    pub fn listing(&self, with_binary: bool) -> String {
        let mut out = String::new();
        for inst in &self.instructions {
            if with_binary {
                out.push_str(&format!(
                    "0x{:08x}  {}  {}  {}\n",
                    inst.address,
                    inst.hex(),
                    inst.binary(),
                    inst.source
                ));
            } else {
                out.push_str(&format!("{}\n", inst));
            }
        }
        out
    }
}
