//! Error types for the RISC-V 32 simulator.

use core::fmt;

use thiserror::Error;

/// Kind of memory access that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAccessKind {
    Read,
    Write,
    InstructionFetch,
}

impl fmt::Display for MemoryAccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryAccessKind::Read => write!(f, "read"),
            MemoryAccessKind::Write => write!(f, "write"),
            MemoryAccessKind::InstructionFetch => write!(f, "instruction fetch"),
        }
    }
}

/// Failure reported by a [`Bus`](crate::Bus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("no byte has been written at 0x{address:08x}")]
    Unmapped { address: u32 },
}

impl MemoryError {
    pub fn address(&self) -> u32 {
        match self {
            MemoryError::Unmapped { address } => *address,
        }
    }
}

/// Fatal conditions that halt the simulator.
///
/// Reaching the step ceiling is not an error; see
/// [`RunOutcome::MaxStepsExceeded`](crate::RunOutcome::MaxStepsExceeded).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("Failed to fetch instruction at PC 0x{pc:08x}: {source}")]
    FetchError {
        pc: u32,
        #[source]
        source: MemoryError,
    },

    #[error("Invalid instruction 0x{instruction:08x} at PC 0x{pc:08x}: {reason}")]
    DecodeError {
        pc: u32,
        instruction: u32,
        reason: String,
    },

    #[error("Invalid memory {kind} at address 0x{address:08x} (size: {size} bytes) at PC 0x{pc:08x}")]
    UnmappedMemory {
        address: u32,
        size: usize,
        kind: MemoryAccessKind,
        pc: u32,
    },

    #[error("Unimplemented instruction `{name}` (0x{instruction:08x}) at PC 0x{pc:08x}")]
    UnimplementedInstruction {
        pc: u32,
        instruction: u32,
        name: &'static str,
    },

    #[error("Breakpoint (ebreak) at PC 0x{pc:08x}")]
    Breakpoint { pc: u32 },
}

impl SimError {
    /// Get the PC where the error occurred.
    pub fn pc(&self) -> u32 {
        match self {
            SimError::FetchError { pc, .. } => *pc,
            SimError::DecodeError { pc, .. } => *pc,
            SimError::UnmappedMemory { pc, .. } => *pc,
            SimError::UnimplementedInstruction { pc, .. } => *pc,
            SimError::Breakpoint { pc } => *pc,
        }
    }
}
