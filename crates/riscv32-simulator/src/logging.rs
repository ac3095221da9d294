//! Per-instruction trace records.

use core::fmt;

use riscv32_assembler::{Fpr, Gpr};

use crate::disasm::disassemble_instruction;

/// Logging verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// No logging.
    None,
    /// Report step failures through `log::error!`.
    Errors,
    /// Keep a rolling trace of executed instructions.
    Instructions,
    /// Trace, and also emit each record through `log::debug!`.
    Verbose,
}

/// Side effects of one executed instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionLog {
    pub cycle: u64,
    pub pc: u32,
    pub instruction: u32,
    /// `(reg, old, new)`; writes to `x0` are not recorded.
    pub regs_written: Vec<(Gpr, i32, i32)>,
    pub fregs_written: Vec<(Fpr, f32, f32)>,
    /// `(address, size, value)`
    pub memory_reads: Vec<(u32, usize, u32)>,
    /// `(address, size, value)`
    pub memory_writes: Vec<(u32, usize, u32)>,
    /// Set when control flow left the fall-through path.
    pub jump_target: Option<u32>,
}

impl InstructionLog {
    pub fn new(cycle: u64, pc: u32, instruction: u32) -> Self {
        Self {
            cycle,
            pc,
            instruction,
            regs_written: Vec::new(),
            fregs_written: Vec::new(),
            memory_reads: Vec::new(),
            memory_writes: Vec::new(),
            jump_target: None,
        }
    }
}

impl fmt::Display for InstructionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:4}] 0x{:08x}: {}",
            self.cycle,
            self.pc,
            disassemble_instruction(self.instruction)
        )?;
        for (reg, old, new) in &self.regs_written {
            write!(f, "\n    {}: {} -> {}", reg, old, new)?;
        }
        for (reg, old, new) in &self.fregs_written {
            write!(f, "\n    {}: {} -> {}", reg, old, new)?;
        }
        for (address, size, value) in &self.memory_reads {
            write!(f, "\n    mem[0x{:08x}; {}] = 0x{:x}", address, size, value)?;
        }
        for (address, size, value) in &self.memory_writes {
            write!(f, "\n    mem[0x{:08x}; {}] <- 0x{:x}", address, size, value)?;
        }
        if let Some(target) = self.jump_target {
            write!(f, "\n    jump: 0x{:08x} -> 0x{:08x}", self.pc, target)?;
        }
        Ok(())
    }
}
