//! RISC-V 32-bit simulator for programs built by `riscv32-assembler`.
//!
//! A [`Cpu`] owns a register file and sparse paged [`Memory`]. Programs are
//! loaded from an assembled [`Program`](riscv32_assembler::Program), then
//! executed one instruction at a time with [`Cpu::step`] or to completion
//! with the async [`Cpu::run`], which yields between instructions so a host
//! can stop it or redraw.
//!
//! ```
//! use riscv32_simulator::{BufferConsole, Cpu, RunOutcome};
//!
//! let program = riscv32_assembler::assemble(
//!     ".text\n li a0, 42\n li a7, 1\n ecall\n li a0, 0\n li a7, 93\n ecall",
//! )
//! .unwrap();
//! let console = BufferConsole::new();
//! let mut cpu = Cpu::new().with_console(console.clone());
//! cpu.load_program(&program);
//! let outcome = futures::executor::block_on(cpu.run()).unwrap();
//! assert_eq!(outcome, RunOutcome::Exited(0));
//! assert_eq!(console.text(), "42");
//! ```

mod cpu;
mod decoder;
mod disasm;
mod error;
mod executor;
pub mod helpers;
mod logging;
mod memory;
mod registers;
mod syscall;

pub use cpu::{
    Cpu, CpuStatus, HaltReason, Observer, RunOutcome, StepResult, StopHandle, DEFAULT_MAX_STEPS,
};
pub use decoder::{decode_instruction, DecodeFailure, DecodedInstruction};
pub use disasm::{disassemble_instruction, disassemble_range};
pub use error::{MemoryAccessKind, MemoryError, SimError};
pub use executor::{fcvt_w, fcvt_wu, fclass};
pub use logging::{InstructionLog, LogLevel};
pub use memory::{Bus, Memory, PAGE_SIZE};
pub use registers::RegisterFile;
pub use syscall::{
    handle_syscall, BufferConsole, Console, StdoutConsole, Syscall, SyscallInfo, SyscallOutcome,
    PRINT_STRING_LIMIT,
};
