//! Two-pass assembler for RISC-V RV32I, RV32M and RV32F (single precision).
//!
//! Source text goes through a first pass that lays out labels, directives
//! and data, and a second pass that encodes instructions once every label
//! has an address. The result is a [`Program`]: a sparse little-endian
//! memory image plus the encoded instruction list.
//!
//! ```
//! let program = riscv32_assembler::assemble("addi a0, zero, 42\necall").unwrap();
//! assert_eq!(program.instructions()[0].word, 0x02a0_0513);
//! ```

mod asm;
mod directive;
mod encode;
mod error;
mod inst;
mod instruction;
mod parse;
mod program;
mod pseudo;
mod regs;
mod symbols;

pub use asm::{assemble, Assembler, ParsedLine, Section, DATA_BASE, TEXT_BASE};
pub use directive::Directive;
pub use encode::{decode_imm, encode_imm, sign_extend, ImmFormat};
pub use error::{AsmError, AsmErrorKind};
pub use inst::*;
pub use instruction::encode_instruction;
pub use parse::{is_identifier, parse_int_literal};
pub use program::{AssembledInstruction, MemoryImage, Program};
pub use regs::{lookup_alias, normalize_registers, Fpr, Gpr, Register};
pub use symbols::{Relocation, Symbol, SymbolResolver};
