//! RISC-V 32-bit instruction disassembly.

use core::fmt;

use riscv32_assembler::{Format, Fpr, Funct3, Gpr, Mnemonic, RoundingMode};

use crate::decoder::{decode_instruction, DecodeFailure, DecodedInstruction};
use crate::memory::Memory;

fn x(reg: u8) -> Gpr {
    Gpr::new(reg & 0x1f)
}

fn f(reg: u8) -> Fpr {
    Fpr::new(reg & 0x1f)
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.mnemonic.name();
        let (rd, rs1, rs2, imm) = (self.rd, self.rs1, self.rs2, self.imm);
        match self.mnemonic.format() {
            Format::R => write!(out, "{name} {}, {}, {}", x(rd), x(rs1), x(rs2))?,
            Format::I => match self.mnemonic {
                Mnemonic::Lb
                | Mnemonic::Lh
                | Mnemonic::Lw
                | Mnemonic::Lbu
                | Mnemonic::Lhu
                | Mnemonic::Jalr => write!(out, "{name} {}, {imm}({})", x(rd), x(rs1))?,
                _ => write!(out, "{name} {}, {}, {imm}", x(rd), x(rs1))?,
            },
            Format::IShift => write!(out, "{name} {}, {}, {imm}", x(rd), x(rs1))?,
            Format::S => write!(out, "{name} {}, {imm}({})", x(rs2), x(rs1))?,
            Format::B => write!(out, "{name} {}, {}, {imm}", x(rs1), x(rs2))?,
            Format::U => write!(out, "{name} {}, 0x{:05x}", x(rd), (imm as u32) >> 12)?,
            Format::J => write!(out, "{name} {}, {imm}", x(rd))?,
            Format::System => write!(out, "{name}")?,
            Format::FpLoad => write!(out, "{name} {}, {imm}({})", f(rd), x(rs1))?,
            Format::FpStore => write!(out, "{name} {}, {imm}({})", f(rs2), x(rs1))?,
            Format::FpR => write!(out, "{name} {}, {}, {}", f(rd), f(rs1), f(rs2))?,
            Format::FpR4 => write!(
                out,
                "{name} {}, {}, {}, {}",
                f(rd),
                f(rs1),
                f(rs2),
                f(self.rs3)
            )?,
            Format::FpUnary => write!(out, "{name} {}, {}", f(rd), f(rs1))?,
            Format::FpCmp => write!(out, "{name} {}, {}, {}", x(rd), f(rs1), f(rs2))?,
            Format::FpToInt => write!(out, "{name} {}, {}", x(rd), f(rs1))?,
            Format::IntToFp => write!(out, "{name} {}, {}", f(rd), x(rs1))?,
        }
        if self.mnemonic.encoding().funct3 == Funct3::RoundingMode && self.rm != RoundingMode::Dyn
        {
            write!(out, ", {}", self.rm)?;
        }
        Ok(())
    }
}

/// Disassemble a single RISC-V 32-bit instruction.
///
/// Returns a human-readable string like "add a0, a1, a2" or "jal ra, 16".
pub fn disassemble_instruction(word: u32) -> String {
    match decode_instruction(word) {
        Ok(decoded) => decoded.to_string(),
        Err(DecodeFailure::Unimplemented(name)) => format!("{name} (unimplemented)"),
        Err(DecodeFailure::Invalid(_)) => format!("unknown 0x{word:08x}"),
    }
}

/// Disassemble `count` words of memory starting at `start`, one line each.
///
/// Words with an unmapped byte are shown as `<unmapped>`. The line at
/// `highlight_pc` is marked with `>>> `.
pub fn disassemble_range(
    memory: &Memory,
    start: u32,
    count: u32,
    highlight_pc: Option<u32>,
) -> String {
    let mut out = String::new();
    for i in 0..count {
        let address = start.wrapping_add(i * 4);
        let marker = if highlight_pc == Some(address) {
            ">>> "
        } else {
            "    "
        };
        let bytes = memory.read_range(address, 4);
        let line = match (bytes[0], bytes[1], bytes[2], bytes[3]) {
            (Some(b0), Some(b1), Some(b2), Some(b3)) => {
                let word = u32::from_le_bytes([b0, b1, b2, b3]);
                format!("0x{word:08x}  {}", disassemble_instruction(word))
            }
            _ => String::from("<unmapped>"),
        };
        out.push_str(&format!("{marker}0x{address:08x}: {line}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use riscv32_assembler::{encode_instruction, SymbolResolver};

    fn round_trip(text: &str) -> String {
        let word = encode_instruction(text, 0x0040_0000, &SymbolResolver::new()).unwrap();
        disassemble_instruction(word)
    }

    #[test]
    fn test_abi_names() {
        assert_eq!(round_trip("add x10, x11, x12"), "add a0, a1, a2");
        assert_eq!(round_trip("lw x10, 4(x2)"), "lw a0, 4(sp)");
        assert_eq!(round_trip("sw a0, -4(sp)"), "sw a0, -4(sp)");
        assert_eq!(round_trip("jal ra, 16"), "jal ra, 16");
        assert_eq!(round_trip("lui t0, 0x12345"), "lui t0, 0x12345");
        assert_eq!(round_trip("ecall"), "ecall");
    }

    #[test]
    fn test_float_forms() {
        assert_eq!(round_trip("fadd.s f10, f11, f12"), "fadd.s fa0, fa1, fa2");
        assert_eq!(round_trip("fcvt.w.s a0, fa0, rtz"), "fcvt.w.s a0, fa0, rtz");
        assert_eq!(round_trip("flw fa0, 8(a0)"), "flw fa0, 8(a0)");
        assert_eq!(round_trip("feq.s a0, fa0, fa1"), "feq.s a0, fa0, fa1");
    }

    #[test]
    fn test_undecodable() {
        assert_eq!(disassemble_instruction(0), "unknown 0x00000000");
        assert_eq!(disassemble_instruction(0xc000_2573), "csrrs (unimplemented)");
    }

    #[test]
    fn test_range_marks_pc() {
        let mut memory = Memory::new();
        crate::memory::Bus::write_word(&mut memory, 0x100, 0x0000_0073);
        let text = disassemble_range(&memory, 0x100, 2, Some(0x100));
        assert_eq!(
            text,
            ">>> 0x00000100: 0x00000073  ecall\n    0x00000104: <unmapped>\n"
        );
    }
}
