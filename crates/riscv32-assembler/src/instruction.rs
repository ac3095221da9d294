//! Encoding of a single instruction line.

use std::str::FromStr;

use crate::{
    encode::{b_type, i_type, j_type, r4_type, r_type, s_type, shift_type, u_type, ImmFormat},
    error::AsmErrorKind,
    inst::{Format, Funct3, Mnemonic, RoundingMode},
    parse, pseudo,
    regs::normalize_registers,
    symbols::{Relocation, SymbolResolver},
};

const ECALL: u32 = 0x0000_0073;
const EBREAK: u32 = 0x0010_0073;
/// `fence iorw, iorw`
const FENCE: u32 = 0x0ff0_000f;

/// Assemble one instruction (text after any label) located at `address`.
pub fn encode_instruction(
    text: &str,
    address: u32,
    resolver: &SymbolResolver,
) -> Result<u32, AsmErrorKind> {
    let normalized = normalize_registers(text.trim());
    let (_, (name, ops)) = parse::instruction(&normalized)
        .map_err(|_| AsmErrorKind::Syntax(format!("malformed instruction `{}`", text.trim())))?;

    let (mnemonic, ops) = match pseudo::expand(name, &ops) {
        Some(expanded) => expanded,
        None => {
            let mnemonic = Mnemonic::from_str(name)
                .map_err(|_| AsmErrorKind::UnsupportedOpcode(name.to_ascii_uppercase()))?;
            (mnemonic, ops.into_iter().map(String::from).collect())
        }
    };

    Operands {
        mnemonic,
        ops: &ops,
        address,
        resolver,
    }
    .encode()
}

struct Operands<'a> {
    mnemonic: Mnemonic,
    ops: &'a [String],
    address: u32,
    resolver: &'a SymbolResolver,
}

fn register_num(token: &str, prefix: char) -> Result<u8, AsmErrorKind> {
    token
        .strip_prefix(prefix)
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| *n < 32)
        .ok_or_else(|| AsmErrorKind::InvalidRegister(token.to_string()))
}

impl Operands<'_> {
    fn arity(&self, expected: usize) -> Result<(), AsmErrorKind> {
        if self.ops.len() == expected {
            Ok(())
        } else {
            Err(AsmErrorKind::Syntax(format!(
                "`{}` expects {} operand(s), got {}",
                self.mnemonic,
                expected,
                self.ops.len()
            )))
        }
    }

    fn x(&self, i: usize) -> Result<u8, AsmErrorKind> {
        register_num(&self.ops[i], 'x')
    }

    fn f(&self, i: usize) -> Result<u8, AsmErrorKind> {
        register_num(&self.ops[i], 'f')
    }

    fn imm(&self, i: usize, format: ImmFormat) -> Result<i64, AsmErrorKind> {
        let relocation = if format.is_pc_relative() {
            Relocation::PcRelative
        } else {
            Relocation::Absolute
        };
        self.resolver.resolve(&self.ops[i], relocation, self.address)
    }

    /// Check arity and produce funct3: either the fixed value or an optional
    /// trailing rounding-mode operand after `base` operands.
    fn funct3(&self, base: usize) -> Result<u32, AsmErrorKind> {
        match self.mnemonic.encoding().funct3 {
            Funct3::Fixed(value) => {
                self.arity(base)?;
                Ok(value)
            }
            Funct3::RoundingMode if self.ops.len() == base + 1 => {
                let token = &self.ops[base];
                RoundingMode::from_str(token)
                    .map(RoundingMode::bits)
                    .map_err(|_| AsmErrorKind::Syntax(format!("unknown rounding mode `{}`", token)))
            }
            Funct3::RoundingMode => {
                self.arity(base)?;
                Ok(RoundingMode::Dyn.bits())
            }
        }
    }

    fn encode(&self) -> Result<u32, AsmErrorKind> {
        let e = self.mnemonic.encoding();
        let fixed_rs2 = e.rs2.unwrap_or(0);
        match e.format {
            Format::R => {
                let funct3 = self.funct3(3)?;
                Ok(r_type(e.opcode, self.x(0)?, funct3, self.x(1)?, self.x(2)?, e.funct7))
            }
            Format::I => {
                let funct3 = self.funct3(3)?;
                i_type(e.opcode, self.x(0)?, funct3, self.x(1)?, self.imm(2, ImmFormat::I)?)
            }
            Format::IShift => {
                let funct3 = self.funct3(3)?;
                let shamt = self.resolver.resolve(&self.ops[2], Relocation::Absolute, self.address)?;
                shift_type(e.opcode, self.x(0)?, funct3, self.x(1)?, shamt, e.funct7)
            }
            Format::S => {
                let funct3 = self.funct3(3)?;
                s_type(e.opcode, funct3, self.x(1)?, self.x(0)?, self.imm(2, ImmFormat::S)?)
            }
            Format::B => {
                let funct3 = self.funct3(3)?;
                b_type(e.opcode, funct3, self.x(0)?, self.x(1)?, self.imm(2, ImmFormat::B)?)
            }
            Format::U => {
                self.arity(2)?;
                u_type(e.opcode, self.x(0)?, self.imm(1, ImmFormat::U)?)
            }
            Format::J => {
                self.arity(2)?;
                j_type(e.opcode, self.x(0)?, self.imm(1, ImmFormat::J)?)
            }
            Format::System => {
                self.arity(0)?;
                Ok(match self.mnemonic {
                    Mnemonic::Ebreak => EBREAK,
                    Mnemonic::Fence => FENCE,
                    _ => ECALL,
                })
            }
            Format::FpLoad => {
                let funct3 = self.funct3(3)?;
                i_type(e.opcode, self.f(0)?, funct3, self.x(1)?, self.imm(2, ImmFormat::I)?)
            }
            Format::FpStore => {
                let funct3 = self.funct3(3)?;
                s_type(e.opcode, funct3, self.x(1)?, self.f(0)?, self.imm(2, ImmFormat::S)?)
            }
            Format::FpR => {
                let funct3 = self.funct3(3)?;
                Ok(r_type(e.opcode, self.f(0)?, funct3, self.f(1)?, self.f(2)?, e.funct7))
            }
            Format::FpR4 => {
                let rm = self.funct3(4)?;
                Ok(r4_type(e.opcode, self.f(0)?, rm, self.f(1)?, self.f(2)?, self.f(3)?))
            }
            Format::FpUnary => {
                let funct3 = self.funct3(2)?;
                Ok(r_type(e.opcode, self.f(0)?, funct3, self.f(1)?, fixed_rs2, e.funct7))
            }
            Format::FpCmp => {
                let funct3 = self.funct3(3)?;
                Ok(r_type(e.opcode, self.x(0)?, funct3, self.f(1)?, self.f(2)?, e.funct7))
            }
            Format::FpToInt => {
                let funct3 = self.funct3(2)?;
                Ok(r_type(e.opcode, self.x(0)?, funct3, self.f(1)?, fixed_rs2, e.funct7))
            }
            Format::IntToFp => {
                let funct3 = self.funct3(2)?;
                Ok(r_type(e.opcode, self.f(0)?, funct3, self.x(1)?, fixed_rs2, e.funct7))
            }
        }
    }
}
