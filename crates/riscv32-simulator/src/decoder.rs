//! Instruction decoder for RISC-V 32-bit instructions.

use riscv32_assembler::{
    decode_imm, Format, Funct3, Mnemonic, RoundingMode, OP, OP_AMO, OP_AUIPC,
    OP_BRANCH, OP_FP, OP_IMM, OP_JAL, OP_JALR, OP_LOAD, OP_LOAD_FP, OP_LUI, OP_MADD,
    OP_MISC_MEM, OP_MSUB, OP_NMADD, OP_NMSUB, OP_STORE, OP_STORE_FP, OP_SYSTEM,
};

/// A decoded instruction word.
///
/// Register fields are raw numbers; which register file they index depends
/// on the mnemonic. `imm` is already sign-extended (for U-type it is the
/// final `imm << 12` value, for shifts the shift amount).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub mnemonic: Mnemonic,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub rs3: u8,
    pub imm: i32,
    pub rm: RoundingMode,
    pub word: u32,
}

/// Why a word could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// Not a valid RV32IMF encoding.
    Invalid(String),
    /// A recognized encoding outside the supported subset.
    Unimplemented(&'static str),
}

fn invalid<T>(reason: impl Into<String>) -> Result<T, DecodeFailure> {
    Err(DecodeFailure::Invalid(reason.into()))
}

/// Decode a 32-bit instruction word into a structured representation.
pub fn decode_instruction(word: u32) -> Result<DecodedInstruction, DecodeFailure> {
    use Mnemonic::*;

    let opcode = word & 0x7f;
    let rd = ((word >> 7) & 0x1f) as u8;
    let funct3 = (word >> 12) & 0x7;
    let rs1 = ((word >> 15) & 0x1f) as u8;
    let rs2 = ((word >> 20) & 0x1f) as u8;
    let funct7 = (word >> 25) & 0x7f;

    let mnemonic = match opcode {
        OP => match (funct7, funct3) {
            (0x00, 0b000) => Add,
            (0x20, 0b000) => Sub,
            (0x00, 0b001) => Sll,
            (0x00, 0b010) => Slt,
            (0x00, 0b011) => Sltu,
            (0x00, 0b100) => Xor,
            (0x00, 0b101) => Srl,
            (0x20, 0b101) => Sra,
            (0x00, 0b110) => Or,
            (0x00, 0b111) => And,
            (0x01, 0b000) => Mul,
            (0x01, 0b001) => Mulh,
            (0x01, 0b010) => Mulhsu,
            (0x01, 0b011) => Mulhu,
            (0x01, 0b100) => Div,
            (0x01, 0b101) => Divu,
            (0x01, 0b110) => Rem,
            (0x01, 0b111) => Remu,
            _ => return invalid(format!("unknown OP funct7=0x{funct7:02x} funct3={funct3}")),
        },
        OP_IMM => match (funct3, funct7) {
            (0b000, _) => Addi,
            (0b010, _) => Slti,
            (0b011, _) => Sltiu,
            (0b100, _) => Xori,
            (0b110, _) => Ori,
            (0b111, _) => Andi,
            (0b001, 0x00) => Slli,
            (0b101, 0x00) => Srli,
            (0b101, 0x20) => Srai,
            _ => return invalid(format!("invalid shift encoding funct7=0x{funct7:02x}")),
        },
        OP_LOAD => match funct3 {
            0b000 => Lb,
            0b001 => Lh,
            0b010 => Lw,
            0b100 => Lbu,
            0b101 => Lhu,
            _ => return invalid(format!("unknown load width funct3={funct3}")),
        },
        OP_STORE => match funct3 {
            0b000 => Sb,
            0b001 => Sh,
            0b010 => Sw,
            _ => return invalid(format!("unknown store width funct3={funct3}")),
        },
        OP_BRANCH => match funct3 {
            0b000 => Beq,
            0b001 => Bne,
            0b100 => Blt,
            0b101 => Bge,
            0b110 => Bltu,
            0b111 => Bgeu,
            _ => return invalid(format!("unknown branch funct3={funct3}")),
        },
        OP_LUI => Lui,
        OP_AUIPC => Auipc,
        OP_JAL => Jal,
        OP_JALR if funct3 == 0 => Jalr,
        OP_SYSTEM => match funct3 {
            0b000 => match (word >> 20, rd, rs1) {
                (0x000, 0, 0) => Ecall,
                (0x001, 0, 0) => Ebreak,
                (0x102, 0, 0) => return Err(DecodeFailure::Unimplemented("sret")),
                (0x302, 0, 0) => return Err(DecodeFailure::Unimplemented("mret")),
                (0x105, 0, 0) => return Err(DecodeFailure::Unimplemented("wfi")),
                _ => return invalid("unknown system instruction"),
            },
            0b001 => return Err(DecodeFailure::Unimplemented("csrrw")),
            0b010 => return Err(DecodeFailure::Unimplemented("csrrs")),
            0b011 => return Err(DecodeFailure::Unimplemented("csrrc")),
            0b101 => return Err(DecodeFailure::Unimplemented("csrrwi")),
            0b110 => return Err(DecodeFailure::Unimplemented("csrrsi")),
            0b111 => return Err(DecodeFailure::Unimplemented("csrrci")),
            _ => return invalid("unknown system funct3"),
        },
        OP_MISC_MEM => match funct3 {
            0b000 => Fence,
            0b001 => return Err(DecodeFailure::Unimplemented("fence.i")),
            _ => return invalid(format!("unknown MISC-MEM funct3={funct3}")),
        },
        OP_AMO => return Err(DecodeFailure::Unimplemented("amo")),
        OP_LOAD_FP if funct3 == 0b010 => Flw,
        OP_STORE_FP if funct3 == 0b010 => Fsw,
        OP_MADD | OP_MSUB | OP_NMSUB | OP_NMADD => {
            if funct7 & 0b11 != 0 {
                return invalid("only single-precision fused multiply-add is supported");
            }
            match opcode {
                OP_MADD => FmaddS,
                OP_MSUB => FmsubS,
                OP_NMSUB => FnmsubS,
                _ => FnmaddS,
            }
        }
        OP_FP => match (funct7, funct3, rs2) {
            (0x00, _, _) => FaddS,
            (0x04, _, _) => FsubS,
            (0x08, _, _) => FmulS,
            (0x0c, _, _) => FdivS,
            (0x2c, _, 0) => FsqrtS,
            (0x10, 0b000, _) => FsgnjS,
            (0x10, 0b001, _) => FsgnjnS,
            (0x10, 0b010, _) => FsgnjxS,
            (0x14, 0b000, _) => FminS,
            (0x14, 0b001, _) => FmaxS,
            (0x60, _, 0) => FcvtWS,
            (0x60, _, 1) => FcvtWuS,
            (0x68, _, 0) => FcvtSW,
            (0x68, _, 1) => FcvtSWu,
            (0x70, 0b000, 0) => FmvXW,
            (0x70, 0b001, 0) => FclassS,
            (0x78, 0b000, 0) => FmvWX,
            (0x50, 0b010, _) => FeqS,
            (0x50, 0b001, _) => FltS,
            (0x50, 0b000, _) => FleS,
            _ => {
                return invalid(format!(
                    "unknown OP-FP funct7=0x{funct7:02x} funct3={funct3} rs2={rs2}"
                ))
            }
        },
        _ => return invalid(format!("unknown opcode 0b{opcode:07b}")),
    };

    let rm = match mnemonic.encoding().funct3 {
        Funct3::RoundingMode => RoundingMode::from_bits(funct3).ok_or_else(|| {
            DecodeFailure::Invalid(format!("reserved rounding mode {funct3}"))
        })?,
        Funct3::Fixed(_) => RoundingMode::Dyn,
    };

    let imm = match mnemonic.format() {
        Format::IShift => rs2 as i32,
        Format::U => (word & 0xffff_f000) as i32,
        format => format
            .imm_format()
            .map_or(0, |imm_format| decode_imm(word, imm_format)),
    };

    Ok(DecodedInstruction {
        mnemonic,
        rd,
        rs1,
        rs2,
        rs3: ((word >> 27) & 0x1f) as u8,
        imm,
        rm,
        word,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use riscv32_assembler::{encode_instruction, SymbolResolver};
    use strum::IntoEnumIterator;

    fn word(text: &str) -> u32 {
        encode_instruction(text, 0x0040_0000, &SymbolResolver::new()).unwrap()
    }

    /// Build a word with every register field set from a mnemonic's fixed fields.
    fn synthesize(mnemonic: Mnemonic) -> u32 {
        let e = mnemonic.encoding();
        match mnemonic {
            Mnemonic::Ecall => return 0x0000_0073,
            Mnemonic::Ebreak => return 0x0010_0073,
            _ => {}
        }
        let funct3 = match e.funct3 {
            Funct3::Fixed(value) => value,
            Funct3::RoundingMode => RoundingMode::Rtz.bits(),
        };
        let rs2 = u32::from(e.rs2.unwrap_or(3));
        let upper = if e.format == Format::FpR4 { 4 << 2 } else { e.funct7 };
        e.opcode | (1 << 7) | (funct3 << 12) | (2 << 15) | (rs2 << 20) | (upper << 25)
    }

    #[test]
    fn test_every_mnemonic_decodes_to_itself() {
        for mnemonic in Mnemonic::iter() {
            let word = synthesize(mnemonic);
            let decoded = decode_instruction(word)
                .unwrap_or_else(|e| panic!("{mnemonic}: 0x{word:08x} failed: {e:?}"));
            assert_eq!(decoded.mnemonic, mnemonic, "word 0x{word:08x}");
        }
    }

    #[test]
    fn test_fields_and_immediates() {
        let d = decode_instruction(word("addi a0, sp, -4")).unwrap();
        assert_eq!((d.mnemonic, d.rd, d.rs1, d.imm), (Mnemonic::Addi, 10, 2, -4));

        let d = decode_instruction(word("sw a0, -8(sp)")).unwrap();
        assert_eq!((d.rs1, d.rs2, d.imm), (2, 10, -8));

        let d = decode_instruction(word("lui t0, -524288")).unwrap();
        assert_eq!(d.imm as u32, 0x8000_0000);

        let d = decode_instruction(word("srai t0, t0, 31")).unwrap();
        assert_eq!((d.mnemonic, d.imm), (Mnemonic::Srai, 31));

        let d = decode_instruction(word("beq x0, x0, -16")).unwrap();
        assert_eq!(d.imm, -16);

        let d = decode_instruction(word("fmadd.s f1, f2, f3, f4, rup")).unwrap();
        assert_eq!((d.rd, d.rs1, d.rs2, d.rs3), (1, 2, 3, 4));
        assert_eq!(d.rm, RoundingMode::Rup);
    }

    #[test]
    fn test_unimplemented_encodings() {
        // csrrs a0, cycle, zero
        assert_eq!(
            decode_instruction(0xc000_2573),
            Err(DecodeFailure::Unimplemented("csrrs"))
        );
        // amoadd.w a0, a1, (a2)
        assert_eq!(
            decode_instruction(0x00b6_252f),
            Err(DecodeFailure::Unimplemented("amo"))
        );
    }

    #[test]
    fn test_invalid_encodings() {
        assert!(matches!(decode_instruction(0), Err(DecodeFailure::Invalid(_))));
        assert!(matches!(
            decode_instruction(0xffff_ffff),
            Err(DecodeFailure::Invalid(_))
        ));
        // fadd.s with reserved rm=5
        let reserved = (word("fadd.s f1, f2, f3") & !(0b111 << 12)) | (0b101 << 12);
        assert!(matches!(
            decode_instruction(reserved),
            Err(DecodeFailure::Invalid(_))
        ));
    }
}
