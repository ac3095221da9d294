//! Bit-level instruction layouts and immediate packing.
//!
//! Every RV32 instruction is one of a handful of layouts. The builders here
//! take already-validated register numbers and place fields; immediates go
//! through [`encode_imm`], which range-checks against the signed width of the
//! target format before scattering the bits.

use strum::Display;

use crate::error::AsmErrorKind;

/// Immediate-bearing instruction formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ImmFormat {
    I,
    S,
    B,
    U,
    J,
}

impl ImmFormat {
    /// Signed width of the immediate.
    pub const fn bits(self) -> u32 {
        match self {
            ImmFormat::I | ImmFormat::S => 12,
            ImmFormat::B => 13,
            ImmFormat::U => 20,
            ImmFormat::J => 21,
        }
    }

    /// Branch and jump immediates are offsets from the instruction address.
    pub const fn is_pc_relative(self) -> bool {
        matches!(self, ImmFormat::B | ImmFormat::J)
    }

    /// Inclusive minimum and exclusive maximum.
    pub const fn range(self) -> (i64, i64) {
        let half = 1i64 << (self.bits() - 1);
        (-half, half)
    }
}

/// Sign-extend the low `bits` bits of `value`.
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Validate `value` for `format` and return its two's-complement bits,
/// masked to the format width.
pub fn check_imm(value: i64, format: ImmFormat) -> Result<u32, AsmErrorKind> {
    let (min, max) = format.range();
    if value < min || value >= max {
        return Err(AsmErrorKind::ImmediateOutOfRange {
            value,
            format,
            bits: format.bits(),
        });
    }
    if format.is_pc_relative() && value % 2 != 0 {
        return Err(AsmErrorKind::MisalignedOffset { value, format });
    }
    let mask = (1u32 << format.bits()) - 1;
    Ok(value as u32 & mask)
}

/// Place immediate bits into their instruction-word positions.
pub fn scatter_imm(imm: u32, format: ImmFormat) -> u32 {
    match format {
        ImmFormat::I => (imm & 0xfff) << 20,
        ImmFormat::S => (((imm >> 5) & 0x7f) << 25) | ((imm & 0x1f) << 7),
        ImmFormat::B => {
            (((imm >> 12) & 0x1) << 31)
                | (((imm >> 5) & 0x3f) << 25)
                | (((imm >> 1) & 0xf) << 8)
                | (((imm >> 11) & 0x1) << 7)
        }
        ImmFormat::U => (imm & 0xfffff) << 12,
        ImmFormat::J => {
            (((imm >> 20) & 0x1) << 31)
                | (((imm >> 1) & 0x3ff) << 21)
                | (((imm >> 11) & 0x1) << 20)
                | (((imm >> 12) & 0xff) << 12)
        }
    }
}

/// Range-check and scatter in one go.
pub fn encode_imm(value: i64, format: ImmFormat) -> Result<u32, AsmErrorKind> {
    Ok(scatter_imm(check_imm(value, format)?, format))
}

/// Inverse of [`encode_imm`]: gather and sign-extend the immediate of `word`.
///
/// For U-type this returns the 20-bit field value, not the shifted operand.
pub fn decode_imm(word: u32, format: ImmFormat) -> i32 {
    match format {
        ImmFormat::I => (word as i32) >> 20,
        ImmFormat::S => (((word as i32) >> 25) << 5) | ((word >> 7) & 0x1f) as i32,
        ImmFormat::B => {
            let imm = (((word >> 31) & 0x1) << 12)
                | (((word >> 7) & 0x1) << 11)
                | (((word >> 25) & 0x3f) << 5)
                | (((word >> 8) & 0xf) << 1);
            sign_extend(imm, 13)
        }
        ImmFormat::U => (word as i32) >> 12,
        ImmFormat::J => {
            let imm = (((word >> 31) & 0x1) << 20)
                | (((word >> 12) & 0xff) << 12)
                | (((word >> 20) & 0x1) << 11)
                | (((word >> 21) & 0x3ff) << 1);
            sign_extend(imm, 21)
        }
    }
}

/// R-type: `funct7 | rs2 | rs1 | funct3 | rd | opcode`.
pub fn r_type(opcode: u32, rd: u8, funct3: u32, rs1: u8, rs2: u8, funct7: u32) -> u32 {
    ((funct7 & 0x7f) << 25)
        | ((rs2 as u32 & 0x1f) << 20)
        | ((rs1 as u32 & 0x1f) << 15)
        | ((funct3 & 0x7) << 12)
        | ((rd as u32 & 0x1f) << 7)
        | (opcode & 0x7f)
}

/// R4-type (fused multiply-add): `rs3 | fmt=00 | rs2 | rs1 | rm | rd | opcode`.
pub fn r4_type(opcode: u32, rd: u8, rm: u32, rs1: u8, rs2: u8, rs3: u8) -> u32 {
    ((rs3 as u32 & 0x1f) << 27) | r_type(opcode, rd, rm, rs1, rs2, 0)
}

pub fn i_type(opcode: u32, rd: u8, funct3: u32, rs1: u8, imm: i64) -> Result<u32, AsmErrorKind> {
    Ok(encode_imm(imm, ImmFormat::I)? | r_type(opcode, rd, funct3, rs1, 0, 0))
}

/// I-type shift: the immediate is `funct7 | shamt[4:0]`.
pub fn shift_type(
    opcode: u32,
    rd: u8,
    funct3: u32,
    rs1: u8,
    shamt: i64,
    funct7: u32,
) -> Result<u32, AsmErrorKind> {
    if !(0..32).contains(&shamt) {
        return Err(AsmErrorKind::ShiftOutOfRange(shamt));
    }
    Ok(r_type(opcode, rd, funct3, rs1, shamt as u8, funct7))
}

pub fn s_type(opcode: u32, funct3: u32, rs1: u8, rs2: u8, imm: i64) -> Result<u32, AsmErrorKind> {
    Ok(encode_imm(imm, ImmFormat::S)? | r_type(opcode, 0, funct3, rs1, rs2, 0))
}

pub fn b_type(opcode: u32, funct3: u32, rs1: u8, rs2: u8, imm: i64) -> Result<u32, AsmErrorKind> {
    Ok(encode_imm(imm, ImmFormat::B)? | r_type(opcode, 0, funct3, rs1, rs2, 0))
}

pub fn u_type(opcode: u32, rd: u8, imm: i64) -> Result<u32, AsmErrorKind> {
    Ok(encode_imm(imm, ImmFormat::U)? | r_type(opcode, rd, 0, 0, 0, 0))
}

pub fn j_type(opcode: u32, rd: u8, imm: i64) -> Result<u32, AsmErrorKind> {
    Ok(encode_imm(imm, ImmFormat::J)? | r_type(opcode, rd, 0, 0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ImmFormat; 5] = [
        ImmFormat::I,
        ImmFormat::S,
        ImmFormat::B,
        ImmFormat::U,
        ImmFormat::J,
    ];

    #[test]
    fn test_immediate_boundaries() {
        for format in ALL {
            let (min, max) = format.range();
            let top = if format.is_pc_relative() { max - 2 } else { max - 1 };
            assert!(check_imm(min, format).is_ok(), "{format}: min {min}");
            assert!(check_imm(top, format).is_ok(), "{format}: top {top}");
            assert!(
                matches!(
                    check_imm(max, format),
                    Err(AsmErrorKind::ImmediateOutOfRange { .. })
                ),
                "{format}: {max} should be rejected"
            );
            assert!(
                matches!(
                    check_imm(min - 1, format),
                    Err(AsmErrorKind::ImmediateOutOfRange { .. })
                ),
                "{format}: {} should be rejected",
                min - 1
            );
        }
    }

    #[test]
    fn test_twelve_bit_boundary() {
        assert!(encode_imm(2047, ImmFormat::I).is_ok());
        assert!(encode_imm(-2048, ImmFormat::I).is_ok());
        assert!(encode_imm(2048, ImmFormat::I).is_err());
        assert!(encode_imm(-2049, ImmFormat::S).is_err());
    }

    #[test]
    fn test_decode_inverts_encode() {
        for format in ALL {
            let (min, max) = format.range();
            let step = if format.is_pc_relative() { 2 } else { 1 };
            for value in [min, min + step, -step, 0, step, 100 * step, max - step] {
                let word = encode_imm(value, format).unwrap();
                assert_eq!(decode_imm(word, format) as i64, value, "{format}: {value}");
            }
        }
    }

    #[test]
    fn test_odd_branch_offset_rejected() {
        assert_eq!(
            check_imm(3, ImmFormat::B),
            Err(AsmErrorKind::MisalignedOffset {
                value: 3,
                format: ImmFormat::B
            })
        );
        assert!(check_imm(-5, ImmFormat::J).is_err());
    }

    #[test]
    fn test_known_encodings() {
        // addi t0, zero, 5
        assert_eq!(i_type(0x13, 5, 0, 0, 5).unwrap(), 0x0050_0293);
        // beq zero, zero, 8
        assert_eq!(b_type(0x63, 0, 0, 0, 8).unwrap(), 0x0000_0463);
        // jal ra, 2048
        assert_eq!(j_type(0x6f, 1, 2048).unwrap(), 0x0010_00ef);
        // sw a0, -4(sp)
        assert_eq!(s_type(0x23, 2, 2, 10, -4).unwrap(), 0xfea1_2e23);
        // srai a0, a0, 3
        assert_eq!(shift_type(0x13, 10, 5, 10, 3, 0x20).unwrap(), 0x4035_5513);
    }

    #[test]
    fn test_shift_amount_range() {
        assert!(shift_type(0x13, 1, 1, 1, 31, 0).is_ok());
        assert_eq!(
            shift_type(0x13, 1, 1, 1, 32, 0),
            Err(AsmErrorKind::ShiftOutOfRange(32))
        );
        assert!(shift_type(0x13, 1, 1, 1, -1, 0).is_err());
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0xfff, 12), -1);
        assert_eq!(sign_extend(0x7ff, 12), 2047);
        assert_eq!(sign_extend(0x1000, 13), -4096);
    }
}
