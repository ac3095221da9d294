//! The RV32IMF instruction table.
//!
//! Each [`Mnemonic`] carries an [`Encoding`] descriptor: the operand shape
//! ([`Format`]) plus the fixed opcode/funct fields. The assembler reads the
//! descriptor to lay out a word; the simulator's decoder produces a
//! `Mnemonic` from a word and is checked against the same table.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::encode::ImmFormat;

pub const OP_LOAD: u32 = 0b000_0011;
pub const OP_LOAD_FP: u32 = 0b000_0111;
pub const OP_MISC_MEM: u32 = 0b000_1111;
pub const OP_IMM: u32 = 0b001_0011;
pub const OP_AUIPC: u32 = 0b001_0111;
pub const OP_STORE: u32 = 0b010_0011;
pub const OP_STORE_FP: u32 = 0b010_0111;
pub const OP_AMO: u32 = 0b010_1111;
pub const OP: u32 = 0b011_0011;
pub const OP_LUI: u32 = 0b011_0111;
pub const OP_MADD: u32 = 0b100_0011;
pub const OP_MSUB: u32 = 0b100_0111;
pub const OP_NMSUB: u32 = 0b100_1011;
pub const OP_NMADD: u32 = 0b100_1111;
pub const OP_FP: u32 = 0b101_0011;
pub const OP_BRANCH: u32 = 0b110_0011;
pub const OP_JALR: u32 = 0b110_0111;
pub const OP_JAL: u32 = 0b110_1111;
pub const OP_SYSTEM: u32 = 0b111_0011;

/// Operand shape of an instruction, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `rd, rs1, rs2`
    R,
    /// `rd, rs1, imm` (arithmetic, loads, `jalr`)
    I,
    /// `rd, rs1, shamt`
    IShift,
    /// `rs2, rs1, imm`
    S,
    /// `rs1, rs2, target`
    B,
    /// `rd, imm`
    U,
    /// `rd, target`
    J,
    /// no operands (`ecall`, `ebreak`, `fence`)
    System,
    /// `fd, rs1, imm`
    FpLoad,
    /// `fs2, rs1, imm`
    FpStore,
    /// `fd, fs1, fs2 [, rm]`
    FpR,
    /// `fd, fs1, fs2, fs3 [, rm]`
    FpR4,
    /// `fd, fs1 [, rm]`
    FpUnary,
    /// `rd, fs1, fs2`
    FpCmp,
    /// `rd, fs1 [, rm]`
    FpToInt,
    /// `fd, rs1 [, rm]`
    IntToFp,
}

impl Format {
    /// The immediate format this operand shape carries, if any.
    pub fn imm_format(self) -> Option<ImmFormat> {
        match self {
            Format::I | Format::FpLoad => Some(ImmFormat::I),
            Format::S | Format::FpStore => Some(ImmFormat::S),
            Format::B => Some(ImmFormat::B),
            Format::U => Some(ImmFormat::U),
            Format::J => Some(ImmFormat::J),
            _ => None,
        }
    }
}

/// The funct3 field: either a fixed selector or the rounding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Funct3 {
    Fixed(u32),
    RoundingMode,
}

/// Fixed bit fields of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    pub format: Format,
    pub opcode: u32,
    pub funct3: Funct3,
    pub funct7: u32,
    /// Fixed rs2 field, used by unary float ops and conversions.
    pub rs2: Option<u8>,
}

const fn enc(format: Format, opcode: u32, funct3: u32, funct7: u32) -> Encoding {
    Encoding {
        format,
        opcode,
        funct3: Funct3::Fixed(funct3),
        funct7,
        rs2: None,
    }
}

const fn enc_rm(format: Format, opcode: u32, funct7: u32, rs2: Option<u8>) -> Encoding {
    Encoding {
        format,
        opcode,
        funct3: Funct3::RoundingMode,
        funct7,
        rs2,
    }
}

const fn enc_fixed_rs2(format: Format, funct3: u32, funct7: u32, rs2: u8) -> Encoding {
    Encoding {
        format,
        opcode: OP_FP,
        funct3: Funct3::Fixed(funct3),
        funct7,
        rs2: Some(rs2),
    }
}

/// Every instruction the assembler and simulator know about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr, Display,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mnemonic {
    // RV32I register-register
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    // RV32M
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    // RV32I immediate
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    // loads and stores
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
    Sb,
    Sh,
    Sw,
    // control flow
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    Lui,
    Auipc,
    Jal,
    Jalr,
    // system
    Ecall,
    Ebreak,
    Fence,
    // RV32F
    Flw,
    Fsw,
    #[strum(serialize = "fadd.s")]
    FaddS,
    #[strum(serialize = "fsub.s")]
    FsubS,
    #[strum(serialize = "fmul.s")]
    FmulS,
    #[strum(serialize = "fdiv.s")]
    FdivS,
    #[strum(serialize = "fsqrt.s")]
    FsqrtS,
    #[strum(serialize = "fsgnj.s")]
    FsgnjS,
    #[strum(serialize = "fsgnjn.s")]
    FsgnjnS,
    #[strum(serialize = "fsgnjx.s")]
    FsgnjxS,
    #[strum(serialize = "fmin.s")]
    FminS,
    #[strum(serialize = "fmax.s")]
    FmaxS,
    #[strum(serialize = "fcvt.w.s")]
    FcvtWS,
    #[strum(serialize = "fcvt.wu.s")]
    FcvtWuS,
    #[strum(serialize = "fcvt.s.w")]
    FcvtSW,
    #[strum(serialize = "fcvt.s.wu")]
    FcvtSWu,
    #[strum(serialize = "fmv.x.w")]
    FmvXW,
    #[strum(serialize = "fmv.w.x")]
    FmvWX,
    #[strum(serialize = "feq.s")]
    FeqS,
    #[strum(serialize = "flt.s")]
    FltS,
    #[strum(serialize = "fle.s")]
    FleS,
    #[strum(serialize = "fclass.s")]
    FclassS,
    #[strum(serialize = "fmadd.s")]
    FmaddS,
    #[strum(serialize = "fmsub.s")]
    FmsubS,
    #[strum(serialize = "fnmsub.s")]
    FnmsubS,
    #[strum(serialize = "fnmadd.s")]
    FnmaddS,
}

impl Mnemonic {
    pub const fn encoding(self) -> Encoding {
        use Format::*;
        use Mnemonic::*;
        match self {
            Add => enc(R, OP, 0b000, 0b000_0000),
            Sub => enc(R, OP, 0b000, 0b010_0000),
            Sll => enc(R, OP, 0b001, 0b000_0000),
            Slt => enc(R, OP, 0b010, 0b000_0000),
            Sltu => enc(R, OP, 0b011, 0b000_0000),
            Xor => enc(R, OP, 0b100, 0b000_0000),
            Srl => enc(R, OP, 0b101, 0b000_0000),
            Sra => enc(R, OP, 0b101, 0b010_0000),
            Or => enc(R, OP, 0b110, 0b000_0000),
            And => enc(R, OP, 0b111, 0b000_0000),

            Mul => enc(R, OP, 0b000, 0b000_0001),
            Mulh => enc(R, OP, 0b001, 0b000_0001),
            Mulhsu => enc(R, OP, 0b010, 0b000_0001),
            Mulhu => enc(R, OP, 0b011, 0b000_0001),
            Div => enc(R, OP, 0b100, 0b000_0001),
            Divu => enc(R, OP, 0b101, 0b000_0001),
            Rem => enc(R, OP, 0b110, 0b000_0001),
            Remu => enc(R, OP, 0b111, 0b000_0001),

            Addi => enc(I, OP_IMM, 0b000, 0),
            Slti => enc(I, OP_IMM, 0b010, 0),
            Sltiu => enc(I, OP_IMM, 0b011, 0),
            Xori => enc(I, OP_IMM, 0b100, 0),
            Ori => enc(I, OP_IMM, 0b110, 0),
            Andi => enc(I, OP_IMM, 0b111, 0),
            Slli => enc(IShift, OP_IMM, 0b001, 0b000_0000),
            Srli => enc(IShift, OP_IMM, 0b101, 0b000_0000),
            Srai => enc(IShift, OP_IMM, 0b101, 0b010_0000),

            Lb => enc(I, OP_LOAD, 0b000, 0),
            Lh => enc(I, OP_LOAD, 0b001, 0),
            Lw => enc(I, OP_LOAD, 0b010, 0),
            Lbu => enc(I, OP_LOAD, 0b100, 0),
            Lhu => enc(I, OP_LOAD, 0b101, 0),
            Sb => enc(S, OP_STORE, 0b000, 0),
            Sh => enc(S, OP_STORE, 0b001, 0),
            Sw => enc(S, OP_STORE, 0b010, 0),

            Beq => enc(B, OP_BRANCH, 0b000, 0),
            Bne => enc(B, OP_BRANCH, 0b001, 0),
            Blt => enc(B, OP_BRANCH, 0b100, 0),
            Bge => enc(B, OP_BRANCH, 0b101, 0),
            Bltu => enc(B, OP_BRANCH, 0b110, 0),
            Bgeu => enc(B, OP_BRANCH, 0b111, 0),
            Lui => enc(U, OP_LUI, 0, 0),
            Auipc => enc(U, OP_AUIPC, 0, 0),
            Jal => enc(J, OP_JAL, 0, 0),
            Jalr => enc(I, OP_JALR, 0b000, 0),

            Ecall => enc(System, OP_SYSTEM, 0, 0),
            Ebreak => enc(System, OP_SYSTEM, 0, 0),
            Fence => enc(System, OP_MISC_MEM, 0, 0),

            Flw => enc(FpLoad, OP_LOAD_FP, 0b010, 0),
            Fsw => enc(FpStore, OP_STORE_FP, 0b010, 0),
            FaddS => enc_rm(FpR, OP_FP, 0b000_0000, None),
            FsubS => enc_rm(FpR, OP_FP, 0b000_0100, None),
            FmulS => enc_rm(FpR, OP_FP, 0b000_1000, None),
            FdivS => enc_rm(FpR, OP_FP, 0b000_1100, None),
            FsqrtS => enc_rm(FpUnary, OP_FP, 0b010_1100, Some(0)),
            FsgnjS => enc(FpR, OP_FP, 0b000, 0b001_0000),
            FsgnjnS => enc(FpR, OP_FP, 0b001, 0b001_0000),
            FsgnjxS => enc(FpR, OP_FP, 0b010, 0b001_0000),
            FminS => enc(FpR, OP_FP, 0b000, 0b001_0100),
            FmaxS => enc(FpR, OP_FP, 0b001, 0b001_0100),
            FcvtWS => enc_rm(FpToInt, OP_FP, 0b110_0000, Some(0)),
            FcvtWuS => enc_rm(FpToInt, OP_FP, 0b110_0000, Some(1)),
            FcvtSW => enc_rm(IntToFp, OP_FP, 0b110_1000, Some(0)),
            FcvtSWu => enc_rm(IntToFp, OP_FP, 0b110_1000, Some(1)),
            FmvXW => enc_fixed_rs2(FpToInt, 0b000, 0b111_0000, 0),
            FclassS => enc_fixed_rs2(FpToInt, 0b001, 0b111_0000, 0),
            FmvWX => enc_fixed_rs2(IntToFp, 0b000, 0b111_1000, 0),
            FeqS => enc(FpCmp, OP_FP, 0b010, 0b101_0000),
            FltS => enc(FpCmp, OP_FP, 0b001, 0b101_0000),
            FleS => enc(FpCmp, OP_FP, 0b000, 0b101_0000),
            FmaddS => enc_rm(FpR4, OP_MADD, 0, None),
            FmsubS => enc_rm(FpR4, OP_MSUB, 0, None),
            FnmsubS => enc_rm(FpR4, OP_NMSUB, 0, None),
            FnmaddS => enc_rm(FpR4, OP_NMADD, 0, None),
        }
    }

    pub const fn format(self) -> Format {
        self.encoding().format
    }

    /// Canonical assembly spelling (`fadd.s`, `addi`).
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// RV32F rounding mode (the `rm` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RoundingMode {
    /// Round to nearest, ties to even.
    Rne = 0,
    /// Round towards zero.
    Rtz = 1,
    /// Round down.
    Rdn = 2,
    /// Round up.
    Rup = 3,
    /// Round to nearest, ties to max magnitude.
    Rmm = 4,
    /// Use the dynamic mode.
    Dyn = 7,
}

impl RoundingMode {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(RoundingMode::Rne),
            1 => Some(RoundingMode::Rtz),
            2 => Some(RoundingMode::Rdn),
            3 => Some(RoundingMode::Rup),
            4 => Some(RoundingMode::Rmm),
            7 => Some(RoundingMode::Dyn),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        self as u32
    }
}
