//! Instruction executor for RISC-V 32-bit instructions.

use core::num::FpCategory;

use riscv32_assembler::{Fpr, Gpr, Mnemonic, RoundingMode};

use crate::decoder::DecodedInstruction;
use crate::error::{MemoryAccessKind, MemoryError, SimError};
use crate::logging::InstructionLog;
use crate::memory::Bus;
use crate::registers::RegisterFile;

/// Result of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    /// New PC value (None means PC += 4)
    pub new_pc: Option<u32>,
    /// Whether a syscall was encountered (ECALL)
    pub syscall: bool,
}

/// Helper to write register (x0 writes are ignored)
fn write_reg(regs: &mut RegisterFile, log: &mut InstructionLog, reg: u8, value: i32) {
    if reg != 0 {
        let old = regs.read(reg);
        regs.write(reg, value);
        log.regs_written.push((Gpr::new(reg & 0x1f), old, value));
    }
}

fn write_freg(regs: &mut RegisterFile, log: &mut InstructionLog, reg: u8, value: f32) {
    let old = regs.read_f(reg);
    regs.write_f(reg, value);
    log.fregs_written.push((Fpr::new(reg & 0x1f), old, value));
}

fn load_error(pc: u32, size: usize) -> impl Fn(MemoryError) -> SimError {
    move |err| SimError::UnmappedMemory {
        address: err.address(),
        size,
        kind: MemoryAccessKind::Read,
        pc,
    }
}

fn load<B: Bus>(
    bus: &B,
    log: &mut InstructionLog,
    pc: u32,
    address: u32,
    size: usize,
) -> Result<u32, SimError> {
    let value = match size {
        1 => bus.read_byte(address).map(u32::from),
        2 => bus.read_half(address).map(u32::from),
        _ => bus.read_word(address),
    }
    .map_err(load_error(pc, size))?;
    log.memory_reads.push((address, size, value));
    Ok(value)
}

fn store<B: Bus>(bus: &mut B, log: &mut InstructionLog, address: u32, size: usize, value: u32) {
    match size {
        1 => bus.write_byte(address, value as u8),
        2 => bus.write_half(address, value as u16),
        _ => bus.write_word(address, value),
    }
    log.memory_writes.push((address, size, value));
}

fn round(value: f32, rm: RoundingMode) -> f32 {
    match rm {
        RoundingMode::Rtz => value.trunc(),
        RoundingMode::Rdn => value.floor(),
        RoundingMode::Rup => value.ceil(),
        RoundingMode::Rmm => value.round(),
        RoundingMode::Rne | RoundingMode::Dyn => value.round_ties_even(),
    }
}

/// `fcvt.w.s`: round, then saturate. NaN converts to `i32::MAX`.
pub fn fcvt_w(value: f32, rm: RoundingMode) -> i32 {
    if value.is_nan() {
        return i32::MAX;
    }
    let rounded = f64::from(round(value, rm));
    if rounded >= 2_147_483_648.0 {
        i32::MAX
    } else if rounded < -2_147_483_648.0 {
        i32::MIN
    } else {
        rounded as i32
    }
}

/// `fcvt.wu.s`: round, then saturate to `[0, u32::MAX]`. NaN converts to
/// `u32::MAX`.
pub fn fcvt_wu(value: f32, rm: RoundingMode) -> u32 {
    if value.is_nan() {
        return u32::MAX;
    }
    let rounded = f64::from(round(value, rm));
    if rounded >= 4_294_967_296.0 {
        u32::MAX
    } else if rounded <= 0.0 {
        0
    } else {
        rounded as u32
    }
}

/// RV32F min/max: a NaN operand is ignored, and `-0.0` orders below `+0.0`.
fn fmin_max(a: f32, b: f32, max: bool) -> f32 {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => f32::NAN,
        (true, false) => b,
        (false, true) => a,
        _ if a == b => {
            // equal values differ only in the sign of zero
            if max == a.is_sign_negative() {
                b
            } else {
                a
            }
        }
        _ if max => a.max(b),
        _ => a.min(b),
    }
}

/// The `fclass.s` bit mask.
pub fn fclass(value: f32) -> u32 {
    let negative = value.is_sign_negative();
    let bits = value.to_bits();
    let bit = match value.classify() {
        FpCategory::Infinite if negative => 0,
        FpCategory::Normal if negative => 1,
        FpCategory::Subnormal if negative => 2,
        FpCategory::Zero if negative => 3,
        FpCategory::Zero => 4,
        FpCategory::Subnormal => 5,
        FpCategory::Normal => 6,
        FpCategory::Infinite => 7,
        // quiet NaNs have the top mantissa bit set
        FpCategory::Nan if bits & 0x0040_0000 == 0 => 8,
        FpCategory::Nan => 9,
    };
    1 << bit
}

fn sign_inject(a: f32, b: f32, mnemonic: Mnemonic) -> f32 {
    const SIGN: u32 = 0x8000_0000;
    let (a, b) = (a.to_bits(), b.to_bits());
    let sign = match mnemonic {
        Mnemonic::FsgnjnS => !b & SIGN,
        Mnemonic::FsgnjxS => (a ^ b) & SIGN,
        _ => b & SIGN,
    };
    f32::from_bits((a & !SIGN) | sign)
}

/// Execute a decoded instruction.
///
/// Memory faults are reported with `pc`; any store performed before a
/// failure stays committed.
pub fn execute_instruction<B: Bus>(
    inst: &DecodedInstruction,
    pc: u32,
    regs: &mut RegisterFile,
    bus: &mut B,
    log: &mut InstructionLog,
) -> Result<ExecutionResult, SimError> {
    use Mnemonic::*;

    let mut new_pc: Option<u32> = None;
    let mut syscall = false;

    let rd = inst.rd;
    let imm = inst.imm;
    let val1 = regs.read(inst.rs1);
    let val2 = regs.read(inst.rs2);
    let (u1, u2) = (val1 as u32, val2 as u32);
    let address = val1.wrapping_add(imm) as u32;
    let (f1, f2, f3) = (
        regs.read_f(inst.rs1),
        regs.read_f(inst.rs2),
        regs.read_f(inst.rs3),
    );

    match inst.mnemonic {
        Add => write_reg(regs, log, rd, val1.wrapping_add(val2)),
        Sub => write_reg(regs, log, rd, val1.wrapping_sub(val2)),
        Sll => write_reg(regs, log, rd, val1.wrapping_shl(u2)),
        Slt => write_reg(regs, log, rd, (val1 < val2) as i32),
        Sltu => write_reg(regs, log, rd, (u1 < u2) as i32),
        Xor => write_reg(regs, log, rd, val1 ^ val2),
        Srl => write_reg(regs, log, rd, u1.wrapping_shr(u2) as i32),
        Sra => write_reg(regs, log, rd, val1.wrapping_shr(u2)),
        Or => write_reg(regs, log, rd, val1 | val2),
        And => write_reg(regs, log, rd, val1 & val2),

        Mul => write_reg(regs, log, rd, val1.wrapping_mul(val2)),
        Mulh => {
            let product = i64::from(val1) * i64::from(val2);
            write_reg(regs, log, rd, (product >> 32) as i32);
        }
        Mulhsu => {
            let product = i64::from(val1) * i64::from(u2);
            write_reg(regs, log, rd, (product >> 32) as i32);
        }
        Mulhu => {
            let product = u64::from(u1) * u64::from(u2);
            write_reg(regs, log, rd, (product >> 32) as i32);
        }
        Div => {
            let result = if val2 == 0 { -1 } else { val1.wrapping_div(val2) };
            write_reg(regs, log, rd, result);
        }
        Divu => {
            let result = if u2 == 0 { u32::MAX } else { u1 / u2 };
            write_reg(regs, log, rd, result as i32);
        }
        Rem => {
            let result = if val2 == 0 { val1 } else { val1.wrapping_rem(val2) };
            write_reg(regs, log, rd, result);
        }
        Remu => {
            let result = if u2 == 0 { u1 } else { u1 % u2 };
            write_reg(regs, log, rd, result as i32);
        }

        Addi => write_reg(regs, log, rd, val1.wrapping_add(imm)),
        Slti => write_reg(regs, log, rd, (val1 < imm) as i32),
        Sltiu => write_reg(regs, log, rd, (u1 < imm as u32) as i32),
        Xori => write_reg(regs, log, rd, val1 ^ imm),
        Ori => write_reg(regs, log, rd, val1 | imm),
        Andi => write_reg(regs, log, rd, val1 & imm),
        Slli => write_reg(regs, log, rd, val1.wrapping_shl(imm as u32)),
        Srli => write_reg(regs, log, rd, u1.wrapping_shr(imm as u32) as i32),
        Srai => write_reg(regs, log, rd, val1.wrapping_shr(imm as u32)),

        Lb => {
            let value = load(bus, log, pc, address, 1)? as u8 as i8;
            write_reg(regs, log, rd, i32::from(value));
        }
        Lh => {
            let value = load(bus, log, pc, address, 2)? as u16 as i16;
            write_reg(regs, log, rd, i32::from(value));
        }
        Lw => {
            let value = load(bus, log, pc, address, 4)?;
            write_reg(regs, log, rd, value as i32);
        }
        Lbu => {
            let value = load(bus, log, pc, address, 1)?;
            write_reg(regs, log, rd, value as i32);
        }
        Lhu => {
            let value = load(bus, log, pc, address, 2)?;
            write_reg(regs, log, rd, value as i32);
        }
        Sb => store(bus, log, address, 1, u2),
        Sh => store(bus, log, address, 2, u2),
        Sw => store(bus, log, address, 4, u2),

        Beq | Bne | Blt | Bge | Bltu | Bgeu => {
            let taken = match inst.mnemonic {
                Beq => val1 == val2,
                Bne => val1 != val2,
                Blt => val1 < val2,
                Bge => val1 >= val2,
                Bltu => u1 < u2,
                _ => u1 >= u2,
            };
            if taken {
                new_pc = Some(pc.wrapping_add(imm as u32));
            }
        }
        Lui => write_reg(regs, log, rd, imm),
        Auipc => write_reg(regs, log, rd, pc.wrapping_add(imm as u32) as i32),
        Jal => {
            write_reg(regs, log, rd, pc.wrapping_add(4) as i32);
            new_pc = Some(pc.wrapping_add(imm as u32));
        }
        Jalr => {
            // target is computed before rd is written, rd may equal rs1
            let target = address & !1;
            write_reg(regs, log, rd, pc.wrapping_add(4) as i32);
            new_pc = Some(target);
        }

        Ecall => syscall = true,
        Ebreak => return Err(SimError::Breakpoint { pc }),
        Fence => {}

        Flw => {
            let bits = load(bus, log, pc, address, 4)?;
            write_freg(regs, log, rd, f32::from_bits(bits));
        }
        Fsw => store(bus, log, address, 4, f2.to_bits()),
        FaddS => write_freg(regs, log, rd, f1 + f2),
        FsubS => write_freg(regs, log, rd, f1 - f2),
        FmulS => write_freg(regs, log, rd, f1 * f2),
        FdivS => write_freg(regs, log, rd, f1 / f2),
        FsqrtS => write_freg(regs, log, rd, f1.sqrt()),
        FsgnjS | FsgnjnS | FsgnjxS => {
            write_freg(regs, log, rd, sign_inject(f1, f2, inst.mnemonic))
        }
        FminS => write_freg(regs, log, rd, fmin_max(f1, f2, false)),
        FmaxS => write_freg(regs, log, rd, fmin_max(f1, f2, true)),
        FcvtWS => write_reg(regs, log, rd, fcvt_w(f1, inst.rm)),
        FcvtWuS => write_reg(regs, log, rd, fcvt_wu(f1, inst.rm) as i32),
        FcvtSW => write_freg(regs, log, rd, val1 as f32),
        FcvtSWu => write_freg(regs, log, rd, u1 as f32),
        FmvXW => write_reg(regs, log, rd, i32::from_le_bytes(f1.to_le_bytes())),
        FmvWX => write_freg(regs, log, rd, f32::from_le_bytes(val1.to_le_bytes())),
        FeqS => write_reg(regs, log, rd, (f1 == f2) as i32),
        FltS => write_reg(regs, log, rd, (f1 < f2) as i32),
        FleS => write_reg(regs, log, rd, (f1 <= f2) as i32),
        FclassS => write_reg(regs, log, rd, fclass(f1) as i32),
        FmaddS => write_freg(regs, log, rd, f1.mul_add(f2, f3)),
        FmsubS => write_freg(regs, log, rd, f1.mul_add(f2, -f3)),
        FnmsubS => write_freg(regs, log, rd, (-f1).mul_add(f2, f3)),
        FnmaddS => write_freg(regs, log, rd, (-f1).mul_add(f2, -f3)),
    }

    log.jump_target = new_pc;
    Ok(ExecutionResult { new_pc, syscall })
}
