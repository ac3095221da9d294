//! Architectural register state.

use riscv32_assembler::{Fpr, Gpr};

/// 32 integer registers, 32 single-precision float registers and the PC.
///
/// `x0` reads as zero and ignores writes.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterFile {
    x: [i32; 32],
    f: [f32; 32],
    pub pc: u32,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            x: [0; 32],
            f: [0.0; 32],
            pc: 0,
        }
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every register and the PC.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn read(&self, reg: u8) -> i32 {
        if reg == 0 {
            0
        } else {
            self.x[(reg & 0x1f) as usize]
        }
    }

    pub fn write(&mut self, reg: u8, value: i32) {
        if reg != 0 {
            self.x[(reg & 0x1f) as usize] = value;
        }
    }

    pub fn read_f(&self, reg: u8) -> f32 {
        self.f[(reg & 0x1f) as usize]
    }

    pub fn write_f(&mut self, reg: u8, value: f32) {
        self.f[(reg & 0x1f) as usize] = value;
    }

    pub fn gpr(&self, reg: Gpr) -> i32 {
        self.read(reg.num())
    }

    pub fn set_gpr(&mut self, reg: Gpr, value: i32) {
        self.write(reg.num(), value);
    }

    pub fn fpr(&self, reg: Fpr) -> f32 {
        self.read_f(reg.num())
    }

    pub fn set_fpr(&mut self, reg: Fpr, value: f32) {
        self.write_f(reg.num(), value);
    }

    /// All integer registers, `x0` included.
    pub fn gprs(&self) -> &[i32; 32] {
        &self.x
    }

    pub fn fprs(&self) -> &[f32; 32] {
        &self.f
    }
}
