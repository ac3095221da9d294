//! `ecall` dispatch and the program's output sink.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use riscv32_assembler::Gpr;

use crate::memory::Bus;
use crate::registers::RegisterFile;

/// Longest string `print_string` will emit.
pub const PRINT_STRING_LIMIT: usize = 1000;

/// Where program output goes.
pub trait Console {
    fn print_int(&mut self, value: i32);
    fn print_bytes(&mut self, bytes: &[u8]);
}

/// Writes program output to the process's stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl StdoutConsole {
    fn emit(&self, bytes: &[u8]) {
        let mut stdout = io::stdout().lock();
        if let Err(err) = stdout.write_all(bytes).and_then(|()| stdout.flush()) {
            log::warn!("console write failed: {}", err);
        }
    }
}

impl Console for StdoutConsole {
    fn print_int(&mut self, value: i32) {
        self.emit(value.to_string().as_bytes());
    }

    fn print_bytes(&mut self, bytes: &[u8]) {
        self.emit(bytes);
    }
}

/// Collects program output in memory.
///
/// Clones share one buffer, so a handle kept by the caller sees what the
/// CPU printed through its own clone.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    output: Rc<RefCell<Vec<u8>>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.output.borrow().clone()
    }

    /// Output decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.output.borrow_mut().clear();
    }
}

impl Console for BufferConsole {
    fn print_int(&mut self, value: i32) {
        self.output
            .borrow_mut()
            .extend_from_slice(value.to_string().as_bytes());
    }

    fn print_bytes(&mut self, bytes: &[u8]) {
        self.output.borrow_mut().extend_from_slice(bytes);
    }
}

/// Supported system call numbers (passed in `a7`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    PrintInt = 1,
    PrintString = 4,
    Write = 64,
    Exit = 93,
}

impl Syscall {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Syscall::PrintInt),
            4 => Some(Syscall::PrintString),
            64 => Some(Syscall::Write),
            93 => Some(Syscall::Exit),
            _ => None,
        }
    }
}

/// Information about a syscall (ECALL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallInfo {
    /// Syscall number (from a7 register)
    pub number: i32,
    /// Syscall arguments (from a0-a2 registers)
    pub args: [i32; 3],
}

impl SyscallInfo {
    pub fn from_registers(regs: &RegisterFile) -> Self {
        Self {
            number: regs.gpr(Gpr::A7),
            args: [regs.gpr(Gpr::A0), regs.gpr(Gpr::A1), regs.gpr(Gpr::A2)],
        }
    }
}

/// What the CPU should do after a syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    Continue,
    Exit(i32),
}

/// Read bytes from `start` until `stop` says so, a byte is unmapped, or
/// `limit` bytes have been collected.
fn read_bytes(
    bus: &impl Bus,
    start: u32,
    limit: usize,
    stop: impl Fn(u8) -> bool,
) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut address = start;
    while bytes.len() < limit {
        match bus.read_byte(address) {
            Ok(byte) if !stop(byte) => bytes.push(byte),
            _ => break,
        }
        address = address.wrapping_add(1);
    }
    bytes
}

/// Carry out the syscall described by `info`.
pub fn handle_syscall(
    info: &SyscallInfo,
    regs: &mut RegisterFile,
    bus: &impl Bus,
    console: &mut dyn Console,
) -> SyscallOutcome {
    let [a0, a1, a2] = info.args;
    let Some(syscall) = Syscall::from_id(info.number) else {
        log::warn!("unsupported syscall {} ignored", info.number);
        return SyscallOutcome::Continue;
    };
    log::debug!("syscall {:?} args={:?}", syscall, info.args);

    match syscall {
        Syscall::Exit => return SyscallOutcome::Exit(a0),
        Syscall::PrintInt => console.print_int(a0),
        Syscall::PrintString => {
            let bytes = read_bytes(bus, a0 as u32, PRINT_STRING_LIMIT + 1, |b| b == 0);
            if bytes.len() > PRINT_STRING_LIMIT {
                log::warn!(
                    "print_string at 0x{:08x} truncated to {} bytes",
                    a0 as u32,
                    PRINT_STRING_LIMIT
                );
            }
            console.print_bytes(&bytes[..bytes.len().min(PRINT_STRING_LIMIT)]);
        }
        Syscall::Write => {
            if a0 != 1 {
                log::warn!("write to unsupported fd {}", a0);
                regs.set_gpr(Gpr::A0, -1);
            } else {
                let count = a2.max(0) as usize;
                let bytes = read_bytes(bus, a1 as u32, count, |_| false);
                console.print_bytes(&bytes);
                regs.set_gpr(Gpr::A0, bytes.len() as i32);
            }
        }
    }
    SyscallOutcome::Continue
}
