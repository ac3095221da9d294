//! Helper functions for testing RISC-V code.
//!
//! Each helper assembles a snippet, loads it into a fresh [`Cpu`] with an
//! in-memory console and instruction tracing, and runs it to completion.
//! Failures panic with a disassembly around the failing PC and the last
//! executed instructions.

use futures::executor::block_on;
use riscv32_assembler::{assemble, AsmError, Gpr};

use crate::cpu::{Cpu, RunOutcome};
use crate::error::SimError;
use crate::logging::LogLevel;
use crate::syscall::BufferConsole;

/// Create a CPU from assembly code, with output captured in the returned
/// console.
pub fn debug_riscv32_asm(asm: &str) -> Result<(Cpu, BufferConsole), AsmError> {
    let program = assemble(asm)?;
    let console = BufferConsole::new();
    let mut cpu = Cpu::new()
        .with_log_level(LogLevel::Instructions)
        .with_console(console.clone());
    cpu.load_program(&program);
    Ok((cpu, console))
}

/// Assemble and run `asm`, returning the CPU, what `run` returned and the
/// program output.
pub fn run_asm(asm: &str) -> (Cpu, Result<RunOutcome, SimError>, String) {
    let (mut cpu, console) =
        debug_riscv32_asm(asm).unwrap_or_else(|e| panic!("Failed to assemble code: {}", e));
    let result = block_on(cpu.run());
    (cpu, result, console.text())
}

/// Format error with disassembly and logs.
fn format_error(cpu: &Cpu, error: &SimError) -> String {
    let mut result = String::new();
    result.push_str("=== RISC-V Execution Error ===\n\n");
    result.push_str(&format!("Error: {}\n", error));
    result.push_str(&format!("PC: 0x{:08x}\n\n", error.pc()));
    result.push_str(&cpu.format_debug_info(Some(error.pc()), 10));
    result
}

/// Expect code to run until it calls `exit`, returning the CPU and its
/// output.
pub fn expect_ok(asm: &str) -> (Cpu, String) {
    let (cpu, result, output) = run_asm(asm);
    match result {
        Ok(RunOutcome::Exited(_)) => (cpu, output),
        Ok(other) => panic!(
            "Expected the program to exit, got {:?}\n\n{}",
            other,
            cpu.format_debug_info(None, 10)
        ),
        Err(e) => panic!("{}\n{}", format_error(&cpu, &e), e),
    }
}

/// Expect code to exit with `expected` in `reg`.
pub fn expect_register(asm: &str, reg: Gpr, expected: i32) {
    let (cpu, _) = expect_ok(asm);
    let actual = cpu.register(reg);
    if actual != expected {
        panic!(
            "Register {} mismatch: expected {}, got {}\n\nCode:\n{}\n\n{}",
            reg,
            expected,
            actual,
            asm,
            cpu.dump_state()
        );
    }
}

/// Expect code to exit with `expected` in a0 (convenience function).
pub fn expect_a0(asm: &str, expected: i32) {
    expect_register(asm, Gpr::A0, expected);
}

/// Expect code to fail, returning the error for further inspection.
pub fn expect_error(asm: &str) -> SimError {
    let (cpu, result, _) = run_asm(asm);
    match result {
        Err(e) => e,
        Ok(outcome) => panic!(
            "Expected an error, but the run ended with {:?}\n\nCode:\n{}\n\n{}",
            outcome,
            asm,
            cpu.dump_state()
        ),
    }
}
