//! Basic tests for the RISC-V 32 simulator.

use riscv32_assembler::{assemble, Gpr, DATA_BASE, TEXT_BASE};
use riscv32_simulator::helpers::{expect_a0, expect_ok, expect_register};
use riscv32_simulator::{BufferConsole, Cpu, CpuStatus, HaltReason, LogLevel, StepResult};

const EXIT: &str = "li a7, 93\necall";

#[test]
fn test_add_instruction() {
    let asm = format!("addi a0, zero, 5\naddi a1, zero, 10\nadd a0, a0, a1\n{EXIT}");
    let (cpu, _) = expect_ok(&asm);
    assert_eq!(cpu.register(Gpr::A0), 15, "Expected 5 + 10 = 15");
    assert_eq!(cpu.register(Gpr::A1), 10);
}

#[test]
fn test_addi_chain() {
    let program = assemble("addi x5, x0, 5\naddi x6, x5, 10").unwrap();
    let mut cpu = Cpu::new().with_console(BufferConsole::new());
    cpu.load_program(&program);
    cpu.step().unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.register(Gpr::T0), 5);
    assert_eq!(cpu.register(Gpr::T1), 15);
    assert_eq!(cpu.pc(), TEXT_BASE + 8);
    assert_eq!(cpu.instruction_count(), 2);
}

#[test]
fn test_sub_instruction() {
    expect_a0(
        &format!("addi a0, zero, 20\naddi a1, zero, 7\nsub a0, a0, a1\n{EXIT}"),
        13,
    );
}

#[test]
fn test_mul_instruction() {
    expect_a0(
        &format!("addi a0, zero, 6\naddi a1, zero, 7\nmul a0, a0, a1\n{EXIT}"),
        42,
    );
}

#[test]
fn test_load_store() {
    let asm = format!(
        "\
.data
slot: .word 0
.text
    lui t0, 0x10010
    addi t1, zero, -123
    sw t1, 0(t0)
    lw a0, 0(t0)
    {EXIT}"
    );
    let (cpu, _) = expect_ok(&asm);
    assert_eq!(cpu.register(Gpr::A0), -123);
    assert_eq!(cpu.memory().read_range(DATA_BASE, 4), vec![
        Some(0x85),
        Some(0xff),
        Some(0xff),
        Some(0xff)
    ]);
}

#[test]
fn test_byte_and_half_stores() {
    let asm = format!(
        "\
.data
buf: .space 8
.text
    lui t0, 0x10010
    addi t1, zero, -2
    sb t1, 0(t0)
    sh t1, 2(t0)
    lbu a0, 0(t0)
    lh a1, 2(t0)
    {EXIT}"
    );
    let (cpu, _) = expect_ok(&asm);
    assert_eq!(cpu.register(Gpr::A0), 0xfe);
    assert_eq!(cpu.register(Gpr::A1), -2);
}

#[test]
fn test_jal() {
    let asm = format!(
        "\
    jal ra, target
    addi a0, zero, 1
target:
    addi a1, zero, 2
    {EXIT}"
    );
    let (cpu, _) = expect_ok(&asm);
    assert_eq!(cpu.register(Gpr::A0), 0, "jal skipped the addi");
    assert_eq!(cpu.register(Gpr::A1), 2);
    assert_eq!(cpu.register(Gpr::RA), (TEXT_BASE + 4) as i32);
}

#[test]
fn test_call_and_return() {
    let asm = format!(
        "\
main:
    li a0, 4
    jal double
    jal double
    {EXIT}
double:
    add a0, a0, a0
    ret"
    );
    let (cpu, _) = expect_ok(&asm);
    // exit leaves a0 untouched, so a0 is the doubled value
    assert_eq!(cpu.register(Gpr::A0), 16);
}

#[test]
fn test_branch_loop() {
    let asm = format!(
        "\
    li t0, 10
    li a0, 0
loop:
    add a0, a0, t0
    addi t0, t0, -1
    bnez t0, loop
    {EXIT}"
    );
    expect_a0(&asm, 55);
}

#[test]
fn test_unsigned_branches() {
    let asm = format!(
        "\
    li t0, -1
    li t1, 1
    li a0, 0
    bltu t0, t1, wrong
    bgeu t0, t1, right
wrong:
    li a0, 1
right:
    {EXIT}"
    );
    expect_a0(&asm, 0);
}

#[test]
fn test_zero_register() {
    let asm = format!("addi zero, zero, 42\nadd a0, zero, zero\n{EXIT}");
    let (cpu, _) = expect_ok(&asm);
    assert_eq!(cpu.register(Gpr::ZERO), 0);
    assert_eq!(cpu.register(Gpr::A0), 0);
}

#[test]
fn test_lui() {
    expect_register(&format!("lui t0, 0x12345\n{EXIT}"), Gpr::T0, 0x1234_5000);
    expect_register(&format!("lui t0, -1\n{EXIT}"), Gpr::T0, -4096);
}

#[test]
fn test_auipc() {
    expect_register(
        &format!("nop\nauipc t0, 1\n{EXIT}"),
        Gpr::T0,
        (TEXT_BASE + 4 + 0x1000) as i32,
    );
}

#[test]
fn test_exit_code_and_status() {
    let program = assemble(&format!("li a0, 3\n{EXIT}\nli a0, 9")).unwrap();
    let mut cpu = Cpu::new()
        .with_console(BufferConsole::new())
        .with_log_level(LogLevel::Instructions);
    cpu.load_program(&program);
    assert_eq!(cpu.status(), CpuStatus::Idle);
    cpu.step().unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.step(), Ok(StepResult::Exited(3)));
    assert_eq!(cpu.status(), CpuStatus::Halted(HaltReason::Exit(3)));
    assert!(!cpu.running());
    assert_eq!(cpu.trace().count(), 3);
    assert!(cpu.format_trace().contains("ecall"));
}

#[test]
fn test_dump_state() {
    let (cpu, _) = expect_ok(&format!("li s1, -1\n{EXIT}"));
    let dump = cpu.dump_state();
    assert!(dump.contains("  s1 (x9) = 0xffffffff (-1)\n"), "{dump}");
    assert!(dump.contains("  zero (x0) = 0x00000000 (0)\n"));
    assert!(!dump.contains("t0 (x5)"));
}
