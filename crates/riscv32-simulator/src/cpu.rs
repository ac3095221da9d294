//! The simulated CPU: step/run control around the decoder and executor.

use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use riscv32_assembler::{Fpr, Gpr, Program};

use crate::decoder::{decode_instruction, DecodeFailure};
use crate::disasm::disassemble_range;
use crate::error::SimError;
use crate::executor::execute_instruction;
use crate::logging::{InstructionLog, LogLevel};
use crate::memory::{Bus, Memory};
use crate::registers::RegisterFile;
use crate::syscall::{handle_syscall, Console, StdoutConsole, SyscallInfo, SyscallOutcome};

/// Default per-run step ceiling.
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

const TRACE_CAPACITY: usize = 100;

/// Why the CPU stopped for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The program called `exit` with this code.
    Exit(i32),
    /// A step failed.
    Error,
    /// `run` hit its step ceiling.
    StepLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuStatus {
    Idle,
    Stepping,
    Running,
    Halted(HaltReason),
}

/// Result of a single [`Cpu::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Instruction executed normally
    Continue,
    /// ECALL handled, execution continues
    Syscall(SyscallInfo),
    /// The program called `exit`
    Exited(i32),
}

/// How a [`Cpu::run`] ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Exited(i32),
    Stopped { executed: u64 },
    MaxStepsExceeded { limit: u64 },
}

/// Requests that a running [`Cpu::run`] stop before its next step.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Called after every state change with read-only access to the CPU.
pub type Observer = Box<dyn FnMut(&Cpu)>;

/// RISC-V 32-bit CPU with paged memory.
pub struct Cpu {
    regs: RegisterFile,
    memory: Memory,
    status: CpuStatus,
    running: bool,
    instruction_count: u64,
    max_steps: u64,
    log_level: LogLevel,
    log_buffer: VecDeque<InstructionLog>,
    console: Box<dyn Console>,
    observer: Option<Observer>,
    stop_flag: Arc<AtomicBool>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Create an idle CPU with empty memory, printing to stdout.
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            memory: Memory::new(),
            status: CpuStatus::Idle,
            running: false,
            instruction_count: 0,
            max_steps: DEFAULT_MAX_STEPS,
            log_level: LogLevel::None,
            log_buffer: VecDeque::new(),
            console: Box::new(StdoutConsole),
            observer: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the maximum number of steps a single `run` may execute.
    pub fn with_max_steps(mut self, limit: u64) -> Self {
        self.max_steps = limit;
        self
    }

    /// Set the logging level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Send program output to `console`.
    pub fn with_console(mut self, console: impl Console + 'static) -> Self {
        self.console = Box::new(console);
        self
    }

    pub fn set_observer(&mut self, observer: impl FnMut(&Cpu) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    fn notify(&mut self) {
        if let Some(mut observer) = self.observer.take() {
            observer(self);
            self.observer = Some(observer);
        }
    }

    fn reset_state(&mut self) {
        self.regs.reset();
        self.memory.clear();
        self.log_buffer.clear();
        self.status = CpuStatus::Idle;
        self.running = false;
        self.instruction_count = 0;
        self.stop_flag.store(false, Ordering::SeqCst);
    }

    /// Clear registers, memory, trace and counters.
    pub fn reset(&mut self) {
        self.reset_state();
        self.notify();
    }

    /// Reset, then load `program`'s image and jump to its entry address.
    pub fn load_program(&mut self, program: &Program) {
        self.reset_state();
        self.memory.load_image(program.memory());
        self.regs.pc = program.entry_address();
        log::debug!(
            "loaded {} byte(s), entry 0x{:08x}",
            self.memory.mapped_len(),
            self.regs.pc
        );
        self.notify();
    }

    /// Execute a single instruction.
    ///
    /// A failure halts the CPU (`Halted(Error)`) before it is returned.
    pub fn step(&mut self) -> Result<StepResult, SimError> {
        self.status = CpuStatus::Stepping;
        let result = self.execute_one();
        match &result {
            Ok(StepResult::Exited(code)) => {
                self.running = false;
                self.status = CpuStatus::Halted(HaltReason::Exit(*code));
            }
            Ok(_) if self.running => self.status = CpuStatus::Running,
            Ok(_) => self.status = CpuStatus::Idle,
            Err(err) => {
                if self.log_level >= LogLevel::Errors {
                    log::error!("halted: {}", err);
                } else {
                    log::debug!("halted: {}", err);
                }
                self.running = false;
                self.status = CpuStatus::Halted(HaltReason::Error);
            }
        }
        self.notify();
        result
    }

    fn execute_one(&mut self) -> Result<StepResult, SimError> {
        let pc = self.regs.pc;

        // Fetch
        let word = self
            .memory
            .read_word(pc)
            .map_err(|source| SimError::FetchError { pc, source })?;

        // Decode
        let decoded = decode_instruction(word).map_err(|failure| match failure {
            DecodeFailure::Invalid(reason) => SimError::DecodeError {
                pc,
                instruction: word,
                reason,
            },
            DecodeFailure::Unimplemented(name) => SimError::UnimplementedInstruction {
                pc,
                instruction: word,
                name,
            },
        })?;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("0x{:08x}: {}", pc, decoded);
        }

        // Execute
        let mut entry = InstructionLog::new(self.instruction_count + 1, pc, word);
        let result =
            execute_instruction(&decoded, pc, &mut self.regs, &mut self.memory, &mut entry)?;
        self.regs.pc = result.new_pc.unwrap_or(pc.wrapping_add(4));
        self.instruction_count += 1;

        let outcome = if result.syscall {
            let info = SyscallInfo::from_registers(&self.regs);
            match handle_syscall(&info, &mut self.regs, &self.memory, self.console.as_mut()) {
                SyscallOutcome::Exit(code) => StepResult::Exited(code),
                SyscallOutcome::Continue => StepResult::Syscall(info),
            }
        } else {
            StepResult::Continue
        };

        self.log_instruction(entry);
        Ok(outcome)
    }

    /// Run until the program exits, [`stop`](Self::stop) is requested, a
    /// step fails, or `max_steps` steps have executed in this call.
    ///
    /// Yields to the executor after every instruction.
    pub async fn run(&mut self) -> Result<RunOutcome, SimError> {
        self.stop_flag.store(false, Ordering::SeqCst);
        self.running = true;
        self.status = CpuStatus::Running;
        let mut executed: u64 = 0;

        let outcome = loop {
            if self.stop_flag.swap(false, Ordering::SeqCst) {
                self.running = false;
            }
            if !self.running {
                break match self.status {
                    CpuStatus::Halted(HaltReason::Exit(code)) => RunOutcome::Exited(code),
                    _ => {
                        self.status = CpuStatus::Idle;
                        RunOutcome::Stopped { executed }
                    }
                };
            }
            if executed >= self.max_steps {
                log::warn!(
                    "step ceiling of {} reached at PC 0x{:08x}",
                    self.max_steps,
                    self.regs.pc
                );
                self.running = false;
                self.status = CpuStatus::Halted(HaltReason::StepLimit);
                break RunOutcome::MaxStepsExceeded {
                    limit: self.max_steps,
                };
            }
            self.step()?;
            executed += 1;
            YieldNow::default().await;
        };

        self.notify();
        Ok(outcome)
    }

    /// Ask a running [`run`](Self::run) to stop before its next step.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop_flag))
    }

    pub fn pc(&self) -> u32 {
        self.regs.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.regs.pc = pc;
    }

    pub fn register(&self, reg: Gpr) -> i32 {
        self.regs.gpr(reg)
    }

    pub fn set_register(&mut self, reg: Gpr, value: i32) {
        self.regs.set_gpr(reg, value);
    }

    pub fn fregister(&self, reg: Fpr) -> f32 {
        self.regs.fpr(reg)
    }

    pub fn set_fregister(&mut self, reg: Fpr, value: f32) {
        self.regs.set_fpr(reg, value);
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Get a reference to the memory (for inspection).
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Get a mutable reference to the memory (for initialization).
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn status(&self) -> CpuStatus {
        self.status
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    pub fn max_steps(&self) -> u64 {
        self.max_steps
    }

    /// The most recent executed instructions, oldest first.
    pub fn trace(&self) -> impl Iterator<Item = &InstructionLog> {
        self.log_buffer.iter()
    }

    /// Format all captured logs as a string.
    pub fn format_trace(&self) -> String {
        self.log_buffer
            .iter()
            .map(|log| format!("{}\n", log))
            .collect()
    }

    pub fn clear_trace(&mut self) {
        self.log_buffer.clear();
    }

    fn log_instruction(&mut self, log: InstructionLog) {
        match self.log_level {
            LogLevel::None | LogLevel::Errors => {}
            LogLevel::Instructions | LogLevel::Verbose => {
                if self.log_level == LogLevel::Verbose {
                    log::debug!("{}", log);
                }
                if self.log_buffer.len() >= TRACE_CAPACITY {
                    self.log_buffer.pop_front();
                }
                self.log_buffer.push_back(log);
            }
        }
    }

    /// Dump the current CPU state as a human-readable string.
    ///
    /// Zero registers other than `zero` itself are omitted.
    pub fn dump_state(&self) -> String {
        let mut result = String::new();
        result.push_str(&format!("PC: 0x{:08x}\n", self.regs.pc));
        result.push_str(&format!("Status: {:?}\n", self.status));
        result.push_str(&format!(
            "Instructions executed: {}\n",
            self.instruction_count
        ));
        result.push_str("\nRegisters:\n");
        for num in 0..32u8 {
            let reg = Gpr::new(num);
            let value = self.regs.gpr(reg);
            if value != 0 || reg == Gpr::ZERO {
                result.push_str(&format!(
                    "  {} (x{}) = 0x{:08x} ({})\n",
                    reg, num, value as u32, value
                ));
            }
        }

        let fregs: Vec<_> = (0..32u8)
            .map(Fpr::new)
            .filter(|reg| self.regs.fpr(*reg).to_bits() != 0)
            .collect();
        if !fregs.is_empty() {
            result.push_str("\nFloat registers:\n");
            for reg in fregs {
                let value = self.regs.fpr(reg);
                result.push_str(&format!(
                    "  {} (f{}) = 0x{:08x} ({})\n",
                    reg,
                    reg.num(),
                    value.to_bits(),
                    value
                ));
            }
        }
        result
    }

    /// Format debug information including disassembly and execution logs.
    ///
    /// # Arguments
    ///
    /// * `highlight_pc` - PC to center the disassembly on and mark (defaults
    ///   to the current PC)
    /// * `log_count` - Number of recent logs to show
    pub fn format_debug_info(&self, highlight_pc: Option<u32>, log_count: usize) -> String {
        let center = highlight_pc.unwrap_or(self.regs.pc);
        let start = center.wrapping_sub(10 * 4);

        let mut result = String::from("Disassembly:\n");
        result.push_str(&disassemble_range(&self.memory, start, 21, Some(center)));

        if !self.log_buffer.is_empty() {
            result.push_str("\nLast execution logs:\n");
            let skip = self.log_buffer.len().saturating_sub(log_count);
            for log in self.log_buffer.iter().skip(skip) {
                result.push_str(&format!("{}\n", log));
            }
        }
        result
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("pc", &format_args!("0x{:08x}", self.regs.pc))
            .field("status", &self.status)
            .field("instruction_count", &self.instruction_count)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

/// Returns `Pending` once, waking itself, so the executor can schedule
/// other work between steps.
#[derive(Default)]
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
