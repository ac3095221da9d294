use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use riscv32_assembler::{assemble, Program};
use riscv32_simulator::{Cpu, LogLevel, RunOutcome, DEFAULT_MAX_STEPS};

#[derive(Parser, Debug)]
#[command(name = "rv32sim", version, about = "RV32IMF assembler and simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble a file and print its listing
    Asm {
        file: PathBuf,

        /// Also print each word in binary
        #[arg(short, long)]
        binary: bool,
    },
    /// Assemble a file and run it
    Run {
        file: PathBuf,

        #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_STEPS)]
        max_steps: u64,

        /// Print the last executed instructions when the run ends
        #[arg(short, long)]
        trace: bool,

        /// Print non-zero registers when the run ends
        #[arg(short, long)]
        dump: bool,
    },
}

fn load(file: &Path) -> Result<Program> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let program =
        assemble(&source).with_context(|| format!("failed to assemble {}", file.display()))?;
    log::info!(
        "assembled {} instruction(s) from {}",
        program.instructions().len(),
        file.display()
    );
    Ok(program)
}

/// Guest exit codes that don't fit a process status report as failure.
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn run(file: &Path, max_steps: u64, trace: bool, dump: bool) -> Result<ExitCode> {
    let program = load(file)?;
    let level = if trace {
        LogLevel::Instructions
    } else {
        LogLevel::None
    };
    let mut cpu = Cpu::new().with_max_steps(max_steps).with_log_level(level);
    cpu.load_program(&program);

    let result = futures::executor::block_on(cpu.run());

    if trace {
        eprint!("\n{}", cpu.format_trace());
    }
    if dump {
        eprint!("\n{}", cpu.dump_state());
    }

    match result {
        Ok(RunOutcome::Exited(code)) => {
            eprintln!("\nprogram exited with code {}", code);
            Ok(ExitCode::from(exit_status(code)))
        }
        Ok(RunOutcome::Stopped { executed }) => {
            eprintln!("\nstopped after {} instruction(s)", executed);
            Ok(ExitCode::SUCCESS)
        }
        Ok(RunOutcome::MaxStepsExceeded { limit }) => {
            anyhow::bail!("step limit of {} exceeded at PC 0x{:08x}", limit, cpu.pc())
        }
        Err(err) => {
            eprintln!("\n{}", cpu.format_debug_info(Some(err.pc()), 20));
            Err(err).context("simulation failed")
        }
    }
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Asm { file, binary } => {
            let program = load(&file)?;
            print!("{}", program.listing(binary));
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            file,
            max_steps,
            trace,
            dump,
        } => run(&file, max_steps, trace, dump),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(3), 3);
        assert_eq!(exit_status(255), 255);
        assert_eq!(exit_status(256), 1);
        assert_eq!(exit_status(-1), 1);
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["rv32sim", "run", "prog.s", "--max-steps", "10", "-t"])
            .unwrap();
        match cli.command {
            Command::Run {
                max_steps, trace, dump, ..
            } => {
                assert_eq!(max_steps, 10);
                assert!(trace);
                assert!(!dump);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
