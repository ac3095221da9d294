//! Error types for assembly.

use thiserror::Error;

use crate::encode::ImmFormat;

/// The reason a single source line failed to assemble.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("duplicate label `{name}` (first defined on line {first_line})")]
    DuplicateLabel { name: String, first_line: usize },

    #[error("undefined symbol `{0}`")]
    UndefinedSymbol(String),

    #[error("immediate {value} out of range for {format}-type ({bits}-bit signed)")]
    ImmediateOutOfRange {
        value: i64,
        format: ImmFormat,
        bits: u32,
    },

    #[error("shift amount {0} out of range (expected 0-31)")]
    ShiftOutOfRange(i64),

    #[error("{format}-type offset {value} is not a multiple of 2")]
    MisalignedOffset { value: i64, format: ImmFormat },

    #[error("invalid register `{0}`")]
    InvalidRegister(String),

    #[error("unsupported opcode `{0}`")]
    UnsupportedOpcode(String),

    #[error("{directive} expects {expected} argument(s), got {got}")]
    ArgumentCount {
        directive: &'static str,
        expected: String,
        got: usize,
    },

    #[error("value {value} out of range for {directive}")]
    ValueOutOfRange { directive: &'static str, value: i64 },

    #[error("symbol `{0}` is already defined")]
    SymbolRedefinition(String),

    #[error("invalid label name `{0}`")]
    InvalidLabelName(String),

    #[error("instruction found in .data section")]
    InstructionInDataSection,

    #[error("{0} is only valid in the .data section")]
    DataDirectiveOutsideData(&'static str),

    #[error("{size} byte(s) at 0x{address:08x} run past the end of the address space")]
    AddressOverflow { address: u64, size: u64 },

    #[error("address 0x{0:08x} is already occupied")]
    Overlap(u32),

    #[error("unknown directive `{0}`")]
    UnknownDirective(String),
}

/// An assembly failure, tagged with the 1-based source line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}\n    {text}")]
pub struct AsmError {
    pub line: usize,
    pub text: String,
    #[source]
    pub kind: AsmErrorKind,
}

impl AsmError {
    pub fn new(line: usize, text: impl Into<String>, kind: AsmErrorKind) -> Self {
        Self {
            line,
            text: text.into(),
            kind,
        }
    }
}
