//! Two-pass assembly driver.
//!
//! Pass 1 walks the source once, assigning addresses to labels, applying
//! directives (data bytes are written immediately) and recording each
//! instruction line with its address. Pass 2 encodes the recorded
//! instructions, now that every label is known.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::{
    directive::Directive,
    error::{AsmError, AsmErrorKind},
    instruction::encode_instruction,
    parse::{split_label, strip_comment},
    program::{AssembledInstruction, MemoryImage, Program},
    symbols::SymbolResolver,
};

/// Default start of the `.text` section.
pub const TEXT_BASE: u32 = 0x0040_0000;
/// Default start of the `.data` section.
pub const DATA_BASE: u32 = 0x1001_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Text,
    Data,
}

/// A source line after the first pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Label { name: String, address: u32 },
    Directive { directive: Directive, args: Vec<String> },
    /// Kept as text until pass 2.
    Instruction { source_text: String, address: u32 },
}

#[derive(Debug, Clone)]
struct SourceLine {
    number: usize,
    text: String,
    parsed: ParsedLine,
}

/// Mutable state of one assembly run.
pub(crate) struct AsmContext {
    pub(crate) resolver: SymbolResolver,
    pub(crate) image: MemoryImage,
    pub(crate) section: Option<Section>,
    text_cursor: u64,
    data_cursor: u64,
    entry: Option<u32>,
    lines: Vec<SourceLine>,
}

impl AsmContext {
    fn new(text_base: u32, data_base: u32) -> Self {
        Self {
            resolver: SymbolResolver::new(),
            image: MemoryImage::new(),
            section: None,
            text_cursor: u64::from(text_base),
            data_cursor: u64::from(data_base),
            entry: None,
            lines: Vec::new(),
        }
    }

    /// Current address of the active section (the text cursor before any
    /// section is open).
    ///
    /// Fails once the section has been filled up to the end of the
    /// address space.
    pub(crate) fn address(&self) -> Result<u32, AsmErrorKind> {
        let cursor = self.cursor();
        u32::try_from(cursor).map_err(|_| AsmErrorKind::AddressOverflow {
            address: cursor,
            size: 0,
        })
    }

    fn cursor(&self) -> u64 {
        match self.section {
            Some(Section::Data) => self.data_cursor,
            _ => self.text_cursor,
        }
    }

    /// Move the cursor forward without writing.
    pub(crate) fn advance(&mut self, bytes: u32) -> Result<(), AsmErrorKind> {
        let start = self.cursor();
        let end = checked_end(start, u64::from(bytes))?;
        match self.section {
            Some(Section::Data) => self.data_cursor = end,
            _ => self.text_cursor = end,
        }
        Ok(())
    }

    /// Switch section; an explicit address moves that section's cursor.
    pub(crate) fn enter(&mut self, section: Section, address: Option<u32>) {
        self.section = Some(section);
        match (section, address) {
            (Section::Text, Some(a)) => self.text_cursor = u64::from(a),
            (Section::Data, Some(a)) => self.data_cursor = u64::from(a),
            _ => {}
        }
        if section == Section::Text && self.entry.is_none() {
            self.entry = u32::try_from(self.text_cursor).ok();
        }
    }

    /// Write bytes at the current address and advance past them.
    pub(crate) fn emit(&mut self, bytes: &[u8]) -> Result<(), AsmErrorKind> {
        let address = self.address()?;
        place(&mut self.image, address, bytes)?;
        self.advance(bytes.len() as u32)
    }

    pub(crate) fn emit_zeros(&mut self, count: u32) -> Result<(), AsmErrorKind> {
        let address = self.address()?;
        checked_end(u64::from(address), u64::from(count))?;
        for offset in 0..count {
            let at = address + offset;
            if self.image.read_byte(at).is_some() {
                return Err(AsmErrorKind::Overlap(at));
            }
            self.image.write_byte(at, 0);
        }
        self.advance(count)
    }

    fn record(&mut self, number: usize, text: &str, parsed: ParsedLine) {
        self.lines.push(SourceLine {
            number,
            text: text.to_string(),
            parsed,
        });
    }

    fn first_pass_line(&mut self, number: usize, raw: &str) -> Result<(), AsmErrorKind> {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            return Ok(());
        }

        let body = match split_label(line) {
            Some((name, rest)) => {
                let address = self.address()?;
                self.resolver.define_label(name, address, number)?;
                self.record(
                    number,
                    line,
                    ParsedLine::Label {
                        name: name.to_string(),
                        address,
                    },
                );
                if split_label(rest).is_some() {
                    return Err(AsmErrorKind::Syntax(
                        "only one label is allowed per line".to_string(),
                    ));
                }
                rest
            }
            None => line,
        };
        if body.is_empty() {
            return Ok(());
        }

        if body.starts_with('.') {
            let (name, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
            let directive = Directive::from_str(name)
                .map_err(|_| AsmErrorKind::UnknownDirective(name.to_string()))?;
            let args = directive.split_args(rest);
            directive.apply(&args, self)?;
            self.record(number, line, ParsedLine::Directive { directive, args });
            return Ok(());
        }

        match self.section {
            Some(Section::Data) => return Err(AsmErrorKind::InstructionInDataSection),
            None => {
                log::warn!(
                    "line {}: instruction outside any section, assuming .text",
                    number
                );
                self.enter(Section::Text, None);
            }
            Some(Section::Text) => {}
        }
        let address = self.address()?;
        self.advance(4)?;
        self.record(
            number,
            line,
            ParsedLine::Instruction {
                source_text: body.to_string(),
                address,
            },
        );
        Ok(())
    }

    fn second_pass(mut self, text_base: u32) -> Result<Program, AsmError> {
        let mut instructions = Vec::new();
        for line in &self.lines {
            let ParsedLine::Instruction {
                source_text,
                address,
            } = &line.parsed
            else {
                continue;
            };
            let word = encode_instruction(source_text, *address, &self.resolver)
                .map_err(|kind| AsmError::new(line.number, line.text.as_str(), kind))?;
            place(&mut self.image, *address, &word.to_le_bytes())
                .map_err(|kind| AsmError::new(line.number, line.text.as_str(), kind))?;
            instructions.push(AssembledInstruction {
                address: *address,
                word,
                source: source_text.clone(),
                line: line.number,
            });
        }

        let symbols: BTreeMap<String, u32> = self
            .resolver
            .addresses()
            .map(|(name, address)| (name.to_string(), address))
            .collect();
        log::debug!(
            "pass 2: {} instruction(s), {} mapped byte(s)",
            instructions.len(),
            self.image.len()
        );
        Ok(Program::new(
            self.image,
            instructions,
            self.entry.unwrap_or(text_base),
            symbols,
        ))
    }
}

/// End of a `size`-byte run starting at `start`, if it stays inside the
/// 32-bit address space.
fn checked_end(start: u64, size: u64) -> Result<u64, AsmErrorKind> {
    start
        .checked_add(size)
        .filter(|end| *end <= 1 << 32)
        .ok_or(AsmErrorKind::AddressOverflow {
            address: start,
            size,
        })
}

/// Write `bytes` at `address`, refusing to overwrite anything already
/// placed.
fn place(image: &mut MemoryImage, address: u32, bytes: &[u8]) -> Result<(), AsmErrorKind> {
    checked_end(u64::from(address), bytes.len() as u64)?;
    for offset in 0..bytes.len() as u32 {
        if image.read_byte(address + offset).is_some() {
            return Err(AsmErrorKind::Overlap(address + offset));
        }
    }
    image.write_bytes(address, bytes);
    Ok(())
}

/// Assembler configuration. The run itself is [`Assembler::assemble`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assembler {
    text_base: u32,
    data_base: u32,
}

impl Default for Assembler {
    fn default() -> Self {
        Self {
            text_base: TEXT_BASE,
            data_base: DATA_BASE,
        }
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address `.text` starts at when given no argument.
    pub fn with_text_base(mut self, base: u32) -> Self {
        self.text_base = base;
        self
    }

    /// Set the address `.data` starts at when given no argument.
    pub fn with_data_base(mut self, base: u32) -> Self {
        self.data_base = base;
        self
    }

    /// Assemble `source`, stopping at the first error.
    pub fn assemble(&self, source: &str) -> Result<Program, AsmError> {
        let mut ctx = AsmContext::new(self.text_base, self.data_base);
        for (index, raw) in source.lines().enumerate() {
            ctx.first_pass_line(index + 1, raw)
                .map_err(|kind| AsmError::new(index + 1, raw.trim(), kind))?;
        }
        log::debug!(
            "pass 1: {} line(s) recorded, {} data byte(s)",
            ctx.lines.len(),
            ctx.image.len()
        );
        ctx.second_pass(self.text_base)
    }
}

/// Assemble with the default section bases.
pub fn assemble(source: &str) -> Result<Program, AsmError> {
    Assembler::new().assemble(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implicit_text_section() {
        let program = assemble("addi x5, x0, 5\naddi x6, x5, 10").unwrap();
        assert_eq!(program.entry_address(), TEXT_BASE);
        let words: Vec<u32> = program.instructions().iter().map(|i| i.word).collect();
        assert_eq!(words, vec![0x0050_0293, 0x00a2_8313]);
        assert_eq!(program.memory().read_word(TEXT_BASE), Some(0x0050_0293));
    }

    #[test]
    fn test_label_and_instruction_on_same_line() {
        let program = assemble(".text\nstart: addi x1, x0, 1\nj start").unwrap();
        assert_eq!(program.symbol("start"), Some(TEXT_BASE));
        assert_eq!(program.instructions().len(), 2);
        assert_eq!(program.instructions()[1].line, 3);
    }

    #[test]
    fn test_second_label_on_line_rejected() {
        let err = assemble("a: b: nop").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, AsmErrorKind::Syntax(_)));
    }

    #[test]
    fn test_sections_resume() {
        let source = "\
.text
    nop
.data
v1: .word 1
.text
    nop
.data
v2: .word 2
";
        let program = assemble(source).unwrap();
        assert_eq!(program.instructions()[1].address, TEXT_BASE + 4);
        assert_eq!(program.symbol("v2"), Some(DATA_BASE + 4));
    }

    #[test]
    fn test_custom_bases() {
        let program = Assembler::new()
            .with_text_base(0x1000)
            .with_data_base(0x2000)
            .assemble(".data\nx: .byte 1\n.text\nnop")
            .unwrap();
        assert_eq!(program.entry_address(), 0x1000);
        assert_eq!(program.symbol("x"), Some(0x2000));
    }

    #[test]
    fn test_unknown_directive() {
        let err = assemble(".section .rodata").unwrap_err();
        assert_eq!(
            err.kind,
            AsmErrorKind::UnknownDirective(".section".into())
        );
    }
}
