//! Assembler directives (`.data`, `.word`, `.equ`, ...).

use nom::combinator::all_consuming;
use strum::{EnumString, IntoStaticStr};

use crate::{
    asm::{AsmContext, Section},
    error::AsmErrorKind,
    parse::{is_identifier, parse_int_literal, string_literal},
    symbols::Relocation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum Directive {
    #[strum(serialize = ".data")]
    Data,
    #[strum(serialize = ".text")]
    Text,
    #[strum(serialize = ".word")]
    Word,
    #[strum(serialize = ".half")]
    Half,
    #[strum(serialize = ".byte")]
    Byte,
    #[strum(serialize = ".ascii")]
    Ascii,
    #[strum(serialize = ".asciiz")]
    Asciiz,
    #[strum(serialize = ".space")]
    Space,
    #[strum(serialize = ".align")]
    Align,
    #[strum(serialize = ".global")]
    Global,
    #[strum(serialize = ".globl")]
    Globl,
    #[strum(serialize = ".extern")]
    Extern,
    #[strum(serialize = ".equ")]
    Equ,
}

impl Directive {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Minimum and (optional) maximum argument count.
    pub fn arg_bounds(self) -> (usize, Option<usize>) {
        match self {
            Directive::Data | Directive::Text => (0, Some(1)),
            Directive::Word | Directive::Half | Directive::Byte => (1, None),
            Directive::Ascii
            | Directive::Asciiz
            | Directive::Space
            | Directive::Align
            | Directive::Global
            | Directive::Globl => (1, Some(1)),
            Directive::Extern | Directive::Equ => (2, Some(2)),
        }
    }

    /// Split the text after the directive name into arguments.
    ///
    /// String directives take the whole literal as one argument; the rest
    /// are comma separated, and the two-argument forms also accept spaces.
    pub fn split_args(self, rest: &str) -> Vec<String> {
        let rest = rest.trim();
        if rest.is_empty() {
            return Vec::new();
        }
        match self {
            Directive::Ascii | Directive::Asciiz => vec![rest.to_string()],
            Directive::Extern | Directive::Equ if !rest.contains(',') => {
                rest.split_whitespace().map(String::from).collect()
            }
            _ => rest.split(',').map(|a| a.trim().to_string()).collect(),
        }
    }

    fn check_arg_count(self, got: usize) -> Result<(), AsmErrorKind> {
        let (min, max) = self.arg_bounds();
        if got >= min && max.map_or(true, |max| got <= max) {
            return Ok(());
        }
        let expected = match max {
            None => format!("{}+", min),
            Some(max) if max == min => format!("{}", min),
            Some(max) => format!("{}-{}", min, max),
        };
        Err(AsmErrorKind::ArgumentCount {
            directive: self.name(),
            expected,
            got,
        })
    }

    /// Apply the directive to the first-pass state.
    pub(crate) fn apply(self, args: &[String], ctx: &mut AsmContext) -> Result<(), AsmErrorKind> {
        self.check_arg_count(args.len())?;
        if let Some(empty) = args.iter().find(|a| a.is_empty()) {
            return Err(AsmErrorKind::Syntax(format!(
                "empty argument `{}` to {}",
                empty,
                self.name()
            )));
        }

        match self {
            Directive::Data => {
                let address = section_address(self, args)?;
                ctx.enter(Section::Data, address);
            }
            Directive::Text => {
                let address = section_address(self, args)?;
                if let Some(address) = address.filter(|a| a % 4 != 0) {
                    return Err(AsmErrorKind::ValueOutOfRange {
                        directive: self.name(),
                        value: address as i64,
                    });
                }
                ctx.enter(Section::Text, address);
            }
            Directive::Word | Directive::Half | Directive::Byte => {
                self.require_data(ctx)?;
                for arg in args {
                    let value = ctx
                        .resolver
                        .resolve(arg, Relocation::Absolute, ctx.address()?)?;
                    // signed or unsigned interpretations are both accepted
                    let (min, max) = match self {
                        Directive::Word => (i64::from(i32::MIN), i64::from(u32::MAX)),
                        Directive::Half => (i64::from(i16::MIN), i64::from(u16::MAX)),
                        _ => (i64::from(i8::MIN), i64::from(u8::MAX)),
                    };
                    if !(min..=max).contains(&value) {
                        return Err(AsmErrorKind::ValueOutOfRange {
                            directive: self.name(),
                            value,
                        });
                    }
                    match self {
                        Directive::Word => ctx.emit(&(value as u32).to_le_bytes())?,
                        Directive::Half => ctx.emit(&(value as u16).to_le_bytes())?,
                        _ => ctx.emit(&[value as u8])?,
                    }
                }
            }
            Directive::Ascii | Directive::Asciiz => {
                self.require_data(ctx)?;
                let (_, text) = all_consuming(string_literal)(args[0].as_str()).map_err(|_| {
                    AsmErrorKind::Syntax(format!(
                        "invalid string literal for {}: {}",
                        self.name(),
                        args[0]
                    ))
                })?;
                let mut bytes = text.into_bytes();
                if self == Directive::Asciiz {
                    bytes.push(0);
                }
                ctx.emit(&bytes)?;
            }
            Directive::Space => {
                self.require_data(ctx)?;
                let count = ctx
                    .resolver
                    .resolve(&args[0], Relocation::Absolute, ctx.address()?)?;
                let count = u32::try_from(count).map_err(|_| AsmErrorKind::ValueOutOfRange {
                    directive: self.name(),
                    value: count,
                })?;
                ctx.emit_zeros(count)?;
            }
            Directive::Align => {
                let section = ctx.section.ok_or_else(|| {
                    AsmErrorKind::Syntax(".align needs a .data or .text section".to_string())
                })?;
                let power = ctx
                    .resolver
                    .resolve(&args[0], Relocation::Absolute, ctx.address()?)?;
                if !(0..=31).contains(&power) {
                    return Err(AsmErrorKind::ValueOutOfRange {
                        directive: self.name(),
                        value: power,
                    });
                }
                let address = ctx.address()?;
                let aligned = address.checked_next_multiple_of(1u32 << power).ok_or(
                    AsmErrorKind::ValueOutOfRange {
                        directive: self.name(),
                        value: power,
                    },
                )?;
                match section {
                    Section::Data => ctx.emit_zeros(aligned - address)?,
                    Section::Text => ctx.advance(aligned - address)?,
                }
            }
            Directive::Global | Directive::Globl => ctx.resolver.mark_global(&args[0])?,
            Directive::Extern => {
                if !is_identifier(&args[0]) {
                    return Err(AsmErrorKind::InvalidLabelName(args[0].clone()));
                }
                log::warn!(
                    ".extern {} {} is recorded but not resolved",
                    args[0],
                    args[1]
                );
            }
            Directive::Equ => {
                let value = ctx
                    .resolver
                    .resolve(&args[1], Relocation::Absolute, ctx.address()?)?;
                ctx.resolver.define_constant(&args[0], value)?;
            }
        }
        Ok(())
    }

    fn require_data(self, ctx: &AsmContext) -> Result<(), AsmErrorKind> {
        if ctx.section == Some(Section::Data) {
            Ok(())
        } else {
            Err(AsmErrorKind::DataDirectiveOutsideData(self.name()))
        }
    }
}

fn section_address(directive: Directive, args: &[String]) -> Result<Option<u32>, AsmErrorKind> {
    let Some(arg) = args.first() else {
        return Ok(None);
    };
    let value = parse_int_literal(arg).ok_or_else(|| {
        AsmErrorKind::Syntax(format!("invalid address for {}: {}", directive.name(), arg))
    })?;
    u32::try_from(value)
        .map(Some)
        .map_err(|_| AsmErrorKind::ValueOutOfRange {
            directive: directive.name(),
            value,
        })
}
