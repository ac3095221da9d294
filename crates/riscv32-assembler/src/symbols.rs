//! Label and `.equ` constant tables.

use std::collections::BTreeMap;

use crate::{
    error::AsmErrorKind,
    parse::{is_identifier, looks_numeric, parse_int_literal},
    regs::lookup_alias,
};

/// A label entry. `.global` may register a name before it has an address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbol {
    pub address: Option<u32>,
    pub is_global: bool,
    /// Source line of the definition, once defined.
    pub line: Option<usize>,
}

/// How a label reference is turned into an immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    Absolute,
    /// Offset from the referencing instruction (branches and jumps).
    PcRelative,
}

/// Symbol and constant tables for one assembly run.
#[derive(Debug, Default)]
pub struct SymbolResolver {
    symbols: BTreeMap<String, Symbol>,
    constants: BTreeMap<String, i64>,
}

/// Register names are rewritten before operands are resolved, so they can
/// never be referenced as symbols.
fn check_name(name: &str) -> Result<(), AsmErrorKind> {
    if is_identifier(name) && lookup_alias(name).is_none() {
        Ok(())
    } else {
        Err(AsmErrorKind::InvalidLabelName(name.to_string()))
    }
}

impl SymbolResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `name` an address. Keeps a prior `.global` marking.
    pub fn define_label(&mut self, name: &str, address: u32, line: usize) -> Result<(), AsmErrorKind> {
        check_name(name)?;
        if self.constants.contains_key(name) {
            return Err(AsmErrorKind::SymbolRedefinition(name.to_string()));
        }
        let symbol = self.symbols.entry(name.to_string()).or_default();
        if symbol.address.is_some() {
            return Err(AsmErrorKind::DuplicateLabel {
                name: name.to_string(),
                first_line: symbol.line.unwrap_or_default(),
            });
        }
        symbol.address = Some(address);
        symbol.line = Some(line);
        Ok(())
    }

    pub fn mark_global(&mut self, name: &str) -> Result<(), AsmErrorKind> {
        check_name(name)?;
        self.symbols.entry(name.to_string()).or_default().is_global = true;
        Ok(())
    }

    /// Store an `.equ` constant. Its name must be unused in both tables.
    pub fn define_constant(&mut self, name: &str, value: i64) -> Result<(), AsmErrorKind> {
        check_name(name)?;
        if self.constants.contains_key(name) || self.symbols.contains_key(name) {
            return Err(AsmErrorKind::SymbolRedefinition(name.to_string()));
        }
        self.constants.insert(name.to_string(), value);
        Ok(())
    }

    /// Resolve an operand token to a number.
    ///
    /// Literals and constants come back unchanged. Labels resolve to their
    /// address, or to `address - current_address` under
    /// [`Relocation::PcRelative`].
    pub fn resolve(
        &self,
        token: &str,
        relocation: Relocation,
        current_address: u32,
    ) -> Result<i64, AsmErrorKind> {
        let token = token.trim();
        if let Some(value) = parse_int_literal(token) {
            return Ok(value);
        }
        if looks_numeric(token) {
            return Err(AsmErrorKind::Syntax(format!(
                "invalid integer literal `{}`",
                token
            )));
        }
        if let Some(&value) = self.constants.get(token) {
            return Ok(value);
        }
        match self.symbols.get(token).and_then(|s| s.address) {
            Some(address) => Ok(match relocation {
                Relocation::Absolute => address as i64,
                Relocation::PcRelative => address as i64 - current_address as i64,
            }),
            None => Err(AsmErrorKind::UndefinedSymbol(token.to_string())),
        }
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<i64> {
        self.constants.get(name).copied()
    }

    /// Every label that received an address.
    pub fn addresses(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.symbols
            .iter()
            .filter_map(|(name, s)| s.address.map(|a| (name.as_str(), a)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_label_reports_first_line() {
        let mut table = SymbolResolver::new();
        table.define_label("loop", 0x400000, 3).unwrap();
        assert_eq!(
            table.define_label("loop", 0x400010, 9),
            Err(AsmErrorKind::DuplicateLabel {
                name: "loop".into(),
                first_line: 3
            })
        );
    }

    #[test]
    fn test_global_before_definition() {
        let mut table = SymbolResolver::new();
        table.mark_global("main").unwrap();
        assert_eq!(table.symbol("main").unwrap().address, None);
        table.define_label("main", 0x400000, 2).unwrap();
        let main = table.symbol("main").unwrap();
        assert!(main.is_global);
        assert_eq!(main.address, Some(0x400000));
        assert!(matches!(
            table.resolve("main", Relocation::Absolute, 0),
            Ok(0x400000)
        ));
    }

    #[test]
    fn test_resolve_relocations() {
        let mut table = SymbolResolver::new();
        table.define_label("target", 0x400010, 1).unwrap();
        assert_eq!(
            table.resolve("target", Relocation::PcRelative, 0x400004),
            Ok(12)
        );
        assert_eq!(
            table.resolve("target", Relocation::PcRelative, 0x400020),
            Ok(-16)
        );
        assert_eq!(
            table.resolve("target", Relocation::Absolute, 0x400020),
            Ok(0x400010)
        );
        // literals are never made relative
        assert_eq!(table.resolve("8", Relocation::PcRelative, 0x400020), Ok(8));
    }

    #[test]
    fn test_constants() {
        let mut table = SymbolResolver::new();
        table.define_constant("SIZE", 64).unwrap();
        assert_eq!(table.resolve("SIZE", Relocation::PcRelative, 100), Ok(64));
        assert_eq!(
            table.define_constant("SIZE", 1),
            Err(AsmErrorKind::SymbolRedefinition("SIZE".into()))
        );
        assert_eq!(
            table.define_label("SIZE", 0, 4),
            Err(AsmErrorKind::SymbolRedefinition("SIZE".into()))
        );
    }

    #[test]
    fn test_undefined_and_invalid() {
        let mut table = SymbolResolver::new();
        assert_eq!(
            table.resolve("nowhere", Relocation::Absolute, 0),
            Err(AsmErrorKind::UndefinedSymbol("nowhere".into()))
        );
        assert!(matches!(
            table.resolve("12z", Relocation::Absolute, 0),
            Err(AsmErrorKind::Syntax(_))
        ));
        assert_eq!(
            table.define_label("1st", 0, 1),
            Err(AsmErrorKind::InvalidLabelName("1st".into()))
        );
        assert!(table.mark_global("bad-name").is_err());
    }

    #[test]
    fn test_global_only_is_undefined() {
        let mut table = SymbolResolver::new();
        table.mark_global("later").unwrap();
        assert_eq!(
            table.resolve("later", Relocation::Absolute, 0),
            Err(AsmErrorKind::UndefinedSymbol("later".into()))
        );
    }
}
