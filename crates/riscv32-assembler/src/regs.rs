//! RISC-V 32-bit integer and float registers, plus source-level alias
//! normalization.

use core::fmt;

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{opt, recognize},
    sequence::pair,
    IResult,
};

/// RISC-V 32-bit general-purpose register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gpr(u8);

impl Gpr {
    /// Create a new GPR from register number (0-31).
    ///
    /// # Panics
    ///
    /// Panics if the register number is >= 32.
    pub fn new(num: u8) -> Self {
        assert!(num < 32, "Register number must be < 32");
        Self(num)
    }

    /// Get the register number (0-31).
    pub fn num(&self) -> u8 {
        self.0
    }
}

// Named registers
impl Gpr {
    pub const ZERO: Gpr = Gpr(0);
    pub const RA: Gpr = Gpr(1);
    pub const SP: Gpr = Gpr(2);
    pub const GP: Gpr = Gpr(3);
    pub const TP: Gpr = Gpr(4);
    pub const T0: Gpr = Gpr(5);
    pub const T1: Gpr = Gpr(6);
    pub const T2: Gpr = Gpr(7);
    pub const S0: Gpr = Gpr(8);
    pub const S1: Gpr = Gpr(9);
    pub const A0: Gpr = Gpr(10);
    pub const A1: Gpr = Gpr(11);
    pub const A2: Gpr = Gpr(12);
    pub const A3: Gpr = Gpr(13);
    pub const A4: Gpr = Gpr(14);
    pub const A5: Gpr = Gpr(15);
    pub const A6: Gpr = Gpr(16);
    pub const A7: Gpr = Gpr(17);
    pub const S2: Gpr = Gpr(18);
    pub const S3: Gpr = Gpr(19);
    pub const S4: Gpr = Gpr(20);
    pub const S5: Gpr = Gpr(21);
    pub const S6: Gpr = Gpr(22);
    pub const S7: Gpr = Gpr(23);
    pub const S8: Gpr = Gpr(24);
    pub const S9: Gpr = Gpr(25);
    pub const S10: Gpr = Gpr(26);
    pub const S11: Gpr = Gpr(27);
    pub const T3: Gpr = Gpr(28);
    pub const T4: Gpr = Gpr(29);
    pub const T5: Gpr = Gpr(30);
    pub const T6: Gpr = Gpr(31);

    const ABI_NAMES: [&'static str; 32] = [
        "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3",
        "a4", "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11",
        "t3", "t4", "t5", "t6",
    ];

    /// Parse a register name string into a Gpr.
    ///
    /// Supports both named registers (zero, ra, sp, fp, a0-a7, s0-s11, t0-t6)
    /// and numeric registers (x0-x31). Names are lowercase.
    ///
    /// # Errors
    ///
    /// Returns an error string if the register name is invalid.
    pub fn from_name(name: &str) -> Result<Self, String> {
        if name == "fp" {
            return Ok(Gpr::S0);
        }
        if let Some(num) = Self::ABI_NAMES.iter().position(|abi| *abi == name) {
            return Ok(Gpr(num as u8));
        }
        if let Some(num) = name.strip_prefix('x').and_then(|n| n.parse::<u8>().ok()) {
            if num < 32 {
                return Ok(Gpr(num));
            }
        }
        Err(format!("Invalid register name: {}", name))
    }
}

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::ABI_NAMES[self.0 as usize])
    }
}

/// RV32F single-precision float register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fpr(u8);

impl Fpr {
    /// # Panics
    ///
    /// Panics if the register number is >= 32.
    pub fn new(num: u8) -> Self {
        assert!(num < 32, "Register number must be < 32");
        Self(num)
    }

    pub fn num(&self) -> u8 {
        self.0
    }

    /// Parse `f0`-`f31` or an ABI name (`ft0`-`ft11`, `fs0`-`fs11`, `fa0`-`fa7`).
    pub fn from_name(name: &str) -> Result<Self, String> {
        let suffix = |prefix: &str| name.strip_prefix(prefix).and_then(|n| n.parse::<u8>().ok());
        let num = if let Some(n) = suffix("ft") {
            match n {
                0..=7 => Some(n),
                8..=11 => Some(n + 20),
                _ => None,
            }
        } else if let Some(n) = suffix("fs") {
            match n {
                0..=1 => Some(n + 8),
                2..=11 => Some(n + 16),
                _ => None,
            }
        } else if let Some(n) = suffix("fa") {
            (n < 8).then_some(n + 10)
        } else {
            suffix("f").filter(|n| *n < 32)
        };
        num.map(Fpr)
            .ok_or_else(|| format!("Invalid float register name: {}", name))
    }
}

impl fmt::Display for Fpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            n @ 0..=7 => write!(f, "ft{}", n),
            n @ 8..=9 => write!(f, "fs{}", n - 8),
            n @ 10..=17 => write!(f, "fa{}", n - 10),
            n @ 18..=27 => write!(f, "fs{}", n - 16),
            n => write!(f, "ft{}", n - 20),
        }
    }
}

/// A register operand of either class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    X(Gpr),
    F(Fpr),
}

impl Register {
    /// Canonical spelling used after normalization (`x5`, `f10`).
    pub fn canonical(&self) -> String {
        match self {
            Register::X(r) => format!("x{}", r.num()),
            Register::F(r) => format!("f{}", r.num()),
        }
    }
}

/// Look up a source token as a register alias, case-insensitively.
///
/// Accepts ABI names, `xN`, `fN`, float ABI names and the `$`-prefixed
/// forms (`$t0`, `$fp`, `$0`-`$31`).
pub fn lookup_alias(token: &str) -> Option<Register> {
    let lower = token.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix('$') {
        if let Ok(num) = rest.parse::<u8>() {
            return (num < 32).then(|| Register::X(Gpr(num)));
        }
        return Gpr::from_name(rest).ok().map(Register::X);
    }
    Gpr::from_name(&lower)
        .map(Register::X)
        .or_else(|_| Fpr::from_name(&lower).map(Register::F))
        .ok()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(char('$')), take_while1(is_word_char)))(input)
}

/// Replace every register alias in `line` with its canonical name.
///
/// Tokens are matched whole, so `$s1` is never found inside `$s10` and a
/// label like `loop_a0` is left alone.
pub fn normalize_registers(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(c) = rest.chars().next() {
        match word(rest) {
            Ok((tail, token)) => {
                match lookup_alias(token) {
                    Some(reg) => out.push_str(&reg.canonical()),
                    None => out.push_str(token),
                }
                rest = tail;
            }
            Err(_) => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}
