//! Line-level parsers: comments, labels, literals, operands.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1, take_while_m_n},
    character::complete::{char, digit1, hex_digit1, none_of, space0, space1},
    combinator::{all_consuming, eof, map, map_res, opt, recognize, value},
    multi::{fold_many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn sign(input: &str) -> IResult<&str, i64> {
    map(opt(alt((char('-'), char('+')))), |s| {
        if s == Some('-') {
            -1
        } else {
            1
        }
    })(input)
}

fn hex(input: &str) -> IResult<&str, i64> {
    map_res(
        preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
        |s: &str| i64::from_str_radix(s, 16),
    )(input)
}

fn binary(input: &str) -> IResult<&str, i64> {
    map_res(
        preceded(
            alt((tag("0b"), tag("0B"))),
            take_while1(|c: char| c == '0' || c == '1'),
        ),
        |s: &str| i64::from_str_radix(s, 2),
    )(input)
}

fn decimal(input: &str) -> IResult<&str, i64> {
    map_res(digit1, |s: &str| s.parse::<i64>())(input)
}

/// Parse an integer literal: optional sign, then hex, binary or decimal.
pub(crate) fn integer(input: &str) -> IResult<&str, i64> {
    map(pair(sign, alt((hex, binary, decimal))), |(s, v)| s * v)(input)
}

/// Parse a label or symbol name: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while_m_n(1, 1, |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_word_char),
    ))(input)
}

/// Parse a whole token as an integer literal.
pub fn parse_int_literal(token: &str) -> Option<i64> {
    all_consuming(integer)(token).ok().map(|(_, v)| v)
}

pub fn is_identifier(name: &str) -> bool {
    all_consuming(identifier)(name).is_ok()
}

/// True if the token starts like a number (so it can't be a symbol).
pub(crate) fn looks_numeric(token: &str) -> bool {
    let digits = token.strip_prefix(['-', '+']).unwrap_or(token);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

/// Drop a trailing `#` comment. A `#` inside a string literal is kept.
pub(crate) fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Split `name: rest` into the label candidate and the remainder.
///
/// Only a `:` that appears before any string literal counts, and directive
/// lines never start with a label.
pub(crate) fn split_label(line: &str) -> Option<(&str, &str)> {
    if line.starts_with('.') {
        return None;
    }
    let colon = line.find(':')?;
    if line.find('"').is_some_and(|quote| quote < colon) {
        return None;
    }
    Some((line[..colon].trim(), line[colon + 1..].trim()))
}

fn escape_code(input: &str) -> IResult<&str, char> {
    alt((
        value('\n', char('n')),
        value('\t', char('t')),
        value('\r', char('r')),
        value('\0', char('0')),
        value('"', char('"')),
        value('\\', char('\\')),
    ))(input)
}

fn string_char(input: &str) -> IResult<&str, char> {
    alt((preceded(char('\\'), escape_code), none_of("\\\"")))(input)
}

/// Parse a double-quoted string literal with `\n \t \r \0 \" \\` escapes.
pub(crate) fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(string_char, String::new, |mut acc, c| {
            acc.push(c);
            acc
        }),
        char('"'),
    )(input)
}

fn mnemonic(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| is_word_char(c) || c == '.')(input)
}

fn operand_sep(input: &str) -> IResult<&str, ()> {
    alt((
        value((), tuple((space0, char(','), space0))),
        value((), space1),
    ))(input)
}

fn plain_operand(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && c != ',' && c != '(' && c != ')')(input)
}

/// `imm(base)` or `(base)`, yielded as `[base, imm]`.
fn offset_operand(input: &str) -> IResult<&str, Vec<&str>> {
    map(
        pair(
            opt(plain_operand),
            delimited(
                pair(char('('), space0),
                take_while1(is_word_char),
                pair(space0, char(')')),
            ),
        ),
        |(imm, base)| vec![base, imm.unwrap_or("0")],
    )(input)
}

fn operand(input: &str) -> IResult<&str, Vec<&str>> {
    alt((offset_operand, map(plain_operand, |s| vec![s])))(input)
}

/// Parse `mnemonic op, op, ...`, flattening `imm(rs1)` into `rs1, imm`.
pub(crate) fn instruction(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    map(
        all_consuming(terminated(
            pair(
                mnemonic,
                opt(preceded(space1, separated_list0(operand_sep, operand))),
            ),
            pair(space0, eof),
        )),
        |(m, ops)| (m, ops.unwrap_or_default().into_iter().flatten().collect()),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer() {
        assert_eq!(integer("42"), Ok(("", 42)));
        assert_eq!(integer("-17"), Ok(("", -17)));
        assert_eq!(integer("0x1F"), Ok(("", 31)));
        assert_eq!(integer("-0x10"), Ok(("", -16)));
        assert_eq!(integer("0b101"), Ok(("", 5)));
        assert_eq!(integer("7,"), Ok((",", 7)));
    }

    #[test]
    fn test_integer_invalid() {
        assert!(integer("abc").is_err());
        assert_eq!(parse_int_literal("0x"), None);
        assert_eq!(parse_int_literal("12abc"), None);
        assert_eq!(parse_int_literal("99999999999999999999999"), None);
    }

    #[test]
    fn test_identifier() {
        assert!(is_identifier("main"));
        assert!(is_identifier("_loop_2"));
        assert!(!is_identifier("2loop"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("addi x1, x0, 1 # one"), "addi x1, x0, 1 ");
        assert_eq!(strip_comment(".asciiz \"#1\" # tag"), ".asciiz \"#1\" ");
        assert_eq!(strip_comment(".ascii \"a\\\"#\""), ".ascii \"a\\\"#\"");
    }

    #[test]
    fn test_split_label() {
        assert_eq!(split_label("loop: addi x1, x1, 1"), Some(("loop", "addi x1, x1, 1")));
        assert_eq!(split_label("end:"), Some(("end", "")));
        assert_eq!(split_label(".ascii \"a:b\""), None);
        assert_eq!(split_label("addi x1, x1, 1"), None);
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("\"AB\""), Ok(("", "AB".to_string())));
        assert_eq!(
            string_literal(r#""a\n\t\"\\""#),
            Ok(("", "a\n\t\"\\".to_string()))
        );
        assert_eq!(string_literal("\"\""), Ok(("", String::new())));
        assert!(string_literal(r#""bad\q""#).is_err());
    }

    #[test]
    fn test_instruction_operands() {
        assert_eq!(
            instruction("add x1, x2, x3"),
            Ok(("", ("add", vec!["x1", "x2", "x3"])))
        );
        assert_eq!(
            instruction("lw x5, -4(x2)"),
            Ok(("", ("lw", vec!["x5", "x2", "-4"])))
        );
        assert_eq!(
            instruction("sw x5,(x2)"),
            Ok(("", ("sw", vec!["x5", "x2", "0"])))
        );
        assert_eq!(instruction("addi x1 x2 5  "), Ok(("", ("addi", vec!["x1", "x2", "5"]))));
        assert_eq!(instruction("ecall"), Ok(("", ("ecall", vec![]))));
        assert_eq!(
            instruction("fadd.s f1, f2, f3, rtz"),
            Ok(("", ("fadd.s", vec!["f1", "f2", "f3", "rtz"])))
        );
        assert!(instruction("add x1, (x2").is_err());
    }
}
