//! Single-word pseudo-instructions.
//!
//! Every expansion here is exactly one base instruction, so the first pass
//! can keep sizing each instruction line as 4 bytes.

use crate::inst::Mnemonic;

/// Rewrite a pseudo-instruction into its base form. Operands are already
/// register-normalized. Returns `None` when `name` is not a pseudo form with
/// this operand count.
pub fn expand(name: &str, ops: &[&str]) -> Option<(Mnemonic, Vec<String>)> {
    use Mnemonic::*;
    let (mnemonic, ops): (Mnemonic, Vec<&str>) = match (name.to_ascii_lowercase().as_str(), ops) {
        ("nop", []) => (Addi, vec!["x0", "x0", "0"]),
        ("mv", [rd, rs]) => (Addi, vec![*rd, *rs, "0"]),
        ("not", [rd, rs]) => (Xori, vec![*rd, *rs, "-1"]),
        ("neg", [rd, rs]) => (Sub, vec![*rd, "x0", *rs]),
        ("li", [rd, imm]) => (Addi, vec![*rd, "x0", *imm]),
        ("j", [target]) => (Jal, vec!["x0", *target]),
        ("jal", [target]) => (Jal, vec!["x1", *target]),
        ("jr", [rs]) => (Jalr, vec!["x0", *rs, "0"]),
        ("jalr", [rs]) => (Jalr, vec!["x1", *rs, "0"]),
        ("ret", []) => (Jalr, vec!["x0", "x1", "0"]),
        ("beqz", [rs, target]) => (Beq, vec![*rs, "x0", *target]),
        ("bnez", [rs, target]) => (Bne, vec![*rs, "x0", *target]),
        ("fmv.s", [rd, rs]) => (FsgnjS, vec![*rd, *rs, *rs]),
        ("fneg.s", [rd, rs]) => (FsgnjnS, vec![*rd, *rs, *rs]),
        ("fabs.s", [rd, rs]) => (FsgnjxS, vec![*rd, *rs, *rs]),
        _ => return None,
    };
    Some((mnemonic, ops.into_iter().map(String::from).collect()))
}
