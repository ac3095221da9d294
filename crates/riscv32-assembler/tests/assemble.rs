//! End-to-end assembly tests.

use riscv32_assembler::{
    assemble, decode_imm, AsmErrorKind, ImmFormat, Program, DATA_BASE, TEXT_BASE,
};

fn data_bytes(program: &Program, start: u32, len: u32) -> Vec<Option<u8>> {
    (start..start + len)
        .map(|a| program.memory().read_byte(a))
        .collect()
}

#[test]
fn test_asciiz() {
    let program = assemble(".data\nmsg: .asciiz \"AB\"").expect("assembly failed");
    assert_eq!(
        data_bytes(&program, DATA_BASE, 4),
        vec![Some(0x41), Some(0x42), Some(0x00), None]
    );
    assert_eq!(program.symbol("msg"), Some(DATA_BASE));
}

#[test]
fn test_ascii_escapes() {
    let program = assemble(".data\n.ascii \"a\\n\\\"#\"  # trailing comment").unwrap();
    assert_eq!(
        data_bytes(&program, DATA_BASE, 5),
        vec![Some(b'a'), Some(b'\n'), Some(b'"'), Some(b'#'), None]
    );
}

#[test]
fn test_data_directives() {
    let source = "\
.data
w:  .word 0x12345678, -1
h:  .half 0xBEEF
b:  .byte 255, -128, 7
s:  .space 3
end: .byte 1
";
    let program = assemble(source).unwrap();
    assert_eq!(program.memory().read_word(DATA_BASE), Some(0x1234_5678));
    assert_eq!(program.memory().read_word(DATA_BASE + 4), Some(0xffff_ffff));
    assert_eq!(
        data_bytes(&program, DATA_BASE + 8, 2),
        vec![Some(0xef), Some(0xbe)]
    );
    assert_eq!(
        data_bytes(&program, DATA_BASE + 10, 3),
        vec![Some(0xff), Some(0x80), Some(0x07)]
    );
    assert_eq!(
        data_bytes(&program, DATA_BASE + 13, 3),
        vec![Some(0), Some(0), Some(0)]
    );
    assert_eq!(program.symbol("end"), Some(DATA_BASE + 16));
}

#[test]
fn test_byte_out_of_range() {
    let err = assemble(".data\n.byte 256").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(
        err.kind,
        AsmErrorKind::ValueOutOfRange {
            directive: ".byte",
            value: 256
        }
    );
    assert!(assemble(".data\n.byte -129").is_err());
}

#[test]
fn test_word_and_half_out_of_range() {
    let err = assemble(".data\n.word 0x100000005").unwrap_err();
    assert_eq!(
        err.kind,
        AsmErrorKind::ValueOutOfRange {
            directive: ".word",
            value: 0x1_0000_0005
        }
    );
    let err = assemble(".data\n.half 70000").unwrap_err();
    assert_eq!(
        err.kind,
        AsmErrorKind::ValueOutOfRange {
            directive: ".half",
            value: 70000
        }
    );
    assert!(assemble(".data\n.half -32769").is_err());
    assert!(assemble(".data\n.word -2147483649").is_err());

    let program = assemble(".data\n.word 0xffffffff, -2147483648\n.half 65535, -32768").unwrap();
    assert_eq!(program.memory().read_word(DATA_BASE), Some(0xffff_ffff));
    assert_eq!(program.memory().read_word(DATA_BASE + 4), Some(0x8000_0000));
    assert_eq!(
        data_bytes(&program, DATA_BASE + 8, 4),
        vec![Some(0xff), Some(0xff), Some(0x00), Some(0x80)]
    );
}

#[test]
fn test_data_past_end_of_address_space() {
    let err = assemble(".data 0xfffffffc\n.word 1, 2\n.text\nnop").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, AsmErrorKind::AddressOverflow { .. }));

    // the last word of the address space is still usable
    let program = assemble(".data 0xfffffffc\nlast: .word 9\n.text\nnop").unwrap();
    assert_eq!(program.memory().read_word(0xffff_fffc), Some(9));
    assert_eq!(program.memory().read_byte(0), None);

    let err = assemble(".text 0xfffffffc\nnop\nnop").unwrap_err();
    assert_eq!(err.line, 3);
    assert!(matches!(err.kind, AsmErrorKind::AddressOverflow { .. }));
}

#[test]
fn test_huge_space_is_rejected() {
    let err = assemble(".data\n.space 0xffffffff").unwrap_err();
    assert_eq!(
        err.kind,
        AsmErrorKind::AddressOverflow {
            address: u64::from(DATA_BASE),
            size: 0xffff_ffff
        }
    );
}

#[test]
fn test_overlapping_placement() {
    let err = assemble(".data 0x00400000\n.word 0xdeadbeef\n.text\naddi a0, zero, 1").unwrap_err();
    assert_eq!(err.line, 4);
    assert_eq!(err.kind, AsmErrorKind::Overlap(TEXT_BASE));

    let err = assemble(".data\n.word 1\n.data 0x10010002\n.byte 5").unwrap_err();
    assert_eq!(err.line, 4);
    assert_eq!(err.kind, AsmErrorKind::Overlap(DATA_BASE + 2));

    let err = assemble(".text\nnop\n.text 0x00400000\nnop").unwrap_err();
    assert_eq!(err.kind, AsmErrorKind::Overlap(TEXT_BASE));
}

#[test]
fn test_register_names_are_not_symbols() {
    for source in ["s1: nop", "fp: nop", ".data\nra: .word 1", ".equ f1, 4", ".equ x5 2"] {
        let err = assemble(source).unwrap_err();
        assert!(
            matches!(err.kind, AsmErrorKind::InvalidLabelName(_)),
            "{source}: {:?}",
            err.kind
        );
    }
    // names that merely contain a register name are fine
    let program = assemble("s1_loop: j s1_loop").unwrap();
    assert_eq!(program.symbol("s1_loop"), Some(TEXT_BASE));
}

#[test]
fn test_align() {
    let source = "\
.data
a: .byte 1
.align 2
b: .word 2
.text
nop
.align 3
c: nop
";
    let program = assemble(source).unwrap();
    assert_eq!(program.symbol("b"), Some(DATA_BASE + 4));
    // padding in data is written as zero bytes
    assert_eq!(
        data_bytes(&program, DATA_BASE + 1, 3),
        vec![Some(0), Some(0), Some(0)]
    );
    // in text only the address moves
    assert_eq!(program.symbol("c"), Some(TEXT_BASE + 8));
    assert_eq!(program.memory().read_byte(TEXT_BASE + 4), None);
}

#[test]
fn test_forward_branch_offset() {
    let source = "\
.text
    beq x0, x0, skip
    addi x1, x0, 1
skip:
    addi x2, x0, 2
";
    let program = assemble(source).unwrap();
    let beq = &program.instructions()[0];
    assert_eq!(decode_imm(beq.word, ImmFormat::B), 8);
    assert_eq!(program.symbol("skip"), Some(TEXT_BASE + 8));
}

#[test]
fn test_backward_jump_offset() {
    let program = assemble("loop: addi x1, x1, 1\njal x0, loop").unwrap();
    assert_eq!(decode_imm(program.instructions()[1].word, ImmFormat::J), -4);
}

#[test]
fn test_duplicate_label_lines() {
    let err = assemble("x: nop\nnop\nx: nop").unwrap_err();
    assert_eq!(err.line, 3);
    assert_eq!(
        err.kind,
        AsmErrorKind::DuplicateLabel {
            name: "x".into(),
            first_line: 1
        }
    );
}

#[test]
fn test_equ_constants() {
    let source = "\
.equ COUNT, 10
.equ STEP 2
.data
arr: .word COUNT, STEP
.text
    addi t0, zero, COUNT
    beq t0, t0, STEP
";
    let program = assemble(source).unwrap();
    assert_eq!(program.memory().read_word(DATA_BASE), Some(10));
    assert_eq!(program.memory().read_word(DATA_BASE + 4), Some(2));
    assert_eq!(decode_imm(program.instructions()[0].word, ImmFormat::I), 10);
    // constants are never PC-relative
    assert_eq!(decode_imm(program.instructions()[1].word, ImmFormat::B), 2);
}

#[test]
fn test_equ_redefinition() {
    let err = assemble(".equ A, 1\n.equ A, 2").unwrap_err();
    assert_eq!(err.kind, AsmErrorKind::SymbolRedefinition("A".into()));
}

#[test]
fn test_word_label_reference() {
    let source = "\
.text
main: nop
.data
ptr: .word main
";
    let program = assemble(source).unwrap();
    assert_eq!(program.memory().read_word(DATA_BASE), Some(TEXT_BASE));
}

#[test]
fn test_global_directive() {
    let program = assemble(".globl main\n.text\nmain: nop").unwrap();
    assert_eq!(program.symbol("main"), Some(TEXT_BASE));
    assert!(assemble(".global 9lives").is_err());
}

#[test]
fn test_section_errors() {
    let err = assemble(".data\naddi x1, x0, 1").unwrap_err();
    assert_eq!(err.kind, AsmErrorKind::InstructionInDataSection);

    let err = assemble(".text\n.word 5").unwrap_err();
    assert_eq!(err.kind, AsmErrorKind::DataDirectiveOutsideData(".word"));

    let err = assemble(".byte 1").unwrap_err();
    assert_eq!(err.kind, AsmErrorKind::DataDirectiveOutsideData(".byte"));

    let err = assemble(".text 0x400002").unwrap_err();
    assert!(matches!(err.kind, AsmErrorKind::ValueOutOfRange { .. }));
}

#[test]
fn test_argument_count_errors() {
    let err = assemble(".data 1, 2").unwrap_err();
    assert!(matches!(err.kind, AsmErrorKind::ArgumentCount { got: 2, .. }));
    let err = assemble(".data\n.word").unwrap_err();
    assert!(matches!(err.kind, AsmErrorKind::ArgumentCount { got: 0, .. }));
}

#[test]
fn test_explicit_addresses() {
    let source = "\
.data 0x20000000
x: .word 7
.text 0x00010000
start: nop
";
    let program = assemble(source).unwrap();
    assert_eq!(program.symbol("x"), Some(0x2000_0000));
    assert_eq!(program.entry_address(), 0x0001_0000);
    assert_eq!(program.instructions()[0].address, 0x0001_0000);
}

#[test]
fn test_error_carries_source_text() {
    let err = assemble("nop\n  addi x1, x0, 5000  # too big").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.text, "addi x1, x0, 5000  # too big");
    assert!(err.to_string().starts_with("line 2: immediate 5000"));
}

#[test]
fn test_undefined_symbol_in_pass_two() {
    let err = assemble("nop\njal ra, missing").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.kind, AsmErrorKind::UndefinedSymbol("missing".into()));
}

#[test]
fn test_mips_aliases() {
    let a = assemble("add $s10, $s1, $0").unwrap();
    let b = assemble("add x26, x9, x0").unwrap();
    assert_eq!(a.instructions()[0].word, b.instructions()[0].word);
}

#[test]
fn test_listing() {
    let program = assemble("addi x5, x0, 5").unwrap();
    assert_eq!(program.listing(false), "0x00400000: 0x00500293 addi x5, x0, 5\n");
    assert!(program
        .listing(true)
        .contains("00000000010100000000001010010011"));
}
