//! End-to-end assembly scenarios: whole source files in, whole object
//! files and listings out.

use mmxi_asm::asm::assemble_to_strings;
use mmxi_asm::err::AsmErrKind;
use mmxi_asm::parse::{parse_program, Limits};

fn line(label: &str, opcode: &str, operands: &str) -> String {
    format!("{label:<6}   {opcode:<5}   {operands}")
}

fn src(lines: &[(&str, &str, &str)]) -> String {
    let mut out = String::new();
    for (label, opcode, operands) in lines {
        out.push_str(&line(label, opcode, operands));
        out.push('\n');
    }
    out
}

fn assemble(lines: &[(&str, &str, &str)]) -> (String, String) {
    let out = parse_program(&src(lines), &Limits::default()).unwrap();
    assert!(out.warnings.is_empty(), "unexpected warnings: {:?}", out.warnings);
    assemble_to_strings(&out.program).unwrap()
}

#[test]
fn demo_program() {
    let (obj, listing) = assemble(&[
        ("DEMO", ".ORIG", "x3000"),
        ("", "JMP", "NEXT"),
        ("NEXT", "BRP", "NEXT"),
        ("", ".END", ""),
    ]);
    assert_eq!(obj, "HDEMO  30000002\nT30004001\nT30010201\nE3000\n");

    let lines: Vec<_> = listing.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "(3000) 4001 0100000000000001 (   2)          JMP   NEXT");
    assert_eq!(lines[2], "(3001) 0201 0000001000000001 (   3) NEXT     BRP   NEXT");
}

#[test]
fn absolute_program_with_data() {
    let (obj, _) = assemble(&[
        ("CALC", ".ORIG", "x4000"),
        ("COUNT", ".EQU", "#3"),
        ("", "AND", "R0,R0,#0"),
        ("LOOP", "ADD", "R0,R0,#1"),
        ("", "LD", "R1,DATA"),
        ("", "BRNZP", "LOOP"),
        ("DATA", ".FILL", "COUNT"),
        ("BUF", ".BLKW", "COUNT"),
        ("", "TRAP", "x25"),
        ("", ".END", "LOOP"),
    ]);
    assert_eq!(
        obj,
        "HCALC  40000009\n\
         T40005020\n\
         T40011021\n\
         T40022204\n\
         T40030E01\n\
         T40040003\n\
         T4008F025\n\
         E4001\n"
    );
}

#[test]
fn relocatable_program_with_linkage() {
    let (obj, listing) = assemble(&[
        ("SEG", ".ORIG", ""),
        ("", ".ENT", "START,TAIL"),
        ("", ".EXT", "OTHER,HELPER"),
        ("START", "LD", "R0,=#25"),
        ("", "JSR", "HELPER"),
        ("TAIL", "JMP", "OTHER"),
        ("", ".FILL", "START"),
        ("", ".END", "START"),
    ]);
    assert_eq!(
        obj,
        "HSEG   00000005\n\
         NSTART 0000R\n\
         NTAIL  0002R\n\
         XOTHER\n\
         XHELPER\n\
         T00002004M1\n\
         T00014800X9HELPER\n\
         T00024000X9OTHER\n\
         T00030000M1\n\
         T00040019\n\
         E0000\n"
    );
    // the pooled literal gets its own listing line
    assert!(listing.contains("(0004) 0019 0000000000011001 ( lit)\n"));
}

#[test]
fn strings_and_literals() {
    let (obj, _) = assemble(&[
        ("DEMO", ".ORIG", "x3000"),
        ("MSG", ".STRZ", "\"Hi\""),
        ("", "LD", "R0,=x41"),
        ("", "LD", "R1,=#65"),
        ("", ".END", ""),
    ]);
    // x41 and #65 pool as one word at x3005
    assert_eq!(
        obj,
        "HDEMO  30000006\n\
         T30000048\n\
         T30010069\n\
         T30020000\n\
         T30032005\n\
         T30042205\n\
         T30050041\n\
         E3000\n"
    );
}

#[test]
fn assembly_is_idempotent() {
    let lines = [
        ("SEG", ".ORIG", ""),
        ("", ".ENT", "START"),
        ("START", "LD", "R0,=#25"),
        ("", "LD", "R1,=#7"),
        ("", ".END", "START"),
    ];
    let text = src(&lines);
    let first = parse_program(&text, &Limits::default()).unwrap();
    let second = parse_program(&text, &Limits::default()).unwrap();
    assert_eq!(first.program, second.program);
    assert_eq!(
        assemble_to_strings(&first.program).unwrap(),
        assemble_to_strings(&second.program).unwrap()
    );
}

#[test]
fn out_of_bounds_immediate_rejected() {
    let out = parse_program(
        &src(&[
            ("DEMO", ".ORIG", "x3000"),
            ("", "ADD", "R0,R0,#32"),
            ("", ".END", ""),
        ]),
        &Limits::default(),
    )
    .unwrap();
    let err = assemble_to_strings(&out.program).unwrap_err();
    assert_eq!(err.kind, AsmErrKind::ImmediateOutOfBounds);
    assert_eq!(err.line, Some(2));
}

#[test]
fn duplicate_label_rejected() {
    let err = parse_program(
        &src(&[
            ("DEMO", ".ORIG", "x3000"),
            ("LOOP", "DBUG", ""),
            ("LOOP", "DBUG", ""),
            ("", ".END", ""),
        ]),
        &Limits::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind, AsmErrKind::DuplicateSymbol("LOOP".to_string()));
    assert_eq!(err.line, Some(3));
}

#[test]
fn cross_page_reference_rejected() {
    let out = parse_program(
        &src(&[
            ("DEMO", ".ORIG", "x3000"),
            ("", "JMP", "FAR"),
            ("", ".BLKW", "x200"),
            ("FAR", "DBUG", ""),
            ("", ".END", ""),
        ]),
        &Limits::default(),
    )
    .unwrap();
    let err = assemble_to_strings(&out.program).unwrap_err();
    assert_eq!(err.kind, AsmErrKind::PageMismatch);
}

#[test]
fn comments_and_line_numbers_in_listing() {
    let text = format!(
        "; leading comment\n{}\n; body comment\n{}\n{}\n",
        line("DEMO", ".ORIG", "x3000"),
        line("", "DBUG", ""),
        line("", ".END", ""),
    );
    let out = parse_program(&text, &Limits::default()).unwrap();
    let (_, listing) = assemble_to_strings(&out.program).unwrap();
    // record lines keep their physical numbers despite skipped comments
    assert!(listing.contains("(   2)"));
    assert!(listing.contains("(3000) 8000 1000000000000000 (   4)"));
    assert!(listing.contains("(   5)"));
}

#[test]
fn model_dump_roundtrip() {
    let out = parse_program(
        &src(&[
            ("SEG", ".ORIG", ""),
            ("", ".ENT", "START"),
            ("", ".EXT", "OTHER"),
            ("START", "LD", "R0,=#25"),
            ("", ".END", "START"),
        ]),
        &Limits::default(),
    )
    .unwrap();

    let mut dump = Vec::new();
    out.program.write_state_to(&mut dump).unwrap();
    let dump = String::from_utf8(dump).unwrap();

    assert!(dump.contains("segment name  = 'SEG'"));
    assert!(dump.contains("relocatable   = true"));
    assert!(dump.contains("START    x0000 R"));
    assert!(dump.contains("x0019 @ x0001"));
    assert!(dump.contains("OTHER"));
}
