//! Parsing MMXI assembly source into a [`Program`].
//!
//! This is the first pass of the assembler. It runs over the source exactly
//! once: splitting each record into its fixed-column fields, classifying
//! operands, checking them against the descriptor tables, building the
//! symbol table and literal pool, and tracking the location counter. At
//! `.END` the model is frozen (pool addresses assigned, segment length and
//! exec address fixed) and handed to the code generator.
//!
//! The record grammar is strictly columnar:
//!
//! ```text
//! cols 1-6    label (optional)
//! cols 7-9    blank
//! cols 10-14  opcode
//! cols 18+    operands, comma separated, ended by whitespace or ';'
//! ```
//!
//! Comment lines start with `;` and are skipped but still counted, so line
//! numbers in errors and listings match the source file.

pub mod lex;

use crate::ast::Operand;
use crate::err::{AsmErr, AsmErrKind};
use crate::ops;
use crate::program::{Program, SourceRecord};

/// Resource ceilings for one assembly run.
///
/// Hitting a ceiling is a warning, not an error: the offending entry is
/// dropped (or, for the record ceiling, the segment is finalized early) and
/// parsing continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of locally defined symbols.
    pub max_symbols: usize,
    /// Maximum number of pooled literals.
    pub max_literals: usize,
    /// Maximum number of source records before forced finalization.
    pub max_records: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_symbols: 100, max_literals: 50, max_records: 2000 }
    }
}

/// The result of a successful parse.
#[derive(Debug)]
pub struct ParseOutput {
    /// The frozen program model.
    pub program: Program,
    /// Resource-limit warnings raised along the way.
    pub warnings: Vec<AsmErr>,
}

/// Parses one segment of MMXI source.
///
/// Returns the frozen [`Program`] together with any warnings, or the first
/// fatal error.
pub fn parse_program(src: &str, limits: &Limits) -> Result<ParseOutput, AsmErr> {
    Parser::new(limits).run(src)
}

struct Parser<'l> {
    limits: &'l Limits,
    program: Program,
    warnings: Vec<AsmErr>,
    // location counter; one past 0xFFFF is representable so overflow
    // is detected after the advance
    lc: u32,
}

struct Fields {
    label: Option<String>,
    opcode: String,
    operands: Vec<Operand>,
}

fn is_comment(text: &str) -> bool {
    text.starts_with(';')
}

impl<'l> Parser<'l> {
    fn new(limits: &'l Limits) -> Self {
        Parser { limits, program: Program::new(), warnings: Vec::new(), lc: 0 }
    }

    fn run(mut self, src: &str) -> Result<ParseOutput, AsmErr> {
        let mut lines = src.lines().enumerate();

        let (line, fields) = loop {
            let (i, text) = lines
                .next()
                .ok_or_else(|| AsmErr::new(AsmErrKind::UnexpectedEof))?;
            let line = i as u32 + 1;
            if is_comment(text) {
                continue;
            }
            break (line, split_fields(text, line)?);
        };
        self.handle_orig(line, fields)?;

        for (i, text) in lines {
            let line = i as u32 + 1;
            if is_comment(text) {
                continue;
            }
            if self.program.records().len() >= self.limits.max_records {
                self.warnings.push(AsmErr::at(AsmErrKind::RecordLimitReached, line));
                self.finalize(None, line)?;
                return Ok(ParseOutput { program: self.program, warnings: self.warnings });
            }
            let fields = split_fields(text, line)?;
            if self.handle_record(line, fields)? {
                return Ok(ParseOutput { program: self.program, warnings: self.warnings });
            }
        }

        Err(AsmErr::new(AsmErrKind::UnexpectedEof))
    }

    fn handle_orig(&mut self, line: u32, fields: Fields) -> Result<(), AsmErr> {
        let Fields { label, opcode, operands } = fields;
        if opcode != ".ORIG" {
            return Err(AsmErr::at(AsmErrKind::MissingOrig, line));
        }
        let name = label.ok_or_else(|| AsmErr::at(AsmErrKind::OrigRequiresLabel, line))?;

        // the .ORIG descriptor exists, so the lookup cannot fail
        let pseudo = ops::pseudo_op(".ORIG")
            .ok_or_else(|| AsmErr::at(AsmErrKind::UnknownOpcode(opcode.clone()), line))?;
        check_pseudo_args(pseudo, &opcode, &operands, line)?;

        match operands.first() {
            None => {
                self.program.set_relocatable(true);
                self.program.set_first_address(0);
            }
            Some(Operand::Immediate(imm)) => {
                let value = imm.value();
                if !(0..=0xFFFF).contains(&value) {
                    return Err(AsmErr::at(AsmErrKind::OrigOutOfRange(value), line));
                }
                self.program.set_relocatable(false);
                self.program.set_first_address(value as u16);
            }
            // the kind check above only lets immediates through
            Some(_) => return Err(AsmErr::at(AsmErrKind::OperandNotAllowed(opcode), line)),
        }

        self.lc = u32::from(self.program.first_address());
        // the segment name is not a symbol; it only names the object file header
        self.program.set_segment_name(&name);
        self.program
            .add_record(SourceRecord::new(line, Some(name), opcode, operands));
        Ok(())
    }

    /// Processes one body record. Returns `true` once `.END` is reached.
    fn handle_record(&mut self, line: u32, fields: Fields) -> Result<bool, AsmErr> {
        let Fields { label, opcode, operands } = fields;

        if let Some(op) = ops::machine_op(&opcode) {
            self.handle_machine(line, op, label, opcode, operands)?;
            return Ok(false);
        }

        let pseudo = ops::pseudo_op(&opcode)
            .ok_or_else(|| AsmErr::at(AsmErrKind::UnknownOpcode(opcode.clone()), line))?;
        check_pseudo_args(pseudo, &opcode, &operands, line)?;

        if opcode == ".ORIG" {
            return Err(AsmErr::at(AsmErrKind::ExtraOrig, line));
        } else if opcode == ".END" {
            let exec = match operands.first() {
                Some(Operand::Immediate(imm)) => {
                    let value = imm.value();
                    if !(0..=0xFFFF).contains(&value) {
                        return Err(AsmErr::at(AsmErrKind::ExecOutOfRange, line));
                    }
                    Some(value as u16)
                }
                Some(Operand::Symbol(name)) => {
                    let sym = self.program.symbol(name).ok_or_else(|| {
                        AsmErr::at(AsmErrKind::UndefinedSymbol(name.clone()), line)
                    })?;
                    Some(sym.value)
                }
                _ => None,
            };
            self.program
                .add_record(SourceRecord::new(line, label, opcode, operands));
            self.finalize(exec, line)?;
            return Ok(true);
        } else if opcode == ".EQU" {
            let name = label.ok_or_else(|| AsmErr::at(AsmErrKind::EquRequiresLabel, line))?;
            let (value, relocatable) = match &operands[0] {
                Operand::Immediate(imm) => {
                    let v = imm.value();
                    if !(-32768..=65535).contains(&v) {
                        return Err(AsmErr::at(AsmErrKind::ImmediateOutOfBounds, line));
                    }
                    (imm.word(), false)
                }
                Operand::Symbol(s) => {
                    let sym = self.program.symbol(s).ok_or_else(|| {
                        AsmErr::at(AsmErrKind::UndefinedSymbol(s.clone()), line)
                    })?;
                    (sym.value, sym.relocatable)
                }
                _ => return Err(AsmErr::at(AsmErrKind::OperandNotAllowed(opcode), line)),
            };
            self.define_symbol(&name, value, relocatable, line)?;
            self.program
                .add_record(SourceRecord::new(line, Some(name), opcode, operands));
        } else if opcode == ".FILL" {
            self.define_label(&label, line)?;
            let record = SourceRecord::new(line, label, opcode, operands)
                .with_location(self.lc as u16);
            self.program.add_record(record);
            self.advance(1, line)?;
        } else if opcode == ".STRZ" {
            self.define_label(&label, line)?;
            let words = match &operands[0] {
                // string body plus the terminating null word
                Operand::StrLit(s) => s.chars().count() as u32 + 1,
                _ => return Err(AsmErr::at(AsmErrKind::OperandNotAllowed(opcode), line)),
            };
            let record = SourceRecord::new(line, label, opcode, operands)
                .with_location(self.lc as u16);
            self.program.add_record(record);
            self.advance(words, line)?;
        } else if opcode == ".BLKW" {
            self.define_label(&label, line)?;
            let value = match &operands[0] {
                Operand::Immediate(imm) => imm.value(),
                Operand::Symbol(s) => {
                    let sym = self.program.symbol(s).ok_or_else(|| {
                        AsmErr::at(AsmErrKind::BlkwForwardReference(s.clone()), line)
                    })?;
                    if sym.relocatable {
                        return Err(AsmErr::at(AsmErrKind::BlkwNotAbsolute(s.clone()), line));
                    }
                    i32::from(sym.value)
                }
                _ => return Err(AsmErr::at(AsmErrKind::OperandNotAllowed(opcode), line)),
            };
            if value <= 0 {
                return Err(AsmErr::at(AsmErrKind::BlkwNotPositive, line));
            }
            let record = SourceRecord::new(line, label, opcode, operands)
                .with_location(self.lc as u16);
            self.program.add_record(record);
            self.advance(value as u32, line)?;
        } else if opcode == ".ENT" || opcode == ".EXT" {
            self.define_label(&label, line)?;
            for operand in &operands {
                if let Operand::Symbol(name) = operand {
                    if opcode == ".ENT" {
                        self.program.add_entry_symbol(name);
                    } else {
                        self.program.add_external_symbol(name);
                    }
                }
            }
            self.program
                .add_record(SourceRecord::new(line, label, opcode, operands));
        } else {
            return Err(AsmErr::at(AsmErrKind::UnknownOpcode(opcode), line));
        }
        Ok(false)
    }

    fn handle_machine(
        &mut self,
        line: u32,
        op: &'static ops::MachineOp,
        label: Option<String>,
        opcode: String,
        operands: Vec<Operand>,
    ) -> Result<(), AsmErr> {
        if operands.len() != op.arg_count() {
            return Err(AsmErr::at(AsmErrKind::WrongArgCount(opcode), line));
        }
        self.define_label(&label, line)?;

        for (i, operand) in operands.iter().enumerate() {
            if !op.slot(i).allows(operand.kind()) {
                return Err(AsmErr::at(AsmErrKind::OperandNotAllowed(opcode), line));
            }
            if let Operand::Literal(imm) = operand {
                if opcode != "LD" {
                    return Err(AsmErr::at(AsmErrKind::LiteralOutsideLd, line));
                }
                let value = imm.value();
                if !(-32768..=65535).contains(&value) {
                    return Err(AsmErr::at(AsmErrKind::LiteralOutOfRange(value), line));
                }
                let word = imm.word();
                let pool = self.program.literals_mut();
                if !pool.contains(word) {
                    if pool.len() >= self.limits.max_literals {
                        self.warnings
                            .push(AsmErr::at(AsmErrKind::LiteralPoolFull(value), line));
                    } else {
                        pool.insert(word);
                    }
                }
            }
        }

        let record =
            SourceRecord::new(line, label, opcode, operands).with_location(self.lc as u16);
        self.program.add_record(record);
        self.advance(1, line)
    }

    /// Defines the record's label (if any) at the current location counter.
    fn define_label(&mut self, label: &Option<String>, line: u32) -> Result<(), AsmErr> {
        if let Some(name) = label {
            let relocatable = self.program.relocatable();
            self.define_symbol(name, self.lc as u16, relocatable, line)?;
        }
        Ok(())
    }

    fn define_symbol(
        &mut self,
        name: &str,
        value: u16,
        relocatable: bool,
        line: u32,
    ) -> Result<(), AsmErr> {
        if self.program.has_symbol(name) {
            return Err(AsmErr::at(AsmErrKind::DuplicateSymbol(name.to_string()), line));
        }
        if self.program.num_symbols() >= self.limits.max_symbols {
            self.warnings
                .push(AsmErr::at(AsmErrKind::SymbolTableFull(name.to_string()), line));
            return Ok(());
        }
        self.program.define_symbol(name, value, relocatable);
        Ok(())
    }

    fn advance(&mut self, words: u32, line: u32) -> Result<(), AsmErr> {
        self.lc += words;
        if self.lc > 0x10000 {
            return Err(AsmErr::at(AsmErrKind::SegmentOverflow, line));
        }
        Ok(())
    }

    /// Freezes the segment: pool addresses, length, exec address, entry
    /// symbol validation.
    fn finalize(&mut self, exec: Option<u16>, line: u32) -> Result<(), AsmErr> {
        let pool_len = self.program.literals().len() as u32;
        let pool_start = self.lc;
        if pool_start + pool_len > 0x10000 {
            return Err(AsmErr::at(AsmErrKind::SegmentOverflow, line));
        }
        self.program.literals_mut().assign_addresses(pool_start as u16);

        let length = pool_start + pool_len - u32::from(self.program.first_address());
        self.program.set_length(length as u16);

        let exec = exec.unwrap_or(if self.program.relocatable() {
            pool_start as u16
        } else {
            self.program.first_address()
        });
        if exec < self.program.first_address() {
            return Err(AsmErr::at(AsmErrKind::ExecOutOfRange, line));
        }
        self.program.set_exec_address(exec);

        for name in self.program.entry_symbols() {
            if !self.program.has_symbol(name) {
                return Err(AsmErr::at(AsmErrKind::EntryUndefined(name.clone()), line));
            }
        }
        Ok(())
    }
}

/// Checks a pseudo-op's operand count and kinds against its descriptor.
fn check_pseudo_args(
    pseudo: &ops::PseudoOp,
    opcode: &str,
    operands: &[Operand],
    line: u32,
) -> Result<(), AsmErr> {
    if operands.len() > pseudo.max_args || (pseudo.requires_arg && operands.is_empty()) {
        return Err(AsmErr::at(AsmErrKind::WrongArgCount(opcode.to_string()), line));
    }
    for operand in operands {
        if !pseudo.kinds.contains(&operand.kind()) {
            return Err(AsmErr::at(
                AsmErrKind::OperandNotAllowed(opcode.to_string()),
                line,
            ));
        }
    }
    Ok(())
}

/// Splits one non-comment line into its fixed-column fields.
fn split_fields(text: &str, line: u32) -> Result<Fields, AsmErr> {
    let malformed = || AsmErr::at(AsmErrKind::MalformedRecord, line);

    if text.len() < 10 {
        return Err(malformed());
    }
    let label_field = text.get(0..6).ok_or_else(malformed)?;
    let gap = text.get(6..9).ok_or_else(malformed)?;
    if gap != "   " {
        return Err(malformed());
    }
    // the opcode runs from column 10 to the first whitespace or ';';
    // a mnemonic spilling past column 14 fails the table lookup
    let tail = text.get(9..).ok_or_else(malformed)?;
    let end = tail
        .find(|c: char| c.is_whitespace() || c == ';')
        .unwrap_or(tail.len());
    let opcode = &tail[..end];
    if opcode.is_empty() {
        return Err(malformed());
    }

    let label = parse_label(label_field, line)?;
    let operand_field = match text.len() > 17 {
        true => text.get(17..).ok_or_else(malformed)?,
        false => "",
    };
    let operands = split_operands(operand_field, line)?;

    Ok(Fields { label, opcode: opcode.to_string(), operands })
}

/// Parses the 6-column label field. Blank means no label.
fn parse_label(field: &str, line: u32) -> Result<Option<String>, AsmErr> {
    if field.trim().is_empty() {
        return Ok(None);
    }

    let name_len = field.bytes().position(|b| b == b' ').unwrap_or(field.len());
    let (name, rest) = field.split_at(name_len);
    let bytes = name.as_bytes();

    let valid = !bytes.is_empty()
        && bytes[0].is_ascii_alphabetic()
        && bytes[0] != b'R'
        && bytes[0] != b'x'
        && bytes[1..].iter().all(|b| b.is_ascii_alphanumeric())
        && rest.bytes().all(|b| b == b' ');
    if !valid {
        return Err(AsmErr::at(AsmErrKind::InvalidLabel, line));
    }
    Ok(Some(name.to_string()))
}

/// Splits the operand field into classified operands.
///
/// A field opening with `"` is one string operand, taken verbatim through
/// its closing quote. Otherwise the field is truncated at the first
/// whitespace or `;` (inline comment) and split on commas; an empty
/// truncated field means no operands.
fn split_operands(field: &str, line: u32) -> Result<Vec<Operand>, AsmErr> {
    if field.starts_with('"') {
        let close = field[1..]
            .find('"')
            .ok_or_else(|| AsmErr::at(AsmErrKind::UnterminatedString, line))?;
        let token = &field[..close + 2];
        let operand = lex::parse_operand(token)
            .map_err(|_| AsmErr::at(AsmErrKind::MalformedOperand(token.to_string()), line))?;
        return Ok(vec![operand]);
    }

    let end = field
        .find(|c: char| c.is_whitespace() || c == ';')
        .unwrap_or(field.len());
    let list = &field[..end];
    if list.is_empty() {
        return Ok(Vec::new());
    }

    list.split(',')
        .map(|token| {
            lex::parse_operand(token)
                .map_err(|_| AsmErr::at(AsmErrKind::MalformedOperand(token.to_string()), line))
        })
        .collect()
}
