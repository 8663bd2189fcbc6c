//! Generating object code and listings from a parsed [`Program`].
//!
//! This is the second pass of the assembler. The program model is already
//! frozen, so this pass only resolves operands, validates them against
//! their slots, packs instruction words, and writes the two output streams:
//!
//! - the object file: a line-oriented text format of `H` (header), `N`
//!   (entry point), `X` (external), `T` (text/storage word, optionally
//!   carrying a relocation annotation), and `E` (end) records;
//! - the listing: one line per source record, with address, word value in
//!   hex and binary, and the reconstructed source fields for storage
//!   records.

use std::io::Write;

use crate::ast::{Base, Operand};
use crate::err::{AsmErr, AsmErrKind};
use crate::ops::{self, SlotFormat};
use crate::program::{Program, SourceRecord};

/// Width marker used in `X` annotations for `.FILL`, which patches the
/// whole word rather than an instruction field.
const FILL_WIDTH_MARKER: u32 = 0xF;

/// Assembles a frozen program, writing the object file to `obj` and the
/// listing to `listing`.
pub fn assemble<O: Write, L: Write>(
    program: &Program,
    obj: &mut O,
    listing: &mut L,
) -> Result<(), AsmErr> {
    writeln!(
        obj,
        "H{:<6}{:04X}{:04X}",
        program.segment_name(),
        program.first_address(),
        program.length()
    )?;

    for name in program.entry_symbols() {
        let sym = program
            .symbol(name)
            .ok_or_else(|| AsmErr::new(AsmErrKind::EntryUndefined(name.clone())))?;
        let flag = if sym.relocatable { 'R' } else { 'A' };
        writeln!(obj, "N{name:<6}{:04X}{flag}", sym.value)?;
    }
    for name in program.external_symbols() {
        writeln!(obj, "X{name}")?;
    }

    for record in program.records() {
        if ops::machine_op(record.opcode()).is_some() {
            emit_instruction(program, record, obj, listing)?;
            continue;
        }
        match record.opcode() {
            ".FILL" => emit_fill(program, record, obj, listing)?,
            ".STRZ" => emit_strz(record, obj, listing)?,
            _ => listing_line(listing, record, None)?,
        }
    }

    for (value, addr) in program.literals().iter() {
        let addr = addr.ok_or_else(|| AsmErr::new(AsmErrKind::SegmentOverflow))?;
        writeln!(obj, "T{addr:04X}{value:04X}")?;
        writeln!(listing, "({addr:04X}) {value:04X} {value:016b} ( lit)")?;
    }

    writeln!(obj, "E{:04X}", program.exec_address())?;
    Ok(())
}

/// Assembles into in-memory strings: `(object, listing)`.
pub fn assemble_to_strings(program: &Program) -> Result<(String, String), AsmErr> {
    let mut obj = Vec::new();
    let mut listing = Vec::new();
    assemble(program, &mut obj, &mut listing)?;
    let obj = String::from_utf8(obj).map_err(|e| AsmErr::new(AsmErrKind::Io(e.to_string())))?;
    let listing =
        String::from_utf8(listing).map_err(|e| AsmErr::new(AsmErrKind::Io(e.to_string())))?;
    Ok((obj, listing))
}

fn emit_instruction<O: Write, L: Write>(
    program: &Program,
    record: &SourceRecord,
    obj: &mut O,
    listing: &mut L,
) -> Result<(), AsmErr> {
    let opcode = record.opcode();
    let op = ops::machine_op(opcode)
        .ok_or_else(|| AsmErr::at(AsmErrKind::UnknownOpcode(opcode.to_string()), record.line()))?;
    let location = record
        .location()
        .ok_or_else(|| AsmErr::at(AsmErrKind::MalformedRecord, record.line()))?;
    let line = record.line();

    let mut word = i32::from(op.template);
    let mut reloc = String::new();
    let last = op.arg_count().wrapping_sub(1);

    for (i, operand) in record.operands().iter().enumerate() {
        let slot = op.slot(i);
        let external = is_external(program, operand);
        if external && i != last {
            let name = operand.to_string();
            return Err(AsmErr::at(AsmErrKind::ExternalNotLast(name), line));
        }

        let value = resolve(program, operand, line)?;
        if !external {
            check_slot_value(operand, value, slot, location, line)?;
        }

        if program.relocatable() && i == last {
            match operand {
                Operand::Literal(_) => reloc = "M1".to_string(),
                Operand::Symbol(name) if external => {
                    reloc = format!("X{:X}{name}", slot.width);
                }
                Operand::Symbol(name) => {
                    let relative = program.symbol(name).is_some_and(|s| s.relocatable);
                    if relative {
                        if !op.allows_relative {
                            return Err(AsmErr::at(
                                AsmErrKind::RelativeNotAllowed(name.clone()),
                                line,
                            ));
                        }
                        reloc = if slot.width == 9 { "M1" } else { "M0" }.to_string();
                    }
                }
                _ => {}
            }
        }

        word = or_bits(word, value, slot);

        // ADD/AND overload: bit 5 discriminates the register form from
        // the immediate form
        if i == 2
            && matches!(opcode, "ADD" | "AND")
            && !matches!(operand, Operand::Register(_))
        {
            word |= 1 << 5;
        }
    }

    let word = word as u16;
    writeln!(obj, "T{location:04X}{word:04X}{reloc}")?;
    listing_line(listing, record, Some((location, word)))
}

fn emit_fill<O: Write, L: Write>(
    program: &Program,
    record: &SourceRecord,
    obj: &mut O,
    listing: &mut L,
) -> Result<(), AsmErr> {
    let line = record.line();
    let location = record
        .location()
        .ok_or_else(|| AsmErr::at(AsmErrKind::MalformedRecord, line))?;
    let operand = record
        .operands()
        .first()
        .ok_or_else(|| AsmErr::at(AsmErrKind::WrongArgCount(".FILL".to_string()), line))?;

    let external = is_external(program, operand);
    let value = resolve(program, operand, line)?;
    if !external && !(-32768..=65535).contains(&value) {
        return Err(AsmErr::at(AsmErrKind::ImmediateOutOfBounds, line));
    }

    let mut reloc = String::new();
    if program.relocatable() {
        match operand {
            Operand::Symbol(name) if external => {
                reloc = format!("X{FILL_WIDTH_MARKER:X}{name}");
            }
            Operand::Symbol(name) => {
                if program.symbol(name).is_some_and(|s| s.relocatable) {
                    reloc = "M1".to_string();
                }
            }
            _ => {}
        }
    }

    let word = value as u16;
    writeln!(obj, "T{location:04X}{word:04X}{reloc}")?;
    listing_line(listing, record, Some((location, word)))
}

fn emit_strz<O: Write, L: Write>(
    record: &SourceRecord,
    obj: &mut O,
    listing: &mut L,
) -> Result<(), AsmErr> {
    let line = record.line();
    let location = record
        .location()
        .ok_or_else(|| AsmErr::at(AsmErrKind::MalformedRecord, line))?;
    let body = match record.operands().first() {
        Some(Operand::StrLit(s)) => s,
        _ => return Err(AsmErr::at(AsmErrKind::OperandNotAllowed(".STRZ".to_string()), line)),
    };

    // one word per code point, then the null terminator; the source
    // fields are shown only on the first listing line
    let words = body.chars().map(|c| c as u32 as u16).chain([0]);
    for (i, word) in words.enumerate() {
        let addr = location.wrapping_add(i as u16);
        writeln!(obj, "T{addr:04X}{word:04X}")?;
        match i {
            0 => listing_line(listing, record, Some((addr, word)))?,
            _ => writeln!(listing, "({addr:04X}) {word:04X} {word:016b} ({:4})", line)?,
        }
    }
    Ok(())
}

/// Whether an operand refers to an external symbol. A local definition
/// shadows an external declaration of the same name.
fn is_external(program: &Program, operand: &Operand) -> bool {
    match operand {
        Operand::Symbol(name) => program.is_external(name) && !program.has_symbol(name),
        _ => false,
    }
}

/// Resolves an operand to its numeric value. External symbols resolve to a
/// placeholder 0 for the linker to patch.
fn resolve(program: &Program, operand: &Operand, line: u32) -> Result<i32, AsmErr> {
    match operand {
        Operand::Register(r) => Ok(i32::from(*r)),
        Operand::Immediate(imm) => Ok(imm.value()),
        // a literal dropped by the pool limit falls back to its raw value;
        // the slot checks then reject it like any other bad address
        Operand::Literal(imm) => Ok(program
            .literals()
            .address_of(imm.word())
            .map(i32::from)
            .unwrap_or_else(|| imm.value())),
        Operand::Symbol(name) => match program.symbol(name) {
            Some(sym) => Ok(i32::from(sym.value)),
            None if program.is_external(name) => Ok(0),
            None => Err(AsmErr::at(AsmErrKind::UndefinedSymbol(name.clone()), line)),
        },
        Operand::StrLit(_) => Err(AsmErr::at(
            AsmErrKind::OperandNotAllowed("string".to_string()),
            line,
        )),
    }
}

/// Validates a resolved value against its slot: range, and for 9-bit
/// address slots the page of the next instruction.
fn check_slot_value(
    operand: &Operand,
    value: i32,
    slot: &SlotFormat,
    location: u16,
    line: u32,
) -> Result<(), AsmErr> {
    if out_of_bounds(value, slot.width, operand) {
        let kind = match operand {
            Operand::Immediate(_) => AsmErrKind::ImmediateOutOfBounds,
            _ => AsmErrKind::SymbolOutOfBounds,
        };
        return Err(AsmErr::at(kind, line));
    }
    if slot.width == 9 {
        let next = i32::from(location) + 1;
        if value >> 9 != next >> 9 {
            return Err(AsmErr::at(AsmErrKind::PageMismatch, line));
        }
    }
    Ok(())
}

/// Range check for a slot of the given width.
///
/// 9-bit address slots accept the full unsigned page-relative range (the
/// page check narrows them); decimal immediates shift the window down to
/// admit negative values.
fn out_of_bounds(value: i32, width: u32, operand: &Operand) -> bool {
    if width == 9 {
        return value < 0 || value > 0xFFFF;
    }
    let shift = width - 1;
    let mut min = 0i32;
    let mut max = (1 << shift) - 1;
    if matches!(operand, Operand::Immediate(imm) if imm.base() == Base::Dec) {
        let half = 1 << (shift - 1);
        min -= half;
        max -= half;
    }
    value < min || value > max
}

/// ORs a value into a slot of the instruction word.
fn or_bits(word: i32, value: i32, slot: &SlotFormat) -> i32 {
    let mask = !(!0i32 << slot.width);
    word | ((value & mask) << slot.position)
}

/// Writes one listing line. Storage records pass `(address, word)`;
/// non-storage records get blank address columns.
fn listing_line<L: Write>(
    listing: &mut L,
    record: &SourceRecord,
    storage: Option<(u16, u16)>,
) -> Result<(), AsmErr> {
    match storage {
        Some((addr, word)) => write!(
            listing,
            "({addr:04X}) {word:04X} {word:016b} ({:4})",
            record.line()
        )?,
        None => write!(listing, "{:28} ({:4})", "", record.line())?,
    }
    writeln!(
        listing,
        " {:<8} {:<5} {}",
        record.label().unwrap_or(""),
        record.opcode(),
        record.operands_display()
    )?;
    Ok(())
}
