//! The parsed program model.
//!
//! The parser builds a [`Program`] in one pass over the source: segment
//! metadata, the symbol table, the literal pool, the entry/external symbol
//! lists, and one [`SourceRecord`] per non-comment line. After `.END` the
//! model is frozen; the code generator only reads it.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::ast::Operand;

/// A defined symbol.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Symbol {
    /// The symbol's 16-bit value.
    pub value: u16,
    /// Whether the value is an address within a relocatable segment.
    pub relocatable: bool,
}

/// One non-comment source line, parsed into its fields.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SourceRecord {
    line: u32,
    location: Option<u16>,
    label: Option<String>,
    opcode: String,
    operands: Vec<Operand>,
}

impl SourceRecord {
    /// Creates a record with no assigned location.
    pub fn new(line: u32, label: Option<String>, opcode: String, operands: Vec<Operand>) -> Self {
        SourceRecord { line, location: None, label, opcode, operands }
    }

    /// Assigns the record's location counter value.
    pub fn with_location(mut self, location: u16) -> Self {
        self.location = Some(location);
        self
    }

    /// Source line number (1-based).
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The location counter at this record, for records that occupy storage.
    pub fn location(&self) -> Option<u16> {
        self.location
    }

    /// The label field, if present.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The opcode mnemonic.
    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    /// The operands, in source order.
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// The operand field re-rendered as it is shown in the listing.
    pub fn operands_display(&self) -> String {
        let mut out = String::new();
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&operand.to_string());
        }
        out
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
struct LiteralEntry {
    value: u16,
    addr: Option<u16>,
}

/// The literal pool: deduplicated 16-bit values in first-use order.
///
/// Addresses are unassigned until [`LiteralPool::assign_addresses`] runs at
/// segment freeze, so pool layout never depends on lookup order.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct LiteralPool {
    entries: Vec<LiteralEntry>,
}

impl LiteralPool {
    /// Whether a value is already pooled.
    pub fn contains(&self, value: u16) -> bool {
        self.entries.iter().any(|e| e.value == value)
    }

    /// Adds a value if not already present. Returns whether it was added.
    pub fn insert(&mut self, value: u16) -> bool {
        if self.contains(value) {
            return false;
        }
        self.entries.push(LiteralEntry { value, addr: None });
        true
    }

    /// The pool address of a value, once addresses are assigned.
    pub fn address_of(&self, value: u16) -> Option<u16> {
        self.entries.iter().find(|e| e.value == value).and_then(|e| e.addr)
    }

    /// Assigns consecutive addresses starting at `start`, in first-use order.
    pub fn assign_addresses(&mut self, start: u16) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.addr = Some(start.wrapping_add(i as u16));
        }
    }

    /// Number of pooled values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(value, addr)` pairs in first-use order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, Option<u16>)> + '_ {
        self.entries.iter().map(|e| (e.value, e.addr))
    }
}

/// A fully parsed segment, ready for code generation.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Program {
    segment_name: String,
    relocatable: bool,
    first_address: u16,
    length: u16,
    exec_address: u16,
    symbols: BTreeMap<String, Symbol>,
    literals: LiteralPool,
    entry_symbols: Vec<String>,
    external_symbols: Vec<String>,
    records: Vec<SourceRecord>,
}

impl Program {
    /// Creates an empty program.
    pub fn new() -> Self {
        Program::default()
    }

    /// Sets the segment name (the `.ORIG` label).
    pub fn set_segment_name(&mut self, name: &str) {
        self.segment_name = name.to_string();
    }

    /// The segment name.
    pub fn segment_name(&self) -> &str {
        &self.segment_name
    }

    /// Marks the segment relocatable.
    pub fn set_relocatable(&mut self, relocatable: bool) {
        self.relocatable = relocatable;
    }

    /// Whether the segment is relocatable.
    pub fn relocatable(&self) -> bool {
        self.relocatable
    }

    /// Sets the segment's first address.
    pub fn set_first_address(&mut self, addr: u16) {
        self.first_address = addr;
    }

    /// The segment's first address (0 for relocatable segments).
    pub fn first_address(&self) -> u16 {
        self.first_address
    }

    /// Sets the segment length in words, literal pool included.
    pub fn set_length(&mut self, length: u16) {
        self.length = length;
    }

    /// The segment length in words.
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Sets the execution start address.
    pub fn set_exec_address(&mut self, addr: u16) {
        self.exec_address = addr;
    }

    /// The execution start address.
    pub fn exec_address(&self) -> u16 {
        self.exec_address
    }

    /// Defines a symbol. The caller is responsible for duplicate checking.
    pub fn define_symbol(&mut self, name: &str, value: u16, relocatable: bool) {
        self.symbols.insert(name.to_string(), Symbol { value, relocatable });
    }

    /// Looks up a locally defined symbol.
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Whether a symbol is locally defined.
    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Number of locally defined symbols.
    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// The literal pool.
    pub fn literals(&self) -> &LiteralPool {
        &self.literals
    }

    /// Mutable access to the literal pool (parser only).
    pub fn literals_mut(&mut self) -> &mut LiteralPool {
        &mut self.literals
    }

    /// Declares an entry point. Duplicate declarations are ignored.
    pub fn add_entry_symbol(&mut self, name: &str) {
        if !self.entry_symbols.iter().any(|s| s == name) {
            self.entry_symbols.push(name.to_string());
        }
    }

    /// Entry symbols in declaration order.
    pub fn entry_symbols(&self) -> &[String] {
        &self.entry_symbols
    }

    /// Declares an external symbol. Duplicate declarations are ignored.
    pub fn add_external_symbol(&mut self, name: &str) {
        if !self.external_symbols.iter().any(|s| s == name) {
            self.external_symbols.push(name.to_string());
        }
    }

    /// External symbols in declaration order.
    pub fn external_symbols(&self) -> &[String] {
        &self.external_symbols
    }

    /// Whether a symbol was declared external.
    pub fn is_external(&self, name: &str) -> bool {
        self.external_symbols.iter().any(|s| s == name)
    }

    /// Appends a record.
    pub fn add_record(&mut self, record: SourceRecord) {
        self.records.push(record);
    }

    /// All records in source order.
    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    /// Writes a human-readable dump of the whole model.
    pub fn write_state_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "segment name  = '{}'", self.segment_name)?;
        writeln!(w, "relocatable   = {}", self.relocatable)?;
        writeln!(w, "first address = x{:04X}", self.first_address)?;
        writeln!(w, "length        = x{:04X}", self.length)?;
        writeln!(w, "exec address  = x{:04X}", self.exec_address)?;

        writeln!(w, "\n# ENTRY POINTS #")?;
        for name in &self.entry_symbols {
            writeln!(w, "{name}")?;
        }

        writeln!(w, "\n# EXTERNAL SYMBOLS #")?;
        for name in &self.external_symbols {
            writeln!(w, "{name}")?;
        }

        writeln!(w, "\n# SYMBOL TABLE #")?;
        for (name, sym) in &self.symbols {
            let flag = if sym.relocatable { 'R' } else { 'A' };
            writeln!(w, "{name:<8} x{:04X} {flag}", sym.value)?;
        }

        writeln!(w, "\n# LITERAL TABLE #")?;
        for (value, addr) in self.literals.iter() {
            match addr {
                Some(a) => writeln!(w, "x{value:04X} @ x{a:04X}")?,
                None => writeln!(w, "x{value:04X} @ ????")?,
            }
        }

        writeln!(w, "\n# RECORDS #")?;
        for record in &self.records {
            let loc = match record.location() {
                Some(l) => format!("x{l:04X}"),
                None => "     ".to_string(),
            };
            writeln!(
                w,
                "({:4}) {loc} {:<8} {:<5} {}",
                record.line(),
                record.label().unwrap_or(""),
                record.opcode(),
                record.operands_display(),
            )?;
        }
        Ok(())
    }
}
