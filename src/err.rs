//! Error types raised while parsing and assembling MMXI source code.
//!
//! Every condition the assembler can report is a variant of [`AsmErrKind`].
//! Each kind carries a stable numeric code (accessible through
//! [`AsmErrKind::code`]) and a [`Severity`]: fatal conditions abort the run,
//! warnings are reported and assembly continues with the degraded state.
//!
//! The core library never terminates the process; fatal errors are returned
//! as [`AsmErr`] values and the driver decides what to do with them.

/// How serious an [`AsmErr`] is.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Severity {
    /// The run must stop; no partial object file is valid.
    Fatal,
    /// The run continues with the offending entry dropped.
    Warning,
}

/// Kinds of errors that can occur while parsing or assembling.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AsmErrKind {
    // Syntax errors (1xx).
    /// Line does not conform to the fixed-column record grammar.
    MalformedRecord,
    /// Label field fails the label rules.
    InvalidLabel,
    /// Opcode field is not a machine op or pseudo-op mnemonic.
    UnknownOpcode(String),
    /// Operand token does not classify as any operand kind.
    MalformedOperand(String),
    /// A quoted string operand is missing its closing quote.
    UnterminatedString,
    /// Input ended before the `.END` record.
    UnexpectedEof,
    /// The first non-comment record is not `.ORIG`.
    MissingOrig,
    /// A second `.ORIG` record was found.
    ExtraOrig,
    /// `.ORIG` has no label to name the segment.
    OrigRequiresLabel,

    // Semantic errors (2xx).
    /// Operand count does not match the operation's arity.
    WrongArgCount(String),
    /// Operand kind is not allowed in this slot.
    OperandNotAllowed(String),
    /// Symbol defined more than once.
    DuplicateSymbol(String),
    /// Symbol is neither locally defined nor declared external.
    UndefinedSymbol(String),
    /// `.BLKW` references a symbol that is not yet defined.
    BlkwForwardReference(String),
    /// `.BLKW` operand resolved to a relocatable value.
    BlkwNotAbsolute(String),
    /// `.BLKW` operand is not a positive word count.
    BlkwNotPositive,
    /// A literal operand appeared somewhere other than `LD`'s address slot.
    LiteralOutsideLd,
    /// Literal value does not fit in a 16-bit word.
    LiteralOutOfRange(i32),
    /// Immediate operand out of bounds for its slot width.
    ImmediateOutOfBounds,
    /// Symbol operand out of bounds for its slot width.
    SymbolOutOfBounds,
    /// Address operand is not on the same page as the executing instruction.
    PageMismatch,
    /// External symbol used outside the final operand slot.
    ExternalNotLast(String),
    /// Relocatable symbol used where a relative address is not permitted.
    RelativeNotAllowed(String),
    /// Location counter left system memory.
    SegmentOverflow,
    /// `.ORIG` operand outside of system memory.
    OrigOutOfRange(i32),
    /// Execution address outside the segment's legal range.
    ExecOutOfRange,
    /// `.EQU` has no label to define.
    EquRequiresLabel,
    /// An `.ENT` symbol was never defined locally.
    EntryUndefined(String),

    // Resource-limit warnings (3xx).
    /// Symbol table is full; the symbol was dropped.
    SymbolTableFull(String),
    /// Literal pool is full; the literal was dropped.
    LiteralPoolFull(i32),
    /// Record ceiling reached before `.END`.
    RecordLimitReached,

    // I/O failures (4xx).
    /// An output sink failed.
    Io(String),
}

impl AsmErrKind {
    /// The stable numeric code reported alongside the message.
    pub fn code(&self) -> u16 {
        match self {
            Self::MalformedRecord         => 100,
            Self::InvalidLabel            => 101,
            Self::UnknownOpcode(_)        => 102,
            Self::MalformedOperand(_)     => 103,
            Self::UnterminatedString      => 104,
            Self::UnexpectedEof           => 105,
            Self::MissingOrig             => 106,
            Self::ExtraOrig               => 107,
            Self::OrigRequiresLabel       => 108,
            Self::WrongArgCount(_)        => 200,
            Self::OperandNotAllowed(_)    => 201,
            Self::DuplicateSymbol(_)      => 202,
            Self::UndefinedSymbol(_)      => 203,
            Self::BlkwForwardReference(_) => 204,
            Self::BlkwNotAbsolute(_)      => 205,
            Self::BlkwNotPositive         => 206,
            Self::LiteralOutsideLd        => 207,
            Self::LiteralOutOfRange(_)    => 208,
            Self::ImmediateOutOfBounds    => 209,
            Self::SymbolOutOfBounds       => 210,
            Self::PageMismatch            => 211,
            Self::ExternalNotLast(_)      => 212,
            Self::RelativeNotAllowed(_)   => 213,
            Self::SegmentOverflow         => 214,
            Self::OrigOutOfRange(_)       => 215,
            Self::ExecOutOfRange          => 216,
            Self::EquRequiresLabel        => 217,
            Self::EntryUndefined(_)       => 218,
            Self::SymbolTableFull(_)      => 300,
            Self::LiteralPoolFull(_)      => 301,
            Self::RecordLimitReached      => 302,
            Self::Io(_)                   => 400,
        }
    }

    /// Whether this condition halts the run or merely degrades it.
    pub fn severity(&self) -> Severity {
        match self {
            Self::SymbolTableFull(_)
            | Self::LiteralPoolFull(_)
            | Self::RecordLimitReached => Severity::Warning,
            _ => Severity::Fatal,
        }
    }
}

impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedRecord         => f.write_str("invalid record"),
            Self::InvalidLabel            => f.write_str("invalid label"),
            Self::UnknownOpcode(op)       => write!(f, "unknown opcode {op:?}"),
            Self::MalformedOperand(arg)   => write!(f, "malformed operand {arg:?}"),
            Self::UnterminatedString      => f.write_str("unterminated string literal"),
            Self::UnexpectedEof           => f.write_str("unexpected end of input before .END"),
            Self::MissingOrig             => f.write_str("unexpected record before .ORIG"),
            Self::ExtraOrig               => f.write_str("extra .ORIG record"),
            Self::OrigRequiresLabel       => f.write_str(".ORIG requires a label"),
            Self::WrongArgCount(op)       => write!(f, "wrong number of operands for {op}"),
            Self::OperandNotAllowed(op)   => write!(f, "invalid operand type for {op}"),
            Self::DuplicateSymbol(s)      => write!(f, "duplicate symbol {s}"),
            Self::UndefinedSymbol(s)      => write!(f, "no such symbol {s:?}"),
            Self::BlkwForwardReference(s) => write!(f, "forward reference {s:?} in .BLKW"),
            Self::BlkwNotAbsolute(s)      => write!(f, ".BLKW operand {s:?} is not absolute"),
            Self::BlkwNotPositive         => f.write_str(".BLKW requires a positive word count"),
            Self::LiteralOutsideLd        => f.write_str("literals are only allowed for LD"),
            Self::LiteralOutOfRange(v)    => write!(f, "literal {v} does not fit in a word"),
            Self::ImmediateOutOfBounds    => f.write_str("immediate out of bounds for argument"),
            Self::SymbolOutOfBounds       => f.write_str("symbol out of bounds for argument"),
            Self::PageMismatch            => f.write_str("page number mismatch"),
            Self::ExternalNotLast(s)      => {
                write!(f, "external symbol {s} found in non-final argument slot")
            }
            Self::RelativeNotAllowed(s)   => {
                write!(f, "relative symbol {s} is not permitted in this argument slot")
            }
            Self::SegmentOverflow         => f.write_str("segment left system memory"),
            Self::OrigOutOfRange(v)       => write!(f, ".ORIG address {v} outside of system memory"),
            Self::ExecOutOfRange          => f.write_str("execution address outside of segment"),
            Self::EquRequiresLabel        => f.write_str(".EQU requires a label"),
            Self::EntryUndefined(s)       => write!(f, "entry symbol {s} was never defined"),
            Self::SymbolTableFull(s)      => write!(f, "symbol table full, dropping {s}"),
            Self::LiteralPoolFull(v)      => write!(f, "literal table full, dropping {v}"),
            Self::RecordLimitReached      => f.write_str("record limit reached before .END"),
            Self::Io(msg)                 => write!(f, "i/o error: {msg}"),
        }
    }
}

/// An error (or warning) with the source line it was raised on, if known.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsmErr {
    /// The condition that was detected.
    pub kind: AsmErrKind,
    /// Source line number (1-based), when the condition maps to a line.
    pub line: Option<u32>,
}

impl AsmErr {
    /// Creates a new error with no line information.
    pub fn new(kind: AsmErrKind) -> Self {
        AsmErr { kind, line: None }
    }

    /// Creates a new error attached to a source line.
    pub fn at(kind: AsmErrKind, line: u32) -> Self {
        AsmErr { kind, line: Some(line) }
    }

    /// The numeric code of the underlying kind.
    pub fn code(&self) -> u16 {
        self.kind.code()
    }

    /// The severity of the underlying kind.
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)?;
        if let Some(line) = self.line {
            write!(f, " (Line: {line})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AsmErr {}

impl From<std::io::Error> for AsmErr {
    fn from(e: std::io::Error) -> Self {
        AsmErr::new(AsmErrKind::Io(e.to_string()))
    }
}
