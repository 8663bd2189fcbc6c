//! Operand value types for MMXI assembly.
//!
//! This module holds the types that represent a classified operand token:
//! - [`Operand`]: the operand itself, carrying its payload,
//! - [`Imm`]: an immediate value that remembers its source base,
//! - [`ArgKind`]: the classification of an operand token,
//! - [`ArgCategory`]: what an instruction slot accepts.
//!
//! Classification itself is done by the lexer (see [`crate::parse::lex`]);
//! this module only defines the values it produces.

use std::fmt;

/// The base an immediate was written in.
///
/// The base matters beyond display: decimal immediates are treated as signed
/// when bounds-checked against an argument slot, hex immediates as unsigned.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Base {
    /// `#`-prefixed decimal.
    Dec,
    /// `x`-prefixed hexadecimal.
    Hex,
}

/// An immediate value with the base it was written in.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Imm {
    value: i32,
    base: Base,
}

impl Imm {
    /// Creates a new immediate.
    pub fn new(value: i32, base: Base) -> Self {
        Imm { value, base }
    }

    /// The numeric value.
    pub fn value(&self) -> i32 {
        self.value
    }

    /// The base the immediate was written in.
    pub fn base(&self) -> Base {
        self.base
    }

    /// The value as a two's-complement machine word.
    ///
    /// Only meaningful once the value is known to fit in
    /// `[-32768, 65535]`.
    pub fn word(&self) -> u16 {
        self.value as u16
    }
}

impl fmt::Display for Imm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            Base::Hex => write!(f, "x{:X}", self.value),
            Base::Dec => write!(f, "#{}", self.value),
        }
    }
}

/// A classified operand.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Operand {
    /// A register (`R0`-`R7`).
    Register(u8),
    /// An immediate (`x3000`, `#25`, `#-5`).
    Immediate(Imm),
    /// A literal (`=x3000`, `=#-5`): an immediate stored in the literal pool
    /// and referenced by address.
    Literal(Imm),
    /// A symbol reference (`LOOP`, `COUNT1`).
    Symbol(String),
    /// A string literal (`"Hello"`), used by `.STRZ`.
    StrLit(String),
}

impl Operand {
    /// The kind this operand classifies as.
    pub fn kind(&self) -> ArgKind {
        match self {
            Operand::Register(_)  => ArgKind::Register,
            Operand::Immediate(_) => ArgKind::Immediate,
            Operand::Literal(_)   => ArgKind::Literal,
            Operand::Symbol(_)    => ArgKind::Symbol,
            Operand::StrLit(_)    => ArgKind::String,
        }
    }
}

impl std::str::FromStr for Operand {
    type Err = crate::parse::lex::LexErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse::lex::parse_operand(s)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r)  => write!(f, "R{r}"),
            Operand::Immediate(i) => i.fmt(f),
            Operand::Literal(i)   => write!(f, "={i}"),
            Operand::Symbol(s)    => f.write_str(s),
            Operand::StrLit(s)    => write!(f, "\"{s}\""),
        }
    }
}

/// The classification of an operand token.
///
/// Every token classifies as exactly one kind; tokens that fit no
/// other kind are [`ArgKind::Malformed`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArgKind {
    /// `R0`-`R7`.
    Register,
    /// `x` + 1-4 hex digits, or `#` + optionally negative 1-5 decimal digits.
    Immediate,
    /// `=` followed by an immediate.
    Literal,
    /// A letter other than `R`/`x` followed by up to 6 alphanumerics.
    Symbol,
    /// A double-quoted string.
    String,
    /// Anything else.
    Malformed,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgKind::Register  => "register",
            ArgKind::Immediate => "immediate",
            ArgKind::Literal   => "literal",
            ArgKind::Symbol    => "symbol",
            ArgKind::String    => "string",
            ArgKind::Malformed => "malformed",
        })
    }
}

/// The category of operand an instruction slot accepts.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArgCategory {
    /// A 9-bit page-local address.
    Address,
    /// A register number.
    Register,
    /// A plain immediate value.
    Immediate,
    /// A 6-bit index offset.
    Index,
    /// A string (only used by `.STRZ`).
    String,
    /// An 8-bit trap vector.
    TrapVect,
}

impl ArgCategory {
    /// Whether an operand of the given kind may fill a slot of this category.
    pub fn allows(self, kind: ArgKind) -> bool {
        use ArgKind as K;
        match self {
            ArgCategory::Address   => matches!(kind, K::Immediate | K::Literal | K::Symbol),
            ArgCategory::Register  => matches!(kind, K::Register),
            ArgCategory::Immediate => matches!(kind, K::Immediate | K::Symbol),
            ArgCategory::Index     => matches!(kind, K::Immediate | K::Symbol),
            ArgCategory::String    => matches!(kind, K::String),
            ArgCategory::TrapVect  => matches!(kind, K::Immediate | K::Symbol),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn category_grid() {
        use ArgCategory as C;
        use ArgKind as K;

        let kinds = [K::Register, K::Immediate, K::Literal, K::Symbol, K::String, K::Malformed];
        let table: &[(C, [bool; 6])] = &[
            //                reg    imm    lit    sym    str    bad
            (C::Address,   [false, true,  true,  true,  false, false]),
            (C::Register,  [true,  false, false, false, false, false]),
            (C::Immediate, [false, true,  false, true,  false, false]),
            (C::Index,     [false, true,  false, true,  false, false]),
            (C::String,    [false, false, false, false, true,  false]),
            (C::TrapVect,  [false, true,  false, true,  false, false]),
        ];

        for (cat, expected) in table {
            for (kind, exp) in kinds.iter().zip(expected) {
                assert_eq!(cat.allows(*kind), *exp, "{cat:?} x {kind:?}");
            }
        }
    }

    #[test]
    fn operand_display() {
        assert_eq!(Operand::Register(3).to_string(), "R3");
        assert_eq!(Operand::Immediate(Imm::new(0x3000, Base::Hex)).to_string(), "x3000");
        assert_eq!(Operand::Immediate(Imm::new(-5, Base::Dec)).to_string(), "#-5");
        assert_eq!(Operand::Literal(Imm::new(25, Base::Dec)).to_string(), "=#25");
        assert_eq!(Operand::Symbol("LOOP".to_string()).to_string(), "LOOP");
        assert_eq!(Operand::StrLit("Hi".to_string()).to_string(), "\"Hi\"");
    }

    #[test]
    fn imm_word() {
        assert_eq!(Imm::new(-5, Base::Dec).word(), 0xFFFB);
        assert_eq!(Imm::new(0xFFFF, Base::Hex).word(), 0xFFFF);
        assert_eq!(Imm::new(25, Base::Dec).word(), 0x0019);
    }
}
