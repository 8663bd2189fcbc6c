//! Classifying MMXI operand tokens.
//!
//! An operand token is a single comma-free unit from a record's operand
//! field. [`parse_operand`] turns one token into an [`Operand`], and
//! [`classify`] reports the [`ArgKind`] a token falls into. Classification
//! is by leading character and is total: a token that fits no kind is
//! [`ArgKind::Malformed`], never reinterpreted as a symbol.

use logos::{Lexer, Logos};

use crate::ast::{ArgKind, Base, Imm, Operand};

// Note, these regexes span over tokens that are technically invalid
// (e.g., R9 matches for Register even though it shouldn't).
// This is intended.
// Each regex collects what its leading character commits the token to,
// and the validator function decides whether the whole unit is legal.
#[derive(Debug, Logos, PartialEq, Eq)]
#[logos(error = LexErr)]
enum Token {
    /// A register (`R0`-`R7`).
    #[regex(r"R\w*", lex_register, priority = 10)]
    Register(u8),

    /// An immediate (`x` + 1-4 hex digits, or `#` + 1-5 decimal digits,
    /// optionally negative).
    #[regex(r"x\w*", lex_hex, priority = 10)]
    #[regex(r"#-?\w*", lex_dec)]
    Immediate(Imm),

    /// A literal: `=` followed by an immediate.
    #[regex(r"=[x#]-?\w*", lex_literal)]
    Literal(Imm),

    /// A symbol: a letter followed by up to 6 alphanumerics.
    #[regex(r"[A-Za-z]\w*", lex_symbol, priority = 3)]
    Symbol(String),

    /// A string literal.
    #[regex(r#""[^"]*""#, lex_string)]
    StrLit(String),
}

/// Any errors raised in attempting to classify an operand token.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LexErr {
    /// Token had the format R…, but what follows isn't a single digit 0-7.
    InvalidReg,
    /// Token had the format x…, but what follows isn't 1-4 hex digits.
    InvalidHex,
    /// Token had the format #…, but what follows isn't 1-5 decimal digits.
    InvalidDec,
    /// Token had the format =…, but what follows isn't an immediate.
    InvalidLiteral,
    /// Token started like a symbol but is too long or has illegal characters.
    InvalidSymbol,
    /// Token fits no operand kind at all.
    #[default]
    NotAnOperand,
}

impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::InvalidReg     => f.write_str("registers are R0 through R7"),
            LexErr::InvalidHex     => f.write_str("a hex immediate is 'x' followed by 1-4 hex digits"),
            LexErr::InvalidDec     => f.write_str("a decimal immediate is '#' followed by 1-5 digits"),
            LexErr::InvalidLiteral => f.write_str("a literal is '=' followed by an immediate"),
            LexErr::InvalidSymbol  => f.write_str("a symbol is a letter followed by up to 6 alphanumerics"),
            LexErr::NotAnOperand   => f.write_str("token is not a recognizable operand"),
        }
    }
}
impl std::error::Error for LexErr {}

fn lex_register(lx: &Lexer<'_, Token>) -> Result<u8, LexErr> {
    let digits = &lx.slice()[1..];
    match digits.as_bytes() {
        [d @ b'0'..=b'7'] => Ok(d - b'0'),
        _ => Err(LexErr::InvalidReg),
    }
}

fn lex_hex(lx: &Lexer<'_, Token>) -> Result<Imm, LexErr> {
    parse_immediate(lx.slice()).ok_or(LexErr::InvalidHex)
}

fn lex_dec(lx: &Lexer<'_, Token>) -> Result<Imm, LexErr> {
    parse_immediate(lx.slice()).ok_or(LexErr::InvalidDec)
}

fn lex_literal(lx: &Lexer<'_, Token>) -> Result<Imm, LexErr> {
    parse_immediate(&lx.slice()[1..]).ok_or(LexErr::InvalidLiteral)
}

fn lex_symbol(lx: &Lexer<'_, Token>) -> Result<String, LexErr> {
    let s = lx.slice();
    let ok = s.len() <= 7 && s.bytes().all(|b| b.is_ascii_alphanumeric());
    match ok {
        true => Ok(s.to_string()),
        false => Err(LexErr::InvalidSymbol),
    }
}

fn lex_string(lx: &Lexer<'_, Token>) -> String {
    let s = lx.slice();
    s[1..s.len() - 1].to_string()
}

/// Parses an immediate token (`x` + 1-4 hex digits, or `#` + optional `-` +
/// 1-5 decimal digits). Returns `None` for anything else.
pub fn parse_immediate(token: &str) -> Option<Imm> {
    if let Some(rest) = token.strip_prefix('x') {
        let ok = (1..=4).contains(&rest.len())
            && rest.bytes().all(|b| b.is_ascii_hexdigit());
        if !ok {
            return None;
        }
        let value = i32::from_str_radix(rest, 16).ok()?;
        Some(Imm::new(value, Base::Hex))
    } else if let Some(rest) = token.strip_prefix('#') {
        let digits = rest.strip_prefix('-').unwrap_or(rest);
        let ok = (1..=5).contains(&digits.len())
            && digits.bytes().all(|b| b.is_ascii_digit());
        if !ok {
            return None;
        }
        let value = rest.parse::<i32>().ok()?;
        Some(Imm::new(value, Base::Dec))
    } else {
        None
    }
}

/// Parses one operand token.
///
/// The token must be exactly one unit with nothing before or after it;
/// leading or trailing junk (including whitespace) is an error.
pub fn parse_operand(token: &str) -> Result<Operand, LexErr> {
    let mut lexer = Token::lexer(token);
    let unit = match lexer.next() {
        Some(Ok(unit)) => unit,
        Some(Err(e)) => return Err(e),
        None => return Err(LexErr::NotAnOperand),
    };
    if lexer.next().is_some() {
        return Err(LexErr::NotAnOperand);
    }

    Ok(match unit {
        Token::Register(r)  => Operand::Register(r),
        Token::Immediate(i) => Operand::Immediate(i),
        Token::Literal(i)   => Operand::Literal(i),
        Token::Symbol(s)    => Operand::Symbol(s),
        Token::StrLit(s)    => Operand::StrLit(s),
    })
}

/// Classifies one operand token. Total: unclassifiable tokens are
/// [`ArgKind::Malformed`].
pub fn classify(token: &str) -> ArgKind {
    match parse_operand(token) {
        Ok(op) => op.kind(),
        Err(_) => ArgKind::Malformed,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classify_registers() {
        for r in 0..8u8 {
            let token = format!("R{r}");
            assert_eq!(classify(&token), ArgKind::Register, "{token}");
            assert_eq!(parse_operand(&token), Ok(Operand::Register(r)));
        }
    }

    #[test]
    fn register_prefix_never_degrades_to_symbol() {
        // once a token starts with 'R' it is a register or nothing
        for token in ["R", "R8", "R9", "R01", "Rfoo", "R0X"] {
            assert_eq!(classify(token), ArgKind::Malformed, "{token}");
        }
        // lowercase r is an ordinary symbol letter
        assert_eq!(classify("r0"), ArgKind::Symbol);
    }

    #[test]
    fn classify_hex() {
        assert_eq!(
            parse_operand("x3000"),
            Ok(Operand::Immediate(Imm::new(0x3000, Base::Hex)))
        );
        assert_eq!(classify("xF"), ArgKind::Immediate);
        assert_eq!(classify("xFFFF"), ArgKind::Immediate);
        for token in ["x", "xQ", "x12345", "x-5"] {
            assert_eq!(classify(token), ArgKind::Malformed, "{token}");
        }
        // uppercase X does not start a hex immediate
        assert_eq!(classify("X3000"), ArgKind::Symbol);
    }

    #[test]
    fn classify_dec() {
        assert_eq!(
            parse_operand("#25"),
            Ok(Operand::Immediate(Imm::new(25, Base::Dec)))
        );
        assert_eq!(
            parse_operand("#-5"),
            Ok(Operand::Immediate(Imm::new(-5, Base::Dec)))
        );
        assert_eq!(classify("#99999"), ArgKind::Immediate);
        for token in ["#", "#-", "#abc", "#123456", "#2-5"] {
            assert_eq!(classify(token), ArgKind::Malformed, "{token}");
        }
    }

    #[test]
    fn classify_literals() {
        assert_eq!(
            parse_operand("=#25"),
            Ok(Operand::Literal(Imm::new(25, Base::Dec)))
        );
        assert_eq!(
            parse_operand("=x3000"),
            Ok(Operand::Literal(Imm::new(0x3000, Base::Hex)))
        );
        for token in ["=", "=25", "=R0", "=foo", "=x", "=#-"] {
            assert_eq!(classify(token), ArgKind::Malformed, "{token}");
        }
    }

    #[test]
    fn classify_symbols() {
        for token in ["A", "LOOP", "COUNT1", "zzzzzzz", "NEXT"] {
            assert_eq!(classify(token), ArgKind::Symbol, "{token}");
        }
        // too long, underscore, leading digit
        for token in ["TOOLONG1", "A_B", "1ABC", ""] {
            assert_eq!(classify(token), ArgKind::Malformed, "{token}");
        }
    }

    #[test]
    fn classify_strings() {
        assert_eq!(
            parse_operand(r#""Hello""#),
            Ok(Operand::StrLit("Hello".to_string()))
        );
        assert_eq!(classify(r#""""#), ArgKind::String);
        assert_eq!(classify(r#""spaces ok""#), ArgKind::String);
        assert_eq!(classify(r#""unterminated"#), ArgKind::Malformed);
    }

    #[test]
    fn trailing_junk_is_malformed() {
        for token in ["x3000Q ", " LOOP", "R0 R1", "#25x"] {
            assert_eq!(classify(token), ArgKind::Malformed, "{token:?}");
        }
    }

    #[test]
    fn parse_immediate_round_trip() {
        let imm = parse_immediate("x3000").unwrap();
        assert_eq!(imm.to_string(), "x3000");
        let imm = parse_immediate("#-42").unwrap();
        assert_eq!(imm.to_string(), "#-42");
        assert_eq!(parse_immediate("3000"), None);
    }
}
