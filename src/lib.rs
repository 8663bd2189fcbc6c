//! An assembler for the MMXI educational machine.
//!
//! MMXI is a 16-bit, word-addressed machine in the LC-3 family. This crate
//! turns MMXI assembly source (a strict fixed-column format) into a
//! line-oriented text object file suitable for a linking loader, plus a
//! human-readable listing.
//!
//! Assembly is two passes over one parse:
//! 1. [`parse::parse_program`] reads the source once, building a frozen
//!    [`program::Program`] (records, symbol table, literal pool, segment
//!    metadata).
//! 2. [`asm::assemble`] resolves operands, packs instruction words, and
//!    writes the object file and listing.
//!
//! # Usage
//!
//! ```
//! use mmxi_asm::parse::{parse_program, Limits};
//! use mmxi_asm::asm::assemble_to_strings;
//!
//! let src = concat!(
//!     "DEMO     .ORIG   x3000\n",
//!     "NEXT     BRP     NEXT\n",
//!     "         .END\n",
//! );
//!
//! let out = parse_program(src, &Limits::default()).unwrap();
//! assert!(out.warnings.is_empty());
//!
//! let (obj, _listing) = assemble_to_strings(&out.program).unwrap();
//! assert_eq!(obj, "HDEMO  30000001\nT30000200\nE3000\n");
//! ```
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod asm;
pub mod ops;
pub mod program;
pub mod err;
