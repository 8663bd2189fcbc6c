//! Static descriptor tables for MMXI machine ops and pseudo-ops.
//!
//! Machine ops carry a base bit template and a list of argument slots
//! (bit position, width, accepted categories). Pseudo-ops carry operand
//! arity and the kinds each operand may classify as. The tables are
//! declarative `static` data, indexed once at first use.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::{ArgCategory as C, ArgKind as K};

/// One argument slot of a machine op.
#[derive(Debug)]
pub struct SlotFormat {
    /// Bit position of the slot's low bit in the instruction word.
    pub position: u32,
    /// Width of the slot in bits.
    pub width: u32,
    /// Operand categories this slot accepts.
    pub categories: &'static [C],
}

impl SlotFormat {
    /// Whether an operand of the given kind may fill this slot.
    pub fn allows(&self, kind: K) -> bool {
        self.categories.iter().any(|c| c.allows(kind))
    }
}

/// A machine op descriptor.
#[derive(Debug)]
pub struct MachineOp {
    /// The base bit pattern operand values are OR-ed into.
    pub template: u16,
    /// The argument slots, in operand order.
    pub slots: &'static [SlotFormat],
    /// Whether the final slot may hold a relative (relocatable) address.
    pub allows_relative: bool,
}

impl MachineOp {
    /// The number of operands the op takes.
    pub fn arg_count(&self) -> usize {
        self.slots.len()
    }

    /// The i-th argument slot.
    pub fn slot(&self, i: usize) -> &SlotFormat {
        &self.slots[i]
    }
}

/// A pseudo-op descriptor.
#[derive(Debug)]
pub struct PseudoOp {
    /// Whether the operand field may be empty.
    pub requires_arg: bool,
    /// Maximum number of operands.
    pub max_args: usize,
    /// Operand kinds accepted (for every operand).
    pub kinds: &'static [K],
    /// Whether the operand may resolve to a relative (relocatable) value.
    pub allows_relative: bool,
}

const REG: SlotFormat = SlotFormat { position: 9, width: 3, categories: &[C::Register] };
const REG2: SlotFormat = SlotFormat { position: 6, width: 3, categories: &[C::Register] };
const ADDR: SlotFormat = SlotFormat { position: 0, width: 9, categories: &[C::Address] };
const INDEX: SlotFormat = SlotFormat { position: 0, width: 6, categories: &[C::Index] };
const REG_OR_IMM: SlotFormat =
    SlotFormat { position: 0, width: 6, categories: &[C::Register, C::Immediate] };
const TRAPVECT: SlotFormat = SlotFormat { position: 0, width: 8, categories: &[C::TrapVect] };

static MACHINE_OPS: &[(&str, MachineOp)] = &[
    ("ADD",   MachineOp { template: 0x1000, slots: &[REG, REG2, REG_OR_IMM], allows_relative: false }),
    ("AND",   MachineOp { template: 0x5000, slots: &[REG, REG2, REG_OR_IMM], allows_relative: false }),
    ("BRN",   MachineOp { template: 0x0800, slots: &[ADDR], allows_relative: true }),
    ("BRZ",   MachineOp { template: 0x0400, slots: &[ADDR], allows_relative: true }),
    ("BRP",   MachineOp { template: 0x0200, slots: &[ADDR], allows_relative: true }),
    ("BRNZ",  MachineOp { template: 0x0C00, slots: &[ADDR], allows_relative: true }),
    ("BRNP",  MachineOp { template: 0x0A00, slots: &[ADDR], allows_relative: true }),
    ("BRZP",  MachineOp { template: 0x0600, slots: &[ADDR], allows_relative: true }),
    ("BRNZP", MachineOp { template: 0x0E00, slots: &[ADDR], allows_relative: true }),
    ("DBUG",  MachineOp { template: 0x8000, slots: &[], allows_relative: false }),
    ("JMP",   MachineOp { template: 0x4000, slots: &[ADDR], allows_relative: true }),
    ("JMPR",  MachineOp { template: 0xC000, slots: &[REG2, INDEX], allows_relative: false }),
    ("JSR",   MachineOp { template: 0x4800, slots: &[ADDR], allows_relative: true }),
    ("JSRR",  MachineOp { template: 0xC800, slots: &[REG2, INDEX], allows_relative: false }),
    ("LD",    MachineOp { template: 0x2000, slots: &[REG, ADDR], allows_relative: true }),
    ("LDI",   MachineOp { template: 0xA000, slots: &[REG, ADDR], allows_relative: true }),
    ("LDR",   MachineOp { template: 0x6000, slots: &[REG, REG2, INDEX], allows_relative: false }),
    ("LEA",   MachineOp { template: 0xE000, slots: &[REG, ADDR], allows_relative: true }),
    ("NOT",   MachineOp { template: 0x9000, slots: &[REG, REG2], allows_relative: false }),
    ("RET",   MachineOp { template: 0xD000, slots: &[], allows_relative: false }),
    ("ST",    MachineOp { template: 0x3000, slots: &[REG, ADDR], allows_relative: true }),
    ("STI",   MachineOp { template: 0xB000, slots: &[REG, ADDR], allows_relative: true }),
    ("STR",   MachineOp { template: 0x7000, slots: &[REG, REG2, INDEX], allows_relative: false }),
    ("TRAP",  MachineOp { template: 0xF000, slots: &[TRAPVECT], allows_relative: false }),
];

static PSEUDO_OPS: &[(&str, PseudoOp)] = &[
    (".ORIG", PseudoOp { requires_arg: false, max_args: 1, kinds: &[K::Immediate], allows_relative: false }),
    (".END",  PseudoOp { requires_arg: false, max_args: 1, kinds: &[K::Immediate, K::Symbol], allows_relative: true }),
    (".EQU",  PseudoOp { requires_arg: true,  max_args: 1, kinds: &[K::Immediate, K::Symbol], allows_relative: false }),
    (".FILL", PseudoOp { requires_arg: true,  max_args: 1, kinds: &[K::Immediate, K::Symbol], allows_relative: true }),
    (".STRZ", PseudoOp { requires_arg: true,  max_args: 1, kinds: &[K::String], allows_relative: false }),
    (".BLKW", PseudoOp { requires_arg: true,  max_args: 1, kinds: &[K::Immediate, K::Symbol], allows_relative: false }),
    (".ENT",  PseudoOp { requires_arg: true,  max_args: 3, kinds: &[K::Symbol], allows_relative: false }),
    (".EXT",  PseudoOp { requires_arg: true,  max_args: 3, kinds: &[K::Symbol], allows_relative: false }),
];

static MACHINE_INDEX: Lazy<HashMap<&'static str, &'static MachineOp>> =
    Lazy::new(|| MACHINE_OPS.iter().map(|(name, op)| (*name, op)).collect());

static PSEUDO_INDEX: Lazy<HashMap<&'static str, &'static PseudoOp>> =
    Lazy::new(|| PSEUDO_OPS.iter().map(|(name, op)| (*name, op)).collect());

/// Looks up a machine op by mnemonic. Case sensitive.
pub fn machine_op(name: &str) -> Option<&'static MachineOp> {
    MACHINE_INDEX.get(name).copied()
}

/// Looks up a pseudo-op by mnemonic (including the leading dot).
pub fn pseudo_op(name: &str) -> Option<&'static PseudoOp> {
    PSEUDO_INDEX.get(name).copied()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_shapes() {
        let add = machine_op("ADD").unwrap();
        assert_eq!(add.template, 0x1000);
        assert_eq!(add.arg_count(), 3);
        assert_eq!((add.slot(0).position, add.slot(0).width), (9, 3));
        assert_eq!((add.slot(2).position, add.slot(2).width), (0, 6));
        assert!(add.slot(2).allows(K::Register));
        assert!(add.slot(2).allows(K::Immediate));
        assert!(!add.slot(2).allows(K::Literal));

        let trap = machine_op("TRAP").unwrap();
        assert_eq!(trap.template, 0xF000);
        assert_eq!(trap.slot(0).width, 8);

        assert_eq!(machine_op("DBUG").unwrap().arg_count(), 0);
        assert_eq!(machine_op("JSRR").unwrap().template, 0xC800);
        assert!(machine_op("BR").is_none());
        assert!(machine_op("add").is_none());
    }

    #[test]
    fn relative_flags() {
        for op in ["BRN", "BRNZP", "JMP", "JSR", "LD", "LDI", "LEA", "ST", "STI"] {
            assert!(machine_op(op).unwrap().allows_relative, "{op}");
        }
        for op in ["ADD", "AND", "JMPR", "JSRR", "LDR", "STR", "NOT", "TRAP"] {
            assert!(!machine_op(op).unwrap().allows_relative, "{op}");
        }
    }

    #[test]
    fn pseudo_shapes() {
        assert!(!pseudo_op(".ORIG").unwrap().requires_arg);
        assert!(pseudo_op(".FILL").unwrap().allows_relative);
        assert!(pseudo_op(".END").unwrap().allows_relative);
        assert_eq!(pseudo_op(".ENT").unwrap().max_args, 3);
        assert_eq!(pseudo_op(".STRZ").unwrap().kinds, &[K::String]);
        assert!(pseudo_op(".WORD").is_none());
    }
}
