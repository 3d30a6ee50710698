//! The instruction set.
//!
//! The opcode occupies the low 5 bits of every instruction word. Each
//! opcode belongs to exactly one operand class, which fixes where its
//! operand fields sit in the word. The per-class enums ([`ThreeRegOp`],
//! [`ImmediateOp`], ...) let the encoder accept only opcodes that are legal
//! for a given shape.

use serde::{Deserialize, Serialize};

use crate::cpu::alu::AluOp;

/// Mask for the opcode field.
pub const OPCODE_MASK: u32 = 0x1F;

/// Every recognised opcode, with its machine value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    AddImmediate = 1,
    SubImmediate = 2,
    Add = 3,
    Sub = 4,
    Nand = 5,
    Lshift = 6,
    JumpToReg = 7,
    BranchIfZero = 9,
    BranchIfPositive = 10,
    Load = 14,
    Store = 15,
    DisplayFlush = 16,
    Halt = 17,
}

/// How an instruction's operand fields are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandClass {
    /// `unused(12) dest(5) B(5) A(5) opcode(5)`
    ThreeReg,
    /// `immediate(22) A(5) opcode(5)`
    RegImmediate,
    /// `unused(22) A(5) opcode(5)`
    OneReg,
    /// `unused(12) other(5) A(5) opcode(5)`, `other` at bit 15 for load, bit 10 for store
    RegPair,
    /// `unused(27) opcode(5)`
    NoOperand,
}

impl Opcode {
    pub const ALL: [Opcode; 14] = [
        Opcode::Nop,
        Opcode::AddImmediate,
        Opcode::SubImmediate,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Nand,
        Opcode::Lshift,
        Opcode::JumpToReg,
        Opcode::BranchIfZero,
        Opcode::BranchIfPositive,
        Opcode::Load,
        Opcode::Store,
        Opcode::DisplayFlush,
        Opcode::Halt,
    ];

    /// Look up the opcode for a 5-bit field value.
    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.bits() == bits)
    }

    /// The machine value of this opcode.
    #[inline]
    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn class(self) -> OperandClass {
        match self {
            Opcode::Add | Opcode::Sub | Opcode::Nand | Opcode::Lshift => OperandClass::ThreeReg,
            Opcode::AddImmediate | Opcode::SubImmediate => OperandClass::RegImmediate,
            Opcode::JumpToReg | Opcode::BranchIfZero | Opcode::BranchIfPositive => {
                OperandClass::OneReg
            }
            Opcode::Load | Opcode::Store => OperandClass::RegPair,
            Opcode::Nop | Opcode::DisplayFlush | Opcode::Halt => OperandClass::NoOperand,
        }
    }

    /// The ALU operation an arithmetic opcode performs.
    pub fn alu_op(self) -> Option<AluOp> {
        match self {
            Opcode::Add | Opcode::AddImmediate => Some(AluOp::Add),
            Opcode::Sub | Opcode::SubImmediate => Some(AluOp::Sub),
            Opcode::Nand => Some(AluOp::Nand),
            Opcode::Lshift => Some(AluOp::Lshift),
            _ => None,
        }
    }

    /// Whether the instruction finishes with a register-file write.
    pub fn writes_back(self) -> bool {
        self.alu_op().is_some() || self == Opcode::Load
    }

    /// Assembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::AddImmediate => "addi",
            Opcode::SubImmediate => "subi",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Nand => "nand",
            Opcode::Lshift => "lshift",
            Opcode::JumpToReg => "jr",
            Opcode::BranchIfZero => "bz",
            Opcode::BranchIfPositive => "bp",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::DisplayFlush => "flush",
            Opcode::Halt => "halt",
        }
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(mnemonic))
    }
}

// ============================================================================
// Per-class opcode tags
// ============================================================================

/// Opcodes taking `A`, `B` and a destination register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreeRegOp {
    Add,
    Sub,
    Nand,
    Lshift,
}

/// Opcodes taking a source register and a 22-bit immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImmediateOp {
    AddImmediate,
    SubImmediate,
}

/// Opcodes taking a single register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OneRegOp {
    JumpToReg,
    BranchIfZero,
    BranchIfPositive,
}

/// Memory opcodes taking an address register and a data register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryOp {
    Load,
    Store,
}

/// Opcodes with no operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoOperandOp {
    Nop,
    DisplayFlush,
    Halt,
}

impl From<ThreeRegOp> for Opcode {
    fn from(op: ThreeRegOp) -> Self {
        match op {
            ThreeRegOp::Add => Opcode::Add,
            ThreeRegOp::Sub => Opcode::Sub,
            ThreeRegOp::Nand => Opcode::Nand,
            ThreeRegOp::Lshift => Opcode::Lshift,
        }
    }
}

impl From<ImmediateOp> for Opcode {
    fn from(op: ImmediateOp) -> Self {
        match op {
            ImmediateOp::AddImmediate => Opcode::AddImmediate,
            ImmediateOp::SubImmediate => Opcode::SubImmediate,
        }
    }
}

impl From<OneRegOp> for Opcode {
    fn from(op: OneRegOp) -> Self {
        match op {
            OneRegOp::JumpToReg => Opcode::JumpToReg,
            OneRegOp::BranchIfZero => Opcode::BranchIfZero,
            OneRegOp::BranchIfPositive => Opcode::BranchIfPositive,
        }
    }
}

impl From<MemoryOp> for Opcode {
    fn from(op: MemoryOp) -> Self {
        match op {
            MemoryOp::Load => Opcode::Load,
            MemoryOp::Store => Opcode::Store,
        }
    }
}

impl From<NoOperandOp> for Opcode {
    fn from(op: NoOperandOp) -> Self {
        match op {
            NoOperandOp::Nop => Opcode::Nop,
            NoOperandOp::DisplayFlush => Opcode::DisplayFlush,
            NoOperandOp::Halt => Opcode::Halt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bits_roundtrip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_bits(op.bits()), Some(op));
        }
    }

    #[test]
    fn test_unassigned_values() {
        for bits in [8, 11, 12, 13, 18, 31] {
            assert_eq!(Opcode::from_bits(bits), None);
        }
    }

    #[test]
    fn test_write_back_set() {
        let writers: Vec<_> = Opcode::ALL.iter().filter(|op| op.writes_back()).collect();
        assert_eq!(
            writers,
            [
                &Opcode::AddImmediate,
                &Opcode::SubImmediate,
                &Opcode::Add,
                &Opcode::Sub,
                &Opcode::Nand,
                &Opcode::Lshift,
                &Opcode::Load,
            ]
        );
    }

    #[test]
    fn test_class_tags_agree_with_class() {
        for op in [ThreeRegOp::Add, ThreeRegOp::Sub, ThreeRegOp::Nand, ThreeRegOp::Lshift] {
            assert_eq!(Opcode::from(op).class(), OperandClass::ThreeReg);
        }
        for op in [ImmediateOp::AddImmediate, ImmediateOp::SubImmediate] {
            assert_eq!(Opcode::from(op).class(), OperandClass::RegImmediate);
        }
        for op in [OneRegOp::JumpToReg, OneRegOp::BranchIfZero, OneRegOp::BranchIfPositive] {
            assert_eq!(Opcode::from(op).class(), OperandClass::OneReg);
        }
        for op in [MemoryOp::Load, MemoryOp::Store] {
            assert_eq!(Opcode::from(op).class(), OperandClass::RegPair);
        }
        for op in [NoOperandOp::Nop, NoOperandOp::DisplayFlush, NoOperandOp::Halt] {
            assert_eq!(Opcode::from(op).class(), OperandClass::NoOperand);
        }
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Opcode::from_mnemonic("ADDI"), Some(Opcode::AddImmediate));
        assert_eq!(Opcode::from_mnemonic("flush"), Some(Opcode::DisplayFlush));
        assert_eq!(Opcode::from_mnemonic("jmp"), None);
    }
}
