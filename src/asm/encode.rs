//! Instruction encoding.
//!
//! One builder per operand class. Each builder only accepts opcodes of
//! its own class, and validates register indices and immediates before
//! producing a word, so nothing malformed reaches the CPU.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpu::decode::{A_OFFSET, B_OFFSET, DEST_OFFSET, IMMEDIATE_OFFSET};
use crate::cpu::opcode::{ImmediateOp, MemoryOp, NoOperandOp, OneRegOp, Opcode, ThreeRegOp};
use crate::cpu::register_file::REGISTER_COUNT;
use crate::word;

/// Smallest encodable immediate.
pub const IMMEDIATE_MIN: i32 = -(1 << 21);
/// Largest encodable immediate.
pub const IMMEDIATE_MAX: i32 = (1 << 21) - 1;

/// An encoded 32-bit machine word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction(u32);

impl Instruction {
    /// `op A, B -> dest`
    pub fn three_reg(op: ThreeRegOp, a: u8, b: u8, dest: u8) -> Result<Self, EncodeError> {
        Ok(Self(
            Opcode::from(op).bits()
                | register(a, A_OFFSET)?
                | register(b, B_OFFSET)?
                | register(dest, DEST_OFFSET)?,
        ))
    }

    /// `op A, immediate` (result goes to r1)
    pub fn immediate(op: ImmediateOp, a: u8, immediate: i32) -> Result<Self, EncodeError> {
        if !(IMMEDIATE_MIN..=IMMEDIATE_MAX).contains(&immediate) {
            return Err(EncodeError::ImmediateOutOfRange(immediate));
        }
        Ok(Self(
            Opcode::from(op).bits()
                | register(a, A_OFFSET)?
                | (word::to_wire(immediate) << IMMEDIATE_OFFSET),
        ))
    }

    /// `op A`
    pub fn one_reg(op: OneRegOp, a: u8) -> Result<Self, EncodeError> {
        Ok(Self(Opcode::from(op).bits() | register(a, A_OFFSET)?))
    }

    /// `load A, dest` or `store A, data`. A holds the address in both.
    pub fn memory(op: MemoryOp, a: u8, other: u8) -> Result<Self, EncodeError> {
        let other_offset = match op {
            MemoryOp::Load => DEST_OFFSET,
            MemoryOp::Store => B_OFFSET,
        };
        Ok(Self(
            Opcode::from(op).bits() | register(a, A_OFFSET)? | register(other, other_offset)?,
        ))
    }

    pub fn no_operand(op: NoOperandOp) -> Self {
        Self(Opcode::from(op).bits())
    }

    /// A raw data word, not necessarily a valid instruction.
    pub const fn data(word: u32) -> Self {
        Self(word)
    }

    #[inline]
    pub const fn word(self) -> u32 {
        self.0
    }
}

impl From<Instruction> for u32 {
    fn from(instruction: Instruction) -> Self {
        instruction.0
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instruction({:#010x})", self.0)
    }
}

fn register(index: u8, offset: u32) -> Result<u32, EncodeError> {
    if usize::from(index) >= REGISTER_COUNT {
        return Err(EncodeError::InvalidRegister(index));
    }
    Ok(u32::from(index) << offset)
}

/// Operands rejected by the encoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("register r{0} does not exist (r0-r31)")]
    InvalidRegister(u8),

    #[error("immediate {0} outside [-2097152, 2097151]")]
    ImmediateOutOfRange(i32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::decode;

    #[test]
    fn test_three_reg_layout() {
        let word = Instruction::three_reg(ThreeRegOp::Add, 1, 2, 3).unwrap().word();
        assert_eq!(word, (3 << 15) | (2 << 10) | (1 << 5) | 3);
    }

    #[test]
    fn test_negative_immediate() {
        let word = Instruction::immediate(ImmediateOp::SubImmediate, 0, -1).unwrap().word();
        assert_eq!(word, 0xFFFF_FC02);
        assert_eq!(decode(word).unwrap().immediate().unwrap(), -1);
    }

    #[test]
    fn test_immediate_bounds() {
        assert!(Instruction::immediate(ImmediateOp::AddImmediate, 0, IMMEDIATE_MIN).is_ok());
        assert!(Instruction::immediate(ImmediateOp::AddImmediate, 0, IMMEDIATE_MAX).is_ok());
        assert_eq!(
            Instruction::immediate(ImmediateOp::AddImmediate, 0, IMMEDIATE_MAX + 1),
            Err(EncodeError::ImmediateOutOfRange(2_097_152))
        );
        assert_eq!(
            Instruction::immediate(ImmediateOp::AddImmediate, 0, IMMEDIATE_MIN - 1),
            Err(EncodeError::ImmediateOutOfRange(-2_097_153))
        );
    }

    #[test]
    fn test_register_out_of_range() {
        assert_eq!(
            Instruction::three_reg(ThreeRegOp::Sub, 0, 32, 1),
            Err(EncodeError::InvalidRegister(32))
        );
        assert_eq!(
            Instruction::one_reg(OneRegOp::JumpToReg, 255),
            Err(EncodeError::InvalidRegister(255))
        );
    }

    #[test]
    fn test_memory_operand_positions() {
        let load = Instruction::memory(MemoryOp::Load, 1, 10).unwrap().word();
        assert_eq!(load, (10 << 15) | (1 << 5) | 14);
        let store = Instruction::memory(MemoryOp::Store, 1, 10).unwrap().word();
        assert_eq!(store, (10 << 10) | (1 << 5) | 15);
    }

    #[test]
    fn test_no_operand() {
        assert_eq!(Instruction::no_operand(NoOperandOp::Halt).word(), 17);
        assert_eq!(Instruction::no_operand(NoOperandOp::Nop).word(), 0);
    }
}
