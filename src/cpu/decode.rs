//! Instruction decoder.
//!
//! Combinational: feed it a 32-bit instruction word and it drives the
//! opcode plus whichever operand fields that opcode's class defines. The
//! other fields stay undefined, so a control-unit stage that reads the
//! wrong field fails instead of picking up garbage.
//!
//! Register fields are 5 bits wide at bit offsets 5 (A), 10 (B) and
//! 15 (destination). The immediate is the top 22 bits; an arithmetic shift
//! right by 10 both isolates it and sign-extends it.

use thiserror::Error;

use crate::cpu::opcode::{Opcode, OperandClass, OPCODE_MASK};
use crate::hw::{HwError, Signal};
use crate::word;

/// Bit offset of the A register field.
pub const A_OFFSET: u32 = 5;
/// Bit offset of the B register field.
pub const B_OFFSET: u32 = 10;
/// Bit offset of the destination register field.
pub const DEST_OFFSET: u32 = 15;
/// Bit offset of the immediate field.
pub const IMMEDIATE_OFFSET: u32 = 10;

const REGISTER_FIELD_MASK: u32 = 0x1F;

/// The decoder block.
#[derive(Debug, Clone)]
pub struct Decoder {
    word: Signal<u32>,
    opcode: Signal<Opcode>,
    a: Signal<u8>,
    b: Signal<u8>,
    dest: Signal<u8>,
    immediate: Signal<i32>,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            word: Signal::new("decoder word"),
            opcode: Signal::new("decoder opcode"),
            a: Signal::new("decoder A"),
            b: Signal::new("decoder B"),
            dest: Signal::new("decoder destination"),
            immediate: Signal::new("decoder immediate"),
        }
    }

    /// Decode a fresh instruction word, replacing all previous outputs.
    ///
    /// # Errors
    /// [`DecodeError::InvalidOpcode`] if the low 5 bits name no opcode.
    pub fn set_word(&mut self, instruction: u32) -> Result<(), DecodeError> {
        self.undefine();
        self.word.set(instruction);

        let bits = instruction & OPCODE_MASK;
        let opcode = Opcode::from_bits(bits).ok_or(DecodeError::InvalidOpcode {
            opcode: bits,
            word: instruction,
        })?;
        self.opcode.set(opcode);

        match opcode.class() {
            OperandClass::ThreeReg => {
                self.a.set(register_field(instruction, A_OFFSET));
                self.b.set(register_field(instruction, B_OFFSET));
                self.dest.set(register_field(instruction, DEST_OFFSET));
            }
            OperandClass::RegImmediate => {
                self.a.set(register_field(instruction, A_OFFSET));
                self.immediate.set(immediate_field(instruction));
            }
            OperandClass::OneReg => {
                self.a.set(register_field(instruction, A_OFFSET));
            }
            OperandClass::RegPair => {
                self.a.set(register_field(instruction, A_OFFSET));
                if opcode == Opcode::Load {
                    self.dest.set(register_field(instruction, DEST_OFFSET));
                } else {
                    self.b.set(register_field(instruction, B_OFFSET));
                }
            }
            OperandClass::NoOperand => {}
        }

        Ok(())
    }

    pub fn word(&self) -> Result<u32, HwError> {
        self.word.get()
    }

    pub fn opcode(&self) -> Result<Opcode, HwError> {
        self.opcode.get()
    }

    pub fn a(&self) -> Result<u8, HwError> {
        self.a.get()
    }

    pub fn b(&self) -> Result<u8, HwError> {
        self.b.get()
    }

    pub fn dest(&self) -> Result<u8, HwError> {
        self.dest.get()
    }

    pub fn immediate(&self) -> Result<i32, HwError> {
        self.immediate.get()
    }

    /// Clear every output for the next cycle.
    pub fn undefine(&mut self) {
        self.word.undefine();
        self.opcode.undefine();
        self.a.undefine();
        self.b.undefine();
        self.dest.undefine();
        self.immediate.undefine();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a word into a standalone decoder, for tools outside the CPU.
pub fn decode(instruction: u32) -> Result<Decoder, DecodeError> {
    let mut decoder = Decoder::new();
    decoder.set_word(instruction)?;
    Ok(decoder)
}

#[inline]
fn register_field(instruction: u32, offset: u32) -> u8 {
    ((instruction >> offset) & REGISTER_FIELD_MASK) as u8
}

#[inline]
fn immediate_field(instruction: u32) -> i32 {
    word::from_wire(instruction) >> IMMEDIATE_OFFSET
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode {opcode} in word {word:#010x}")]
    InvalidOpcode { opcode: u32, word: u32 },

    #[error(transparent)]
    Wiring(#[from] HwError),
}
