//! The emulated CPU.
//!
//! Combinational blocks (ALU, decoder) and stateful resources (register
//! file, address-translated memory) wired together by a four-stage control
//! unit:
//! - 32 general registers, r0 hardwired to zero
//! - byte-addressable big-endian memory with a 4096-byte video buffer on top
//! - 14-instruction set with 5-bit opcodes

pub mod alu;
pub mod control;
pub mod decode;
pub mod memory;
pub mod opcode;
pub mod register_file;
pub mod translator;

pub use alu::{Alu, AluOp, AluOutput};
pub use control::{Cpu, CpuError, Stage, DEFAULT_CAPACITY};
pub use decode::{decode, DecodeError, Decoder};
pub use memory::{MemoryError, Ram};
pub use opcode::{ImmediateOp, MemoryOp, NoOperandOp, OneRegOp, Opcode, OperandClass, ThreeRegOp};
pub use register_file::{RegisterFile, RegisterFileError, REGISTER_COUNT};
pub use translator::{AddressTranslator, Target, VIDEO_BYTES};
