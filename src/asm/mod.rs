//! Assembler tool-chain.
//!
//! This module provides:
//! - Instruction encoding with operand validation
//! - A two-pass text assembler (source → memory image)
//! - A disassembler (memory image → source)
//! - The memory image file format

pub mod assembler;
pub mod demo;
pub mod disasm;
pub mod encode;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_word};
pub use encode::{EncodeError, Instruction, IMMEDIATE_MAX, IMMEDIATE_MIN};
pub use image::{load_image, parse_image, save_image, ImageError, MemoryImage};
