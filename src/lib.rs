//! # tickcpu
//!
//! A cycle-accurate emulator of a small 32-bit, big-endian register machine.
//!
//! Every hardware block is modelled separately: combinational blocks (ALU,
//! decoder, multiplexers) whose outputs must be driven afresh each cycle,
//! and clocked state (registers, register file, memory) that only changes
//! on the clock edge. The control unit steps through Fetch, Decode, Execute
//! and Write, one stage per tick, until the program halts.

pub mod asm;
pub mod config;
pub mod cpu;
pub mod hw;
pub mod word;

// Re-export commonly used types
pub use asm::{assemble, disassemble, AssemblerError, Instruction, MemoryImage};
pub use config::{EmulatorConfig, VideoSink};
pub use cpu::{Cpu, CpuError, Opcode, Stage};
pub use hw::{HwError, Register, Signal};
