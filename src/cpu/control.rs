//! The control unit.
//!
//! [`Cpu`] owns every hardware block and sequences them through a
//! four-stage state machine, one stage per clock tick:
//!
//! ```text
//! Fetch -> Decode -> Execute -> Write -> Fetch
//!                       \_______________/
//!                  (no write-back: straight to Fetch)
//! ```
//!
//! Each tick first clears all combinational blocks, then runs the current
//! stage, which only drives inputs and stages next values. The tick ends
//! with a single clock edge that commits the register file, memory and
//! every state register together.

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EmulatorConfig;
use crate::cpu::alu::{Alu, AluOp};
use crate::cpu::decode::{DecodeError, Decoder};
use crate::cpu::memory::MemoryError;
use crate::cpu::opcode::{Opcode, OperandClass};
use crate::cpu::register_file::{RegisterFile, RegisterFileError};
use crate::cpu::translator::AddressTranslator;
use crate::hw::{HwError, Mux, Register};
use crate::word::{self, WORD_BYTES};

/// Default address space: 6144 bytes of main memory plus the video buffer.
pub const DEFAULT_CAPACITY: u32 = 10240;

/// Control-unit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Fetch,
    Decode,
    Execute,
    Write,
}

// ============================================================================
// Mux select lines
// ============================================================================

/// Source of the next program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcSelect {
    /// PC + 4
    Sequential,
    /// Register operand of a jump or taken branch
    Target,
}

/// Source of the ALU's B operand during Execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluBSelect {
    Register,
    Immediate,
}

/// Source of the register-file write during Write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteBackSource {
    AluResult,
    MemoryRead,
}

/// Immediate instructions always write here.
const IMMEDIATE_DEST: u8 = 1;

/// The emulated machine.
pub struct Cpu {
    // combinational blocks
    alu: Alu,
    decoder: Decoder,
    pc_mux: Mux<PcSelect, u32>,
    alu_b_mux: Mux<AluBSelect, i32>,
    write_back_mux: Mux<WriteBackSource, i32>,

    // stateful resources
    registers: RegisterFile,
    memory: AddressTranslator,

    // control state
    stage: Register<Stage>,
    halted: Register<bool>,
    pc: Register<u32>,

    // per-instruction scratch, cleared on Fetch
    next_pc: Register<u32>,
    opcode: Register<Opcode>,
    dest: Register<u8>,
    immediate: Register<i32>,
    alu_result: Register<i32>,

    // flags of the most recent arithmetic instruction
    zero: Register<bool>,
    positive: Register<bool>,

    sink: Box<dyn Write>,
    ticks: u64,
    frames_flushed: u64,
    faulted: bool,
}

impl Cpu {
    /// Build a CPU over the default address space with `image` at address 0.
    ///
    /// Video flushes go to stdout.
    pub fn new(image: &[u32]) -> Result<Self, CpuError> {
        Self::with_capacity(image, DEFAULT_CAPACITY)
    }

    /// Build a CPU with a `capacity`-byte address space, the top 4096 bytes
    /// of which are the video buffer.
    pub fn with_capacity(image: &[u32], capacity: u32) -> Result<Self, CpuError> {
        let memory = AddressTranslator::new(capacity, image)?;
        log::info!(
            "cpu: {} bytes ({} main, video at {:#06x}), {} image words",
            capacity,
            memory.video_base(),
            memory.video_base(),
            image.len()
        );

        Ok(Self {
            alu: Alu::new(),
            decoder: Decoder::new(),
            pc_mux: Mux::new("pc mux"),
            alu_b_mux: Mux::new("alu B mux"),
            write_back_mux: Mux::new("write-back mux"),
            registers: RegisterFile::new(),
            memory,
            stage: Register::new("control unit state", Stage::Fetch),
            halted: Register::new("halted", false),
            pc: Register::new("program counter", 0),
            next_pc: Register::new("next pc", 0),
            opcode: Register::new("opcode", Opcode::Nop),
            dest: Register::new("destination register", 0),
            immediate: Register::new("immediate", 0),
            alu_result: Register::new("alu result", 0),
            zero: Register::new("zero flag", false),
            positive: Register::new("positive flag", false),
            sink: Box::new(io::stdout()),
            ticks: 0,
            frames_flushed: 0,
            faulted: false,
        })
    }

    /// Build a CPU from a configuration.
    pub fn from_config(image: &[u32], config: &EmulatorConfig) -> Result<Self, CpuError> {
        let mut cpu = Self::with_capacity(image, config.capacity)?;
        cpu.sink = config.video_sink.writer();
        Ok(cpu)
    }

    /// Send video flushes to `sink` instead.
    pub fn with_video_sink(mut self, sink: impl Write + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    // ========================================================================
    // Clock
    // ========================================================================

    /// Advance one clock cycle. Returns whether the CPU is halted.
    ///
    /// Once halted, further ticks do nothing and return `true`. Once a tick
    /// has failed, further ticks return [`CpuError::Faulted`].
    pub fn tick(&mut self) -> Result<bool, CpuError> {
        if self.faulted {
            return Err(CpuError::Faulted);
        }
        if self.halted.read() {
            return Ok(true);
        }

        self.alu.undefine();
        self.decoder.undefine();
        self.pc_mux.undefine();
        self.alu_b_mux.undefine();
        self.write_back_mux.undefine();

        let stage = self.stage.read();
        log::trace!("tick {}: {:?} pc={:#06x}", self.ticks, stage, self.pc.read());

        let result = match stage {
            Stage::Fetch => self.fetch(),
            Stage::Decode => self.decode(),
            Stage::Execute => self.execute(),
            Stage::Write => self.write_back(),
        }
        .and_then(|()| self.clock_edge());

        if let Err(err) = result {
            log::error!("cpu fault in {:?} at tick {}: {}", stage, self.ticks, err);
            self.faulted = true;
            return Err(err);
        }

        self.ticks += 1;
        Ok(self.halted.read())
    }

    /// Tick until halted. With `max_ticks`, give up after that many ticks.
    ///
    /// Returns the number of ticks executed.
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<u64, CpuError> {
        let start = self.ticks;
        while !self.is_halted() {
            if let Some(limit) = max_ticks {
                if self.ticks - start >= limit {
                    return Err(CpuError::TickLimit(limit));
                }
            }
            self.tick()?;
        }
        Ok(self.ticks - start)
    }

    fn clock_edge(&mut self) -> Result<(), CpuError> {
        let registers = self.registers.tick();
        let memory = self.memory.tick();

        self.stage.tick();
        self.halted.tick();
        self.pc.tick();
        self.next_pc.tick();
        self.opcode.tick();
        self.dest.tick();
        self.immediate.tick();
        self.alu_result.tick();
        self.zero.tick();
        self.positive.tick();

        registers?;
        memory?;
        Ok(())
    }

    // ========================================================================
    // Stages
    // ========================================================================

    fn fetch(&mut self) -> Result<(), CpuError> {
        self.memory.set_address(self.pc.read())?;
        self.memory.set_read_this_cycle(true)?;

        self.next_pc.drive(0);
        self.opcode.drive(Opcode::Nop);
        self.dest.drive(0);
        self.immediate.drive(0);
        self.alu_result.drive(0);

        self.stage.drive(Stage::Decode);
        Ok(())
    }

    fn decode(&mut self) -> Result<(), CpuError> {
        let instruction = self.memory.output()?;
        self.decoder.set_word(instruction)?;
        let opcode = self.decoder.opcode()?;
        log::trace!("decoded {:#010x} as {:?}", instruction, opcode);
        self.opcode.drive(opcode);

        match opcode.class() {
            OperandClass::ThreeReg => {
                self.registers
                    .read_dual(self.decoder.a()?, self.decoder.b()?)?;
                self.dest.drive(self.decoder.dest()?);
            }
            OperandClass::RegImmediate => {
                self.registers.read_single(self.decoder.a()?)?;
                self.immediate.drive(self.decoder.immediate()?);
                self.dest.drive(IMMEDIATE_DEST);
            }
            OperandClass::OneReg => {
                self.registers.read_single(self.decoder.a()?)?;
            }
            OperandClass::RegPair => {
                if opcode == Opcode::Load {
                    self.registers.read_single(self.decoder.a()?)?;
                    self.dest.drive(self.decoder.dest()?);
                } else {
                    self.registers
                        .read_dual(self.decoder.a()?, self.decoder.b()?)?;
                }
            }
            OperandClass::NoOperand => {}
        }

        // PC + 4 through the ALU; the flags of this add are not latched
        self.alu.set_control(AluOp::Add);
        self.alu.set_a_wire(self.pc.read());
        self.alu.set_b(WORD_BYTES as i32);
        self.next_pc.drive(self.alu.result_wire()?);

        self.stage.drive(Stage::Execute);
        Ok(())
    }

    fn execute(&mut self) -> Result<(), CpuError> {
        let opcode = self.opcode.read();
        self.pc_mux.set_input(PcSelect::Sequential, self.next_pc.read());

        if let Some(op) = opcode.alu_op() {
            self.alu.set_control(op);
            self.alu.set_a(self.registers.out1()?);

            self.alu_b_mux.set_input(AluBSelect::Immediate, self.immediate.read());
            if opcode.class() == OperandClass::ThreeReg {
                self.alu_b_mux.set_input(AluBSelect::Register, self.registers.out2()?);
                self.alu_b_mux.select(AluBSelect::Register);
            } else {
                self.alu_b_mux.select(AluBSelect::Immediate);
            }
            self.alu.set_b(self.alu_b_mux.output()?);

            let out = self.alu.output()?;
            self.alu_result.drive(out.result);
            self.zero.drive(out.zero);
            self.positive.drive(out.positive);

            self.pc_mux.select(PcSelect::Sequential);
            self.pc.drive(self.pc_mux.output()?);
            self.stage.drive(Stage::Write);
            return Ok(());
        }

        match opcode {
            Opcode::JumpToReg | Opcode::BranchIfZero | Opcode::BranchIfPositive => {
                let taken = match opcode {
                    Opcode::BranchIfZero => self.zero.read(),
                    Opcode::BranchIfPositive => self.positive.read(),
                    _ => true,
                };
                self.pc_mux
                    .set_input(PcSelect::Target, word::to_wire(self.registers.out1()?));
                self.pc_mux.select(if taken {
                    PcSelect::Target
                } else {
                    PcSelect::Sequential
                });
                let target = self.pc_mux.output()?;
                log::trace!("{:?} taken={} -> {:#06x}", opcode, taken, target);
                self.pc.drive(target);
                self.stage.drive(Stage::Fetch);
            }
            Opcode::Load => {
                self.memory
                    .set_address(word::to_wire(self.registers.out1()?))?;
                self.memory.set_read_this_cycle(true)?;
                self.advance_pc()?;
                self.stage.drive(Stage::Write);
            }
            Opcode::Store => {
                self.memory
                    .set_address(word::to_wire(self.registers.out1()?))?;
                self.memory
                    .set_data_in(word::to_wire(self.registers.out2()?))?;
                self.memory.set_read_this_cycle(false)?;
                self.advance_pc()?;
                self.stage.drive(Stage::Fetch);
            }
            Opcode::DisplayFlush => {
                self.flush_video()?;
                self.advance_pc()?;
                self.stage.drive(Stage::Fetch);
            }
            Opcode::Halt => {
                log::info!("halt at pc={:#06x} after {} ticks", self.pc.read(), self.ticks + 1);
                self.halted.drive(true);
                self.stage.drive(Stage::Fetch);
            }
            // alu_op() covers the arithmetic opcodes above
            _ => {
                self.advance_pc()?;
                self.stage.drive(Stage::Fetch);
            }
        }

        Ok(())
    }

    fn write_back(&mut self) -> Result<(), CpuError> {
        let opcode = self.opcode.read();
        if !opcode.writes_back() {
            return Err(CpuError::NoWriteBack(opcode));
        }

        self.write_back_mux
            .set_input(WriteBackSource::AluResult, self.alu_result.read());
        if opcode == Opcode::Load {
            self.write_back_mux.set_input(
                WriteBackSource::MemoryRead,
                word::from_wire(self.memory.output()?),
            );
            self.write_back_mux.select(WriteBackSource::MemoryRead);
        } else {
            self.write_back_mux.select(WriteBackSource::AluResult);
        }

        self.registers
            .write(self.dest.read(), self.write_back_mux.output()?)?;
        self.stage.drive(Stage::Fetch);
        Ok(())
    }

    fn advance_pc(&mut self) -> Result<(), CpuError> {
        self.pc_mux.select(PcSelect::Sequential);
        self.pc.drive(self.pc_mux.output()?);
        Ok(())
    }

    fn flush_video(&mut self) -> Result<(), CpuError> {
        for row in self.memory.render_video()? {
            writeln!(self.sink, "{}", row)?;
        }
        self.sink.flush()?;
        self.frames_flushed += 1;
        log::debug!("video flush #{}", self.frames_flushed);
        Ok(())
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Out-of-band memory read for tests and tooling.
    pub fn debug_read(&self, addr: u32) -> Result<u32, CpuError> {
        Ok(self.memory.debug_read(addr)?)
    }

    /// Committed value of general register `index`.
    pub fn register(&self, index: u8) -> Result<i32, CpuError> {
        Ok(self.registers.peek(index)?)
    }

    /// Current video buffer contents, one string per row.
    pub fn render_video(&self) -> Result<Vec<String>, CpuError> {
        Ok(self.memory.render_video()?)
    }

    pub fn stage(&self) -> Stage {
        self.stage.read()
    }

    pub fn pc(&self) -> u32 {
        self.pc.read()
    }

    /// Ticks that did work (halted no-op ticks are not counted).
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_halted(&self) -> bool {
        self.halted.read()
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn frames_flushed(&self) -> u64 {
        self.frames_flushed
    }

    pub fn capacity(&self) -> u32 {
        self.memory.capacity()
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("stage", &self.stage.read())
            .field("pc", &format_args!("{:#06x}", self.pc.read()))
            .field("opcode", &self.opcode.read())
            .field("zero", &self.zero.read())
            .field("positive", &self.positive.read())
            .field("halted", &self.halted.read())
            .field("faulted", &self.faulted)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

/// Errors that can stop the CPU.
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("memory error: {0}")]
    MemoryError(#[from] MemoryError),

    #[error("decode error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("register file error: {0}")]
    RegisterFileError(#[from] RegisterFileError),

    #[error("wiring error: {0}")]
    Wiring(#[from] HwError),

    #[error("write stage reached for {0:?}, which has no write-back")]
    NoWriteBack(Opcode),

    #[error("video sink: {0}")]
    VideoSink(#[from] io::Error),

    #[error("no halt within {0} ticks")]
    TickLimit(u64),

    #[error("CPU is faulted")]
    Faulted,
}
