//! General-purpose register file.
//!
//! 32 registers of one machine word each, with two read ports and one
//! write port. Register 0 always reads 0; writes aimed at it are accepted
//! and dropped. Each cycle the file either reads (both ports) or writes,
//! never both.
//!
//! The port inputs are combinational and forgotten at every clock edge.
//! Read outputs become valid on the edge that performs the read and stay
//! valid for the following cycle only.

use thiserror::Error;

use crate::hw::{HwError, Register, Signal};

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 32;

/// The register file.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    registers: [Register<i32>; REGISTER_COUNT],

    read_select1: Signal<u8>,
    read_select2: Signal<u8>,
    out1: Signal<i32>,
    out2: Signal<i32>,

    read_this_cycle: Signal<bool>,

    write_select: Signal<u8>,
    write_data: Signal<i32>,
}

impl RegisterFile {
    /// Create a register file with every register zeroed.
    pub fn new() -> Self {
        Self {
            registers: std::array::from_fn(|_| Register::new("general register", 0)),
            read_select1: Signal::new("register file read select 1"),
            read_select2: Signal::new("register file read select 2"),
            out1: Signal::new("register file out 1"),
            out2: Signal::new("register file out 2"),
            read_this_cycle: Signal::new("register file read this cycle"),
            write_select: Signal::new("register file write select"),
            write_data: Signal::new("register file write data"),
        }
    }

    pub fn set_read_select1(&mut self, index: u8) -> Result<(), RegisterFileError> {
        validate_index(index)?;
        self.read_select1.set(index);
        Ok(())
    }

    pub fn set_read_select2(&mut self, index: u8) -> Result<(), RegisterFileError> {
        validate_index(index)?;
        self.read_select2.set(index);
        Ok(())
    }

    /// `true` to read this cycle, `false` to write.
    pub fn set_read_this_cycle(&mut self, reading: bool) {
        self.read_this_cycle.set(reading);
    }

    pub fn set_write_select(&mut self, index: u8) -> Result<(), RegisterFileError> {
        validate_index(index)?;
        self.write_select.set(index);
        Ok(())
    }

    pub fn set_write_data(&mut self, value: i32) {
        self.write_data.set(value);
    }

    /// Request a read on both ports this cycle.
    pub fn read_dual(&mut self, index1: u8, index2: u8) -> Result<(), RegisterFileError> {
        self.set_read_select1(index1)?;
        self.set_read_select2(index2)?;
        self.set_read_this_cycle(true);
        Ok(())
    }

    /// Request a read on port 1 only.
    pub fn read_single(&mut self, index: u8) -> Result<(), RegisterFileError> {
        self.set_read_select1(index)?;
        self.set_read_this_cycle(true);
        Ok(())
    }

    /// Request a write this cycle.
    pub fn write(&mut self, index: u8, value: i32) -> Result<(), RegisterFileError> {
        self.set_write_select(index)?;
        self.set_write_data(value);
        self.set_read_this_cycle(false);
        Ok(())
    }

    /// Port 1 output from the last read cycle.
    pub fn out1(&self) -> Result<i32, HwError> {
        self.out1.get()
    }

    /// Port 2 output from the last read cycle.
    pub fn out2(&self) -> Result<i32, HwError> {
        self.out2.get()
    }

    /// Out-of-band read of a register's committed value.
    pub fn peek(&self, index: u8) -> Result<i32, RegisterFileError> {
        validate_index(index)?;
        Ok(self.registers[usize::from(index)].read())
    }

    /// Clock edge.
    pub fn tick(&mut self) -> Result<(), RegisterFileError> {
        let result = self.evaluate_ports();

        self.read_select1.undefine();
        self.read_select2.undefine();
        self.read_this_cycle.undefine();
        self.write_select.undefine();
        self.write_data.undefine();

        for register in &mut self.registers {
            register.tick();
        }

        result
    }

    fn evaluate_ports(&mut self) -> Result<(), RegisterFileError> {
        self.out1.undefine();
        self.out2.undefine();

        let Some(reading) = self.read_this_cycle.peek() else {
            return Ok(());
        };

        if reading {
            if self.write_select.is_defined() || self.write_data.is_defined() {
                return Err(RegisterFileError::ReadWriteConflict);
            }

            if let Some(index) = self.read_select1.peek() {
                self.out1.set(self.registers[usize::from(index)].read());
            }
            if let Some(index) = self.read_select2.peek() {
                self.out2.set(self.registers[usize::from(index)].read());
            }
            if !self.out1.is_defined() && !self.out2.is_defined() {
                log::warn!("register file read requested with no read select");
            }
        } else {
            if self.read_select1.is_defined() || self.read_select2.is_defined() {
                return Err(RegisterFileError::ReadWriteConflict);
            }

            let index = self.write_select.get()?;
            let value = self.write_data.get()?;
            if index == 0 {
                log::debug!("discarding write of {} to r0", value);
            } else {
                log::debug!("r{} <- {}", index, value);
                self.registers[usize::from(index)].drive(value);
            }
        }

        Ok(())
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_index(index: u8) -> Result<(), RegisterFileError> {
    if usize::from(index) < REGISTER_COUNT {
        Ok(())
    } else {
        Err(RegisterFileError::IndexOutOfRange(index))
    }
}

/// Errors that can occur in the register file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterFileError {
    #[error("register index {0} out of range (0-31)")]
    IndexOutOfRange(u8),

    #[error("register file asked to read and write in the same cycle")]
    ReadWriteConflict,

    #[error("incomplete register file write: {0}")]
    IncompleteWrite(#[from] HwError),
}
