//! Byte-addressable RAM.
//!
//! Word accesses are 4 bytes, stored big-endian. Any address from 0 up to
//! `capacity - 4` is legal; accesses need not be aligned.
//!
//! The data line is a [`Bus`] shared by the write port and the RAM's own
//! read driver. A read cycle leaves its word on the line for the
//! following cycle; an idle cycle lets the line float.

use thiserror::Error;

use crate::hw::{Bus, BusId, HwError, Signal};
use crate::word::{self, WORD_BYTES};

/// One RAM block.
#[derive(Debug, Clone)]
pub struct Ram {
    cells: Vec<u8>,
    address: Signal<u32>,
    read_this_cycle: Signal<bool>,
    data: Bus<u32>,
    write_port: BusId,
    read_driver: BusId,
}

impl Ram {
    /// Create a zero-filled RAM of `capacity` bytes.
    pub fn new(capacity: u32) -> Result<Self, MemoryError> {
        Self::filled(capacity, 0)
    }

    /// Create a RAM with every byte set to `fill`.
    pub fn filled(capacity: u32, fill: u8) -> Result<Self, MemoryError> {
        if capacity < WORD_BYTES {
            return Err(MemoryError::TooSmall { capacity });
        }

        let mut data = Bus::new("memory data");
        let write_port = data.register_id()?;
        let read_driver = data.register_id()?;

        Ok(Self {
            cells: vec![fill; capacity as usize],
            address: Signal::new("memory address"),
            read_this_cycle: Signal::new("memory read this cycle"),
            data,
            write_port,
            read_driver,
        })
    }

    /// Create a RAM preloaded with `image`, one word per 4 bytes from address 0.
    pub fn with_image(capacity: u32, image: &[u32]) -> Result<Self, MemoryError> {
        let mut ram = Self::new(capacity)?;
        ram.load_image(image)?;
        Ok(ram)
    }

    /// Overwrite memory from address 0 with `image`.
    pub fn load_image(&mut self, image: &[u32]) -> Result<(), MemoryError> {
        let needed = image.len() as u64 * u64::from(WORD_BYTES);
        if needed > self.cells.len() as u64 {
            return Err(MemoryError::ImageTooLarge {
                words: image.len(),
                capacity: self.capacity(),
            });
        }

        for (i, &w) in image.iter().enumerate() {
            let base = i * WORD_BYTES as usize;
            self.cells[base..base + WORD_BYTES as usize].copy_from_slice(&word::to_be_bytes(w));
        }
        Ok(())
    }

    pub fn capacity(&self) -> u32 {
        self.cells.len() as u32
    }

    pub fn set_address(&mut self, addr: u32) -> Result<(), MemoryError> {
        self.check_address(addr)?;
        self.address.set(addr);
        Ok(())
    }

    /// `true` to read this cycle, `false` to write.
    pub fn set_read_this_cycle(&mut self, reading: bool) {
        self.read_this_cycle.set(reading);
    }

    /// Drive the word to write.
    pub fn set_data_in(&mut self, value: u32) -> Result<(), MemoryError> {
        self.data.claim(self.write_port)?;
        self.data.drive(self.write_port, value)?;
        Ok(())
    }

    /// The word on the data line, valid the cycle after a read.
    pub fn output(&self) -> Result<u32, MemoryError> {
        Ok(self.data.read()?)
    }

    /// Out-of-band read for tests and tooling. Never used by the CPU.
    pub fn debug_read(&self, addr: u32) -> Result<u32, MemoryError> {
        self.check_address(addr)?;
        Ok(self.word_at(addr))
    }

    /// Clock edge.
    pub fn tick(&mut self) -> Result<(), MemoryError> {
        let result = self.evaluate();
        self.address.undefine();
        self.read_this_cycle.undefine();
        result
    }

    fn evaluate(&mut self) -> Result<(), MemoryError> {
        let Some(reading) = self.read_this_cycle.peek() else {
            self.data.release();
            return Ok(());
        };

        let addr = self
            .address
            .get()
            .map_err(|_| MemoryError::MissingAddress)?;

        if reading {
            let value = self.word_at(addr);
            // fails if the write port is still holding the line
            self.data.claim(self.read_driver)?;
            self.data.drive(self.read_driver, value)?;
            self.data.surrender(self.read_driver)?;
        } else {
            if self.data.owner() != Some(self.write_port) {
                return Err(MemoryError::WriteWithoutData);
            }
            let value = self.data.read()?;
            let base = addr as usize;
            self.cells[base..base + WORD_BYTES as usize].copy_from_slice(&word::to_be_bytes(value));
            log::debug!("mem[{:#06x}] <- {:#010x}", addr, value);
            self.data.release();
        }

        Ok(())
    }

    fn word_at(&self, addr: u32) -> u32 {
        let base = addr as usize;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.cells[base..base + WORD_BYTES as usize]);
        word::from_be_bytes(bytes)
    }

    fn check_address(&self, addr: u32) -> Result<(), MemoryError> {
        if addr > self.capacity() - WORD_BYTES {
            return Err(MemoryError::AddressOutOfRange {
                addr,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("address {addr:#x} out of range for {capacity}-byte memory")]
    AddressOutOfRange { addr: u32, capacity: u32 },

    #[error("image of {words} words does not fit in {capacity} bytes")]
    ImageTooLarge { words: usize, capacity: u32 },

    #[error("{capacity} bytes cannot hold a single word")]
    TooSmall { capacity: u32 },

    #[error("{capacity} bytes cannot hold the {video}-byte video buffer and any main memory")]
    NoRoomForVideo { capacity: u32, video: u32 },

    #[error("memory operation requested without an address")]
    MissingAddress,

    #[error("memory write requested without data")]
    WriteWithoutData,

    #[error(transparent)]
    Wiring(#[from] HwError),
}
