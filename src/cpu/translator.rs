//! Address translation between main memory and the video buffer.
//!
//! The address space of `N` bytes is split in two: `[0, N - 4096)` is main
//! memory and the top 4096 bytes are a text-mode video buffer. Addresses in
//! the upper region are rebased to zero before they reach the video RAM.
//! The split is fixed when the translator is built.
//!
//! The video buffer is 64 rows with a 64-byte stride, of which the first 60
//! columns are displayed. It starts out filled with `'#'`.

use crate::cpu::memory::{MemoryError, Ram};
use crate::hw::Signal;
use crate::word::{self, WORD_BYTES};

/// Size of the video buffer in bytes.
pub const VIDEO_BYTES: u32 = 4096;
/// Displayed rows.
pub const VIDEO_ROWS: u32 = 64;
/// Bytes between the starts of consecutive rows.
pub const VIDEO_ROW_STRIDE: u32 = 64;
/// Displayed columns per row.
pub const VIDEO_COLUMNS: u32 = 60;
/// Initial content of every video byte.
pub const VIDEO_FILL: u8 = b'#';

/// Where a translated address lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Main(u32),
    Video(u32),
}

/// Main memory plus the memory-mapped video buffer.
#[derive(Debug, Clone)]
pub struct AddressTranslator {
    capacity: u32,
    main: Ram,
    video: Ram,
    video_selected: Signal<bool>,
    // which RAM served the previous cycle, so output() knows where to look
    previous_video_selected: Signal<bool>,
}

impl AddressTranslator {
    /// Build a `capacity`-byte address space with `image` loaded into main memory.
    pub fn new(capacity: u32, image: &[u32]) -> Result<Self, MemoryError> {
        if capacity < VIDEO_BYTES + WORD_BYTES {
            return Err(MemoryError::NoRoomForVideo {
                capacity,
                video: VIDEO_BYTES,
            });
        }

        Ok(Self {
            capacity,
            main: Ram::with_image(capacity - VIDEO_BYTES, image)?,
            video: Ram::filled(VIDEO_BYTES, VIDEO_FILL)?,
            video_selected: Signal::new("video memory selected"),
            previous_video_selected: Signal::new("previous video memory selected"),
        })
    }

    /// Total addressable bytes.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// First address of the video buffer.
    pub fn video_base(&self) -> u32 {
        self.capacity - VIDEO_BYTES
    }

    /// Map an address onto one of the two RAMs.
    pub fn translate(&self, addr: u32) -> Result<Target, MemoryError> {
        if addr >= self.capacity {
            Err(MemoryError::AddressOutOfRange {
                addr,
                capacity: self.capacity,
            })
        } else if addr >= self.video_base() {
            Ok(Target::Video(addr - self.video_base()))
        } else {
            Ok(Target::Main(addr))
        }
    }

    pub fn set_address(&mut self, addr: u32) -> Result<(), MemoryError> {
        match self.translate(addr)? {
            Target::Video(offset) => {
                log::trace!("video memory address {:#06x}", offset);
                self.video_selected.set(true);
                self.video.set_address(offset)
            }
            Target::Main(offset) => {
                log::trace!("main memory address {:#06x}", offset);
                self.video_selected.set(false);
                self.main.set_address(offset)
            }
        }
    }

    /// Requires [`set_address`](Self::set_address) earlier in the same cycle.
    pub fn set_read_this_cycle(&mut self, reading: bool) -> Result<(), MemoryError> {
        self.selected_mut()?.set_read_this_cycle(reading);
        Ok(())
    }

    /// Requires [`set_address`](Self::set_address) earlier in the same cycle.
    pub fn set_data_in(&mut self, value: u32) -> Result<(), MemoryError> {
        self.selected_mut()?.set_data_in(value)
    }

    /// The word read by the previous cycle.
    pub fn output(&self) -> Result<u32, MemoryError> {
        if self.previous_video_selected.get()? {
            self.video.output()
        } else {
            self.main.output()
        }
    }

    /// Out-of-band read for tests and tooling. Never used by the CPU.
    pub fn debug_read(&self, addr: u32) -> Result<u32, MemoryError> {
        match self.translate(addr)? {
            Target::Video(offset) => self.video.debug_read(offset),
            Target::Main(offset) => self.main.debug_read(offset),
        }
    }

    /// Clock edge for both RAMs.
    pub fn tick(&mut self) -> Result<(), MemoryError> {
        match self.video_selected.peek() {
            Some(video) => self.previous_video_selected.set(video),
            None => self.previous_video_selected.undefine(),
        }
        self.video_selected.undefine();

        let video = self.video.tick();
        let main = self.main.tick();
        video.and(main)
    }

    /// The displayed part of the video buffer, one string per row.
    pub fn render_video(&self) -> Result<Vec<String>, MemoryError> {
        let mut rows = Vec::with_capacity(VIDEO_ROWS as usize);
        for y in 0..VIDEO_ROWS {
            let mut row = String::with_capacity(VIDEO_COLUMNS as usize);
            for x in (0..VIDEO_COLUMNS).step_by(WORD_BYTES as usize) {
                let chars = self.video.debug_read(y * VIDEO_ROW_STRIDE + x)?;
                row.extend(word::to_be_bytes(chars).iter().map(|&b| char::from(b)));
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn selected_mut(&mut self) -> Result<&mut Ram, MemoryError> {
        if self.video_selected.get()? {
            Ok(&mut self.video)
        } else {
            Ok(&mut self.main)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::HwError;

    const CAPACITY: u32 = 10240;

    fn read_cycle(mem: &mut AddressTranslator, addr: u32) -> u32 {
        mem.set_address(addr).unwrap();
        mem.set_read_this_cycle(true).unwrap();
        mem.tick().unwrap();
        mem.output().unwrap()
    }

    fn write_cycle(mem: &mut AddressTranslator, addr: u32, value: u32) {
        mem.set_address(addr).unwrap();
        mem.set_data_in(value).unwrap();
        mem.set_read_this_cycle(false).unwrap();
        mem.tick().unwrap();
    }

    #[test]
    fn test_translation_boundaries() {
        let mem = AddressTranslator::new(CAPACITY, &[]).unwrap();
        assert_eq!(mem.translate(0).unwrap(), Target::Main(0));
        assert_eq!(mem.translate(6143).unwrap(), Target::Main(6143));
        assert_eq!(mem.translate(6144).unwrap(), Target::Video(0));
        assert_eq!(mem.translate(10239).unwrap(), Target::Video(4095));
        assert!(mem.translate(10240).is_err());
    }

    #[test]
    fn test_main_memory_roundtrip() {
        let mut mem = AddressTranslator::new(CAPACITY, &[0x0004_1023]).unwrap();
        assert_eq!(read_cycle(&mut mem, 0), 0x0004_1023);

        write_cycle(&mut mem, 0, 100);
        assert_eq!(read_cycle(&mut mem, 0), 100);
    }

    #[test]
    fn test_video_memory_roundtrip() {
        let mut mem = AddressTranslator::new(CAPACITY, &[]).unwrap();
        write_cycle(&mut mem, 6144, word::ascii_word(*b"ABC\0"));

        let value = read_cycle(&mut mem, 6144);
        assert_eq!(&word::to_be_bytes(value)[..3], b"ABC");
        // main memory at the same offset is untouched
        assert_eq!(mem.debug_read(0).unwrap(), 0);
    }

    #[test]
    fn test_word_straddling_the_split_is_rejected() {
        let mut mem = AddressTranslator::new(CAPACITY, &[]).unwrap();
        assert!(mem.set_address(6142).is_err());
        assert!(mem.set_address(10237).is_err());
    }

    #[test]
    fn test_read_control_needs_address_first() {
        let mut mem = AddressTranslator::new(CAPACITY, &[]).unwrap();
        assert_eq!(
            mem.set_read_this_cycle(true),
            Err(MemoryError::Wiring(HwError::UndefinedSignal(
                "video memory selected"
            )))
        );
    }

    #[test]
    fn test_render_initial_buffer() {
        let mem = AddressTranslator::new(CAPACITY, &[]).unwrap();
        let rows = mem.render_video().unwrap();
        assert_eq!(rows.len(), 64);
        assert!(rows.iter().all(|r| r == &"#".repeat(60)));
    }

    #[test]
    fn test_render_shows_writes() {
        let mut mem = AddressTranslator::new(CAPACITY, &[]).unwrap();
        write_cycle(&mut mem, 6144 + 64 + 4, word::ascii_word(*b"Hi!!"));
        let rows = mem.render_video().unwrap();
        assert_eq!(&rows[1][..8], "####Hi!!");
        assert_eq!(rows[0], "#".repeat(60));
    }

    #[test]
    fn test_too_small_for_video() {
        assert!(matches!(
            AddressTranslator::new(4096, &[]),
            Err(MemoryError::NoRoomForVideo { .. })
        ));
    }
}
