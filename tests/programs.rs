//! End-to-end programs run on the whole CPU.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use tickcpu::asm::demo::HELLO_WORLD;
use tickcpu::asm::Instruction;
use tickcpu::cpu::control::DEFAULT_CAPACITY;
use tickcpu::cpu::decode::DecodeError;
use tickcpu::cpu::memory::MemoryError;
use tickcpu::cpu::opcode::{ImmediateOp, MemoryOp, NoOperandOp, OneRegOp, ThreeRegOp};
use tickcpu::{assemble, Cpu, CpuError, EmulatorConfig, VideoSink};

const TICK_LIMIT: u64 = 100_000;

/// Video sink the test can still read after handing it to the CPU.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn words(program: &[Instruction]) -> Vec<u32> {
    program.iter().map(|i| i.word()).collect()
}

fn run(image: &[u32]) -> Cpu {
    let mut cpu = Cpu::new(image).unwrap().with_video_sink(io::sink());
    cpu.run(Some(TICK_LIMIT)).unwrap();
    cpu
}

fn addi(a: u8, imm: i32) -> Instruction {
    Instruction::immediate(ImmediateOp::AddImmediate, a, imm).unwrap()
}

fn halt() -> Instruction {
    Instruction::no_operand(NoOperandOp::Halt)
}

#[test]
fn test_immediates_and_store() {
    let program = [
        addi(0, 100),
        Instruction::immediate(ImmediateOp::SubImmediate, 1, 50).unwrap(),
        Instruction::memory(MemoryOp::Store, 0, 1).unwrap(),
        halt(),
    ];
    let cpu = run(&words(&program));
    assert_eq!(cpu.debug_read(0).unwrap(), 50);
    assert_eq!(cpu.register(1).unwrap(), 50);
}

#[test]
fn test_add_and_sub() {
    let program = [
        addi(0, -10),
        Instruction::three_reg(ThreeRegOp::Add, 0, 1, 2).unwrap(),
        Instruction::three_reg(ThreeRegOp::Sub, 2, 1, 3).unwrap(),
        Instruction::memory(MemoryOp::Store, 0, 3).unwrap(),
        halt(),
    ];
    let cpu = run(&words(&program));
    assert_eq!(cpu.register(2).unwrap(), -10);
    assert_eq!(cpu.register(3).unwrap(), 0);
    // the store overwrote the first instruction with r3
    assert_eq!(cpu.debug_read(0).unwrap(), 0);
}

#[test]
fn test_nand_and_lshift() {
    let cpu = run(&assemble(
        r#"
        addi r0, 6
        add r1, r0, r2      ; r2 = 6
        addi r0, 3          ; r1 = 3
        nand r2, r1, r3     ; r3 = !(6 & 3) = !2
        lshift r2, r1, r4   ; r4 = 6 << 3
        halt
        "#,
    )
    .unwrap());
    assert_eq!(cpu.register(3).unwrap(), !2);
    assert_eq!(cpu.register(4).unwrap(), 48);
}

#[test]
fn test_load_and_jump() {
    let program = [
        addi(0, 7 * 4),
        Instruction::memory(MemoryOp::Load, 1, 10).unwrap(),
        addi(0, 10),
        Instruction::memory(MemoryOp::Store, 1, 10).unwrap(),
        halt(),
        addi(0, 9 * 4),
        Instruction::one_reg(OneRegOp::JumpToReg, 1).unwrap(),
        Instruction::data(1234),
        halt(),
        addi(0, 10),
        Instruction::memory(MemoryOp::Store, 1, 10).unwrap(),
        halt(),
    ];
    let cpu = run(&words(&program));
    assert_eq!(cpu.register(10).unwrap(), 1234);
    assert_eq!(cpu.debug_read(10).unwrap(), 1234);
    // halted on the first halt
    assert_eq!(cpu.pc(), 16);
}

#[test]
fn test_conditional_branches() {
    let source = r#"
        addi r0, 12
        bp r1               ; taken: r1 = 12 is positive
        halt
        subi r0, 1          ; r1 = -1
        bp r1               ; not taken
        add r0, r1, r2      ; r2 = -1
        add r0, r1, r3      ; r3 = -1
        addi r0, 44
        sub r2, r3, r10     ; zero
        bz r1               ; taken
        halt
        addi r0, 0
        sub r0, r2, r10     ; 0 - (-1) = 1, not zero
        bz r1               ; not taken
        add r0, r1, r2      ; r2 = 0
        addi r0, 100
        store r1, r2
        halt
    "#;
    let cpu = run(&assemble(source).unwrap());
    assert_eq!(cpu.debug_read(100).unwrap(), 0);
    assert_eq!(cpu.register(10).unwrap(), 1);
    // ran to the last halt, not one of the early ones
    assert_eq!(cpu.pc(), 17 * 4);
}

#[test]
fn test_branch_uses_last_arithmetic_flags() {
    // the flags set by subi survive the store, nop and flush in between
    let cpu = run(&assemble(
        r#"
        addi r0, target
        add r1, r0, r5
        subi r0, 0          ; zero
        store r0, r0
        nop
        flush
        bz r5
        halt
    target:
        addi r0, 77
        halt
        "#,
    )
    .unwrap());
    assert_eq!(cpu.register(1).unwrap(), 77);
}

#[test]
fn test_register_zero_stays_zero() {
    let cpu = run(&assemble(
        r#"
        addi r0, 5
        add r1, r1, r0      ; attempt r0 = 10
        add r0, r0, r2
        halt
        "#,
    )
    .unwrap());
    assert_eq!(cpu.register(0).unwrap(), 0);
    assert_eq!(cpu.register(2).unwrap(), 0);
}

#[test]
fn test_halt_alone() {
    let mut cpu = Cpu::new(&[halt().word()]).unwrap();
    assert!(!cpu.tick().unwrap());
    assert!(!cpu.tick().unwrap());
    assert!(cpu.tick().unwrap());
    for _ in 0..100 {
        assert!(cpu.tick().unwrap());
    }
    assert_eq!(cpu.ticks(), 3);
}

#[test]
fn test_tick_counts() {
    // nop: 3 ticks, addi: 4, store: 3, halt: 3
    let cpu = run(&words(&[
        Instruction::no_operand(NoOperandOp::Nop),
        addi(0, 1),
        Instruction::memory(MemoryOp::Store, 0, 1).unwrap(),
        halt(),
    ]));
    assert_eq!(cpu.ticks(), 13);
}

#[test]
fn test_video_write_and_flush() {
    let sink = SharedBuffer::default();
    let mut cpu = Cpu::new(&assemble(
        r#"
        addi r0, text
        load r1, r2
        addi r0, 6144       ; first video byte
        store r1, r2
        flush
        halt
    text:
        .word "ABC#"
        "#,
    )
    .unwrap())
    .unwrap()
    .with_video_sink(sink.clone());
    cpu.run(Some(TICK_LIMIT)).unwrap();

    let text = sink.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 64);
    assert_eq!(lines[0], format!("ABC{}", "#".repeat(57)));
    assert_eq!(lines[1], "#".repeat(60));
    assert_eq!(cpu.frames_flushed(), 1);
}

#[test]
fn test_hello_world_demo() {
    let sink = SharedBuffer::default();
    let mut cpu = Cpu::new(&assemble(HELLO_WORLD).unwrap())
        .unwrap()
        .with_video_sink(sink.clone());
    cpu.run(Some(TICK_LIMIT)).unwrap();

    assert_eq!(cpu.frames_flushed(), 32);
    let rows = cpu.render_video().unwrap();
    assert_eq!(rows[0], format!("{}Hello World!{}", "_".repeat(32), "#".repeat(16)));
    assert!(rows[1..].iter().all(|row| row == &"#".repeat(60)));

    // first frame: one underscore, then the text
    let first = sink.text().lines().next().unwrap().to_string();
    assert_eq!(first, format!("_Hello World!{}", "#".repeat(47)));
}

#[test]
fn test_config_capacity_moves_video() {
    let config = EmulatorConfig {
        capacity: 8192,
        max_ticks: Some(1000),
        video_sink: VideoSink::Discard,
    };
    let cpu = Cpu::from_config(&[halt().word()], &config).unwrap();
    assert_eq!(cpu.capacity(), 8192);
    // video starts at 8192 - 4096
    assert_eq!(cpu.debug_read(4096).unwrap(), 0x2323_2323);
    assert_eq!(cpu.debug_read(4092).unwrap(), 0);
}

// ============================================================================
// Fatal conditions
// ============================================================================

#[test]
fn test_invalid_opcode() {
    let mut cpu = Cpu::new(&[8]).unwrap();
    cpu.tick().unwrap();
    assert!(matches!(
        cpu.tick(),
        Err(CpuError::DecodeError(DecodeError::InvalidOpcode { opcode: 8, .. }))
    ));
    assert!(matches!(cpu.tick(), Err(CpuError::Faulted)));
}

#[test]
fn test_running_off_into_data() {
    // execution falls through into a data word whose opcode is 18
    let mut cpu = Cpu::new(&[0, 18]).unwrap();
    assert!(matches!(cpu.run(Some(TICK_LIMIT)), Err(CpuError::DecodeError(_))));
}

#[test]
fn test_store_out_of_range() {
    let mut cpu = Cpu::new(&assemble(
        r#"
        addi r0, 10240
        store r1, r0
        halt
        "#,
    )
    .unwrap())
    .unwrap();
    assert!(matches!(
        cpu.run(Some(TICK_LIMIT)),
        Err(CpuError::MemoryError(MemoryError::AddressOutOfRange { addr: 10240, .. }))
    ));
}

#[test]
fn test_negative_address() {
    let mut cpu = Cpu::new(&assemble("subi r0, 4\nload r1, r2\nhalt").unwrap()).unwrap();
    assert!(matches!(
        cpu.run(Some(TICK_LIMIT)),
        Err(CpuError::MemoryError(MemoryError::AddressOutOfRange { .. }))
    ));
}

#[test]
fn test_jump_past_memory() {
    let mut cpu = Cpu::new(&assemble("addi r0, 20000\njr r1").unwrap()).unwrap();
    assert!(matches!(
        cpu.run(Some(TICK_LIMIT)),
        Err(CpuError::MemoryError(_))
    ));
    assert!(cpu.is_faulted());
}

#[test]
fn test_image_too_large() {
    let image = vec![0u32; (DEFAULT_CAPACITY as usize - 4096) / 4 + 1];
    assert!(matches!(
        Cpu::new(&image),
        Err(CpuError::MemoryError(MemoryError::ImageTooLarge { .. }))
    ));
}

#[test]
fn test_capacity_without_room_for_video() {
    assert!(matches!(
        Cpu::with_capacity(&[], 4096),
        Err(CpuError::MemoryError(MemoryError::NoRoomForVideo { .. }))
    ));
}
