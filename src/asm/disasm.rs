//! Disassembler.
//!
//! Converts machine words back to assembler text. Words that are not
//! exactly an instruction (unknown opcode, or stray bits in unused fields)
//! come out as `.word`, so the output always re-assembles to the same image.

use crate::cpu::decode::{decode, Decoder, A_OFFSET, B_OFFSET, DEST_OFFSET};
use crate::cpu::opcode::{Opcode, OperandClass};
use crate::hw::HwError;
use crate::word::WORD_BYTES;

const FIELD: u32 = 0x1F;

/// Disassemble a single word to text.
pub fn disassemble_word(word: u32) -> String {
    match decode(word) {
        Ok(decoded) if word & !used_bits(&decoded) == 0 => format_instruction(&decoded)
            .unwrap_or_else(|_| format!(".word {:#010x}", word)),
        _ => format!(".word {:#010x}", word),
    }
}

/// Disassemble a memory image, one line per word.
pub fn disassemble(image: &[u32]) -> String {
    let mut output = String::new();
    output.push_str("; tickcpu disassembly\n");
    output.push_str("; -------------------\n\n");

    for (i, &word) in image.iter().enumerate() {
        let addr = i as u32 * WORD_BYTES;
        let line = disassemble_word(word);
        output.push_str(&format!("    {:<24}; {:#06x}  {:08x}\n", line, addr, word));
    }

    output
}

/// Format a decoded instruction as assembly text.
fn format_instruction(dec: &Decoder) -> Result<String, HwError> {
    let opcode = dec.opcode()?;
    let m = opcode.mnemonic();
    Ok(match opcode.class() {
        OperandClass::ThreeReg => format!("{} r{}, r{}, r{}", m, dec.a()?, dec.b()?, dec.dest()?),
        OperandClass::RegImmediate => format!("{} r{}, {}", m, dec.a()?, dec.immediate()?),
        OperandClass::OneReg => format!("{} r{}", m, dec.a()?),
        OperandClass::RegPair if opcode == Opcode::Load => {
            format!("{} r{}, r{}", m, dec.a()?, dec.dest()?)
        }
        OperandClass::RegPair => format!("{} r{}, r{}", m, dec.a()?, dec.b()?),
        OperandClass::NoOperand => m.to_string(),
    })
}

/// Bits a well-formed instruction of this opcode may have set.
fn used_bits(dec: &Decoder) -> u32 {
    let Ok(opcode) = dec.opcode() else {
        return 0;
    };
    let a = FIELD << A_OFFSET;
    let b = FIELD << B_OFFSET;
    let dest = FIELD << DEST_OFFSET;
    FIELD
        | match opcode.class() {
            OperandClass::ThreeReg => a | b | dest,
            OperandClass::RegImmediate => u32::MAX,
            OperandClass::OneReg => a,
            OperandClass::RegPair if opcode == Opcode::Load => a | dest,
            OperandClass::RegPair => a | b,
            OperandClass::NoOperand => 0,
        }
}
