//! Two-pass assembler.
//!
//! Syntax:
//! ```text
//! ; Comment
//! start:              ; Define a label (its byte address)
//!     addi r0, 100    ; r1 = r0 + 100
//!     add  r1, r0, r2 ; r2 = r1 + r0
//!     store r0, r1    ; mem[r0] = r1
//!     load r3, r4     ; r4 = mem[r3]
//!     addi r0, start  ; labels are byte addresses
//!     jr r1
//!     halt
//! data:
//!     .word 1234      ; raw data word (decimal, hex or label)
//!     .word "Hell"    ; four ASCII characters, first one in the top byte
//! ```
//!
//! Operands are separated by commas and/or whitespace. Mnemonics, register
//! names and labels are case-insensitive.

use std::collections::HashMap;

use thiserror::Error;

use crate::asm::encode::{EncodeError, Instruction};
use crate::cpu::opcode::{
    ImmediateOp, MemoryOp, NoOperandOp, OneRegOp, Opcode, OperandClass, ThreeRegOp,
};
use crate::word::{self, WORD_BYTES};

/// Assemble source code into a memory image.
pub fn assemble(source: &str) -> Result<Vec<u32>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// One source statement that occupies a word.
#[derive(Debug)]
struct Statement<'a> {
    line: usize,
    mnemonic: &'a str,
    operands: &'a str,
}

/// The assembler state.
struct Assembler<'a> {
    /// Symbol table (upper-cased label -> byte address).
    symbols: HashMap<String, u32>,
    /// Statements in address order, collected by pass 1.
    statements: Vec<Statement<'a>>,
}

impl<'a> Assembler<'a> {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            statements: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &'a str) -> Result<Vec<u32>, AssemblerError> {
        // Pass 1: collect labels and statements
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: encode with every label known
        let image = self
            .statements
            .iter()
            .map(|stmt| self.encode(stmt))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "assembled {} words, {} labels",
            image.len(),
            self.symbols.len()
        );
        Ok(image)
    }

    fn process_line(&mut self, line: &'a str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if line.is_empty() {
            return Ok(());
        }

        // Label definition, possibly followed by a statement
        let line = match line.split_once(':') {
            Some((label, rest)) if !label.contains('"') => {
                self.define_label(label.trim(), line_num)?;
                rest.trim()
            }
            _ => line,
        };

        if line.is_empty() {
            return Ok(());
        }

        let (mnemonic, operands) = match line.split_once(char::is_whitespace) {
            Some((m, rest)) => (m, rest.trim()),
            None => (line, ""),
        };
        self.statements.push(Statement {
            line: line_num,
            mnemonic,
            operands,
        });
        Ok(())
    }

    fn define_label(&mut self, label: &str, line_num: usize) -> Result<(), AssemblerError> {
        if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid label '{}'", label),
            });
        }

        let address = self.statements.len() as u32 * WORD_BYTES;
        if self.symbols.insert(label.to_uppercase(), address).is_some() {
            return Err(AssemblerError::DuplicateLabel {
                line: line_num,
                label: label.to_string(),
            });
        }
        Ok(())
    }

    fn encode(&self, stmt: &Statement<'_>) -> Result<u32, AssemblerError> {
        if stmt.mnemonic.eq_ignore_ascii_case(".word") {
            return self.parse_data(stmt.operands, stmt.line);
        }

        let opcode = Opcode::from_mnemonic(stmt.mnemonic).ok_or_else(|| {
            AssemblerError::UnknownMnemonic {
                line: stmt.line,
                mnemonic: stmt.mnemonic.to_string(),
            }
        })?;

        let operands: Vec<&str> = stmt
            .operands
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        let expected = match opcode.class() {
            OperandClass::ThreeReg => 3,
            OperandClass::RegImmediate | OperandClass::RegPair => 2,
            OperandClass::OneReg => 1,
            OperandClass::NoOperand => 0,
        };
        if operands.len() != expected {
            return Err(AssemblerError::SyntaxError {
                line: stmt.line,
                message: format!(
                    "{} takes {} operand(s), found {}",
                    opcode.mnemonic(),
                    expected,
                    operands.len()
                ),
            });
        }

        let reg = |i: usize| parse_register(operands[i], stmt.line);
        let encoded = match opcode {
            Opcode::Add => Instruction::three_reg(ThreeRegOp::Add, reg(0)?, reg(1)?, reg(2)?),
            Opcode::Sub => Instruction::three_reg(ThreeRegOp::Sub, reg(0)?, reg(1)?, reg(2)?),
            Opcode::Nand => Instruction::three_reg(ThreeRegOp::Nand, reg(0)?, reg(1)?, reg(2)?),
            Opcode::Lshift => {
                Instruction::three_reg(ThreeRegOp::Lshift, reg(0)?, reg(1)?, reg(2)?)
            }
            Opcode::AddImmediate | Opcode::SubImmediate => {
                let op = if opcode == Opcode::AddImmediate {
                    ImmediateOp::AddImmediate
                } else {
                    ImmediateOp::SubImmediate
                };
                let value = self.parse_value(operands[1], stmt.line)?;
                let immediate = i32::try_from(value).map_err(|_| {
                    AssemblerError::ValueOutOfRange {
                        line: stmt.line,
                        value,
                    }
                })?;
                Instruction::immediate(op, reg(0)?, immediate)
            }
            Opcode::JumpToReg => Instruction::one_reg(OneRegOp::JumpToReg, reg(0)?),
            Opcode::BranchIfZero => Instruction::one_reg(OneRegOp::BranchIfZero, reg(0)?),
            Opcode::BranchIfPositive => Instruction::one_reg(OneRegOp::BranchIfPositive, reg(0)?),
            Opcode::Load => Instruction::memory(MemoryOp::Load, reg(0)?, reg(1)?),
            Opcode::Store => Instruction::memory(MemoryOp::Store, reg(0)?, reg(1)?),
            Opcode::Nop => Ok(Instruction::no_operand(NoOperandOp::Nop)),
            Opcode::DisplayFlush => Ok(Instruction::no_operand(NoOperandOp::DisplayFlush)),
            Opcode::Halt => Ok(Instruction::no_operand(NoOperandOp::Halt)),
        };

        encoded
            .map(Instruction::word)
            .map_err(|source| AssemblerError::Encode {
                line: stmt.line,
                source,
            })
    }

    /// `.word` operand: a number, a label, or a 4-character string.
    fn parse_data(&self, operand: &str, line_num: usize) -> Result<u32, AssemblerError> {
        if let Some(text) = operand
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            let bytes: [u8; 4] = text.as_bytes().try_into().map_err(|_| {
                AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("string data must be exactly 4 bytes: \"{}\"", text),
                }
            })?;
            return Ok(word::ascii_word(bytes));
        }

        let value = self.parse_value(operand, line_num)?;
        if let Ok(v) = u32::try_from(value) {
            Ok(v)
        } else if let Ok(v) = i32::try_from(value) {
            Ok(word::to_wire(v))
        } else {
            Err(AssemblerError::ValueOutOfRange {
                line: line_num,
                value,
            })
        }
    }

    fn parse_value(&self, operand: &str, line_num: usize) -> Result<i64, AssemblerError> {
        let operand = operand.trim();
        if operand.is_empty() {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: "missing value".into(),
            });
        }

        let (negative, digits) = match operand.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, operand),
        };

        // Check for hex literal
        if let Some(hex) = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            let value = i64::from_str_radix(hex, 16).map_err(|_| AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid hex literal '{}'", operand),
            })?;
            return Ok(if negative { -value } else { value });
        }

        // Check for decimal number
        if digits.starts_with(|c: char| c.is_ascii_digit()) {
            return operand
                .parse::<i64>()
                .map_err(|_| AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid number '{}'", operand),
                });
        }

        // Must be a label reference
        self.symbols
            .get(&operand.to_uppercase())
            .map(|&addr| i64::from(addr))
            .ok_or_else(|| AssemblerError::UndefinedLabel {
                line: line_num,
                label: operand.to_string(),
            })
    }
}

fn parse_register(operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
    operand
        .strip_prefix('r')
        .or_else(|| operand.strip_prefix('R'))
        .and_then(|n| n.parse::<u8>().ok())
        .ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("expected a register (r0-r31), found '{}'", operand),
        })
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("label defined twice on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("line {line}: {source}")]
    Encode { line: usize, source: EncodeError },
}
