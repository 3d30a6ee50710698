//! Arithmetic logic unit.
//!
//! Purely combinational: the outputs are a function of the current control
//! and operand inputs. The result is computed lazily the first time an
//! output is read and memoized until an input changes or the block is
//! cleared for the next cycle.
//!
//! Operands and results can be exchanged either as host integers or as
//! raw two's-complement machine words (the `_wire` methods).

use serde::{Deserialize, Serialize};

use crate::hw::{HwError, Signal};
use crate::word;

/// ALU control codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AluOp {
    Add,
    Sub,
    Nand,
    Lshift,
}

/// One settled set of ALU outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOutput {
    pub result: i32,
    /// `result == 0`
    pub zero: bool,
    /// `result >= 0`. Zero counts as positive so that "not positive" and
    /// "negative" are the same condition.
    pub positive: bool,
}

/// Evaluate one ALU operation on 32-bit two's-complement values.
pub fn compute(op: AluOp, a: i32, b: i32) -> AluOutput {
    let result = match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Nand => !(a & b),
        // wrapping_shl takes the count mod 32
        AluOp::Lshift => a.wrapping_shl(b as u32),
    };

    AluOutput {
        result,
        zero: result == 0,
        positive: result >= 0,
    }
}

/// The ALU block with its input and output wires.
#[derive(Debug, Clone)]
pub struct Alu {
    control: Signal<AluOp>,
    a: Signal<i32>,
    b: Signal<i32>,

    result: Signal<i32>,
    zero: Signal<bool>,
    positive: Signal<bool>,

    up_to_date: bool,
}

impl Alu {
    pub fn new() -> Self {
        Self {
            control: Signal::new("alu control"),
            a: Signal::new("alu A"),
            b: Signal::new("alu B"),
            result: Signal::new("alu result"),
            zero: Signal::new("alu zero flag"),
            positive: Signal::new("alu positive flag"),
            up_to_date: false,
        }
    }

    pub fn set_control(&mut self, op: AluOp) {
        self.up_to_date = false;
        self.control.set(op);
    }

    pub fn set_a(&mut self, value: i32) {
        self.up_to_date = false;
        self.a.set(value);
    }

    pub fn set_b(&mut self, value: i32) {
        self.up_to_date = false;
        self.b.set(value);
    }

    /// Drive A from a machine word.
    pub fn set_a_wire(&mut self, word: u32) {
        self.set_a(word::from_wire(word));
    }

    /// Drive B from a machine word.
    pub fn set_b_wire(&mut self, word: u32) {
        self.set_b(word::from_wire(word));
    }

    /// Clear every input and output for the next cycle.
    pub fn undefine(&mut self) {
        self.up_to_date = false;
        self.control.undefine();
        self.a.undefine();
        self.b.undefine();
        self.result.undefine();
        self.zero.undefine();
        self.positive.undefine();
    }

    pub fn result(&mut self) -> Result<i32, HwError> {
        self.settle()?;
        self.result.get()
    }

    /// The result as a machine word.
    pub fn result_wire(&mut self) -> Result<u32, HwError> {
        self.result().map(word::to_wire)
    }

    pub fn zero_flag(&mut self) -> Result<bool, HwError> {
        self.settle()?;
        self.zero.get()
    }

    pub fn positive_flag(&mut self) -> Result<bool, HwError> {
        self.settle()?;
        self.positive.get()
    }

    /// All three outputs at once.
    pub fn output(&mut self) -> Result<AluOutput, HwError> {
        Ok(AluOutput {
            result: self.result()?,
            zero: self.zero_flag()?,
            positive: self.positive_flag()?,
        })
    }

    fn settle(&mut self) -> Result<(), HwError> {
        if self.up_to_date {
            return Ok(());
        }

        let out = compute(self.control.get()?, self.a.get()?, self.b.get()?);
        self.result.set(out.result);
        self.zero.set(out.zero);
        self.positive.set(out.positive);
        self.up_to_date = true;
        Ok(())
    }
}

impl Default for Alu {
    fn default() -> Self {
        Self::new()
    }
}
