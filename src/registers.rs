//! The CPU state: the accumulator and the program counter.

use crate::bytecode::Word;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Registers {
  pub accumulator     : Word,
  /// Index of the next instruction to fetch.
  pub program_counter : usize,
}

impl Registers {
  pub fn new() -> Registers {
    Registers::default()
  }

  pub fn reset(&mut self) {
    self.accumulator     = 0;
    self.program_counter = 0;
  }

  pub fn advance(&mut self) {
    self.program_counter += 1;
  }
}
