//! Error types shared by the assembler, the artifact loader, and the machine.
//!
//! Assembly-time problems are collected into `Diagnostics` and never abort the pass that
//! finds them. Execution-time problems are `Fault`s: exactly one is raised per failing
//! step, and raising one halts the machine.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::bytecode::{Level, Opcode, Word};

/// A fatal condition raised while executing a single instruction.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fault {
  #[error("illegal indirection level {level} for {opcode}")]
  InvalidIndirection {
    opcode : Opcode,
    level  : Level
  },

  #[error("division by zero")]
  DivideByZero,

  #[error("invalid ROT control block at {block}: start {start}, length {length}")]
  InvalidRotation {
    block  : Word,
    start  : Word,
    length : Word
  },

  #[error("memory address {0} is out of bounds")]
  AddressOutOfBounds(Word),

  #[error("program counter {0} is outside the loaded code")]
  ProgramCounterOutOfBounds(Word),

  #[error("the machine is not running")]
  NotRunning,
}

/// A malformed binary artifact. Line numbers are 1-based.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum LoadError {
  #[error("line {line}: `{text}` is not an encoded instruction")]
  MalformedInstruction { line: usize, text: String },

  #[error("line {line}: {opcode:#X} is not an opcode")]
  UnknownOpcode { line: usize, opcode: u8 },

  #[error("line {line}: indirection level {level} is not 0, 1, or 2")]
  InvalidLevel { line: usize, level: u32 },

  #[error("line {line}: `{text}` is not an address/value pair")]
  MalformedData { line: usize, text: String },

  #[error("the code section is not terminated by `-1`")]
  MissingSentinel,
}

/**
  Every problem found while assembling one source text, keyed by 1-based line number.
  Key `0` is reserved for failures that concern the whole file (it could not be read or
  the artifact could not be written).

  Only the first problem found on a line is kept.
*/
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Diagnostics(BTreeMap<usize, String>);

impl Diagnostics {
  pub fn new() -> Diagnostics {
    Diagnostics(BTreeMap::new())
  }

  /// Records `message` against `line` unless that line already has a diagnostic.
  pub fn report(&mut self, line: usize, message: impl Into<String>) {
    self.0.entry(line).or_insert_with(|| message.into());
  }

  pub fn get(&self, line: usize) -> Option<&str> {
    self.0.get(&line).map(String::as_str)
  }

  pub fn contains(&self, line: usize) -> bool {
    self.0.contains_key(&line)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn lines(&self) -> impl Iterator<Item = usize> + '_ {
    self.0.keys().copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
    self.0.iter().map(|(line, message)| (*line, message.as_str()))
  }
}

impl Display for Diagnostics {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let messages: Vec<&str> = self.0.values().map(String::as_str).collect();
    write!(f, "{}", messages.join("\n"))
  }
}

impl std::error::Error for Diagnostics {}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_report_wins(){
    let mut diagnostics = Diagnostics::new();
    diagnostics.report(3, "first");
    diagnostics.report(3, "second");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics.get(3), Some("first"));
  }

  #[test]
  fn display_in_line_order(){
    let mut diagnostics = Diagnostics::new();
    diagnostics.report(7, "seven");
    diagnostics.report(0, "zero");
    diagnostics.report(2, "two");
    assert_eq!(format!("{}", diagnostics), "zero\ntwo\nseven");
    assert_eq!(diagnostics.lines().collect::<Vec<_>>(), vec![0, 2, 7]);
  }
}
