/*!
  This module is responsible for the encoding and decoding of the binary artifact.

  The artifact is line oriented text. Each instruction is one line: the opcode as a single
  hex digit immediately followed by the argument in hex, then a space and the decimal
  indirection level. A line holding `-1` ends the code. Each remaining line is a data
  entry, an address and a value in hex.

  ```text
  1A 0        LOD A
  220 1       STO [20]
  F0 0        HALT
  -1
  20 -5       DATA 20 -5
  ```

  Hex is upper case. Negative numbers carry a leading `-` rather than a two's complement
  rendering so that decoding never depends on the word size.
*/

use nom::{
  bytes::complete::take_while1,
  character::complete::{char as one_char, digit1, satisfy},
  combinator::{all_consuming, map_res, opt, recognize},
  sequence::{pair, separated_pair, tuple},
  IResult
};

use super::{Instruction, Level, Opcode, Word};
use crate::error::LoadError;

// If you change this you must also change `Program::from_artifact`.
pub const SENTINEL: &str = "-1";

/// One initial value of data memory.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DataEntry {
  pub address : usize,
  pub value   : Word,
}

/// An assembled program: the instruction stream in execution order and the data segment
/// in load order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
  pub code : Vec<Instruction>,
  pub data : Vec<DataEntry>,
}

/// Upper-case hex with a leading `-` for negative values.
pub(crate) fn hex(value: Word) -> String {
  match value < 0 {
    true  => format!("-{:X}", value.unsigned_abs()),
    false => format!("{:X}", value)
  }
}

pub fn encode_instruction(instruction: &Instruction) -> String {
  format!("{:X}{} {}", instruction.opcode.code(), hex(instruction.argument), instruction.level)
}

pub fn encode_data(entry: &DataEntry) -> String {
  format!("{:X} {}", entry.address, hex(entry.value))
}

// region Artifact parsers

fn is_hex_digit(c: char) -> bool {
  c.is_ascii_digit() || ('A'..='F').contains(&c)
}

fn signed_hex(input: &str) -> IResult<&str, Word> {
  map_res(
    recognize(pair(opt(one_char('-')), take_while1(is_hex_digit))),
    |text: &str| Word::from_str_radix(text, 16)
  )(input)
}

fn address_hex(input: &str) -> IResult<&str, usize> {
  map_res(take_while1(is_hex_digit), |text: &str| usize::from_str_radix(text, 16))(input)
}

/// `<opcode digit><argument> <level>`
fn instruction_p(input: &str) -> IResult<&str, (u8, Word, u32)> {
  map_res(
    all_consuming(tuple((
      satisfy(is_hex_digit),
      signed_hex,
      one_char(' '),
      digit1
    ))),
    |(opcode, argument, _, level): (char, Word, char, &str)| {
      // `satisfy(is_hex_digit)` guarantees both conversions succeed.
      let opcode = opcode.to_digit(16).map(|d| d as u8).ok_or(())?;
      let level  = level.parse::<u32>().map_err(|_| ())?;
      Ok::<_, ()>((opcode, argument, level))
    }
  )(input)
}

fn data_p(input: &str) -> IResult<&str, (usize, Word)> {
  all_consuming(separated_pair(address_hex, one_char(' '), signed_hex))(input)
}

// endregion

pub fn decode_instruction(line: usize, text: &str) -> Result<Instruction, LoadError> {
  let (_, (code, argument, level)) = instruction_p(text).map_err(|_| {
    LoadError::MalformedInstruction { line, text: text.to_string() }
  })?;

  let opcode = Opcode::try_from(code).map_err(|_| LoadError::UnknownOpcode { line, opcode: code })?;
  let level = match Level::try_from(level) {
    Ok(level) if level <= 2 => level,
    _                       => return Err(LoadError::InvalidLevel { line, level })
  };

  Ok(Instruction { opcode, argument, level })
}

pub fn decode_data(line: usize, text: &str) -> Result<DataEntry, LoadError> {
  match data_p(text) {
    Ok((_, (address, value))) => Ok(DataEntry { address, value }),
    Err(_) => Err(LoadError::MalformedData { line, text: text.to_string() })
  }
}

impl Program {
  pub fn new(code: Vec<Instruction>, data: Vec<DataEntry>) -> Program {
    Program { code, data }
  }

  /// Serializes the program in artifact form, one line per instruction or data entry.
  pub fn to_artifact(&self) -> String {
    let mut buffer = String::new();
    for instruction in &self.code {
      buffer.push_str(&encode_instruction(instruction));
      buffer.push('\n');
    }
    buffer.push_str(SENTINEL);
    buffer.push('\n');
    for entry in &self.data {
      buffer.push_str(&encode_data(entry));
      buffer.push('\n');
    }
    buffer
  }

  /// Parses an artifact produced by `to_artifact`. Trailing whitespace on a line is ignored.
  pub fn from_artifact(text: &str) -> Result<Program, LoadError> {
    let mut program  = Program::default();
    let mut in_data  = false;

    for (idx, raw) in text.lines().enumerate() {
      let line = idx + 1;
      let raw  = raw.trim_end();

      if in_data {
        if raw.is_empty() {
          continue;
        }
        program.data.push(decode_data(line, raw)?);
      } else if raw == SENTINEL {
        in_data = true;
      } else {
        program.code.push(decode_instruction(line, raw)?);
      }
    }

    match in_data {
      true  => Ok(program),
      false => Err(LoadError::MissingSentinel)
    }
  }
}
