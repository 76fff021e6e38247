/*!
  The human readable textual form of bytecode is called assembly. This module translates
  assembly source into a `Program` and back.

  Source is line oriented. Each code line is a mnemonic optionally followed by one
  argument:

  ```text
  LOD 1F        immediate: the value 0x1F
  ADD [1F]      direct:    the value stored at address 0x1F
  ADD [[1F]]    indirect:  the value stored at the address stored at 0x1F
  ```

  A line reading exactly `DATA` ends the code. Every following line is an `ADDR VALUE`
  pair initializing data memory. No line may begin with whitespace, and blank lines are
  only tolerated at the very end of the file.

  The assembler never stops at the first problem. Every stage runs over the whole text
  and adds what it finds to one `Diagnostics` report, so a single pass surfaces every
  defect. A program is produced only if the report is empty.
*/

use std::fs;
use std::path::Path;
use std::str::FromStr;

use nom::{
  bytes::complete::tag,
  character::complete::{char as one_char, hex_digit1},
  combinator::{all_consuming, map_res, opt, recognize},
  sequence::{delimited, pair},
  IResult
};
use tracing::{debug, info};

use super::{DataEntry, Descriptor, Instruction, Level, Opcode, Program, Word};
use crate::error::Diagnostics;

/// A source line together with its 1-based line number.
type NumberedLine<'a> = (usize, &'a str);

// region Operand parsers

fn source_hex(input: &str) -> IResult<&str, Word> {
  map_res(
    recognize(pair(opt(one_char('-')), hex_digit1)),
    |text: &str| Word::from_str_radix(text, 16)
  )(input)
}

fn address_p(input: &str) -> IResult<&str, usize> {
  all_consuming(map_res(hex_digit1, |text: &str| usize::from_str_radix(text, 16)))(input)
}

fn immediate_p(input: &str) -> IResult<&str, Word> {
  all_consuming(source_hex)(input)
}

fn direct_p(input: &str) -> IResult<&str, Word> {
  all_consuming(delimited(one_char('['), source_hex, one_char(']')))(input)
}

fn indirect_p(input: &str) -> IResult<&str, Word> {
  all_consuming(delimited(tag("[["), source_hex, tag("]]")))(input)
}

// endregion

/// Assembles source text, returning the program or every problem found in it.
pub fn assemble(source: &str) -> Result<Program, Diagnostics> {
  let mut diagnostics = Diagnostics::new();
  let lines: Vec<&str> = source.lines().collect();

  check_layout(&lines, &mut diagnostics);
  let (code_lines, data_lines) = split_sections(&lines, &mut diagnostics);
  let code = encode_code(&code_lines, &mut diagnostics);
  let data = encode_data(&data_lines, &mut diagnostics);

  if diagnostics.is_empty() {
    debug!("assembled {} instructions and {} data entries", code.len(), data.len());
    Ok(Program { code, data })
  } else {
    debug!("assembly failed with {} diagnostics", diagnostics.len());
    Err(diagnostics)
  }
}

/**
  Assembles the file at `input` and writes the artifact to `output`. Nothing is written
  unless assembly succeeds. Failure to read or write is reported against line 0.
*/
pub fn assemble_file(input: &Path, output: &Path) -> Result<Program, Diagnostics> {
  let source = match fs::read_to_string(input) {
    Ok(source) => source,
    Err(e) => {
      debug!("cannot read {}: {}", input.display(), e);
      let mut diagnostics = Diagnostics::new();
      diagnostics.report(0, "Error: Unable to open the input file");
      return Err(diagnostics);
    }
  };

  let program = assemble(&source)?;

  if let Err(e) = fs::write(output, program.to_artifact()) {
    debug!("cannot write {}: {}", output.display(), e);
    let mut diagnostics = Diagnostics::new();
    diagnostics.report(0, "Error: Unable to write the assembled program to the output file");
    return Err(diagnostics);
  }

  info!("assembled {} into {}", input.display(), output.display());
  Ok(program)
}

/**
  Renders a program as assembly source. Source rendered from a program that `assemble`
  produced assembles back to the same program. A program decoded from a hand-made
  artifact may not: an argument on an argument-less opcode is dropped, and a level the
  opcode does not allow renders as source the assembler rejects.
*/
pub fn disassemble(program: &Program) -> String {
  let mut buffer = String::new();
  for instruction in &program.code {
    buffer.push_str(&format!("{}\n", instruction));
  }
  if !program.data.is_empty() {
    buffer.push_str("DATA\n");
    for entry in &program.data {
      buffer.push_str(&format!("{}\n", super::binary::encode_data(entry)));
    }
  }
  buffer
}

fn is_blank(line: &str) -> bool {
  line.trim().is_empty()
}

/// Flags lines that begin with whitespace and blank lines that are followed by content.
fn check_layout(lines: &[&str], diagnostics: &mut Diagnostics) {
  for (idx, line) in lines.iter().enumerate() {
    if !is_blank(line) && line.starts_with(char::is_whitespace) {
      diagnostics.report(idx + 1, format!("Error on line {}: starts with white space", idx + 1));
    }
  }

  // A run of blank lines is reported once, at its first line, and only if something
  // other than blank lines comes after it.
  let mut blank_run: Option<usize> = None;
  for (idx, line) in lines.iter().enumerate() {
    match (is_blank(line), blank_run) {
      (true, None)         => blank_run = Some(idx + 1),
      (false, Some(first)) => {
        diagnostics.report(first, format!("Error on line {}: illegal blank line", first));
        blank_run = None;
      }
      _                    => {}
    }
  }
}

/// Splits the source at the first line reading exactly `DATA`. Blank lines are dropped.
fn split_sections<'a>(lines: &[&'a str], diagnostics: &mut Diagnostics)
  -> (Vec<NumberedLine<'a>>, Vec<NumberedLine<'a>>)
{
  let mut code    = Vec::new();
  let mut data    = Vec::new();
  let mut in_data = false;

  for (idx, &line) in lines.iter().enumerate() {
    let number = idx + 1;
    let text   = line.trim();

    if text.is_empty() {
      continue;
    }

    if in_data {
      data.push((number, text));
    } else if text == "DATA" {
      in_data = true;
    } else if text.eq_ignore_ascii_case("DATA") {
      diagnostics.report(number, format!("Error on line {}: DATA is incorrectly labeled", number));
    } else {
      code.push((number, text));
    }
  }

  (code, data)
}

fn encode_code(lines: &[NumberedLine], diagnostics: &mut Diagnostics) -> Vec<Instruction> {
  let mut code = Vec::with_capacity(lines.len());
  for &(number, text) in lines {
    match encode_line(text) {
      Ok(instruction) => code.push(instruction),
      Err(message)    => diagnostics.report(number, format!("Error on line {}: {}", number, message))
    }
  }
  code
}

/// Encodes one trimmed, non-blank code line.
fn encode_line(text: &str) -> Result<Instruction, String> {
  let parts: Vec<&str> = text.split_whitespace().collect();
  let mnemonic = parts[0];

  let descriptor = match Opcode::from_str(mnemonic) {
    Ok(opcode) => opcode.descriptor(),
    Err(_) if Opcode::from_str(&mnemonic.to_uppercase()).is_ok() => {
      return Err("mnemonics must be in uppercase".to_string());
    }
    Err(_) => return Err(format!("illegal mnemonic {}", mnemonic))
  };

  match (descriptor.takes_argument(), parts.len()) {
    (false, 1) => Ok(Instruction::nullary(descriptor.opcode)),
    (false, _) => Err(format!("{} does not take arguments", mnemonic)),
    (true,  1) => Err(format!("{} requires an argument", mnemonic)),
    (true,  2) => {
      let (argument, level) = encode_operand(&descriptor, parts[1])?;
      Ok(Instruction::new(descriptor.opcode, argument, level))
    }
    (true,  _) => Err(format!("{} has too many arguments", mnemonic)),
  }
}

/// Determines the addressing mode from the operand's brackets and parses its payload.
fn encode_operand(descriptor: &Descriptor, operand: &str) -> Result<(Word, Level), String> {
  let mnemonic = descriptor.mnemonic();

  if operand.starts_with("[[") {
    if !descriptor.allows_indirect() {
      return Err(format!("{} does not allow indirect addressing", mnemonic));
    }
    indirect_p(operand)
      .map(|(_, argument)| (argument, 2))
      .map_err(|_| "indirect argument is not a hex number".to_string())
  } else if operand.starts_with('[') {
    direct_p(operand)
      .map(|(_, argument)| (argument, 1))
      .map_err(|_| "direct argument is not a hex number".to_string())
  } else {
    if !descriptor.allows_immediate {
      return Err(format!("{} does not allow immediate addressing", mnemonic));
    }
    immediate_p(operand)
      .map(|(_, argument)| (argument, 0))
      .map_err(|_| "immediate argument is not a hex number".to_string())
  }
}

fn encode_data(lines: &[NumberedLine], diagnostics: &mut Diagnostics) -> Vec<DataEntry> {
  let mut data = Vec::with_capacity(lines.len());
  for &(number, text) in lines {
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() != 2 {
      diagnostics.report(number, format!("Error on line {}: this is not an address/value pair", number));
      continue;
    }

    let address = address_p(parts[0]).map(|(_, address)| address);
    let value   = immediate_p(parts[1]).map(|(_, value)| value);
    match (address, value) {
      (Ok(address), Ok(value)) => data.push(DataEntry { address, value }),
      (Err(_), _) => {
        diagnostics.report(number, format!("Error on line {}: the address is not a hex number", number));
      }
      (_, Err(_)) => {
        diagnostics.report(number, format!("Error on line {}: the value is not a hex number", number));
      }
    }
  }
  data
}


#[cfg(test)]
mod tests {
  use super::*;

  fn expect_error(source: &str, line: usize, fragment: &str) -> Diagnostics {
    let diagnostics = assemble(source).unwrap_err();
    let message = diagnostics.get(line)
      .unwrap_or_else(|| panic!("no diagnostic on line {}: {}", line, diagnostics));
    assert!(
      message.contains(fragment),
      "line {}: `{}` does not mention `{}`", line, message, fragment
    );
    diagnostics
  }

  #[test]
  fn addressing_modes(){
    let program = assemble("LOD 1F\nADD [1f]\nSUB [[2]]\nSTO [[3]]\nDIV -2\nHALT\n").unwrap();
    assert_eq!(
      program.code,
      vec![
        Instruction::new(Opcode::Lod, 0x1F, 0),
        Instruction::new(Opcode::Add, 0x1F, 1),
        Instruction::new(Opcode::Sub, 2, 2),
        Instruction::new(Opcode::Sto, 3, 2),
        Instruction::new(Opcode::Div, -2, 0),
        Instruction::nullary(Opcode::Halt),
      ]
    );
    assert!(program.data.is_empty());
  }

  #[test]
  fn data_section(){
    let program = assemble("LOD [10]\nHALT\nDATA\n10 5\n11 -FF\n").unwrap();
    assert_eq!(program.code.len(), 2);
    assert_eq!(
      program.data,
      vec![DataEntry { address: 0x10, value: 5 }, DataEntry { address: 0x11, value: -0xFF }]
    );
  }

  #[test]
  fn trailing_blank_lines_are_allowed(){
    assert!(assemble("NOP\nHALT\n\n\n").is_ok());
  }

  #[test]
  fn leading_whitespace(){
    let diagnostics = expect_error("NOP\n  LOD 1\n\tHALT\n", 2, "white space");
    assert!(diagnostics.contains(3));
    assert_eq!(diagnostics.len(), 2);
  }

  #[test]
  fn blank_run_flagged_once(){
    let diagnostics = expect_error("NOP\n\n\n\nHALT\n", 2, "illegal blank line");
    assert_eq!(diagnostics.len(), 1);
  }

  #[test]
  fn blank_line_before_data(){
    expect_error("HALT\n\nDATA\n0 1\n", 2, "illegal blank line");
  }

  #[test]
  fn mislabeled_data(){
    let diagnostics = expect_error("LOD 1\ndata\n0 1\n", 2, "incorrectly labeled");
    // The split does not happen, so `0 1` is read as a code line.
    expect_error("LOD 1\ndata\n0 1\n", 3, "illegal mnemonic");
    assert_eq!(diagnostics.len(), 2);
  }

  #[test]
  fn mnemonic_errors(){
    expect_error("lod 1\n", 1, "uppercase");
    expect_error("Halt\n", 1, "uppercase");
    expect_error("PUSH 1\n", 1, "illegal mnemonic");
  }

  #[test]
  fn argument_counts(){
    expect_error("HALT 1\n", 1, "does not take arguments");
    expect_error("LOD\n", 1, "requires an argument");
    expect_error("LOD 1 2\n", 1, "too many arguments");
  }

  #[test]
  fn disallowed_modes(){
    expect_error("STO 5\n", 1, "immediate");
    expect_error("CMPZ 5\n", 1, "immediate");
    expect_error("JUMP [[5]]\n", 1, "indirect");
    expect_error("AND [[5]]\n", 1, "indirect");
    assert!(assemble("CMPZ [5]\nROT 5\nROT [5]\n").is_ok());
  }

  #[test]
  fn bad_hex(){
    expect_error("LOD 1G\n", 1, "immediate argument");
    expect_error("LOD [XY]\n", 1, "direct argument");
    expect_error("LOD [[12]\n", 1, "indirect argument");
    expect_error("LOD [12\n", 1, "direct argument");
  }

  #[test]
  fn data_errors_use_source_line_numbers(){
    let source = "LOD 1\nHALT\nDATA\n10 1\n10\nZZ 1\n11 QQ\n";
    let diagnostics = assemble(source).unwrap_err();
    assert_eq!(diagnostics.lines().collect::<Vec<_>>(), vec![5, 6, 7]);
    assert!(diagnostics.get(5).unwrap().contains("address/value pair"));
    assert!(diagnostics.get(6).unwrap().contains("address"));
    assert!(diagnostics.get(7).unwrap().contains("value"));
  }

  #[test]
  fn signed_data_addresses_are_rejected(){
    expect_error("HALT\nDATA\n+10 5\n", 3, "the address is not a hex number");
    expect_error("HALT\nDATA\n-10 5\n", 3, "the address is not a hex number");
  }

  #[test]
  fn every_error_is_collected(){
    let source = "lod 1\nFOO\n LOD 2\nHALT 3\nDATA\n1 2 3\n";
    let diagnostics = assemble(source).unwrap_err();
    assert_eq!(diagnostics.lines().collect::<Vec<_>>(), vec![1, 2, 3, 4, 6]);
  }

  #[test]
  fn disassembly_reassembles(){
    let source = "LOD [[3]]\nMUL -2\nSTO [20]\nCMPL [20]\nJMPZ 0\nNOT\nHALT\nDATA\n3 4\n4 -7\n";
    let program = assemble(source).unwrap();
    let text = disassemble(&program);
    assert_eq!(text, source);
    assert_eq!(assemble(&text).unwrap().to_artifact(), program.to_artifact());
  }

  #[test]
  fn disassembly_of_hand_made_artifacts(){
    // An argument on HALT has no source form and is dropped.
    let program = Program::from_artifact("F5 0\n-1\n").unwrap();
    assert_eq!(disassemble(&program), "HALT\n");
    assert_eq!(assemble("HALT\n").unwrap().to_artifact(), "F0 0\n-1\n");

    // CMPZ at level 0 renders as an immediate operand, which CMPZ does not allow.
    let program = Program::from_artifact("90 0\n-1\n").unwrap();
    assert_eq!(disassemble(&program), "CMPZ 0\n");
    expect_error(&disassemble(&program), 1, "immediate");
  }

  #[test]
  fn unreadable_input(){
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.pasm");
    let diagnostics = assemble_file(&missing, &dir.path().join("out.pexe")).unwrap_err();
    assert_eq!(diagnostics.lines().collect::<Vec<_>>(), vec![0]);
    assert!(!dir.path().join("out.pexe").exists());
  }

  #[test]
  fn failed_assembly_writes_nothing(){
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.pasm");
    let output = dir.path().join("bad.pexe");
    fs::write(&input, "LOD\n").unwrap();
    assert!(assemble_file(&input, &output).is_err());
    assert!(!output.exists());
  }

  #[test]
  fn writes_artifact(){
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ok.pasm");
    let output = dir.path().join("ok.pexe");
    fs::write(&input, "LOD 1\nHALT\nDATA\n0 2\n").unwrap();
    assemble_file(&input, &output).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), "11 0\nF0 0\n-1\n0 2\n");
  }
}
