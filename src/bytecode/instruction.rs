/*!
  The opcode table and the unencoded instruction triple.

  The table is plain data. The assembler reads it to decide which addressing modes a
  mnemonic accepts, and the machine reads it to decide which indirection levels an
  opcode may execute at.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use super::{Level, Opcode, Word};
use super::binary::hex;

/// The shape of the argument an instruction takes in assembly source.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ArgumentClass {
  /// No argument at all.
  None,
  /// An immediate or direct argument, never indirect.
  ArgOnly,
  /// An argument that may also be written in the indirect `[[HH]]` form.
  ArgWithIndirection,
}

/// Static description of one instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Descriptor {
  pub opcode           : Opcode,
  pub arguments        : ArgumentClass,
  /// Whether the bare `HH` form may be written in source.
  pub allows_immediate : bool,
  /// Smallest indirection level the machine will execute.
  pub min_level        : Level,
  /// Largest indirection level the machine will execute.
  pub max_level        : Level,
}

impl Descriptor {
  pub fn mnemonic(&self) -> &'static str {
    self.opcode.mnemonic()
  }

  pub fn takes_argument(&self) -> bool {
    self.arguments != ArgumentClass::None
  }

  pub fn allows_indirect(&self) -> bool {
    self.arguments == ArgumentClass::ArgWithIndirection
  }

  pub fn allows_level(&self, level: Level) -> bool {
    self.min_level <= level && level <= self.max_level
  }
}

impl Opcode {
  pub fn descriptor(&self) -> Descriptor {
    use ArgumentClass::*;

    // (class, immediate in source, level bounds at execution)
    let (arguments, allows_immediate, min_level, max_level) =
      match self {
        Opcode::Nop  |
        Opcode::Not  |
        Opcode::Halt => (None,               false, 0, 0),

        Opcode::Lod  |
        Opcode::Add  |
        Opcode::Sub  |
        Opcode::Mul  |
        Opcode::Div  => (ArgWithIndirection, true,  0, 2),

        Opcode::Sto  => (ArgWithIndirection, false, 1, 2),

        Opcode::And  |
        Opcode::Jump |
        Opcode::Jmpz => (ArgOnly,            true,  0, 1),

        Opcode::Cmpz |
        Opcode::Cmpl => (ArgOnly,            false, 1, 1),

        Opcode::Rot  => (ArgOnly,            true,  1, 1),
      };

    Descriptor {
      opcode: *self,
      arguments,
      allows_immediate,
      min_level,
      max_level,
    }
  }
}

/// Looks up an instruction by its exact, upper-case mnemonic.
pub fn lookup_by_mnemonic(name: &str) -> Option<Descriptor> {
  Opcode::from_str(name).ok().map(|opcode| opcode.descriptor())
}

/// Looks up an instruction by its numeric opcode.
pub fn lookup_by_opcode(code: u8) -> Option<Descriptor> {
  Opcode::try_from(code).ok().map(|opcode| opcode.descriptor())
}


/// An encoded instruction: what the assembler emits and what the machine fetches.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub opcode   : Opcode,
  pub argument : Word,
  pub level    : Level,
}

impl Instruction {
  pub fn new(opcode: Opcode, argument: Word, level: Level) -> Instruction {
    Instruction { opcode, argument, level }
  }

  /// An instruction without an argument.
  pub fn nullary(opcode: Opcode) -> Instruction {
    Instruction { opcode, argument: 0, level: 0 }
  }
}

/// Renders the instruction as a line of assembly source.
impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if !self.opcode.descriptor().takes_argument() {
      return write!(f, "{}", self.opcode);
    }
    match self.level {
      0 => write!(f, "{} {}",     self.opcode, hex(self.argument)),
      1 => write!(f, "{} [{}]",   self.opcode, hex(self.argument)),
      _ => write!(f, "{} [[{}]]", self.opcode, hex(self.argument)),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use strum::IntoEnumIterator;

  #[test]
  fn lookup_agrees_both_ways(){
    for opcode in Opcode::iter() {
      let by_name = lookup_by_mnemonic(opcode.mnemonic()).unwrap();
      let by_code = lookup_by_opcode(opcode.code()).unwrap();
      assert_eq!(by_name, by_code);
      assert_eq!(by_name.opcode, opcode);
    }
    assert_eq!(lookup_by_mnemonic("lod"), None);
    assert_eq!(lookup_by_mnemonic("PUSH"), None);
    assert_eq!(lookup_by_opcode(0xE), None);
    assert_eq!(lookup_by_opcode(0x14), None);
  }

  #[test]
  fn level_bounds(){
    let sto = Opcode::Sto.descriptor();
    assert!(!sto.allows_level(0));
    assert!(sto.allows_level(1));
    assert!(sto.allows_level(2));
    assert!(!sto.allows_immediate);

    let and = Opcode::And.descriptor();
    assert!(and.allows_level(0) && and.allows_level(1) && !and.allows_level(2));

    for opcode in &[Opcode::Cmpz, Opcode::Cmpl, Opcode::Rot] {
      let descriptor = opcode.descriptor();
      assert_eq!((descriptor.min_level, descriptor.max_level), (1, 1));
    }
    for opcode in &[Opcode::Nop, Opcode::Not, Opcode::Halt] {
      let descriptor = opcode.descriptor();
      assert!(!descriptor.takes_argument());
      assert_eq!((descriptor.min_level, descriptor.max_level), (0, 0));
    }
  }

  #[test]
  fn display_as_source(){
    assert_eq!(Instruction::nullary(Opcode::Halt).to_string(), "HALT");
    assert_eq!(Instruction::new(Opcode::Lod, 0x1F, 0).to_string(), "LOD 1F");
    assert_eq!(Instruction::new(Opcode::Sto, 0x20, 1).to_string(), "STO [20]");
    assert_eq!(Instruction::new(Opcode::Add, 3, 2).to_string(), "ADD [[3]]");
    assert_eq!(Instruction::new(Opcode::Sub, -10, 0).to_string(), "SUB -A");
  }
}
