/*!

  Pippin has a single accumulator and one linear data memory. Every instruction is a
  triple of an opcode, a signed argument, and an indirection level:

    Opcode:            4 bits
    Argument:          signed word
    Indirection level: 0 (immediate), 1 (direct), or 2 (indirect)

  The argument is either a literal value or an address into data memory. The indirection
  level says how many times the argument is looked up in memory before the instruction
  uses it. Which levels are legal depends on the opcode; the table in `instruction`
  describes them and is consulted both when assembling and when executing.

  The opcode is kept as an enum rather than a bare number so that the mnemonic, the
  numeric code, and the argument rules stay in one place. The numeric values are fixed:
  they are what appears in the binary artifact, so reordering the variants below changes
  the encoding.

*/

mod assembly;
mod binary;
mod instruction;

pub use assembly::{assemble, assemble_file, disassemble};
pub use binary::{DataEntry, Program, SENTINEL};
pub use instruction::{lookup_by_mnemonic, lookup_by_opcode, ArgumentClass, Descriptor, Instruction};

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The machine word. Arguments, data values, and the accumulator are all words.
pub type Word = i64;
/// How many memory lookups stand between an argument and its operand.
pub type Level = u8;

/// Opcodes of the virtual machine. Mnemonics are the upper-cased variant names.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,            Hash
)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum Opcode {
  Nop  = 0x0,
  Lod  = 0x1,
  Sto  = 0x2,
  Add  = 0x3,
  Sub  = 0x4,
  Mul  = 0x5,
  Div  = 0x6,
  And  = 0x7,
  Not  = 0x8,
  Cmpz = 0x9,
  Cmpl = 0xA,
  Jump = 0xB,
  Jmpz = 0xC,
  Rot  = 0xD,
  // 0xE is unassigned.
  Halt = 0xF,
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn mnemonic(&self) -> &'static str {
    self.into()
  }
}
