/*!
  Pippin is a teaching machine with one accumulator and one linear data memory. This
  crate contains its assembler and its execution engine.

  The two halves share only the instruction encoding in `bytecode`. The assembler runs
  once, offline, and produces a `Program` (or its text artifact). A `Machine` later
  loads that program and is stepped by a host until it halts.

  ```
  use pippin::{assemble, Machine};

  let program = assemble("LOD 6\nMUL 7\nSTO [0]\nHALT\n").unwrap();
  let mut machine = Machine::default();
  machine.load_program(&program).unwrap();
  machine.run(None).unwrap();
  assert_eq!(machine.read_memory(0), Ok(42));
  ```
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod error;
pub mod execute;
pub mod machine;
pub mod memory;
pub mod registers;

pub use bytecode::{assemble, assemble_file, disassemble, Instruction, Opcode, Program};
pub use error::{Diagnostics, Fault, LoadError};
pub use machine::{HaltMode, Machine, MachineConfig, MemoryEvent};
pub use memory::DATA_SIZE;
