/*!
  Instruction semantics.

  `execute` is a pure function of the instruction and the CPU state it is handed: it owns
  nothing and captures nothing. Indirection is unwrapped inside each opcode's semantics,
  not in a generic pre-pass, because where the unwrapping stops depends on the opcode.
  Most opcodes want a value and unwrap down to level 0. `STO`, `CMPZ`, `CMPL`, and `ROT`
  want an address and stop at level 1.
*/

use crate::bytecode::{Level, Opcode, Word};
use crate::error::Fault;
use crate::memory::Memory;
use crate::registers::Registers;

/// What the machine should do after an instruction completes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flow {
  Continue,
  Halt,
}

/// Replaces `argument` by the memory word it addresses until `level` reaches `base`.
fn resolve(memory: &Memory, mut argument: Word, mut level: Level, base: Level) -> Result<Word, Fault> {
  while level > base {
    argument = memory.get(argument)?;
    level   -= 1;
  }
  Ok(argument)
}

fn jump(registers: &mut Registers, target: Word) -> Result<(), Fault> {
  registers.program_counter =
    usize::try_from(target).map_err(|_| Fault::ProgramCounterOutOfBounds(target))?;
  Ok(())
}

fn truth(condition: bool) -> Word {
  match condition {
    true  => 1,
    false => 0
  }
}

/**
  Executes one instruction against `registers` and `memory`.

  The indirection level is checked against the opcode's bounds before anything else
  happens. On a fault, whatever the instruction already wrote stays written; the caller
  is expected to halt.
*/
pub fn execute(
  opcode    : Opcode,
  argument  : Word,
  level     : Level,
  registers : &mut Registers,
  memory    : &mut Memory
) -> Result<Flow, Fault> {
  let descriptor = opcode.descriptor();
  if !descriptor.allows_level(level) {
    return Err(Fault::InvalidIndirection { opcode, level });
  }
  // Value for opcodes that unwrap to 0, address for those that stop at 1.
  let operand = resolve(memory, argument, level, descriptor.min_level)?;

  match opcode {

    Opcode::Nop  => registers.advance(),

    Opcode::Lod  => {
      registers.accumulator = operand;
      registers.advance();
    }

    Opcode::Sto  => {
      memory.set(operand, registers.accumulator)?;
      registers.advance();
    }

    Opcode::Add  => {
      registers.accumulator = registers.accumulator.wrapping_add(operand);
      registers.advance();
    }

    Opcode::Sub  => {
      registers.accumulator = registers.accumulator.wrapping_sub(operand);
      registers.advance();
    }

    Opcode::Mul  => {
      registers.accumulator = registers.accumulator.wrapping_mul(operand);
      registers.advance();
    }

    Opcode::Div  => {
      if operand == 0 {
        return Err(Fault::DivideByZero);
      }
      registers.accumulator = registers.accumulator.wrapping_div(operand);
      registers.advance();
    }

    Opcode::And  => {
      registers.accumulator = truth(operand != 0 && registers.accumulator != 0);
      registers.advance();
    }

    Opcode::Not  => {
      registers.accumulator = truth(registers.accumulator == 0);
      registers.advance();
    }

    Opcode::Cmpz => {
      registers.accumulator = truth(memory.get(operand)? == 0);
      registers.advance();
    }

    Opcode::Cmpl => {
      registers.accumulator = truth(memory.get(operand)? < 0);
      registers.advance();
    }

    Opcode::Jump => jump(registers, operand)?,

    Opcode::Jmpz => {
      match registers.accumulator == 0 {
        true  => jump(registers, operand)?,
        false => registers.advance()
      }
    }

    Opcode::Rot  => {
      rotate(memory, operand)?;
      registers.advance();
    }

    Opcode::Halt => return Ok(Flow::Halt),
  }

  Ok(Flow::Continue)
}

/**
  Rotates a block of memory described by the three-word control block at `block`:
  `M[block]` is the first address of the range, `M[block + 1]` its length, and
  `M[block + 2]` how far to move it. A positive move rotates toward higher addresses
  (the last word wraps to the front), a negative move toward lower addresses.

  The range must lie inside memory and must not overlap the control block.
*/
fn rotate(memory: &mut Memory, block: Word) -> Result<(), Fault> {
  let start  = memory.get(block)?;
  let length = memory.get(block.saturating_add(1))?;
  let shift  = memory.get(block.saturating_add(2))?;
  let end    = start.saturating_add(length).saturating_sub(1);

  let invalid = Fault::InvalidRotation { block, start, length };
  if start < 0 || length < 0 || end >= memory.size() as Word {
    return Err(invalid);
  }
  if start <= block + 2 && end >= block {
    return Err(invalid);
  }
  if length == 0 || shift % length == 0 {
    return Ok(());
  }

  let mut window: Vec<Word> = memory.cells()[start as usize..=end as usize].to_vec();
  window.rotate_right(shift.rem_euclid(length) as usize);
  for (offset, value) in window.into_iter().enumerate() {
    memory.set(start + offset as Word, value)?;
  }
  Ok(())
}
