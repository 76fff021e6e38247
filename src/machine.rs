//! The Pippin machine: registers, data memory, and a loaded program, stepped one
//! instruction at a time by a host.

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use tracing::{debug, info, warn};

use crate::bytecode::{Instruction, Program, Word};
use crate::error::Fault;
use crate::execute::{execute, Flow};
use crate::memory::{Memory, DATA_SIZE};
use crate::registers::Registers;

/// What executing `HALT` does to the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HaltMode {
  /// Clear the running flag and return to the caller. For interactive hosts.
  Signal,
  /// Terminate the process with status 0. For batch hosts.
  Exit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MachineConfig {
  pub data_size : usize,
  pub halt_mode : HaltMode,
}

impl Default for MachineConfig {
  fn default() -> MachineConfig {
    MachineConfig {
      data_size : DATA_SIZE,
      halt_mode : HaltMode::Signal,
    }
  }
}

/// Sent to subscribers once for every memory write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemoryEvent {
  pub address : usize,
  pub value   : Word,
}

type Observer = Box<dyn FnMut(MemoryEvent)>;

pub struct Machine {
  registers : Registers,
  memory    : Memory,
  code      : Vec<Instruction>,
  running   : bool,
  halt_mode : HaltMode,
  observers : Vec<Observer>,
}

impl Machine {

  // region Display methods

  fn make_register_table<T>(
      name      : &str,
      cells     : &[(usize, T)],
      highlight : Option<usize>
    ) -> Table
    where T: Display
  {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (address, cell) in cells {
      match Some(*address) == highlight {

        true  => {
          table.add_row(
            row![r->format!("* --> {}[{:X}] =", name, address), format!("{}", cell)]
          );
        }

        false => {
          table.add_row(
            row![r->format!("{}[{:X}] =", name, address), format!("{}", cell)]
          );
        }

      } // end match on highlight
    } // end for
    table
  }

  // endregion

  pub fn new(config: MachineConfig) -> Machine {
    Machine {
      registers : Registers::new(),
      memory    : Memory::with_journal(config.data_size),
      code      : vec![],
      running   : false,
      halt_mode : config.halt_mode,
      observers : vec![],
    }
  }

  /// Zeroes the registers and memory, unloads the code, and stops the machine.
  pub fn reset(&mut self) {
    self.registers.reset();
    self.memory.clear();
    self.code.clear();
    self.running = false;
  }

  /**
    Resets the machine, installs `program`, initializes memory from its data segment, and
    starts the machine. A data entry outside memory leaves the machine stopped.
  */
  pub fn load_program(&mut self, program: &Program) -> Result<(), Fault> {
    self.reset();
    self.code = program.code.clone();
    for entry in &program.data {
      self.memory.set(entry.address as Word, entry.value)?;
    }
    self.notify();
    self.running = true;
    info!("loaded {} instructions and {} data entries", self.code.len(), program.data.len());
    Ok(())
  }

  /**
    Performs exactly one fetch-decode-execute cycle.

    A fault stops the machine and is returned. Whatever the faulting instruction wrote
    before failing stays in memory.
  */
  pub fn step(&mut self) -> Result<(), Fault> {
    if !self.running {
      return Err(Fault::NotRunning);
    }

    let result = self.cycle();
    self.notify();

    #[cfg(feature = "trace_computation")] tracing::trace!("\n{}", self);

    match result {
      Ok(Flow::Continue) => Ok(()),
      Ok(Flow::Halt)     => {
        self.halt();
        Ok(())
      }
      Err(fault)         => {
        warn!("fault at {}: {}", self.registers.program_counter, fault);
        self.running = false;
        Err(fault)
      }
    }
  }

  fn cycle(&mut self) -> Result<Flow, Fault> {
    let pc = self.registers.program_counter;
    let instruction = *self.code.get(pc).ok_or(Fault::ProgramCounterOutOfBounds(pc as Word))?;
    debug!("{:>4}: {}", pc, instruction);
    execute(
      instruction.opcode,
      instruction.argument,
      instruction.level,
      &mut self.registers,
      &mut self.memory
    )
  }

  /// Steps until the machine stops or `max_steps` instructions have run. Returns the
  /// number of instructions executed.
  pub fn run(&mut self, max_steps: Option<usize>) -> Result<usize, Fault> {
    let mut steps = 0;
    while self.running && max_steps.map_or(true, |max| steps < max) {
      self.step()?;
      steps += 1;
    }
    Ok(steps)
  }

  fn halt(&mut self) {
    info!("halted at {}", self.registers.program_counter);
    self.running = false;
    if self.halt_mode == HaltMode::Exit {
      std::process::exit(0);
    }
  }

  /// Forwards the writes of the last step or load to every subscriber.
  fn notify(&mut self) {
    let writes = self.memory.take_writes();
    if self.observers.is_empty() {
      return;
    }
    for (address, value) in writes {
      let event = MemoryEvent { address, value };
      for observer in self.observers.iter_mut() {
        observer(event);
      }
    }
  }

  /// Registers `observer` to be called after every memory write.
  pub fn subscribe<F>(&mut self, observer: F)
    where F: FnMut(MemoryEvent) + 'static
  {
    self.observers.push(Box::new(observer));
  }

  // region Accessors

  pub fn read_memory(&self, address: Word) -> Result<Word, Fault> {
    self.memory.get(address)
  }

  pub fn read_accumulator(&self) -> Word {
    self.registers.accumulator
  }

  pub fn read_program_counter(&self) -> usize {
    self.registers.program_counter
  }

  pub fn is_running(&self) -> bool {
    self.running
  }

  /// Pauses or resumes a loaded machine.
  pub fn set_running(&mut self, running: bool) {
    self.running = running;
  }

  pub fn last_changed_address(&self) -> Option<usize> {
    self.memory.last_changed_address()
  }

  pub fn code(&self) -> &[Instruction] {
    &self.code
  }

  pub fn data_size(&self) -> usize {
    self.memory.size()
  }

  // endregion
}

impl Default for Machine {
  fn default() -> Machine {
    Machine::new(MachineConfig::default())
  }
}


lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// Shows the code with the program counter marked and every non-zero memory word with
/// the last write marked.
impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let code: Vec<(usize, &Instruction)> = self.code.iter().enumerate().collect();
    let data: Vec<(usize, Word)> =
      self.memory.cells()
          .iter()
          .enumerate()
          .filter(|(_, value)| **value != 0)
          .map(|(address, value)| (address, *value))
          .collect();

    let code_table = Machine::make_register_table("C", &code, Some(self.registers.program_counter));
    let data_table = Machine::make_register_table("M", &data, self.memory.last_changed_address());

    let mut combined_table = table!([code_table, data_table]);
    combined_table.set_titles(row![ub->"Code", ub->"Memory"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let status = match self.running {
      true  => "Running",
      false => "Halted"
    };

    write!(
      f,
      "{}\tAccumulator: {}\tProgram Counter: {}\n{}",
      status, self.registers.accumulator, self.registers.program_counter, combined_table
    )
  }
}
