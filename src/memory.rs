//! Fixed-size data memory shared by the data segment and every indirection lookup.

use tracing::trace;

use crate::bytecode::Word;
use crate::error::Fault;

/// Number of words of data memory a machine gets unless configured otherwise.
pub const DATA_SIZE: usize = 2048;

pub struct Memory {
  cells        : Vec<Word>,
  last_changed : Option<usize>,
  /// `(address, value)` for every write since the last drain, in write order. Only kept
  /// when the memory was built with `with_journal`.
  journal      : Option<Vec<(usize, Word)>>,
}

impl Memory {

  pub fn new(size: usize) -> Memory {
    Memory {
      cells        : vec![0; size],
      last_changed : None,
      journal      : None,
    }
  }

  /// Like `new`, but records every write until it is collected with `take_writes`.
  pub fn with_journal(size: usize) -> Memory {
    Memory {
      journal: Some(vec![]),
      ..Memory::new(size)
    }
  }

  pub fn size(&self) -> usize {
    self.cells.len()
  }

  /// Converts a word to an index, failing for negative or too-large addresses.
  fn index(&self, address: Word) -> Result<usize, Fault> {
    match usize::try_from(address) {
      Ok(idx) if idx < self.cells.len() => Ok(idx),
      _                                 => Err(Fault::AddressOutOfBounds(address))
    }
  }

  pub fn get(&self, address: Word) -> Result<Word, Fault> {
    Ok(self.cells[self.index(address)?])
  }

  pub fn set(&mut self, address: Word, value: Word) -> Result<(), Fault> {
    let idx = self.index(address)?;
    trace!("M[{:X}] <- {}", idx, value);
    self.cells[idx]   = value;
    self.last_changed = Some(idx);
    if let Some(journal) = self.journal.as_mut() {
      journal.push((idx, value));
    }
    Ok(())
  }

  /// Zero-fills every cell and forgets the write history.
  pub fn clear(&mut self) {
    self.cells.fill(0);
    self.last_changed = None;
    if let Some(journal) = self.journal.as_mut() {
      journal.clear();
    }
  }

  pub fn last_changed_address(&self) -> Option<usize> {
    self.last_changed
  }

  /// Removes and returns the writes recorded since the previous call. Always empty for
  /// memory built without a journal.
  pub fn take_writes(&mut self) -> Vec<(usize, Word)> {
    self.journal.as_mut().map(std::mem::take).unwrap_or_default()
  }

  pub fn cells(&self) -> &[Word] {
    &self.cells
  }
}

impl Default for Memory {
  fn default() -> Memory {
    Memory::new(DATA_SIZE)
  }
}
