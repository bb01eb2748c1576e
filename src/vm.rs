//! The execution engine. A `Machine` owns the two memory banks and the trace log, and
//! executes decoded instructions one at a time, in order.

use std::fmt::{Display, Formatter};

use prettytable::{row, table};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::address::{Address, AddressType, Bank, Word};
use crate::bytecode::{CodecError, Instruction};
use crate::config::Config;
use crate::memory::{MemoryBank, MemoryError, TABLE_DISPLAY_FORMAT};
use crate::trace::{TraceError, TraceEvent, TraceLog};

#[derive(Error, Debug)]
pub enum ExecutionError {
  #[error("{instruction} failed: {source}")]
  OutOfRange {
    instruction: Instruction,
    source: MemoryError,
  },
  #[error(transparent)]
  Decode(#[from] CodecError),
  #[error(transparent)]
  Trace(#[from] TraceError),
  /// The run aborted and the trace log holding its terminal event could not be written.
  #[error("{cause} (trace log not written: {flush})")]
  Unflushed {
    #[source]
    cause: Box<ExecutionError>,
    flush: TraceError,
  },
}

pub struct Machine {
  // Memory Stores
  primary: MemoryBank,   // Execution-visible memory
  auxiliary: MemoryBank, // Scratch and constant pool

  trace: TraceLog,

  // The most recently written cell, highlighted when the machine is displayed.
  last_write: Option<Address>,
}

impl Machine {
  pub fn new(config: &Config) -> Machine {
    Machine::with_banks(
      MemoryBank::new(Bank::Primary, config.memory_size),
      MemoryBank::new(Bank::Auxiliary, config.aux_memory_size),
      TraceLog::new(&config.log),
    )
  }

  pub fn with_banks(primary: MemoryBank, auxiliary: MemoryBank, trace: TraceLog) -> Machine {
    Machine { primary, auxiliary, trace, last_write: None }
  }

  pub fn primary(&self) -> &MemoryBank {
    &self.primary
  }

  pub fn auxiliary(&self) -> &MemoryBank {
    &self.auxiliary
  }

  pub fn trace(&self) -> &TraceLog {
    &self.trace
  }

  pub fn into_trace(self) -> TraceLog {
    self.trace
  }

  // region Execution

  /**
    Executes every instruction of `instructions` in order, pulling the next one only after
    the previous one has completed. The trace is flushed once when the sequence runs out.
    On the first failure, whether a decode error or an out of range access, a terminal
    error event is recorded, the trace is flushed, and the error is returned.
  */
  pub fn run<I>(&mut self, instructions: I) -> Result<(), ExecutionError>
    where I: IntoIterator<Item = Result<Instruction, CodecError>>
  {
    info!(
      primary = self.primary.len(),
      auxiliary = self.auxiliary.len(),
      log = %self.trace.path().display(),
      "starting run"
    );

    let mut executed = 0usize;
    for decoded in instructions {
      match decoded {
        Ok(instruction) => self.execute(&instruction)?,

        Err(e) => {
          let event = match e.opcode_byte() {
            Some(byte) => TraceEvent::for_opcode(byte),
            None => TraceEvent::default(),
          };
          return Err(self.abort(event.with_error(&e), e.into()));
        }
      }
      executed += 1;
    }

    self.trace.flush()?;
    info!(instructions = executed, "run finished");
    Ok(())
  }

  /// Executes a single instruction and records its trace event.
  pub fn execute(&mut self, instruction: &Instruction) -> Result<(), ExecutionError> {
    match self.step(instruction) {
      Ok(result) => {
        debug!(%instruction, ?result, "executed");
        let mut event = TraceEvent::for_instruction(instruction);
        if let Some(value) = result {
          event = event.with_field("result", value);
        }
        self.trace.record(event);

        #[cfg(feature = "trace_computation")] println!("{}\n{}", instruction, self);

        Ok(())
      }

      Err(source) => {
        let event = TraceEvent::for_instruction(instruction).with_error(&source);
        Err(self.abort(event, ExecutionError::OutOfRange { instruction: *instruction, source }))
      }
    }
  }

  /// Records the terminal event and flushes the trace. A flush failure is attached to
  /// `cause` rather than replacing it.
  fn abort(&mut self, event: TraceEvent, cause: ExecutionError) -> ExecutionError {
    error!(event = ?event, "aborting run");
    self.trace.record(event);
    match self.trace.flush() {
      Ok(()) => cause,
      Err(flush) => ExecutionError::Unflushed { cause: Box::new(cause), flush },
    }
  }

  /// Performs the instruction's effect, returning the value it moved, if any.
  fn step(&mut self, instruction: &Instruction) -> Result<Option<Word>, MemoryError> {
    match *instruction {

      Instruction::LoadConst { value, address } => {
        self.auxiliary.write(address, value)?;
        self.last_write = Some(Address::auxiliary(address));
        Ok(Some(value))
      }

      Instruction::ReadMem { read_address, write_address } => {
        let value = self.primary.read(read_address)?;
        self.auxiliary.write(write_address, value)?;
        self.last_write = Some(Address::auxiliary(write_address));
        Ok(Some(value))
      }

      Instruction::WriteMem { read_address, write_address } => {
        // The destination is checked before anything is read.
        self.primary.check_range(write_address, 1)?;
        let value = self.auxiliary.read(read_address)?;
        self.primary.write(write_address, value)?;
        self.last_write = Some(Address::primary(write_address));
        Ok(Some(value))
      }

      Instruction::BinAnd { base_b, count, dest, base_e } => {
        self.bin_op_and(base_b, count, dest, base_e)?;
        Ok(None)
      }

    }
  }

  /**
    Sets `primary[dest + i] = primary[base_b + i] & primary[base_e + i]` for `i` in
    `0..count`, in ascending order of `i`. All three ranges are checked before any cell is
    written, so a failing call leaves memory untouched. Overlapping ranges are allowed; a
    cell written at step `i` is visible to later steps.
  */
  pub fn bin_op_and(
    &mut self,
    base_b: AddressType,
    count: usize,
    dest: AddressType,
    base_e: AddressType
  ) -> Result<(), MemoryError> {
    self.primary.check_range(base_b, count)?;
    self.primary.check_range(base_e, count)?;
    self.primary.check_range(dest, count)?;

    for i in 0..count {
      let b = self.primary.read(base_b + i)?;
      let e = self.primary.read(base_e + i)?;
      self.primary.write(dest + i, b & e)?;
    }

    if count > 0 {
      self.last_write = Some(Address::primary(dest + count - 1));
    }
    Ok(())
  }

  // endregion
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let highlight = |bank: Bank| {
      self.last_write.filter(|a| a.bank == bank).map(|a| a.idx)
    };
    let primary_table = self.primary.to_table(highlight(Bank::Primary));
    let auxiliary_table = self.auxiliary.to_table(highlight(Bank::Auxiliary));

    let mut combined_table = table!([primary_table, auxiliary_table]);

    combined_table.set_titles(row![ub->"Primary Memory", ub->"Auxiliary Memory"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "{}", combined_table)
  }
}
