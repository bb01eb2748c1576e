/*!
  A minimal two-bank virtual machine.

  A mnemonic program is assembled into a stream of fixed-layout, bit-packed records, which is
  then decoded lazily and executed against two independent memory banks while every step is
  recorded in a JSON trace log.
*/

pub mod address;
pub mod bytecode;
pub mod config;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod trace;
pub mod vm;

pub use address::{Address, AddressType, Bank, Word};
pub use bytecode::{Instruction, Opcode};
pub use config::Config;
pub use error::Error;
pub use memory::MemoryBank;
pub use trace::{TraceEvent, TraceLog};
pub use vm::Machine;
