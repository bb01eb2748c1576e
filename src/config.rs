//! Paths and sizes for one assemble-and-run session.

use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "input/input.txt";
pub const DEFAULT_OUTPUT: &str = "output.bin";
pub const DEFAULT_LOG: &str = "log.json";
pub const DEFAULT_MEMORY_SIZE: usize = 32;
pub const DEFAULT_AUX_MEMORY_SIZE: usize = 32;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
  /// Mnemonic program text.
  pub input: PathBuf,
  /// Where the encoded program is written, and read back from for execution.
  pub output: PathBuf,
  /// Where the trace document is written.
  pub log: PathBuf,
  /// Length of primary memory.
  pub memory_size: usize,
  /// Length of auxiliary memory.
  pub aux_memory_size: usize,
}

impl Default for Config {
  fn default() -> Config {
    Config {
      input: PathBuf::from(DEFAULT_INPUT),
      output: PathBuf::from(DEFAULT_OUTPUT),
      log: PathBuf::from(DEFAULT_LOG),
      memory_size: DEFAULT_MEMORY_SIZE,
      aux_memory_size: DEFAULT_AUX_MEMORY_SIZE,
    }
  }
}
