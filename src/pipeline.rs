/*!
  The assemble-and-run pipeline:
  ```text
  text -> [`parse_assembly`] -> `Instruction`s -> [`encode_program`] -> output file ->⋯

  ⋯-> [`Decoder`] -> `Instruction`s -> [`Machine::run`] -> memory banks + trace log
  ```
  The encoded program always goes through the output file, so what runs is exactly what
  was written to disk.
*/

use std::fs::{self, File};
use std::io::BufReader;

use tracing::info;

use crate::bytecode::{encode_program, parse_assembly, Decoder, Instruction};
use crate::config::Config;
use crate::error::Error;
use crate::vm::Machine;

/// Reads the mnemonic program at `config.input` and writes its encoding to `config.output`.
pub fn assemble(config: &Config) -> Result<Vec<Instruction>, Error> {
  let text = fs::read_to_string(&config.input)
    .map_err(|source| Error::Read { path: config.input.clone(), source })?;
  let instructions = parse_assembly(&text)?;

  let bytes = encode_program(&instructions);
  fs::write(&config.output, &bytes)
    .map_err(|source| Error::Write { path: config.output.clone(), source })?;

  info!(
    instructions = instructions.len(),
    bytes = bytes.len(),
    path = %config.output.display(),
    "program assembled"
  );
  Ok(instructions)
}

/// Streams the encoded program at `config.output` through a fresh machine.
pub fn execute(config: &Config) -> Result<Machine, Error> {
  let file = File::open(&config.output)
    .map_err(|source| Error::Read { path: config.output.clone(), source })?;

  let mut machine = Machine::new(config);
  machine.run(Decoder::new(BufReader::new(file)))?;
  Ok(machine)
}

/// `assemble` followed by `execute`.
pub fn assemble_and_run(config: &Config) -> Result<Machine, Error> {
  assemble(config)?;
  execute(config)
}
