use std::path::PathBuf;

use argh::FromArgs;
use tracing::{error, Level};

use andvm::config::Config;
use andvm::error::Error;
use andvm::pipeline;
use andvm::trace::{events_table, TraceLog};

/// Assembles a mnemonic program into bytecode, then runs the bytecode and prints both memory
/// banks. Every executed instruction is recorded in a JSON trace log.
#[derive(FromArgs)]
struct Arguments {
  /// the mnemonic program to assemble, `input/input.txt` by default
  #[argh(option, short = 'i')]
  input: Option<PathBuf>,

  /// the bytecode file to write and execute, `output.bin` by default
  #[argh(option, short = 'o')]
  output: Option<PathBuf>,

  /// the trace log to write, `log.json` by default
  #[argh(option, short = 'l')]
  log: Option<PathBuf>,

  /// number of cells in primary memory
  #[argh(option)]
  memory_size: Option<usize>,

  /// number of cells in auxiliary memory
  #[argh(option)]
  aux_memory_size: Option<usize>,

  /// print an existing trace log instead of running a program
  #[argh(switch)]
  show_log: bool,

  /// log every executed instruction
  #[argh(switch, short = 'v')]
  verbose: bool,
}

impl Arguments {
  fn config(&self) -> Config {
    let defaults = Config::default();
    Config {
      input: self.input.clone().unwrap_or(defaults.input),
      output: self.output.clone().unwrap_or(defaults.output),
      log: self.log.clone().unwrap_or(defaults.log),
      memory_size: self.memory_size.unwrap_or(defaults.memory_size),
      aux_memory_size: self.aux_memory_size.unwrap_or(defaults.aux_memory_size),
    }
  }
}

fn run(arguments: &Arguments) -> Result<(), Error> {
  let config = arguments.config();

  if arguments.show_log {
    let events = TraceLog::reload(&config.log)?;
    println!("{}", events_table(&events));
    return Ok(());
  }

  let machine = pipeline::assemble_and_run(&config)?;
  println!("{}", machine);
  Ok(())
}

fn main() {
  let arguments: Arguments = argh::from_env();

  tracing_subscriber::fmt()
    .with_max_level(if arguments.verbose { Level::DEBUG } else { Level::INFO })
    .with_writer(std::io::stderr)
    .init();

  #[cfg(feature = "trace_computation")]
  println!("Computation Tracing ENABLED");

  if let Err(e) = run(&arguments) {
    error!("{}", e);
    std::process::exit(1);
  }
}
