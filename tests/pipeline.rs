//! End to end: mnemonic text on disk, through the bytecode file, into the machine and back
//! out of the trace log.

use std::fs;

use andvm::bytecode::{decode_all, CodecError};
use andvm::config::Config;
use andvm::error::Error;
use andvm::pipeline::{assemble, assemble_and_run, execute};
use andvm::trace::TraceLog;
use andvm::vm::ExecutionError;
use andvm::Instruction;

fn config_in(dir: &tempfile::TempDir, program: &str) -> Config {
  let input = dir.path().join("input.txt");
  fs::write(&input, program).unwrap();
  Config {
    input,
    output: dir.path().join("output.bin"),
    log: dir.path().join("log.json"),
    ..Config::default()
  }
}

const BIN_AND_PROGRAM: &str = "\
LOAD_CONST, 10, 0
LOAD_CONST, 5, 1
LOAD_CONST, 6, 2

WRITE_MEM, 0, 0
WRITE_MEM, 0, 1
WRITE_MEM, 0, 2
WRITE_MEM, 0, 4
WRITE_MEM, 1, 5
WRITE_MEM, 2, 6
BIN_OP_AND, 0, 3, 8, 4
READ_MEM, 10, 3
";

#[test]
fn runs_block_and_program() {
  let dir = tempfile::tempdir().unwrap();
  let config = config_in(&dir, BIN_AND_PROGRAM);

  let machine = assemble_and_run(&config).unwrap();

  assert_eq!(&machine.primary().cells()[..12], &[10, 10, 10, 0, 10, 5, 6, 0, 10, 0, 2, 0]);
  assert_eq!(machine.auxiliary().read(3), Ok(2));

  let events = TraceLog::reload(&config.log).unwrap();
  assert_eq!(events.len(), 11);
  assert!(events.iter().all(|e| !e.is_error()));
  assert_eq!(events[9].command(), Some("BIN_OP_AND"));
  assert_eq!(events[9].get("count"), Some(3));

  let trace = machine.into_trace();
  assert_eq!(trace.path(), config.log.as_path());
  assert_eq!(trace.events(), &events[..]);
}

#[test]
fn written_bytecode_decodes_to_the_program() {
  let dir = tempfile::tempdir().unwrap();
  let config = config_in(&dir, "LOAD_CONST, 5, 10\nWRITE_MEM, 10, 2\n");

  let program = assemble(&config).unwrap();
  let bytes = fs::read(&config.output).unwrap();
  assert_eq!(bytes.len(), 7 + 6);
  assert_eq!(decode_all(&bytes).unwrap(), program);
  assert_eq!(
    program,
    vec![
      Instruction::LoadConst { value: 5, address: 10 },
      Instruction::WriteMem { read_address: 10, write_address: 2 },
    ]
  );

  let machine = execute(&config).unwrap();
  assert_eq!(machine.auxiliary().read(10), Ok(5));
  assert_eq!(machine.primary().read(2), Ok(5));
}

#[test]
fn out_of_range_program_leaves_terminal_error_event() {
  let dir = tempfile::tempdir().unwrap();
  let config = config_in(&dir, "LOAD_CONST, 1, 0\nBIN_OP_AND, 0, 4, 30, 0\nLOAD_CONST, 2, 1\n");

  match assemble_and_run(&config) {
    Err(Error::Execution(ExecutionError::OutOfRange { .. })) => {}
    Err(e) => panic!("unexpected error {}", e),
    Ok(_) => panic!("program should have failed"),
  }

  let events = TraceLog::reload(&config.log).unwrap();
  assert_eq!(events.len(), 2);
  let last = &events[1];
  assert!(last.is_error());
  assert_eq!(last.get("base_b"), Some(0));
  assert_eq!(last.get("count"), Some(4));
  assert_eq!(last.get("dest"), Some(30));
  assert_eq!(last.get("base_e"), Some(0));
}

#[test]
fn unknown_opcode_in_bytecode_aborts_before_executing() {
  let dir = tempfile::tempdir().unwrap();
  let config = config_in(&dir, "");
  fs::write(&config.output, [0x01, 0x14, 0, 0, 0, 0, 0, 0]).unwrap();

  match execute(&config) {
    Err(Error::Execution(ExecutionError::Decode(CodecError::UnknownOpcode(1)))) => {}
    Err(e) => panic!("unexpected error {}", e),
    Ok(_) => panic!("bytecode should have been rejected"),
  }

  let events = TraceLog::reload(&config.log).unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].opcode(), Some(1));
  assert!(events[0].is_error());
}

#[test]
fn unknown_mnemonic_writes_no_bytecode() {
  let dir = tempfile::tempdir().unwrap();
  let config = config_in(&dir, "LOAD_CONST, 1, 0\nOR, 1, 2\n");

  assert!(matches!(assemble(&config), Err(Error::Assembly(_))));
  assert!(!config.output.exists());
}
