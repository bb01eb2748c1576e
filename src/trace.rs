//! The execution trace: one event per executed (or failed) instruction, kept in program order
//! and persisted as a single JSON array.

use std::fmt::Display;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use prettytable::{row, Table};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::bytecode::Instruction;
use crate::memory::TABLE_DISPLAY_FORMAT;

#[derive(Error, Debug)]
pub enum TraceError {
  #[error("cannot access trace log {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("malformed trace log {path}: {source}")]
  Json {
    path: PathBuf,
    source: serde_json::Error,
  },
}

/**
  A flat, insertion ordered record of field name to integer or string. Instruction events
  carry `opcode`, `command` and the operand fields by name. A record that failed to decode
  carries only its raw `opcode` byte, when one was read. Any failure adds `error`.
*/
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(transparent)]
pub struct TraceEvent {
  fields: Map<String, Value>,
}

impl TraceEvent {
  /// An event for a raw opcode byte, used when no instruction could be decoded.
  pub fn for_opcode(opcode: u8) -> TraceEvent {
    TraceEvent::default().with_field("opcode", opcode as u64)
  }

  pub fn for_instruction(instruction: &Instruction) -> TraceEvent {
    let opcode = instruction.opcode();
    let mut event = TraceEvent::for_opcode(opcode.code());
    event.fields.insert("command".to_string(), Value::from(opcode.mnemonic()));
    for (field, operand) in opcode.fields().iter().zip(instruction.operands()) {
      event = event.with_field(field.name, operand);
    }
    event
  }

  pub fn with_field(mut self, name: &str, value: u64) -> TraceEvent {
    self.fields.insert(name.to_string(), Value::from(value));
    self
  }

  pub fn with_error(mut self, message: impl Display) -> TraceEvent {
    self.fields.insert("error".to_string(), Value::from(message.to_string()));
    self
  }

  pub fn opcode(&self) -> Option<u8> {
    self.get("opcode").and_then(|v| u8::try_from(v).ok())
  }

  /// The integer value of the named field, if it is present and an integer.
  pub fn get(&self, name: &str) -> Option<u64> {
    self.fields.get(name).and_then(Value::as_u64)
  }

  pub fn command(&self) -> Option<&str> {
    self.fields.get("command").and_then(Value::as_str)
  }

  pub fn error(&self) -> Option<&str> {
    self.fields.get("error").and_then(Value::as_str)
  }

  pub fn is_error(&self) -> bool {
    self.fields.contains_key("error")
  }

  /// Field names in the order they were recorded.
  pub fn field_names(&self) -> impl Iterator<Item = &str> {
    self.fields.keys().map(String::as_str)
  }
}

/**
  Accumulates events in memory. Nothing touches the backing file until `flush`, which
  rewrites the whole document, so calling it more than once is harmless and the last
  call wins.
*/
#[derive(Clone, Debug)]
pub struct TraceLog {
  path: PathBuf,
  events: Vec<TraceEvent>,
}

impl TraceLog {
  pub fn new(path: impl Into<PathBuf>) -> TraceLog {
    TraceLog { path: path.into(), events: Vec::new() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn events(&self) -> &[TraceEvent] {
    &self.events
  }

  pub fn record(&mut self, event: TraceEvent) {
    self.events.push(event);
  }

  pub fn flush(&self) -> Result<(), TraceError> {
    let io_error = |source: std::io::Error| TraceError::Io { path: self.path.clone(), source };

    let file = File::create(&self.path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &self.events)
      .map_err(|source| TraceError::Json { path: self.path.clone(), source })?;
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)?;

    info!(path = %self.path.display(), events = self.events.len(), "trace log written");
    Ok(())
  }

  /// Reads a flushed document back. Used by inspection tooling, never during a run.
  pub fn reload(path: impl AsRef<Path>) -> Result<Vec<TraceEvent>, TraceError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| TraceError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_reader(BufReader::new(file))
      .map_err(|source| TraceError::Json { path: path.to_path_buf(), source })
  }
}

/// Renders events as a table, one row per event, for post-hoc inspection.
pub fn events_table(events: &[TraceEvent]) -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"#", ubl->"Command", ubl->"Operands", ubl->"Error"]);

  for (i, event) in events.iter().enumerate() {
    let command = match (event.command(), event.opcode()) {
      (Some(command), _) => command.to_string(),
      (None, Some(opcode)) => format!("<{}>", opcode),
      (None, None) => "?".to_string(),
    };
    let operands =
      event
        .field_names()
        .filter(|name| !matches!(*name, "opcode" | "command" | "error"))
        .map(|name| format!("{}={}", name, event.fields[name]))
        .collect::<Vec<String>>()
        .join(", ");

    table.add_row(row![r->i, command, operands, event.error().unwrap_or("")]);
  }
  table
}
