use std::path::PathBuf;

use thiserror::Error;

use crate::bytecode::AssemblyError;
use crate::trace::TraceError;
use crate::vm::ExecutionError;

/// Any failure of an assemble-and-run session.
#[derive(Error, Debug)]
pub enum Error {
  #[error("cannot read {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("cannot write {path}: {source}")]
  Write {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error(transparent)]
  Assembly(#[from] AssemblyError),
  #[error(transparent)]
  Execution(#[from] ExecutionError),
  #[error(transparent)]
  Trace(#[from] TraceError),
}
