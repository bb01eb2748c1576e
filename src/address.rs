//! Addresses name a cell in one of the machine's two memory banks, with some convenience
//! functions.

use std::fmt::{Display, Formatter};

// `AddressType` is `usize`, as it is naturally an index into a memory store.
pub type AddressType = usize;

/// The contents of a single memory cell.
pub type Word = u64;

/// Which of the two memory stores an address refers to.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Bank {
  /// The execution-visible store addressed by `READ_MEM`, `WRITE_MEM` and `BIN_OP_AND`.
  Primary,
  /// The scratch/constant pool written by `LOAD_CONST` and read by `WRITE_MEM`.
  Auxiliary,
}

impl Bank {
  /// Single letter used when printing cells of this bank, as in `M[3]` or `A[3]`.
  pub fn letter(&self) -> char {
    match self {
      Bank::Primary => 'M',
      Bank::Auxiliary => 'A',
    }
  }
}

impl Display for Bank {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Bank::Primary => write!(f, "primary memory"),
      Bank::Auxiliary => write!(f, "auxiliary memory"),
    }
  }
}

/// A fully qualified cell address.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Address {
  pub bank: Bank,
  pub idx: AddressType,
}

impl Address {
  pub fn primary(idx: AddressType) -> Address {
    Address { bank: Bank::Primary, idx }
  }

  pub fn auxiliary(idx: AddressType) -> Address {
    Address { bank: Bank::Auxiliary, idx }
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}[{}]", self.bank.letter(), self.idx)
  }
}
