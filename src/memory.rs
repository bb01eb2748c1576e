/*!
  A memory bank is a fixed-size, zero-initialized store of `Word`s. The machine owns two of
  them, primary and auxiliary, which never alias. Banks are never resized after
  construction, and every access is checked against the bank's length.
*/

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, row, Table};
use lazy_static::lazy_static;
use thiserror::Error;

use crate::address::{Address, AddressType, Bank, Word};

#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum MemoryError {
  #[error("{address} is out of range for {bank} of length {length}", bank = .address.bank)]
  OutOfRange {
    address: Address,
    length: usize,
  },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryBank {
  bank: Bank,
  cells: Vec<Word>,
}

impl MemoryBank {
  pub fn new(bank: Bank, length: usize) -> MemoryBank {
    MemoryBank { bank, cells: vec![0; length] }
  }

  /// Builds a bank whose length and initial contents are given by `cells`.
  pub fn from_cells(bank: Bank, cells: Vec<Word>) -> MemoryBank {
    MemoryBank { bank, cells }
  }

  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  pub fn cells(&self) -> &[Word] {
    &self.cells
  }

  pub fn read(&self, address: AddressType) -> Result<Word, MemoryError> {
    match self.cells.get(address) {
      Some(value) => Ok(*value),
      None => Err(self.out_of_range(address)),
    }
  }

  pub fn write(&mut self, address: AddressType, value: Word) -> Result<(), MemoryError> {
    if let Some(cell) = self.cells.get_mut(address) {
      *cell = value;
      return Ok(());
    }
    Err(self.out_of_range(address))
  }

  /**
    Checks that the `count` cells starting at `base` all lie inside the bank. A range that
    ends exactly at the bank's length is valid. The reported address is the first cell
    past the end of the bank that the range would touch.
  */
  pub fn check_range(&self, base: AddressType, count: usize) -> Result<(), MemoryError> {
    match base.checked_add(count) {
      Some(end) if end <= self.cells.len() => Ok(()),
      _ => Err(self.out_of_range(base.max(self.cells.len()))),
    }
  }

  fn out_of_range(&self, address: AddressType) -> MemoryError {
    MemoryError::OutOfRange {
      address: Address { bank: self.bank, idx: address },
      length: self.cells.len(),
    }
  }

  /// Renders the bank as a two column table, marking the cell at `highlight` if any.
  pub fn to_table(&self, highlight: Option<AddressType>) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, cell) in self.cells.iter().enumerate() {
      match highlight == Some(i) {
        true => {
          table.add_row(row![r->format!("* --> {} =", Address { bank: self.bank, idx: i }), cell]);
        }

        false => {
          table.add_row(row![r->format!("{} =", Address { bank: self.bank, idx: i }), cell]);
        }
      } // end match on highlight
    } // end for
    table
  }
}

impl Display for MemoryBank {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.to_table(None))
  }
}

lazy_static! {
  pub(crate) static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}
