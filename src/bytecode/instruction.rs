use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::address::{AddressType, Word};

/// A named operand slot in an encoded record, most significant first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Field {
  pub name: &'static str,
  pub width: u32,
}

const fn field(name: &'static str, width: u32) -> Field {
  Field { name, width }
}

pub const CONSTANT_WIDTH: u32 = 26;
pub const ADDRESS_WIDTH: u32 = 18;
pub const COUNT_WIDTH: u32 = 5;

const LOAD_CONST_FIELDS: [Field; 2] = [
  field("value", CONSTANT_WIDTH),
  field("address", ADDRESS_WIDTH),
];
const MEMORY_MOVE_FIELDS: [Field; 2] = [
  field("read_address", ADDRESS_WIDTH),
  field("write_address", ADDRESS_WIDTH),
];
const BIN_OP_AND_FIELDS: [Field; 4] = [
  field("base_b", ADDRESS_WIDTH),
  field("count", COUNT_WIDTH),
  field("dest", ADDRESS_WIDTH),
  field("base_e", ADDRESS_WIDTH),
];

/**
  Opcodes of the virtual machine.

  The numeric value of each variant is the byte written at the head of its encoded record,
  and the mnemonic is the name used in program text. Both are part of the binary format and
  must not change. The size of a record, and hence where the next one starts, is a function
  of the opcode alone, so a stream can be decoded without length prefixes.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,            Hash
)]
#[repr(u8)]
pub enum Opcode {
  /// `LOAD_CONST, value, address`: auxiliary[address] <- value
  #[strum(serialize = "LOAD_CONST")]
  LoadConst = 20,
  /// `READ_MEM, read_address, write_address`: auxiliary[write] <- primary[read]
  #[strum(serialize = "READ_MEM")]
  ReadMem = 140,
  /// `WRITE_MEM, read_address, write_address`: primary[write] <- auxiliary[read]
  #[strum(serialize = "WRITE_MEM")]
  WriteMem = 232,
  /// `BIN_OP_AND, base_b, count, dest, base_e`: blockwise AND in primary memory
  #[strum(serialize = "BIN_OP_AND")]
  BinAnd = 219,
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn mnemonic(&self) -> &'static str {
    self.into()
  }

  /// Returns the size in BYTES of an encoded record for this opcode, opcode byte included.
  pub fn record_size(&self) -> usize {
    match self {
      Opcode::LoadConst => 7,
      Opcode::ReadMem | Opcode::WriteMem => 6,
      Opcode::BinAnd => 9,
    }
  }

  /// The operand layout following the opcode byte. Bits left over after the last field are
  /// zero padding.
  pub fn fields(&self) -> &'static [Field] {
    match self {
      Opcode::LoadConst => &LOAD_CONST_FIELDS,
      Opcode::ReadMem | Opcode::WriteMem => &MEMORY_MOVE_FIELDS,
      Opcode::BinAnd => &BIN_OP_AND_FIELDS,
    }
  }

  pub fn arity(&self) -> usize {
    self.fields().len()
  }
}

/// Holds the unencoded components of an instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  LoadConst {
    value: Word,
    address: AddressType,
  },
  ReadMem {
    read_address: AddressType,
    write_address: AddressType,
  },
  WriteMem {
    read_address: AddressType,
    write_address: AddressType,
  },
  BinAnd {
    base_b: AddressType,
    count: usize,
    dest: AddressType,
    base_e: AddressType,
  },
}

impl Instruction {
  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::LoadConst { .. } => Opcode::LoadConst,
      Instruction::ReadMem { .. } => Opcode::ReadMem,
      Instruction::WriteMem { .. } => Opcode::WriteMem,
      Instruction::BinAnd { .. } => Opcode::BinAnd,
    }
  }

  /// The operands in the order of `self.opcode().fields()`.
  pub fn operands(&self) -> Vec<u64> {
    match *self {
      Instruction::LoadConst { value, address } => vec![value, address as u64],

      | Instruction::ReadMem { read_address, write_address }
      | Instruction::WriteMem { read_address, write_address } => {
        vec![read_address as u64, write_address as u64]
      }

      Instruction::BinAnd { base_b, count, dest, base_e } => {
        vec![base_b as u64, count as u64, dest as u64, base_e as u64]
      }
    }
  }

  /**
    Builds an instruction from operands listed in field order. Returns `None` if the number
    of operands is not the opcode's arity. Widths are not checked here; callers that
    accept untrusted values check them against `Opcode::fields()` first.
  */
  pub fn from_operands(opcode: Opcode, operands: &[u64]) -> Option<Instruction> {
    let instruction =
      match (opcode, operands) {
        (Opcode::LoadConst, &[value, address]) => {
          Instruction::LoadConst { value, address: address as AddressType }
        }

        (Opcode::ReadMem, &[read_address, write_address]) => {
          Instruction::ReadMem {
            read_address: read_address as AddressType,
            write_address: write_address as AddressType,
          }
        }

        (Opcode::WriteMem, &[read_address, write_address]) => {
          Instruction::WriteMem {
            read_address: read_address as AddressType,
            write_address: write_address as AddressType,
          }
        }

        (Opcode::BinAnd, &[base_b, count, dest, base_e]) => {
          Instruction::BinAnd {
            base_b: base_b as AddressType,
            count: count as usize,
            dest: dest as AddressType,
            base_e: base_e as AddressType,
          }
        }

        _ => return None,
      };

    Some(instruction)
  }
}

/// Writes the instruction in the same form the assembler reads, e.g. `LOAD_CONST, 5, 3`.
impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.opcode())?;
    for operand in self.operands() {
      write!(f, ", {}", operand)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn opcode_tags_are_stable() {
    assert_eq!(Opcode::LoadConst.code(), 20);
    assert_eq!(Opcode::ReadMem.code(), 140);
    assert_eq!(Opcode::WriteMem.code(), 232);
    assert_eq!(Opcode::BinAnd.code(), 219);
    assert_eq!(Opcode::try_from(219u8).ok(), Some(Opcode::BinAnd));
    assert!(Opcode::try_from(21u8).is_err());
  }

  #[test]
  fn mnemonics_round_trip() {
    for opcode in Opcode::iter() {
      assert_eq!(Opcode::from_str(opcode.mnemonic()).ok(), Some(opcode));
    }
    assert!(Opcode::from_str("ADD").is_err());
  }

  #[test]
  fn layouts_fit_their_records() {
    for opcode in Opcode::iter() {
      let used: u32 = 8 + opcode.fields().iter().map(|f| f.width).sum::<u32>();
      let total = 8 * opcode.record_size() as u32;
      assert!(used <= total, "{} uses {} of {} bits", opcode, used, total);
    }
  }

  #[test]
  fn operands_round_trip_through_from_operands() {
    let instruction = Instruction::BinAnd { base_b: 0, count: 3, dest: 8, base_e: 4 };
    let operands = instruction.operands();
    assert_eq!(operands, vec![0, 3, 8, 4]);
    assert_eq!(Instruction::from_operands(Opcode::BinAnd, &operands), Some(instruction));
    assert_eq!(Instruction::from_operands(Opcode::ReadMem, &operands), None);
  }

  #[test]
  fn arity_matches_what_from_operands_accepts() {
    for opcode in Opcode::iter() {
      assert_eq!(opcode.arity(), opcode.fields().len());

      let operands = vec![0u64; opcode.arity()];
      let instruction = Instruction::from_operands(opcode, &operands)
        .unwrap_or_else(|| panic!("{} rejects {} operands", opcode, opcode.arity()));
      assert_eq!(instruction.opcode(), opcode);
      assert_eq!(instruction.operands().len(), opcode.arity());

      assert_eq!(Instruction::from_operands(opcode, &vec![0u64; opcode.arity() + 1]), None);
      assert_eq!(Instruction::from_operands(opcode, &operands[1..]), None);
    }
  }

  #[test]
  fn displays_as_assembly() {
    let instruction = Instruction::LoadConst { value: 5, address: 3 };
    assert_eq!(instruction.to_string(), "LOAD_CONST, 5, 3");
  }
}
