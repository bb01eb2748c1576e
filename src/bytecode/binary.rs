/*!
  This module is responsible for the encoding and decoding of binary instructions.

  A record is the opcode byte followed by the operand fields of `Opcode::fields()`, packed
  most significant bit first and padded with zero bits up to `Opcode::record_size()` bytes:

    LOAD_CONST  [OpCode:8][Value:26][Address:18][Reserved:4]
    READ_MEM    [OpCode:8][Address:18][Address:18][Reserved:4]
    WRITE_MEM   [OpCode:8][Address:18][Address:18][Reserved:4]
    BIN_OP_AND  [OpCode:8][Address:18][Count:5][Address:18][Address:18][Reserved:5]

  The widest record is 72 bits, so every record is assembled in a `Packed` register and
  written out big-endian.
*/
use std::io::{ErrorKind, Read};

use thiserror::Error;

use super::{Instruction, Opcode};

// If you change this you must also change `MAX_RECORD_SIZE`.
type Packed = u128;
const PACKED_BYTES: usize = std::mem::size_of::<Packed>();
pub const MAX_RECORD_SIZE: usize = 9;

#[derive(Error, Debug)]
pub enum CodecError {
  #[error("unknown opcode {0}")]
  UnknownOpcode(u8),
  #[error("truncated {opcode} record: expected {expected} bytes but found {found}")]
  Truncated {
    opcode: Opcode,
    expected: usize,
    found: usize,
  },
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl CodecError {
  /// The opcode byte of the record that failed to decode, when one was read.
  pub fn opcode_byte(&self) -> Option<u8> {
    match self {
      CodecError::UnknownOpcode(byte) => Some(*byte),
      CodecError::Truncated { opcode, .. } => Some(opcode.code()),
      CodecError::Io(_) => None,
    }
  }
}

fn mask(width: u32) -> Packed {
  (1 << width) - 1
}

/**
  Encodes the instruction into bytecode.

  Every operand is masked to the width of its field, so an operand that does not fit is
  silently truncated. Instructions produced by `parse_assembly` are already range checked;
  instructions built by hand are the caller's responsibility.
*/
pub fn encode_instruction(instruction: &Instruction) -> Vec<u8> {
  let opcode = instruction.opcode();
  let size = opcode.record_size();
  let mut shift = 8 * size as u32 - 8;
  let mut packed = (opcode.code() as Packed) << shift;

  for (field, operand) in opcode.fields().iter().zip(instruction.operands()) {
    shift -= field.width;
    packed |= (operand as Packed & mask(field.width)) << shift;
  }

  packed.to_be_bytes()[PACKED_BYTES - size..].to_vec()
}

/// Encodes a whole program as one contiguous byte stream.
pub fn encode_program(instructions: &[Instruction]) -> Vec<u8> {
  instructions.iter().flat_map(encode_instruction).collect()
}

/// Unpacks a full record, `bytes[0]` being the opcode byte.
fn unpack(opcode: Opcode, bytes: &[u8]) -> Instruction {
  let mut buffer = [0u8; PACKED_BYTES];
  buffer[PACKED_BYTES - bytes.len()..].copy_from_slice(bytes);
  let packed = Packed::from_be_bytes(buffer);

  let mut shift = 8 * bytes.len() as u32 - 8;
  let operands: Vec<u64> =
    opcode.fields().iter().map(|field| {
      shift -= field.width;
      ((packed >> shift) & mask(field.width)) as u64
    }).collect();

  // The operand count always matches the opcode's layout.
  match Instruction::from_operands(opcode, &operands) {
    Some(instruction) => instruction,
    None => unreachable!("Unreachable: {} decoded {} operands.", opcode, operands.len()),
  }
}

/**
  A pull-based decoder over any byte source. Each call to `next` reads exactly one record
  and yields it; the end of input before an opcode byte ends the sequence. The first error
  also ends the sequence, so a `Decoder` never yields anything after an `Err`.

  The decoder owns its source and consumes it; it cannot be restarted.
*/
pub struct Decoder<R> {
  source: R,
  done: bool,
}

impl<R: Read> Decoder<R> {
  pub fn new(source: R) -> Decoder<R> {
    Decoder { source, done: false }
  }

  /// Reads one byte, returning `None` at end of input.
  fn read_opcode_byte(&mut self) -> Result<Option<u8>, CodecError> {
    let mut byte = [0u8; 1];
    loop {
      match self.source.read(&mut byte) {
        Ok(0) => return Ok(None),
        Ok(_) => return Ok(Some(byte[0])),
        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
        Err(e) => return Err(e.into()),
      }
    }
  }

  /// Fills `buffer` completely, returning how many bytes were read before end of input.
  fn read_payload(&mut self, buffer: &mut [u8]) -> Result<usize, CodecError> {
    let mut filled = 0;
    while filled < buffer.len() {
      match self.source.read(&mut buffer[filled..]) {
        Ok(0) => break,
        Ok(n) => filled += n,
        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
        Err(e) => return Err(e.into()),
      }
    }
    Ok(filled)
  }

  fn decode_next(&mut self) -> Result<Option<Instruction>, CodecError> {
    let byte = match self.read_opcode_byte()? {
      Some(byte) => byte,
      None => return Ok(None),
    };
    let opcode = Opcode::try_from(byte).map_err(|_| CodecError::UnknownOpcode(byte))?;

    let size = opcode.record_size();
    let mut record = [0u8; MAX_RECORD_SIZE];
    record[0] = byte;
    let found = self.read_payload(&mut record[1..size])?;
    if found < size - 1 {
      return Err(CodecError::Truncated { opcode, expected: size, found: found + 1 });
    }

    Ok(Some(unpack(opcode, &record[..size])))
  }
}

impl<R: Read> Iterator for Decoder<R> {
  type Item = Result<Instruction, CodecError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }
    match self.decode_next() {
      Ok(Some(instruction)) => Some(Ok(instruction)),
      Ok(None) => {
        self.done = true;
        None
      }
      Err(e) => {
        self.done = true;
        Some(Err(e))
      }
    }
  }
}

impl<R: Read> std::iter::FusedIterator for Decoder<R> {}

/// Decodes an in-memory byte stream, stopping at the first error.
pub fn decode_all(bytes: &[u8]) -> Result<Vec<Instruction>, CodecError> {
  Decoder::new(bytes).collect()
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;
  use crate::bytecode::instruction::{ADDRESS_WIDTH, CONSTANT_WIDTH, COUNT_WIDTH};

  #[test]
  fn encodes_load_const() {
    let bytes = encode_instruction(&Instruction::LoadConst { value: 5, address: 3 });
    assert_eq!(bytes, vec![0x14, 0x00, 0x00, 0x01, 0x40, 0x00, 0x30]);
  }

  #[test]
  fn encodes_read_and_write_mem() {
    let read = encode_instruction(&Instruction::ReadMem { read_address: 1, write_address: 2 });
    assert_eq!(read, vec![0x8C, 0x00, 0x00, 0x40, 0x00, 0x20]);

    let write = encode_instruction(&Instruction::WriteMem { read_address: 1, write_address: 2 });
    assert_eq!(write, vec![0xE8, 0x00, 0x00, 0x40, 0x00, 0x20]);
  }

  #[test]
  fn encodes_bin_op_and() {
    let bytes = encode_instruction(&Instruction::BinAnd { base_b: 0, count: 3, dest: 8, base_e: 4 });
    assert_eq!(bytes, vec![0xDB, 0x00, 0x00, 0x06, 0x00, 0x04, 0x00, 0x00, 0x80]);
  }

  #[test]
  fn encoding_is_deterministic() {
    let instruction = Instruction::WriteMem { read_address: 10, write_address: 2 };
    assert_eq!(encode_instruction(&instruction), encode_instruction(&instruction));
  }

  #[test]
  fn decoding_is_deterministic() {
    let bytes = encode_program(&[
      Instruction::LoadConst { value: 67108863, address: 262143 },
      Instruction::BinAnd { base_b: 262143, count: 31, dest: 0, base_e: 262143 },
      Instruction::ReadMem { read_address: 5, write_address: 6 },
    ]);
    let first: Vec<_> = Decoder::new(&bytes[..]).map(Result::unwrap).collect();
    let second: Vec<_> = Decoder::new(&bytes[..]).map(Result::unwrap).collect();
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
  }

  #[test]
  fn oversized_operand_is_truncated() {
    let bytes = encode_instruction(&Instruction::LoadConst { value: 1 << CONSTANT_WIDTH, address: 1 });
    let decoded = decode_all(&bytes).unwrap();
    assert_eq!(decoded, vec![Instruction::LoadConst { value: 0, address: 1 }]);
  }

  #[test]
  fn decodes_a_stream_in_order() {
    let program = vec![
      Instruction::LoadConst { value: 5, address: 10 },
      Instruction::WriteMem { read_address: 10, write_address: 2 },
      Instruction::BinAnd { base_b: 0, count: 3, dest: 8, base_e: 4 },
      Instruction::ReadMem { read_address: 2, write_address: 11 },
    ];
    let bytes = encode_program(&program);
    assert_eq!(bytes.len(), 7 + 6 + 9 + 6);
    assert_eq!(decode_all(&bytes).unwrap(), program);
  }

  #[test]
  fn empty_stream_yields_nothing() {
    let mut decoder = Decoder::new(&[0u8; 0][..]);
    assert!(decoder.next().is_none());
    assert!(decoder.next().is_none());
  }

  #[test]
  fn unknown_opcode_yields_no_instructions() {
    let mut bytes = vec![0x15];
    bytes.extend(encode_instruction(&Instruction::LoadConst { value: 1, address: 1 }));

    let mut decoder = Decoder::new(&bytes[..]);
    match decoder.next() {
      Some(Err(CodecError::UnknownOpcode(0x15))) => {}
      other => panic!("expected unknown opcode, got {:?}", other),
    }
    assert!(decoder.next().is_none());
  }

  #[test]
  fn decoding_stops_at_first_error() {
    let mut bytes = encode_instruction(&Instruction::ReadMem { read_address: 0, write_address: 1 });
    bytes.push(0xFF);
    bytes.extend(encode_instruction(&Instruction::ReadMem { read_address: 0, write_address: 1 }));

    let results: Vec<_> = Decoder::new(&bytes[..]).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(CodecError::UnknownOpcode(0xFF))));
  }

  #[test]
  fn short_record_is_truncated() {
    let bytes = encode_instruction(&Instruction::BinAnd { base_b: 1, count: 1, dest: 1, base_e: 1 });
    match decode_all(&bytes[..5]) {
      Err(CodecError::Truncated { opcode: Opcode::BinAnd, expected: 9, found: 5 }) => {}
      other => panic!("expected truncated record, got {:?}", other),
    }
  }

  #[test]
  fn pad_bits_are_ignored() {
    let mut bytes = encode_instruction(&Instruction::ReadMem { read_address: 7, write_address: 9 });
    bytes[5] |= 0x0F;
    assert_eq!(
      decode_all(&bytes).unwrap(),
      vec![Instruction::ReadMem { read_address: 7, write_address: 9 }]
    );
  }

  fn any_instruction() -> impl Strategy<Value = Instruction> {
    let address = 0usize..(1 << ADDRESS_WIDTH);
    prop_oneof![
      (0u64..(1 << CONSTANT_WIDTH), address.clone())
        .prop_map(|(value, address)| Instruction::LoadConst { value, address }),
      (address.clone(), address.clone())
        .prop_map(|(read_address, write_address)| Instruction::ReadMem { read_address, write_address }),
      (address.clone(), address.clone())
        .prop_map(|(read_address, write_address)| Instruction::WriteMem { read_address, write_address }),
      (address.clone(), 0usize..(1 << COUNT_WIDTH), address.clone(), address)
        .prop_map(|(base_b, count, dest, base_e)| Instruction::BinAnd { base_b, count, dest, base_e }),
    ]
  }

  proptest! {
    #[test]
    fn prop_decode_inverts_encode(instruction in any_instruction()) {
      let bytes = encode_instruction(&instruction);
      prop_assert_eq!(bytes.len(), instruction.opcode().record_size());
      prop_assert_eq!(decode_all(&bytes).unwrap(), vec![instruction]);
    }
  }
}
