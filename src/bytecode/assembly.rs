/*!
  The human readable textual form of bytecode is called assembly. One instruction is written
  per line as a mnemonic followed by comma separated decimal operands:

    LOAD_CONST, 5, 3
    WRITE_MEM, 3, 0

  Blank lines are skipped. Mnemonics are resolved through the `strum` derives on `Opcode`,
  and every operand is checked against the width of the field it will be packed into.
*/

use std::str::FromStr;

use nom::{
  bytes::complete::take_while1,
  character::complete::{char as one_char, digit1, space0},
  combinator::{all_consuming, map_res},
  multi::many0,
  sequence::{delimited, preceded, tuple},
  IResult,
};
use thiserror::Error;

use crate::bytecode::{Instruction, Opcode};

#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum AssemblyError {
  #[error("Error on line {line}: {name} is not an operation.")]
  UnknownOpcode {
    line: usize,
    name: String,
  },
  #[error("Error on line {line}: {opcode} requires {expected} arguments but was given {found}.")]
  WrongArity {
    line: usize,
    opcode: Opcode,
    expected: usize,
    found: usize,
  },
  #[error("Error on line {line}: {opcode} {field} = {value} does not fit in {width} bits.")]
  OperandOverflow {
    line: usize,
    opcode: Opcode,
    field: &'static str,
    value: u64,
    width: u32,
  },
  #[error("Error on line {line}: cannot parse `{text}`.")]
  Syntax {
    line: usize,
    text: String,
  },
}

/// A mnemonic and its raw operands, before the mnemonic is resolved.
type ParsedLine<'a> = (&'a str, Vec<u64>);

fn mnemonic_p(input: &str) -> IResult<&str, &str> {
  take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn operand_p(input: &str) -> IResult<&str, u64> {
  preceded(
    delimited(space0, one_char(','), space0),
    map_res(digit1, u64::from_str),
  )(input)
}

fn line_p(input: &str) -> IResult<&str, ParsedLine<'_>> {
  all_consuming(
    delimited(
      space0,
      tuple((mnemonic_p, many0(operand_p))),
      space0,
    )
  )(input)
}

/// Resolves a parsed line into an instruction, checking arity and operand widths.
fn assemble_line(line: usize, name: &str, operands: &[u64]) -> Result<Instruction, AssemblyError> {
  let opcode = Opcode::from_str(name).map_err(|_| AssemblyError::UnknownOpcode {
    line,
    name: name.to_string(),
  })?;

  if operands.len() != opcode.arity() {
    return Err(AssemblyError::WrongArity {
      line,
      opcode,
      expected: opcode.arity(),
      found: operands.len(),
    });
  }

  for (field, value) in opcode.fields().iter().zip(operands) {
    if *value >> field.width != 0 {
      return Err(AssemblyError::OperandOverflow {
        line,
        opcode,
        field: field.name,
        value: *value,
        width: field.width,
      });
    }
  }

  match Instruction::from_operands(opcode, operands) {
    Some(instruction) => Ok(instruction),
    None => unreachable!("Unreachable: arity of {} was already checked.", opcode),
  }
}

/// Parses a whole program, one instruction per non-blank line. Lines are numbered from 1.
pub fn parse_assembly(text: &str) -> Result<Vec<Instruction>, AssemblyError> {
  let mut instructions = Vec::new();

  for (idx, raw_line) in text.lines().enumerate() {
    let line = idx + 1;
    if raw_line.trim().is_empty() {
      continue;
    }

    let (name, operands) = match line_p(raw_line) {
      Ok((_rest, parsed)) => parsed,
      Err(_e) => {
        return Err(AssemblyError::Syntax { line, text: raw_line.trim().to_string() });
      }
    };

    instructions.push(assemble_line(line, name, &operands)?);
  }

  Ok(instructions)
}

/// Writes a program back out in the form `parse_assembly` reads.
pub fn disassemble(instructions: &[Instruction]) -> String {
  instructions
    .iter()
    .map(|i| format!("{}\n", i))
    .collect()
}
