/*!

  Instructions are variable length records of 6, 7 or 9 bytes. The first byte of every
  record is the opcode, and the opcode alone determines the length of the record and the
  layout of its operand fields, so a program is simply the concatenation of its records
  with no header or length prefixes. Fields are packed most significant bit first, and
  multi-byte values are big-endian. The sizes of instruction components are as follows:

    Opcode:    8 bits
    Constant: 26 bits
    Address:  18 bits
    Count:     5 bits

  Addresses index cells, not bytes. Which of the two memory banks an address refers to is
  fixed by the opcode and the operand's position.

  In memory, an instruction is an enum with one variant per opcode carrying its operands
  as plain integers. The packed form only exists on disk and in transit.

*/

mod assembly;
mod binary;
mod instruction;

pub use assembly::{disassemble, parse_assembly, AssemblyError};
pub use binary::{decode_all, encode_instruction, encode_program, CodecError, Decoder, MAX_RECORD_SIZE};
pub use instruction::{Field, Instruction, Opcode, ADDRESS_WIDTH, CONSTANT_WIDTH, COUNT_WIDTH};
