//! monke-code — the opcode set and the flat instruction buffers the
//! compiler emits and the VM executes.

mod instructions;
mod opcode;

pub use instructions::{make, read_operands, Instructions};
pub use opcode::{operand_widths, Opcode};
