//! Decoding and execution of 8086 machine code.

mod flags;
mod state;
pub mod bits;
pub mod clocks;
pub mod decode;
pub mod disasm;
pub mod instr;
pub mod interpret;

pub use self::flags::Flags;
pub use self::state::{Snapshot, State};
