//! Decoder, disassembler and simulator for the Intel 8086.
//!
//! The crate turns a flat stream of 8086 machine code into structured
//! [`Instr`] values, renders them as NASM-compatible assembly, and can
//! optionally execute them against an owned [`State`] modeling the
//! programmer-visible machine: 8 general registers with byte/word
//! aliasing, 9 status flags, an instruction pointer, a running clock
//! total and 1 MiB of guest memory.
//!
//! Decoding is driven by [`cpu::decode::Decoder`], execution by
//! [`cpu::interpret::Interpreter`], and text output by the printers in
//! [`cpu::disasm`].
//!
//! [`Instr`]: cpu/instr/struct.Instr.html
//! [`State`]: cpu/struct.State.html

#![warn(missing_debug_implementations)]

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate bitpat;
#[macro_use]
extern crate log;
#[macro_use]
extern crate num_derive;

pub mod cpu;
pub mod memory;
