//! 8086 interpreter.

use crate::cpu::clocks;
use crate::cpu::decode::{Decoder, DecoderError};
use crate::cpu::instr::*;
use crate::cpu::{Flags, Snapshot, State};
use crate::memory::MemoryError;

use std::error::Error;
use std::fmt;

/// Drives a `State` by fetching, decoding and executing one instruction at
/// a time.
#[derive(Debug)]
pub struct Interpreter {
    state: State,
}

/// A single executed instruction along with the machine state around it.
#[derive(Debug)]
pub struct Step {
    pub instr: Instr,
    pub before: Snapshot,
    pub after: Snapshot,
}

impl Interpreter {
    /// Creates an interpreter with `code` loaded for execution.
    ///
    /// Execution starts at the first byte of `code`. Registers, flags and
    /// the whole memory space start out zeroed.
    pub fn new(code: Vec<u8>) -> Self {
        Self {
            state: State::new(code),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Whether the instruction pointer has run off the end of the loaded
    /// code, which is how straight-line programs finish.
    pub fn done(&self) -> bool {
        usize::from(self.state.ip()) >= self.state.code().len()
    }

    /// Fetch, decode and execute the next instruction.
    pub fn step(&mut self) -> Result<Step, InterpreterError> {
        let before = self.state.snapshot();

        let mut instr = {
            let mut decoder = Decoder::new(self.state.code(), usize::from(self.state.ip()));
            decoder.decode_next()?
        };
        // ip points past the fetched instruction while it executes, which
        // is what relative branch targets and pushed return addresses see
        self.state.set_ip(before.ip.wrapping_add(instr.len));

        let taken = self.execute(&instr)?;

        let cost = clocks::cost(&instr, taken);
        self.state.add_clocks(cost);
        instr.clocks = Some(cost);

        Ok(Step {
            instr,
            before,
            after: self.state.snapshot(),
        })
    }

    /// Executes a decoded instruction and performs its side effects.
    ///
    /// Returns whether a conditional transfer actually branched, since that
    /// decides its clock cost.
    fn execute(&mut self, instr: &Instr) -> Result<bool, InterpreterError> {
        match instr.op {
            Op::Mov => {
                let (dst, src) = pair(instr);
                let value = self.read_operand(instr, src)?;
                self.write_operand(instr, dst, value)?;
            }
            Op::Xchg => {
                let (dst, src) = pair(instr);
                let a = self.read_operand(instr, dst)?;
                let b = self.read_operand(instr, src)?;
                self.write_operand(instr, dst, b)?;
                self.write_operand(instr, src, a)?;
            }
            Op::Lea => {
                let (dst, src) = pair(instr);
                match src {
                    Operand::Mem(mem) => {
                        let addr = self.effective_address(mem) as u16;
                        self.write_operand(instr, dst, addr)?;
                    }
                    _ => return Err(InterpreterError::unimplemented(instr)),
                }
            }
            Op::Add | Op::Adc => {
                let (dst, src) = pair(instr);
                let a = self.read_operand(instr, dst)?;
                let b = self.read_operand(instr, src)?;
                let carry = instr.op == Op::Adc && self.state.flags().contains(Flags::CF);
                let res = add_with(instr.width, a, b, carry);
                self.set_arith_flags(instr.width, &res);
                self.write_operand(instr, dst, res.value)?;
            }
            Op::Sub | Op::Sbb | Op::Cmp => {
                let (dst, src) = pair(instr);
                let a = self.read_operand(instr, dst)?;
                let b = self.read_operand(instr, src)?;
                let borrow = instr.op == Op::Sbb && self.state.flags().contains(Flags::CF);
                let res = sub_with(instr.width, a, b, borrow);
                self.set_arith_flags(instr.width, &res);
                if instr.op != Op::Cmp {
                    self.write_operand(instr, dst, res.value)?;
                }
            }
            Op::And | Op::Or | Op::Xor | Op::Test => {
                let (dst, src) = pair(instr);
                let a = self.read_operand(instr, dst)?;
                let b = self.read_operand(instr, src)?;
                let value = match instr.op {
                    Op::And | Op::Test => a & b,
                    Op::Or => a | b,
                    _ => a ^ b,
                };
                self.set_logic_flags(instr.width, value);
                if instr.op != Op::Test {
                    self.write_operand(instr, dst, value)?;
                }
            }
            Op::Inc | Op::Dec => {
                let target = single(instr);
                let a = self.read_operand(instr, target)?;
                let res = match instr.op {
                    Op::Inc => add_with(instr.width, a, 1, false),
                    _ => sub_with(instr.width, a, 1, false),
                };
                // inc and dec leave the carry flag untouched
                let carry = self.state.flags().contains(Flags::CF);
                self.set_arith_flags(instr.width, &res);
                self.state.flags_mut().set_to(Flags::CF, carry);
                self.write_operand(instr, target, res.value)?;
            }
            Op::Neg => {
                let target = single(instr);
                let a = self.read_operand(instr, target)?;
                let res = sub_with(instr.width, 0, a, false);
                self.set_arith_flags(instr.width, &res);
                self.write_operand(instr, target, res.value)?;
            }
            Op::Not => {
                let target = single(instr);
                let a = self.read_operand(instr, target)?;
                // the one logic op that leaves every flag alone
                self.write_operand(instr, target, !a & instr.width.mask())?;
            }
            Op::Cbw => {
                let al = self.state.get(Register::A.low());
                self.state
                    .set(Register::A.word(), al as u8 as i8 as i16 as u16);
            }
            Op::Cwd => {
                let ax = self.state.get(Register::A.word());
                let fill = if ax & 0x8000 != 0 { 0xFFFF } else { 0 };
                self.state.set(Register::D.word(), fill);
            }
            Op::Jo
            | Op::Jno
            | Op::Jb
            | Op::Jnb
            | Op::Je
            | Op::Jnz
            | Op::Jbe
            | Op::Ja
            | Op::Js
            | Op::Jns
            | Op::Jp
            | Op::Jnp
            | Op::Jl
            | Op::Jnl
            | Op::Jle
            | Op::Jnle => {
                let take = self.condition(instr.op);
                if take {
                    let target = self.branch_target(instr)?;
                    self.state.set_ip(target);
                }
                return Ok(take);
            }
            Op::Loop | Op::Loopz | Op::Loopnz => {
                let cx = self.state.get(Register::C.word()).wrapping_sub(1);
                self.state.set(Register::C.word(), cx);
                let zf = self.state.flags().contains(Flags::ZF);
                let take = match instr.op {
                    Op::Loop => cx != 0,
                    Op::Loopz => cx != 0 && zf,
                    _ => cx != 0 && !zf,
                };
                if take {
                    let target = self.branch_target(instr)?;
                    self.state.set_ip(target);
                }
                return Ok(take);
            }
            Op::Jcxz => {
                let take = self.state.get(Register::C.word()) == 0;
                if take {
                    let target = self.branch_target(instr)?;
                    self.state.set_ip(target);
                }
                return Ok(take);
            }
            Op::Jmp => {
                let target = self.branch_target(instr)?;
                self.state.set_ip(target);
                return Ok(true);
            }
            Op::Call => {
                // resolve the target before pushing so a bad operand has no
                // side effects
                let target = self.branch_target(instr)?;
                self.push_word(self.state.ip())?;
                self.state.set_ip(target);
                return Ok(true);
            }
            Op::Ret => {
                let target = self.pop_word()?;
                self.state.set_ip(target);
                if let Some(Operand::Imm(Immediate::Value(n))) = instr.operands.first() {
                    let sp = self.state.get(Register::Sp.word()).wrapping_add(*n as u16);
                    self.state.set(Register::Sp.word(), sp);
                }
                return Ok(true);
            }
            Op::Push => {
                let value = self.read_operand(instr, single(instr))?;
                self.push_word(value)?;
            }
            Op::Pop => {
                let value = self.pop_word()?;
                self.write_operand(instr, single(instr), value)?;
            }
            Op::Clc => self.state.flags_mut().set_to(Flags::CF, false),
            Op::Stc => self.state.flags_mut().set_to(Flags::CF, true),
            Op::Cmc => {
                let carry = self.state.flags().contains(Flags::CF);
                self.state.flags_mut().set_to(Flags::CF, !carry);
            }
            Op::Cld => self.state.flags_mut().set_to(Flags::DF, false),
            Op::Std => self.state.flags_mut().set_to(Flags::DF, true),
            Op::Cli => self.state.flags_mut().set_to(Flags::IF, false),
            Op::Sti => self.state.flags_mut().set_to(Flags::IF, true),
            Op::Lahf => {
                // ah <- SF ZF x AF x PF 1 CF, the 8080-compatible flag byte
                let flags = self.state.flags().bits() as u8;
                let ah = flags & 0b1101_0101 | 0b10;
                self.state.set(Register::A.high(), u16::from(ah));
            }
            Op::Sahf => {
                let ah = self.state.get(Register::A.high()) as u8;
                let keep = self.state.flags().bits() & !0b1101_0101;
                let bits = keep | u16::from(ah & 0b1101_0101);
                *self.state.flags_mut() = Flags::from_bits_truncate(bits);
            }
            Op::In => {
                let (dst, port) = pair(instr);
                let port = self.read_operand(instr, port)?;
                debug!("in: port {:#x} has no device attached, reading 0", port);
                self.write_operand(instr, dst, 0)?;
            }
            Op::Out => {
                let (port, src) = pair(instr);
                let port = self.read_operand(instr, port)?;
                let value = self.read_operand(instr, src)?;
                debug!("out: dropping {:#x} written to port {:#x}", value, port);
            }
            _ => return Err(InterpreterError::unimplemented(instr)),
        }

        Ok(false)
    }

    /// Reads an operand's current value, zero-extended to 16 bits.
    fn read_operand(&self, instr: &Instr, operand: &Operand) -> Result<u16, InterpreterError> {
        Ok(match operand {
            Operand::Reg(reg) => self.state.get(*reg),
            Operand::Imm(Immediate::Value(value)) => (*value as u16) & instr.width.mask(),
            Operand::Mem(mem) => {
                let addr = self.effective_address(mem);
                match instr.width {
                    Width::Byte => self.state.mem().load(addr)?.into(),
                    Width::Word => self.state.mem().load_u16(addr)?,
                }
            }
            _ => return Err(InterpreterError::unimplemented(instr)),
        })
    }

    /// Stores a value to a register or memory operand.
    fn write_operand(
        &mut self,
        instr: &Instr,
        operand: &Operand,
        value: u16,
    ) -> Result<(), InterpreterError> {
        match operand {
            Operand::Reg(reg) => self.state.set(*reg, value),
            Operand::Mem(mem) => {
                let addr = self.effective_address(mem);
                match instr.width {
                    Width::Byte => self.state.mem_mut().store(addr, value as u8)?,
                    Width::Word => self.state.mem_mut().store_u16(addr, value)?,
                }
            }
            _ => return Err(InterpreterError::unimplemented(instr)),
        }

        Ok(())
    }

    /// Computes the flat address a memory operand refers to right now.
    ///
    /// Register contents and the displacement are summed as unsigned words,
    /// wrapping at 64 KiB like the real address arithmetic.
    fn effective_address(&self, mem: &MemoryLocation) -> u32 {
        let mut addr = 0u16;
        for reg in mem.base.iter().chain(mem.index.iter()) {
            addr = addr.wrapping_add(self.state.get(*reg));
        }
        u32::from(addr.wrapping_add(mem.disp as u16))
    }

    /// Resolves a near branch target operand to the new `ip` value.
    fn branch_target(&self, instr: &Instr) -> Result<u16, InterpreterError> {
        if instr.is_far {
            return Err(InterpreterError::unimplemented(instr));
        }
        match instr.operands.first() {
            Some(Operand::Imm(Immediate::RelOffset(offset))) => {
                Ok(self.state.ip().wrapping_add(*offset as u16))
            }
            Some(Operand::Reg(reg)) => Ok(self.state.get(*reg)),
            Some(Operand::Mem(mem)) => {
                let addr = self.effective_address(mem);
                Ok(self.state.mem().load_u16(addr)?)
            }
            _ => Err(InterpreterError::unimplemented(instr)),
        }
    }

    /// Pushes a word, moving `sp` down by two.
    fn push_word(&mut self, value: u16) -> Result<(), InterpreterError> {
        let sp = self.state.get(Register::Sp.word()).wrapping_sub(2);
        self.state.mem_mut().store_u16(u32::from(sp), value)?;
        self.state.set(Register::Sp.word(), sp);
        Ok(())
    }

    /// Pops a word, moving `sp` up by two.
    fn pop_word(&mut self) -> Result<u16, InterpreterError> {
        let sp = self.state.get(Register::Sp.word());
        let value = self.state.mem().load_u16(u32::from(sp))?;
        self.state.set(Register::Sp.word(), sp.wrapping_add(2));
        Ok(value)
    }

    /// Checks a conditional jump's predicate against the current flags.
    fn condition(&self, op: Op) -> bool {
        let flags = self.state.flags();
        let sf = flags.contains(Flags::SF);
        let of = flags.contains(Flags::OF);
        let zf = flags.contains(Flags::ZF);
        let cf = flags.contains(Flags::CF);
        let pf = flags.contains(Flags::PF);

        match op {
            Op::Jo => of,
            Op::Jno => !of,
            Op::Jb => cf,
            Op::Jnb => !cf,
            Op::Je => zf,
            Op::Jnz => !zf,
            Op::Jbe => cf || zf,
            Op::Ja => !cf && !zf,
            Op::Js => sf,
            Op::Jns => !sf,
            Op::Jp => pf,
            Op::Jnp => !pf,
            Op::Jl => sf != of,
            Op::Jnl => sf == of,
            Op::Jle => zf || sf != of,
            Op::Jnle => !zf && sf == of,
            _ => unreachable!("not a conditional jump: {:?}", op),
        }
    }

    /// Sets the sign, zero and parity flags from a result value.
    fn set_szp_flags(&mut self, width: Width, value: u16) {
        let flags = self.state.flags_mut();
        flags.set_to(Flags::SF, value & width.sign_bit() != 0);
        flags.set_to(Flags::ZF, value & width.mask() == 0);
        // parity only ever considers the low 8 bits
        flags.set_to(Flags::PF, (value as u8).count_ones() % 2 == 0);
    }

    fn set_arith_flags(&mut self, width: Width, res: &ArithResult) {
        self.set_szp_flags(width, res.value);
        let flags = self.state.flags_mut();
        flags.set_to(Flags::CF, res.carry);
        flags.set_to(Flags::OF, res.overflow);
        flags.set_to(Flags::AF, res.aux);
    }

    fn set_logic_flags(&mut self, width: Width, value: u16) {
        self.set_szp_flags(width, value);
        let flags = self.state.flags_mut();
        flags.set_to(Flags::CF, false);
        flags.set_to(Flags::OF, false);
        flags.set_to(Flags::AF, false);
    }
}

fn pair(instr: &Instr) -> (&Operand, &Operand) {
    match &instr.operands {
        Operands::Two(a, b) => (a, b),
        _ => panic!("two-operand instruction without two operands: {}", instr),
    }
}

fn single(instr: &Instr) -> &Operand {
    match &instr.operands {
        Operands::One(operand) => operand,
        _ => panic!("one-operand instruction without exactly one operand: {}", instr),
    }
}

/// Result of a width-aware add or subtract, with the carry chain outputs.
struct ArithResult {
    value: u16,
    carry: bool,
    overflow: bool,
    aux: bool,
}

fn add_with(width: Width, a: u16, b: u16, carry_in: bool) -> ArithResult {
    let carry_in = u32::from(carry_in);
    let mask = u32::from(width.mask());
    let sign = u32::from(width.sign_bit());

    let (a, b) = (u32::from(a) & mask, u32::from(b) & mask);
    let wide = a + b + carry_in;
    let value = wide & mask;

    ArithResult {
        value: value as u16,
        carry: wide > mask,
        // inputs agree in sign but the result does not
        overflow: (a & sign) == (b & sign) && (value & sign) != (a & sign),
        aux: (a & 0xF) + (b & 0xF) + carry_in > 0xF,
    }
}

fn sub_with(width: Width, a: u16, b: u16, borrow_in: bool) -> ArithResult {
    let borrow_in = u32::from(borrow_in);
    let mask = u32::from(width.mask());
    let sign = u32::from(width.sign_bit());

    let (a, b) = (u32::from(a) & mask, u32::from(b) & mask);
    let value = a.wrapping_sub(b).wrapping_sub(borrow_in) & mask;

    ArithResult {
        value: value as u16,
        carry: b + borrow_in > a,
        // inputs differ in sign and the result took the subtrahend's
        overflow: (a & sign) != (b & sign) && (value & sign) == (b & sign),
        aux: (b & 0xF) + borrow_in > (a & 0xF),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    /// Error while decoding an instruction.
    Decode(DecoderError),
    /// Memory access error during execution of an instruction.
    Memory(MemoryError),
    /// The instruction decoded fine, but this interpreter cannot execute it.
    Unimplemented(String),
}

impl InterpreterError {
    fn unimplemented(instr: &Instr) -> Self {
        InterpreterError::Unimplemented(instr.to_string())
    }
}

impl From<DecoderError> for InterpreterError {
    fn from(e: DecoderError) -> Self {
        InterpreterError::Decode(e)
    }
}

impl From<MemoryError> for InterpreterError {
    fn from(e: MemoryError) -> Self {
        InterpreterError::Memory(e)
    }
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpreterError::Decode(err) => err.fmt(f),
            InterpreterError::Memory(err) => err.fmt(f),
            InterpreterError::Unimplemented(instr) => {
                write!(f, "unimplemented instruction: {}", instr)
            }
        }
    }
}

impl Error for InterpreterError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(hex: &str) -> Interpreter {
        let bytes = hex
            .split_whitespace()
            .map(|c| u8::from_str_radix(c, 16).unwrap())
            .collect::<Vec<_>>();
        Interpreter::new(bytes)
    }

    fn run(hex: &str) -> Interpreter {
        let mut int = program(hex);
        while !int.done() {
            int.step().unwrap();
        }
        int
    }

    #[test]
    fn immediate_moves_and_register_portions() {
        let int = run("B8 22 11 B5 07");
        assert_eq!(int.state().get(Register::A.word()), 0x1122);
        assert_eq!(int.state().get(Register::C.high()), 0x07);
        assert_eq!(int.state().get(Register::C.word()), 0x0700);
    }

    #[test]
    fn addition_wraps_and_sets_flags() {
        // mov ax, 0xffff / add ax, 1
        let int = run("B8 FF FF 05 01 00");
        assert_eq!(int.state().get(Register::A.word()), 0);
        let flags = int.state().flags();
        assert!(flags.contains(Flags::CF | Flags::ZF | Flags::AF | Flags::PF));
        assert!(!flags.contains(Flags::OF));
        assert!(!flags.contains(Flags::SF));
    }

    #[test]
    fn subtraction_borrows() {
        // mov ax, 3 / sub ax, 5
        let int = run("B8 03 00 2D 05 00");
        assert_eq!(int.state().get(Register::A.word()), 0xFFFE);
        let flags = int.state().flags();
        assert!(flags.contains(Flags::CF));
        assert!(flags.contains(Flags::SF));
        assert!(!flags.contains(Flags::ZF));
        assert!(!flags.contains(Flags::OF));
    }

    #[test]
    fn signed_overflow() {
        // mov ax, 0x7fff / add ax, 1: positive + positive -> negative
        let int = run("B8 FF 7F 05 01 00");
        assert_eq!(int.state().get(Register::A.word()), 0x8000);
        let flags = int.state().flags();
        assert!(flags.contains(Flags::OF));
        assert!(flags.contains(Flags::SF));
        assert!(!flags.contains(Flags::CF));

        // mov ax, 0x8000 / sub ax, 1: negative - positive -> positive
        let int = run("B8 00 80 2D 01 00");
        assert_eq!(int.state().get(Register::A.word()), 0x7FFF);
        let flags = int.state().flags();
        assert!(flags.contains(Flags::OF));
        assert!(!flags.contains(Flags::SF));
        assert!(!flags.contains(Flags::CF));
    }

    #[test]
    fn negate_sets_carry_for_nonzero() {
        // mov ax, 5 / neg ax
        let int = run("B8 05 00 F7 D8");
        assert_eq!(int.state().get(Register::A.word()), 0xFFFB);
        assert!(int.state().flags().contains(Flags::CF));
    }

    #[test]
    fn sign_extension() {
        // mov ax, 0xff / cbw
        let int = run("B8 FF 00 98");
        assert_eq!(int.state().get(Register::A.word()), 0xFFFF);
    }

    #[test]
    fn conditional_loop_runs_until_zero() {
        // mov cx, 2 / dec cx / jnz back to the dec / mov ax, 42
        let int = run("B9 02 00 49 75 FD B8 2A 00");
        assert_eq!(int.state().get(Register::C.word()), 0);
        assert_eq!(int.state().get(Register::A.word()), 42);
        assert_eq!(int.state().ip(), 9);
        // 4 + 2 + 16 + 2 + 4 + 4: the taken branch dominates
        assert_eq!(int.state().clocks(), 32);
    }

    #[test]
    fn accumulator_byte_arithmetic() {
        // mov al, 5 / add al, 3
        let int = run("B0 05 04 03");
        assert_eq!(int.state().get(Register::A.low()), 8);
        let flags = int.state().flags();
        assert!(!flags.contains(Flags::ZF));
        assert!(!flags.contains(Flags::CF));
    }

    #[test]
    fn taken_branch_lands_past_the_displacement() {
        // je +2 at address 0: 2 instruction bytes plus the displacement
        let mut int = program("74 02 90 90");
        int.state_mut().flags_mut().insert(Flags::ZF);
        let step = int.step().unwrap();
        assert_eq!(step.after.ip, 4);

        let mut int = program("74 02 90 90");
        let step = int.step().unwrap();
        // not taken: ip stays at its post-fetch value
        assert_eq!(step.after.ip, 2);
    }

    #[test]
    fn loop_branches_until_the_counter_hits_zero() {
        // loop to itself with cx = 1: decrements and falls through
        let mut int = program("E2 FE");
        int.state_mut().set(Register::C.word(), 1);
        let step = int.step().unwrap();
        assert_eq!(step.after.reg(Register::C), 0);
        assert_eq!(step.after.ip, 2);

        // with cx = 2 the branch is taken, back to the loop itself
        let mut int = program("E2 FE");
        int.state_mut().set(Register::C.word(), 2);
        let step = int.step().unwrap();
        assert_eq!(step.after.reg(Register::C), 1);
        assert_eq!(step.after.ip, 0);
    }

    #[test]
    fn loop_decrements_cx_without_flags() {
        // mov cx, 3 / loop to itself
        let int = run("B9 03 00 E2 FE");
        assert_eq!(int.state().get(Register::C.word()), 0);
        // loop must not touch the zero flag even when cx hits zero
        assert!(!int.state().flags().contains(Flags::ZF));
    }

    #[test]
    fn memory_operands_round_trip() {
        // mov bp, 16 / mov word [bp - 2], 153 / mov bx, [bp - 2]
        let int = run("BD 10 00 C7 46 FE 99 00 8B 5E FE");
        assert_eq!(int.state().get(Register::B.word()), 153);
        assert_eq!(int.state().mem().load_u16(14).unwrap(), 153);
    }

    #[test]
    fn effective_addresses_wrap_at_64k() {
        // mov word [bp - 2], 153 with bp = 0: the address adder wraps to the
        // top of the 64 KiB range instead of faulting
        let int = run("C7 46 FE 99 00");
        assert_eq!(int.state().mem().load_u16(0xFFFE).unwrap(), 153);
    }

    #[test]
    fn stack_round_trips() {
        // mov sp, 0x200 / mov ax, 0xabcd / push ax / pop bx
        let int = run("BC 00 02 B8 CD AB 50 5B");
        assert_eq!(int.state().get(Register::B.word()), 0xABCD);
        assert_eq!(int.state().get(Register::Sp.word()), 0x200);
        assert_eq!(int.state().mem().load_u16(0x1FE).unwrap(), 0xABCD);
    }

    #[test]
    fn call_pushes_the_return_address() {
        // 0: mov sp, 0x100    3: call the routine at 12
        // 6: add ax, 10       9: jmp past the end      11: nop (never runs)
        // 12: mov ax, 5       15: ret
        let int = run("BC 00 01 E8 06 00 05 0A 00 EB 05 90 B8 05 00 C3");
        assert_eq!(int.state().get(Register::A.word()), 15);
        assert_eq!(int.state().get(Register::Sp.word()), 0x100);
        assert_eq!(int.state().ip(), 16);
    }

    #[test]
    fn unimplemented_instructions_report_their_listing() {
        let mut int = program("F4");
        assert_eq!(
            int.step().unwrap_err(),
            InterpreterError::Unimplemented("hlt".to_string())
        );
    }

    #[test]
    fn step_reports_the_state_delta() {
        let mut int = program("B8 05 00");
        let step = int.step().unwrap();
        assert_eq!(step.instr.to_string(), "mov ax, 5");
        assert_eq!(step.instr.clocks, Some(4));
        assert_eq!(step.before.reg(Register::A), 0);
        assert_eq!(step.after.reg(Register::A), 5);
        assert_eq!(step.after.ip, 3);
    }
}
