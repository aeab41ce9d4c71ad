//! Instruction disassembler and pretty printer.

use crate::cpu::instr::*;
use crate::cpu::state::Snapshot;

use termcolor::{Color, ColorSpec, WriteColor};

use std::fmt;
use std::io::Write;

/// Trait for assembly printing contexts.
///
/// This can be implemented to color specific parts of an instruction.
pub trait AsmPrinter {
    /// Print an instruction mnemonic/name.
    fn print_mnemonic(&mut self, mnemonic: &str);

    /// Prints a register operand (or part of an address expression).
    fn print_register(&mut self, name: &str);

    /// Prints an immediate operand.
    fn print_immediate(&mut self, imm: &str);

    /// Prints an address, displacement or branch target.
    fn print_addr_or_offset(&mut self, addr: &str);

    /// Print a string of symbol characters like `,[]+ `.
    fn print_symbols(&mut self, sym: &str);

    /// Prints a trailing comment, such as an execution trace.
    fn print_comment(&mut self, comment: &str);

    /// Called when the instruction is fully printed.
    fn done(&mut self);
}

/// Prints the instruction to a string, without formatting.
impl AsmPrinter for String {
    fn print_mnemonic(&mut self, mnemonic: &str) {
        self.push_str(mnemonic);
    }

    fn print_register(&mut self, name: &str) {
        self.push_str(name);
    }

    fn print_immediate(&mut self, imm: &str) {
        self.push_str(imm);
    }

    fn print_addr_or_offset(&mut self, addr: &str) {
        self.push_str(addr);
    }

    fn print_symbols(&mut self, sym: &str) {
        self.push_str(sym);
    }

    fn print_comment(&mut self, comment: &str) {
        self.push_str(comment);
    }

    fn done(&mut self) {}
}

const COLOR_MNEMONIC: Color = Color::Blue;
const COLOR_REGISTER: Color = Color::Red;
const COLOR_IMMEDIATE: Color = Color::Green;
const COLOR_ADDR: Color = Color::Cyan;
const COLOR_COMMENT: Color = Color::Yellow;

/// An `AsmPrinter` that writes colored text to a terminal stream.
pub struct TermPrinter<W: WriteColor> {
    w: W,
}

impl<W: WriteColor> fmt::Debug for TermPrinter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermPrinter").finish()
    }
}

impl<W: WriteColor> TermPrinter<W> {
    pub fn new(w: W) -> Self {
        Self { w }
    }

    fn print(&mut self, color: Color, text: &str) {
        self.w.set_color(ColorSpec::new().set_fg(Some(color))).unwrap();
        write!(self.w, "{}", text).unwrap();
        self.w.set_color(ColorSpec::new().set_fg(None)).unwrap();
    }
}

impl<W: WriteColor> AsmPrinter for TermPrinter<W> {
    fn print_mnemonic(&mut self, mnemonic: &str) {
        self.print(COLOR_MNEMONIC, mnemonic);
    }

    fn print_register(&mut self, name: &str) {
        self.print(COLOR_REGISTER, name);
    }

    fn print_immediate(&mut self, imm: &str) {
        self.print(COLOR_IMMEDIATE, imm);
    }

    fn print_addr_or_offset(&mut self, addr: &str) {
        self.print(COLOR_ADDR, addr);
    }

    fn print_symbols(&mut self, sym: &str) {
        write!(self.w, "{}", sym).unwrap();
    }

    fn print_comment(&mut self, comment: &str) {
        self.print(COLOR_COMMENT, comment);
    }

    fn done(&mut self) {}
}

/// Extension trait for internal use by the disassembly printer.
trait PrinterExt {
    fn space(&mut self);
    fn with_indirect<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self);
    fn print_memory(&mut self, mem: &MemoryLocation, segment: Option<SegmentReg>);
    fn print_operand(&mut self, operand: &Operand, instr: &Instr);
}

impl<P: AsmPrinter> PrinterExt for P {
    fn space(&mut self) {
        self.print_symbols(" ");
    }

    fn with_indirect<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.print_symbols("[");
        f(self);
        self.print_symbols("]");
    }

    fn print_memory(&mut self, mem: &MemoryLocation, segment: Option<SegmentReg>) {
        if let Some(seg) = segment {
            self.print_register(seg.name());
            self.print_symbols(":");
        }

        self.with_indirect(|p| {
            let mut lead = true;
            for reg in mem.base.iter().chain(mem.index.iter()) {
                if !lead {
                    p.print_symbols(" + ");
                }
                p.print_register(reg.name());
                lead = false;
            }

            if lead {
                // direct addressing; print the full unsigned address
                p.print_addr_or_offset(&(mem.disp as u16).to_string());
            } else if mem.disp != 0 {
                p.print_symbols(if mem.disp > 0 { " + " } else { " - " });
                p.print_addr_or_offset(&i32::from(mem.disp).abs().to_string());
            }
        });
    }

    fn print_operand(&mut self, operand: &Operand, instr: &Instr) {
        match operand {
            Operand::Reg(reg) => self.print_register(reg.name()),
            Operand::Seg(seg) => self.print_register(seg.name()),
            Operand::Mem(mem) => self.print_memory(mem, instr.segment),
            Operand::Imm(Immediate::Value(value)) => self.print_immediate(&value.to_string()),
            Operand::Imm(Immediate::RelOffset(offset)) => {
                // encoded relative to the following instruction, but printed
                // relative to the current one (`$` in assembler syntax)
                let delta = i32::from(*offset) + i32::from(instr.len);
                self.print_addr_or_offset(&format!("${:+}", delta));
            }
            Operand::Imm(Immediate::Far { segment, offset }) => {
                self.print_addr_or_offset(&format!("{}:{}", segment, offset));
            }
        }
    }
}

/// Prints the plain assembly form of `instr`.
pub fn print_instr<P: AsmPrinter>(instr: &Instr, p: &mut P) {
    instr_text(instr, p);
    p.done();
}

/// Prints `instr` followed by an execution trace comment built by diffing
/// the machine state snapshots taken around it.
pub fn print_trace<P: AsmPrinter>(instr: &Instr, before: &Snapshot, after: &Snapshot, p: &mut P) {
    instr_text(instr, p);
    p.print_symbols(" ; ");
    p.print_comment(&trace_comment(instr, before, after));
    p.done();
}

fn instr_text<P: AsmPrinter>(instr: &Instr, p: &mut P) {
    p.print_mnemonic(instr.op.name());
    if instr.op.needs_width_suffix() {
        p.print_mnemonic(match instr.width {
            Width::Byte => "b",
            Width::Word => "w",
        });
    }

    let rel_target = match instr.operands.first() {
        Some(Operand::Imm(Immediate::RelOffset(_))) => true,
        _ => false,
    };

    // keywords that pin down what the operand list alone cannot express
    if instr.is_far {
        p.space();
        p.print_mnemonic("far");
    } else if instr.needs_decorator {
        p.space();
        p.print_mnemonic(match instr.width {
            Width::Byte => "byte",
            Width::Word => "word",
        });
    } else if instr.op == Op::Jmp && instr.width == Width::Word && rel_target {
        // keep a word-displacement jmp from being assembled short
        p.space();
        p.print_mnemonic("near");
    }

    if let Some(first) = instr.operands.first() {
        p.space();
        p.print_operand(first, instr);
    }
    if let Some(second) = instr.operands.second() {
        p.print_symbols(", ");
        p.print_operand(second, instr);
    }
}

fn trace_comment(instr: &Instr, before: &Snapshot, after: &Snapshot) -> String {
    let mut parts = Vec::new();

    if let Some(clocks) = instr.clocks {
        parts.push(format!("clocks: +{} = {}", clocks, after.clocks));
    }

    for reg in &Register::ALL {
        let (old, new) = (before.reg(*reg), after.reg(*reg));
        if old != new {
            parts.push(format!("{}:{:#x}->{:#x}", reg.word().name(), old, new));
        }
    }

    parts.push(format!("ip:{:#x}->{:#x}", before.ip, after.ip));

    if before.flags != after.flags {
        parts.push(format!(
            "flags:{}->{}",
            before.flags.letters(),
            after.flags.letters()
        ));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::flags::Flags;

    #[test]
    fn memory_operand_forms() {
        let two_regs = MemoryLocation {
            base: Some(Register::B.word()),
            index: Some(Register::Si.word()),
            disp: -2,
        };
        let instr = Instr::binary(Op::Mov, Register::A.word(), two_regs, Width::Word);
        assert_eq!(instr.to_string(), "mov ax, [bx + si - 2]");

        // direct addresses print unsigned
        let direct = MemoryLocation::direct(0xF000u16 as i16);
        let instr = Instr::binary(Op::Mov, Register::A.low(), direct, Width::Byte);
        assert_eq!(instr.to_string(), "mov al, [61440]");
    }

    #[test]
    fn segment_override_tag() {
        let mem = MemoryLocation {
            base: Some(Register::B.word()),
            index: None,
            disp: 0,
        };
        let instr = Instr {
            segment: Some(SegmentReg::Es),
            ..Instr::binary(Op::Mov, Register::A.low(), mem, Width::Byte)
        };
        assert_eq!(instr.to_string(), "mov al, es:[bx]");
    }

    #[test]
    fn trace_comment_diffs() {
        let before = Snapshot {
            regs: [0; 8],
            flags: Flags::empty(),
            ip: 0,
            clocks: 0,
        };
        let mut after = before;
        after.regs[0] = 5;
        after.ip = 3;
        after.clocks = 4;

        let mut instr = Instr::binary(Op::Mov, Register::A.word(), Immediate::Value(5), Width::Word);
        instr.len = 3;
        instr.clocks = Some(4);

        let mut out = String::new();
        print_trace(&instr, &before, &after, &mut out);
        assert_eq!(out, "mov ax, 5 ; clocks: +4 = 4 ax:0x0->0x5 ip:0x0->0x3");
    }

    #[test]
    fn trace_comment_flags() {
        let mut before = Snapshot {
            regs: [0; 8],
            flags: Flags::CF | Flags::ZF,
            ip: 2,
            clocks: 4,
        };
        before.regs[1] = 0x7FFF;
        let mut after = before;
        after.regs[1] = 0x8000;
        after.ip = 3;
        after.clocks = 6;
        after.flags = Flags::CF | Flags::SF | Flags::AF;

        let mut instr = Instr::unary(Op::Inc, Register::B.word(), Width::Word);
        instr.len = 1;
        instr.clocks = Some(2);

        let mut out = String::new();
        print_trace(&instr, &before, &after, &mut out);
        assert_eq!(
            out,
            "inc bx ; clocks: +2 = 6 bx:0x7fff->0x8000 ip:0x2->0x3 flags:ZC->SAC"
        );
    }
}
