//! Instruction timing estimates.
//!
//! The values follow the original 8086 datasheet tables. They ignore wait
//! states and the prefetch queue entirely, so for memory-heavy code the real
//! chip is slower than the estimate, but the relative weight of addressing
//! modes is preserved.

use crate::cpu::instr::*;

/// Estimated clock count for one execution of `instr`.
///
/// `taken` tells whether a conditional transfer actually branched, which
/// roughly quadruples its cost.
pub fn cost(instr: &Instr, taken: bool) -> u32 {
    let base = base_cost(instr, taken);
    match instr.segment {
        Some(_) => base + 2,
        None => base,
    }
}

/// Clocks charged for computing a memory operand's effective address.
///
/// A displacement of zero costs the same as no displacement at all, even
/// when the encoding spends bytes on it.
fn ea_clocks(mem: &MemoryLocation) -> u32 {
    match (mem.reg_count(), mem.disp != 0) {
        (0, _) => 6,
        (1, false) => 5,
        (1, true) => 9,
        (2, false) => 7,
        (2, true) => 11,
        _ => unreachable!("memory operand with more than two registers"),
    }
}

fn base_cost(instr: &Instr, taken: bool) -> u32 {
    match instr.op {
        Op::Mov => mov_cost(instr),
        Op::Add | Op::Adc | Op::Sub | Op::Sbb | Op::And | Op::Or | Op::Xor => alu_cost(instr),
        Op::Cmp => cmp_cost(instr),
        Op::Test => test_cost(instr),
        Op::Xchg => xchg_cost(instr),
        Op::Inc | Op::Dec => inc_cost(instr),
        Op::Neg | Op::Not => neg_cost(instr),
        Op::Lea => match instr.operands.second() {
            Some(Operand::Mem(mem)) => 2 + ea_clocks(mem),
            _ => 0,
        },
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
        | Op::Jnle => branch(taken, 16, 4),
        Op::Loop => branch(taken, 17, 5),
        Op::Loopz => branch(taken, 18, 6),
        Op::Loopnz => branch(taken, 19, 5),
        Op::Jcxz => branch(taken, 18, 6),
        Op::Jmp => transfer_cost(instr, 15, 11, 18),
        Op::Call => transfer_cost(instr, 19, 16, 21),
        Op::Ret => match instr.operands.first() {
            Some(_) => 20,
            None => 16,
        },
        Op::Push => match instr.operands.first() {
            Some(Operand::Reg(_)) => 11,
            Some(Operand::Seg(_)) => 10,
            Some(Operand::Mem(mem)) => 16 + ea_clocks(mem),
            _ => 0,
        },
        Op::Pop => match instr.operands.first() {
            Some(Operand::Reg(_)) | Some(Operand::Seg(_)) => 8,
            Some(Operand::Mem(mem)) => 17 + ea_clocks(mem),
            _ => 0,
        },
        Op::Cbw => 2,
        Op::Cwd => 5,
        Op::Clc | Op::Cmc | Op::Stc | Op::Cld | Op::Std | Op::Cli | Op::Sti => 2,
        Op::Lahf | Op::Sahf => 4,
        Op::In | Op::Out => io_cost(instr),
        // anything else is outside the metered subset
        _ => 0,
    }
}

fn branch(taken: bool, yes: u32, no: u32) -> u32 {
    if taken {
        yes
    } else {
        no
    }
}

fn two(instr: &Instr) -> Option<(&Operand, &Operand)> {
    match &instr.operands {
        Operands::Two(a, b) => Some((a, b)),
        _ => None,
    }
}

fn mov_cost(instr: &Instr) -> u32 {
    match two(instr) {
        Some((Operand::Reg(reg), Operand::Mem(mem))) => {
            if accumulator_direct(reg, mem, instr.width) {
                10
            } else {
                8 + ea_clocks(mem)
            }
        }
        Some((Operand::Mem(mem), Operand::Reg(reg))) => {
            if accumulator_direct(reg, mem, instr.width) {
                10
            } else {
                9 + ea_clocks(mem)
            }
        }
        Some((Operand::Reg(_), Operand::Reg(_)))
        | Some((Operand::Reg(_), Operand::Seg(_)))
        | Some((Operand::Seg(_), Operand::Reg(_))) => 2,
        Some((Operand::Reg(_), Operand::Imm(_))) => 4,
        Some((Operand::Mem(mem), Operand::Imm(_))) => 10 + ea_clocks(mem),
        Some((Operand::Seg(_), Operand::Mem(mem))) => 8 + ea_clocks(mem),
        Some((Operand::Mem(mem), Operand::Seg(_))) => 9 + ea_clocks(mem),
        _ => 0,
    }
}

/// The `mov` forms with a dedicated accumulator/direct-address encoding
/// transfer in a flat 10 clocks, with no effective address computation.
fn accumulator_direct(reg: &RegisterLocation, mem: &MemoryLocation, width: Width) -> bool {
    let acc = match width {
        Width::Word => reg.portion == Portion::Word,
        Width::Byte => reg.portion == Portion::Low,
    };
    reg.reg == Register::A && acc && mem.reg_count() == 0
}

fn alu_cost(instr: &Instr) -> u32 {
    match two(instr) {
        Some((Operand::Reg(_), Operand::Reg(_))) => 3,
        Some((Operand::Reg(_), Operand::Mem(mem))) => 9 + ea_clocks(mem),
        Some((Operand::Mem(mem), Operand::Reg(_))) => 16 + ea_clocks(mem),
        Some((Operand::Reg(_), Operand::Imm(_))) => 4,
        Some((Operand::Mem(mem), Operand::Imm(_))) => 17 + ea_clocks(mem),
        _ => 0,
    }
}

fn cmp_cost(instr: &Instr) -> u32 {
    match two(instr) {
        Some((Operand::Reg(_), Operand::Reg(_))) => 3,
        Some((Operand::Reg(_), Operand::Mem(mem)))
        | Some((Operand::Mem(mem), Operand::Reg(_))) => 9 + ea_clocks(mem),
        Some((Operand::Reg(_), Operand::Imm(_))) => 4,
        Some((Operand::Mem(mem), Operand::Imm(_))) => 10 + ea_clocks(mem),
        _ => 0,
    }
}

fn test_cost(instr: &Instr) -> u32 {
    match two(instr) {
        Some((Operand::Reg(_), Operand::Reg(_))) => 3,
        Some((Operand::Reg(_), Operand::Mem(mem)))
        | Some((Operand::Mem(mem), Operand::Reg(_))) => 9 + ea_clocks(mem),
        Some((Operand::Reg(reg), Operand::Imm(_))) => {
            if reg.reg == Register::A {
                4
            } else {
                5
            }
        }
        Some((Operand::Mem(mem), Operand::Imm(_))) => 11 + ea_clocks(mem),
        _ => 0,
    }
}

fn xchg_cost(instr: &Instr) -> u32 {
    match two(instr) {
        Some((Operand::Reg(a), Operand::Reg(b))) => {
            if instr.width == Width::Word && (full_acc(a) || full_acc(b)) {
                3
            } else {
                4
            }
        }
        Some((Operand::Reg(_), Operand::Mem(mem)))
        | Some((Operand::Mem(mem), Operand::Reg(_))) => 17 + ea_clocks(mem),
        _ => 0,
    }
}

fn full_acc(reg: &RegisterLocation) -> bool {
    reg.reg == Register::A && reg.portion == Portion::Word
}

fn inc_cost(instr: &Instr) -> u32 {
    match instr.operands.first() {
        Some(Operand::Reg(reg)) => match reg.portion {
            Portion::Word => 2,
            _ => 3,
        },
        Some(Operand::Mem(mem)) => 15 + ea_clocks(mem),
        _ => 0,
    }
}

fn neg_cost(instr: &Instr) -> u32 {
    match instr.operands.first() {
        Some(Operand::Reg(_)) => 3,
        Some(Operand::Mem(mem)) => 16 + ea_clocks(mem),
        _ => 0,
    }
}

/// Costs for `jmp` and `call` keyed on the transfer target form: relative
/// displacement, register indirect, or memory indirect.
fn transfer_cost(instr: &Instr, rel: u32, reg: u32, mem_base: u32) -> u32 {
    match instr.operands.first() {
        Some(Operand::Imm(Immediate::RelOffset(_))) => rel,
        Some(Operand::Reg(_)) => reg,
        Some(Operand::Mem(mem)) => mem_base + ea_clocks(mem),
        _ => 0,
    }
}

fn io_cost(instr: &Instr) -> u32 {
    let fixed_port = match two(instr) {
        Some((Operand::Imm(_), _)) | Some((_, Operand::Imm(_))) => true,
        _ => false,
    };
    if fixed_port {
        10
    } else {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::Decoder;

    fn cost_of(hex: &str, taken: bool) -> u32 {
        let bytes = hex
            .split_whitespace()
            .map(|c| u8::from_str_radix(c, 16).unwrap())
            .collect::<Vec<_>>();
        let instr = Decoder::new(&bytes, 0).decode_next().unwrap();
        cost(&instr, taken)
    }

    #[test]
    fn effective_address_surcharges() {
        assert_eq!(cost_of("8B 16 E8 03", false), 8 + 6); // mov dx, [1000]
        assert_eq!(cost_of("8B 17", false), 8 + 5); // mov dx, [bx]
        assert_eq!(cost_of("8B 57 04", false), 8 + 9); // mov dx, [bx + 4]
        assert_eq!(cost_of("8B 11", false), 8 + 7); // mov dx, [bx + di]
        assert_eq!(cost_of("8B 51 06", false), 8 + 11); // mov dx, [bx + di + 6]

        // an encoded displacement of zero is free
        assert_eq!(cost_of("8B 57 00", false), 8 + 5);
    }

    #[test]
    fn conditional_transfers_pay_for_branching() {
        assert_eq!(cost_of("75 02", true), 16);
        assert_eq!(cost_of("75 02", false), 4);
        assert_eq!(cost_of("E2 FC", true), 17); // loop
        assert_eq!(cost_of("E2 FC", false), 5);
        assert_eq!(cost_of("E3 08", false), 6); // jcxz
    }

    #[test]
    fn segment_override_adds_two() {
        assert_eq!(cost_of("26 8B 17", false), 2 + 8 + 5); // mov dx, es:[bx]
    }

    #[test]
    fn accumulator_direct_moves_skip_ea() {
        assert_eq!(cost_of("A1 E8 03", false), 10); // mov ax, [1000]
        assert_eq!(cost_of("A3 E8 03", false), 10); // mov [1000], ax
    }

    #[test]
    fn arithmetic_forms() {
        assert_eq!(cost_of("01 D8", false), 3); // add ax, bx
        assert_eq!(cost_of("03 46 00", false), 9 + 5); // add ax, [bp]
        assert_eq!(cost_of("01 5E 00", false), 16 + 5); // add [bp], bx
        assert_eq!(cost_of("83 C1 14", false), 4); // add cx, 20
        assert_eq!(cost_of("FF 06 E8 03", false), 15 + 6); // inc word [1000]
    }

    #[test]
    fn stack_and_io() {
        assert_eq!(cost_of("50", false), 11); // push ax
        assert_eq!(cost_of("58", false), 8); // pop ax
        assert_eq!(cost_of("06", false), 10); // push es
        assert_eq!(cost_of("E4 C8", false), 10); // in al, 200
        assert_eq!(cost_of("EC", false), 8); // in al, dx
    }
}
