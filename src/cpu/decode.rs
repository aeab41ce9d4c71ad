//! 8086 instruction decoder.

use crate::cpu::bits::{extract_bit, extract_bits};
use crate::cpu::instr::*;

use num_traits::FromPrimitive;

use std::error::Error;
use std::fmt;

/// Conditional jump mnemonics for opcodes 0x70 through 0x7F, indexed by the
/// low nibble of the opcode byte.
const CONDITIONAL_JUMPS: [Op; 16] = [
    Op::Jo,
    Op::Jno,
    Op::Jb,
    Op::Jnb,
    Op::Je,
    Op::Jnz,
    Op::Jbe,
    Op::Ja,
    Op::Js,
    Op::Jns,
    Op::Jp,
    Op::Jnp,
    Op::Jl,
    Op::Jnl,
    Op::Jle,
    Op::Jnle,
];

/// 8086 machine instruction decoder.
#[derive(Debug)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    /// Offset of the next byte that will be consumed.
    pos: usize,
    /// Length of the instruction currently being decoded.
    len: u16,
}

impl<'a> Decoder<'a> {
    /// Creates a new instruction decoder.
    ///
    /// # Parameters
    ///
    /// * `bytes`: The instruction stream to read from.
    /// * `pos`: The offset at which to start decoding.
    pub fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self {
            bytes,
            pos,
            len: 0,
        }
    }

    /// Returns the offset of the first byte of the next instruction we're
    /// going to decode.
    ///
    /// This is incremented as `decode_next` is called.
    pub fn current_address(&self) -> usize {
        self.pos
    }

    /// Whether the decoder has consumed the whole stream.
    pub fn done(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Read and decode the next instruction in the stream.
    ///
    /// If this returns an error, the decoder's position most likely points
    /// into the middle of the instruction and the decoder should not be used
    /// for further instruction decoding.
    pub fn decode_next(&mut self) -> Result<Instr, DecoderError> {
        self.len = 0;

        let mut instr = self.decode_instr()?;
        instr.len = self.len;
        instr.needs_decorator = instr.decorator_by_rule() && !suppresses_decorator(instr.op);
        Ok(instr)
    }

    fn decode_instr(&mut self) -> Result<Instr, DecoderError> {
        let byte = self.read()?;

        // Most opcodes carry direction and width bits in their low two bits.
        // For some forms the direction position encodes something else
        // (sign extension, shift count source), handled per arm.
        let dir_bit = extract_bit(byte, 1);
        let wide_bit = extract_bit(byte, 0);
        let width = Width::from_w(wide_bit);

        let instr = match byte {
            0x26 | 0x2E | 0x36 | 0x3E => {
                // Segment override: decode the following instruction and tag
                // it. With stacked overrides, the one closest to the opcode
                // byte wins.
                let seg = segment_operand(extract_bits(byte, 3, 5))?;
                trace!("segment override {}: decoding prefixed instruction", seg);
                let mut instr = self.decode_instr()?;
                if instr.segment.is_none() {
                    instr.segment = Some(seg);
                }

                instr
            }
            0xF0 => Instr::new(Op::Lock, Width::Byte),
            0xF2 => Instr::new(Op::Repne, Width::Byte),
            0xF3 => Instr::new(Op::Rep, Width::Byte),
            _ if bitpat!(0 0 _ _ _ 0 _ _)(byte) => {
                // "Normal" ALU opcode with a Mod-Reg-R/M byte
                let op = AluOp::from_u8(extract_bits(byte, 3, 6))
                    .expect("couldn't turn 3-bit value into AluOp")
                    .op();
                let modrm = self.read_modrm()?;
                let reg: Operand = register_operand(wide_bit, modrm.reg())?.into();
                let rm = self.rm_operand(modrm, width)?;
                let (dest, src) = if dir_bit { (reg, rm) } else { (rm, reg) };

                Instr::binary(op, dest, src, width)
            }
            _ if bitpat!(0 0 _ _ _ 1 0 _)(byte) => {
                // ALU op with immediate and al/ax
                let op = AluOp::from_u8(extract_bits(byte, 3, 6))
                    .expect("couldn't turn 3-bit value into AluOp")
                    .op();
                let src = self.read_immediate(width)?;

                Instr::binary(op, accumulator(width), src, width)
            }
            _ if bitpat!(1 0 0 0 0 0 _ _)(byte) => {
                // ALU opcode group with immediate; the reg field selects the
                // operation and the direction position turns into a
                // sign-extension marker.
                let sign_ext = dir_bit;
                let modrm = self.read_modrm()?;
                let op = AluOp::from_u8(modrm.reg())
                    .expect("couldn't turn 3-bit value into AluOp")
                    .op();
                let dest = self.rm_operand(modrm, width)?;
                let src = if wide_bit && !sign_ext {
                    self.read_immediate(Width::Word)?
                } else {
                    // a single byte, sign-extended to the operation width
                    self.read_immediate(Width::Byte)?
                };

                Instr::binary(op, dest, src, width)
            }
            _ if bitpat!(1 0 0 0 1 0 _ _)(byte) => {
                // mov reg/mem <-> GP reg (basically, load/store)
                let modrm = self.read_modrm()?;
                let reg: Operand = register_operand(wide_bit, modrm.reg())?.into();
                let rm = self.rm_operand(modrm, width)?;
                let (dest, src) = if dir_bit { (reg, rm) } else { (rm, reg) };

                Instr::binary(Op::Mov, dest, src, width)
            }
            _ if bitpat!(1 0 1 1 _ _ _ _)(byte) => {
                // load immediate into register; the width bit sits at bit 3
                let wide = extract_bit(byte, 3);
                let width = Width::from_w(wide);
                let dest = register_operand(wide, extract_bits(byte, 0, 3))?;
                let src = self.read_immediate(width)?;

                Instr::binary(Op::Mov, dest, src, width)
            }
            _ if bitpat!(1 0 1 0 0 0 _ _)(byte) => {
                // mov between al/ax and an absolute memory address; the
                // direction bit is inverted relative to the Mod-Reg-R/M forms
                let mem = MemoryLocation::direct(self.read_i16()?);
                let acc = accumulator(width);
                let (dest, src): (Operand, Operand) = if dir_bit {
                    (mem.into(), acc.into())
                } else {
                    (acc.into(), mem.into())
                };

                Instr::binary(Op::Mov, dest, src, width)
            }
            0xC6 | 0xC7 => {
                // mov immediate to reg/mem; only sub-opcode 0 is defined
                let modrm = self.read_modrm()?;
                if modrm.reg() != 0 {
                    return Err(DecoderError::UnknownOpcode {
                        byte,
                        ext: Some(modrm.reg()),
                    });
                }
                let dest = self.rm_operand(modrm, width)?;
                let src = self.read_immediate(width)?;

                Instr::binary(Op::Mov, dest, src, width)
            }
            0x8C | 0x8E => {
                // mov between a segment register and a word-size reg/mem
                let modrm = self.read_modrm()?;
                let seg: Operand = segment_operand(modrm.reg())?.into();
                let rm = self.rm_operand(modrm, Width::Word)?;
                let (dest, src) = if byte == 0x8E { (seg, rm) } else { (rm, seg) };

                Instr::binary(Op::Mov, dest, src, Width::Word)
            }
            _ if bitpat!(0 0 0 _ _ 1 1 0)(byte) => {
                Instr::unary(Op::Push, segment_operand(extract_bits(byte, 3, 5))?, Width::Word)
            }
            _ if bitpat!(0 0 0 _ _ 1 1 1)(byte) => {
                Instr::unary(Op::Pop, segment_operand(extract_bits(byte, 3, 5))?, Width::Word)
            }
            _ if bitpat!(0 1 0 0 _ _ _ _)(byte) => {
                // inc/dec word register
                let is_dec = extract_bit(byte, 3);
                let reg = register_operand(true, extract_bits(byte, 0, 3))?;
                let op = if is_dec { Op::Dec } else { Op::Inc };

                Instr::unary(op, reg, Width::Word)
            }
            _ if bitpat!(0 1 0 1 _ _ _ _)(byte) => {
                // push/pop word register
                let is_pop = extract_bit(byte, 3);
                let reg = register_operand(true, extract_bits(byte, 0, 3))?;
                let op = if is_pop { Op::Pop } else { Op::Push };

                Instr::unary(op, reg, Width::Word)
            }
            _ if bitpat!(1 0 0 1 0 _ _ _)(byte) => {
                // xchg ax with a word register; 0x90 (ax with itself) is the
                // canonical nop
                let reg = register_operand(true, extract_bits(byte, 0, 3))?;

                Instr::binary(Op::Xchg, Register::A.word(), reg, Width::Word)
            }
            _ if bitpat!(1 0 0 0 0 1 _ _)(byte) => {
                // test/xchg with a Mod-Reg-R/M byte; the reg/mem operand is
                // rendered first so the encoding survives reassembly
                let op = if dir_bit { Op::Xchg } else { Op::Test };
                let modrm = self.read_modrm()?;
                let reg = register_operand(wide_bit, modrm.reg())?;
                let rm = self.rm_operand(modrm, width)?;

                Instr::binary(op, rm, reg, width)
            }
            0xA8 | 0xA9 => {
                // test al/ax against an immediate
                let src = self.read_immediate(width)?;

                Instr::binary(Op::Test, accumulator(width), src, width)
            }
            _ if bitpat!(0 1 1 1 _ _ _ _)(byte) => {
                // conditional short jumps
                let op = CONDITIONAL_JUMPS[usize::from(extract_bits(byte, 0, 4))];
                let offset = self.read_i8()?;

                Instr::unary(op, Immediate::RelOffset(offset.into()), Width::Byte)
            }
            0xE0..=0xE3 => {
                // loop family and jcxz, all with short displacements
                let op = match byte {
                    0xE0 => Op::Loopnz,
                    0xE1 => Op::Loopz,
                    0xE2 => Op::Loop,
                    _ => Op::Jcxz,
                };
                let offset = self.read_i8()?;

                Instr::unary(op, Immediate::RelOffset(offset.into()), Width::Byte)
            }
            _ if bitpat!(1 1 0 1 0 0 _ _)(byte) => {
                // shift/rotate group; the direction position selects a
                // constant-1 or cl-held count
                let modrm = self.read_modrm()?;
                let op = ShiftOp::from_u8(modrm.reg())
                    .ok_or(DecoderError::UnknownOpcode {
                        byte,
                        ext: Some(modrm.reg()),
                    })?
                    .op();
                let dest = self.rm_operand(modrm, width)?;
                let count: Operand = if dir_bit {
                    Register::C.low().into()
                } else {
                    Immediate::Value(1).into()
                };

                Instr::binary(op, dest, count, width)
            }
            _ if bitpat!(1 1 1 1 0 1 1 _)(byte) => {
                // test/not/neg/mul/imul/div/idiv group; the operand is the
                // R/M part of the ModRM byte, `reg` is the opcode extension
                let modrm = self.read_modrm()?;
                let group = Group3Op::from_u8(modrm.reg()).ok_or(DecoderError::UnknownOpcode {
                    byte,
                    ext: Some(modrm.reg()),
                })?;
                let operand = self.rm_operand(modrm, width)?;

                match group {
                    Group3Op::Test => {
                        let src = self.read_immediate(width)?;
                        Instr::binary(Op::Test, operand, src, width)
                    }
                    Group3Op::Not => Instr::unary(Op::Not, operand, width),
                    Group3Op::Neg => Instr::unary(Op::Neg, operand, width),
                    Group3Op::Mul => Instr::unary(Op::Mul, operand, width),
                    Group3Op::Imul => Instr::unary(Op::Imul, operand, width),
                    Group3Op::Div => Instr::unary(Op::Div, operand, width),
                    Group3Op::Idiv => Instr::unary(Op::Idiv, operand, width),
                }
            }
            0xFE => {
                // inc/dec on a byte reg/mem; the rest of the group is
                // undefined for this byte
                let modrm = self.read_modrm()?;
                let op = match modrm.reg() {
                    0 => Op::Inc,
                    1 => Op::Dec,
                    ext => {
                        return Err(DecoderError::UnknownOpcode {
                            byte,
                            ext: Some(ext),
                        });
                    }
                };
                let operand = self.rm_operand(modrm, Width::Byte)?;

                Instr::unary(op, operand, Width::Byte)
            }
            0xFF => {
                // inc/dec/call/jmp/push group
                let modrm = self.read_modrm()?;
                let group = Group5Op::from_u8(modrm.reg()).ok_or(DecoderError::UnknownOpcode {
                    byte,
                    ext: Some(modrm.reg()),
                })?;
                let operand = self.rm_operand(modrm, Width::Word)?;
                let (op, is_far) = match group {
                    Group5Op::Inc => (Op::Inc, false),
                    Group5Op::Dec => (Op::Dec, false),
                    Group5Op::Call => (Op::Call, false),
                    Group5Op::CallFar => (Op::Call, true),
                    Group5Op::Jmp => (Op::Jmp, false),
                    Group5Op::JmpFar => (Op::Jmp, true),
                    Group5Op::Push => (Op::Push, false),
                };

                Instr {
                    is_far,
                    ..Instr::unary(op, operand, Width::Word)
                }
            }
            0x8F => {
                // pop reg/mem; only sub-opcode 0 is defined
                let modrm = self.read_modrm()?;
                if modrm.reg() != 0 {
                    return Err(DecoderError::UnknownOpcode {
                        byte,
                        ext: Some(modrm.reg()),
                    });
                }
                let operand = self.rm_operand(modrm, Width::Word)?;

                Instr::unary(Op::Pop, operand, Width::Word)
            }
            0x8D | 0xC4 | 0xC5 => {
                // lea/les/lds load an address, so the R/M part must name
                // memory
                let op = match byte {
                    0x8D => Op::Lea,
                    0xC4 => Op::Les,
                    _ => Op::Lds,
                };
                let modrm = self.read_modrm()?;
                if modrm.mode() == 0b11 {
                    return Err(DecoderError::InvalidField {
                        field: "mod",
                        value: modrm.mode(),
                    });
                }
                let dest = register_operand(true, modrm.reg())?;
                let src = self.memory_operand(modrm)?;

                Instr::binary(op, dest, src, Width::Word)
            }
            0xE8 | 0xE9 => {
                // call/jmp with a word displacement
                let op = if byte == 0xE8 { Op::Call } else { Op::Jmp };
                let offset = self.read_i16()?;

                Instr::unary(op, Immediate::RelOffset(offset), Width::Word)
            }
            0xEB => {
                // jmp with a short displacement
                let offset = self.read_i8()?;

                Instr::unary(Op::Jmp, Immediate::RelOffset(offset.into()), Width::Byte)
            }
            0x9A | 0xEA => {
                // direct intersegment call/jmp: offset first, then segment
                let op = if byte == 0x9A { Op::Call } else { Op::Jmp };
                let offset = self.read_u16()?;
                let segment = self.read_u16()?;

                Instr::unary(op, Immediate::Far { segment, offset }, Width::Word)
            }
            0xC2 | 0xCA => {
                // ret with a stack-pop byte count
                let op = if byte == 0xC2 { Op::Ret } else { Op::Retf };
                let pop = self.read_i16()?;

                Instr::unary(op, Immediate::Value(pop), Width::Word)
            }
            0xC3 => Instr::new(Op::Ret, Width::Word),
            0xCB => Instr::new(Op::Retf, Width::Word),
            0xCC => Instr::new(Op::Int3, Width::Byte),
            0xCD => {
                let vector = self.read()?;

                Instr::unary(Op::Int, Immediate::Value(vector.into()), Width::Byte)
            }
            0xCE => Instr::new(Op::Into, Width::Byte),
            0xCF => Instr::new(Op::Iret, Width::Word),
            0xD4 | 0xD5 => {
                // aam/aad carry an explicit base byte that only shows up in
                // a listing when it isn't the default 10
                let op = if byte == 0xD4 { Op::Aam } else { Op::Aad };
                let base = self.read()?;

                if base == 10 {
                    Instr::new(op, Width::Byte)
                } else {
                    Instr::unary(op, Immediate::Value(base.into()), Width::Byte)
                }
            }
            0xA4 | 0xA5 => Instr::new(Op::Movs, width),
            0xA6 | 0xA7 => Instr::new(Op::Cmps, width),
            0xAA | 0xAB => Instr::new(Op::Stos, width),
            0xAC | 0xAD => Instr::new(Op::Lods, width),
            0xAE | 0xAF => Instr::new(Op::Scas, width),
            _ if bitpat!(1 1 1 0 0 1 _ _)(byte) => {
                // fixed-port in/out with an 8-bit port number
                let port = Immediate::Value(self.read()?.into());
                let acc = accumulator(width);

                if dir_bit {
                    Instr::binary(Op::Out, port, acc, width)
                } else {
                    Instr::binary(Op::In, acc, port, width)
                }
            }
            _ if bitpat!(1 1 1 0 1 1 _ _)(byte) => {
                // variable-port in/out through dx
                let port = Register::D.word();
                let acc = accumulator(width);

                if dir_bit {
                    Instr::binary(Op::Out, port, acc, width)
                } else {
                    Instr::binary(Op::In, acc, port, width)
                }
            }
            _ if bitpat!(1 1 0 1 1 _ _ _)(byte) => {
                // coprocessor escape; the low opcode bits and the reg field
                // form a 6-bit external opcode
                let modrm = self.read_modrm()?;
                let ext = extract_bits(byte, 0, 3) << 3 | modrm.reg();
                let operand = self.rm_operand(modrm, Width::Word)?;

                Instr::binary(Op::Esc, Immediate::Value(ext.into()), operand, Width::Word)
            }
            0x27 => Instr::new(Op::Daa, Width::Byte),
            0x2F => Instr::new(Op::Das, Width::Byte),
            0x37 => Instr::new(Op::Aaa, Width::Byte),
            0x3F => Instr::new(Op::Aas, Width::Byte),
            0x98 => Instr::new(Op::Cbw, Width::Word),
            0x99 => Instr::new(Op::Cwd, Width::Word),
            0x9B => Instr::new(Op::Wait, Width::Byte),
            0x9C => Instr::new(Op::Pushf, Width::Word),
            0x9D => Instr::new(Op::Popf, Width::Word),
            0x9E => Instr::new(Op::Sahf, Width::Byte),
            0x9F => Instr::new(Op::Lahf, Width::Byte),
            0xD7 => Instr::new(Op::Xlat, Width::Byte),
            0xF4 => Instr::new(Op::Hlt, Width::Byte),
            0xF5 => Instr::new(Op::Cmc, Width::Byte),
            0xF8 => Instr::new(Op::Clc, Width::Byte),
            0xF9 => Instr::new(Op::Stc, Width::Byte),
            0xFA => Instr::new(Op::Cli, Width::Byte),
            0xFB => Instr::new(Op::Sti, Width::Byte),
            0xFC => Instr::new(Op::Cld, Width::Byte),
            0xFD => Instr::new(Op::Std, Width::Byte),
            _ => return Err(DecoderError::UnknownOpcode { byte, ext: None }),
        };

        Ok(instr)
    }

    /// Read a single byte from the instruction stream.
    fn read(&mut self) -> Result<u8, DecoderError> {
        match self.bytes.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                self.len += 1;
                Ok(b)
            }
            None => Err(DecoderError::UnexpectedEnd { offset: self.pos }),
        }
    }

    fn read_i8(&mut self) -> Result<i8, DecoderError> {
        Ok(self.read()? as i8)
    }

    fn read_u16(&mut self) -> Result<u16, DecoderError> {
        let (lo, hi) = (u16::from(self.read()?), u16::from(self.read()?));

        Ok(hi << 8 | lo)
    }

    fn read_i16(&mut self) -> Result<i16, DecoderError> {
        Ok(self.read_u16()? as i16)
    }

    /// Reads a Mod-Reg-R/M byte from the instruction stream.
    fn read_modrm(&mut self) -> Result<ModRegRm, DecoderError> {
        Ok(ModRegRm(self.read()?))
    }

    /// Reads an immediate of the given width. A byte immediate is
    /// sign-extended to 16 bits.
    fn read_immediate(&mut self, width: Width) -> Result<Immediate, DecoderError> {
        Ok(match width {
            Width::Byte => Immediate::Value(self.read_i8()?.into()),
            Width::Word => Immediate::Value(self.read_i16()?),
        })
    }

    /// Resolves the R/M part of a Mod-Reg-R/M byte, reading displacement
    /// bytes from the stream as needed.
    ///
    /// The result is an operand of the instruction. Which one (source or
    /// dest) usually depends on the `D` (direction) bit in the opcode.
    fn rm_operand(&mut self, modrm: ModRegRm, width: Width) -> Result<Operand, DecoderError> {
        if modrm.mode() == 0b11 {
            return Ok(register_operand(width == Width::Word, modrm.rm())?.into());
        }

        Ok(self.memory_operand(modrm)?.into())
    }

    /// Resolves a memory-addressing R/M encoding.
    fn memory_operand(&mut self, modrm: ModRegRm) -> Result<MemoryLocation, DecoderError> {
        use crate::cpu::instr::Register::*;

        let (mode, rm) = (modrm.mode(), modrm.rm());

        // mod=00 with rm=110 is the direct-address escape; it steals the
        // slot the pattern table would give to [bp]
        if mode == 0b00 && rm == 0b110 {
            return Ok(MemoryLocation::direct(self.read_i16()?));
        }

        let (base, index) = match rm {
            0b000 => (Some(B.word()), Some(Si.word())),
            0b001 => (Some(B.word()), Some(Di.word())),
            0b010 => (Some(Bp.word()), Some(Si.word())),
            0b011 => (Some(Bp.word()), Some(Di.word())),
            0b100 => (Some(Si.word()), None),
            0b101 => (Some(Di.word()), None),
            0b110 => (Some(Bp.word()), None),
            0b111 => (Some(B.word()), None),
            value => return Err(DecoderError::InvalidField { field: "rm", value }),
        };

        let disp = match mode {
            0b00 => 0,
            0b01 => self.read_i8()?.into(),
            0b10 => self.read_i16()?,
            value => return Err(DecoderError::InvalidField { field: "mod", value }),
        };

        Ok(MemoryLocation { base, index, disp })
    }
}

/// Maps a 3-bit register field plus a width bit to the canonical 8086
/// register table.
pub fn register_operand(wide: bool, reg: u8) -> Result<RegisterLocation, DecoderError> {
    use crate::cpu::instr::Register::*;

    Ok(match (reg, wide) {
        (0b000, false) => A.low(),
        (0b000, true) => A.word(),
        (0b001, false) => C.low(),
        (0b001, true) => C.word(),
        (0b010, false) => D.low(),
        (0b010, true) => D.word(),
        (0b011, false) => B.low(),
        (0b011, true) => B.word(),
        (0b100, false) => A.high(),
        (0b100, true) => Sp.word(),
        (0b101, false) => C.high(),
        (0b101, true) => Bp.word(),
        (0b110, false) => D.high(),
        (0b110, true) => Si.word(),
        (0b111, false) => B.high(),
        (0b111, true) => Di.word(),
        (value, _) => return Err(DecoderError::InvalidField { field: "reg", value }),
    })
}

/// Maps a 2-bit segment register field.
fn segment_operand(field: u8) -> Result<SegmentReg, DecoderError> {
    Ok(match field {
        0b00 => SegmentReg::Es,
        0b01 => SegmentReg::Cs,
        0b10 => SegmentReg::Ss,
        0b11 => SegmentReg::Ds,
        value => return Err(DecoderError::InvalidField { field: "sr", value }),
    })
}

/// The accumulator register location for the given width.
fn accumulator(width: Width) -> RegisterLocation {
    match width {
        Width::Byte => Register::A.low(),
        Width::Word => Register::A.word(),
    }
}

/// Unary-immediate forms whose operand is a plain number an assembler sizes
/// itself; a `word`/`byte` decorator there would be rejected.
fn suppresses_decorator(op: Op) -> bool {
    match op {
        Op::Int | Op::Ret | Op::Retf | Op::Aam | Op::Aad | Op::Esc => true,
        _ => false,
    }
}

/// A Mod-Reg-R/M byte (also called Mod-R/M).
///
/// This is used by many opcodes to define their source and destination
/// operands and, if present, follows right after the opcode byte.
#[derive(Debug, Copy, Clone)]
struct ModRegRm(u8);

impl ModRegRm {
    /// The addressing mode selector: 0-2 name memory forms, 3 means the R/M
    /// field holds a second register.
    fn mode(&self) -> u8 {
        extract_bits(self.0, 6, 8)
    }

    /// The register operand, or the opcode extension for group encodings.
    fn reg(&self) -> u8 {
        extract_bits(self.0, 3, 6)
    }

    /// The register/memory operand selector.
    fn rm(&self) -> u8 {
        extract_bits(self.0, 0, 3)
    }
}

/// ALU operation selector, found in bits 5-3 of the opcode byte or in the
/// reg field of the 0x80 immediate group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
enum AluOp {
    Add = 0,
    Or = 1,
    Adc = 2,
    Sbb = 3,
    And = 4,
    Sub = 5,
    Xor = 6,
    Cmp = 7,
}

impl AluOp {
    fn op(&self) -> Op {
        match self {
            AluOp::Add => Op::Add,
            AluOp::Or => Op::Or,
            AluOp::Adc => Op::Adc,
            AluOp::Sbb => Op::Sbb,
            AluOp::And => Op::And,
            AluOp::Sub => Op::Sub,
            AluOp::Xor => Op::Xor,
            AluOp::Cmp => Op::Cmp,
        }
    }
}

/// Shift/rotate selector for the 0xD0-0xD3 group; 6 is undefined.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
enum ShiftOp {
    Rol = 0,
    Ror = 1,
    Rcl = 2,
    Rcr = 3,
    Shl = 4,
    Shr = 5,
    Sar = 7,
}

impl ShiftOp {
    fn op(&self) -> Op {
        match self {
            ShiftOp::Rol => Op::Rol,
            ShiftOp::Ror => Op::Ror,
            ShiftOp::Rcl => Op::Rcl,
            ShiftOp::Rcr => Op::Rcr,
            ShiftOp::Shl => Op::Shl,
            ShiftOp::Shr => Op::Shr,
            ShiftOp::Sar => Op::Sar,
        }
    }
}

/// Sub-opcode selector for the 0xF6/0xF7 group; 1 is undefined.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
enum Group3Op {
    Test = 0,
    Not = 2,
    Neg = 3,
    Mul = 4,
    Imul = 5,
    Div = 6,
    Idiv = 7,
}

/// Sub-opcode selector for the 0xFF group; 7 is undefined.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
enum Group5Op {
    Inc = 0,
    Dec = 1,
    Call = 2,
    CallFar = 3,
    Jmp = 4,
    JmpFar = 5,
    Push = 6,
}

/// Error type returned by the decoder.
///
/// All of these mean the current decode cannot continue; the stream position
/// is left wherever the failing read put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderError {
    /// The stream ended in the middle of an instruction.
    UnexpectedEnd { offset: usize },
    /// A mod/reg/rm-style field value lies outside its legal table. Only
    /// reachable through callers that bypass the byte-level extraction.
    InvalidField { field: &'static str, value: u8 },
    /// The byte (or its opcode-group sub-field) does not name an 8086
    /// instruction.
    UnknownOpcode { byte: u8, ext: Option<u8> },
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderError::UnexpectedEnd { offset } => write!(
                f,
                "instruction stream ended unexpectedly at offset {:#x}",
                offset
            ),
            DecoderError::InvalidField { field, value } => {
                write!(f, "value {} out of range for {} field", value, field)
            }
            DecoderError::UnknownOpcode {
                byte,
                ext: Some(ext),
            } => write!(f, "unknown opcode {:#04x} /{}", byte, ext),
            DecoderError::UnknownOpcode { byte, ext: None } => {
                write!(f, "unknown opcode {:#04x}", byte)
            }
        }
    }
}

impl Error for DecoderError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(rawstr: &str) -> Result<Instr, DecoderError> {
        let bytes: Vec<_> = rawstr
            .split_whitespace()
            .map(|hexstr| u8::from_str_radix(hexstr, 16).unwrap())
            .collect();

        let mut dec = Decoder::new(&bytes, 0);
        dec.decode_next()
    }

    fn decodes_as(rawstr: &str, printed: &str) {
        let instr = decode(rawstr).unwrap();
        assert_eq!(instr.to_string(), printed);
    }

    /// Combined decoder and printer test. Interesting patterns are added
    /// here as necessary and can be cross-verified by assembling the
    /// expected text with `nasm` in `bits 16` mode - don't forget to add
    /// tests using negative displacements and offsets too, those are hard to
    /// get right!
    #[test]
    fn disassemble_smoke() {
        decodes_as("89 D9", "mov cx, bx");
        decodes_as("88 E5", "mov ch, ah");
        decodes_as("8A 00", "mov al, [bx + si]");
        decodes_as("8B 56 00", "mov dx, [bp]");
        decodes_as("B1 0C", "mov cl, 12");
        decodes_as("B9 F4 FF", "mov cx, -12");
        decodes_as("B8 6C 0F", "mov ax, 3948");
        decodes_as("8A 41 DB", "mov al, [bx + di - 37]");
        decodes_as("89 8C D4 FE", "mov [si - 300], cx");
        decodes_as("C6 03 07", "mov byte [bp + di], 7");
        decodes_as("C7 85 85 03 5B 01", "mov word [di + 901], 347");
        decodes_as("A1 FB 09", "mov ax, [2555]");
        decodes_as("A3 0F 00", "mov [15], ax");
        decodes_as("8E D8", "mov ds, ax");
        decodes_as("8C C0", "mov ax, es");
        decodes_as("01 D8", "add ax, bx");
        decodes_as("03 18", "add bx, [bx + si]");
        decodes_as("83 C6 02", "add si, 2");
        decodes_as("39 66 02", "cmp [bp + 2], sp");
        decodes_as("2D E8 03", "sub ax, 1000");
        decodes_as("85 DB", "test bx, bx");
        decodes_as("A8 82", "test al, -126");
        decodes_as("F6 DE", "neg dh");
        decodes_as("F7 26 00 10", "mul word [4096]");
        decodes_as("D1 E3", "shl bx, 1");
        decodes_as("D2 EB", "shr bl, cl");
        decodes_as("40", "inc ax");
        decodes_as("FE 4E 00", "dec byte [bp]");
        decodes_as("50", "push ax");
        decodes_as("5F", "pop di");
        decodes_as("0E", "push cs");
        decodes_as("07", "pop es");
        decodes_as("8F 06 E8 03", "pop word [1000]");
        decodes_as("FF 36 00 10", "push word [4096]");
        decodes_as("93", "xchg ax, bx");
        decodes_as("87 6E 05", "xchg [bp + 5], bp");
        decodes_as("8D 42 0F", "lea ax, [bp + si + 15]");
        decodes_as("C5 16 A0 0F", "lds dx, [4000]");
        decodes_as("98", "cbw");
        decodes_as("D4 0A", "aam");
        decodes_as("D5 07", "aad 7");
        decodes_as("E4 C8", "in al, 200");
        decodes_as("EF", "out dx, ax");
        decodes_as("CD 0D", "int 13");
        decodes_as("C3", "ret");
        decodes_as("C2 04 00", "ret 4");
        decodes_as("A5", "movsw");
        decodes_as("AE", "scasb");
        decodes_as("F3", "rep");
        decodes_as("F4", "hlt");
    }

    #[test]
    fn branch_offsets_are_start_relative() {
        decodes_as("75 02", "jnz $+4");
        decodes_as("74 FE", "je $+0");
        decodes_as("75 FC", "jnz $-2");
        decodes_as("E2 F6", "loop $-8");
        decodes_as("E3 00", "jcxz $+2");
        decodes_as("EB 05", "jmp $+7");
        decodes_as("E9 D2 04", "jmp near $+1237");
        decodes_as("E8 05 00", "call $+8");
    }

    #[test]
    fn intersegment_forms() {
        decodes_as("9A C8 01 7B 00", "call 123:456");
        decodes_as("EA 88 77 66 55", "jmp 21862:30600");
        decodes_as("FF 2E 34 12", "jmp far [4660]");
        decodes_as("FF 5A 04", "call far [bp + si + 4]");
        decodes_as("FF 26 34 12", "jmp word [4660]");
    }

    #[test]
    fn segment_prefixes() {
        decodes_as("26 8A 00", "mov al, es:[bx + si]");
        decodes_as("3E 8B 17", "mov dx, ds:[bx]");
        // the override closest to the opcode byte wins
        decodes_as("26 3E 8B 17", "mov dx, ds:[bx]");
    }

    #[test]
    fn reports_byte_counts() {
        assert_eq!(decode("B1 0C").unwrap().len, 2);
        assert_eq!(decode("C7 85 85 03 5B 01").unwrap().len, 6);
        assert_eq!(decode("26 8A 00").unwrap().len, 3);
        assert_eq!(decode("F3").unwrap().len, 1);
    }

    #[test]
    fn byte_counts_tile_the_stream() {
        // every byte of the stream belongs to exactly one instruction
        let bytes: Vec<_> = "B9 0C 00 83 C1 14 8A 00 C7 85 85 03 5B 01 26 8B 17 75 FC C3"
            .split_whitespace()
            .map(|hexstr| u8::from_str_radix(hexstr, 16).unwrap())
            .collect();

        let mut dec = Decoder::new(&bytes, 0);
        let mut covered = 0;
        while !dec.done() {
            let start = dec.current_address();
            let instr = dec.decode_next().unwrap();
            assert_eq!(dec.current_address() - start, usize::from(instr.len));
            covered += usize::from(instr.len);
        }
        assert_eq!(covered, bytes.len());
    }

    #[test]
    fn rejects_unknown_opcodes() {
        // 0xC0 only exists on the 186 and later
        match decode("C0 E0 02") {
            Err(DecoderError::UnknownOpcode {
                byte: 0xC0,
                ext: None,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        match decode("60") {
            Err(DecoderError::UnknownOpcode {
                byte: 0x60,
                ext: None,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        // group sub-opcodes with no assigned instruction
        match decode("F7 C8") {
            Err(DecoderError::UnknownOpcode {
                byte: 0xF7,
                ext: Some(1),
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        match decode("FF F8") {
            Err(DecoderError::UnknownOpcode {
                byte: 0xFF,
                ext: Some(7),
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        match decode("D0 F0") {
            Err(DecoderError::UnknownOpcode {
                byte: 0xD0,
                ext: Some(6),
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_truncated_streams() {
        match decode("8B") {
            Err(DecoderError::UnexpectedEnd { offset: 1 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        match decode("C7 06 00 10") {
            Err(DecoderError::UnexpectedEnd { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        // a segment prefix alone is not an instruction
        match decode("2E") {
            Err(DecoderError::UnexpectedEnd { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_register_rm_for_lea() {
        match decode("8D C1") {
            Err(DecoderError::InvalidField {
                field: "mod",
                value: 3,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
