//! Decoded 8086 instruction representation.
//!
//! Everything in here is produced by the decoder and consumed exactly once
//! by the interpreter and/or the disassembly printer; no value retains a
//! reference into the machine state.

use std::fmt;

/// The closed set of 8086 instruction kinds.
///
/// `Rep`, `Repne` and `Lock` are prefix bytes that decode to standalone
/// records; the driving loop pairs them with the following instruction when
/// rendering. Segment-override prefixes do not appear here — they tag the
/// instruction they precede (see [`Instr::segment`]).
///
/// [`Instr::segment`]: struct.Instr.html#structfield.segment
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    // Data transfer.
    Mov,
    Push,
    Pop,
    Xchg,
    In,
    Out,
    Xlat,
    Lea,
    Lds,
    Les,
    Lahf,
    Sahf,
    Pushf,
    Popf,

    // Arithmetic.
    Add,
    Adc,
    Inc,
    Aaa,
    Daa,
    Sub,
    Sbb,
    Dec,
    Neg,
    Cmp,
    Aas,
    Das,
    Mul,
    Imul,
    /// ASCII adjust after multiply. Carries its base byte as an operand only
    /// when it is not the default 10.
    Aam,
    Div,
    Idiv,
    /// ASCII adjust before divide. Base byte handling as for `Aam`.
    Aad,
    Cbw,
    Cwd,

    // Logic, shifts and rotates.
    Not,
    Shl,
    Shr,
    Sar,
    Rol,
    Ror,
    Rcl,
    Rcr,
    And,
    Test,
    Or,
    Xor,

    // String operations. These take a `b`/`w` mnemonic suffix instead of
    // explicit operands.
    Rep,
    Repne,
    Movs,
    Cmps,
    Scas,
    Lods,
    Stos,

    // Control transfer.
    Call,
    Jmp,
    Ret,
    Retf,
    Je,
    Jl,
    Jle,
    Jb,
    Jbe,
    Jp,
    Jo,
    Js,
    Jnz,
    Jnl,
    Jnle,
    Jnb,
    Ja,
    Jnp,
    Jno,
    Jns,
    Loop,
    Loopz,
    Loopnz,
    Jcxz,
    Int,
    /// The one-byte breakpoint encoding 0xCC, distinct from `int 3`.
    Int3,
    Into,
    Iret,

    // Processor control.
    Clc,
    Cmc,
    Stc,
    Cld,
    Std,
    Cli,
    Sti,
    Hlt,
    Wait,
    /// Coprocessor escape. Rendered with its 6-bit external opcode as the
    /// first operand; not meaningful to execute.
    Esc,
    Lock,
}

impl Op {
    /// Returns the mnemonic, without any width suffix or decorator.
    pub fn name(&self) -> &'static str {
        use self::Op::*;

        match self {
            Mov => "mov",
            Push => "push",
            Pop => "pop",
            Xchg => "xchg",
            In => "in",
            Out => "out",
            Xlat => "xlat",
            Lea => "lea",
            Lds => "lds",
            Les => "les",
            Lahf => "lahf",
            Sahf => "sahf",
            Pushf => "pushf",
            Popf => "popf",
            Add => "add",
            Adc => "adc",
            Inc => "inc",
            Aaa => "aaa",
            Daa => "daa",
            Sub => "sub",
            Sbb => "sbb",
            Dec => "dec",
            Neg => "neg",
            Cmp => "cmp",
            Aas => "aas",
            Das => "das",
            Mul => "mul",
            Imul => "imul",
            Aam => "aam",
            Div => "div",
            Idiv => "idiv",
            Aad => "aad",
            Cbw => "cbw",
            Cwd => "cwd",
            Not => "not",
            Shl => "shl",
            Shr => "shr",
            Sar => "sar",
            Rol => "rol",
            Ror => "ror",
            Rcl => "rcl",
            Rcr => "rcr",
            And => "and",
            Test => "test",
            Or => "or",
            Xor => "xor",
            Rep => "rep",
            Repne => "repne",
            Movs => "movs",
            Cmps => "cmps",
            Scas => "scas",
            Lods => "lods",
            Stos => "stos",
            Call => "call",
            Jmp => "jmp",
            Ret => "ret",
            Retf => "retf",
            Je => "je",
            Jl => "jl",
            Jle => "jle",
            Jb => "jb",
            Jbe => "jbe",
            Jp => "jp",
            Jo => "jo",
            Js => "js",
            Jnz => "jnz",
            Jnl => "jnl",
            Jnle => "jnle",
            Jnb => "jnb",
            Ja => "ja",
            Jnp => "jnp",
            Jno => "jno",
            Jns => "jns",
            Loop => "loop",
            Loopz => "loopz",
            Loopnz => "loopnz",
            Jcxz => "jcxz",
            Int => "int",
            Int3 => "int3",
            Into => "into",
            Iret => "iret",
            Clc => "clc",
            Cmc => "cmc",
            Stc => "stc",
            Cld => "cld",
            Std => "std",
            Cli => "cli",
            Sti => "sti",
            Hlt => "hlt",
            Wait => "wait",
            Esc => "esc",
            Lock => "lock",
        }
    }

    /// Whether the mnemonic takes a `b`/`w` width suffix instead of explicit
    /// operands (the string operations).
    pub fn needs_width_suffix(&self) -> bool {
        use self::Op::*;

        match self {
            Movs | Cmps | Scas | Lods | Stos => true,
            _ => false,
        }
    }

    /// Whether this is a bare prefix record that the renderer pairs with the
    /// following instruction.
    pub fn is_prefix(&self) -> bool {
        use self::Op::*;

        match self {
            Rep | Repne | Lock => true,
            _ => false,
        }
    }
}

/// Operation width: one byte or one little-endian word.
///
/// On relative branches this records the displacement width instead (short
/// vs. near), which the renderer needs to keep the encoding stable through a
/// reassembly round trip.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    /// Builds a width from an encoding `w` bit.
    pub fn from_w(wide: bool) -> Self {
        if wide {
            Width::Word
        } else {
            Width::Byte
        }
    }

    /// Number of bytes moved by one access of this width.
    pub fn bytes(&self) -> u16 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
        }
    }

    /// All-ones mask for values of this width.
    pub fn mask(&self) -> u16 {
        match self {
            Width::Byte => 0x00FF,
            Width::Word => 0xFFFF,
        }
    }

    /// Mask selecting the sign bit of this width.
    pub fn sign_bit(&self) -> u16 {
        match self {
            Width::Byte => 0x0080,
            Width::Word => 0x8000,
        }
    }
}

/// One of the eight general-purpose registers, in machine state storage
/// order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Register {
    A,
    B,
    C,
    D,
    Sp,
    Bp,
    Si,
    Di,
}

impl Register {
    /// All registers in storage order (the order their cells are serialized
    /// and reported in).
    pub const ALL: [Register; 8] = [
        Register::A,
        Register::B,
        Register::C,
        Register::D,
        Register::Sp,
        Register::Bp,
        Register::Si,
        Register::Di,
    ];

    /// Index of this register's 16-bit cell in the machine state.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The full 16-bit location of this register.
    pub fn word(self) -> RegisterLocation {
        RegisterLocation {
            reg: self,
            portion: Portion::Word,
        }
    }

    /// The low byte location. Only meaningful for a/b/c/d.
    pub fn low(self) -> RegisterLocation {
        RegisterLocation {
            reg: self,
            portion: Portion::Low,
        }
    }

    /// The high byte location. Only meaningful for a/b/c/d.
    pub fn high(self) -> RegisterLocation {
        RegisterLocation {
            reg: self,
            portion: Portion::High,
        }
    }
}

/// Which part of a register an operand refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Portion {
    /// The full 16-bit cell.
    Word,
    /// The low 8 bits (al, bl, cl, dl).
    Low,
    /// The high 8 bits (ah, bh, ch, dh).
    High,
}

/// A (register, portion) pair, the resolved form of a 3-bit register field.
///
/// Byte portions are only ever constructed for the four halvable registers;
/// the canonical reg-field table cannot produce anything else.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RegisterLocation {
    pub reg: Register,
    pub portion: Portion,
}

impl RegisterLocation {
    /// The assembly name of this location (`ax`, `al`, `ah`, `sp`, …).
    pub fn name(&self) -> &'static str {
        use self::Portion::*;
        use self::Register::*;

        match (self.reg, self.portion) {
            (A, Word) => "ax",
            (A, Low) => "al",
            (A, High) => "ah",
            (B, Word) => "bx",
            (B, Low) => "bl",
            (B, High) => "bh",
            (C, Word) => "cx",
            (C, Low) => "cl",
            (C, High) => "ch",
            (D, Word) => "dx",
            (D, Low) => "dl",
            (D, High) => "dh",
            (Sp, Word) => "sp",
            (Bp, Word) => "bp",
            (Si, Word) => "si",
            (Di, Word) => "di",
            (Sp, _) | (Bp, _) | (Si, _) | (Di, _) => {
                unreachable!("byte portion of a word-only register")
            }
        }
    }

    /// Width of one access through this location.
    pub fn width(&self) -> Width {
        match self.portion {
            Portion::Word => Width::Word,
            Portion::Low | Portion::High => Width::Byte,
        }
    }
}

impl fmt::Display for RegisterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the four segment registers.
///
/// These appear as push/pop and `mov` operands and as override tags; the
/// machine state does not store them, and the flat memory model never
/// applies segment arithmetic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SegmentReg {
    Es,
    Cs,
    Ss,
    Ds,
}

impl SegmentReg {
    pub fn name(&self) -> &'static str {
        match self {
            SegmentReg::Es => "es",
            SegmentReg::Cs => "cs",
            SegmentReg::Ss => "ss",
            SegmentReg::Ds => "ds",
        }
    }
}

impl fmt::Display for SegmentReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A memory operand: up to two base/index registers and a displacement.
///
/// The effective address is the sum of the register word values plus the
/// sign-extended displacement. No registers with a displacement is
/// direct/absolute addressing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryLocation {
    /// First register of the addressing form (bx or bp in the two-register
    /// forms; any of bx/bp/si/di alone).
    pub base: Option<RegisterLocation>,
    /// Second register (si or di). Never present without `base`.
    pub index: Option<RegisterLocation>,
    /// Signed displacement; sign-extended from a byte for `mod=01`.
    pub disp: i16,
}

impl MemoryLocation {
    pub fn direct(disp: i16) -> Self {
        MemoryLocation {
            base: None,
            index: None,
            disp,
        }
    }

    /// Number of registers participating in the address (0, 1 or 2).
    pub fn reg_count(&self) -> usize {
        self.base.iter().count() + self.index.iter().count()
    }
}

/// An immediate operand.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Immediate {
    /// A plain constant, already sign-extended to 16 bits where the encoding
    /// was narrower.
    Value(i16),
    /// A branch displacement relative to the address immediately following
    /// the instruction. Added to the post-fetch instruction pointer when the
    /// branch is taken.
    RelOffset(i16),
    /// An intersegment (far) target, `segment:offset`.
    Far { segment: u16, offset: u16 },
}

/// A decoded operand.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg(RegisterLocation),
    Seg(SegmentReg),
    Mem(MemoryLocation),
    Imm(Immediate),
}

impl Operand {
    /// Whether this operand names a register (general or segment), which
    /// makes the operation width self-evident in a listing.
    pub fn is_register(&self) -> bool {
        match self {
            Operand::Reg(_) | Operand::Seg(_) => true,
            Operand::Mem(_) | Operand::Imm(_) => false,
        }
    }

    /// Whether this operand is a branch target (relative offset or far
    /// pointer), which never takes a size decorator.
    pub fn is_branch_target(&self) -> bool {
        match self {
            Operand::Imm(Immediate::RelOffset(_)) | Operand::Imm(Immediate::Far { .. }) => true,
            _ => false,
        }
    }
}

impl From<RegisterLocation> for Operand {
    fn from(reg: RegisterLocation) -> Self {
        Operand::Reg(reg)
    }
}

impl From<SegmentReg> for Operand {
    fn from(seg: SegmentReg) -> Self {
        Operand::Seg(seg)
    }
}

impl From<MemoryLocation> for Operand {
    fn from(mem: MemoryLocation) -> Self {
        Operand::Mem(mem)
    }
}

impl From<Immediate> for Operand {
    fn from(imm: Immediate) -> Self {
        Operand::Imm(imm)
    }
}

/// The 0–2 operands of an instruction, in fixed destination-first order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operands {
    None,
    One(Operand),
    Two(Operand, Operand),
}

impl Operands {
    pub fn first(&self) -> Option<&Operand> {
        match self {
            Operands::None => None,
            Operands::One(first) | Operands::Two(first, _) => Some(first),
        }
    }

    pub fn second(&self) -> Option<&Operand> {
        match self {
            Operands::None | Operands::One(_) => None,
            Operands::Two(_, second) => Some(second),
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Operands::None => 0,
            Operands::One(_) => 1,
            Operands::Two(..) => 2,
        }
    }
}

/// A fully decoded instruction.
///
/// `Instr` implements `Display`, which prints the plain-text disassembly of
/// the instruction (without any execution trace annotations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    /// Instruction kind.
    pub op: Op,
    /// Operands in destination-first order.
    pub operands: Operands,
    /// Operation width (or displacement width for relative branches).
    pub width: Width,
    /// Whether the rendered form needs an explicit `word`/`byte` decorator
    /// because no register operand pins the width.
    pub needs_decorator: bool,
    /// Total encoded length in bytes, prefixes included.
    pub len: u16,
    /// Segment override this instruction was prefixed with, if any.
    pub segment: Option<SegmentReg>,
    /// Marks the indirect intersegment forms of `call`/`jmp`.
    pub is_far: bool,
    /// Clock cost charged by the execution engine; `None` until executed.
    pub clocks: Option<u32>,
}

impl Instr {
    pub fn new(op: Op, width: Width) -> Self {
        Instr {
            op,
            operands: Operands::None,
            width,
            needs_decorator: false,
            len: 0,
            segment: None,
            is_far: false,
            clocks: None,
        }
    }

    pub fn unary(op: Op, operand: impl Into<Operand>, width: Width) -> Self {
        Instr {
            operands: Operands::One(operand.into()),
            ..Instr::new(op, width)
        }
    }

    pub fn binary(
        op: Op,
        first: impl Into<Operand>,
        second: impl Into<Operand>,
        width: Width,
    ) -> Self {
        Instr {
            operands: Operands::Two(first.into(), second.into()),
            ..Instr::new(op, width)
        }
    }

    /// The generic size-decorator rule: a decorator is needed when exactly
    /// one operand exists and it is neither a register nor a branch target,
    /// or when two operands exist and neither is a register — in both cases
    /// nothing else in the listing pins the operation width. The decoder
    /// suppresses the result for the unary-immediate control forms (`int`,
    /// `ret`/`retf` with a pop count, `aam`/`aad`, `esc`) that no assembler
    /// accepts a decorator on.
    pub(crate) fn decorator_by_rule(&self) -> bool {
        match &self.operands {
            Operands::None => false,
            Operands::One(operand) => !operand.is_register() && !operand.is_branch_target(),
            Operands::Two(first, second) => !first.is_register() && !second.is_register(),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use crate::cpu::disasm::print_instr;

        let mut s = String::new();
        print_instr(self, &mut s);
        f.write_str(&s)
    }
}
