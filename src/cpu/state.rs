//! 8086 machine state.

use std::io::{self, Write};

use crate::cpu::flags::Flags;
use crate::cpu::instr::{Portion, Register, RegisterLocation};
use crate::memory::Memory;

/// The simulated machine: register file, flags, the loaded code image and
/// the flat data memory.
///
/// Code and data live in separate address spaces; the instruction pointer
/// indexes the code image only.
#[derive(Debug)]
pub struct State {
    code: Vec<u8>,
    ip: u16,
    regs: [u16; 8],
    flags: Flags,
    mem: Memory,
    clocks: u64,
}

impl State {
    /// Creates a zeroed machine with `code` loaded and the instruction
    /// pointer at its start.
    pub fn new(code: Vec<u8>) -> Self {
        Self {
            code,
            ip: 0,
            regs: [0; 8],
            flags: Flags::empty(),
            mem: Memory::new(),
            clocks: 0,
        }
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn ip(&self) -> u16 {
        self.ip
    }

    pub fn set_ip(&mut self, value: u16) {
        self.ip = value;
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    pub fn mem(&self) -> &Memory {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    /// Clocks charged by all instructions executed so far.
    pub fn clocks(&self) -> u64 {
        self.clocks
    }

    pub fn add_clocks(&mut self, clocks: u32) {
        self.clocks += u64::from(clocks);
    }

    /// Reads a register location. Byte portions come back zero-extended.
    pub fn get(&self, loc: RegisterLocation) -> u16 {
        let cell = self.regs[loc.reg.index()];
        match loc.portion {
            Portion::Word => cell,
            Portion::Low => cell & 0x00FF,
            Portion::High => cell >> 8,
        }
    }

    /// Writes a register location. A byte write leaves the sibling half of
    /// the cell untouched.
    pub fn set(&mut self, loc: RegisterLocation, value: u16) {
        let cell = &mut self.regs[loc.reg.index()];
        match loc.portion {
            Portion::Word => *cell = value,
            Portion::Low => *cell = (*cell & 0xFF00) | (value & 0x00FF),
            Portion::High => *cell = (*cell & 0x00FF) | (value & 0x00FF) << 8,
        }
    }

    /// Captures the register file for trace annotations.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            regs: self.regs,
            flags: self.flags,
            ip: self.ip,
            clocks: self.clocks,
        }
    }

    /// Serializes the machine state in its fixed little-endian layout: code
    /// image length (4 bytes), instruction pointer (2 bytes), the eight
    /// register cells in storage order (2 bytes each), then one byte per
    /// flag in display order.
    pub fn dump_state<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&(self.code.len() as u32).to_le_bytes())?;
        w.write_all(&self.ip.to_le_bytes())?;
        for reg in &Register::ALL {
            w.write_all(&self.regs[reg.index()].to_le_bytes())?;
        }
        for &(flag, _) in &Flags::NAMED {
            w.write_all(&[self.flags.contains(flag) as u8])?;
        }
        Ok(())
    }

    /// Writes the raw data memory image.
    pub fn dump_memory<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(self.mem.as_slice())
    }
}

macro_rules! accessors {
    (
        $reg:ident: [ $getter16:ident/$setter16:ident ]
    ) => {
        pub fn $getter16(&self) -> u16 { self.regs[Register::$reg.index()] }
        pub fn $setter16(&mut self, value: u16) { self.regs[Register::$reg.index()] = value; }
    };
    (
        $reg:ident: [ $getter16:ident/$setter16:ident, $getter8h:ident/$setter8h:ident, $getter8l:ident/$setter8l:ident ]
    ) => {
        pub fn $getter16(&self) -> u16 { self.regs[Register::$reg.index()] }
        pub fn $setter16(&mut self, value: u16) { self.regs[Register::$reg.index()] = value; }
        pub fn $getter8h(&self) -> u8 { (self.regs[Register::$reg.index()] >> 8) as u8 }
        pub fn $setter8h(&mut self, value: u8) {
            self.regs[Register::$reg.index()] =
                (self.regs[Register::$reg.index()] & 0x00FF) | (value as u16) << 8;
        }
        pub fn $getter8l(&self) -> u8 { self.regs[Register::$reg.index()] as u8 }
        pub fn $setter8l(&mut self, value: u8) {
            self.regs[Register::$reg.index()] =
                (self.regs[Register::$reg.index()] & 0xFF00) | value as u16;
        }
    };
}

impl State {
    accessors!(A: [ax/set_ax, ah/set_ah, al/set_al]);
    accessors!(B: [bx/set_bx, bh/set_bh, bl/set_bl]);
    accessors!(C: [cx/set_cx, ch/set_ch, cl/set_cl]);
    accessors!(D: [dx/set_dx, dh/set_dh, dl/set_dl]);
    accessors!(Sp: [sp/set_sp]);
    accessors!(Bp: [bp/set_bp]);
    accessors!(Si: [si/set_si]);
    accessors!(Di: [di/set_di]);
}

/// A copyable point-in-time view of the register file, taken before and
/// after each executed instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub regs: [u16; 8],
    pub flags: Flags,
    pub ip: u16,
    pub clocks: u64,
}

impl Snapshot {
    pub fn reg(&self, reg: Register) -> u16 {
        self.regs[reg.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let mut state = State::new(Vec::new());
        assert_eq!(state.ax(), 0);
        assert_eq!(state.ah(), 0);
        assert_eq!(state.al(), 0);
        state.set_ax(!0);
        assert_eq!(state.ax(), !0);
        assert_eq!(state.ah(), !0);
        assert_eq!(state.al(), !0);
        state.set_al(0);
        assert_eq!(state.ah(), !0);
        assert_eq!(state.al(), 0);
        state.set_ax(!0);
        state.set_ah(0);
        assert_eq!(state.ah(), 0);
        assert_eq!(state.al(), !0);
    }

    #[test]
    fn portions() {
        let mut state = State::new(Vec::new());
        state.set(Register::B.word(), 0x1234);
        assert_eq!(state.get(Register::B.word()), 0x1234);
        assert_eq!(state.get(Register::B.low()), 0x34);
        assert_eq!(state.get(Register::B.high()), 0x12);
        state.set(Register::B.high(), 0xAB);
        assert_eq!(state.get(Register::B.word()), 0xAB34);
        state.set(Register::B.low(), 0xCD);
        assert_eq!(state.get(Register::B.word()), 0xABCD);
    }

    #[test]
    fn state_dump_layout() {
        let mut state = State::new(vec![0x90; 3]);
        state.set_ip(3);
        state.set_ax(0x0102);
        state.set_si(0xBEEF);
        state.flags_mut().insert(Flags::CF | Flags::ZF);

        let mut out = Vec::new();
        state.dump_state(&mut out).unwrap();
        assert_eq!(out.len(), 4 + 2 + 8 * 2 + 9);
        assert_eq!(&out[..4], &[3, 0, 0, 0]);
        assert_eq!(&out[4..6], &[3, 0]);
        assert_eq!(&out[6..8], &[0x02, 0x01]);
        assert_eq!(&out[18..20], &[0xEF, 0xBE]);
        // one byte per flag, T,D,I,O,S,Z,A,P,C
        assert_eq!(&out[22..], &[0, 0, 0, 0, 0, 1, 0, 0, 1]);
    }
}
