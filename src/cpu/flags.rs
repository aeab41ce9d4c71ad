//! 8086 status flag (`FLAGS`) structures and utilities.

bitflags! {
    /// A bitmask carrying any combination of the nine 8086 status flags.
    ///
    /// The bit indices correspond to the bit positions in the architectural
    /// 16-bit `FLAGS` register, which makes `lahf`/`sahf` straightforward
    /// bit moves.
    pub struct Flags: u16 {
        /// Carry flag.
        const CF = 1 << 0;
        /// Parity flag.
        ///
        /// Set to whether the low 8 bits of a result contain an even number
        /// of 1-bits, regardless of operation width.
        const PF = 1 << 2;
        /// Auxiliary carry flag.
        ///
        /// Set to whether a carry out of the lower 4 bits of an operation
        /// has been generated.
        const AF = 1 << 4;
        /// Zero flag.
        const ZF = 1 << 6;
        /// Sign flag.
        const SF = 1 << 7;
        /// Trap flag (single-step).
        const TF = 1 << 8;
        /// Interrupt-enable flag.
        const IF = 1 << 9;
        /// Direction flag.
        const DF = 1 << 10;
        /// Overflow flag.
        const OF = 1 << 11;
    }
}

impl Flags {
    /// All nine flags with their one-letter names, in the fixed
    /// trap/direction/interrupt/overflow/sign/zero/aux/parity/carry order
    /// used for rendering and for the state dump.
    pub const NAMED: [(Flags, char); 9] = [
        (Flags::TF, 'T'),
        (Flags::DF, 'D'),
        (Flags::IF, 'I'),
        (Flags::OF, 'O'),
        (Flags::SF, 'S'),
        (Flags::ZF, 'Z'),
        (Flags::AF, 'A'),
        (Flags::PF, 'P'),
        (Flags::CF, 'C'),
    ];

    /// Sets or clears `flag` according to `value`.
    pub fn set_to(&mut self, flag: Flags, value: bool) {
        if value {
            self.insert(flag);
        } else {
            self.remove(flag);
        }
    }

    /// Renders the set flags as a string of one-letter names, in `NAMED`
    /// order. An empty set renders as an empty string.
    pub fn letters(&self) -> String {
        Flags::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, letter)| *letter)
            .collect()
    }
}
