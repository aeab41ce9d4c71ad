//! Bit-field extraction out of encoding bytes.
//!
//! Every opcode, ModRM and prefix field read in the decoder goes through
//! these two functions.

/// Extracts the bit range `[first, one_past_last)` of `byte`, right-justified.
///
/// Bit 0 is the least significant bit. The range must satisfy
/// `first <= one_past_last <= 8`; violating that is a bug in the caller and
/// panics.
pub fn extract_bits(byte: u8, first: u8, one_past_last: u8) -> u8 {
    assert!(
        first <= one_past_last && one_past_last <= 8,
        "invalid bit range {}..{}",
        first,
        one_past_last
    );

    let width = one_past_last - first;
    if width == 0 {
        return 0;
    }

    let mask = if width == 8 { 0xFF } else { (1u8 << width) - 1 };
    (byte >> first) & mask
}

/// Extracts the single bit at `index` (0 = least significant) as a boolean.
pub fn extract_bit(byte: u8, index: u8) -> bool {
    extract_bits(byte, index, index + 1) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges() {
        assert_eq!(extract_bits(0b1011_0110, 0, 3), 0b110);
        assert_eq!(extract_bits(0b1011_0110, 3, 6), 0b110);
        assert_eq!(extract_bits(0b1011_0110, 6, 8), 0b10);
        assert_eq!(extract_bits(0xFF, 0, 8), 0xFF);
        assert_eq!(extract_bits(0xA5, 0, 8), 0xA5);
    }

    #[test]
    fn empty_range_is_zero() {
        assert_eq!(extract_bits(0xFF, 4, 4), 0);
        assert_eq!(extract_bits(0xFF, 8, 8), 0);
    }

    #[test]
    fn wide_ranges() {
        // 5..7-bit ranges exercise the non-precomputed masks
        assert_eq!(extract_bits(0b1101_1011, 0, 5), 0b11011);
        assert_eq!(extract_bits(0b1101_1011, 1, 7), 0b101101);
        assert_eq!(extract_bits(0b1101_1011, 0, 7), 0b1011011);
    }

    #[test]
    fn single_bits() {
        let byte = 0b0100_0010;
        assert!(!extract_bit(byte, 0));
        assert!(extract_bit(byte, 1));
        assert!(extract_bit(byte, 6));
        assert!(!extract_bit(byte, 7));
    }

    #[test]
    #[should_panic]
    fn reversed_range_panics() {
        extract_bits(0, 5, 3);
    }

    #[test]
    #[should_panic]
    fn out_of_byte_range_panics() {
        extract_bits(0, 2, 9);
    }
}
