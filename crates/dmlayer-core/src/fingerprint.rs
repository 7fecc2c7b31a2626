#![forbid(unsafe_code)]

//! Variable identifiers derived from name bytes.
//!
//! A [`Fingerprint`] is two 16-bit CCITT CRCs (reversed polynomial `0x8408`)
//! over the same bytes, one seeded with `0` and one seeded with `0x8408`,
//! packed into the high and low halves of a `u32`.
//!
//! # Invariants
//!
//! 1. Pure and deterministic: the same bytes always yield the same value.
//! 2. No allocation.
//! 3. Collisions are possible and never detected. Both halves are CRCs of the
//!    same bytes, so for names of equal length the low half is fully determined
//!    by the high half; the effective key space per name length is 16 bits.
//!    Two colliding names address the same variable.

use std::fmt;

/// Reversed CCITT polynomial (`x^16 + x^12 + x^5 + 1`).
pub const POLY: u16 = 0x8408;

/// Seed for the high half of a fingerprint.
pub const SEED_HIGH: u16 = 0;

/// Seed for the low half of a fingerprint.
pub const SEED_LOW: u16 = POLY;

/// 32-bit key identifying a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fingerprint(pub u32);

impl Fingerprint {
    /// Fingerprint of a name's raw bytes.
    #[must_use]
    pub fn of(name: &[u8]) -> Self {
        let high = u32::from(crc16(name, SEED_HIGH));
        let low = u32::from(crc16(name, SEED_LOW));
        Self((high << 16) | low)
    }

    /// Raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// CRC over the name with [`SEED_HIGH`].
    #[inline]
    #[must_use]
    pub const fn high(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// CRC over the name with [`SEED_LOW`].
    #[inline]
    #[must_use]
    pub const fn low(self) -> u16 {
        self.0 as u16
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl From<Fingerprint> for u32 {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

/// 16-bit CCITT CRC, LSB-first, with the output byte rotation of the
/// reference routine.
///
/// The register starts as `!seed`. After all bytes are shifted in, the
/// register is complemented and the result is `(reg << 8) | (reg >> 8)`,
/// where the right operand is the top byte of the *un-shifted* complemented
/// register. Empty input returns `!seed`.
#[must_use]
pub fn crc16(data: &[u8], seed: u16) -> u16 {
    if data.is_empty() {
        return !seed;
    }

    let mut crc = !seed;
    for &byte in data {
        let mut bits = byte;
        for _ in 0..8 {
            if (crc ^ u16::from(bits)) & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
            bits >>= 1;
        }
    }

    let complemented = !crc;
    (complemented << 8) | ((complemented >> 8) & 0x00ff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_string_matches_x25_byte_swapped() {
        // CRC-16/X-25 of "123456789" is 0x906E; the output rotation swaps it.
        assert_eq!(crc16(b"123456789", SEED_HIGH), 0x6E90);
        assert_eq!(crc16(b"123456789", SEED_LOW), 0x9832);
    }

    #[test]
    fn known_fingerprints() {
        assert_eq!(Fingerprint::of(b"x"), Fingerprint(0xB70F_7B83));
        assert_eq!(Fingerprint::of(b"a"), Fingerprint(0xF782_3B0E));
        assert_eq!(Fingerprint::of(b"123456789"), Fingerprint(0x6E90_9832));
        assert_eq!(
            Fingerprint::of(b"THREAD/PRODUCE/VALUE"),
            Fingerprint(0x680C_C363)
        );
    }

    #[test]
    fn empty_input_returns_complemented_seed() {
        assert_eq!(crc16(b"", SEED_HIGH), 0xFFFF);
        assert_eq!(crc16(b"", SEED_LOW), 0x7BF7);
        assert_eq!(crc16(b"", 0x1234), !0x1234);
    }

    #[test]
    fn halves_expose_the_two_crcs() {
        let fp = Fingerprint::of(b"hello");
        assert_eq!(fp.high(), crc16(b"hello", SEED_HIGH));
        assert_eq!(fp.low(), crc16(b"hello", SEED_LOW));
        assert_eq!(fp.raw(), 0xBD34_1F31);
    }

    #[test]
    fn known_collision_is_not_resolved() {
        assert_ne!(b"aic", b"pab");
        assert_eq!(Fingerprint::of(b"aic"), Fingerprint::of(b"pab"));
    }

    #[test]
    fn equal_length_halves_are_linked() {
        // Seed difference propagates identically for every input of one length.
        let delta = |s: &[u8]| crc16(s, SEED_HIGH) ^ crc16(s, SEED_LOW);
        assert_eq!(delta(b"ab"), delta(b"zz"));
        assert_eq!(delta(b"ab"), delta(b"q1"));
    }

    #[test]
    fn display_is_zero_padded_hex() {
        assert_eq!(Fingerprint(0xAB).to_string(), "000000AB");
        assert_eq!(Fingerprint::of(b"x").to_string(), "B70F7B83");
    }
}
